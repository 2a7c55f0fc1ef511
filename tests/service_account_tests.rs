//! Recovery token readiness gate

mod common;

use chrono::Utc;
use common::*;
use k8s_openapi::api::core::v1::ServiceAccount;
use kcm_operator::prelude::*;

const GATE: &str = "serviceaccount/localhost-recovery-client";

async fn gate_failure(fixture: &Fixture) -> Option<String> {
    let report = fixture
        .reconciler
        .run_cycle(&managed_spec(), Utc::now())
        .await
        .unwrap();
    report
        .failures
        .iter()
        .find(|f| f.name == GATE)
        .map(|f| f.error.to_string())
}

fn seed_service_account(fixture: &Fixture) {
    fixture.service_accounts.insert(ServiceAccount {
        metadata: meta(TARGET, "localhost-recovery-client", Some(SA_UID)),
        ..Default::default()
    });
}

#[tokio::test]
async fn test_populated_token_passes_the_gate() {
    let fixture = Fixture::new();
    fixture.populate_recovery_token();

    assert_eq!(gate_failure(&fixture).await, None);
    assert_eq!(fixture.degraded().status, ConditionStatus::False);
}

#[tokio::test]
async fn test_missing_service_account_degrades() {
    let fixture = Fixture::new();
    fixture.secrets.insert(recovery_token(SA_UID, &["token", "ca.crt"]));

    assert!(gate_failure(&fixture).await.is_some());
    assert_eq!(fixture.degraded().status, ConditionStatus::True);
    assert!(fixture
        .service_accounts
        .stored(TARGET, "localhost-recovery-client")
        .is_none());
}

#[tokio::test]
async fn test_token_for_a_previous_service_account_degrades() {
    let fixture = Fixture::new();
    seed_service_account(&fixture);
    fixture
        .secrets
        .insert(recovery_token("previous-uid", &["token", "ca.crt"]));

    let failure = gate_failure(&fixture).await.unwrap();
    assert!(failure.contains("SA UID mismatch"), "{failure}");
}

#[tokio::test]
async fn test_token_without_root_ca_degrades() {
    let fixture = Fixture::new();
    seed_service_account(&fixture);
    fixture.secrets.insert(recovery_token(SA_UID, &["token"]));

    let failure = gate_failure(&fixture).await.unwrap();
    assert!(failure.contains("root CA"), "{failure}");
}

#[tokio::test]
async fn test_gate_opens_once_the_token_is_injected() {
    let fixture = Fixture::new();
    seed_service_account(&fixture);
    fixture.secrets.insert(recovery_token(SA_UID, &[]));
    assert!(gate_failure(&fixture).await.is_some());

    fixture.secrets.insert(recovery_token(SA_UID, &["token", "ca.crt"]));
    assert_eq!(gate_failure(&fixture).await, None);
    assert_eq!(fixture.degraded().status, ConditionStatus::False);
}
