//! CA bundle composition

mod common;

use chrono::{Duration, Utc};
use common::*;
use kcm_operator::controller::reconciler::ca_bundle::compose_bundle;
use kcm_operator::pki::parse_certificates;
use kcm_operator::prelude::*;

#[test]
fn test_composed_bundle_has_no_duplicates_or_expired_entries() {
    let now = Utc::now();
    let live = now + Duration::days(30);
    let (a, _) = mint_ca("a", now - Duration::days(1), live);
    let (b, _) = mint_ca("b", now - Duration::days(1), live);
    let (old, _) = mint_ca("old", now - Duration::days(10), now - Duration::days(1));

    let inputs = vec![
        parse_certificates(format!("{a}{old}").as_bytes()).unwrap(),
        parse_certificates(format!("{b}{a}").as_bytes()).unwrap(),
        parse_certificates(format!("{b}{old}{a}").as_bytes()).unwrap(),
    ];

    let bundle = compose_bundle(inputs, now);
    assert_eq!(subjects(&bundle), ["CN=a", "CN=b"]);
}

#[test]
fn test_empty_inputs_compose_an_empty_bundle() {
    assert_eq!(compose_bundle(Vec::new(), Utc::now()), "");
    assert_eq!(compose_bundle(vec![Vec::new(), Vec::new()], Utc::now()), "");
}

#[tokio::test]
async fn test_service_account_ca_keeps_existing_entries_first() {
    let fixture = Fixture::new();
    fixture.populate_recovery_token();
    let now = Utc::now();
    let live = now + Duration::days(30);
    let (existing, _) = mint_ca("existing", now - Duration::days(1), live);
    let (apiserver, _) = mint_ca("apiserver", now - Duration::days(1), live);
    let (router, _) = mint_ca("router", now - Duration::days(1), live);
    fixture
        .config_maps
        .insert(bundle_config_map(TARGET, "serviceaccount-ca", &existing));
    fixture.config_maps.insert(bundle_config_map(
        MANAGED_CONFIG,
        "kube-apiserver-server-ca",
        &apiserver,
    ));
    fixture.config_maps.insert(bundle_config_map(
        MANAGED_CONFIG,
        "router-ca",
        &format!("{router}{existing}"),
    ));

    let report = fixture
        .reconciler
        .run_cycle(&managed_spec(), now)
        .await
        .unwrap();

    assert!(report.changed.contains(&"configmap/serviceaccount-ca"));
    let bundle = &fixture.config_map_data(TARGET, "serviceaccount-ca")["ca-bundle.crt"];
    assert_eq!(
        subjects(bundle),
        ["CN=existing", "CN=apiserver", "CN=router"]
    );
}

#[tokio::test]
async fn test_expired_entries_age_out_of_the_bundle() {
    let fixture = Fixture::new();
    fixture.populate_recovery_token();
    let now = Utc::now();
    let (short, _) = mint_ca("short", now - Duration::days(1), now + Duration::hours(1));
    let (long, _) = mint_ca("long", now - Duration::days(1), now + Duration::days(30));
    fixture.config_maps.insert(bundle_config_map(
        MANAGED_CONFIG,
        "router-ca",
        &format!("{short}{long}"),
    ));

    fixture
        .reconciler
        .run_cycle(&managed_spec(), now)
        .await
        .unwrap();
    let bundle = &fixture.config_map_data(TARGET, "serviceaccount-ca")["ca-bundle.crt"];
    assert_eq!(subjects(bundle), ["CN=short", "CN=long"]);

    fixture
        .reconciler
        .run_cycle(&managed_spec(), now + Duration::hours(2))
        .await
        .unwrap();
    let bundle = &fixture.config_map_data(TARGET, "serviceaccount-ca")["ca-bundle.crt"];
    assert_eq!(subjects(bundle), ["CN=long"]);
}

#[tokio::test]
async fn test_malformed_source_degrades_only_its_bundle() {
    let fixture = Fixture::new();
    fixture.populate_recovery_token();
    fixture.config_maps.insert(bundle_config_map(
        MANAGED_CONFIG,
        "router-ca",
        "this is not a certificate",
    ));

    let report = fixture
        .reconciler
        .run_cycle(&managed_spec(), Utc::now())
        .await
        .unwrap();

    let names: Vec<_> = report.failures.iter().map(|f| f.name).collect();
    assert_eq!(names, ["configmap/serviceaccount-ca"]);
    assert!(fixture
        .config_maps
        .stored(OPERATOR, "csr-controller-ca")
        .is_some());
    assert_eq!(fixture.degraded().status, ConditionStatus::True);
}
