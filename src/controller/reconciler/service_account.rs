//! # Recovery Token Readiness
//!
//! Token injection for a service account is asynchronous. Until the stable
//! token secret carries a token for the current service account, this
//! sub-reconciler fails so the cycle degrades and is retried.

use super::types::{Reconciler, SyncError};
use crate::constants::SERVICE_ACCOUNT_UID_ANNOTATION;
use crate::manifests;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};

/// Check that `token` holds a token for `service_account`, failing fast
pub fn check_token_populated(
    service_account: &ServiceAccount,
    token: &Secret,
) -> Result<(), SyncError> {
    let ns = token.metadata.namespace.as_deref().unwrap_or_default();
    let name = token.metadata.name.as_deref().unwrap_or_default();
    let not_ready = |detail: &str| {
        SyncError::TokenNotPopulated(format!("secret {ns}/{name} hasn't been populated {detail}"))
    };

    let uid = token
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(SERVICE_ACCOUNT_UID_ANNOTATION))
        .map(String::as_str)
        .unwrap_or_default();
    if uid.is_empty() {
        return Err(not_ready("with SA token yet: missing SA UID"));
    }
    if Some(uid) != service_account.metadata.uid.as_deref() {
        return Err(not_ready("with current SA token yet: SA UID mismatch"));
    }

    let data = token.data.as_ref().filter(|d| !d.is_empty());
    let Some(data) = data else {
        return Err(not_ready("with any data yet"));
    };
    if !data.contains_key("token") {
        return Err(not_ready("with current SA token yet"));
    }
    if !data.contains_key("ca.crt") {
        return Err(not_ready("with current SA token root CA yet"));
    }
    Ok(())
}

impl Reconciler {
    /// Gate on the `localhost-recovery-client` token being populated
    pub(crate) async fn sync_recovery_token(&self) -> Result<bool, SyncError> {
        let namespace = &self.namespaces.target;
        let required_sa: ServiceAccount = manifests::read(
            "kube-controller-manager/localhost-recovery-sa.yaml",
            &self.manifests.recovery_service_account,
            namespace,
        )?;
        let required_token: Secret = manifests::read(
            "kube-controller-manager/localhost-recovery-token.yaml",
            &self.manifests.recovery_token,
            namespace,
        )?;

        let sa_name = required_sa.metadata.name.unwrap_or_default();
        let token_name = required_token.metadata.name.unwrap_or_default();
        let service_account = self.service_accounts.get(namespace, &sa_name).await?;
        let token = self.secrets.get(namespace, &token_name).await?;

        check_token_populated(&service_account, &token)?;
        Ok(false)
    }
}
