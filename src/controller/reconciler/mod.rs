//! # Reconciler
//!
//! Synthesizes the target configuration of the controller-manager.
//!
//! One cycle runs these sub-reconcilers, in order:
//!
//! - `configmap` - controller-manager config
//! - `configmap/cluster-policy-controller-config` - policy controller config
//! - `configmap/csr-intermediate-ca` - signer chain appended to `csr-signer-ca`
//! - `configmap/csr-controller-ca` - combined CSR trust bundle
//! - `secrets/csr-signer` - signer rotation into the target namespace
//! - `configmap/serviceaccount-ca` - service-account trust bundle
//! - `serviceaccount/localhost-recovery-client` - recovery token readiness
//! - `configmap/kube-controller-manager-pod` - rendered static pod
//! - `configmap/trusted-ca-bundle` - labelled trusted CA config map

pub mod ca_bundle;
pub mod config;
pub mod merge;
pub mod pod;
mod reconcile;
pub mod schema;
pub mod service_account;
pub mod signer;
pub mod status;
#[cfg(test)]
mod testing;
mod trusted_ca;
mod types;
pub mod validation;

pub use types::{
    Collaborators, CycleReport, Reconciler, ReconcilerError, SubReconcileFailure, SyncError,
};
