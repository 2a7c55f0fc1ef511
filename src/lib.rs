//! kube-controller-manager operator library
//!
//! Reconciles the target configuration of a controller-manager: component
//! config maps, the static pod, CA bundles, CSR signer rotation and the
//! aggregated Degraded condition.
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod manifests;
pub mod observability;
pub mod pki;
pub mod prelude;
pub mod resource;
pub mod runtime;
pub mod server;
