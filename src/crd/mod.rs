//! # Custom Resource Definitions
//!
//! The cluster-scoped `KubeControllerManager` operator resource.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Desired state: management state, log level, observed config and overrides
//! - `status.rs` - Operator conditions

mod spec;
mod status;

pub use spec::{KubeControllerManager, KubeControllerManagerSpec, LogLevel, ManagementState};
pub use status::{ConditionStatus, KubeControllerManagerStatus, OperatorCondition};
