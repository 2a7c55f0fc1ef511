//! Common imports for embedding the operator or driving it from tests.

pub use crate::config::{ControllerConfig, ImagePullSpecs, Namespaces, ServerConfig};
pub use crate::controller::backoff::ExponentialBackoff;
pub use crate::controller::queue::WorkQueue;
pub use crate::controller::reconciler::{
    Collaborators, CycleReport, Reconciler, ReconcilerError, SubReconcileFailure, SyncError,
};
pub use crate::crd::{
    ConditionStatus, KubeControllerManager, KubeControllerManagerSpec, LogLevel,
    ManagementState, OperatorCondition,
};
pub use crate::resource::memory::{MemoryOperatorClient, MemoryStore};
pub use crate::resource::{ApiError, OperatorClient, ResourceStore};
