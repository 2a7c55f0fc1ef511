//! # Controller
//!
//! Core controller modules for the kube-controller-manager operator.
//!
//! - `backoff`: Exponential backoff for failed cycles
//! - `events`: Change notifications and the handlers that enqueue work
//! - `queue`: Single-key work queue
//! - `reconciler`: Core reconciliation logic

pub mod backoff;
pub mod events;
pub mod queue;
pub mod reconciler;
