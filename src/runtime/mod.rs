//! # Runtime Module
//!
//! Runtime components for the operator: initialization, watch registration,
//! the single worker loop, and error handling.

pub mod error_policy;
pub mod initialization;
pub mod watches;
pub mod worker;

pub use error_policy::*;
pub use initialization::*;
pub use watches::*;
pub use worker::*;
