//! Compute gateway
//!
//! HTTP façade over a confidential-computing platform: dataset upload and
//! download, compute job submission, and a local mirror of dataset addresses
//! and job statuses for fast listing.

pub mod api;
pub mod config;
pub mod platform;
pub mod storage;
pub mod types;

pub use config::GatewayConfig;
pub use types::{Address, JobCompletionStatus, RawJobId};
