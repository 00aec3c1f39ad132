//! Shared plumbing for every plagcheck service: config loading, the error
//! taxonomy, the response envelope, logging setup, the broker client, event
//! payloads, and a retrying HTTP client helper.
//!
//! See `examples/arkCyber-Matrixon/crates/matrixon-common` for the teacher's
//! equivalent shared-crate role.

pub mod broker;
pub mod config;
pub mod error;
pub mod events;
pub mod http_client;
pub mod logging;
pub mod response;

pub use error::{Result, ServiceError};
pub use response::ApiResponse;
