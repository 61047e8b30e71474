//! HTTP client for the FieldSafe REST API.

pub mod client;
pub mod error;
mod types;

pub use client::ApiClient;
pub use error::{ApiClientError, Result};
