//! Resilient request pipeline: executor, decoder, date canonicalization, and
//! the verb-surface client composed from them.

pub mod client;
pub mod dates;
pub mod executor;
pub mod response;

pub use client::{ApiClient, FilePart, HealthStatus, RequestOptions};
pub use executor::RequestExecutor;
