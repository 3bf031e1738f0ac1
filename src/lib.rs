//! Data-access layer for the Campus learning platform's JSON API.
//!
//! Two cooperating abstractions every feature module builds on:
//!
//! - [`ApiClient`]: standardized outgoing HTTP with per-attempt timeouts,
//!   retry with exponential backoff, error classification, response envelope
//!   unwrapping, and opt-in short-lived caching of GET results.
//! - [`EntityStore`]: a generic paginated-collection and single-item state
//!   holder over one client, with single-flight mutation guards and optimistic
//!   mutation that rolls back on remote failure.
//!
//! # Example
//!
//! ```ignore
//! let config = ApiConfig::load(None)?;
//! let client = Arc::new(ApiClient::new(&config, Arc::new(NoopNotifier))?);
//! let courses: EntityStore<Course> = EntityStore::new(client.clone(), "courses");
//!
//! courses.load_page(0, 20).await?;
//! let created = courses.create(&NewCourse { name: "Algebra".into() }).await?;
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod notify;
pub mod store;

pub use api::{ApiClient, FilePart, HealthStatus, RequestExecutor, RequestOptions};
pub use cache::TtlCache;
pub use config::ApiConfig;
pub use error::ApiError;
pub use notify::{
  ConfirmGate, Notification, NotificationKind, Notifier, NoopNotifier, PresetGate,
  RecordingNotifier,
};
pub use store::{Entity, EntityStore, ItemState, OperationState, Page, PaginationState};
