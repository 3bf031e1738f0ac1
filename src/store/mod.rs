//! Generic entity store: paginated collections, single-item state, CRUD
//! lifecycle guards, and optimistic mutation with rollback.

mod entity;
mod entity_store;
mod state;

pub use entity::Entity;
pub use entity_store::EntityStore;
pub use state::{ItemState, OperationState, Page, PaginationState};
