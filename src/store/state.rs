//! Store state: paginated collection, selected item, and per-mutation
//! operation state.

use serde::{Deserialize, Serialize};

/// One page of entities as the backend serializes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page: u32,
  pub page_size: u32,
  pub total_items: u64,
  pub total_pages: u32,
}

/// Collection state. Replaced wholesale on every successful page load; a
/// failed load records its error and leaves the previous page untouched.
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
  pub items: Vec<T>,
  pub page: u32,
  pub page_size: u32,
  pub total_items: u64,
  pub total_pages: u32,
  pub loading: bool,
  pub error: Option<String>,
}

impl<T> Default for PaginationState<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      page: 0,
      page_size: 20,
      total_items: 0,
      total_pages: 0,
      loading: false,
      error: None,
    }
  }
}

impl<T> PaginationState<T> {
  pub fn has_next_page(&self) -> bool {
    self.page + 1 < self.total_pages
  }
}

/// Single-item state, independent of the collection.
#[derive(Debug, Clone)]
pub struct ItemState<T> {
  pub selected: Option<T>,
  pub loading: bool,
  pub error: Option<String>,
}

impl<T> Default for ItemState<T> {
  fn default() -> Self {
    Self {
      selected: None,
      loading: false,
      error: None,
    }
  }
}

/// State of one mutation kind. The tri-state makes "in flight with a stale
/// error" unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperationState {
  #[default]
  Idle,
  InFlight,
  Failed(String),
}

impl OperationState {
  pub fn is_in_flight(&self) -> bool {
    matches!(self, Self::InFlight)
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      Self::Failed(message) => Some(message),
      _ => None,
    }
  }
}
