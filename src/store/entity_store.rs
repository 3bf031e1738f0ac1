//! Generic paginated-collection and single-item state holder over one
//! [`ApiClient`], with single-flight mutation guards and optimistic update.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::entity::Entity;
use super::state::{ItemState, OperationState, Page, PaginationState};
use crate::api::client::{ApiClient, RequestOptions};
use crate::error::ApiError;

struct StoreState<T> {
  pagination: PaginationState<T>,
  item: ItemState<T>,
  create: OperationState,
  update: OperationState,
  delete: OperationState,
}

impl<T> Default for StoreState<T> {
  fn default() -> Self {
    Self {
      pagination: PaginationState::default(),
      item: ItemState::default(),
      create: OperationState::Idle,
      update: OperationState::Idle,
      delete: OperationState::Idle,
    }
  }
}

/// Collection + item manager for one entity endpoint (e.g. `"courses"`).
///
/// The store holds the authoritative in-memory copy after fetch; the server
/// remains the source of truth and is reconciled on every successful round
/// trip. All collection writes assign fresh values (copy-on-write), never
/// mutate entries in place.
pub struct EntityStore<T: Entity> {
  client: Arc<ApiClient>,
  endpoint: String,
  state: Mutex<StoreState<T>>,
}

impl<T: Entity> EntityStore<T> {
  pub fn new(client: Arc<ApiClient>, endpoint: impl Into<String>) -> Self {
    Self {
      client,
      endpoint: endpoint.into(),
      state: Mutex::new(StoreState::default()),
    }
  }

  // All state writes are whole-value swaps, so a poisoned lock cannot expose
  // a torn state; recover instead of propagating.
  fn lock_state(&self) -> MutexGuard<'_, StoreState<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Snapshot of the collection state.
  pub fn pagination(&self) -> PaginationState<T> {
    self.lock_state().pagination.clone()
  }

  /// Snapshot of the single-item state.
  pub fn item(&self) -> ItemState<T> {
    self.lock_state().item.clone()
  }

  pub fn create_state(&self) -> OperationState {
    self.lock_state().create.clone()
  }

  pub fn update_state(&self) -> OperationState {
    self.lock_state().update.clone()
  }

  pub fn delete_state(&self) -> OperationState {
    self.lock_state().delete.clone()
  }

  /// Load one page, replacing the collection state wholesale on success.
  ///
  /// Returns `Ok(None)` without touching the network if a page load is
  /// already in flight. On failure the previous page's data stays untouched
  /// and only the error field is set.
  pub async fn load_page(&self, page: u32, size: u32) -> Result<Option<Page<T>>, ApiError> {
    {
      let mut s = self.lock_state();
      if s.pagination.loading {
        debug!(endpoint = %self.endpoint, "page load already in flight");
        return Ok(None);
      }
      s.pagination.loading = true;
      s.pagination.error = None;
    }

    let query = [
      ("page", Some(page.to_string())),
      ("size", Some(size.to_string())),
    ];
    let result = self
      .client
      .get::<Page<T>>(&self.endpoint, &query, &RequestOptions::default())
      .await;

    let mut s = self.lock_state();
    match result {
      Ok(loaded) => {
        s.pagination = PaginationState {
          items: loaded.items.clone(),
          page: loaded.page,
          page_size: loaded.page_size,
          total_items: loaded.total_items,
          total_pages: loaded.total_pages,
          loading: false,
          error: None,
        };
        Ok(Some(loaded))
      }
      Err(err) => {
        s.pagination.loading = false;
        s.pagination.error = Some(err.to_string());
        Err(err)
      }
    }
  }

  /// Re-fetch the current page at the current page size.
  pub async fn refresh(&self) -> Result<Option<Page<T>>, ApiError> {
    let (page, size) = {
      let s = self.lock_state();
      (s.pagination.page, s.pagination.page_size)
    };
    self.load_page(page, size).await
  }

  /// Load one entity into the selected-item slot. Never touches the
  /// collection.
  pub async fn load_item(&self, id: &str) -> Result<Option<T>, ApiError> {
    {
      let mut s = self.lock_state();
      if s.item.loading {
        debug!(endpoint = %self.endpoint, id, "item load already in flight");
        return Ok(None);
      }
      s.item.loading = true;
      s.item.error = None;
    }

    let result = self
      .client
      .get::<T>(
        &format!("{}/{}", self.endpoint, id),
        &[],
        &RequestOptions::default(),
      )
      .await;

    let mut s = self.lock_state();
    match result {
      Ok(entity) => {
        s.item = ItemState {
          selected: Some(entity.clone()),
          loading: false,
          error: None,
        };
        Ok(Some(entity))
      }
      Err(err) => {
        s.item.loading = false;
        s.item.error = Some(err.to_string());
        Err(err)
      }
    }
  }

  /// Create an entity. The server's answer is prepended to the collection,
  /// bumps the total count, and becomes the selected item.
  ///
  /// Returns `Ok(None)` without touching the network if a create is already
  /// in flight.
  pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<Option<T>, ApiError> {
    {
      let mut s = self.lock_state();
      if s.create.is_in_flight() {
        debug!(endpoint = %self.endpoint, "create already in flight");
        return Ok(None);
      }
      s.create = OperationState::InFlight;
    }

    let result = self
      .client
      .post::<T, B>(&self.endpoint, body, &RequestOptions::default())
      .await;

    let mut s = self.lock_state();
    match result {
      Ok(entity) => {
        s.create = OperationState::Idle;
        let mut items = Vec::with_capacity(s.pagination.items.len() + 1);
        items.push(entity.clone());
        items.extend(s.pagination.items.iter().cloned());
        s.pagination.items = items;
        s.pagination.total_items += 1;
        s.item.selected = Some(entity.clone());
        Ok(Some(entity))
      }
      Err(err) => {
        s.create = OperationState::Failed(err.to_string());
        Err(err)
      }
    }
  }

  /// Update an entity; the server's answer is patched into the collection and
  /// the selected item by identifier.
  ///
  /// Returns `Ok(None)` without touching the network if an update is already
  /// in flight.
  pub async fn update<B: Serialize + ?Sized>(
    &self,
    id: &str,
    body: &B,
  ) -> Result<Option<T>, ApiError> {
    {
      let mut s = self.lock_state();
      if s.update.is_in_flight() {
        debug!(endpoint = %self.endpoint, id, "update already in flight");
        return Ok(None);
      }
      s.update = OperationState::InFlight;
    }

    let result = self
      .client
      .put::<T, B>(
        &format!("{}/{}", self.endpoint, id),
        body,
        &RequestOptions::default(),
      )
      .await;

    let mut s = self.lock_state();
    match result {
      Ok(entity) => {
        s.update = OperationState::Idle;
        Self::patch_state(&mut s, entity.clone());
        Ok(Some(entity))
      }
      Err(err) => {
        s.update = OperationState::Failed(err.to_string());
        Err(err)
      }
    }
  }

  /// Delete an entity, removing it from the collection and the selected-item
  /// slot.
  ///
  /// Returns `Ok(false)` without touching the network if a delete is already
  /// in flight.
  pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
    {
      let mut s = self.lock_state();
      if s.delete.is_in_flight() {
        debug!(endpoint = %self.endpoint, id, "delete already in flight");
        return Ok(false);
      }
      s.delete = OperationState::InFlight;
    }

    let result = self
      .client
      .delete::<Value>(&format!("{}/{}", self.endpoint, id), &RequestOptions::default())
      .await;

    let mut s = self.lock_state();
    match result {
      Ok(_) => {
        s.delete = OperationState::Idle;
        Self::remove_from_state(&mut s, id);
        Ok(true)
      }
      Err(err) => {
        s.delete = OperationState::Failed(err.to_string());
        Err(err)
      }
    }
  }

  /// Write an authoritative entity through to the collection and the selected
  /// item by identifier. The normal success side effect of optimistic remote
  /// operations.
  pub fn patch(&self, entity: T) {
    let mut s = self.lock_state();
    Self::patch_state(&mut s, entity);
  }

  /// Evict an entity locally by identifier, decrementing the total count.
  pub fn remove_local(&self, id: &str) {
    let mut s = self.lock_state();
    Self::remove_from_state(&mut s, id);
  }

  /// Reset all state to empty.
  pub fn clear(&self) {
    let mut s = self.lock_state();
    *s = StoreState::default();
  }

  /// Optimistic update: apply a pure mutator locally, then reconcile with the
  /// remote operation's answer or roll back.
  ///
  /// 1. Snapshot the entity by identifier from the collection (value and
  ///    position) and the selected item.
  /// 2. Apply `mutate` and write the result into both places immediately.
  /// 3. Await `remote`. On success its own side effects (normally a
  ///    [`Self::patch`] with the server's answer) are the final state.
  /// 4. On failure, write the snapshots back verbatim, record the error in
  ///    the update slot, and propagate the original error.
  ///
  /// If no local copy exists under `id`, the remote operation still runs;
  /// there is nothing to apply or roll back.
  pub async fn optimistic_update<R, M, Op, Fut>(
    &self,
    id: &str,
    mutate: M,
    remote: Op,
  ) -> Result<R, ApiError>
  where
    M: FnOnce(&T) -> T,
    Op: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, ApiError>>,
  {
    let (collection_snapshot, selected_snapshot) = {
      let s = self.lock_state();
      let in_collection = s
        .pagination
        .items
        .iter()
        .position(|e| e.id() == id)
        .map(|index| (index, s.pagination.items[index].clone()));
      let selected = s
        .item
        .selected
        .as_ref()
        .filter(|e| e.id() == id)
        .cloned();
      (in_collection, selected)
    };

    let base = collection_snapshot
      .as_ref()
      .map(|(_, entity)| entity)
      .or(selected_snapshot.as_ref());
    if let Some(base) = base {
      let next = mutate(base);
      self.patch(next);
    }

    match remote().await {
      Ok(value) => Ok(value),
      Err(err) => {
        let mut s = self.lock_state();
        if let Some((index, entity)) = collection_snapshot {
          let mut items: Vec<T> = s
            .pagination
            .items
            .iter()
            .filter(|e| e.id() != id)
            .cloned()
            .collect();
          items.insert(index.min(items.len()), entity);
          s.pagination.items = items;
        }
        if selected_snapshot.is_some() {
          s.item.selected = selected_snapshot;
        }
        // Record in the update slot, but never clobber an in-flight update's
        // guard.
        if !s.update.is_in_flight() {
          s.update = OperationState::Failed(err.to_string());
        }
        debug!(endpoint = %self.endpoint, id, "optimistic update rolled back");
        Err(err)
      }
    }
  }

  fn patch_state(s: &mut StoreState<T>, entity: T) {
    if s.pagination.items.iter().any(|e| e.id() == entity.id()) {
      s.pagination.items = s
        .pagination
        .items
        .iter()
        .map(|e| {
          if e.id() == entity.id() {
            entity.clone()
          } else {
            e.clone()
          }
        })
        .collect();
    }
    if s
      .item
      .selected
      .as_ref()
      .is_some_and(|e| e.id() == entity.id())
    {
      s.item.selected = Some(entity);
    }
  }

  fn remove_from_state(s: &mut StoreState<T>, id: &str) {
    if s.pagination.items.iter().any(|e| e.id() == id) {
      s.pagination.items = s
        .pagination
        .items
        .iter()
        .filter(|e| e.id() != id)
        .cloned()
        .collect();
      s.pagination.total_items = s.pagination.total_items.saturating_sub(1);
    }
    if s.item.selected.as_ref().is_some_and(|e| e.id() == id) {
      s.item.selected = None;
    }
  }
}
