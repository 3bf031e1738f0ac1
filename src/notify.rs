//! Collaborator interfaces for user-facing feedback.
//!
//! The client reports errors through a [`Notifier`] so UI toast machinery stays
//! out of this layer; higher layers gate destructive operations through a
//! [`ConfirmGate`]. Both are traits so tests and headless consumers can plug in
//! their own.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
  Success,
  Error,
  Warning,
  Info,
}

/// Sink for user-facing notifications.
///
/// Implementations must not block the calling flow and must not panic; the
/// client calls this from inside its error paths.
pub trait Notifier: Send + Sync {
  fn notify(&self, kind: NotificationKind, title: &str, message: &str);
}

/// Notifier that discards everything. For headless consumers and tests that
/// don't care about notifications.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
  fn notify(&self, _kind: NotificationKind, _title: &str, _message: &str) {}
}

/// A captured notification.
#[derive(Debug, Clone)]
pub struct Notification {
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
}

/// Notifier that records everything it is told, for assertions in tests.
#[derive(Default)]
pub struct RecordingNotifier {
  events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drain and return everything recorded so far.
  pub fn take(&self) -> Vec<Notification> {
    let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::take(&mut *events)
  }

  /// Snapshot of everything recorded so far.
  pub fn events(&self) -> Vec<Notification> {
    self
      .events
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, kind: NotificationKind, title: &str, message: &str) {
    self
      .events
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Notification {
        kind,
        title: title.to_string(),
        message: message.to_string(),
      });
  }
}

/// Consent gate for destructive operations.
///
/// The store never calls this itself; operations built on the store are
/// expected to ask before deleting.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
  async fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Gate with a fixed answer. Useful in tests and batch tooling.
pub struct PresetGate {
  pub answer: bool,
}

#[async_trait]
impl ConfirmGate for PresetGate {
  async fn confirm(&self, _title: &str, _message: &str) -> bool {
    self.answer
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_recording_notifier_captures_in_order() {
    let notifier = RecordingNotifier::new();
    notifier.notify(NotificationKind::Error, "HTTP 500", "boom");
    notifier.notify(NotificationKind::Warning, "API warning", "deprecated");

    let events = notifier.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, NotificationKind::Error);
    assert_eq!(events[1].title, "API warning");
    assert!(notifier.take().is_empty());
  }

  #[tokio::test]
  async fn test_preset_gate_answers() {
    assert!(PresetGate { answer: true }.confirm("Delete?", "sure?").await);
    assert!(!PresetGate { answer: false }.confirm("Delete?", "sure?").await);
  }
}
