//! Entity trait for store-managed records.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record with a stable identifier, suitable for management by an
/// [`crate::EntityStore`].
///
/// Identifiers are always strings: the response decoder normalizes numeric ids
/// on the way in, so equality checks and URL interpolation never depend on the
/// backend's numeric precision.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Stable identifier used for patch/remove addressing.
  fn id(&self) -> &str;

  /// Secondary identifier, when the backend exposes one.
  fn uuid(&self) -> Option<&str> {
    None
  }
}
