//! Event trait implemented by domain event payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A domain event carried over the broker.
///
/// Payloads are JSON-encoded on the wire. `event_id` is a human-readable
/// identity used in logs and for duplicate detection on the consuming side;
/// it should be stable across redeliveries of the same logical event.
pub trait Event: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable identity of this event, e.g. `"check-answer:user-1:quiz-9"`.
    fn event_id(&self) -> String;
}
