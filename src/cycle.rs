use serde_json::{Map, Value};

use crate::record::{UpdateMap, UpdateRecord};

/// Gap after which a notification is taken to start a new scan cycle.
pub const QUIET_INTERVAL_MS: i64 = 60 * 60 * 1000;

/// What [`record_update`] did to the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Key the record was stored under.
    pub image: String,
    /// Whether the previous cycle was discarded first.
    pub cycle_reset: bool,
    /// Whether an existing record for the same image was replaced.
    pub replaced: bool,
}

/// Returns true if a notification arriving at `now` belongs to a new cycle.
///
/// An empty map never needs a reset. The gap must strictly exceed
/// [`QUIET_INTERVAL_MS`].
pub fn starts_new_cycle(updates: &UpdateMap, now: i64) -> bool {
    match updates.most_recent_detected_at() {
        Some(most_recent) => now.saturating_sub(most_recent) > QUIET_INTERVAL_MS,
        None => false,
    }
}

/// Apply one webhook payload to the map.
///
/// Drops every record when the payload opens a new scan cycle, then upserts
/// the payload's record stamped with `now`.
pub fn record_update(
    updates: &mut UpdateMap,
    payload: &Map<String, Value>,
    now: i64,
) -> RecordOutcome {
    let cycle_reset = starts_new_cycle(updates, now);
    if cycle_reset {
        updates.clear();
    }

    let (image, record) = UpdateRecord::from_payload(payload, now);
    let replaced = updates.upsert(image.clone(), record).is_some();

    RecordOutcome {
        image,
        cycle_reset,
        replaced,
    }
}
