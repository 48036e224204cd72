use std::cmp::Reverse;

use serde::Serialize;

use crate::record::{UpdateMap, UpdateRecord};

pub const NO_UPDATES_MESSAGE: &str = "No updates available";

const UNKNOWN_FIELD: &str = "Unknown";

/// Every record, newest `detected_at` first.
///
/// Ties go to the record inserted earlier in the cycle, then to the image key,
/// so the order survives a save/load round trip.
pub fn sorted_updates(updates: &UpdateMap) -> Vec<&UpdateRecord> {
    let mut entries: Vec<(&String, &UpdateRecord)> = updates.iter().collect();
    entries.sort_by_key(|(image, record)| (Reverse(record.detected_at), record.seq, *image));
    entries.into_iter().map(|(_, record)| record).collect()
}

/// Response body of the summary endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary {
    Empty {
        total: usize,
        latest: &'static str,
    },
    Latest {
        total: usize,
        latest_image: String,
        latest_status: String,
        latest_timestamp: i64,
    },
}

pub fn summarize(updates: &UpdateMap) -> Summary {
    let sorted = sorted_updates(updates);
    let Some(latest) = sorted.first() else {
        return Summary::Empty {
            total: 0,
            latest: NO_UPDATES_MESSAGE,
        };
    };

    Summary::Latest {
        total: sorted.len(),
        latest_image: latest
            .image
            .clone()
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
        latest_status: latest
            .status
            .clone()
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
        latest_timestamp: latest.detected_at,
    }
}
