//! Domain logic for tracking Diun image update notifications.
//!
//! Notifications that arrive close together form one scan cycle. When a
//! notification arrives more than [`cycle::QUIET_INTERVAL_MS`] after the most
//! recent one, the previous cycle's records are dropped before the new one is
//! stored. Persistence and HTTP live in `diun-tracker-cli`; everything here is
//! plain data in, plain data out.

pub mod clock;
pub mod cycle;
pub mod error;
pub mod query;
pub mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cycle::{record_update, RecordOutcome, QUIET_INTERVAL_MS};
pub use error::PayloadError;
pub use query::{sorted_updates, summarize, Summary, NO_UPDATES_MESSAGE};
pub use record::{parse_payload, UpdateMap, UpdateRecord, UNKNOWN_IMAGE};
