//! Cross-tab change records.
//!
//! After a local write the full snapshot is written to a well-known slot as
//! `{"timestamp": <ms>, "data": {...}}`. Browsers announce that write to every other context on
//! the same origin, but only when the slot text changes; each record is therefore stamped past
//! the one it replaces. Receivers decode it back into the snapshot.

use serde::{Deserialize, Serialize};

use crate::{local_store::Snapshot, time::next_change_stamp};

/// Text written to the cross-tab signal slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Forces the slot text to differ from the previous write.
    pub timestamp: u64,
    /// Full resulting mapping.
    pub data: Snapshot,
}

/// Reads the stamp of the record currently in the slot, if it parses.
pub fn previous_stamp(current: Option<&str>) -> Option<u64> {
    serde_json::from_str::<ChangeRecord>(current?)
        .ok()
        .map(|record| record.timestamp)
}

/// Encodes the record replacing `current` in the slot, stamped at `now_ms` or just past the
/// replaced record, whichever is later.
///
/// # Errors
///
/// Returns an error when the snapshot cannot be serialized.
pub fn encode_change_record(
    snapshot: &Snapshot,
    current: Option<&str>,
    now_ms: u64,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ChangeRecord {
        timestamp: next_change_stamp(now_ms, previous_stamp(current)),
        data: snapshot.clone(),
    })
}

/// Decodes a storage change into a snapshot if it targets `broadcast_key` and carries a valid
/// record. Removals and foreign keys yield `None`.
pub fn decode_change_record(
    broadcast_key: &str,
    key: &str,
    new_value: Option<&str>,
) -> Option<Snapshot> {
    if key != broadcast_key {
        return None;
    }
    let raw = new_value?;
    match serde_json::from_str::<ChangeRecord>(raw) {
        Ok(record) => Some(record.data),
        Err(err) => {
            tracing::warn!(key, "discarding malformed change record: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identical_snapshots_in_one_millisecond_still_encode_to_distinct_text() {
        let empty = Snapshot::new();
        let first = encode_change_record(&empty, None, 1_000).expect("encode");
        let second = encode_change_record(&empty, Some(&first), 1_000).expect("encode");
        let third = encode_change_record(&empty, Some(&second), 1_000).expect("encode");

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(previous_stamp(Some(&third)), Some(1_002));
    }

    #[test]
    fn unreadable_slot_content_does_not_block_stamping() {
        let empty = Snapshot::new();
        let raw = encode_change_record(&empty, Some("{garbage"), 77).expect("encode");
        assert_eq!(previous_stamp(Some(&raw)), Some(77));
        assert_eq!(previous_stamp(None), None);
    }

    #[test]
    fn decode_accepts_only_the_signal_slot() {
        let snapshot = json!({"x": 1}).as_object().cloned().expect("object");
        let raw = encode_change_record(&snapshot, None, 1).expect("encode");

        assert_eq!(
            decode_change_record("signal", "signal", Some(&raw)),
            Some(snapshot)
        );
        assert_eq!(decode_change_record("signal", "other", Some(&raw)), None);
        assert_eq!(decode_change_record("signal", "signal", None), None);
        assert_eq!(decode_change_record("signal", "signal", Some("{bad")), None);
    }
}
