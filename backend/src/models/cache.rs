use serde::{Deserialize, Serialize};

/// Envelope stored under every cache key: the payload plus its write time in
/// epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now_ms: i64) -> Self {
        Self {
            data,
            timestamp: now_ms,
        }
    }
}

/// Timestamp-only view of an entry, used when the payload type does not matter.
#[derive(Debug, Deserialize)]
pub struct EntryStamp {
    pub timestamp: i64,
}

impl EntryStamp {
    pub fn is_fresh(&self, now_ms: i64, max_age_ms: i64) -> bool {
        now_ms - self.timestamp < max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_is_exclusive_at_max_age() {
        let stamp: EntryStamp =
            serde_json::from_str(r#"{"data":{"nested":true},"timestamp":1000}"#).unwrap();
        assert!(stamp.is_fresh(1_999, 1_000));
        assert!(!stamp.is_fresh(2_000, 1_000));
    }

    #[test]
    fn serialises_as_data_timestamp_envelope() {
        let entry = CacheEntry::new(vec![1, 2], 42);
        let raw = serde_json::to_string(&entry).unwrap();
        assert_eq!(raw, r#"{"data":[1,2],"timestamp":42}"#);
    }
}
