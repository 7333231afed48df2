//! Session-keyed holding area for display pivots awaiting CSV download.
//!
//! Each request stores its table under its own session id, so a download
//! always returns the table that session produced. The store is bounded and
//! evicts the least recently stored session first. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::logging::backend_info;
use crate::pivot::DisplayPivotTable;

#[derive(Debug, Clone)]
pub struct StoredPivot {
    pub table: DisplayPivotTable,
    pub stored_at: DateTime<Utc>,
}

pub struct PivotStore {
    capacity: usize,
    inner: Mutex<HashMap<String, StoredPivot>>,
}

impl PivotStore {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(HashMap::new()) }
    }

    /// Store (or replace) the table for `session`.
    pub fn put(&self, session: &str, table: DisplayPivotTable) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if !map.contains_key(session) && map.len() >= self.capacity {
            let oldest = map
                .iter()
                .min_by_key(|(_, p)| p.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                backend_info(format!("Evicting stored pivot for session {}", oldest));
                map.remove(&oldest);
            }
        }

        map.insert(session.to_string(), StoredPivot { table, stored_at: Utc::now() });
    }

    pub fn get(&self, session: &str) -> Option<StoredPivot> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(session).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fresh opaque session id for callers that did not bring one.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::{build_pivot, collapse_for_display};
    use crate::record::FlatRecord;

    fn table(location: &str) -> DisplayPivotTable {
        collapse_for_display(&build_pivot(&[FlatRecord::summary(location, "AV", "20", "A")]))
    }

    #[test]
    fn test_sessions_do_not_overwrite_each_other() {
        let store = PivotStore::new(8);
        store.put("s1", table("A"));
        store.put("s2", table("B"));
        assert_eq!(store.get("s1").unwrap().table.rows[0].location, "A");
        assert_eq!(store.get("s2").unwrap().table.rows[0].location, "B");
        assert!(store.get("s3").is_none());
    }

    #[test]
    fn test_same_session_is_replaced() {
        let store = PivotStore::new(8);
        store.put("s1", table("A"));
        store.put("s1", table("B"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().table.rows[0].location, "B");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = PivotStore::new(2);
        store.put("s1", table("A"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.put("s2", table("B"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.put("s3", table("C"));
        assert_eq!(store.len(), 2);
        assert!(store.get("s1").is_none());
        assert!(store.get("s2").is_some());
        assert!(store.get("s3").is_some());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
        assert!(PivotStore::new(0).is_empty());
    }
}
