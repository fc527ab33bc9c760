use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::invalidate::{Invalidation, Mutation};
use super::kinds::{
    CacheKind, ClassList, ClassRoster, LoginSession, MonthlyCache, NisCheck, ProfileCache,
    SettingsCache, SheetCache, UserList,
};
use super::storage::{KeyValueStore, StorageError};
use crate::models::AttendanceSheet;

/// Storage key of the in-progress attendance sheet.
pub const DRAFT_KEY: &str = "absensi_draft";

const MINUTE_MS: i64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Lifetime in milliseconds, overriding the namespace default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl<T> CacheEntry<T> {
    pub fn age_minutes(&self, now_ms: i64) -> i64 {
        (now_ms - self.timestamp) / MINUTE_MS
    }

    pub fn age_display(&self, now_ms: i64) -> String {
        let minutes = self.age_minutes(now_ms);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    /// Fresh iff `now - timestamp <= ttl`. Without any ttl the entry never expires.
    pub fn is_fresh(&self, now_ms: i64, default_ttl: Option<Duration>) -> bool {
        let ttl = self
            .ttl
            .or_else(|| default_ttl.map(|d| d.as_millis() as u64));
        match ttl {
            Some(ttl) => now_ms - self.timestamp <= ttl as i64,
            None => true,
        }
    }
}

/// Summary of one cache namespace for `absensi cache status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceStatus {
    pub name: &'static str,
    pub prefix: &'static str,
    pub entries: usize,
    pub newest: Option<String>,
}

/// Typed, TTL-aware cache over a `KeyValueStore`.
///
/// Storage failures never reach callers: a failed write is logged and the
/// value is simply not cached, a failed read counts as a miss.
#[derive(Clone)]
pub struct CacheManager {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    fn full_key<K: CacheKind>(key: &str) -> String {
        format!("{}{}", K::PREFIX, key)
    }

    fn read_raw(&self, full_key: &str) -> Option<String> {
        match self.storage.get(full_key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = full_key, error = %e, "Cache read failed");
                None
            }
        }
    }

    fn write_raw(&self, full_key: &str, contents: &str) {
        if let Err(e) = self.storage.set(full_key, contents) {
            warn!(key = full_key, error = %e, "Cache write failed");
        }
    }

    fn remove_raw(&self, full_key: &str) {
        if let Err(e) = self.storage.remove(full_key) {
            warn!(key = full_key, error = %e, "Cache remove failed");
        }
    }

    fn load_entry<T: DeserializeOwned>(&self, full_key: &str) -> Option<CacheEntry<T>> {
        let raw = self.read_raw(full_key)?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(key = full_key, error = %e, "Dropping corrupt cache entry");
                self.remove_raw(full_key);
                None
            }
        }
    }

    pub fn get<K: CacheKind>(&self, key: &str) -> Option<K::Value> {
        let full_key = Self::full_key::<K>(key);
        let entry = self.load_entry::<K::Value>(&full_key)?;
        if entry.is_fresh(self.clock.now_millis(), K::TTL) {
            debug!(key = %full_key, "Cache hit");
            Some(entry.data)
        } else {
            debug!(key = %full_key, "Cache entry expired");
            self.remove_raw(&full_key);
            None
        }
    }

    pub fn set<K: CacheKind>(&self, key: &str, value: &K::Value) {
        self.store::<K>(key, value, None);
    }

    pub fn set_with_ttl<K: CacheKind>(&self, key: &str, value: &K::Value, ttl: Duration) {
        self.store::<K>(key, value, Some(ttl.as_millis() as u64));
    }

    fn store<K: CacheKind>(&self, key: &str, value: &K::Value, ttl: Option<u64>) {
        let full_key = Self::full_key::<K>(key);
        let entry = CacheEntry {
            data: value,
            timestamp: self.clock.now_millis(),
            ttl,
        };
        match serde_json::to_string(&entry) {
            Ok(contents) => self.write_raw(&full_key, &contents),
            Err(e) => warn!(key = %full_key, error = %StorageError::from(e), "Cache write failed"),
        }
    }

    pub fn remove<K: CacheKind>(&self, key: &str) {
        self.remove_raw(&Self::full_key::<K>(key));
    }

    /// Drop every entry of a namespace.
    pub fn clear<K: CacheKind>(&self) {
        self.clear_prefix(K::PREFIX);
    }

    pub fn clear_prefix(&self, prefix: &str) {
        for key in self.keys_with_prefix(prefix) {
            self.remove_raw(&key);
        }
    }

    /// Drop every cached entry, the draft included.
    pub fn clear_all(&self) {
        self.clear_prefix("");
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.storage.keys() {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(prefix)).collect(),
            Err(e) => {
                warn!(prefix, error = %e, "Cache key listing failed");
                Vec::new()
            }
        }
    }

    /// Serve from cache unless `force_refresh`, otherwise fetch and cache the
    /// result. Fetch errors propagate and leave the cache untouched.
    pub async fn read_through<K, F, Fut, E>(
        &self,
        key: &str,
        force_refresh: bool,
        fetch: F,
    ) -> Result<K::Value, E>
    where
        K: CacheKind,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<K::Value, E>>,
    {
        if !force_refresh {
            if let Some(value) = self.get::<K>(key) {
                return Ok(value);
            }
        }
        debug!(namespace = K::NAME, key, force_refresh, "Cache miss, fetching");
        let value = fetch().await?;
        self.set::<K>(key, &value);
        Ok(value)
    }

    pub fn invalidate(&self, mutation: &Mutation) {
        for invalidation in mutation.invalidations() {
            debug!(?invalidation, "Invalidating cache");
            match invalidation {
                Invalidation::Key(key) => self.remove_raw(&key),
                Invalidation::Prefix(prefix) => self.clear_prefix(prefix),
            }
        }
    }

    // ===== Draft =====

    pub fn load_draft(&self) -> Option<AttendanceSheet> {
        let raw = self.read_raw(DRAFT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(sheet) => Some(sheet),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable attendance draft");
                self.remove_raw(DRAFT_KEY);
                None
            }
        }
    }

    pub fn save_draft(&self, sheet: &AttendanceSheet) {
        match serde_json::to_string(sheet) {
            Ok(contents) => self.write_raw(DRAFT_KEY, &contents),
            Err(e) => warn!(error = %e, "Failed to serialize attendance draft"),
        }
    }

    pub fn clear_draft(&self) {
        self.remove_raw(DRAFT_KEY);
    }

    /// Clear the draft only if it belongs to the given sheet.
    pub fn clear_draft_for(&self, doc_id: &str) {
        if self.load_draft().is_some_and(|d| d.doc_id() == doc_id) {
            self.clear_draft();
        }
    }

    pub fn has_draft(&self) -> bool {
        self.read_raw(DRAFT_KEY).is_some()
    }

    // ===== Cache report =====

    pub fn age_display<K: CacheKind>(&self, key: &str) -> Option<String> {
        self.load_entry::<serde_json::Value>(&Self::full_key::<K>(key))
            .map(|entry| entry.age_display(self.clock.now_millis()))
    }

    fn namespace_status<K: CacheKind>(&self) -> NamespaceStatus {
        let keys = self.keys_with_prefix(K::PREFIX);
        let newest = keys
            .iter()
            .filter_map(|k| self.load_entry::<serde_json::Value>(k))
            .max_by_key(|entry| entry.timestamp)
            .map(|entry| entry.age_display(self.clock.now_millis()));
        NamespaceStatus {
            name: K::NAME,
            prefix: K::PREFIX,
            entries: keys.len(),
            newest,
        }
    }

    pub fn status(&self) -> Vec<NamespaceStatus> {
        vec![
            self.namespace_status::<ClassList>(),
            self.namespace_status::<ClassRoster>(),
            self.namespace_status::<NisCheck>(),
            self.namespace_status::<UserList>(),
            self.namespace_status::<ProfileCache>(),
            self.namespace_status::<LoginSession>(),
            self.namespace_status::<SettingsCache>(),
            self.namespace_status::<SheetCache>(),
            self.namespace_status::<MonthlyCache>(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::kinds::ALL;
    use crate::cache::storage::MemoryStorage;
    use crate::models::{RosterMember, SchoolClass};
    use chrono::{DateTime, NaiveDate};

    fn setup() -> (CacheManager, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp_millis(1_710_000_000_000).unwrap(),
        ));
        let cache = CacheManager::with_clock(storage.clone(), clock.clone());
        (cache, storage, clock)
    }

    fn class(id: &str) -> SchoolClass {
        SchoolClass {
            id: id.to_string(),
            name: id.to_string(),
            special: false,
        }
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, storage, clock) = setup();
        cache.set::<ClassRoster>("XA", &vec![]);
        clock.advance(Duration::from_secs(15 * 60));
        assert_eq!(cache.get::<ClassRoster>("XA"), Some(vec![]));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get::<ClassRoster>("XA"), None);
        // Removed on read
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_entry_ttl_overrides_default() {
        let (cache, _, clock) = setup();
        cache.set_with_ttl::<ClassList>(ALL, &vec![class("XA")], Duration::from_secs(60));
        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.get::<ClassList>(ALL), None);
    }

    #[test]
    fn test_sheets_never_expire() {
        let (cache, _, clock) = setup();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let sheet = AttendanceSheet::seed(date, "XA", &[]);
        cache.set::<SheetCache>(&sheet.doc_id(), &sheet);
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(cache.get::<SheetCache>(&sheet.doc_id()), Some(sheet));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_removed() {
        let (cache, storage, _) = setup();
        storage.set("kelas_all", "{not json").unwrap();
        assert_eq!(cache.get::<ClassList>(ALL), None);
        assert_eq!(storage.get("kelas_all").unwrap(), None);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let storage = Arc::new(MemoryStorage::with_quota(8));
        let cache = CacheManager::new(storage.clone());
        cache.set::<ClassList>(ALL, &vec![class("XA")]);
        assert_eq!(cache.get::<ClassList>(ALL), None);
    }

    #[test]
    fn test_clear_namespace_keeps_others() {
        let (cache, storage, _) = setup();
        cache.set::<ClassRoster>("XA", &vec![]);
        cache.set::<ClassRoster>("XB", &vec![]);
        cache.set::<NisCheck>("1001", &true);
        cache.clear::<ClassRoster>();
        assert_eq!(storage.keys().unwrap(), vec!["nis_1001"]);
    }

    #[test]
    fn test_invalidate_applies_table() {
        let (cache, storage, _) = setup();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let sheet = AttendanceSheet::seed(date, "XA", &[]);
        cache.set::<SheetCache>(&sheet.doc_id(), &sheet);
        cache.set::<MonthlyCache>("XA_2024-03", &vec![sheet.clone()]);
        cache.set::<MonthlyCache>("XB_2024-03", &vec![]);

        cache.invalidate(&Mutation::SheetLocked {
            date,
            class_id: "XA".into(),
        });
        assert_eq!(storage.keys().unwrap(), vec!["monthly_XB_2024-03"]);
    }

    #[tokio::test]
    async fn test_read_through_fetches_once() {
        let (cache, _, _) = setup();
        let member = RosterMember {
            id: "S1".into(),
            name: "Ana".into(),
            nis: "1".into(),
        };

        let first: Result<_, String> = cache
            .read_through::<ClassRoster, _, _, _>("XA", false, || async { Ok(vec![member.clone()]) })
            .await;
        assert_eq!(first.unwrap().len(), 1);

        let second: Result<_, String> = cache
            .read_through::<ClassRoster, _, _, _>("XA", false, || async {
                Err("should not fetch".to_string())
            })
            .await;
        assert_eq!(second.unwrap().len(), 1);

        let forced: Result<Vec<RosterMember>, String> = cache
            .read_through::<ClassRoster, _, _, _>("XA", true, || async { Err("offline".to_string()) })
            .await;
        assert_eq!(forced.unwrap_err(), "offline");
        // Failed fetch keeps the old entry
        assert!(cache.get::<ClassRoster>("XA").is_some());
    }

    #[test]
    fn test_draft_slot() {
        let (cache, storage, _) = setup();
        assert!(cache.load_draft().is_none());
        let sheet = AttendanceSheet::seed(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "XA", &[]);
        cache.save_draft(&sheet);
        assert!(cache.has_draft());
        assert_eq!(cache.load_draft(), Some(sheet));
        cache.clear_draft();
        assert!(cache.load_draft().is_none());

        storage.set(DRAFT_KEY, "garbage").unwrap();
        assert!(cache.load_draft().is_none());
        assert!(!cache.has_draft());
    }

    #[test]
    fn test_clear_draft_for_other_sheet_keeps_draft() {
        let (cache, _, _) = setup();
        let sheet = AttendanceSheet::seed(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "XA", &[]);
        cache.save_draft(&sheet);

        cache.clear_draft_for("2024-03-02_XA");
        assert_eq!(cache.load_draft(), Some(sheet));

        cache.clear_draft_for("2024-03-01_XA");
        assert!(!cache.has_draft());
    }

    #[test]
    fn test_age_display() {
        let entry = CacheEntry {
            data: (),
            timestamp: 0,
            ttl: None,
        };
        assert_eq!(entry.age_display(30_000), "just now");
        assert_eq!(entry.age_display(5 * MINUTE_MS), "5m ago");
        assert_eq!(entry.age_display(90 * MINUTE_MS), "2h ago");
        assert_eq!(entry.age_display(80 * MINUTE_MS), "1h ago");
        assert_eq!(entry.age_display(1500 * MINUTE_MS), "1d ago");
        // Skew
        assert_eq!(entry.age_display(-MINUTE_MS * 3), "just now");
    }

    #[test]
    fn test_status_reports_counts_and_age() {
        let (cache, _, clock) = setup();
        cache.set::<ClassRoster>("XA", &vec![]);
        clock.advance(Duration::from_secs(5 * 60));
        cache.set::<ClassRoster>("XB", &vec![]);
        clock.advance(Duration::from_secs(2 * 60));

        let status = cache.status();
        let rosters = status.iter().find(|s| s.prefix == "roster_").unwrap();
        assert_eq!(rosters.entries, 2);
        assert_eq!(rosters.newest.as_deref(), Some("2m ago"));
        let users = status.iter().find(|s| s.prefix == "users_").unwrap();
        assert_eq!(users.entries, 0);
        assert_eq!(users.newest, None);
        assert_eq!(cache.age_display::<ClassRoster>("XA").as_deref(), Some("7m ago"));
    }
}
