//! In-process document store.
//!
//! Same semantics as the hosted database for the subset the application
//! uses: equality/range filters, merge sets, must-exist updates and atomic
//! batches. Used by the test suites and for offline demos.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use serde_json::Value;

use super::{Document, DocumentStore, Fields, Filter, FilterOp, StoreError, Write};

type Collection = BTreeMap<String, Fields>;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    offline: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of successful batches committed so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(AtomicOrdering::SeqCst)
    }

    /// Insert a document directly, bypassing the write counter.
    pub fn seed(&self, collection: &str, id: &str, fields: Fields) {
        let mut collections = self.lock();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Read a document's raw fields without going through the async API.
    pub fn raw(&self, collection: &str, id: &str) -> Option<Fields> {
        self.lock()
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Collection>> {
        // A poisoned lock only means another test thread panicked mid-write
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    fn matches(fields: &Fields, filter: &Filter) -> bool {
        let Some(value) = fields.get(&filter.field) else {
            return false;
        };
        match (filter.op, Self::compare(value, &filter.value)) {
            (FilterOp::Eq, Some(Ordering::Equal)) => true,
            (FilterOp::Gte, Some(Ordering::Greater | Ordering::Equal)) => true,
            (FilterOp::Lte, Some(Ordering::Less | Ordering::Equal)) => true,
            _ => false,
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_online()?;
        Ok(self
            .raw(collection, id)
            .map(|fields| Document::new(id, fields)))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let collections = self.lock();
        Ok(collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let collections = self.lock();
        let Some(c) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(c.iter()
            .filter(|(_, fields)| filters.iter().all(|f| Self::matches(fields, f)))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.check_online()?;
        let mut collections = self.lock();

        // Validate the whole batch before applying anything
        for write in &writes {
            if let Write::Update { collection, id, .. } = write {
                let exists = collections
                    .get(collection)
                    .map(|c| c.contains_key(id))
                    .unwrap_or(false);
                if !exists {
                    return Err(StoreError::NotFound(format!("{}/{}", collection, id)));
                }
            }
        }

        for write in writes {
            match write {
                Write::Set {
                    collection,
                    id,
                    fields,
                    merge,
                } => {
                    let c = collections.entry(collection).or_default();
                    if merge {
                        if let Some(existing) = c.get_mut(&id) {
                            existing.extend(fields);
                            continue;
                        }
                    }
                    c.insert(id, fields);
                }
                Write::Update {
                    collection,
                    id,
                    fields,
                } => {
                    if let Some(existing) = collections.get_mut(&collection).and_then(|c| c.get_mut(&id)) {
                        existing.extend(fields);
                    }
                }
                Write::Delete { collection, id } => {
                    if let Some(c) = collections.get_mut(&collection) {
                        c.remove(&id);
                    }
                }
            }
        }

        self.commits.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}
