//! Remote document store access.
//!
//! The school data lives in a hosted document database. This module defines
//! the `DocumentStore` seam the services are written against, plus two
//! implementations:
//!
//! - `FirestoreClient`: REST client for the hosted database
//! - `MemoryStore`: in-process store used by tests and offline demos
//!
//! Reads are equality/range filters, writes are atomic batches.

pub mod error;
pub mod firestore;
pub mod memory;
mod value;

use std::future::Future;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub use error::StoreError;
pub use firestore::FirestoreClient;
pub use memory::MemoryStore;

/// Collection names used by the application.
pub mod collections {
    pub const CLASSES: &str = "kelas";
    pub const STUDENTS: &str = "siswa";
    pub const MEMBERSHIPS: &str = "anggota_kelas";
    pub const SHEETS: &str = "rekap_absensi";
    pub const USERS: &str = "users";
    pub const SETTINGS: &str = "pengaturan";

    /// Singleton document inside `SETTINGS`.
    pub const SCHOOL_SETTINGS_ID: &str = "sekolah";
}

/// Length of generated document ids
const AUTO_ID_LENGTH: usize = 20;

pub type Fields = Map<String, Value>;

/// A document as returned by the store: its id plus top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decode the fields into a model. The document id is exposed to the
    /// model as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields
            .entry("id".to_string())
            .or_insert_with(|| Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|source| StoreError::Decode {
            id: self.id.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// A single field condition. Multiple filters on one query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Lte,
            value: value.into(),
        }
    }
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or overwrite. With `merge`, only the given top-level fields are replaced.
    Set {
        collection: String,
        id: String,
        fields: Fields,
        merge: bool,
    },
    /// Patch the given fields; the document must already exist.
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl Write {
    pub fn set<T: Serialize>(collection: &str, id: &str, value: &T, merge: bool) -> Result<Self, StoreError> {
        Ok(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields: to_fields(id, value)?,
            merge,
        })
    }

    pub fn update(collection: &str, id: &str, fields: Fields) -> Self {
        Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }
    }

    pub fn delete(collection: &str, id: &str) -> Self {
        Write::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn target(&self) -> (&str, &str) {
        match self {
            Write::Set { collection, id, .. }
            | Write::Update { collection, id, .. }
            | Write::Delete { collection, id } => (collection, id),
        }
    }
}

/// Serialize a model into top-level document fields. The document id lives
/// in the document path, so an `id` field is never written.
pub fn to_fields<T: Serialize>(id: &str, value: &T) -> Result<Fields, StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Decode {
        id: id.to_string(),
        source,
    })?;
    match value {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::InvalidResponse(format!(
            "document {} must serialize to an object, got {}",
            id, other
        ))),
    }
}

/// Decode every document of a read into models.
pub fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Result<Vec<T>, StoreError> {
    docs.iter().map(Document::decode).collect()
}

/// Build a field map for partial updates.
pub fn fields<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Fields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Generate a random document id in the same shape the hosted store uses.
pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Access to the remote document database.
///
/// Every write goes through `commit` so multi-document changes are atomic:
/// either the whole batch lands or none of it does.
pub trait DocumentStore: Send + Sync {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    fn list(&self, collection: &str) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    fn commit(&self, writes: Vec<Write>) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn new_id(&self) -> String {
        auto_id()
    }
}
