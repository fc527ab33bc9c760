//! Local caching layer.
//!
//! Remote reads are expensive and the school network is unreliable, so most
//! reads go through `CacheManager::read_through`. Each namespace (`kinds`)
//! declares its own key prefix and lifetime, and every write declares which
//! entries it makes stale (`invalidate`).
//!
//! The cache also owns the always-on attendance draft slot, which survives a
//! crash or a closed terminal until the sheet is saved or discarded.

pub mod clock;
pub mod invalidate;
pub mod kinds;
pub mod manager;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use invalidate::{Invalidation, Mutation};
pub use kinds::CacheKind;
pub use manager::{CacheEntry, CacheManager, NamespaceStatus, DRAFT_KEY};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};
