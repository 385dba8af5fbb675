//! Contract of the ordered key-value store scans and deletes run against.
//!
//! A store exposes cursors over byte keys in strictly increasing order. "Not
//! found" is reported as `Ok(false)` and ends an interval; only backend
//! failures are errors.

mod mem;

use bytes::Bytes;
use thiserror::Error;

pub use mem::{MemCursor, MemStore, MemStoreStats};

/// How [`StoreCursor::find`] positions the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Only the key itself.
    Exact,
    /// The first key greater than or equal to the probe.
    GreaterEqual,
    /// The first key strictly greater than the probe.
    Greater,
}

/// Failure reported by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A positional operation was issued on a cursor with no current entry.
    #[error("cursor is not positioned on an entry")]
    Unpositioned,
    /// The backend failed.
    #[error("backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// An ordered map from byte keys to byte values.
///
/// Implementations must serialize structural mutations themselves; readers on
/// different threads may share one store.
pub trait OrderedStore {
    /// Cursor type borrowing the store.
    type Cursor<'a>: StoreCursor
    where
        Self: 'a;

    /// Open an unpositioned cursor.
    fn cursor(&self) -> Result<Self::Cursor<'_>, StoreError>;

    /// Insert or overwrite one entry.
    fn insert(&self, key: Vec<u8>, value: Bytes) -> Result<(), StoreError>;

    /// Remove one entry, returning whether it existed.
    fn remove(&self, key: &[u8]) -> Result<bool, StoreError>;
}

/// A forward cursor over an [`OrderedStore`].
pub trait StoreCursor {
    /// Position on the entry selected by `mode`; `false` when there is none.
    fn find(&mut self, key: &[u8], mode: MatchMode) -> Result<bool, StoreError>;

    /// Step to the next entry; `false` at end of store.
    fn move_next(&mut self) -> Result<bool, StoreError>;

    /// Key of the current entry.
    fn key(&self) -> Option<&[u8]>;

    /// Value of the current entry, fetched on demand.
    fn value(&mut self) -> Result<Bytes, StoreError>;

    /// Remove the current entry. The cursor stays usable for
    /// [`move_next`](Self::move_next).
    fn erase(&mut self) -> Result<bool, StoreError>;
}
