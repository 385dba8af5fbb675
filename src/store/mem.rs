use std::{
    ops::Bound,
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;
use crossbeam_skiplist::{map::Entry, SkipMap};

use super::{MatchMode, OrderedStore, StoreCursor, StoreError};

/// Counters maintained by [`MemStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStoreStats {
    /// Entries currently stored.
    pub entries: usize,
    /// Values fetched through cursors.
    pub value_reads: u64,
    /// Entries removed through cursors or point removes.
    pub erases: u64,
}

/// In-memory ordered store backed by a lock-free skiplist.
#[derive(Debug, Default)]
pub struct MemStore {
    data: SkipMap<Vec<u8>, Bytes>,
    value_reads: AtomicU64,
    erases: AtomicU64,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of all keys in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.data.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> MemStoreStats {
        MemStoreStats {
            entries: self.data.len(),
            value_reads: self.value_reads.load(Ordering::Relaxed),
            erases: self.erases.load(Ordering::Relaxed),
        }
    }
}

impl OrderedStore for MemStore {
    type Cursor<'a> = MemCursor<'a>;

    fn cursor(&self) -> Result<Self::Cursor<'_>, StoreError> {
        Ok(MemCursor {
            store: self,
            current: None,
        })
    }

    fn insert(&self, key: Vec<u8>, value: Bytes) -> Result<(), StoreError> {
        self.data.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<bool, StoreError> {
        let removed = self.data.remove(key).is_some();
        if removed {
            self.erases.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }
}

/// Cursor over a [`MemStore`].
///
/// The current entry keeps its key alive after removal, so stepping past an
/// erased entry searches from that key.
pub struct MemCursor<'a> {
    store: &'a MemStore,
    current: Option<Entry<'a, Vec<u8>, Bytes>>,
}

impl StoreCursor for MemCursor<'_> {
    fn find(&mut self, key: &[u8], mode: MatchMode) -> Result<bool, StoreError> {
        let data = &self.store.data;
        self.current = match mode {
            MatchMode::Exact => data.get(key),
            MatchMode::GreaterEqual => data.lower_bound(Bound::Included(key)),
            MatchMode::Greater => data.lower_bound(Bound::Excluded(key)),
        };
        Ok(self.current.is_some())
    }

    fn move_next(&mut self) -> Result<bool, StoreError> {
        let Some(current) = self.current.take() else {
            return Ok(false);
        };
        self.current = self
            .store
            .data
            .lower_bound(Bound::Excluded(current.key().as_slice()));
        Ok(self.current.is_some())
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|entry| entry.key().as_slice())
    }

    fn value(&mut self) -> Result<Bytes, StoreError> {
        let entry = self.current.as_ref().ok_or(StoreError::Unpositioned)?;
        self.store.value_reads.fetch_add(1, Ordering::Relaxed);
        Ok(entry.value().clone())
    }

    fn erase(&mut self) -> Result<bool, StoreError> {
        let entry = self.current.as_ref().ok_or(StoreError::Unpositioned)?;
        let removed = entry.remove();
        if removed {
            self.store.erases.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }
}
