//! A store, a schema snapshot and options bundled behind one handle.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use bytes::Bytes;

use crate::{
    context::ScanContext,
    delete::{delete_range, DeleteRequest},
    error::Error,
    key::{self, Flag, Key, AUTO_ASSIGN},
    option::TableOption,
    reader::{CellOwned, Reader},
    scan_spec::ScanSpec,
    schema::Schema,
    store::{MemStore, OrderedStore},
};

/// Wide-column table over an ordered store.
///
/// ```
/// use cellscan::{ColumnFamilySpec, ScanSpec, Schema, Table, TableOption};
///
/// let schema = Schema::new().family(ColumnFamilySpec::new("info", 1));
/// let table = Table::in_memory(schema, TableOption::default());
/// table.insert("row", "info", "name", 10, "alice").unwrap();
///
/// let mut reader = table.scan(&ScanSpec::default()).unwrap();
/// let cell = reader.next_cell().unwrap().unwrap();
/// assert_eq!(cell.value, Some(&b"alice"[..]));
/// ```
#[derive(Debug)]
pub struct Table<S = MemStore> {
    store: S,
    schema: Arc<Schema>,
    option: TableOption,
    revision: AtomicI64,
}

impl Table<MemStore> {
    /// A table over a fresh [`MemStore`].
    pub fn in_memory(schema: impl Into<Arc<Schema>>, option: TableOption) -> Self {
        Table::new(MemStore::new(), schema, option)
    }
}

impl<S: OrderedStore> Table<S> {
    /// Wrap `store`.
    pub fn new(store: S, schema: impl Into<Arc<Schema>>, option: TableOption) -> Self {
        Table {
            store,
            schema: schema.into(),
            option,
            revision: AtomicI64::new(0),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Schema snapshot.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Options.
    pub fn option(&self) -> &TableOption {
        &self.option
    }

    /// Store one cell. A delete flag turns the cell into a [`DeleteRequest`].
    pub fn write(&self, cell: &CellOwned) -> Result<(), Error> {
        if cell.flag.is_delete() {
            self.delete(&delete_request(cell))?;
            return Ok(());
        }
        let family = self
            .schema
            .family_by_name(&cell.column_family)
            .ok_or_else(|| Error::UnknownColumnFamily(cell.column_family.clone()))?;
        if family.is_counter() {
            return Err(Error::CounterUnsupported(cell.column_family.clone()));
        }
        let now = self.option.clock.now();
        let timestamp = match cell.timestamp {
            AUTO_ASSIGN => now,
            timestamp => timestamp,
        };
        let revision = match cell.revision {
            0 => self.revision.fetch_add(1, Ordering::Relaxed) + 1,
            revision => revision,
        };
        let key = Key::new(
            cell.row.as_str(),
            family.id(),
            cell.column_qualifier.as_str(),
            timestamp,
        )
        .with_revision(revision);
        let encoded = key::encode_at(&key, family.is_time_order_ascending(), now);
        self.store
            .insert(encoded, cell.value.clone().unwrap_or_default())?;
        Ok(())
    }

    /// Store `value` under `row`, `family:qualifier` at `timestamp`.
    pub fn insert(
        &self,
        row: &str,
        family: &str,
        qualifier: &str,
        timestamp: i64,
        value: impl Into<Bytes>,
    ) -> Result<(), Error> {
        self.write(&CellOwned::new(row, family, qualifier, timestamp, value))
    }

    /// Compile `spec` and open a reader over it.
    pub fn scan(&self, spec: &ScanSpec) -> Result<Reader<'_, S>, Error> {
        let ctx = ScanContext::compile_at(spec, &self.schema, self.option.clock.now())?;
        Reader::open(&self.store, ctx, self.option.expire_mode)
    }

    /// Apply a range delete, returning how many entries were erased.
    pub fn delete(&self, request: &DeleteRequest) -> Result<usize, Error> {
        delete_range(&self.store, &self.schema, request)
    }
}

fn delete_request(cell: &CellOwned) -> DeleteRequest {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_owned());
    DeleteRequest {
        row: cell.row.clone(),
        family: non_empty(&cell.column_family),
        qualifier: match cell.flag {
            Flag::DeleteCell | Flag::DeleteCellVersion => Some(cell.column_qualifier.clone()),
            _ => None,
        },
        timestamp: (cell.timestamp != AUTO_ASSIGN).then_some(cell.timestamp),
        revision: (cell.revision != 0).then_some(cell.revision),
        flag: cell.flag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{option::Clock, schema::ColumnFamilySpec};

    fn table() -> Table {
        let schema = Schema::new()
            .family(ColumnFamilySpec::new("info", 1))
            .family(ColumnFamilySpec::new("hits", 2).counter(true));
        Table::in_memory(schema, TableOption::default().clock(Clock::Fixed(500)))
    }

    #[test]
    fn auto_assign_uses_clock_and_revisions_increase() {
        let table = table();
        table.insert("r", "info", "q", AUTO_ASSIGN, "a").unwrap();
        table.insert("r", "info", "q", AUTO_ASSIGN, "b").unwrap();
        let keys: Vec<Key> = table
            .store()
            .keys()
            .iter()
            .map(|raw| key::decode(raw).unwrap())
            .collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|key| key.timestamp == 500));
        let mut revisions: Vec<i64> = keys.iter().map(|key| key.revision).collect();
        revisions.sort_unstable();
        assert_eq!(revisions, vec![1, 2]);
    }

    #[test]
    fn write_rejects_unknown_and_counter_families() {
        let table = table();
        assert!(matches!(
            table.insert("r", "nope", "q", 1, "v"),
            Err(Error::UnknownColumnFamily(_))
        ));
        assert!(matches!(
            table.insert("r", "hits", "q", 1, "v"),
            Err(Error::CounterUnsupported(_))
        ));
    }

    #[test]
    fn delete_flag_routes_to_range_delete() {
        let table = table();
        table.insert("r", "info", "q", 10, "v").unwrap();
        table.insert("r", "info", "q", 20, "v").unwrap();
        let marker = CellOwned {
            flag: Flag::DeleteCell,
            value: None,
            ..CellOwned::new("r", "info", "q", 10, "")
        };
        table.write(&marker).unwrap();
        let left = key::decode(&table.store().keys()[0]).unwrap();
        assert_eq!(table.store().len(), 1);
        assert_eq!(left.timestamp, 20);
    }
}
