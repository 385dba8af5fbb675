#![deny(missing_docs)]
//! Wide-column scans and cascading deletes over an ordered key-value store.
//!
//! Cells live under a compound key (row, column family, qualifier, timestamp,
//! flag, revision) whose byte order gives newest-first versions within each
//! cell. A [`ScanSpec`] is compiled once against a [`Schema`] into a
//! [`ScanContext`]; a [`Reader`] then drives a single cursor over the store and
//! yields matching cells lazily. [`delete_range`] walks the same key space to
//! erase rows, families, cells or single versions.
//!
//! The store is any [`store::OrderedStore`]; [`store::MemStore`] is an
//! in-memory implementation. [`Table`] bundles a store, a schema and
//! [`TableOption`] for the common case.

mod context;
mod delete;
mod error;
mod filter;
mod observability;
mod option;
mod reader;
mod scan_spec;
mod schema;
mod table;

/// Compound key encoding and seek prefixes.
pub mod key;

/// Ordered key-value store contract and the in-memory store.
pub mod store;

pub use crate::{
    context::ScanContext,
    delete::{delete_range, DeleteRequest},
    error::Error,
    filter::CellFilterInfo,
    key::{Flag, Key, KeyError, AUTO_ASSIGN, TIMESTAMP_MAX, TIMESTAMP_MIN},
    option::{Clock, ExpireMode, TableOption},
    reader::{Cell, CellOwned, OwnedCells, Reader, ScanStats},
    scan_spec::{
        CellInterval, CellPosition, ColumnPredicate, ColumnSelector, PredicateOp, QualifierMatch,
        RowInterval, ScanSpec,
    },
    schema::{ColumnFamilySpec, Schema},
    table::Table,
};

/// Compile `spec` against `schema`, taking TTL cutoffs from the wall clock.
pub fn compile_scan_context<'a>(
    spec: &ScanSpec,
    schema: &'a Schema,
) -> Result<ScanContext<'a>, Error> {
    ScanContext::compile(spec, schema)
}

/// Open a reader for `ctx` over `store`, erasing expired cells inline.
pub fn open_reader<'a, S: store::OrderedStore>(
    store: &'a S,
    ctx: ScanContext<'a>,
) -> Result<Reader<'a, S>, Error> {
    Reader::open(store, ctx, ExpireMode::Inline)
}
