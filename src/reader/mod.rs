//! Cursor-driven readers producing the cells a compiled scan selects.
//!
//! A [`Reader`] owns its [`ScanContext`] and one store cursor. The variant
//! strategy decides how the next candidate key is found; everything after that
//! (row regexp, family mask, TTL, time interval, tombstones, version cap,
//! qualifier and value filters, limits and offsets) is one shared pipeline.

mod source;
mod state;

use bytes::Bytes;

pub use state::ScanStats;

use self::{
    source::{RowVerdict, Source},
    state::{GroupTracker, RowRegexMemo, ScanState, Tombstones},
};
use crate::{
    context::ScanContext,
    error::Error,
    key::{self, Flag, Key, ROW_DELETE_FAMILY},
    observability::{log_debug, log_trace, log_warn},
    option::ExpireMode,
    store::{OrderedStore, StoreCursor},
};

/// A cell borrowed from the reader's scratch buffers.
///
/// Valid until the next call to [`Reader::next_cell`]; use
/// [`Cell::into_owned`] to keep it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<'r> {
    /// Row key.
    pub row: &'r str,
    /// Column family name.
    pub column_family: &'r str,
    /// Column qualifier, empty when the cell has none.
    pub column_qualifier: &'r str,
    /// Version timestamp in nanoseconds.
    pub timestamp: i64,
    /// Write revision.
    pub revision: i64,
    /// Always [`Flag::Insert`] for cells returned by a scan.
    pub flag: Flag,
    /// `None` for keys-only scans.
    pub value: Option<&'r [u8]>,
}

impl Cell<'_> {
    /// Copy the cell out of the reader's buffers.
    pub fn into_owned(self) -> CellOwned {
        CellOwned {
            row: self.row.to_owned(),
            column_family: self.column_family.to_owned(),
            column_qualifier: self.column_qualifier.to_owned(),
            timestamp: self.timestamp,
            revision: self.revision,
            flag: self.flag,
            value: self.value.map(Bytes::copy_from_slice),
        }
    }
}

/// An owned cell, also the input of the write path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellOwned {
    /// Row key.
    pub row: String,
    /// Column family name.
    pub column_family: String,
    /// Column qualifier.
    pub column_qualifier: String,
    /// Version timestamp; [`AUTO_ASSIGN`](crate::key::AUTO_ASSIGN) on writes
    /// asks for the table clock.
    pub timestamp: i64,
    /// Write revision; 0 on writes asks for the next table revision.
    pub revision: i64,
    /// Insert, or the granularity of a delete.
    pub flag: Flag,
    /// Cell value.
    pub value: Option<Bytes>,
}

impl CellOwned {
    /// An insert of `value` at `timestamp`; revision 0 lets the table assign one.
    pub fn new(
        row: impl Into<String>,
        column_family: impl Into<String>,
        column_qualifier: impl Into<String>,
        timestamp: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        CellOwned {
            row: row.into(),
            column_family: column_family.into(),
            column_qualifier: column_qualifier.into(),
            timestamp,
            revision: 0,
            flag: Flag::Insert,
            value: Some(value.into()),
        }
    }

    /// Value as bytes, empty when absent.
    pub fn value_bytes(&self) -> &[u8] {
        self.value.as_deref().unwrap_or_default()
    }
}

/// Lazily yields the cells of one scan.
pub struct Reader<'a, S: OrderedStore + 'a> {
    store: &'a S,
    cursor: S::Cursor<'a>,
    ctx: ScanContext<'a>,
    source: Source,
    expire_mode: ExpireMode,
    groups: GroupTracker,
    state: ScanState,
    tombstones: Tombstones,
    row_memo: RowRegexMemo,
    key: Key,
    value: Option<Bytes>,
    expired: Vec<Vec<u8>>,
    stats: ScanStats,
    done: bool,
    finished: bool,
}

impl<'a, S: OrderedStore + 'a> Reader<'a, S> {
    /// Open a reader over `store`, choosing the variant from what `ctx` asks for.
    pub fn open(
        store: &'a S,
        mut ctx: ScanContext<'a>,
        expire_mode: ExpireMode,
    ) -> Result<Self, Error> {
        let cursor = store.cursor()?;
        let source = Source::for_context(&mut ctx);
        log_debug!(
            component = "reader",
            event = "reader_opened",
            variant = source.name(),
            expire_mode = ?expire_mode,
        );
        Ok(Reader {
            store,
            cursor,
            ctx,
            source,
            expire_mode,
            groups: GroupTracker::default(),
            state: ScanState::default(),
            tombstones: Tombstones::default(),
            row_memo: RowRegexMemo::default(),
            key: Key::default(),
            value: None,
            expired: Vec::new(),
            stats: ScanStats::default(),
            done: false,
            finished: false,
        })
    }

    /// Next matching cell, or `None` at end of stream.
    ///
    /// An error ends the stream; expired keys buffered before it are still
    /// erased.
    pub fn next_cell(&mut self) -> Result<Option<Cell<'_>>, Error> {
        match self.fetch_next() {
            Ok(true) => Ok(Some(self.current_cell())),
            Ok(false) => Ok(None),
            Err(err) => {
                self.done = true;
                let pending = self.expired.len();
                if let Err(finish_err) = self.finish() {
                    log_warn!(
                        component = "reader",
                        event = "expired_cells_left",
                        pending,
                        error = %finish_err,
                    );
                }
                Err(err)
            }
        }
    }

    /// Counters collected so far.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Turn the reader into an iterator of owned cells.
    pub fn into_owned_cells(self) -> OwnedCells<'a, S> {
        OwnedCells { reader: self }
    }

    fn current_cell(&self) -> Cell<'_> {
        let family = self.ctx.column_families[self.key.column_family_code as usize];
        Cell {
            row: &self.key.row,
            column_family: family.map_or("", |family| family.name()),
            column_qualifier: &self.key.column_qualifier,
            timestamp: self.key.timestamp,
            revision: self.key.revision,
            flag: self.key.flag,
            value: self.value.as_deref(),
        }
    }

    fn fetch_next(&mut self) -> Result<bool, Error> {
        while !self.done {
            if !self.source.advance(
                &mut self.cursor,
                &mut self.ctx.row_set,
                &mut self.tombstones,
                &mut self.key,
            )? {
                self.done = true;
                break;
            }
            let Some(raw) = self.cursor.key() else {
                continue;
            };
            self.stats.keys_read += 1;
            if let Err(err) = key::decode_into(raw, &mut self.key) {
                log_warn!(
                    component = "reader",
                    event = "malformed_key",
                    key_len = raw.len(),
                    error = %err,
                );
                return Err(err.into());
            }

            let transition = self.groups.observe(&self.key);
            self.state.apply(transition);
            let is_marker = self.key.flag.is_delete();
            if is_marker {
                self.tombstones.record(&self.key);
            }
            match self.source.filter_row(&self.key, &mut self.ctx.row_set) {
                RowVerdict::Accept => {}
                RowVerdict::Skip => continue,
                RowVerdict::End => {
                    self.done = true;
                    break;
                }
            }
            if is_marker {
                continue;
            }
            if let Some(regex) = &self.ctx.row_regexp {
                if !self.row_memo.matches(regex, &self.key.row) {
                    continue;
                }
            }

            let code = self.key.column_family_code;
            if code == ROW_DELETE_FAMILY || !self.ctx.family_mask[code as usize] {
                continue;
            }
            let info = &self.ctx.family_info[code as usize];
            let (cutoff_time, max_versions) = (info.cutoff_time, info.max_versions);
            if self.key.timestamp < cutoff_time {
                self.expire()?;
                continue;
            }
            let (start, end) = self.ctx.time_interval;
            if self.key.timestamp < start || self.key.timestamp >= end {
                continue;
            }
            if self.tombstones.shadows(&self.key) {
                continue;
            }
            if !self.state.row_started {
                self.state.row_started = true;
                self.state.rows_seen += 1;
                if self.state.rows_seen <= self.ctx.row_offset {
                    self.state.row_skipped = true;
                } else if self.ctx.row_limit > 0
                    && self.state.rows_seen - self.ctx.row_offset > self.ctx.row_limit
                {
                    self.state.row_skipped = true;
                    if self.source.limit_reached() {
                        self.done = true;
                        break;
                    }
                    continue;
                }
            }
            if self.state.row_skipped {
                continue;
            }
            self.state.versions += 1;
            if max_versions > 0 && self.state.versions > max_versions {
                continue;
            }
            if !self.ctx.family_info[code as usize].qualifier_matches(&self.key.column_qualifier) {
                continue;
            }

            if self.ctx.cell_limit > 0 && self.state.cells_returned >= self.ctx.cell_limit {
                if self.source.limit_reached() {
                    self.done = true;
                    break;
                }
                continue;
            }
            if self.ctx.cell_limit_per_family > 0
                && self.state.family_cells >= self.ctx.cell_limit_per_family
            {
                continue;
            }
            self.value = None;
            if self.ctx.has_value_filters && !self.value_passes(code)? {
                continue;
            }

            self.state.family_cells += 1;
            self.state.cells_seen += 1;
            if self.state.cells_seen <= self.ctx.cell_offset {
                continue;
            }

            if self.ctx.keys_only {
                self.value = None;
            } else if self.value.is_none() {
                self.value = Some(self.cursor.value()?);
                self.stats.value_fetches += 1;
            }
            self.state.cells_returned += 1;
            self.stats.cells_returned += 1;
            return Ok(true);
        }
        self.finish()?;
        Ok(false)
    }

    /// Fetch the value only for families carrying predicates or when a value
    /// regexp is set.
    fn value_passes(&mut self, code: u8) -> Result<bool, Error> {
        let info = &self.ctx.family_info[code as usize];
        if !info.has_predicates() && self.ctx.value_regexp.is_none() {
            return Ok(true);
        }
        let value = self.cursor.value()?;
        self.stats.value_fetches += 1;
        let passed = info.value_matches(Some(&value))
            && self
                .ctx
                .value_regexp
                .as_ref()
                .map_or(true, |regex| regex.is_match(&value));
        self.value = Some(value);
        Ok(passed)
    }

    fn expire(&mut self) -> Result<(), Error> {
        self.stats.cells_expired += 1;
        log_trace!(
            component = "reader",
            event = "cell_expired",
            row = %self.key.row,
            family = self.key.column_family_code,
            timestamp = self.key.timestamp,
        );
        match self.expire_mode {
            ExpireMode::Inline => {
                self.cursor.erase()?;
            }
            ExpireMode::Deferred => {
                if let Some(raw) = self.cursor.key() {
                    self.expired.push(raw.to_vec());
                }
            }
            ExpireMode::Retain => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if !self.expired.is_empty() {
            let mut erased = 0usize;
            for key in self.expired.drain(..) {
                if self.store.remove(&key)? {
                    erased += 1;
                }
            }
            log_debug!(
                component = "reader",
                event = "expired_cells_erased",
                erased,
            );
        }
        log_debug!(
            component = "reader",
            event = "scan_complete",
            variant = self.source.name(),
            keys_read = self.stats.keys_read,
            cells_returned = self.stats.cells_returned,
            cells_expired = self.stats.cells_expired,
            value_fetches = self.stats.value_fetches,
        );
        Ok(())
    }
}

/// Iterator of owned cells over a [`Reader`].
pub struct OwnedCells<'a, S: OrderedStore + 'a> {
    reader: Reader<'a, S>,
}

impl<'a, S: OrderedStore + 'a> OwnedCells<'a, S> {
    /// Counters of the underlying reader.
    pub fn stats(&self) -> ScanStats {
        self.reader.stats()
    }
}

impl<'a, S: OrderedStore + 'a> Iterator for OwnedCells<'a, S> {
    type Item = Result<CellOwned, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next_cell() {
            Ok(Some(cell)) => Some(Ok(cell.into_owned())),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
