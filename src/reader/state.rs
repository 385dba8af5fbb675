use regex::Regex;

use crate::key::{Flag, Key};

/// Counters reported by a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Keys pulled from the store.
    pub keys_read: u64,
    /// Cells handed to the caller.
    pub cells_returned: u64,
    /// Cells found past their TTL.
    pub cells_expired: u64,
    /// Values fetched from the store.
    pub value_fetches: u64,
}

/// Which grouping boundary the latest key crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Row,
    Family,
    Cell,
    None,
}

/// Remembers the `(row, family, qualifier)` of the previous key.
#[derive(Debug, Default)]
pub(crate) struct GroupTracker {
    primed: bool,
    row: String,
    family: u8,
    qualifier: String,
}

impl GroupTracker {
    pub(crate) fn observe(&mut self, key: &Key) -> Transition {
        let transition = if !self.primed || self.row != key.row {
            self.primed = true;
            self.row.clear();
            self.row.push_str(&key.row);
            Transition::Row
        } else if self.family != key.column_family_code {
            Transition::Family
        } else if self.qualifier != key.column_qualifier {
            Transition::Cell
        } else {
            return Transition::None;
        };
        self.family = key.column_family_code;
        self.qualifier.clear();
        self.qualifier.push_str(&key.column_qualifier);
        transition
    }
}

/// Limit and offset counters. Row and cell totals span the whole scan; the
/// version and per-family counters reset at group boundaries.
#[derive(Debug, Default)]
pub(crate) struct ScanState {
    pub(crate) versions: u32,
    pub(crate) family_cells: u32,
    pub(crate) row_started: bool,
    pub(crate) row_skipped: bool,
    pub(crate) rows_seen: u32,
    pub(crate) cells_seen: u32,
    pub(crate) cells_returned: u32,
}

impl ScanState {
    pub(crate) fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Row => {
                self.versions = 0;
                self.family_cells = 0;
                self.row_started = false;
                self.row_skipped = false;
            }
            Transition::Family => {
                self.versions = 0;
                self.family_cells = 0;
            }
            Transition::Cell => self.versions = 0,
            Transition::None => {}
        }
    }
}

#[derive(Debug, Clone)]
struct Tombstone {
    row: String,
    family: u8,
    qualifier: String,
    timestamp: i64,
}

impl Tombstone {
    fn from_key(key: &Key) -> Self {
        Self {
            row: key.row.clone(),
            family: key.column_family_code,
            qualifier: key.column_qualifier.clone(),
            timestamp: key.timestamp,
        }
    }

    fn same_row(&self, key: &Key) -> bool {
        self.row == key.row
    }

    fn same_family(&self, key: &Key) -> bool {
        self.same_row(key) && self.family == key.column_family_code
    }

    fn same_cell(&self, key: &Key) -> bool {
        self.same_family(key) && self.qualifier == key.column_qualifier
    }
}

/// Delete markers met so far that may still shadow upcoming cells.
///
/// Markers are kept with their full position, so a stale marker never matches
/// a cell of another row or column.
#[derive(Debug, Default)]
pub(crate) struct Tombstones {
    row: Option<Tombstone>,
    family: Option<Tombstone>,
    cell: Option<Tombstone>,
    versions: Vec<Tombstone>,
}

impl Tombstones {
    pub(crate) fn record(&mut self, key: &Key) {
        let slot = match key.flag {
            Flag::Insert => return,
            Flag::DeleteRow => &mut self.row,
            Flag::DeleteColumnFamily => &mut self.family,
            Flag::DeleteCell => &mut self.cell,
            Flag::DeleteCellVersion => {
                if !self.versions.first().is_some_and(|t| t.same_cell(key)) {
                    self.versions.clear();
                }
                self.versions.push(Tombstone::from_key(key));
                return;
            }
        };
        let replace = match slot {
            Some(existing) => {
                existing.row != key.row
                    || existing.family != key.column_family_code
                    || existing.qualifier != key.column_qualifier
                    || existing.timestamp < key.timestamp
            }
            None => true,
        };
        if replace {
            *slot = Some(Tombstone::from_key(key));
        }
    }

    pub(crate) fn shadows(&self, key: &Key) -> bool {
        let ts = key.timestamp;
        self.row
            .as_ref()
            .is_some_and(|t| t.same_row(key) && ts <= t.timestamp)
            || self
                .family
                .as_ref()
                .is_some_and(|t| t.same_family(key) && ts <= t.timestamp)
            || self
                .cell
                .as_ref()
                .is_some_and(|t| t.same_cell(key) && ts <= t.timestamp)
            || self
                .versions
                .iter()
                .any(|t| t.same_cell(key) && ts == t.timestamp)
    }
}

/// One-entry memo of the row regexp verdict; keys arrive sorted, so every
/// cell of a row hits the memo after the first.
#[derive(Debug, Default)]
pub(crate) struct RowRegexMemo {
    row: Option<String>,
    matched: bool,
}

impl RowRegexMemo {
    pub(crate) fn matches(&mut self, regex: &Regex, row: &str) -> bool {
        if self.row.as_deref() == Some(row) {
            return self.matched;
        }
        self.matched = regex.is_match(row);
        let cached = self.row.get_or_insert_with(String::new);
        cached.clear();
        cached.push_str(row);
        self.matched
    }
}
