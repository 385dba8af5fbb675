//! Declarative description of a scan.
//!
//! A [`ScanSpec`] names which rows, columns, versions and values a scan returns.
//! It is compiled against a schema into a [`ScanContext`](crate::ScanContext)
//! before any key is read.

use std::{ops::Bound, str::FromStr};

use crate::{
    error::Error,
    key::{TIMESTAMP_MAX, TIMESTAMP_MIN},
};

/// A contiguous range of rows with owned bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowInterval {
    /// Start bound (inclusive/exclusive/unbounded).
    pub start: Bound<String>,
    /// End bound (inclusive/exclusive/unbounded).
    pub end: Bound<String>,
}

impl RowInterval {
    /// Create an interval from explicit bounds.
    pub fn new(start: Bound<String>, end: Bound<String>) -> Self {
        Self { start, end }
    }

    /// Every row.
    pub fn all() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// `[start, end)`.
    pub fn half_open(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::new(Bound::Included(start.into()), Bound::Excluded(end.into()))
    }

    /// `[start, end]`.
    pub fn closed(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::new(Bound::Included(start.into()), Bound::Included(end.into()))
    }

    /// Exactly one row.
    pub fn single(row: impl Into<String>) -> Self {
        let row = row.into();
        Self::closed(row.clone(), row)
    }

    /// The row this interval covers when it covers exactly one.
    pub fn as_single_row(&self) -> Option<&str> {
        match (&self.start, &self.end) {
            (Bound::Included(start), Bound::Included(end)) if start == end => Some(start),
            _ => None,
        }
    }

    /// Whether this interval contains `row`.
    pub fn contains(&self, row: &str) -> bool {
        let start_ok = match &self.start {
            Bound::Unbounded => true,
            Bound::Included(bound) => row >= bound.as_str(),
            Bound::Excluded(bound) => row > bound.as_str(),
        };
        if !start_ok {
            return false;
        }
        match &self.end {
            Bound::Unbounded => true,
            Bound::Included(bound) => row <= bound.as_str(),
            Bound::Excluded(bound) => row < bound.as_str(),
        }
    }

    /// Whether no row can satisfy both bounds.
    pub(crate) fn is_inverted(&self) -> bool {
        match (&self.start, &self.end) {
            (Bound::Included(start), Bound::Included(end)) => start > end,
            (Bound::Included(start), Bound::Excluded(end))
            | (Bound::Excluded(start), Bound::Included(end))
            | (Bound::Excluded(start), Bound::Excluded(end)) => start >= end,
            _ => false,
        }
    }
}

/// A `(row, column)` position bounding a cell interval. The column is
/// `"family"` or `"family:qualifier"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellPosition {
    /// Row key.
    pub row: String,
    /// Column reference.
    pub column: String,
}

impl CellPosition {
    /// Build a position.
    pub fn new(row: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            column: column.into(),
        }
    }
}

/// A contiguous range of cells spanning rows and columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellInterval {
    /// Start bound.
    pub start: Bound<CellPosition>,
    /// End bound.
    pub end: Bound<CellPosition>,
}

impl CellInterval {
    /// Create an interval from explicit bounds.
    pub fn new(start: Bound<CellPosition>, end: Bound<CellPosition>) -> Self {
        Self { start, end }
    }

    /// `[start, end]`.
    pub fn closed(start: CellPosition, end: CellPosition) -> Self {
        Self::new(Bound::Included(start), Bound::Included(end))
    }
}

/// How a column selector constrains qualifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QualifierMatch {
    /// Every qualifier of the family.
    Any,
    /// One exact qualifier.
    Exact(String),
    /// Qualifiers starting with the prefix.
    Prefix(String),
    /// Qualifiers matching the regular expression.
    Regex(String),
}

/// A selected column: a family, optionally narrowed by qualifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSelector {
    /// Column family name.
    pub family: String,
    /// Qualifier constraint.
    pub qualifier: QualifierMatch,
}

impl ColumnSelector {
    /// Every qualifier of `family`.
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: QualifierMatch::Any,
        }
    }

    /// One exact qualifier of `family`.
    pub fn exact(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: QualifierMatch::Exact(qualifier.into()),
        }
    }

    /// Qualifiers of `family` starting with `prefix`.
    pub fn prefix(family: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: QualifierMatch::Prefix(prefix.into()),
        }
    }

    /// Qualifiers of `family` matching `pattern`.
    pub fn regex(family: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: QualifierMatch::Regex(pattern.into()),
        }
    }
}

impl FromStr for ColumnSelector {
    type Err = Error;

    /// Parse `family`, `family:qualifier`, `family:^prefix` or `family:/regex/`.
    fn from_str(column: &str) -> Result<Self, Self::Err> {
        let (family, qualifier) = match column.split_once(':') {
            Some((family, qualifier)) => (family, Some(qualifier)),
            None => (column, None),
        };
        if family.is_empty() {
            return Err(Error::BadScanSpec(format!(
                "column {column:?} has no family"
            )));
        }
        let qualifier = match qualifier {
            None => QualifierMatch::Any,
            Some(q) if q.starts_with('/') => {
                let pattern = q[1..].strip_suffix('/').ok_or_else(|| {
                    Error::BadScanSpec(format!("unterminated qualifier regexp in {column:?}"))
                })?;
                QualifierMatch::Regex(pattern.to_owned())
            }
            Some(q) => match q.strip_prefix('^') {
                Some(prefix) => QualifierMatch::Prefix(prefix.to_owned()),
                None => QualifierMatch::Exact(q.to_owned()),
            },
        };
        Ok(Self {
            family: family.to_owned(),
            qualifier,
        })
    }
}

/// Comparison applied by a [`ColumnPredicate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredicateOp {
    /// Value equals the operand.
    Exact,
    /// Value starts with the operand.
    Prefix,
    /// Value matches the operand as a regular expression.
    Regex,
}

/// A value predicate scoped to one column family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPredicate {
    /// Column family name.
    pub column_family: String,
    /// Comparison.
    pub operation: PredicateOp,
    /// Operand; `None` matches only absent values.
    pub value: Option<Vec<u8>>,
}

impl ColumnPredicate {
    /// Build a predicate comparing against `value`.
    pub fn new(
        column_family: impl Into<String>,
        operation: PredicateOp,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            column_family: column_family.into(),
            operation,
            value: Some(value.into()),
        }
    }

    /// Build a predicate accepting only cells without a value.
    pub fn absent(column_family: impl Into<String>) -> Self {
        Self {
            column_family: column_family.into(),
            operation: PredicateOp::Exact,
            value: None,
        }
    }
}

/// Declarative scan request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanSpec {
    pub(crate) row_intervals: Vec<RowInterval>,
    pub(crate) cell_intervals: Vec<CellInterval>,
    pub(crate) rows: Vec<String>,
    pub(crate) columns: Vec<ColumnSelector>,
    pub(crate) column_predicates: Vec<ColumnPredicate>,
    pub(crate) row_regexp: Option<String>,
    pub(crate) value_regexp: Option<String>,
    pub(crate) time_interval: (i64, i64),
    pub(crate) max_versions: u32,
    pub(crate) row_limit: u32,
    pub(crate) cell_limit: u32,
    pub(crate) cell_limit_per_family: u32,
    pub(crate) row_offset: u32,
    pub(crate) cell_offset: u32,
    pub(crate) keys_only: bool,
    pub(crate) scan_and_filter_rows: bool,
}

impl Default for ScanSpec {
    fn default() -> Self {
        Self {
            row_intervals: Vec::new(),
            cell_intervals: Vec::new(),
            rows: Vec::new(),
            columns: Vec::new(),
            column_predicates: Vec::new(),
            row_regexp: None,
            value_regexp: None,
            time_interval: (TIMESTAMP_MIN, TIMESTAMP_MAX),
            max_versions: 0,
            row_limit: 0,
            cell_limit: 0,
            cell_limit_per_family: 0,
            row_offset: 0,
            cell_offset: 0,
            keys_only: false,
            scan_and_filter_rows: false,
        }
    }
}

impl ScanSpec {
    /// Add a row interval; intervals are scanned in the order given.
    pub fn row_interval(mut self, interval: RowInterval) -> Self {
        self.row_intervals.push(interval);
        self
    }

    /// Add a cell interval; intervals are scanned in the order given.
    pub fn cell_interval(mut self, interval: CellInterval) -> Self {
        self.cell_intervals.push(interval);
        self
    }

    /// Add an explicit row; a non-empty row list selects the row-set reader.
    pub fn row(mut self, row: impl Into<String>) -> Self {
        self.rows.push(row.into());
        self
    }

    /// Select a column. With no columns every live non-counter family is scanned.
    pub fn column(mut self, column: ColumnSelector) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a value predicate.
    pub fn column_predicate(mut self, predicate: ColumnPredicate) -> Self {
        self.column_predicates.push(predicate);
        self
    }

    /// Only return rows matching `pattern`.
    pub fn row_regexp(mut self, pattern: impl Into<String>) -> Self {
        self.row_regexp = Some(pattern.into());
        self
    }

    /// Only return cells whose value matches `pattern`.
    pub fn value_regexp(mut self, pattern: impl Into<String>) -> Self {
        self.value_regexp = Some(pattern.into());
        self
    }

    /// Only return versions with `start <= timestamp < end`.
    pub fn time_interval(mut self, start: i64, end: i64) -> Self {
        self.time_interval = (start, end);
        self
    }

    /// Return at most `max_versions` versions per cell (`0` = all).
    pub fn max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }

    /// Return cells from at most `row_limit` rows (`0` = unlimited).
    pub fn row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Return at most `cell_limit` cells (`0` = unlimited).
    pub fn cell_limit(mut self, cell_limit: u32) -> Self {
        self.cell_limit = cell_limit;
        self
    }

    /// Return at most this many cells per column family of each row (`0` = unlimited).
    pub fn cell_limit_per_family(mut self, limit: u32) -> Self {
        self.cell_limit_per_family = limit;
        self
    }

    /// Skip the first `row_offset` matching rows.
    pub fn row_offset(mut self, row_offset: u32) -> Self {
        self.row_offset = row_offset;
        self
    }

    /// Skip the first `cell_offset` matching cells.
    pub fn cell_offset(mut self, cell_offset: u32) -> Self {
        self.cell_offset = cell_offset;
        self
    }

    /// Omit values from returned cells.
    pub fn keys_only(mut self, keys_only: bool) -> Self {
        self.keys_only = keys_only;
        self
    }

    /// Treat single-row intervals as an explicit row set.
    pub fn scan_and_filter_rows(mut self, enabled: bool) -> Self {
        self.scan_and_filter_rows = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_column_selectors() {
        assert_eq!(
            "info".parse::<ColumnSelector>().unwrap(),
            ColumnSelector::family("info")
        );
        assert_eq!(
            "info:name".parse::<ColumnSelector>().unwrap(),
            ColumnSelector::exact("info", "name")
        );
        assert_eq!(
            "info:^addr".parse::<ColumnSelector>().unwrap(),
            ColumnSelector::prefix("info", "addr")
        );
        assert_eq!(
            "info:/^a.*z$/".parse::<ColumnSelector>().unwrap(),
            ColumnSelector::regex("info", "^a.*z$")
        );
        assert_eq!(
            "info:".parse::<ColumnSelector>().unwrap(),
            ColumnSelector::exact("info", "")
        );
        assert!(":q".parse::<ColumnSelector>().is_err());
        assert!("info:/open".parse::<ColumnSelector>().is_err());
    }

    #[test]
    fn row_interval_bounds() {
        let interval = RowInterval::half_open("b", "d");
        assert!(!interval.contains("a"));
        assert!(interval.contains("b"));
        assert!(interval.contains("c"));
        assert!(!interval.contains("d"));
        assert!(RowInterval::all().contains(""));
        assert_eq!(RowInterval::single("r").as_single_row(), Some("r"));
        assert!(RowInterval::half_open("b", "b").is_inverted());
        assert!(!RowInterval::closed("b", "b").is_inverted());
    }

    #[test]
    fn defaults_select_everything() {
        let spec = ScanSpec::default();
        assert_eq!(spec.time_interval, (TIMESTAMP_MIN, TIMESTAMP_MAX));
        assert!(spec.columns.is_empty());
        assert_eq!(spec.max_versions, 0);
    }
}
