//! Per-variant cursor strategies.
//!
//! Every reader shares one filter pipeline; variants differ only in how the next
//! candidate key is produced, which rows they accept and what a reached limit
//! means.

use std::{cmp::Ordering, collections::BTreeSet, ops::Bound};

use super::state::Tombstones;
use crate::{
    context::{CellBoundary, ResolvedCellInterval, ScanContext},
    error::Error,
    key::{self, Flag, Key, ROW_DELETE_FAMILY},
    scan_spec::RowInterval,
    store::{MatchMode, StoreCursor},
};

/// Outcome of the row filter for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowVerdict {
    Accept,
    Skip,
    End,
}

/// Row interval bounds in `strcmp` form: a row is inside when
/// `cmp(row, start) >= cmp_start` and `cmp(row, end) <= cmp_end`.
#[derive(Debug, Clone)]
pub(crate) struct RowBoundary {
    start: Option<String>,
    cmp_start: i32,
    end: Option<String>,
    cmp_end: i32,
}

impl RowBoundary {
    fn new(interval: &RowInterval) -> Self {
        let (start, cmp_start) = match &interval.start {
            Bound::Unbounded => (None, 0),
            Bound::Included(row) => (Some(row.clone()), 0),
            Bound::Excluded(row) => (Some(row.clone()), 1),
        };
        let (end, cmp_end) = match &interval.end {
            Bound::Unbounded => (None, 0),
            Bound::Included(row) => (Some(row.clone()), 0),
            Bound::Excluded(row) => (Some(row.clone()), -1),
        };
        Self {
            start,
            cmp_start,
            end,
            cmp_end,
        }
    }

    fn seek_key(&self) -> Vec<u8> {
        match &self.start {
            None => Vec::new(),
            Some(row) if self.cmp_start == 0 => key::row_prefix(row),
            Some(row) => key::row_successor(row),
        }
    }

    fn before_start(&self, row: &str) -> bool {
        self.start
            .as_deref()
            .is_some_and(|start| strcmp(row, start) < self.cmp_start)
    }

    fn after_end(&self, row: &str) -> bool {
        self.end
            .as_deref()
            .is_some_and(|end| strcmp(row, end) > self.cmp_end)
    }
}

fn strcmp(a: &str, b: &str) -> i32 {
    match a.cmp(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Cursor strategy of a reader.
#[derive(Debug)]
pub(crate) enum Source {
    /// Every key from the start of the store.
    Full { started: bool },
    /// Row intervals in the order given.
    RowIntervals {
        intervals: Vec<RowBoundary>,
        index: usize,
        seek_pending: bool,
    },
    /// Cell intervals in the order given.
    CellIntervals {
        intervals: Vec<ResolvedCellInterval>,
        index: usize,
        seek_pending: bool,
    },
    /// One seek per row of the explicit row set.
    RowSet {
        target: Option<String>,
        seek_pending: bool,
    },
}

impl Source {
    /// Pick the variant the compiled scan asks for.
    pub(crate) fn for_context(ctx: &mut ScanContext<'_>) -> Self {
        if ctx.use_row_set {
            Source::RowSet {
                target: None,
                seek_pending: true,
            }
        } else if !ctx.cell_intervals.is_empty() {
            Source::CellIntervals {
                intervals: std::mem::take(&mut ctx.cell_intervals),
                index: 0,
                seek_pending: true,
            }
        } else if !ctx.row_intervals.is_empty() {
            Source::RowIntervals {
                intervals: ctx.row_intervals.iter().map(RowBoundary::new).collect(),
                index: 0,
                seek_pending: true,
            }
        } else {
            Source::Full { started: false }
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Source::Full { .. } => "full",
            Source::RowIntervals { .. } => "row_intervals",
            Source::CellIntervals { .. } => "cell_intervals",
            Source::RowSet { .. } => "row_set",
        }
    }

    /// Position the cursor on the next candidate key; `false` ends the scan.
    pub(crate) fn advance<C: StoreCursor>(
        &mut self,
        cursor: &mut C,
        row_set: &mut BTreeSet<String>,
        tombstones: &mut Tombstones,
        scratch: &mut Key,
    ) -> Result<bool, Error> {
        match self {
            Source::Full { started } => {
                if *started {
                    Ok(cursor.move_next()?)
                } else {
                    *started = true;
                    Ok(cursor.find(&[], MatchMode::GreaterEqual)?)
                }
            }
            Source::RowIntervals {
                intervals,
                index,
                seek_pending,
            } => loop {
                let Some(interval) = intervals.get(*index) else {
                    return Ok(false);
                };
                let found = if *seek_pending {
                    *seek_pending = false;
                    cursor.find(&interval.seek_key(), MatchMode::GreaterEqual)?
                } else {
                    cursor.move_next()?
                };
                if found {
                    return Ok(true);
                }
                *index += 1;
                *seek_pending = true;
            },
            Source::CellIntervals {
                intervals,
                index,
                seek_pending,
            } => loop {
                let Some(interval) = intervals.get(*index) else {
                    return Ok(false);
                };
                let found = if *seek_pending {
                    *seek_pending = false;
                    let seek_key = match &interval.start {
                        Bound::Unbounded => Vec::new(),
                        Bound::Included(start) => {
                            prime_tombstones(cursor, start, tombstones, scratch)?;
                            match &start.qualifier {
                                Some(q) => key::cell_prefix(&start.row, start.family, q),
                                None => key::family_prefix(&start.row, start.family),
                            }
                        }
                        Bound::Excluded(start) => {
                            prime_tombstones(cursor, start, tombstones, scratch)?;
                            match &start.qualifier {
                                Some(q) => key::cell_successor(&start.row, start.family, q),
                                None => key::family_successor(&start.row, start.family),
                            }
                        }
                    };
                    cursor.find(&seek_key, MatchMode::GreaterEqual)?
                } else {
                    cursor.move_next()?
                };
                if found {
                    return Ok(true);
                }
                *index += 1;
                *seek_pending = true;
            },
            Source::RowSet {
                target,
                seek_pending,
            } => {
                if !*seek_pending {
                    return Ok(cursor.move_next()?);
                }
                *seek_pending = false;
                if target.is_none() {
                    *target = row_set.pop_first();
                }
                match target {
                    Some(row) => Ok(cursor.find(&key::row_prefix(row), MatchMode::GreaterEqual)?),
                    None => Ok(false),
                }
            }
        }
    }

    /// Apply the variant's row constraint to `key`.
    pub(crate) fn filter_row(&mut self, key: &Key, row_set: &mut BTreeSet<String>) -> RowVerdict {
        match self {
            Source::Full { .. } => RowVerdict::Accept,
            Source::RowIntervals {
                intervals,
                index,
                seek_pending,
            } => {
                let Some(interval) = intervals.get(*index) else {
                    return RowVerdict::End;
                };
                if interval.after_end(&key.row) {
                    *index += 1;
                    *seek_pending = true;
                    RowVerdict::Skip
                } else if interval.before_start(&key.row) {
                    RowVerdict::Skip
                } else {
                    RowVerdict::Accept
                }
            }
            Source::CellIntervals {
                intervals,
                index,
                seek_pending,
            } => {
                let Some(interval) = intervals.get(*index) else {
                    return RowVerdict::End;
                };
                let past_end = match &interval.end {
                    Bound::Unbounded => false,
                    Bound::Included(end) => end
                        .cmp_key(&key.row, key.column_family_code, &key.column_qualifier)
                        .is_gt(),
                    Bound::Excluded(end) => end
                        .cmp_key(&key.row, key.column_family_code, &key.column_qualifier)
                        .is_ge(),
                };
                if past_end {
                    *index += 1;
                    *seek_pending = true;
                    RowVerdict::Skip
                } else {
                    RowVerdict::Accept
                }
            }
            Source::RowSet {
                target,
                seek_pending,
            } => loop {
                let Some(row) = target.as_deref() else {
                    return RowVerdict::End;
                };
                match key.row.as_str().cmp(row) {
                    Ordering::Equal => return RowVerdict::Accept,
                    Ordering::Less => return RowVerdict::Skip,
                    Ordering::Greater => {
                        *target = row_set.pop_first();
                        match target.as_deref() {
                            None => return RowVerdict::End,
                            Some(next) if next > key.row.as_str() => {
                                *seek_pending = true;
                                return RowVerdict::Skip;
                            }
                            Some(_) => {}
                        }
                    }
                }
            },
        }
    }

    /// React to a row or cell limit; `true` ends the whole scan.
    pub(crate) fn limit_reached(&mut self) -> bool {
        match self {
            Source::Full { .. } | Source::RowSet { .. } => true,
            Source::RowIntervals {
                index,
                seek_pending,
                ..
            }
            | Source::CellIntervals {
                index,
                seek_pending,
                ..
            } => {
                *index += 1;
                *seek_pending = true;
                false
            }
        }
    }
}

/// A seek into the middle of a row skips the row's delete markers; probe for
/// the row marker and, when seeking past the family's empty qualifier, the
/// family marker.
fn prime_tombstones<C: StoreCursor>(
    cursor: &mut C,
    start: &CellBoundary,
    tombstones: &mut Tombstones,
    scratch: &mut Key,
) -> Result<(), Error> {
    if cursor.find(&key::row_prefix(&start.row), MatchMode::GreaterEqual)? {
        if let Some(raw) = cursor.key() {
            key::decode_into(raw, scratch)?;
            if scratch.row == start.row
                && scratch.column_family_code == ROW_DELETE_FAMILY
                && scratch.flag == Flag::DeleteRow
            {
                tombstones.record(scratch);
            }
        }
    }
    if start.qualifier.as_deref().map_or(true, str::is_empty) {
        return Ok(());
    }
    let mut found = cursor.find(
        &key::cell_prefix(&start.row, start.family, ""),
        MatchMode::GreaterEqual,
    )?;
    while found {
        let Some(raw) = cursor.key() else { break };
        key::decode_into(raw, scratch)?;
        if scratch.row != start.row
            || scratch.column_family_code != start.family
            || !scratch.column_qualifier.is_empty()
        {
            break;
        }
        if scratch.flag == Flag::DeleteColumnFamily {
            tombstones.record(scratch);
            break;
        }
        found = cursor.move_next()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_boundary_strcmp_thresholds() {
        let closed = RowBoundary::new(&RowInterval::closed("b", "d"));
        assert!(closed.before_start("a"));
        assert!(!closed.before_start("b"));
        assert!(!closed.after_end("d"));
        assert!(closed.after_end("da"));

        let open = RowBoundary::new(&RowInterval::new(
            Bound::Excluded("b".into()),
            Bound::Excluded("d".into()),
        ));
        assert!(open.before_start("b"));
        assert!(!open.before_start("ba"));
        assert!(open.after_end("d"));
        assert!(!open.after_end("cz"));
        assert_eq!(open.seek_key(), key::row_successor("b"));

        let all = RowBoundary::new(&RowInterval::all());
        assert!(!all.before_start(""));
        assert!(!all.after_end("zzz"));
        assert!(all.seek_key().is_empty());
    }

    #[test]
    fn row_set_trims_exhausted_rows() {
        let mut row_set: BTreeSet<String> = ["c", "e", "g"].into_iter().map(String::from).collect();
        let mut source = Source::RowSet {
            target: Some("a".into()),
            seek_pending: false,
        };
        assert_eq!(
            source.filter_row(&Key::new("e", 1, "", 1), &mut row_set),
            RowVerdict::Accept
        );
        assert_eq!(row_set.len(), 1);
        assert_eq!(
            source.filter_row(&Key::new("f", 1, "", 1), &mut row_set),
            RowVerdict::Skip
        );
        assert!(matches!(
            source,
            Source::RowSet { seek_pending: true, ref target } if target.as_deref() == Some("g")
        ));
        assert_eq!(
            source.filter_row(&Key::new("h", 1, "", 1), &mut row_set),
            RowVerdict::End
        );
    }

    #[test]
    fn interval_limits_move_to_next_interval() {
        let mut source = Source::RowIntervals {
            intervals: vec![RowBoundary::new(&RowInterval::all())],
            index: 0,
            seek_pending: false,
        };
        assert!(!source.limit_reached());
        assert!(matches!(
            source,
            Source::RowIntervals { index: 1, seek_pending: true, .. }
        ));
        assert!(Source::Full { started: true }.limit_reached());
    }
}
