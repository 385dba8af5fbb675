//! Compilation of a [`ScanSpec`] against a [`Schema`].

use std::{collections::BTreeSet, ops::Bound};

use regex::{bytes::Regex as BytesRegex, Regex};

use crate::{
    error::Error,
    filter::CellFilterInfo,
    key::ROW_DELETE_FAMILY,
    observability::log_debug,
    option::Clock,
    scan_spec::{CellInterval, CellPosition, QualifierMatch, RowInterval, ScanSpec},
    schema::{ColumnFamilySpec, Schema},
};

const FAMILY_SLOTS: usize = 256;

/// One end of a cell interval with its family resolved to a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellBoundary {
    pub(crate) row: String,
    pub(crate) family: u8,
    pub(crate) qualifier: Option<String>,
}

impl CellBoundary {
    /// `(row, family, qualifier)` ordering against a key, where a boundary
    /// without qualifier stands for the whole family.
    pub(crate) fn cmp_key(&self, row: &str, family: u8, qualifier: &str) -> std::cmp::Ordering {
        row.cmp(self.row.as_str())
            .then(family.cmp(&self.family))
            .then_with(|| match &self.qualifier {
                Some(bound) => qualifier.cmp(bound.as_str()),
                None => std::cmp::Ordering::Equal,
            })
    }
}

/// A cell interval with resolved family codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedCellInterval {
    pub(crate) start: Bound<CellBoundary>,
    pub(crate) end: Bound<CellBoundary>,
}

/// A scan spec compiled against a schema: per-family filter state, the family
/// mask, the explicit row set and compiled regular expressions.
///
/// Built once per scan and owned by the reader for the scan's lifetime.
#[derive(Debug)]
pub struct ScanContext<'a> {
    schema: &'a Schema,
    pub(crate) family_mask: [bool; FAMILY_SLOTS],
    pub(crate) family_info: Vec<CellFilterInfo>,
    pub(crate) column_families: [Option<&'a ColumnFamilySpec>; FAMILY_SLOTS],
    pub(crate) row_regexp: Option<Regex>,
    pub(crate) value_regexp: Option<BytesRegex>,
    pub(crate) row_set: BTreeSet<String>,
    pub(crate) use_row_set: bool,
    pub(crate) row_intervals: Vec<RowInterval>,
    pub(crate) cell_intervals: Vec<ResolvedCellInterval>,
    pub(crate) time_interval: (i64, i64),
    pub(crate) keys_only: bool,
    pub(crate) row_limit: u32,
    pub(crate) cell_limit: u32,
    pub(crate) cell_limit_per_family: u32,
    pub(crate) row_offset: u32,
    pub(crate) cell_offset: u32,
    pub(crate) has_value_filters: bool,
    pub(crate) now: i64,
}

impl<'a> ScanContext<'a> {
    /// Compile `spec` against `schema` using the wall clock for TTL cutoffs.
    pub fn compile(spec: &ScanSpec, schema: &'a Schema) -> Result<Self, Error> {
        Self::compile_at(spec, schema, Clock::System.now())
    }

    /// Compile `spec` against `schema` with TTL cutoffs relative to `now`.
    pub fn compile_at(spec: &ScanSpec, schema: &'a Schema, now: i64) -> Result<Self, Error> {
        validate(spec)?;

        let mut ctx = ScanContext {
            schema,
            family_mask: [false; FAMILY_SLOTS],
            family_info: (0..FAMILY_SLOTS).map(|_| CellFilterInfo::default()).collect(),
            column_families: [None; FAMILY_SLOTS],
            row_regexp: None,
            value_regexp: None,
            row_set: BTreeSet::new(),
            use_row_set: false,
            row_intervals: spec.row_intervals.clone(),
            cell_intervals: Vec::with_capacity(spec.cell_intervals.len()),
            time_interval: spec.time_interval,
            keys_only: spec.keys_only,
            row_limit: spec.row_limit,
            cell_limit: spec.cell_limit,
            cell_limit_per_family: spec.cell_limit_per_family,
            row_offset: spec.row_offset,
            cell_offset: spec.cell_offset,
            has_value_filters: false,
            now,
        };

        if spec.columns.is_empty() {
            for family in schema.families() {
                if family.is_deleted() || family.is_counter() {
                    continue;
                }
                ctx.select_family(family, spec.max_versions);
                ctx.family_info[family.id() as usize].accept_all_qualifiers();
            }
        } else {
            for column in &spec.columns {
                let family = ctx.resolve_family(&column.family)?;
                if family.is_counter() {
                    return Err(Error::CounterUnsupported(column.family.clone()));
                }
                ctx.select_family(family, spec.max_versions);
                let info = &mut ctx.family_info[family.id() as usize];
                match &column.qualifier {
                    QualifierMatch::Any => info.accept_all_qualifiers(),
                    QualifierMatch::Exact(q) => info.add_qualifier(q, false, false)?,
                    QualifierMatch::Prefix(q) => info.add_qualifier(q, false, true)?,
                    QualifierMatch::Regex(q) => info.add_qualifier(q, true, false)?,
                }
            }
        }
        ctx.family_mask[ROW_DELETE_FAMILY as usize] = true;

        for predicate in &spec.column_predicates {
            let code = ctx.resolve_family(&predicate.column_family)?.id();
            ctx.family_info[code as usize].add_predicate(predicate)?;
            ctx.has_value_filters = true;
        }

        if let Some(pattern) = &spec.row_regexp {
            ctx.row_regexp = Some(Regex::new(pattern).map_err(|err| {
                Error::BadScanSpec(format!("invalid row regexp {pattern:?}: {err}"))
            })?);
        }
        if let Some(pattern) = &spec.value_regexp {
            ctx.value_regexp = Some(BytesRegex::new(pattern).map_err(|err| {
                Error::BadScanSpec(format!("invalid value regexp {pattern:?}: {err}"))
            })?);
            ctx.has_value_filters = true;
        }

        if spec.scan_and_filter_rows {
            ctx.use_row_set = true;
            for interval in &spec.row_intervals {
                let row = interval.as_single_row().ok_or_else(|| {
                    Error::BadScanSpec(
                        "scan_and_filter_rows requires single-row intervals".to_owned(),
                    )
                })?;
                ctx.row_set.insert(row.to_owned());
            }
            ctx.row_intervals.clear();
        }
        if !spec.rows.is_empty() {
            ctx.use_row_set = true;
            ctx.row_set.extend(spec.rows.iter().cloned());
        }

        for interval in &spec.cell_intervals {
            let resolved = ctx.resolve_cell_interval(interval)?;
            ctx.cell_intervals.push(resolved);
        }

        log_debug!(
            component = "context",
            event = "scan_context_compiled",
            families = ctx.family_mask[1..].iter().filter(|selected| **selected).count(),
            row_set = ctx.row_set.len(),
            row_intervals = ctx.row_intervals.len(),
            cell_intervals = ctx.cell_intervals.len(),
            value_filters = ctx.has_value_filters,
        );
        Ok(ctx)
    }

    /// Schema the context was compiled against.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Whether cells of `family` pass the family filter.
    pub fn family_selected(&self, family: u8) -> bool {
        self.family_mask[family as usize]
    }

    /// Filter state of `family`.
    pub fn family_info(&self, family: u8) -> &CellFilterInfo {
        &self.family_info[family as usize]
    }

    /// Remaining explicit rows, in scan order.
    pub fn row_set(&self) -> impl Iterator<Item = &str> {
        self.row_set.iter().map(String::as_str)
    }

    /// Time interval `[start, end)`.
    pub fn time_interval(&self) -> (i64, i64) {
        self.time_interval
    }

    /// Whether values are omitted.
    pub fn keys_only(&self) -> bool {
        self.keys_only
    }

    fn resolve_family(&self, name: &str) -> Result<&'a ColumnFamilySpec, Error> {
        self.schema
            .family_by_name(name)
            .ok_or_else(|| Error::UnknownColumnFamily(name.to_owned()))
    }

    fn select_family(&mut self, family: &'a ColumnFamilySpec, spec_max_versions: u32) {
        let code = family.id() as usize;
        self.family_mask[code] = true;
        self.column_families[code] = Some(family);
        let info = &mut self.family_info[code];
        info.cutoff_time = family.cutoff_time(self.now);
        info.max_versions = effective_max_versions(spec_max_versions, family.get_max_versions());
    }

    fn resolve_cell_interval(&self, interval: &CellInterval) -> Result<ResolvedCellInterval, Error> {
        let resolve = |bound: &Bound<CellPosition>| -> Result<Bound<CellBoundary>, Error> {
            let position = match bound {
                Bound::Unbounded => return Ok(Bound::Unbounded),
                Bound::Included(position) | Bound::Excluded(position) => position,
            };
            let (family, qualifier) = match position.column.split_once(':') {
                Some((family, qualifier)) => (family, Some(qualifier.to_owned())),
                None => (position.column.as_str(), None),
            };
            let boundary = CellBoundary {
                row: position.row.clone(),
                family: self.resolve_family(family)?.id(),
                qualifier,
            };
            Ok(match bound {
                Bound::Included(_) => Bound::Included(boundary),
                _ => Bound::Excluded(boundary),
            })
        };
        let resolved = ResolvedCellInterval {
            start: resolve(&interval.start)?,
            end: resolve(&interval.end)?,
        };
        if let (
            Bound::Included(start) | Bound::Excluded(start),
            Bound::Included(end) | Bound::Excluded(end),
        ) = (&resolved.start, &resolved.end)
        {
            let qualifier = start.qualifier.as_deref().unwrap_or("");
            if end.cmp_key(&start.row, start.family, qualifier).is_gt() {
                return Err(Error::BadScanSpec(format!(
                    "cell interval starts after it ends: {interval:?}"
                )));
            }
        }
        Ok(resolved)
    }
}

/// `min` of two version caps where `0` means "no cap".
fn effective_max_versions(spec: u32, family: u32) -> u32 {
    match (spec, family) {
        (0, cap) | (cap, 0) => cap,
        (spec, family) => spec.min(family),
    }
}

fn validate(spec: &ScanSpec) -> Result<(), Error> {
    if spec.row_offset > 0 && spec.cell_offset > 0 {
        return Err(Error::BadScanSpec(
            "row_offset and cell_offset cannot both be set".to_owned(),
        ));
    }
    if !spec.row_intervals.is_empty() && !spec.cell_intervals.is_empty() {
        return Err(Error::BadScanSpec(
            "row intervals and cell intervals cannot be combined".to_owned(),
        ));
    }
    if !spec.rows.is_empty() && !(spec.row_intervals.is_empty() || spec.scan_and_filter_rows) {
        return Err(Error::BadScanSpec(
            "explicit rows cannot be combined with row intervals".to_owned(),
        ));
    }
    if !spec.rows.is_empty() && !spec.cell_intervals.is_empty() {
        return Err(Error::BadScanSpec(
            "explicit rows cannot be combined with cell intervals".to_owned(),
        ));
    }
    if let Some(interval) = spec.row_intervals.iter().find(|i| i.is_inverted()) {
        return Err(Error::BadScanSpec(format!(
            "row interval starts after it ends: {interval:?}"
        )));
    }
    let (start, end) = spec.time_interval;
    if start > end {
        return Err(Error::BadScanSpec(format!(
            "time interval [{start}, {end}) is inverted"
        )));
    }
    Ok(())
}
