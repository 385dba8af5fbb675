//! Cascading deletes at row, family, cell or version granularity.
//!
//! A delete walks the key range under its row, erasing every entry the request
//! covers. Keys sort newest first within a cell, so the walk cannot stop at the
//! first version older than the bound; it always runs to the end of its scope.

use crate::{
    error::Error,
    key::{self, Flag, Key, AUTO_ASSIGN},
    observability::log_debug,
    schema::Schema,
    store::{MatchMode, OrderedStore, StoreCursor},
};

/// What to delete.
///
/// The components a request needs depend on its flag: a family for family,
/// cell and version deletes, a qualifier for cell and version deletes, and a
/// timestamp for version deletes. For the broader deletes the timestamp is an
/// inclusive upper bound; without one every version goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Row to delete from.
    pub row: String,
    /// Column family name.
    pub family: Option<String>,
    /// Column qualifier.
    pub qualifier: Option<String>,
    /// Version timestamp, or upper bound for broader deletes.
    pub timestamp: Option<i64>,
    /// Revision of the exact version, enabling a point delete.
    pub revision: Option<i64>,
    /// Granularity.
    pub flag: Flag,
}

impl DeleteRequest {
    /// Delete a whole row.
    pub fn row(row: impl Into<String>) -> Self {
        DeleteRequest {
            row: row.into(),
            family: None,
            qualifier: None,
            timestamp: None,
            revision: None,
            flag: Flag::DeleteRow,
        }
    }

    /// Delete every cell of one family in a row.
    pub fn family(row: impl Into<String>, family: impl Into<String>) -> Self {
        DeleteRequest {
            family: Some(family.into()),
            flag: Flag::DeleteColumnFamily,
            ..Self::row(row)
        }
    }

    /// Delete every version of one cell.
    pub fn cell(
        row: impl Into<String>,
        family: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        DeleteRequest {
            qualifier: Some(qualifier.into()),
            flag: Flag::DeleteCell,
            ..Self::family(row, family)
        }
    }

    /// Delete the version of one cell written at `timestamp`.
    pub fn version(
        row: impl Into<String>,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        DeleteRequest {
            timestamp: Some(timestamp),
            flag: Flag::DeleteCellVersion,
            ..Self::cell(row, family, qualifier)
        }
    }

    /// Restrict the delete to versions at or before `timestamp`.
    pub fn timestamp(self, timestamp: i64) -> Self {
        DeleteRequest {
            timestamp: Some(timestamp),
            ..self
        }
    }

    /// Name the exact revision of a version delete.
    pub fn revision(self, revision: i64) -> Self {
        DeleteRequest {
            revision: Some(revision),
            ..self
        }
    }
}

/// A validated request with its family resolved.
#[derive(Debug)]
struct DeleteScope<'r> {
    row: &'r str,
    family: u8,
    time_order_ascending: bool,
    qualifier: &'r str,
    timestamp: Option<i64>,
    revision: Option<i64>,
    flag: Flag,
}

impl<'r> DeleteScope<'r> {
    fn resolve(schema: &Schema, request: &'r DeleteRequest) -> Result<Self, Error> {
        let needs_family = matches!(
            request.flag,
            Flag::DeleteColumnFamily | Flag::DeleteCell | Flag::DeleteCellVersion
        );
        let needs_qualifier = matches!(request.flag, Flag::DeleteCell | Flag::DeleteCellVersion);
        match request.flag {
            Flag::Insert => {
                return Err(Error::BadDeleteRequest(format!(
                    "row {:?}: INSERT is not a delete flag",
                    request.row
                )))
            }
            Flag::DeleteCellVersion if matches!(request.timestamp, None | Some(AUTO_ASSIGN)) => {
                return Err(Error::BadDeleteRequest(format!(
                    "row {:?}: version delete without timestamp",
                    request.row
                )))
            }
            _ => {}
        }
        let (family, time_order_ascending) = match (&request.family, needs_family) {
            (Some(name), true) => {
                let spec = schema
                    .family_by_name(name)
                    .ok_or_else(|| Error::UnknownColumnFamily(name.clone()))?;
                (spec.id(), spec.is_time_order_ascending())
            }
            (None, true) => {
                return Err(Error::BadDeleteRequest(format!(
                    "row {:?}: {} delete without column family",
                    request.row, request.flag
                )))
            }
            (_, false) => (key::ROW_DELETE_FAMILY, false),
        };
        let qualifier = match (&request.qualifier, needs_qualifier) {
            (Some(qualifier), true) => qualifier.as_str(),
            (None, true) => {
                return Err(Error::BadDeleteRequest(format!(
                    "row {:?}: {} delete without qualifier",
                    request.row, request.flag
                )))
            }
            (_, false) => "",
        };
        Ok(DeleteScope {
            row: &request.row,
            family,
            time_order_ascending,
            qualifier,
            timestamp: request.timestamp,
            revision: request.revision,
            flag: request.flag,
        })
    }

    /// Encoded key of the single version a revision-qualified version delete names.
    fn point_key(&self) -> Option<Vec<u8>> {
        let (Flag::DeleteCellVersion, Some(timestamp), Some(revision)) =
            (self.flag, self.timestamp, self.revision)
        else {
            return None;
        };
        let key = Key::new(self.row, self.family, self.qualifier, timestamp).with_revision(revision);
        Some(key::encode_at(&key, self.time_order_ascending, timestamp))
    }

    fn seek_key(&self) -> Vec<u8> {
        match self.flag {
            Flag::DeleteColumnFamily => key::family_prefix(self.row, self.family),
            Flag::DeleteCell | Flag::DeleteCellVersion => {
                key::cell_prefix(self.row, self.family, self.qualifier)
            }
            _ => key::row_prefix(self.row),
        }
    }

    /// Whether `key` lies past every key this scope can cover.
    fn passed(&self, key: &Key) -> bool {
        if key.row != self.row {
            return true;
        }
        match self.flag {
            Flag::DeleteColumnFamily => key.column_family_code != self.family,
            Flag::DeleteCell | Flag::DeleteCellVersion => {
                key.column_family_code != self.family || key.column_qualifier != self.qualifier
            }
            _ => false,
        }
    }

    fn covers(&self, key: &Key) -> bool {
        match (self.flag, self.timestamp) {
            (Flag::DeleteCellVersion, Some(timestamp)) => key.timestamp == timestamp,
            (_, Some(timestamp)) => key.timestamp <= timestamp,
            (_, None) => true,
        }
    }
}

/// Apply `request` to `store`, returning how many entries were erased.
pub fn delete_range<S: OrderedStore>(
    store: &S,
    schema: &Schema,
    request: &DeleteRequest,
) -> Result<usize, Error> {
    let scope = DeleteScope::resolve(schema, request)?;
    let mut cursor = store.cursor()?;
    let erased = match scope.point_key() {
        Some(point) => usize::from(cursor.find(&point, MatchMode::Exact)? && cursor.erase()?),
        None => walk(&mut cursor, &scope)?,
    };
    log_debug!(
        component = "delete",
        event = "range_delete",
        row = %request.row,
        flag = %request.flag,
        erased,
    );
    Ok(erased)
}

fn walk<C: StoreCursor>(cursor: &mut C, scope: &DeleteScope<'_>) -> Result<usize, Error> {
    let mut key = Key::default();
    let mut erased = 0;
    let mut found = cursor.find(&scope.seek_key(), MatchMode::GreaterEqual)?;
    while found {
        let Some(raw) = cursor.key() else { break };
        key::decode_into(raw, &mut key)?;
        if scope.passed(&key) {
            break;
        }
        if !scope.covers(&key) {
            found = cursor.move_next()?;
            continue;
        }
        let position = raw.to_vec();
        if cursor.erase()? {
            erased += 1;
        }
        found = cursor.find(&position, MatchMode::Greater)?;
    }
    Ok(erased)
}
