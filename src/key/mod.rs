//! Compound sort key for wide-column cells.
//!
//! A stored key is `(row, column family code, qualifier, timestamp, flag, revision)`.
//! Keys sort by row, family code and qualifier ascending, then newest timestamp
//! first, then broader delete markers ahead of narrower ones and of inserts, so a
//! single forward pass meets every marker before the versions it shadows.
//! Families stored oldest first keep their inserts in ascending timestamp order
//! and sort every delete marker of a cell ahead of them.

mod codec;

use std::fmt;

use thiserror::Error;

pub use codec::{
    cell_prefix, cell_successor, decode, decode_into, encode, encode_at, encode_into,
    family_prefix, family_successor, row_prefix, row_successor, version_prefix,
};

/// Smallest representable timestamp; also "no cutoff" for families without TTL.
pub const TIMESTAMP_MIN: i64 = i64::MIN;
/// Largest representable timestamp.
pub const TIMESTAMP_MAX: i64 = i64::MAX;
/// Timestamp placeholder replaced by the current time when a key is encoded.
pub const AUTO_ASSIGN: i64 = 0;
/// Column family code carried by row delete markers.
pub const ROW_DELETE_FAMILY: u8 = 0;

/// Kind of entry a key represents.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// A regular cell version.
    #[default]
    Insert = 1,
    /// Shadows the single version with exactly the same timestamp.
    DeleteCellVersion = 2,
    /// Shadows every version of one qualifier at or below the marker timestamp.
    DeleteCell = 3,
    /// Shadows every cell of one family at or below the marker timestamp.
    DeleteColumnFamily = 4,
    /// Shadows every cell of a row at or below the marker timestamp.
    DeleteRow = 5,
}

impl Flag {
    /// Whether the flag marks a delete rather than a value.
    pub const fn is_delete(self) -> bool {
        !matches!(self, Flag::Insert)
    }

    /// Raw flag value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Flag {
    type Error = KeyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Flag::Insert),
            2 => Ok(Flag::DeleteCellVersion),
            3 => Ok(Flag::DeleteCell),
            4 => Ok(Flag::DeleteColumnFamily),
            5 => Ok(Flag::DeleteRow),
            other => Err(KeyError::UnknownFlag(other)),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flag::Insert => "INSERT",
            Flag::DeleteCellVersion => "DELETE_CELL_VERSION",
            Flag::DeleteCell => "DELETE_CELL",
            Flag::DeleteColumnFamily => "DELETE_COLUMN_FAMILY",
            Flag::DeleteRow => "DELETE_ROW",
        };
        f.write_str(name)
    }
}

/// Errors raised while decoding a stored key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key ended before a fixed-width component.
    #[error("key truncated while reading {0}")]
    Truncated(&'static str),
    /// A variable-length component had no terminator.
    #[error("unterminated {0} component")]
    Unterminated(&'static str),
    /// A zero byte was followed by something other than a terminator or escape.
    #[error("invalid escape byte {byte:#04x} in {component}")]
    BadEscape {
        /// Offending byte following the zero byte.
        byte: u8,
        /// Component being decoded.
        component: &'static str,
    },
    /// A string component was not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    /// The flag bits did not name a known flag.
    #[error("unknown flag byte {0:#04x}")]
    UnknownFlag(u8),
    /// The order byte was unknown or disagreed with the flag.
    #[error("invalid order byte {0:#04x}")]
    UnknownOrder(u8),
    /// Bytes remained after the final component.
    #[error("{0} trailing bytes after key")]
    TrailingBytes(usize),
}

/// Decoded form of a stored key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Key {
    /// Row key.
    pub row: String,
    /// Column family code, `0` for row delete markers.
    pub column_family_code: u8,
    /// Column qualifier, empty when absent.
    ///
    /// A missing qualifier and an empty one encode identically and are treated
    /// as the same qualifier.
    pub column_qualifier: String,
    /// Timestamp in nanoseconds.
    pub timestamp: i64,
    /// Revision breaking ties between writes with the same timestamp.
    pub revision: i64,
    /// Entry kind.
    pub flag: Flag,
}

impl Key {
    /// Build an insert key with revision `0`.
    pub fn new(
        row: impl Into<String>,
        column_family_code: u8,
        column_qualifier: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            row: row.into(),
            column_family_code,
            column_qualifier: column_qualifier.into(),
            timestamp,
            revision: 0,
            flag: Flag::Insert,
        }
    }

    /// Set the revision.
    pub fn with_revision(self, revision: i64) -> Self {
        Key { revision, ..self }
    }

    /// Set the flag.
    pub fn with_flag(self, flag: Flag) -> Self {
        Key { flag, ..self }
    }
}
