use thiserror::Error;

use crate::{key::KeyError, store::StoreError};

/// Errors surfaced by scan compilation, reading and range deletes.
#[derive(Debug, Error)]
pub enum Error {
    /// A [`ScanSpec`](crate::ScanSpec) cannot be compiled.
    #[error("bad scan spec: {0}")]
    BadScanSpec(String),
    /// A column family named by a scan or mutation is absent from the schema.
    #[error("unknown column family: {0}")]
    UnknownColumnFamily(String),
    /// Counter column families cannot be scanned cell by cell.
    #[error("counter column family not supported: {0}")]
    CounterUnsupported(String),
    /// A key read from the store failed to decode.
    #[error("malformed key: {0}")]
    MalformedKey(#[from] KeyError),
    /// A delete request lacks the components its flag requires.
    #[error("bad delete request: {0}")]
    BadDeleteRequest(String),
    /// The ordered store reported a failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
