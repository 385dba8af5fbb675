//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::time::Duration;

use cellscan::{
    CellOwned, Clock, ColumnFamilySpec, ExpireMode, ScanSpec, Schema, Table, TableOption,
};

/// Instant every test table reads from its clock.
pub const NOW: i64 = 10_000_000_000;

/// `info` (plain), `log` (3 versions), `session` (1s TTL), `hits` (counter),
/// `events` (oldest version first).
pub fn schema() -> Schema {
    Schema::new()
        .generation(1)
        .family(ColumnFamilySpec::new("info", 1))
        .family(ColumnFamilySpec::new("log", 2).max_versions(3))
        .family(ColumnFamilySpec::new("session", 3).ttl(Duration::from_secs(1)))
        .family(ColumnFamilySpec::new("hits", 4).counter(true))
        .family(ColumnFamilySpec::new("events", 5).time_order_ascending(true))
}

/// In-memory table over [`schema`] with a fixed clock.
pub fn table() -> Table {
    table_with(ExpireMode::Inline)
}

pub fn table_with(expire_mode: ExpireMode) -> Table {
    let option = TableOption::default()
        .clock(Clock::Fixed(NOW))
        .expire_mode(expire_mode);
    Table::in_memory(schema(), option)
}

/// Insert `(row, family, qualifier, timestamp, value)` tuples.
pub fn load(table: &Table, cells: &[(&str, &str, &str, i64, &str)]) {
    for (row, family, qualifier, timestamp, value) in cells {
        table
            .insert(row, family, qualifier, *timestamp, value.to_string())
            .expect("insert should succeed");
    }
}

/// Run `spec` to completion.
pub fn scan(table: &Table, spec: &ScanSpec) -> Vec<CellOwned> {
    table
        .scan(spec)
        .expect("scan should compile")
        .into_owned_cells()
        .collect::<Result<Vec<_>, _>>()
        .expect("scan should not fail")
}

/// `(row, family:qualifier, timestamp)` of each cell.
pub fn coordinates(cells: &[CellOwned]) -> Vec<(String, String, i64)> {
    cells
        .iter()
        .map(|cell| {
            (
                cell.row.clone(),
                format!("{}:{}", cell.column_family, cell.column_qualifier),
                cell.timestamp,
            )
        })
        .collect()
}

/// Distinct rows in scan order.
pub fn rows(cells: &[CellOwned]) -> Vec<String> {
    let mut rows: Vec<String> = Vec::new();
    for cell in cells {
        if rows.last() != Some(&cell.row) {
            rows.push(cell.row.clone());
        }
    }
    rows
}
