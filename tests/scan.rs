mod common;

use std::ops::Bound;

use bytes::Bytes;
use cellscan::{
    compile_scan_context, key, open_reader, store::OrderedStore, CellInterval, CellPosition,
    ColumnPredicate, ColumnSelector, Error, ExpireMode, Flag, Key, PredicateOp, RowInterval,
    ScanSpec,
};
use common::{coordinates, load, rows, scan, table, table_with, NOW};

fn cell(row: &str, column: &str, timestamp: i64) -> (String, String, i64) {
    (row.to_owned(), column.to_owned(), timestamp)
}

#[test]
fn version_cap_keeps_most_recent() {
    let table = table();
    for ts in 1..=5 {
        load(&table, &[("r", "log", "q", ts, "v"), ("r", "info", "q", ts, "v")]);
    }

    let cells = scan(&table, &ScanSpec::default().column(ColumnSelector::family("log")));
    assert_eq!(
        coordinates(&cells),
        vec![cell("r", "log:q", 5), cell("r", "log:q", 4), cell("r", "log:q", 3)]
    );

    let cells = scan(&table, &ScanSpec::default().max_versions(2));
    assert_eq!(
        coordinates(&cells),
        vec![
            cell("r", "info:q", 5),
            cell("r", "info:q", 4),
            cell("r", "log:q", 5),
            cell("r", "log:q", 4),
        ]
    );

    let cells = scan(&table, &ScanSpec::default().column(ColumnSelector::family("info")));
    assert_eq!(cells.len(), 5);
}

#[test]
fn expired_cells_are_hidden_and_erased() {
    let old = NOW - 5_000_000_000;
    let fresh = NOW - 500_000_000;
    let data = [
        ("r", "info", "name", 1, "x"),
        ("r", "session", "token", old, "old"),
        ("r", "session", "token", fresh, "new"),
    ];

    let table = table();
    load(&table, &data);
    let cells = scan(&table, &ScanSpec::default());
    assert_eq!(
        coordinates(&cells),
        vec![cell("r", "info:name", 1), cell("r", "session:token", fresh)]
    );
    assert_eq!(table.store().len(), 2);
    assert_eq!(scan(&table, &ScanSpec::default()).len(), 2);

    let deferred = table_with(ExpireMode::Deferred);
    load(&deferred, &data);
    assert_eq!(scan(&deferred, &ScanSpec::default()).len(), 2);
    assert_eq!(deferred.store().len(), 2);

    let retained = table_with(ExpireMode::Retain);
    load(&retained, &data);
    assert_eq!(scan(&retained, &ScanSpec::default()).len(), 2);
    assert_eq!(retained.store().len(), 3);
}

#[test]
fn row_limit_ends_each_interval() {
    let table = table();
    for row in ["a", "a1", "b", "c", "c1"] {
        load(&table, &[(row, "info", "q", 1, row)]);
    }

    let spec = ScanSpec::default()
        .row_interval(RowInterval::half_open("a", "b"))
        .row_interval(RowInterval::half_open("c", "d"))
        .row_limit(1);
    assert_eq!(rows(&scan(&table, &spec)), vec!["a"]);

    let spec = ScanSpec::default()
        .row_interval(RowInterval::half_open("a", "b"))
        .row_interval(RowInterval::half_open("c", "d"));
    assert_eq!(rows(&scan(&table, &spec)), vec!["a", "a1", "c", "c1"]);

    let spec = ScanSpec::default().row_offset(1).row_limit(2);
    assert_eq!(rows(&scan(&table, &spec)), vec!["a1", "b"]);
}

#[test]
fn cell_limits_and_offsets() {
    let table = table();
    for row in ["r1", "r2"] {
        load(
            &table,
            &[
                (row, "info", "a", 1, "v"),
                (row, "info", "b", 1, "v"),
                (row, "log", "c", 1, "v"),
            ],
        );
    }

    let cells = scan(&table, &ScanSpec::default().cell_limit(4));
    assert_eq!(
        coordinates(&cells),
        vec![
            cell("r1", "info:a", 1),
            cell("r1", "info:b", 1),
            cell("r1", "log:c", 1),
            cell("r2", "info:a", 1),
        ]
    );

    let cells = scan(&table, &ScanSpec::default().cell_limit_per_family(1));
    assert_eq!(
        coordinates(&cells),
        vec![
            cell("r1", "info:a", 1),
            cell("r1", "log:c", 1),
            cell("r2", "info:a", 1),
            cell("r2", "log:c", 1),
        ]
    );

    let cells = scan(&table, &ScanSpec::default().cell_offset(2));
    assert_eq!(cells.len(), 4);
    assert_eq!(coordinates(&cells)[0], cell("r1", "log:c", 1));

    let cells = scan(&table, &ScanSpec::default().row_offset(1));
    assert_eq!(rows(&cells), vec!["r2"]);
    assert_eq!(cells.len(), 3);
}

#[test]
fn qualifier_matchers() {
    let table = table();
    for qualifier in ["a", "bxy", "cz", "d"] {
        load(&table, &[("r", "info", qualifier, 1, "v")]);
    }
    let expected = vec![
        cell("r", "info:a", 1),
        cell("r", "info:bxy", 1),
        cell("r", "info:cz", 1),
    ];

    let spec = ScanSpec::default()
        .column(ColumnSelector::exact("info", "a"))
        .column(ColumnSelector::prefix("info", "b"))
        .column(ColumnSelector::regex("info", "^c"));
    assert_eq!(coordinates(&scan(&table, &spec)), expected);

    let parsed = ["info:a", "info:^b", "info:/^c/"]
        .into_iter()
        .fold(ScanSpec::default(), |spec, column| {
            spec.column(column.parse().expect("selector should parse"))
        });
    assert_eq!(coordinates(&scan(&table, &parsed)), expected);
}

#[test]
fn explicit_rows_are_visited_in_order() {
    let table = table();
    for row in ["a", "b", "c", "d", "e"] {
        load(&table, &[(row, "info", "q", 1, row), (row, "log", "q", 1, row)]);
    }

    let cells = scan(&table, &ScanSpec::default().row("d").row("b"));
    assert_eq!(rows(&cells), vec!["b", "d"]);
    assert_eq!(cells.len(), 4);

    let spec = ScanSpec::default()
        .row_interval(RowInterval::single("d"))
        .row_interval(RowInterval::single("b"))
        .scan_and_filter_rows(true);
    assert_eq!(rows(&scan(&table, &spec)), vec!["b", "d"]);

    let spec = ScanSpec::default().row("bb").row("zz");
    assert!(scan(&table, &spec).is_empty());
}

#[test]
fn keys_only_skips_values() {
    let table = table();
    load(&table, &[("a", "info", "q", 1, "v"), ("b", "log", "q", 1, "v")]);
    let cells = scan(&table, &ScanSpec::default().keys_only(true));
    assert_eq!(cells.len(), 2);
    assert!(cells.iter().all(|cell| cell.value.is_none()));
    assert_eq!(table.store().stats().value_reads, 0);

    let cells = scan(&table, &ScanSpec::default());
    assert_eq!(cells[0].value, Some(Bytes::from("v")));
}

#[test]
fn value_predicates_fetch_only_their_family() {
    let table = table();
    load(
        &table,
        &[
            ("r1", "info", "q", 1, "yes"),
            ("r1", "log", "q", 1, "l1"),
            ("r2", "info", "q", 1, "no"),
            ("r2", "log", "q", 1, "l2"),
            ("r3", "info", "q", 1, ""),
        ],
    );

    let spec = ScanSpec::default()
        .column_predicate(ColumnPredicate::new("info", PredicateOp::Exact, "yes"))
        .keys_only(true);
    let cells = scan(&table, &spec);
    assert_eq!(
        coordinates(&cells),
        vec![cell("r1", "info:q", 1), cell("r1", "log:q", 1), cell("r2", "log:q", 1)]
    );
    assert_eq!(table.store().stats().value_reads, 3);

    let spec = ScanSpec::default()
        .column(ColumnSelector::family("info"))
        .column_predicate(ColumnPredicate::new("info", PredicateOp::Prefix, "n"))
        .column_predicate(ColumnPredicate::new("info", PredicateOp::Regex, "^y"));
    assert_eq!(rows(&scan(&table, &spec)), vec!["r1", "r2"]);

    let spec = ScanSpec::default()
        .column(ColumnSelector::family("info"))
        .column_predicate(ColumnPredicate::absent("info"));
    assert_eq!(rows(&scan(&table, &spec)), vec!["r3"]);
}

#[test]
fn row_value_and_time_filters() {
    let table = table();
    load(
        &table,
        &[
            ("r1", "info", "q", 10, "alpha"),
            ("r1", "log", "q", 20, "beta"),
            ("r2", "info", "q", 30, "gamma"),
            ("r10", "info", "q", 40, "alpine"),
        ],
    );

    let cells = scan(&table, &ScanSpec::default().row_regexp("^r1$"));
    assert_eq!(rows(&cells), vec!["r1"]);
    assert_eq!(cells.len(), 2);

    let cells = scan(&table, &ScanSpec::default().value_regexp("^al"));
    assert_eq!(rows(&cells), vec!["r1", "r10"]);

    let cells = scan(&table, &ScanSpec::default().time_interval(20, 40));
    assert_eq!(
        coordinates(&cells),
        vec![cell("r1", "log:q", 20), cell("r2", "info:q", 30)]
    );
}

#[test]
fn cell_intervals_bound_by_column() {
    let table = table();
    for row in ["a", "b", "c", "d"] {
        load(
            &table,
            &[
                (row, "info", "x", 1, "v"),
                (row, "info", "y", 1, "v"),
                (row, "log", "z", 1, "v"),
            ],
        );
    }

    let spec = ScanSpec::default().cell_interval(CellInterval::closed(
        CellPosition::new("b", "info:y"),
        CellPosition::new("c", "info"),
    ));
    assert_eq!(
        coordinates(&scan(&table, &spec)),
        vec![
            cell("b", "info:y", 1),
            cell("b", "log:z", 1),
            cell("c", "info:x", 1),
            cell("c", "info:y", 1),
        ]
    );

    let spec = ScanSpec::default().cell_interval(CellInterval::new(
        Bound::Included(CellPosition::new("b", "info:y")),
        Bound::Excluded(CellPosition::new("c", "info")),
    ));
    assert_eq!(
        coordinates(&scan(&table, &spec)),
        vec![cell("b", "info:y", 1), cell("b", "log:z", 1)]
    );
}

#[test]
fn foreign_delete_markers_shadow_cells() {
    let table = table();
    for ts in [10, 20, 30] {
        load(&table, &[("r", "info", "q", ts, "v"), ("r", "log", "q", ts, "v")]);
    }
    for ts in [5, 15, 20] {
        load(&table, &[("r", "events", "e", ts, "v")]);
    }
    load(&table, &[("s", "info", "q", 5, "v")]);
    let markers = [
        (Key::new("r", 1, "q", 20).with_flag(Flag::DeleteCell), false),
        (Key::new("r", 2, "", 30).with_flag(Flag::DeleteColumnFamily), false),
        (Key::new("r", 5, "e", 10).with_flag(Flag::DeleteCell), true),
        (Key::new("r", 5, "e", 20).with_flag(Flag::DeleteCellVersion), true),
    ];
    for (marker, ascending) in &markers {
        table
            .store()
            .insert(key::encode_at(marker, *ascending, NOW), Bytes::new())
            .expect("insert marker");
    }

    let cells = scan(&table, &ScanSpec::default());
    assert_eq!(
        coordinates(&cells),
        vec![
            cell("r", "info:q", 30),
            cell("r", "events:e", 15),
            cell("s", "info:q", 5),
        ]
    );

    let spec = ScanSpec::default().cell_interval(CellInterval::closed(
        CellPosition::new("r", "log:q"),
        CellPosition::new("r", "log:q"),
    ));
    assert!(scan(&table, &spec).is_empty());
}

#[test]
fn row_offset_counts_rows_failing_the_qualifier() {
    let table = table();
    load(&table, &[("a", "info", "zzz", 1, "v"), ("b", "info", "x", 1, "v")]);
    let spec = ScanSpec::default()
        .column(ColumnSelector::exact("info", "x"))
        .row_offset(1);
    assert_eq!(
        coordinates(&scan(&table, &spec)),
        vec![cell("b", "info:x", 1)]
    );
}

#[test]
fn ascending_family_returns_oldest_first() {
    let table = table();
    for ts in [3, 1, 2] {
        load(&table, &[("r", "events", "e", ts, "v")]);
    }
    let cells = scan(&table, &ScanSpec::default());
    assert_eq!(
        coordinates(&cells),
        vec![cell("r", "events:e", 1), cell("r", "events:e", 2), cell("r", "events:e", 3)]
    );
}

#[test]
fn compile_errors() {
    let table = table();
    let cases = [
        ScanSpec::default().column(ColumnSelector::family("nope")),
        ScanSpec::default().column(ColumnSelector::family("hits")),
        ScanSpec::default().row_regexp("("),
        ScanSpec::default().row_offset(1).cell_offset(1),
    ];
    let results: Vec<_> = cases.iter().map(|spec| table.scan(spec).err()).collect();
    assert!(matches!(results[0], Some(Error::UnknownColumnFamily(_))));
    assert!(matches!(results[1], Some(Error::CounterUnsupported(_))));
    assert!(matches!(results[2], Some(Error::BadScanSpec(_))));
    assert!(matches!(results[3], Some(Error::BadScanSpec(_))));
}

#[test]
fn free_functions_drive_a_store() {
    let table = table();
    load(&table, &[("a", "info", "q", 1, "v"), ("b", "info", "q", 1, "w")]);
    let spec = ScanSpec::default().row("b");
    let ctx = compile_scan_context(&spec, table.schema()).expect("compile");
    let mut reader = open_reader(table.store(), ctx).expect("open");
    let cell = reader.next_cell().expect("read").expect("one cell");
    assert_eq!((cell.row, cell.value), ("b", Some(&b"w"[..])));
    assert!(reader.next_cell().expect("read").is_none());
    assert_eq!(reader.stats().cells_returned, 1);
}
