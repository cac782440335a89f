//! End-to-end scenarios driven the way the relational front-end would:
//! tables created through the registry, scanned through cursors, mutated
//! through the update protocol.

use arraytab_core::error::Error;
use arraytab_core::types::Value;
use arraytab_engine::MemoryEngine;
use arraytab_tables::{standard_registry, Registry, Table, MODULE_FILE, MODULE_VARS};
use std::rc::Rc;

fn registry() -> Registry {
    standard_registry(Rc::new(MemoryEngine::new()))
}

fn scan(table: &Rc<dyn Table>) -> Vec<Vec<Value>> {
    let ncols = table.schema().unwrap().columns.len();
    let mut cursor = table.open().unwrap();
    cursor.filter(0, &[]).unwrap();
    let mut rows = Vec::new();
    while !cursor.eof().unwrap() {
        let mut row = Vec::with_capacity(ncols);
        for col in 0..ncols {
            row.push(cursor.column(col, false).unwrap());
        }
        rows.push(row);
        cursor.next().unwrap();
    }
    rows
}

fn rowids(table: &Rc<dyn Table>) -> Vec<i64> {
    let mut cursor = table.open().unwrap();
    cursor.filter(0, &[]).unwrap();
    let mut ids = Vec::new();
    while !cursor.eof().unwrap() {
        ids.push(cursor.rowid().unwrap());
        cursor.next().unwrap();
    }
    ids
}

/// args builder for a 13-slot variable-catalog mutation.
fn var_insert(name: &str, dataspec: Value) -> Vec<Value> {
    let mut args = vec![Value::Null; 13];
    args[3] = Value::Text(name.to_string());
    args[4] = dataspec;
    args
}

#[test]
fn connecting_a_container_cascades_five_sub_tables() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    assert_eq!(
        reg.table_names(),
        vec!["x", "x_attrs", "x_gentries", "x_recs", "x_vars", "x_ventries"]
    );

    let file = reg.table("x").unwrap();
    let rows = scan(&file);
    assert_eq!(rows.len(), 1);
    assert!(matches!(rows[0][0], Value::Integer(_)));
    assert_eq!(rows[0][1], Value::Text("probe".into()));
}

#[test]
fn scalar_variable_record_round_trip_and_schema_regeneration() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();
    let recs = reg.table("x_recs").unwrap();

    let rowid = vars
        .update(&var_insert("temp", Value::Text("real8".into())))
        .unwrap();
    assert_eq!(rowid, Some(1));

    // The record table regenerated: record column plus one REAL column.
    let schema = recs.schema().unwrap();
    assert_eq!(schema.columns.len(), 2);
    assert_eq!(schema.columns[1].name, "temp");

    recs.update(&[
        Value::Null,
        Value::Null,
        Value::Integer(1),
        Value::Real(21.5),
    ])
    .unwrap();

    let rows = scan(&recs);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::Integer(1));
    assert_eq!(rows[0][1], Value::Real(21.5));

    // Deleting the variable leaves only the record-number column.
    vars.update(&[Value::Integer(1)]).unwrap();
    assert_eq!(recs.schema().unwrap().columns.len(), 1);
    assert!(scan(&recs).is_empty());
}

#[test]
fn variable_name_equality_uses_the_unique_fast_path() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();
    vars.update(&var_insert("a", Value::Null)).unwrap();
    vars.update(&var_insert("b", Value::Null)).unwrap();
    vars.update(&var_insert("c", Value::Null)).unwrap();

    let plan = vars
        .best_index(&[arraytab_tables::Constraint {
            column: 1,
            op: arraytab_tables::ConstraintOp::Eq,
            usable: true,
        }])
        .unwrap();
    assert!(plan.unique_scan);
    assert_eq!(plan.usage[0].argv_index, Some(0));
    assert!(plan.usage[0].omit);

    let mut cursor = vars.open().unwrap();
    cursor.filter(plan.index_id, &[Value::Text("b".into())]).unwrap();
    assert!(!cursor.eof().unwrap());
    assert_eq!(cursor.column(1, false).unwrap(), Value::Text("b".into()));
    assert_eq!(cursor.rowid().unwrap(), 2);
    cursor.next().unwrap();
    assert!(cursor.eof().unwrap());

    // A missing name yields an empty scan, not an error.
    cursor.filter(plan.index_id, &[Value::Text("zz".into())]).unwrap();
    assert!(cursor.eof().unwrap());
}

#[test]
fn multidimensional_sizes_round_trip_through_the_catalog() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();

    let mut args = var_insert("field", Value::Text("real4".into()));
    args[6] = Value::Integer(2);
    args[7] = Value::Text("2,3".into());
    vars.update(&args).unwrap();

    let rows = scan(&vars);
    assert_eq!(rows[0][4], Value::Integer(2));
    assert_eq!(rows[0][5], Value::Text("2,3".into()));
    assert_eq!(rows[0][7], Value::Text("-1,-1".into()));

    // Mismatched separator counts are rejected.
    let mut bad = var_insert("bad", Value::Null);
    bad[6] = Value::Integer(3);
    bad[7] = Value::Text("2,3".into());
    assert!(vars.update(&bad).is_err());
}

#[test]
fn array_columns_demand_exact_blob_sizes() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();
    let recs = reg.table("x_recs").unwrap();

    let mut args = var_insert("vec", Value::Text("int2".into()));
    args[6] = Value::Integer(1);
    args[7] = Value::Integer(3);
    vars.update(&args).unwrap();

    // 3 x int2 = 6 bytes; anything else fails.
    let err = recs
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Blob(vec![0; 4]),
        ])
        .unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));

    recs.update(&[
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Blob(vec![1, 0, 2, 0, 3, 0]),
    ])
    .unwrap();
    let rows = scan(&recs);
    assert_eq!(rows[0][1], Value::Blob(vec![1, 0, 2, 0, 3, 0]));
}

#[test]
fn sparse_record_insert_surfaces_pad_values_for_skipped_columns() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();
    let recs = reg.table("x_recs").unwrap();

    let mut with_pad = var_insert("padded", Value::Text("int4".into()));
    with_pad[12] = Value::Integer(-99);
    vars.update(&with_pad).unwrap();
    vars.update(&var_insert("plain", Value::Text("int4".into())))
        .unwrap();

    // Insert at record 5 only; records 1..4 exist as pad/default rows.
    let new_rowid = recs
        .update(&[
            Value::Null,
            Value::Null,
            Value::Integer(5),
            Value::Integer(7),
            Value::Null,
        ])
        .unwrap();
    assert_eq!(new_rowid, Some(5));

    let rows = scan(&recs);
    assert_eq!(rows.len(), 5);
    let written: Vec<_> = rows
        .iter()
        .filter(|r| r[0] == Value::Integer(5))
        .collect();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][1], Value::Integer(7));
    // Skipped column reads whatever the engine pads with.
    assert_eq!(written[0][2], Value::Integer(0));
    assert_eq!(rows[0][1], Value::Integer(-99));

    // The catalog shows the pad value too.
    let catalog = scan(&vars);
    assert_eq!(catalog[0][10], Value::Integer(-99));
    assert_eq!(catalog[1][10], Value::Null);
}

#[test]
fn record_mutations_need_exactly_one_value_per_variable() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();
    let recs = reg.table("x_recs").unwrap();
    vars.update(&var_insert("a", Value::Null)).unwrap();
    vars.update(&var_insert("b", Value::Null)).unwrap();

    let err = recs
        .update(&[Value::Null, Value::Null, Value::Null, Value::Real(1.0)])
        .unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));
}

#[test]
fn global_entry_lifecycle_matches_the_title_scenario() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let attrs = reg.table("x_attrs").unwrap();
    let gentries = reg.table("x_gentries").unwrap();

    attrs
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("Title".into()),
            Value::Integer(0),
        ])
        .unwrap();
    assert_eq!(
        scan(&attrs),
        vec![vec![
            Value::Integer(1),
            Value::Text("Title".into()),
            Value::Integer(1),
        ]]
    );

    // Insert with no explicit entry number: lands at entry 1, count 9.
    let rowid = gentries
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("Title".into()),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("Mission X".into()),
        ])
        .unwrap();
    assert_eq!(rowid, Some(1));

    let rows = scan(&gentries);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::Integer(1));
    assert_eq!(rows[0][2], Value::Integer(1));
    assert_eq!(rows[0][3], Value::Text("char".into()));
    assert_eq!(rows[0][4], Value::Integer(9));
    assert_eq!(rows[0][5], Value::Text("Mission X".into()));

    // Update the same entry in place.
    gentries
        .update(&[
            Value::Integer(1),
            Value::Integer(1),
            Value::Integer(1),
            Value::Null,
            Value::Integer(1),
            Value::Null,
            Value::Null,
            Value::Text("Mission Y".into()),
        ])
        .unwrap();
    let rows = scan(&gentries);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][4], Value::Integer(9));
    assert_eq!(rows[0][5], Value::Text("Mission Y".into()));
}

#[test]
fn entry_scope_mismatch_is_rejected_without_side_effects() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let attrs = reg.table("x_attrs").unwrap();
    let vars = reg.table("x_vars").unwrap();
    let ventries = reg.table("x_ventries").unwrap();

    vars.update(&var_insert("temp", Value::Null)).unwrap();
    attrs
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("Title".into()),
            Value::Text("global".into()),
        ])
        .unwrap();

    let err = ventries
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("Title".into()),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("oops".into()),
        ])
        .unwrap_err();
    assert!(err.to_string().contains("scope"));
    assert!(scan(&ventries).is_empty());
}

#[test]
fn sparse_entries_scan_in_order_and_survive_rowid_deletes() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let attrs = reg.table("x_attrs").unwrap();
    let gentries = reg.table("x_gentries").unwrap();

    attrs
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("Notes".into()),
            Value::Integer(0),
        ])
        .unwrap();

    // Entries at 1-based numbers 1, 4, 8: sparse indices 0, 3, 7.
    for number in [1i64, 4, 8] {
        gentries
            .update(&[
                Value::Null,
                Value::Null,
                Value::Integer(1),
                Value::Null,
                Value::Integer(number),
                Value::Null,
                Value::Null,
                Value::Text(format!("note {number}")),
            ])
            .unwrap();
    }

    let rows = scan(&gentries);
    let numbers: Vec<Value> = rows.iter().map(|r| r[2].clone()).collect();
    assert_eq!(
        numbers,
        vec![Value::Integer(1), Value::Integer(4), Value::Integer(8)]
    );
    assert_eq!(rowids(&gentries), vec![1, 2, 3]);

    // Delete the middle row by flattened rowid and rescan from scratch.
    gentries.update(&[Value::Integer(2)]).unwrap();
    let rows = scan(&gentries);
    let numbers: Vec<Value> = rows.iter().map(|r| r[2].clone()).collect();
    assert_eq!(numbers, vec![Value::Integer(1), Value::Integer(8)]);
    assert_eq!(rowids(&gentries), vec![1, 2]);
}

#[test]
fn variable_scope_entries_resolve_owners_by_index_name_or_next_free() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let attrs = reg.table("x_attrs").unwrap();
    let vars = reg.table("x_vars").unwrap();
    let ventries = reg.table("x_ventries").unwrap();

    vars.update(&var_insert("temp", Value::Null)).unwrap();
    vars.update(&var_insert("pressure", Value::Null)).unwrap();
    attrs
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("UNITS".into()),
            Value::Text("variable".into()),
        ])
        .unwrap();

    // Next free slot: no entries yet, so the first variable gets it.
    ventries
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("UNITS".into()),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("K".into()),
        ])
        .unwrap();
    // By variable name.
    ventries
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("UNITS".into()),
            Value::Text("pressure".into()),
            Value::Null,
            Value::Null,
            Value::Text("hPa".into()),
        ])
        .unwrap();

    let rows = scan(&ventries);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][2], Value::Text("temp".into()));
    assert_eq!(rows[0][5], Value::Text("K".into()));
    assert_eq!(rows[1][2], Value::Text("pressure".into()));
    assert_eq!(rows[1][5], Value::Text("hPa".into()));

    // Both variables now hold entries; the next-free resolution errors out.
    let err = ventries
        .update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("UNITS".into()),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text("nope".into()),
        ])
        .unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));
}

#[test]
fn read_only_connections_reject_every_mutation_distinctly() {
    let engine: Rc<MemoryEngine> = Rc::new(MemoryEngine::new());
    {
        let mut reg = standard_registry(engine.clone());
        reg.create_table(MODULE_FILE, "w", &["probe", "c"]).unwrap();
        reg.disconnect_all().unwrap();
    }

    let mut reg = standard_registry(engine);
    reg.create_table(MODULE_FILE, "r", &["probe", "r"]).unwrap();
    let vars = reg.table("r_vars").unwrap();
    let err = vars.update(&var_insert("nope", Value::Null)).unwrap_err();
    assert!(matches!(err, Error::ReadOnly { mode: 's', .. }));

    let recs = reg.table("r_recs").unwrap();
    let err = recs.update(&[Value::Integer(1)]).unwrap_err();
    assert!(matches!(err, Error::ReadOnly { .. }));

    let gentries = reg.table("r_gentries").unwrap();
    let err = gentries.update(&[Value::Integer(1)]).unwrap_err();
    assert!(matches!(err, Error::ReadOnly { .. }));
}

#[test]
fn renaming_a_variable_renames_its_record_column() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let vars = reg.table("x_vars").unwrap();
    let recs = reg.table("x_recs").unwrap();
    vars.update(&var_insert("old", Value::Null)).unwrap();
    assert_eq!(recs.schema().unwrap().columns[1].name, "old");

    let mut rename = vec![Value::NoChange; 13];
    rename[0] = Value::Integer(1);
    rename[1] = Value::Integer(1);
    rename[3] = Value::Text("new".into());
    vars.update(&rename).unwrap();
    assert_eq!(recs.schema().unwrap().columns[1].name, "new");

    // Shape columns stay frozen.
    let mut reshape = vec![Value::NoChange; 13];
    reshape[0] = Value::Integer(1);
    reshape[1] = Value::Integer(1);
    reshape[6] = Value::Integer(2);
    assert!(vars.update(&reshape).is_err());
}

#[test]
fn borrowed_tables_can_be_created_directly_from_a_handle() {
    let mut reg = registry();
    reg.create_table(MODULE_FILE, "x", &["probe", "c"]).unwrap();
    let file = reg.table("x").unwrap();
    let mut cursor = file.open().unwrap();
    cursor.filter(0, &[]).unwrap();
    let handle = match cursor.column(0, false).unwrap() {
        Value::Integer(h) => h,
        other => panic!("expected handle, got {other:?}"),
    };
    drop(cursor);

    let handle = handle.to_string();
    reg.create_table(MODULE_VARS, "aux_vars", &[handle.as_str(), "t"])
        .unwrap();
    let aux = reg.table("aux_vars").unwrap();
    aux.update(&var_insert("borrowed", Value::Null)).unwrap();

    // Disconnecting the borrower leaves the shared handle open.
    reg.drop_table("aux_vars").unwrap();
    let vars = reg.table("x_vars").unwrap();
    assert_eq!(scan(&vars).len(), 1);
}

#[test]
fn delete_after_open_mode_leaves_no_table_behind() {
    let engine: Rc<MemoryEngine> = Rc::new(MemoryEngine::new());
    {
        let mut reg = standard_registry(engine.clone());
        reg.create_table(MODULE_FILE, "w", &["probe", "c"]).unwrap();
        reg.disconnect_all().unwrap();
    }
    let mut reg = standard_registry(engine);
    reg.create_table(MODULE_FILE, "gone", &["probe", "d"]).unwrap();
    assert!(reg.table_names().is_empty());
    // The container was deleted; reopening fails.
    assert!(reg.create_table(MODULE_FILE, "again", &["probe", "r"]).is_err());
}
