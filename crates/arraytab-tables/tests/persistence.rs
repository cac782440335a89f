//! The same adapters over the file engine: mutations made through the
//! tables survive a disconnect/reconnect cycle on disk.

use arraytab_core::types::Value;
use arraytab_engine::FileEngine;
use arraytab_tables::{standard_registry, Table, MODULE_FILE};
use std::rc::Rc;

#[test]
fn adapter_mutations_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("probe.atab");
    let path = path.to_str().unwrap();

    {
        let mut reg = standard_registry(Rc::new(FileEngine::new()));
        reg.create_table(MODULE_FILE, "x", &[path, "c"]).unwrap();

        let vars = reg.table("x_vars").unwrap();
        let mut insert = vec![Value::Null; 13];
        insert[3] = Value::Text("temp".into());
        insert[4] = Value::Text("real8".into());
        insert[12] = Value::Real(-1.0);
        vars.update(&insert).unwrap();

        let recs = reg.table("x_recs").unwrap();
        recs.update(&[
            Value::Null,
            Value::Null,
            Value::Integer(1),
            Value::Real(21.5),
        ])
        .unwrap();

        let attrs = reg.table("x_attrs").unwrap();
        attrs
            .update(&[
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Text("Title".into()),
                Value::Integer(0),
            ])
            .unwrap();
        let gentries = reg.table("x_gentries").unwrap();
        gentries
            .update(&[
                Value::Null,
                Value::Null,
                Value::Integer(1),
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Text("Mission X".into()),
            ])
            .unwrap();

        // Owner disconnect flushes the container to disk.
        reg.disconnect_all().unwrap();
    }

    let mut reg = standard_registry(Rc::new(FileEngine::new()));
    reg.create_table(MODULE_FILE, "x", &[path, "r"]).unwrap();

    let vars = reg.table("x_vars").unwrap();
    let mut cursor = vars.open().unwrap();
    cursor.filter(0, &[]).unwrap();
    assert!(!cursor.eof().unwrap());
    assert_eq!(cursor.column(1, false).unwrap(), Value::Text("temp".into()));
    assert_eq!(cursor.column(10, false).unwrap(), Value::Real(-1.0));
    drop(cursor);

    let recs = reg.table("x_recs").unwrap();
    let mut cursor = recs.open().unwrap();
    cursor.filter(0, &[]).unwrap();
    assert_eq!(cursor.column(0, false).unwrap(), Value::Integer(1));
    assert_eq!(cursor.column(1, false).unwrap(), Value::Real(21.5));
    drop(cursor);

    let gentries = reg.table("x_gentries").unwrap();
    let mut cursor = gentries.open().unwrap();
    cursor.filter(0, &[]).unwrap();
    assert_eq!(
        cursor.column(1, false).unwrap(),
        Value::Text("Title".into())
    );
    assert_eq!(
        cursor.column(5, false).unwrap(),
        Value::Text("Mission X".into())
    );
    drop(cursor);

    reg.disconnect_all().unwrap();
}
