use anyhow::Context;
use arraytab_core::types::Value;
use arraytab_engine::FileEngine;
use arraytab_tables::{standard_registry, Registry, Table, MODULE_FILE};
use std::rc::Rc;

/// The base table name every command uses; sub-tables hang off it as
/// `c_vars`, `c_recs`, and so on.
pub(crate) const BASE: &str = "c";

pub(crate) fn open_registry(path: &str, mode: &str) -> anyhow::Result<Registry> {
    let mut registry = standard_registry(Rc::new(FileEngine::new()));
    registry
        .create_table(MODULE_FILE, BASE, &[path, mode])
        .with_context(|| format!("open container {path}"))?;
    Ok(registry)
}

/// Scans a whole table: header names plus every row.
pub(crate) fn collect_rows(
    table: &Rc<dyn Table>,
    limit: Option<u64>,
) -> anyhow::Result<(Vec<String>, Vec<Vec<Value>>)> {
    let schema = table.schema()?;
    let headers: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
    let mut cursor = table.open()?;
    cursor.filter(0, &[])?;
    let mut rows = Vec::new();
    while !cursor.eof()? {
        if limit.is_some_and(|n| rows.len() as u64 >= n) {
            break;
        }
        let mut row = Vec::with_capacity(headers.len());
        for col in 0..headers.len() {
            row.push(cursor.column(col, false)?);
        }
        rows.push(row);
        cursor.next()?;
    }
    Ok((headers, rows))
}

pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null | Value::NoChange => serde_json::Value::Null,
        Value::Integer(v) => serde_json::json!(v),
        Value::Real(v) => serde_json::json!(v),
        Value::Text(s) => serde_json::json!(s),
        Value::Blob(b) => serde_json::json!(format!("0x{}", hex(b))),
    }
}

pub(crate) fn value_display(value: &Value) -> String {
    match value {
        Value::Null | Value::NoChange => "NULL".to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("0x{}", hex(b)),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn print_rows(headers: &[String], rows: &[Vec<Value>], json: bool) -> anyhow::Result<()> {
    if json {
        let out: Vec<serde_json::Map<String, serde_json::Value>> = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .zip(row)
                    .map(|(h, v)| (h.clone(), value_to_json(v)))
                    .collect()
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    println!("{}", headers.join("\t"));
    for row in rows {
        let cells: Vec<String> = row.iter().map(value_display).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
