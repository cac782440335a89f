use crate::util::{collect_rows, open_registry, BASE};
use arraytab_core::types::Value;
use arraytab_tables::Table;

/// Writes one global attribute entry through the entry adapter, creating the
/// attribute through the attribute catalog first when it does not exist yet.
pub(crate) fn cmd_set_attr(
    path: &str,
    name: &str,
    value: &str,
    entry: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let mut registry = open_registry(path, "w")?;

    let attrs = registry.table(&format!("{BASE}_attrs"))?;
    let (_, attr_rows) = collect_rows(&attrs, None)?;
    let exists = attr_rows
        .iter()
        .any(|row| row[1] == Value::Text(name.to_string()));
    if !exists {
        attrs.update(&[
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Text(name.to_string()),
            Value::Integer(0),
        ])?;
    }

    let gentries = registry.table(&format!("{BASE}_gentries"))?;
    let rowid = gentries.update(&[
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Text(name.to_string()),
        entry.map_or(Value::Null, Value::Integer),
        Value::Null,
        Value::Null,
        Value::Text(value.to_string()),
    ])?;

    registry.disconnect_all()?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "attribute": name, "rowid": rowid })
        );
    } else {
        println!("set {name} = {value:?}");
    }
    Ok(())
}
