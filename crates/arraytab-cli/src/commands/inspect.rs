use crate::util::{collect_rows, open_registry, value_display, value_to_json, BASE};
use arraytab_tables::Table;

pub(crate) fn cmd_inspect(path: &str, json: bool) -> anyhow::Result<()> {
    let mut registry = open_registry(path, "r")?;

    let file = registry.table(BASE)?;
    let (_, file_rows) = collect_rows(&file, None)?;
    let vars = registry.table(&format!("{BASE}_vars"))?;
    let (_, var_rows) = collect_rows(&vars, None)?;
    let attrs = registry.table(&format!("{BASE}_attrs"))?;
    let (_, attr_rows) = collect_rows(&attrs, None)?;
    let recs = registry.table(&format!("{BASE}_recs"))?;
    let record_columns = recs.schema()?.columns.len();

    if json {
        let row = &file_rows[0];
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "handle": value_to_json(&row[0]),
                "name": value_to_json(&row[1]),
                "variables": var_rows.len(),
                "attributes": attr_rows.len(),
                "record_columns": record_columns,
            }))?
        );
    } else {
        let row = &file_rows[0];
        println!("name:           {}", value_display(&row[1]));
        println!("handle:         {}", value_display(&row[0]));
        println!("variables:      {}", var_rows.len());
        println!("attributes:     {}", attr_rows.len());
        println!("record columns: {record_columns}");
    }

    registry.disconnect_all()?;
    Ok(())
}
