use crate::util::{collect_rows, open_registry, print_rows, BASE};

pub(crate) fn cmd_records(path: &str, limit: Option<u64>, json: bool) -> anyhow::Result<()> {
    let mut registry = open_registry(path, "r")?;
    let table = registry.table(&format!("{BASE}_recs"))?;
    let (headers, rows) = collect_rows(&table, limit)?;
    print_rows(&headers, &rows, json)?;
    registry.disconnect_all()?;
    Ok(())
}
