use crate::util::{collect_rows, open_registry, print_rows, BASE};

pub(crate) fn cmd_vars(path: &str, json: bool) -> anyhow::Result<()> {
    let mut registry = open_registry(path, "r")?;
    let table = registry.table(&format!("{BASE}_vars"))?;
    let (headers, rows) = collect_rows(&table, None)?;
    print_rows(&headers, &rows, json)?;
    registry.disconnect_all()?;
    Ok(())
}
