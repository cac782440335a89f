use crate::cli::ScopeArg;
use crate::util::{collect_rows, open_registry, print_rows, BASE};

pub(crate) fn cmd_entries(path: &str, scope: ScopeArg, json: bool) -> anyhow::Result<()> {
    let mut registry = open_registry(path, "r")?;
    let suffix = match scope {
        ScopeArg::Global => "_gentries",
        ScopeArg::Variable => "_ventries",
    };
    let table = registry.table(&format!("{BASE}{suffix}"))?;
    let (headers, rows) = collect_rows(&table, None)?;
    print_rows(&headers, &rows, json)?;
    registry.disconnect_all()?;
    Ok(())
}
