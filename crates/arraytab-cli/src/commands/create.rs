use crate::util::open_registry;

pub(crate) fn cmd_create(path: &str, json: bool) -> anyhow::Result<()> {
    let mut registry = open_registry(path, "c")?;
    registry.disconnect_all()?;
    if json {
        println!("{}", serde_json::json!({ "created": path }));
    } else {
        println!("created {path}");
    }
    Ok(())
}
