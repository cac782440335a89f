use crate::cli::{Cli, Command};

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.cmd {
        Command::Create { path } => crate::commands::create::cmd_create(&path, cli.json),
        Command::Inspect { path } => crate::commands::inspect::cmd_inspect(&path, cli.json),
        Command::Vars { path } => crate::commands::vars::cmd_vars(&path, cli.json),
        Command::Records { path, limit } => {
            crate::commands::records::cmd_records(&path, limit, cli.json)
        }
        Command::Attrs { path } => crate::commands::attrs::cmd_attrs(&path, cli.json),
        Command::Entries { path, scope } => {
            crate::commands::entries::cmd_entries(&path, scope, cli.json)
        }
        Command::SetAttr {
            path,
            name,
            value,
            entry,
        } => crate::commands::set_attr::cmd_set_attr(&path, &name, &value, entry, cli.json),
    }
}
