use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "arraytab",
    version,
    about = "Relational tables over array containers",
    long_about = "Tools for creating and querying array container files through their relational adapters.\n\nNotes:\n  - Every command opens the container through the same table/cursor protocol\n    a relational front-end would use.\n  - Mutating commands reopen the file read-write and flush on exit."
)]
pub(crate) struct Cli {
    /// Emit machine-readable JSON instead of human output.
    #[arg(long)]
    pub(crate) json: bool,

    #[command(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ScopeArg {
    Global,
    Variable,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create an empty container file.
    Create {
        /// Container path to create.
        path: String,
    },
    /// Show the container row and table counts.
    Inspect {
        /// Container path to open read-only.
        path: String,
    },
    /// List the variable catalog.
    Vars {
        /// Container path to open read-only.
        path: String,
    },
    /// Dump record rows, one line per record.
    Records {
        /// Container path to open read-only.
        path: String,
        /// Stop after this many records.
        #[arg(long)]
        limit: Option<u64>,
    },
    /// List the attribute catalog.
    Attrs {
        /// Container path to open read-only.
        path: String,
    },
    /// List attribute entries for one scope.
    Entries {
        /// Container path to open read-only.
        path: String,
        /// Which entry table to scan.
        #[arg(long, value_enum, default_value = "global")]
        scope: ScopeArg,
    },
    /// Write one global attribute entry, creating the attribute if missing.
    SetAttr {
        /// Container path to open read-write.
        path: String,
        /// Attribute name.
        name: String,
        /// Entry value (text).
        value: String,
        /// Explicit 1-based entry number (next free slot if omitted).
        #[arg(long)]
        entry: Option<i64>,
    },
}
