//! The table/cursor protocol the relational front-end drives.

use arraytab_core::error::Error;
use arraytab_core::types::{AccessMode, RelType, Value};

/// One column of a synthesized schema.
#[derive(Debug, Clone)]
pub struct ColumnDecl {
    pub name: String,
    /// Storage class, or None for columns declared without affinity.
    pub rel_type: Option<RelType>,
    /// Raw declaration tail, e.g. `" PRIMARY KEY NOT NULL"` or `" DEFAULT 45"`.
    pub extra: &'static str,
}

impl ColumnDecl {
    pub fn new(name: impl Into<String>, rel_type: Option<RelType>, extra: &'static str) -> Self {
        Self {
            name: name.into(),
            rel_type,
            extra,
        }
    }
}

/// Ordered schema descriptor, rendered to a declaration on demand. Keeping
/// the descriptor separate from its rendering keeps the adapters testable
/// without any SQL layer.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub columns: Vec<ColumnDecl>,
    /// Optional trailing table constraint, e.g. a composite primary key.
    pub table_constraint: Option<String>,
}

impl TableSchema {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Renders a schema descriptor as a `CREATE TABLE` declaration.
pub fn render_declaration(decl_name: &str, schema: &TableSchema) -> String {
    let mut out = format!("CREATE TABLE {decl_name} (\n");
    for (k, col) in schema.columns.iter().enumerate() {
        out.push_str("    \"");
        out.push_str(&col.name);
        out.push('"');
        if let Some(rel) = col.rel_type {
            out.push(' ');
            out.push_str(rel.keyword());
        }
        out.push_str(col.extra);
        if k + 1 < schema.columns.len() || schema.table_constraint.is_some() {
            out.push(',');
        }
        out.push('\n');
    }
    if let Some(constraint) = &schema.table_constraint {
        out.push_str("    ");
        out.push_str(constraint);
        out.push('\n');
    }
    out.push_str(");");
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
}

/// A constraint the front-end offers during planning.
#[derive(Debug, Clone, Copy)]
pub struct Constraint {
    pub column: usize,
    pub op: ConstraintOp,
    pub usable: bool,
}

/// How the chosen plan consumes one offered constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintUsage {
    /// Position (0-based) of the constraint's value in the filter args.
    pub argv_index: Option<usize>,
    /// When set, the front-end skips re-checking the constraint itself.
    pub omit: bool,
}

/// The plan a table reports back from [`Table::best_index`].
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub index_id: i32,
    pub estimated_cost: f64,
    pub estimated_rows: Option<i64>,
    pub unique_scan: bool,
    pub usage: Vec<ConstraintUsage>,
}

impl ScanPlan {
    pub fn full_scan(cost: f64, constraints: usize) -> Self {
        Self {
            index_id: 0,
            estimated_cost: cost,
            estimated_rows: None,
            unique_scan: false,
            usage: vec![ConstraintUsage::default(); constraints],
        }
    }
}

/// One relational table bound to a container handle.
///
/// Mutations arrive in the front-end's argument convention: `args[0]` is the
/// old rowid (Null on insert), `args[1]` the replacement rowid, and
/// `args[2..]` the column values, with [`Value::NoChange`] marking columns a
/// partial UPDATE leaves alone. A single-argument call deletes the row named
/// by `args[0]`.
pub trait Table {
    /// The declared schema; regenerated when the underlying container's
    /// variable set has changed.
    fn schema(&self) -> Result<TableSchema, Error>;

    fn best_index(&self, constraints: &[Constraint]) -> Result<ScanPlan, Error>;

    fn open(&self) -> Result<Box<dyn Cursor + '_>, Error>;

    /// Applies one mutation; returns the new rowid for inserts when known.
    fn update(&self, args: &[Value]) -> Result<Option<i64>, Error>;

    /// Detaches from the container, closing the handle unless it is
    /// borrowed.
    fn disconnect(&self) -> Result<(), Error>;
}

/// A cursor over one table. `filter` resets to the first matching row;
/// `next` advances; positions past the last row report `eof`.
pub trait Cursor {
    fn filter(&mut self, index_id: i32, args: &[Value]) -> Result<(), Error>;
    fn next(&mut self) -> Result<(), Error>;
    fn eof(&self) -> Result<bool, Error>;
    /// Reads one column. When `unchanged_ok` is set the front-end does not
    /// need the value (partial update) and the cursor may short-circuit with
    /// [`Value::NoChange`].
    fn column(&mut self, col: usize, unchanged_ok: bool) -> Result<Value, Error>;
    fn rowid(&self) -> Result<i64, Error>;
}

/// Every mutation entry point checks the adapter's mode before anything
/// else, so "not permitted" is distinguishable from "bad argument".
pub(crate) fn guard_writable(mode: AccessMode, op: &'static str) -> Result<(), Error> {
    if mode.is_writable() {
        Ok(())
    } else {
        Err(Error::ReadOnly {
            op,
            mode: mode.as_char(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_render_with_affinity_and_constraints() {
        let schema = TableSchema {
            columns: vec![
                ColumnDecl::new("Attrid", Some(RelType::Integer), " NOT NULL"),
                ColumnDecl::new("Name", Some(RelType::Text), " NOT NULL"),
                ColumnDecl::new("Value", None, ""),
            ],
            table_constraint: Some("PRIMARY KEY(Attrid,Name)".to_string()),
        };
        let ddl = render_declaration("t_ignored", &schema);
        assert!(ddl.starts_with("CREATE TABLE t_ignored ("));
        assert!(ddl.contains("\"Attrid\" INTEGER NOT NULL,"));
        assert!(ddl.contains("\"Value\","));
        assert!(ddl.contains("PRIMARY KEY(Attrid,Name)"));
        assert!(ddl.ends_with(");"));
    }

    #[test]
    fn writable_guard_names_the_mode() {
        guard_writable(AccessMode::ReadWrite, "op").unwrap();
        let err = guard_writable(AccessMode::BorrowedReadOnly, "op").unwrap_err();
        assert!(matches!(err, Error::ReadOnly { mode: 's', .. }));
    }
}
