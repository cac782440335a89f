//! The container handle adapter: opens or creates the container, exposes it
//! as a one-row table, and cascades creation of the five dependent tables
//! bound to the same handle.

use crate::registry::{
    dequote, parse_mode_char, Module, Registry, MODULE_ATTRS, MODULE_GENTRIES, MODULE_RECS,
    MODULE_VARS, MODULE_VENTRIES,
};
use crate::vtab::{ColumnDecl, Constraint, Cursor, ScanPlan, Table, TableSchema};
use arraytab_core::error::{EngineOp, Error, ValidationError};
use arraytab_core::types::{AccessMode, RelType, Value};
use arraytab_engine::{ContainerEngine, ContainerId};
use std::rc::Rc;

/// Resolves the (handle, mode) pair every dependent adapter starts from:
/// modes r/w open the named container and own the handle, the borrowed
/// modes s/t adopt an already-open handle passed as its numeric value.
pub(crate) fn resolve_sub_handle(
    engine: &dyn ContainerEngine,
    args: &[&str],
) -> Result<(ContainerId, AccessMode), Error> {
    let path_arg = args.first().ok_or(ValidationError::MissingPath)?;
    let mode = match args.get(1) {
        Some(arg) => {
            let c = parse_mode_char(arg)?;
            match AccessMode::from_char(c) {
                Some(m @ (AccessMode::ReadOnly
                | AccessMode::ReadWrite
                | AccessMode::BorrowedReadOnly
                | AccessMode::BorrowedReadWrite)) => m,
                _ => return Err(ValidationError::BadMode(c).into()),
            }
        }
        None => AccessMode::ReadOnly,
    };
    let arg = dequote(path_arg);
    let id = if mode.is_borrowed() {
        let handle: u64 = arg
            .trim()
            .parse()
            .map_err(|_| ValidationError::MissingPath)?;
        ContainerId(handle)
    } else {
        engine.open(&arg).op("opening container")?
    };
    Ok((id, mode))
}

pub(crate) struct FileModule;

impl Module for FileModule {
    fn connect(
        &self,
        registry: &mut Registry,
        table_name: &str,
        args: &[&str],
    ) -> Result<Option<Rc<dyn Table>>, Error> {
        let engine = registry.engine();
        let path_arg = args.first().ok_or(ValidationError::MissingPath)?;
        let mode = match args.get(1) {
            Some(arg) => {
                let c = parse_mode_char(arg)?;
                match AccessMode::from_char(c) {
                    Some(m @ (AccessMode::Create
                    | AccessMode::DeleteOnOpen
                    | AccessMode::ReadOnly
                    | AccessMode::ReadWrite)) => m,
                    _ => return Err(ValidationError::BadMode(c).into()),
                }
            }
            None => AccessMode::ReadOnly,
        };

        let path = dequote(path_arg);
        let id = if mode == AccessMode::Create {
            engine.create(&path).op("creating container")?
        } else {
            engine.open(&path).op("opening container")?
        };

        if mode == AccessMode::DeleteOnOpen {
            engine.delete(id).op("deleting container")?;
            return Ok(None);
        }

        let table = Rc::new(FileTable {
            engine: Rc::clone(&engine),
            id,
            mode,
        });

        // One logical "open" becomes six cooperating tables: the dependent
        // five adopt the handle in a borrowed sub-mode and never close it.
        let handle = id.0.to_string();
        let sub_mode = mode.sub_mode().as_char().to_string();
        let sub_args = [handle.as_str(), sub_mode.as_str()];
        for (module, suffix) in [
            (MODULE_VARS, "_vars"),
            (MODULE_RECS, "_recs"),
            (MODULE_ATTRS, "_attrs"),
            (MODULE_GENTRIES, "_gentries"),
            (MODULE_VENTRIES, "_ventries"),
        ] {
            registry.create_table(module, &format!("{table_name}{suffix}"), &sub_args)?;
        }

        Ok(Some(table))
    }
}

/// One row: the numeric handle and the container's name.
pub(crate) struct FileTable {
    engine: Rc<dyn ContainerEngine>,
    id: ContainerId,
    mode: AccessMode,
}

impl Table for FileTable {
    fn schema(&self) -> Result<TableSchema, Error> {
        Ok(TableSchema {
            columns: vec![
                ColumnDecl::new("handle", Some(RelType::Integer), " PRIMARY KEY"),
                ColumnDecl::new("name", Some(RelType::Text), " NOT NULL"),
            ],
            table_constraint: None,
        })
    }

    fn best_index(&self, constraints: &[Constraint]) -> Result<ScanPlan, Error> {
        Ok(ScanPlan::full_scan(1.0, constraints.len()))
    }

    fn open(&self) -> Result<Box<dyn Cursor + '_>, Error> {
        Ok(Box::new(FileCursor {
            table: self,
            row: 1,
        }))
    }

    fn update(&self, _args: &[Value]) -> Result<Option<i64>, Error> {
        Err(ValidationError::NotModifiable.into())
    }

    fn disconnect(&self) -> Result<(), Error> {
        if self.mode.is_borrowed() {
            return Ok(());
        }
        self.engine.close(self.id).op("closing container")
    }
}

struct FileCursor<'a> {
    table: &'a FileTable,
    row: i64,
}

impl Cursor for FileCursor<'_> {
    fn filter(&mut self, _index_id: i32, _args: &[Value]) -> Result<(), Error> {
        self.row = 1;
        Ok(())
    }

    fn next(&mut self) -> Result<(), Error> {
        self.row += 1;
        Ok(())
    }

    fn eof(&self) -> Result<bool, Error> {
        Ok(self.row > 1)
    }

    fn column(&mut self, col: usize, _unchanged_ok: bool) -> Result<Value, Error> {
        match col {
            0 => Ok(Value::Integer(self.table.id.0 as i64)),
            1 => {
                let name = self
                    .table
                    .engine
                    .container_name(self.table.id)
                    .op("reading container name")?;
                Ok(Value::Text(name))
            }
            _ => Err(ValidationError::BadColumn(col).into()),
        }
    }

    fn rowid(&self) -> Result<i64, Error> {
        Ok(self.row)
    }
}
