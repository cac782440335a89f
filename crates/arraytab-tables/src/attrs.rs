//! The attribute catalog adapter: one row per attribute (index, name,
//! scope). Attributes can be created and deleted here; updating is
//! unsupported, delete then insert.

use crate::file::resolve_sub_handle;
use crate::registry::{Module, Registry};
use crate::vtab::{
    guard_writable, ColumnDecl, Constraint, Cursor, ScanPlan, Table, TableSchema,
};
use arraytab_core::error::{EngineOp, Error, ValidationError};
use arraytab_core::types::{AccessMode, RelType, Scope, Value};
use arraytab_engine::{ContainerEngine, ContainerId};
use std::rc::Rc;

pub(crate) struct AttrsModule;

impl Module for AttrsModule {
    fn connect(
        &self,
        registry: &mut Registry,
        _table_name: &str,
        args: &[&str],
    ) -> Result<Option<Rc<dyn Table>>, Error> {
        let engine = registry.engine();
        let (id, mode) = resolve_sub_handle(engine.as_ref(), args)?;
        Ok(Some(Rc::new(AttrsTable { engine, id, mode })))
    }
}

pub(crate) struct AttrsTable {
    engine: Rc<dyn ContainerEngine>,
    id: ContainerId,
    mode: AccessMode,
}

impl Table for AttrsTable {
    fn schema(&self) -> Result<TableSchema, Error> {
        Ok(TableSchema {
            columns: vec![
                ColumnDecl::new("Id", Some(RelType::Integer), " PRIMARY KEY NOT NULL"),
                ColumnDecl::new("Name", Some(RelType::Text), " NOT NULL"),
                ColumnDecl::new("Scope", Some(RelType::Integer), " NOT NULL"),
            ],
            table_constraint: None,
        })
    }

    fn best_index(&self, constraints: &[Constraint]) -> Result<ScanPlan, Error> {
        let count = self
            .engine
            .attribute_count(self.id)
            .op("counting attributes")?;
        Ok(ScanPlan::full_scan(count as f64, constraints.len()))
    }

    fn open(&self) -> Result<Box<dyn Cursor + '_>, Error> {
        Ok(Box::new(AttrsCursor {
            table: self,
            row: 1,
        }))
    }

    fn update(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        guard_writable(self.mode, "modifying attributes")?;
        if args.len() == 1 {
            let attr = args[0]
                .as_i64()
                .ok_or(ValidationError::WrongValueType("integer"))?
                - 1;
            self.engine
                .delete_attribute(self.id, attr)
                .op("deleting attribute")?;
            return Ok(None);
        }
        if !args[0].is_null() {
            return Err(ValidationError::UpdateUnsupported.into());
        }
        let name = args[3]
            .as_text()
            .ok_or(ValidationError::WrongValueType("text"))?;
        let scope = parse_scope(&args[4])?;
        let index = self
            .engine
            .create_attribute(self.id, name, scope)
            .op("creating attribute")?;
        Ok(Some(index + 1))
    }

    fn disconnect(&self) -> Result<(), Error> {
        if self.mode.is_borrowed() {
            return Ok(());
        }
        self.engine.close(self.id).op("closing container")
    }
}

/// Scope arrives as an integer (0 = global, anything else = variable) or as
/// text starting with `g` or `v`.
fn parse_scope(v: &Value) -> Result<Scope, Error> {
    match v {
        Value::Integer(0) => Ok(Scope::Global),
        Value::Integer(_) => Ok(Scope::Variable),
        Value::Text(s) => match s.chars().next() {
            Some('g') => Ok(Scope::Global),
            Some('v') => Ok(Scope::Variable),
            _ => Err(ValidationError::BadScope(s.clone()).into()),
        },
        other => Err(ValidationError::BadScope(format!("{other:?}")).into()),
    }
}

struct AttrsCursor<'a> {
    table: &'a AttrsTable,
    row: i64,
}

impl Cursor for AttrsCursor<'_> {
    fn filter(&mut self, _index_id: i32, _args: &[Value]) -> Result<(), Error> {
        self.row = 1;
        Ok(())
    }

    fn next(&mut self) -> Result<(), Error> {
        self.row += 1;
        Ok(())
    }

    fn eof(&self) -> Result<bool, Error> {
        let count = self
            .table
            .engine
            .attribute_count(self.table.id)
            .op("counting attributes")?;
        Ok(self.row > count)
    }

    fn column(&mut self, col: usize, unchanged_ok: bool) -> Result<Value, Error> {
        if unchanged_ok {
            return Ok(Value::NoChange);
        }
        let engine = self.table.engine.as_ref();
        let id = self.table.id;
        let attr = self.row - 1;
        match col {
            0 => Ok(Value::Integer(self.row)),
            1 => Ok(Value::Text(
                engine.attribute_name(id, attr).op("reading attribute name")?,
            )),
            2 => Ok(Value::Integer(
                engine
                    .attribute_scope(id, attr)
                    .op("reading attribute scope")?
                    .code(),
            )),
            other => Err(ValidationError::BadColumn(other).into()),
        }
    }

    fn rowid(&self) -> Result<i64, Error> {
        Ok(self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_from_integer_or_text() {
        assert_eq!(parse_scope(&Value::Integer(0)).unwrap(), Scope::Global);
        assert_eq!(parse_scope(&Value::Integer(1)).unwrap(), Scope::Variable);
        assert_eq!(
            parse_scope(&Value::Text("global".into())).unwrap(),
            Scope::Global
        );
        assert_eq!(
            parse_scope(&Value::Text("v".into())).unwrap(),
            Scope::Variable
        );
        assert!(parse_scope(&Value::Text("x".into())).is_err());
        assert!(parse_scope(&Value::Null).is_err());
    }
}
