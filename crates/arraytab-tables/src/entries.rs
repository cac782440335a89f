//! The attribute-entry adapters: the two-level sparse (attribute x entry)
//! space flattened to sequential rowids. One implementation serves both
//! scopes; the owner column shows the entry number for global attributes and
//! the owning variable's name for variable-scope ones.

use crate::codec;
use crate::file::resolve_sub_handle;
use crate::registry::{Module, Registry};
use crate::vtab::{
    guard_writable, ColumnDecl, Constraint, Cursor, ScanPlan, Table, TableSchema,
};
use crate::walk::EntryWalk;
use arraytab_core::error::{EngineOp, Error, ValidationError};
use arraytab_core::types::{AccessMode, ElemType, RelType, Scope, TypedValue, Value};
use arraytab_engine::{ContainerEngine, ContainerId};
use std::rc::Rc;

pub(crate) struct EntriesModule {
    scope: Scope,
}

impl EntriesModule {
    pub(crate) fn global() -> Self {
        Self {
            scope: Scope::Global,
        }
    }

    pub(crate) fn variable() -> Self {
        Self {
            scope: Scope::Variable,
        }
    }
}

impl Module for EntriesModule {
    fn connect(
        &self,
        registry: &mut Registry,
        _table_name: &str,
        args: &[&str],
    ) -> Result<Option<Rc<dyn Table>>, Error> {
        let engine = registry.engine();
        let (id, mode) = resolve_sub_handle(engine.as_ref(), args)?;
        Ok(Some(Rc::new(EntriesTable {
            engine,
            id,
            mode,
            scope: self.scope,
        })))
    }
}

pub(crate) struct EntriesTable {
    engine: Rc<dyn ContainerEngine>,
    id: ContainerId,
    mode: AccessMode,
    scope: Scope,
}

impl EntriesTable {
    fn walk(&self) -> EntryWalk<'_> {
        EntryWalk::new(self.engine.as_ref(), self.id, self.scope)
    }

    /// Resolves the target attribute from an explicit index, a name lookup,
    /// or both; when both are given the name must match the attribute at
    /// that index, so a mutation can never silently rename.
    fn resolve_attr(&self, index_arg: &Value, name_arg: &Value) -> Result<i64, Error> {
        let nattrs = self
            .engine
            .attribute_count(self.id)
            .op("counting attributes")?;
        match index_arg.as_i64().filter(|v| *v > 0) {
            Some(index) => {
                if index > nattrs {
                    return Err(ValidationError::AttrOutOfRange {
                        index,
                        count: nattrs,
                    }
                    .into());
                }
                if let Some(given) = name_arg.as_text() {
                    let actual = self
                        .engine
                        .attribute_name(self.id, index - 1)
                        .op("reading attribute name")?;
                    if actual != given {
                        return Err(ValidationError::AttrNameMismatch {
                            index,
                            actual,
                            given: given.to_string(),
                        }
                        .into());
                    }
                }
                Ok(index - 1)
            }
            None => {
                let name = name_arg
                    .as_text()
                    .ok_or(ValidationError::WrongValueType("attribute index or name"))?;
                match self
                    .engine
                    .attribute_index_by_name(self.id, name)
                    .op("resolving attribute name")?
                {
                    Some(attr) => Ok(attr),
                    None => Err(ValidationError::NoSuchAttribute {
                        name: name.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    fn check_scope(&self, attr: i64) -> Result<(), Error> {
        let actual = self
            .engine
            .attribute_scope(self.id, attr)
            .op("reading attribute scope")?;
        if actual != self.scope {
            return Err(ValidationError::ScopeMismatch {
                index: attr + 1,
                actual: actual.label(),
                expected: self.scope.label(),
            }
            .into());
        }
        Ok(())
    }

    /// Resolves the entry slot: an explicit entry number for global scope
    /// (or the next free one past the maximum), and for variable scope an
    /// explicit index, a variable-name lookup, or the next variable lacking
    /// an entry.
    fn resolve_owner(&self, attr: i64, owner_arg: &Value) -> Result<i64, Error> {
        match self.scope {
            Scope::Global => {
                let max = self
                    .engine
                    .max_entry(self.id, self.scope, attr)
                    .op("reading max entry")?;
                match owner_arg.as_i64().filter(|v| *v > 0) {
                    Some(entry) => {
                        if entry > max + 64 {
                            return Err(ValidationError::ImplausibleEntryNumber {
                                entry,
                                max,
                            }
                            .into());
                        }
                        Ok(entry - 1)
                    }
                    None => Ok(max + 1),
                }
            }
            Scope::Variable => {
                let nvars = self
                    .engine
                    .variable_count(self.id)
                    .op("counting variables")?;
                if nvars <= 0 {
                    return Err(ValidationError::NoVariables.into());
                }
                match owner_arg {
                    Value::Integer(_) | Value::Real(_) => {
                        let index = owner_arg.as_i64().unwrap_or_default();
                        if index < 1 || index > nvars {
                            return Err(ValidationError::VarOutOfRange {
                                index,
                                count: nvars,
                            }
                            .into());
                        }
                        Ok(index - 1)
                    }
                    Value::Text(name) => self
                        .engine
                        .variable_index_by_name(self.id, name)
                        .op("resolving variable name")?
                        .ok_or_else(|| {
                            ValidationError::NoSuchVariable {
                                name: name.clone(),
                            }
                            .into()
                        }),
                    Value::Null => {
                        let max = self
                            .engine
                            .max_entry(self.id, self.scope, attr)
                            .op("reading max entry")?;
                        if max < nvars - 1 {
                            Ok(max + 1)
                        } else {
                            Err(ValidationError::NoVariableSlotLeft.into())
                        }
                    }
                    Value::Blob(_) | Value::NoChange => {
                        Err(ValidationError::BadEntryOwner.into())
                    }
                }
            }
        }
    }

    fn upsert(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        let attr = self.resolve_attr(&args[2], &args[3])?;
        self.check_scope(attr)?;
        let entry = self.resolve_owner(attr, &args[4])?;

        let value = &args[7];
        let elem_type = match &args[5] {
            Value::Null => {
                ElemType::infer_from(value).ok_or(ValidationError::NoInferableType)?
            }
            Value::Text(name) => ElemType::from_mnemonic(name)
                .ok_or_else(|| ValidationError::BadTypeName(name.clone()))?,
            Value::Integer(_) | Value::Real(_) => {
                let id = args[5].as_i64().unwrap_or_default();
                ElemType::from_id(id).ok_or(ValidationError::BadTypeId(id))?
            }
            Value::Blob(_) | Value::NoChange => {
                return Err(ValidationError::BadTypeSpec.into())
            }
        };

        let count_arg = args[6].as_i64().unwrap_or(0);
        let nelems = match value {
            Value::Text(s) => {
                let len = s.len();
                if count_arg > 0 && count_arg != len as i64 {
                    return Err(ValidationError::ElementCountStringMismatch {
                        count: count_arg,
                        len,
                    }
                    .into());
                }
                len as i64
            }
            Value::Null | Value::NoChange => {
                return Err(ValidationError::NullEntryValue.into())
            }
            _ => {
                let n = if count_arg <= 0 { 1 } else { count_arg };
                if n > 1024 {
                    return Err(ValidationError::ImplausibleElementCount {
                        count: n,
                        max: 1024,
                    }
                    .into());
                }
                n
            }
        };

        let rel = elem_type.rel_type();
        let payload = if rel == RelType::Text || nelems == 1 {
            codec::encode_scalar_entry(elem_type.value_kind(), nelems, value)?
        } else {
            let blob = value
                .as_blob()
                .ok_or(ValidationError::WrongValueType("blob"))?;
            let expected = elem_type.byte_width() * nelems as usize;
            if blob.len() != expected {
                return Err(ValidationError::BlobSizeMismatch {
                    got: blob.len(),
                    width: elem_type.byte_width(),
                    count: nelems,
                }
                .into());
            }
            TypedValue::new(elem_type, nelems, blob.to_vec())?
        };

        self.engine
            .put_entry(self.id, self.scope, attr, entry, &payload)
            .op("writing attribute entry")?;

        if args[0].is_null() {
            return self.position_of(attr, entry);
        }
        Ok(None)
    }

    /// The flattened rowid of one (attribute, entry) pair, recomputed by
    /// walking from the start.
    fn position_of(&self, attr: i64, entry: i64) -> Result<Option<i64>, Error> {
        let walk = self.walk();
        let mut row = 1;
        let mut pos = walk.first()?;
        while let Some(p) = pos {
            if p == (attr, entry) {
                return Ok(Some(row));
            }
            pos = walk.next_after(p.0, p.1)?;
            row += 1;
        }
        Ok(None)
    }
}

impl Table for EntriesTable {
    fn schema(&self) -> Result<TableSchema, Error> {
        let (owner, owner_rel, key) = match self.scope {
            Scope::Global => ("Entryid", Some(RelType::Integer), "PRIMARY KEY(Attrid,Entryid)"),
            Scope::Variable => ("Var", None, "PRIMARY KEY(Attrid,Var)"),
        };
        Ok(TableSchema {
            columns: vec![
                ColumnDecl::new("Attrid", Some(RelType::Integer), " NOT NULL"),
                ColumnDecl::new("Name", Some(RelType::Text), " NOT NULL"),
                ColumnDecl::new(owner, owner_rel, " NOT NULL"),
                ColumnDecl::new("Dataspec", None, " NOT NULL"),
                ColumnDecl::new("Nelems", Some(RelType::Integer), ""),
                ColumnDecl::new("Value", None, ""),
            ],
            table_constraint: Some(key.to_string()),
        })
    }

    fn best_index(&self, constraints: &[Constraint]) -> Result<ScanPlan, Error> {
        let total = self.walk().total_entries()?;
        Ok(ScanPlan::full_scan(total as f64, constraints.len()))
    }

    fn open(&self) -> Result<Box<dyn Cursor + '_>, Error> {
        Ok(Box::new(EntriesCursor {
            table: self,
            pos: None,
            row: 0,
        }))
    }

    fn update(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        guard_writable(self.mode, "modifying attribute entries")?;
        if args.len() == 1 {
            let rowid = args[0]
                .as_i64()
                .ok_or(ValidationError::WrongValueType("integer"))?;
            let (attr, entry) = self
                .walk()
                .nth(rowid)?
                .ok_or(ValidationError::BadRowid(rowid))?;
            return self
                .engine
                .delete_entry(self.id, self.scope, attr, entry)
                .op("deleting attribute entry")
                .map(|()| None);
        }
        if args.len() != 8 {
            return Err(ValidationError::ColumnCountMismatch {
                got: args.len(),
                expected: 8,
            }
            .into());
        }
        self.upsert(args)
    }

    fn disconnect(&self) -> Result<(), Error> {
        if self.mode.is_borrowed() {
            return Ok(());
        }
        self.engine.close(self.id).op("closing container")
    }
}

struct EntriesCursor<'a> {
    table: &'a EntriesTable,
    pos: Option<(i64, i64)>,
    row: i64,
}

impl Cursor for EntriesCursor<'_> {
    fn filter(&mut self, _index_id: i32, _args: &[Value]) -> Result<(), Error> {
        self.pos = self.table.walk().first()?;
        self.row = 1;
        Ok(())
    }

    fn next(&mut self) -> Result<(), Error> {
        if let Some((attr, entry)) = self.pos {
            self.pos = self.table.walk().next_after(attr, entry)?;
            self.row += 1;
        }
        Ok(())
    }

    fn eof(&self) -> Result<bool, Error> {
        Ok(self.pos.is_none())
    }

    fn column(&mut self, col: usize, unchanged_ok: bool) -> Result<Value, Error> {
        if unchanged_ok {
            return Ok(Value::NoChange);
        }
        let (attr, entry) = self.pos.ok_or(ValidationError::BadRowid(self.row))?;
        let engine = self.table.engine.as_ref();
        let id = self.table.id;
        let scope = self.table.scope;
        let value = match col {
            0 => Value::Integer(attr + 1),
            1 => Value::Text(engine.attribute_name(id, attr).op("reading attribute name")?),
            2 => match scope {
                Scope::Global => Value::Integer(entry + 1),
                Scope::Variable => Value::Text(
                    engine
                        .variable_name(id, entry)
                        .op("resolving entry owner")?,
                ),
            },
            3 => {
                let tv = engine
                    .entry_value(id, scope, attr, entry)
                    .op("reading attribute entry")?;
                Value::Text(tv.elem_type().mnemonic().to_string())
            }
            4 => Value::Integer(
                engine
                    .entry_element_count(id, scope, attr, entry)
                    .op("reading entry element count")?,
            ),
            5 => {
                let nelems = engine
                    .entry_element_count(id, scope, attr, entry)
                    .op("reading entry element count")?;
                if nelems <= 0 {
                    Value::Null
                } else {
                    let tv = engine
                        .entry_value(id, scope, attr, entry)
                        .op("reading attribute entry")?;
                    codec::entry_value(&tv)
                }
            }
            other => return Err(ValidationError::BadColumn(other).into()),
        };
        Ok(value)
    }

    fn rowid(&self) -> Result<i64, Error> {
        Ok(self.row)
    }
}
