//! The record adapter: one row per record number, one typed column per
//! variable. The column map is synthesized from the catalog and rebuilt
//! whenever the catalog signals a structural change through the shared
//! schema epoch.

use crate::codec;
use crate::file::resolve_sub_handle;
use crate::registry::{Module, Registry};
use crate::vtab::{
    guard_writable, ColumnDecl, Constraint, Cursor, ScanPlan, Table, TableSchema,
};
use arraytab_core::error::{EngineOp, Error, ValidationError};
use arraytab_core::types::{AccessMode, ElemType, RelType, Value};
use arraytab_engine::{ContainerEngine, ContainerId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub(crate) struct RecsModule;

impl Module for RecsModule {
    fn connect(
        &self,
        registry: &mut Registry,
        _table_name: &str,
        args: &[&str],
    ) -> Result<Option<Rc<dyn Table>>, Error> {
        let engine = registry.engine();
        let (id, mode) = resolve_sub_handle(engine.as_ref(), args)?;
        let epoch = registry.schema_epoch(id);
        let columns = build_columns(engine.as_ref(), id)?;
        Ok(Some(Rc::new(RecsTable {
            engine,
            id,
            mode,
            epoch: Rc::clone(&epoch),
            seen: Cell::new(epoch.get()),
            columns: RefCell::new(columns),
        })))
    }
}

/// Everything needed to read and write one variable's column.
#[derive(Debug, Clone)]
struct RecColumn {
    name: String,
    rel: RelType,
    elem_type: ElemType,
    elem_count: i64,
    scalar: bool,
    /// Payload bytes per record: element width times the dimension span, or
    /// times the element count for scalar character variables.
    nbytes: usize,
    /// Total element span of the dimensions (1 for scalars).
    span: i64,
}

fn build_columns(engine: &dyn ContainerEngine, id: ContainerId) -> Result<Vec<RecColumn>, Error> {
    let count = engine.variable_count(id).op("counting variables")?;
    let mut columns = Vec::with_capacity(count as usize);
    for var in 0..count {
        let name = engine.variable_name(id, var).op("reading variable name")?;
        let elem_type = engine.variable_type(id, var).op("reading variable type")?;
        let elem_count = engine
            .variable_element_count(id, var)
            .op("reading element count")?;
        let dims = engine
            .variable_dim_sizes(id, var)
            .op("reading dimensions")?;
        let width = elem_type.byte_width();
        let column = if dims.is_empty() {
            RecColumn {
                name,
                rel: elem_type.rel_type(),
                elem_type,
                elem_count,
                scalar: true,
                nbytes: width * elem_count.max(1) as usize,
                span: 1,
            }
        } else {
            let span: i64 = dims.iter().product();
            RecColumn {
                name,
                rel: RelType::Blob,
                elem_type,
                elem_count,
                scalar: false,
                nbytes: width * span.max(0) as usize,
                span,
            }
        };
        columns.push(column);
    }
    Ok(columns)
}

pub(crate) struct RecsTable {
    engine: Rc<dyn ContainerEngine>,
    id: ContainerId,
    mode: AccessMode,
    epoch: Rc<Cell<u64>>,
    seen: Cell<u64>,
    columns: RefCell<Vec<RecColumn>>,
}

impl RecsTable {
    /// Rebuilds the column map when the catalog has changed shape since the
    /// last look.
    fn refresh(&self) -> Result<(), Error> {
        let current = self.epoch.get();
        if self.seen.get() != current {
            *self.columns.borrow_mut() = build_columns(self.engine.as_ref(), self.id)?;
            self.seen.set(current);
        }
        Ok(())
    }

    fn write_row(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        self.refresh()?;
        let columns = self.columns.borrow();
        let nvars = self
            .engine
            .variable_count(self.id)
            .op("counting variables")?;
        if args.len() as i64 - 2 != nvars + 1 {
            return Err(ValidationError::ColumnCountMismatch {
                got: args.len() - 2,
                expected: nvars as usize + 1,
            }
            .into());
        }

        let inserting = args[0].is_null();
        let rec = if inserting {
            match &args[2] {
                // Explicit record numbers use the displayed 1-based domain;
                // without one the row lands past the current maximum.
                Value::Null => {
                    self.engine
                        .max_written_across(self.id)
                        .op("finding the last record")?
                        + 1
                }
                v => {
                    v.as_i64()
                        .ok_or(ValidationError::WrongValueType("integer"))?
                        - 1
                }
            }
        } else {
            args[0]
                .as_i64()
                .ok_or(ValidationError::WrongValueType("integer"))?
                - 1
        };

        for (k, column) in columns.iter().enumerate() {
            let value = &args[3 + k];
            if value.is_no_change() {
                continue;
            }
            if value.is_null() {
                // Nulls leave the cell unspecified; arrays written by a
                // fresh insert get zero-filled instead.
                if column.scalar || !inserting {
                    continue;
                }
                self.engine
                    .write_record(self.id, k as i64, rec, &vec![0u8; column.nbytes])
                    .op("writing record data")?;
                continue;
            }
            if column.scalar {
                let bytes =
                    codec::encode_scalar_record(column.elem_type, column.elem_count, value)?;
                self.engine
                    .write_record(self.id, k as i64, rec, &bytes)
                    .op("writing record data")?;
            } else {
                let blob = value
                    .as_blob()
                    .ok_or(ValidationError::WrongValueType("blob"))?;
                if blob.len() != column.nbytes {
                    return Err(ValidationError::BlobSizeMismatch {
                        got: blob.len(),
                        width: column.elem_type.byte_width(),
                        count: column.span,
                    }
                    .into());
                }
                self.engine
                    .write_record(self.id, k as i64, rec, blob)
                    .op("writing record data")?;
            }
        }

        Ok(if inserting { Some(rec + 1) } else { None })
    }
}

impl Table for RecsTable {
    fn schema(&self) -> Result<TableSchema, Error> {
        self.refresh()?;
        let mut columns = vec![ColumnDecl::new(
            "record",
            Some(RelType::Integer),
            " PRIMARY KEY NOT NULL",
        )];
        for col in self.columns.borrow().iter() {
            columns.push(ColumnDecl::new(col.name.clone(), Some(col.rel), ""));
        }
        Ok(TableSchema {
            columns,
            table_constraint: None,
        })
    }

    fn best_index(&self, constraints: &[Constraint]) -> Result<ScanPlan, Error> {
        let max = self
            .engine
            .max_written_across(self.id)
            .op("finding the last record")?;
        Ok(ScanPlan::full_scan((max + 1) as f64, constraints.len()))
    }

    fn open(&self) -> Result<Box<dyn Cursor + '_>, Error> {
        self.refresh()?;
        Ok(Box::new(RecsCursor {
            table: self,
            row: 1,
        }))
    }

    fn update(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        guard_writable(self.mode, "modifying records")?;
        if args.len() == 1 {
            let rec = args[0]
                .as_i64()
                .ok_or(ValidationError::WrongValueType("integer"))?
                - 1;
            let nvars = self
                .engine
                .variable_count(self.id)
                .op("counting variables")?;
            for var in 0..nvars {
                self.engine
                    .delete_records(self.id, var, rec, rec)
                    .op("deleting record data")?;
            }
            return Ok(None);
        }
        self.write_row(args)
    }

    fn disconnect(&self) -> Result<(), Error> {
        if self.mode.is_borrowed() {
            return Ok(());
        }
        self.engine.close(self.id).op("closing container")
    }
}

struct RecsCursor<'a> {
    table: &'a RecsTable,
    row: i64,
}

impl Cursor for RecsCursor<'_> {
    fn filter(&mut self, _index_id: i32, _args: &[Value]) -> Result<(), Error> {
        self.row = 1;
        Ok(())
    }

    fn next(&mut self) -> Result<(), Error> {
        self.row += 1;
        Ok(())
    }

    fn eof(&self) -> Result<bool, Error> {
        let max = self
            .table
            .engine
            .max_written_across(self.table.id)
            .op("finding the last record")?;
        Ok(self.row > max + 1)
    }

    fn column(&mut self, col: usize, unchanged_ok: bool) -> Result<Value, Error> {
        if unchanged_ok {
            return Ok(Value::NoChange);
        }
        if col == 0 {
            return Ok(Value::Integer(self.row));
        }
        let columns = self.table.columns.borrow();
        let column = columns
            .get(col - 1)
            .ok_or(ValidationError::BadColumn(col))?;
        let bytes = self
            .table
            .engine
            .read_record(self.table.id, col as i64 - 1, self.row - 1)
            .op("reading record data")?;
        Ok(codec::decode_record_cell(column.rel, column.elem_type, bytes))
    }

    fn rowid(&self) -> Result<i64, Error> {
        Ok(self.row)
    }
}
