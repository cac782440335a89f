//! The variable catalog adapter: one row per variable, with equality lookup
//! by name as a unique-scan fast path and create/rename/resize/delete
//! mutations.

use crate::codec;
use crate::file::resolve_sub_handle;
use crate::registry::{Module, Registry};
use crate::vtab::{
    guard_writable, ColumnDecl, Constraint, ConstraintOp, ConstraintUsage, Cursor, ScanPlan,
    Table, TableSchema,
};
use arraytab_core::error::{CorruptionError, EngineOp, Error, ValidationError};
use arraytab_core::types::{AccessMode, ElemType, RelType, Value, Variance};
use arraytab_engine::{ContainerEngine, ContainerId, VariableSpec};
use std::cell::Cell;
use std::rc::Rc;

const INDEX_NAME_EQ: i32 = 1;

pub(crate) struct VarsModule;

impl Module for VarsModule {
    fn connect(
        &self,
        registry: &mut Registry,
        _table_name: &str,
        args: &[&str],
    ) -> Result<Option<Rc<dyn Table>>, Error> {
        let engine = registry.engine();
        let (id, mode) = resolve_sub_handle(engine.as_ref(), args)?;
        let epoch = registry.schema_epoch(id);
        Ok(Some(Rc::new(VarsTable {
            engine,
            id,
            mode,
            epoch,
        })))
    }
}

pub(crate) struct VarsTable {
    engine: Rc<dyn ContainerEngine>,
    id: ContainerId,
    mode: AccessMode,
    epoch: Rc<Cell<u64>>,
}

impl VarsTable {
    fn bump_epoch(&self) {
        self.epoch.set(self.epoch.get() + 1);
    }

    fn insert(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        let name = args[3]
            .as_text()
            .ok_or(ValidationError::WrongValueType("text"))?
            .to_string();
        let elem_type = parse_elem_type(&args[4])?;

        let elem_count = if elem_type.is_character() {
            match &args[5] {
                Value::Null => 64,
                v => {
                    let n = v
                        .as_i64()
                        .ok_or(ValidationError::WrongValueType("integer"))?;
                    if n < 1 {
                        return Err(ValidationError::BadElementCount(n).into());
                    }
                    n
                }
            }
        } else {
            1
        };

        let dim_count = match &args[6] {
            Value::Null => 0,
            v => v
                .as_i64()
                .ok_or(ValidationError::WrongValueType("integer"))?,
        };
        if dim_count < 0 {
            return Err(ValidationError::BadDimCount(dim_count).into());
        }

        let dim_sizes = match dim_count {
            0 => Vec::new(),
            1 => {
                let size = args[7]
                    .as_i64()
                    .ok_or(ValidationError::WrongValueType("integer"))?;
                if size < 1 {
                    return Err(ValidationError::BadDimSize(size).into());
                }
                vec![size]
            }
            n => {
                let list = args[7]
                    .as_text()
                    .ok_or(ValidationError::WrongValueType("comma-joined text"))?;
                let sizes = parse_joined(list, n)?;
                if let Some(&bad) = sizes.iter().find(|&&s| s < 1) {
                    return Err(ValidationError::BadDimSize(bad).into());
                }
                sizes
            }
        };

        let rec_variance = match &args[8] {
            Value::Null => Variance::Vary,
            v => Variance::from_code(
                v.as_i64()
                    .ok_or(ValidationError::WrongValueType("integer"))?,
            )?,
        };

        let dim_variances = match dim_count {
            0 => Vec::new(),
            1 => match &args[9] {
                Value::Null => vec![Variance::Vary],
                v => vec![Variance::from_code(
                    v.as_i64()
                        .ok_or(ValidationError::WrongValueType("integer"))?,
                )?],
            },
            n => match &args[9] {
                Value::Null => vec![Variance::Vary; n as usize],
                Value::Text(list) => parse_joined(list, n)?
                    .into_iter()
                    .map(Variance::from_code)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => return Err(ValidationError::WrongValueType("comma-joined text").into()),
            },
        };

        if !args[10].is_null() {
            return Err(ValidationError::ReadOnlyColumn("maxwritten").into());
        }

        let expected = self
            .engine
            .variable_count(self.id)
            .op("counting variables")?;
        let spec = VariableSpec {
            name: name.clone(),
            elem_type,
            elem_count,
            dim_sizes,
            rec_variance,
            dim_variances,
        };
        let index = self
            .engine
            .create_variable(self.id, &spec)
            .op("creating variable")?;
        if index != expected {
            return Err(CorruptionError::VariableIndexSkew {
                name,
                got: index,
                expected,
            }
            .into());
        }

        if let Some(count) = opt_i64(&args[11])? {
            self.engine
                .allocate_records(self.id, index, count)
                .op("allocating records")?;
        }
        if !args[12].is_null() && !args[12].is_no_change() {
            let pad = codec::encode_pad(elem_type, &args[12])?;
            self.engine
                .set_variable_pad(self.id, index, pad)
                .op("setting pad value")?;
        }

        self.bump_epoch();
        Ok(Some(index + 1))
    }

    fn apply_update(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        let var = args[0]
            .as_i64()
            .ok_or(ValidationError::WrongValueType("integer"))?
            - 1;
        // Only the name, the allocation, and the pad value are mutable;
        // everything between dataspec and maxwritten is the variable's shape.
        if args[4..=10].iter().any(|v| !v.is_no_change()) {
            return Err(ValidationError::ImmutableVariableShape.into());
        }

        if !args[3].is_no_change() {
            let name = args[3]
                .as_text()
                .ok_or(ValidationError::WrongValueType("text"))?;
            self.engine
                .rename_variable(self.id, var, name)
                .op("renaming variable")?;
            self.bump_epoch();
        }
        if !args[11].is_no_change() {
            if let Some(count) = opt_i64(&args[11])? {
                self.engine
                    .allocate_records(self.id, var, count)
                    .op("allocating records")?;
            }
        }
        if !args[12].is_no_change() && !args[12].is_null() {
            let elem_type = self
                .engine
                .variable_type(self.id, var)
                .op("reading variable type")?;
            let pad = codec::encode_pad(elem_type, &args[12])?;
            self.engine
                .set_variable_pad(self.id, var, pad)
                .op("setting pad value")?;
        }
        Ok(None)
    }
}

impl Table for VarsTable {
    fn schema(&self) -> Result<TableSchema, Error> {
        Ok(TableSchema {
            columns: vec![
                ColumnDecl::new("id", Some(RelType::Integer), " PRIMARY KEY"),
                ColumnDecl::new("name", Some(RelType::Text), ""),
                ColumnDecl::new("dataspec", None, " DEFAULT 45"),
                ColumnDecl::new("numelem", Some(RelType::Integer), " DEFAULT 1"),
                ColumnDecl::new("numdims", Some(RelType::Integer), " DEFAULT 0"),
                ColumnDecl::new("dimsizes", Some(RelType::Blob), " DEFAULT NULL"),
                ColumnDecl::new("recvariance", Some(RelType::Integer), " DEFAULT -1"),
                ColumnDecl::new("dimvariances", Some(RelType::Blob), " DEFAULT NULL"),
                ColumnDecl::new("maxwritten", Some(RelType::Integer), " DEFAULT 0"),
                ColumnDecl::new("maxalloc", Some(RelType::Integer), " DEFAULT 0"),
                ColumnDecl::new("padvalue", None, ""),
            ],
            table_constraint: None,
        })
    }

    fn best_index(&self, constraints: &[Constraint]) -> Result<ScanPlan, Error> {
        let count = self
            .engine
            .variable_count(self.id)
            .op("counting variables")?;
        let mut plan = ScanPlan::full_scan(count as f64, constraints.len());
        for (k, c) in constraints.iter().enumerate() {
            if c.usable && c.column == 1 && c.op == ConstraintOp::Eq {
                plan.index_id = INDEX_NAME_EQ;
                plan.estimated_cost = 2.0;
                plan.estimated_rows = Some(1);
                plan.unique_scan = true;
                plan.usage[k] = ConstraintUsage {
                    argv_index: Some(0),
                    omit: true,
                };
            }
        }
        Ok(plan)
    }

    fn open(&self) -> Result<Box<dyn Cursor + '_>, Error> {
        Ok(Box::new(VarsCursor {
            table: self,
            row: 1,
            last: 0,
        }))
    }

    fn update(&self, args: &[Value]) -> Result<Option<i64>, Error> {
        guard_writable(self.mode, "modifying the variable catalog")?;
        match args.len() {
            1 => {
                let var = args[0]
                    .as_i64()
                    .ok_or(ValidationError::WrongValueType("integer"))?
                    - 1;
                self.engine
                    .delete_variable(self.id, var)
                    .op("deleting variable")?;
                self.bump_epoch();
                Ok(None)
            }
            13 => {
                if args[0].is_null() {
                    self.insert(args)
                } else {
                    self.apply_update(args)
                }
            }
            other => Err(ValidationError::ColumnCountMismatch {
                got: other,
                expected: 13,
            }
            .into()),
        }
    }

    fn disconnect(&self) -> Result<(), Error> {
        if self.mode.is_borrowed() {
            return Ok(());
        }
        self.engine.close(self.id).op("closing container")
    }
}

struct VarsCursor<'a> {
    table: &'a VarsTable,
    row: i64,
    last: i64,
}

impl Cursor for VarsCursor<'_> {
    fn filter(&mut self, index_id: i32, args: &[Value]) -> Result<(), Error> {
        let engine = self.table.engine.as_ref();
        self.last = engine
            .variable_count(self.table.id)
            .op("counting variables")?;
        self.row = 1;
        if index_id == INDEX_NAME_EQ {
            if let Some(name) = args.first().and_then(Value::as_text) {
                match engine
                    .variable_index_by_name(self.table.id, name)
                    .op("resolving variable name")?
                {
                    Some(index) => {
                        self.row = index + 1;
                        self.last = self.row;
                    }
                    None => self.last = 0,
                }
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<(), Error> {
        self.row += 1;
        Ok(())
    }

    fn eof(&self) -> Result<bool, Error> {
        Ok(self.row > self.last)
    }

    fn column(&mut self, col: usize, unchanged_ok: bool) -> Result<Value, Error> {
        if unchanged_ok {
            return Ok(Value::NoChange);
        }
        let engine = self.table.engine.as_ref();
        let id = self.table.id;
        let var = self.row - 1;
        let value = match col {
            0 => Value::Integer(self.row),
            1 => Value::Text(engine.variable_name(id, var).op("reading variable name")?),
            2 => Value::Integer(
                engine
                    .variable_type(id, var)
                    .op("reading variable type")?
                    .id(),
            ),
            3 => Value::Integer(
                engine
                    .variable_element_count(id, var)
                    .op("reading element count")?,
            ),
            4 => Value::Integer(
                engine
                    .variable_dim_sizes(id, var)
                    .op("reading dimensions")?
                    .len() as i64,
            ),
            5 => {
                let sizes = engine
                    .variable_dim_sizes(id, var)
                    .op("reading dimensions")?;
                joined_or_scalar(&sizes)
            }
            6 => Value::Integer(
                engine
                    .variable_rec_variance(id, var)
                    .op("reading record variance")?
                    .code(),
            ),
            7 => {
                let codes: Vec<i64> = engine
                    .variable_dim_variances(id, var)
                    .op("reading dimension variances")?
                    .iter()
                    .map(|v| v.code())
                    .collect();
                joined_or_scalar(&codes)
            }
            8 => Value::Integer(
                engine
                    .variable_max_written(id, var)
                    .op("reading max written record")?,
            ),
            9 => Value::Integer(
                engine
                    .variable_max_allocated(id, var)
                    .op("reading max allocated record")?,
            ),
            10 => match engine.variable_pad(id, var).op("reading pad value")? {
                Some(pad) => codec::pad_value(&pad),
                None => Value::Null,
            },
            other => return Err(ValidationError::BadColumn(other).into()),
        };
        Ok(value)
    }

    fn rowid(&self) -> Result<i64, Error> {
        Ok(self.row)
    }
}

fn parse_elem_type(v: &Value) -> Result<ElemType, Error> {
    match v {
        Value::Null => Ok(ElemType::Double),
        Value::Integer(_) | Value::Real(_) => {
            let id = v.as_i64().unwrap_or_default();
            ElemType::from_id(id).ok_or_else(|| ValidationError::BadTypeId(id).into())
        }
        Value::Text(name) => ElemType::from_mnemonic(name)
            .ok_or_else(|| ValidationError::BadTypeName(name.clone()).into()),
        Value::Blob(_) | Value::NoChange => Err(ValidationError::BadTypeSpec.into()),
    }
}

/// Parses a comma-joined integer list; the count must match the declared
/// dimension count exactly.
fn parse_joined(list: &str, expected: i64) -> Result<Vec<i64>, Error> {
    let parts: Vec<&str> = list.split(',').map(str::trim).collect();
    if parts.len() as i64 != expected {
        return Err(ValidationError::BadDimList {
            list: list.to_string(),
            expected,
        }
        .into());
    }
    parts
        .iter()
        .map(|p| {
            p.parse::<i64>().map_err(|_| {
                ValidationError::BadDimList {
                    list: list.to_string(),
                    expected,
                }
                .into()
            })
        })
        .collect()
}

/// Dimension lists display as NULL when empty, a plain integer for one
/// dimension, and comma-joined text above that.
fn joined_or_scalar(values: &[i64]) -> Value {
    match values {
        [] => Value::Null,
        [one] => Value::Integer(*one),
        many => Value::Text(
            many.iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}

fn opt_i64(v: &Value) -> Result<Option<i64>, Error> {
    match v {
        Value::Null | Value::NoChange => Ok(None),
        other => other
            .as_i64()
            .map(Some)
            .ok_or_else(|| ValidationError::WrongValueType("integer").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_lists_must_match_the_dimension_count() {
        assert_eq!(parse_joined("3, 4,5", 3).unwrap(), vec![3, 4, 5]);
        assert!(parse_joined("3,4", 3).is_err());
        assert!(parse_joined("3,x,5", 3).is_err());
    }

    #[test]
    fn dimension_lists_display_by_arity() {
        assert_eq!(joined_or_scalar(&[]), Value::Null);
        assert_eq!(joined_or_scalar(&[7]), Value::Integer(7));
        assert_eq!(joined_or_scalar(&[2, 3]), Value::Text("2,3".into()));
    }

    #[test]
    fn elem_type_spec_accepts_id_name_or_default() {
        assert_eq!(parse_elem_type(&Value::Null).unwrap(), ElemType::Double);
        assert_eq!(
            parse_elem_type(&Value::Integer(22)).unwrap(),
            ElemType::Real8
        );
        assert_eq!(
            parse_elem_type(&Value::Text("epoch16".into())).unwrap(),
            ElemType::Epoch16
        );
        assert!(parse_elem_type(&Value::Integer(3)).is_err());
        assert!(parse_elem_type(&Value::Text("nope".into())).is_err());
        assert!(parse_elem_type(&Value::Blob(vec![1])).is_err());
    }
}
