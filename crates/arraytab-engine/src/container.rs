//! In-memory state of one open container and the operation logic shared by
//! both shipped engines.

use crate::status;
use crate::{EngineResult, VariableSpec};
use arraytab_core::types::{ElemType, Scope, TypedValue, Variance};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub(crate) struct Variable {
    pub(crate) name: String,
    pub(crate) elem_type: ElemType,
    pub(crate) elem_count: i64,
    pub(crate) dim_sizes: Vec<i64>,
    pub(crate) rec_variance: Variance,
    pub(crate) dim_variances: Vec<Variance>,
    /// Sparse record storage keyed by 0-based record number.
    pub(crate) records: BTreeMap<i64, Vec<u8>>,
    pub(crate) max_allocated: i64,
    pub(crate) pad: Option<TypedValue>,
}

impl Variable {
    /// Bytes held by one record: element width times the dimension span, or
    /// times the element count for scalar variables (where the count only
    /// exceeds 1 for character types).
    pub(crate) fn record_bytes(&self) -> usize {
        let width = self.elem_type.byte_width();
        if self.dim_sizes.is_empty() {
            width * self.elem_count.max(1) as usize
        } else {
            let span: i64 = self.dim_sizes.iter().product();
            width * span.max(0) as usize
        }
    }

    fn max_written(&self) -> i64 {
        self.records.keys().next_back().copied().unwrap_or(-1)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    pub(crate) name: String,
    pub(crate) scope: Scope,
    /// Sparse entries keyed by 0-based entry index. For variable scope the
    /// key is the owning variable's index.
    pub(crate) entries: BTreeMap<i64, TypedValue>,
}

#[derive(Debug, Clone)]
pub(crate) struct Container {
    pub(crate) name: String,
    pub(crate) variables: Vec<Variable>,
    pub(crate) attributes: Vec<Attribute>,
}

impl Container {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            attributes: Vec::new(),
        }
    }

    fn variable(&self, var: i64) -> EngineResult<&Variable> {
        usize::try_from(var)
            .ok()
            .and_then(|k| self.variables.get(k))
            .ok_or_else(|| status::no_such_variable(var))
    }

    fn variable_mut(&mut self, var: i64) -> EngineResult<&mut Variable> {
        usize::try_from(var)
            .ok()
            .and_then(|k| self.variables.get_mut(k))
            .ok_or_else(|| status::no_such_variable(var))
    }

    fn attribute(&self, attr: i64) -> EngineResult<&Attribute> {
        usize::try_from(attr)
            .ok()
            .and_then(|k| self.attributes.get(k))
            .ok_or_else(|| status::no_such_attribute(attr))
    }

    fn scoped_attribute(&self, scope: Scope, attr: i64) -> EngineResult<&Attribute> {
        let a = self.attribute(attr)?;
        if a.scope != scope {
            return Err(status::scope_mismatch(attr));
        }
        Ok(a)
    }

    fn scoped_attribute_mut(&mut self, scope: Scope, attr: i64) -> EngineResult<&mut Attribute> {
        let idx = usize::try_from(attr).map_err(|_| status::no_such_attribute(attr))?;
        let a = self
            .attributes
            .get_mut(idx)
            .ok_or_else(|| status::no_such_attribute(attr))?;
        if a.scope != scope {
            return Err(status::scope_mismatch(attr));
        }
        Ok(a)
    }

    pub(crate) fn variable_count(&self) -> i64 {
        self.variables.len() as i64
    }

    pub(crate) fn variable_name(&self, var: i64) -> EngineResult<String> {
        Ok(self.variable(var)?.name.clone())
    }

    pub(crate) fn variable_type(&self, var: i64) -> EngineResult<ElemType> {
        Ok(self.variable(var)?.elem_type)
    }

    pub(crate) fn variable_element_count(&self, var: i64) -> EngineResult<i64> {
        Ok(self.variable(var)?.elem_count)
    }

    pub(crate) fn variable_dim_sizes(&self, var: i64) -> EngineResult<Vec<i64>> {
        Ok(self.variable(var)?.dim_sizes.clone())
    }

    pub(crate) fn variable_rec_variance(&self, var: i64) -> EngineResult<Variance> {
        Ok(self.variable(var)?.rec_variance)
    }

    pub(crate) fn variable_dim_variances(&self, var: i64) -> EngineResult<Vec<Variance>> {
        Ok(self.variable(var)?.dim_variances.clone())
    }

    pub(crate) fn variable_max_written(&self, var: i64) -> EngineResult<i64> {
        Ok(self.variable(var)?.max_written())
    }

    pub(crate) fn variable_max_allocated(&self, var: i64) -> EngineResult<i64> {
        Ok(self.variable(var)?.max_allocated)
    }

    pub(crate) fn max_written_across(&self) -> i64 {
        self.variables
            .iter()
            .map(Variable::max_written)
            .max()
            .unwrap_or(-1)
    }

    pub(crate) fn variable_pad(&self, var: i64) -> EngineResult<Option<TypedValue>> {
        Ok(self.variable(var)?.pad.clone())
    }

    pub(crate) fn set_variable_pad(&mut self, var: i64, pad: TypedValue) -> EngineResult<()> {
        let v = self.variable_mut(var)?;
        if pad.elem_type() != v.elem_type {
            return Err(status::bad_argument(format!(
                "pad value type {:?} does not match variable type {:?}",
                pad.elem_type(),
                v.elem_type
            )));
        }
        v.pad = Some(pad);
        Ok(())
    }

    pub(crate) fn create_variable(&mut self, spec: &VariableSpec) -> EngineResult<i64> {
        if self.variables.iter().any(|v| v.name == spec.name) {
            return Err(status::duplicate_variable(&spec.name));
        }
        if spec.elem_count < 1 {
            return Err(status::bad_argument(format!(
                "invalid element count {}",
                spec.elem_count
            )));
        }
        if spec.dim_sizes.iter().any(|&s| s < 1) {
            return Err(status::bad_argument("dimension sizes must be positive"));
        }
        if spec.dim_variances.len() != spec.dim_sizes.len() {
            return Err(status::bad_argument(format!(
                "{} dimension variances supplied for {} dimensions",
                spec.dim_variances.len(),
                spec.dim_sizes.len()
            )));
        }
        self.variables.push(Variable {
            name: spec.name.clone(),
            elem_type: spec.elem_type,
            elem_count: spec.elem_count,
            dim_sizes: spec.dim_sizes.clone(),
            rec_variance: spec.rec_variance,
            dim_variances: spec.dim_variances.clone(),
            records: BTreeMap::new(),
            max_allocated: 0,
            pad: None,
        });
        Ok(self.variables.len() as i64 - 1)
    }

    pub(crate) fn delete_variable(&mut self, var: i64) -> EngineResult<()> {
        self.variable(var)?;
        self.variables.remove(var as usize);
        // Variable-scope entries are keyed by variable index; drop the dead
        // one and renumber the rest to follow their owners.
        for attr in &mut self.attributes {
            if attr.scope != Scope::Variable {
                continue;
            }
            attr.entries.remove(&var);
            let shifted: BTreeMap<i64, TypedValue> = attr
                .entries
                .iter()
                .map(|(&k, v)| (if k > var { k - 1 } else { k }, v.clone()))
                .collect();
            attr.entries = shifted;
        }
        Ok(())
    }

    pub(crate) fn rename_variable(&mut self, var: i64, name: &str) -> EngineResult<()> {
        if self
            .variables
            .iter()
            .enumerate()
            .any(|(k, v)| k as i64 != var && v.name == name)
        {
            return Err(status::duplicate_variable(name));
        }
        self.variable_mut(var)?.name = name.to_string();
        Ok(())
    }

    pub(crate) fn allocate_records(&mut self, var: i64, count: i64) -> EngineResult<()> {
        if count < 0 {
            return Err(status::bad_argument(format!(
                "invalid allocation count {count}"
            )));
        }
        self.variable_mut(var)?.max_allocated = count;
        Ok(())
    }

    pub(crate) fn variable_index_by_name(&self, name: &str) -> Option<i64> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(|k| k as i64)
    }

    pub(crate) fn read_record(&self, var: i64, rec: i64) -> EngineResult<Vec<u8>> {
        if rec < 0 {
            return Err(status::bad_record_number(rec));
        }
        let v = self.variable(var)?;
        if let Some(bytes) = v.records.get(&rec) {
            return Ok(bytes.clone());
        }
        // Virtual record: pad-filled, zeroes when no pad is set.
        let size = v.record_bytes();
        match &v.pad {
            Some(pad) => {
                let unit = pad.bytes();
                let mut out = Vec::with_capacity(size);
                while out.len() < size {
                    let take = unit.len().min(size - out.len());
                    out.extend_from_slice(&unit[..take]);
                }
                Ok(out)
            }
            None => Ok(vec![0; size]),
        }
    }

    pub(crate) fn write_record(&mut self, var: i64, rec: i64, bytes: &[u8]) -> EngineResult<()> {
        if rec < 0 {
            return Err(status::bad_record_number(rec));
        }
        let v = self.variable_mut(var)?;
        let expected = v.record_bytes();
        if bytes.len() != expected {
            return Err(status::bad_record_size(bytes.len(), expected));
        }
        v.records.insert(rec, bytes.to_vec());
        Ok(())
    }

    pub(crate) fn delete_records(&mut self, var: i64, first: i64, last: i64) -> EngineResult<()> {
        if first < 0 || last < first {
            return Err(status::bad_record_number(first.min(last)));
        }
        let v = self.variable_mut(var)?;
        let span = last - first + 1;
        let moved: Vec<(i64, Vec<u8>)> = v
            .records
            .split_off(&first)
            .into_iter()
            .filter(|(k, _)| *k > last)
            .map(|(k, bytes)| (k - span, bytes))
            .collect();
        v.records.extend(moved);
        Ok(())
    }

    pub(crate) fn attribute_count(&self) -> i64 {
        self.attributes.len() as i64
    }

    pub(crate) fn attribute_name(&self, attr: i64) -> EngineResult<String> {
        Ok(self.attribute(attr)?.name.clone())
    }

    pub(crate) fn attribute_scope(&self, attr: i64) -> EngineResult<Scope> {
        Ok(self.attribute(attr)?.scope)
    }

    pub(crate) fn attribute_index_by_name(&self, name: &str) -> Option<i64> {
        self.attributes
            .iter()
            .position(|a| a.name == name)
            .map(|k| k as i64)
    }

    pub(crate) fn create_attribute(&mut self, name: &str, scope: Scope) -> EngineResult<i64> {
        if self.attributes.iter().any(|a| a.name == name) {
            return Err(status::duplicate_attribute(name));
        }
        self.attributes.push(Attribute {
            name: name.to_string(),
            scope,
            entries: BTreeMap::new(),
        });
        Ok(self.attributes.len() as i64 - 1)
    }

    pub(crate) fn delete_attribute(&mut self, attr: i64) -> EngineResult<()> {
        self.attribute(attr)?;
        self.attributes.remove(attr as usize);
        Ok(())
    }

    pub(crate) fn entry_count(&self, scope: Scope, attr: i64) -> EngineResult<i64> {
        Ok(self.scoped_attribute(scope, attr)?.entries.len() as i64)
    }

    pub(crate) fn max_entry(&self, scope: Scope, attr: i64) -> EngineResult<i64> {
        Ok(self
            .scoped_attribute(scope, attr)?
            .entries
            .keys()
            .next_back()
            .copied()
            .unwrap_or(-1))
    }

    pub(crate) fn entry_element_count(
        &self,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<i64> {
        Ok(self
            .scoped_attribute(scope, attr)?
            .entries
            .get(&entry)
            .map_or(0, TypedValue::count))
    }

    pub(crate) fn entry_value(
        &self,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<TypedValue> {
        self.scoped_attribute(scope, attr)?
            .entries
            .get(&entry)
            .cloned()
            .ok_or_else(|| status::no_such_entry(attr, entry))
    }

    pub(crate) fn put_entry(
        &mut self,
        scope: Scope,
        attr: i64,
        entry: i64,
        value: &TypedValue,
    ) -> EngineResult<()> {
        if entry < 0 {
            return Err(status::bad_argument(format!("invalid entry index {entry}")));
        }
        if scope == Scope::Variable && entry >= self.variable_count() {
            return Err(status::no_such_variable(entry));
        }
        let a = self.scoped_attribute_mut(scope, attr)?;
        a.entries.insert(entry, value.clone());
        Ok(())
    }

    pub(crate) fn delete_entry(&mut self, scope: Scope, attr: i64, entry: i64) -> EngineResult<()> {
        let a = self.scoped_attribute_mut(scope, attr)?;
        a.entries
            .remove(&entry)
            .map(|_| ())
            .ok_or_else(|| status::no_such_entry(attr, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_spec(name: &str, t: ElemType) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            elem_type: t,
            elem_count: 1,
            dim_sizes: Vec::new(),
            rec_variance: Variance::Vary,
            dim_variances: Vec::new(),
        }
    }

    #[test]
    fn variables_number_sequentially_and_renumber_on_delete() {
        let mut c = Container::new("t");
        assert_eq!(c.create_variable(&scalar_spec("a", ElemType::Int4)).unwrap(), 0);
        assert_eq!(c.create_variable(&scalar_spec("b", ElemType::Int4)).unwrap(), 1);
        assert_eq!(c.create_variable(&scalar_spec("c", ElemType::Int4)).unwrap(), 2);
        c.delete_variable(1).unwrap();
        assert_eq!(c.variable_count(), 2);
        assert_eq!(c.variable_name(1).unwrap(), "c");
        assert_eq!(c.variable_index_by_name("c"), Some(1));
        assert_eq!(c.variable_index_by_name("b"), None);
    }

    #[test]
    fn deleting_a_variable_renumbers_its_entries() {
        let mut c = Container::new("t");
        c.create_variable(&scalar_spec("a", ElemType::Int4)).unwrap();
        c.create_variable(&scalar_spec("b", ElemType::Int4)).unwrap();
        c.create_variable(&scalar_spec("c", ElemType::Int4)).unwrap();
        let attr = c.create_attribute("units", Scope::Variable).unwrap();
        for var in 0..3 {
            let tv = TypedValue::new(ElemType::Int1, 1, vec![var as u8]).unwrap();
            c.put_entry(Scope::Variable, attr, var, &tv).unwrap();
        }
        c.delete_variable(1).unwrap();
        assert_eq!(c.entry_count(Scope::Variable, attr).unwrap(), 2);
        assert_eq!(c.entry_value(Scope::Variable, attr, 0).unwrap().bytes(), [0]);
        // The entry that belonged to "c" followed it down to index 1.
        assert_eq!(c.entry_value(Scope::Variable, attr, 1).unwrap().bytes(), [2]);
    }

    #[test]
    fn unwritten_records_read_as_pad_or_zero() {
        let mut c = Container::new("t");
        c.create_variable(&scalar_spec("a", ElemType::Int4)).unwrap();
        assert_eq!(c.read_record(0, 5).unwrap(), vec![0; 4]);
        let pad = TypedValue::new(ElemType::Int4, 1, 7i32.to_le_bytes().to_vec()).unwrap();
        c.set_variable_pad(0, pad).unwrap();
        assert_eq!(c.read_record(0, 5).unwrap(), 7i32.to_le_bytes().to_vec());
        assert_eq!(c.variable_max_written(0).unwrap(), -1);
    }

    #[test]
    fn record_deletion_shifts_later_records_down() {
        let mut c = Container::new("t");
        c.create_variable(&scalar_spec("a", ElemType::Int4)).unwrap();
        for rec in 0..4 {
            c.write_record(0, rec, &(rec as i32).to_le_bytes()).unwrap();
        }
        c.delete_records(0, 1, 1).unwrap();
        assert_eq!(c.variable_max_written(0).unwrap(), 2);
        assert_eq!(c.read_record(0, 1).unwrap(), 2i32.to_le_bytes().to_vec());
        assert_eq!(c.read_record(0, 2).unwrap(), 3i32.to_le_bytes().to_vec());
    }

    #[test]
    fn entry_scope_is_enforced() {
        let mut c = Container::new("t");
        c.create_variable(&scalar_spec("a", ElemType::Int4)).unwrap();
        let g = c.create_attribute("title", Scope::Global).unwrap();
        let tv = TypedValue::new(ElemType::Char, 2, b"hi".to_vec()).unwrap();
        let err = c.put_entry(Scope::Variable, g, 0, &tv).unwrap_err();
        assert_eq!(err.status, status::SCOPE_MISMATCH);
        c.put_entry(Scope::Global, g, 0, &tv).unwrap();
        assert_eq!(c.entry_element_count(Scope::Global, g, 0).unwrap(), 2);
        assert_eq!(c.entry_element_count(Scope::Global, g, 3).unwrap(), 0);
    }

    #[test]
    fn record_size_is_validated() {
        let mut c = Container::new("t");
        let mut spec = scalar_spec("m", ElemType::Real8);
        spec.dim_sizes = vec![2, 3];
        spec.dim_variances = vec![Variance::Vary, Variance::Vary];
        c.create_variable(&spec).unwrap();
        c.write_record(0, 0, &[0; 48]).unwrap();
        let err = c.write_record(0, 1, &[0; 40]).unwrap_err();
        assert_eq!(err.status, status::BAD_RECORD_SIZE);
    }
}
