//! A purely in-memory engine. Containers survive close/reopen for the
//! lifetime of the engine, which is what the adapter tests need.

use crate::container::Container;
use crate::{status, ContainerEngine, ContainerId, EngineResult, VariableSpec};
use arraytab_core::types::{ElemType, Scope, TypedValue, Variance};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryEngine {
    inner: RefCell<Inner>,
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    open: HashMap<u64, Container>,
    shelved: HashMap<String, Container>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(
        &self,
        id: ContainerId,
        f: impl FnOnce(&Container) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let inner = self.inner.borrow();
        let c = inner.open.get(&id.0).ok_or_else(|| status::bad_handle(id.0))?;
        f(c)
    }

    fn with_mut<T>(
        &self,
        id: ContainerId,
        f: impl FnOnce(&mut Container) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut inner = self.inner.borrow_mut();
        let c = inner
            .open
            .get_mut(&id.0)
            .ok_or_else(|| status::bad_handle(id.0))?;
        f(c)
    }
}

impl ContainerEngine for MemoryEngine {
    fn create(&self, path: &str) -> EngineResult<ContainerId> {
        let mut inner = self.inner.borrow_mut();
        if inner.shelved.contains_key(path) || inner.open.values().any(|c| c.name == path) {
            return Err(status::container_exists(path));
        }
        inner.next_handle += 1;
        let handle = inner.next_handle;
        inner.open.insert(handle, Container::new(path));
        Ok(ContainerId(handle))
    }

    fn open(&self, path: &str) -> EngineResult<ContainerId> {
        let mut inner = self.inner.borrow_mut();
        let container = inner
            .shelved
            .remove(path)
            .ok_or_else(|| status::no_such_container(path))?;
        inner.next_handle += 1;
        let handle = inner.next_handle;
        inner.open.insert(handle, container);
        Ok(ContainerId(handle))
    }

    fn close(&self, id: ContainerId) -> EngineResult<()> {
        let mut inner = self.inner.borrow_mut();
        let container = inner
            .open
            .remove(&id.0)
            .ok_or_else(|| status::bad_handle(id.0))?;
        let name = container.name.clone();
        inner.shelved.insert(name, container);
        Ok(())
    }

    fn delete(&self, id: ContainerId) -> EngineResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner
            .open
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| status::bad_handle(id.0))
    }

    fn container_name(&self, id: ContainerId) -> EngineResult<String> {
        self.with(id, |c| Ok(c.name.clone()))
    }

    fn variable_count(&self, id: ContainerId) -> EngineResult<i64> {
        self.with(id, |c| Ok(c.variable_count()))
    }

    fn variable_name(&self, id: ContainerId, var: i64) -> EngineResult<String> {
        self.with(id, |c| c.variable_name(var))
    }

    fn variable_type(&self, id: ContainerId, var: i64) -> EngineResult<ElemType> {
        self.with(id, |c| c.variable_type(var))
    }

    fn variable_element_count(&self, id: ContainerId, var: i64) -> EngineResult<i64> {
        self.with(id, |c| c.variable_element_count(var))
    }

    fn variable_dim_sizes(&self, id: ContainerId, var: i64) -> EngineResult<Vec<i64>> {
        self.with(id, |c| c.variable_dim_sizes(var))
    }

    fn variable_rec_variance(&self, id: ContainerId, var: i64) -> EngineResult<Variance> {
        self.with(id, |c| c.variable_rec_variance(var))
    }

    fn variable_dim_variances(&self, id: ContainerId, var: i64) -> EngineResult<Vec<Variance>> {
        self.with(id, |c| c.variable_dim_variances(var))
    }

    fn variable_max_written(&self, id: ContainerId, var: i64) -> EngineResult<i64> {
        self.with(id, |c| c.variable_max_written(var))
    }

    fn variable_max_allocated(&self, id: ContainerId, var: i64) -> EngineResult<i64> {
        self.with(id, |c| c.variable_max_allocated(var))
    }

    fn max_written_across(&self, id: ContainerId) -> EngineResult<i64> {
        self.with(id, |c| Ok(c.max_written_across()))
    }

    fn variable_pad(&self, id: ContainerId, var: i64) -> EngineResult<Option<TypedValue>> {
        self.with(id, |c| c.variable_pad(var))
    }

    fn set_variable_pad(&self, id: ContainerId, var: i64, pad: TypedValue) -> EngineResult<()> {
        self.with_mut(id, |c| c.set_variable_pad(var, pad))
    }

    fn create_variable(&self, id: ContainerId, spec: &VariableSpec) -> EngineResult<i64> {
        self.with_mut(id, |c| c.create_variable(spec))
    }

    fn delete_variable(&self, id: ContainerId, var: i64) -> EngineResult<()> {
        self.with_mut(id, |c| c.delete_variable(var))
    }

    fn rename_variable(&self, id: ContainerId, var: i64, name: &str) -> EngineResult<()> {
        self.with_mut(id, |c| c.rename_variable(var, name))
    }

    fn allocate_records(&self, id: ContainerId, var: i64, count: i64) -> EngineResult<()> {
        self.with_mut(id, |c| c.allocate_records(var, count))
    }

    fn variable_index_by_name(&self, id: ContainerId, name: &str) -> EngineResult<Option<i64>> {
        self.with(id, |c| Ok(c.variable_index_by_name(name)))
    }

    fn read_record(&self, id: ContainerId, var: i64, rec: i64) -> EngineResult<Vec<u8>> {
        self.with(id, |c| c.read_record(var, rec))
    }

    fn write_record(&self, id: ContainerId, var: i64, rec: i64, bytes: &[u8]) -> EngineResult<()> {
        self.with_mut(id, |c| c.write_record(var, rec, bytes))
    }

    fn delete_records(
        &self,
        id: ContainerId,
        var: i64,
        first: i64,
        last: i64,
    ) -> EngineResult<()> {
        self.with_mut(id, |c| c.delete_records(var, first, last))
    }

    fn attribute_count(&self, id: ContainerId) -> EngineResult<i64> {
        self.with(id, |c| Ok(c.attribute_count()))
    }

    fn attribute_name(&self, id: ContainerId, attr: i64) -> EngineResult<String> {
        self.with(id, |c| c.attribute_name(attr))
    }

    fn attribute_scope(&self, id: ContainerId, attr: i64) -> EngineResult<Scope> {
        self.with(id, |c| c.attribute_scope(attr))
    }

    fn attribute_index_by_name(&self, id: ContainerId, name: &str) -> EngineResult<Option<i64>> {
        self.with(id, |c| Ok(c.attribute_index_by_name(name)))
    }

    fn create_attribute(&self, id: ContainerId, name: &str, scope: Scope) -> EngineResult<i64> {
        self.with_mut(id, |c| c.create_attribute(name, scope))
    }

    fn delete_attribute(&self, id: ContainerId, attr: i64) -> EngineResult<()> {
        self.with_mut(id, |c| c.delete_attribute(attr))
    }

    fn entry_count(&self, id: ContainerId, scope: Scope, attr: i64) -> EngineResult<i64> {
        self.with(id, |c| c.entry_count(scope, attr))
    }

    fn max_entry(&self, id: ContainerId, scope: Scope, attr: i64) -> EngineResult<i64> {
        self.with(id, |c| c.max_entry(scope, attr))
    }

    fn entry_element_count(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<i64> {
        self.with(id, |c| c.entry_element_count(scope, attr, entry))
    }

    fn entry_value(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<TypedValue> {
        self.with(id, |c| c.entry_value(scope, attr, entry))
    }

    fn put_entry(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
        value: &TypedValue,
    ) -> EngineResult<()> {
        self.with_mut(id, |c| c.put_entry(scope, attr, entry, value))
    }

    fn delete_entry(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<()> {
        self.with_mut(id, |c| c.delete_entry(scope, attr, entry))
    }
}
