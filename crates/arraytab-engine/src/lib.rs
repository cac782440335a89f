//! Container engines for arraytab.
//!
//! An engine owns the storage of array containers and hands out opaque
//! numeric handles. Two engines ship here: [`MemoryEngine`] keeps containers
//! in memory (the test substrate), [`FileEngine`] persists each container in
//! a single binary file. The relational adapters only ever see the
//! [`ContainerEngine`] trait.

mod container;
mod files;
mod format;
mod memory;
pub mod status;

pub use files::FileEngine;
pub use memory::MemoryEngine;

use arraytab_core::error::EngineError;
use arraytab_core::types::{ElemType, Scope, TypedValue, Variance};

pub type EngineResult<T> = Result<T, EngineError>;

/// Opaque handle to an open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

/// Everything needed to create a variable.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub elem_type: ElemType,
    /// Number of elements per cell; only meaningful above 1 for the
    /// fixed-width character types.
    pub elem_count: i64,
    pub dim_sizes: Vec<i64>,
    pub rec_variance: Variance,
    pub dim_variances: Vec<Variance>,
}

/// The file-format engine capability set.
///
/// Handles are shared by several adapters, so every method takes `&self`;
/// implementations own their interior mutability. The whole system is
/// single-threaded and calls are serialized by the front-end, never
/// reentrant on one handle.
///
/// Indices are 0-based throughout: variables, attributes, entries, and
/// record numbers. "Maximum" queries return -1 when nothing exists yet.
pub trait ContainerEngine {
    fn create(&self, path: &str) -> EngineResult<ContainerId>;
    fn open(&self, path: &str) -> EngineResult<ContainerId>;
    /// Closes the handle, flushing if the engine persists containers.
    fn close(&self, id: ContainerId) -> EngineResult<()>;
    /// Removes the container's backing storage; the handle becomes invalid.
    fn delete(&self, id: ContainerId) -> EngineResult<()>;
    fn container_name(&self, id: ContainerId) -> EngineResult<String>;

    fn variable_count(&self, id: ContainerId) -> EngineResult<i64>;
    fn variable_name(&self, id: ContainerId, var: i64) -> EngineResult<String>;
    fn variable_type(&self, id: ContainerId, var: i64) -> EngineResult<ElemType>;
    fn variable_element_count(&self, id: ContainerId, var: i64) -> EngineResult<i64>;
    fn variable_dim_sizes(&self, id: ContainerId, var: i64) -> EngineResult<Vec<i64>>;
    fn variable_rec_variance(&self, id: ContainerId, var: i64) -> EngineResult<Variance>;
    fn variable_dim_variances(&self, id: ContainerId, var: i64) -> EngineResult<Vec<Variance>>;
    /// Highest written record number, -1 when no record was written.
    fn variable_max_written(&self, id: ContainerId, var: i64) -> EngineResult<i64>;
    fn variable_max_allocated(&self, id: ContainerId, var: i64) -> EngineResult<i64>;
    /// Highest written record number across every variable, -1 when none.
    fn max_written_across(&self, id: ContainerId) -> EngineResult<i64>;
    /// `Ok(None)` when no pad value has been set; that is an answer, not a
    /// failure.
    fn variable_pad(&self, id: ContainerId, var: i64) -> EngineResult<Option<TypedValue>>;
    fn set_variable_pad(&self, id: ContainerId, var: i64, pad: TypedValue) -> EngineResult<()>;
    /// Returns the new variable's index.
    fn create_variable(&self, id: ContainerId, spec: &VariableSpec) -> EngineResult<i64>;
    /// Removes the variable; later variables are renumbered down by one, as
    /// are the variable-scope entries that reference them.
    fn delete_variable(&self, id: ContainerId, var: i64) -> EngineResult<()>;
    fn rename_variable(&self, id: ContainerId, var: i64, name: &str) -> EngineResult<()>;
    fn allocate_records(&self, id: ContainerId, var: i64, count: i64) -> EngineResult<()>;
    fn variable_index_by_name(&self, id: ContainerId, name: &str) -> EngineResult<Option<i64>>;

    /// Reads one record's raw bytes. Records never written come back filled
    /// with the variable's pad value (zeroes when no pad is set).
    fn read_record(&self, id: ContainerId, var: i64, rec: i64) -> EngineResult<Vec<u8>>;
    fn write_record(&self, id: ContainerId, var: i64, rec: i64, bytes: &[u8]) -> EngineResult<()>;
    /// Deletes records `first..=last`; higher records shift down.
    fn delete_records(&self, id: ContainerId, var: i64, first: i64, last: i64)
        -> EngineResult<()>;

    fn attribute_count(&self, id: ContainerId) -> EngineResult<i64>;
    fn attribute_name(&self, id: ContainerId, attr: i64) -> EngineResult<String>;
    fn attribute_scope(&self, id: ContainerId, attr: i64) -> EngineResult<Scope>;
    fn attribute_index_by_name(&self, id: ContainerId, name: &str) -> EngineResult<Option<i64>>;
    fn create_attribute(&self, id: ContainerId, name: &str, scope: Scope) -> EngineResult<i64>;
    fn delete_attribute(&self, id: ContainerId, attr: i64) -> EngineResult<()>;

    /// Number of entries that exist under the attribute.
    fn entry_count(&self, id: ContainerId, scope: Scope, attr: i64) -> EngineResult<i64>;
    /// Highest existing entry index, -1 when the attribute has no entries.
    fn max_entry(&self, id: ContainerId, scope: Scope, attr: i64) -> EngineResult<i64>;
    /// Element count of one entry; 0 when the entry does not exist.
    fn entry_element_count(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<i64>;
    fn entry_value(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
    ) -> EngineResult<TypedValue>;
    /// Creates or replaces one entry.
    fn put_entry(
        &self,
        id: ContainerId,
        scope: Scope,
        attr: i64,
        entry: i64,
        value: &TypedValue,
    ) -> EngineResult<()>;
    fn delete_entry(&self, id: ContainerId, scope: Scope, attr: i64, entry: i64)
        -> EngineResult<()>;
}
