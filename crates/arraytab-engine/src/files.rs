//! File-backed engine: each container lives in one binary file. The file is
//! mapped and decoded on open, mutated in memory, and written back atomically
//! on close.

use crate::container::Container;
use crate::format::{decode_container, encode_container};
use crate::{status, ContainerEngine, ContainerId, EngineResult, VariableSpec};
use arraytab_core::types::{ElemType, Scope, TypedValue, Variance};
use memmap2::Mmap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct FileEngine {
    inner: RefCell<Inner>,
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    open: HashMap<u64, OpenContainer>,
}

struct OpenContainer {
    path: PathBuf,
    container: Container,
    dirty: bool,
}

impl FileEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, path: PathBuf, container: Container) -> ContainerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_handle += 1;
        let handle = inner.next_handle;
        inner.open.insert(
            handle,
            OpenContainer {
                path,
                container,
                dirty: false,
            },
        );
        ContainerId(handle)
    }

    fn with<T>(
        &self,
        id: ContainerId,
        f: impl FnOnce(&Container) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let inner = self.inner.borrow();
        let oc = inner.open.get(&id.0).ok_or_else(|| status::bad_handle(id.0))?;
        f(&oc.container)
    }

    fn with_mut<T>(
        &self,
        id: ContainerId,
        f: impl FnOnce(&mut Container) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut inner = self.inner.borrow_mut();
        let oc = inner
            .open
            .get_mut(&id.0)
            .ok_or_else(|| status::bad_handle(id.0))?;
        let out = f(&mut oc.container)?;
        oc.dirty = true;
        Ok(out)
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("container.atab");

    let mut i = 0u32;
    loop {
        let tmp_name = if i == 0 {
            format!("{base}.tmp")
        } else {
            format!("{base}.tmp.{i}")
        };
        let tmp_path = dir.join(tmp_name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(mut f) => {
                f.write_all(bytes)?;
                f.sync_all()?;
                std::fs::rename(&tmp_path, path)?;
                return Ok(());
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists && i < 16 => {
                i += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

impl ContainerEngine for FileEngine {
    fn create(&self, path: &str) -> EngineResult<ContainerId> {
        if Path::new(path).exists() {
            return Err(status::container_exists(path));
        }
        let container = Container::new(path);
        atomic_write(Path::new(path), &encode_container(&container))
            .map_err(|err| status::io(path, &err))?;
        Ok(self.insert(PathBuf::from(path), container))
    }

    fn open(&self, path: &str) -> EngineResult<ContainerId> {
        let file = File::open(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                status::no_such_container(path)
            } else {
                status::io(path, &err)
            }
        })?;
        // Safety: the mapping only lives for the decode below and the engine
        // assumes single-process access to containers opened for writing.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|err| status::io(path, &err))?;
        let container = decode_container(path, &mmap)?;
        Ok(self.insert(PathBuf::from(path), container))
    }

    fn close(&self, id: ContainerId) -> EngineResult<()> {
        let mut inner = self.inner.borrow_mut();
        let oc = inner
            .open
            .remove(&id.0)
            .ok_or_else(|| status::bad_handle(id.0))?;
        if oc.dirty {
            let path = oc.path.to_string_lossy().into_owned();
            atomic_write(&oc.path, &encode_container(&oc.container))
                .map_err(|err| status::io(&path, &err))?;
        }
        Ok(())
    }

    fn delete(&self, id: ContainerId) -> EngineResult<()> {
        let mut inner = self.inner.borrow_mut();
        let oc = inner
            .open
            .remove(&id.0)
            .ok_or_else(|| status::bad_handle(id.0))?;
        let path = oc.path.to_string_lossy().into_owned();
        std::fs::remove_file(&oc.path).map_err(|err| status::io(&path, &err))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_close_reopen_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.atab");
        let path = path.to_str().unwrap();

        let engine = FileEngine::new();
        let id = engine.create(path).unwrap();
        engine
            .create_variable(
                id,
                &VariableSpec {
                    name: "temp".into(),
                    elem_type: ElemType::Real8,
                    elem_count: 1,
                    dim_sizes: Vec::new(),
                    rec_variance: Variance::Vary,
                    dim_variances: Vec::new(),
                },
            )
            .unwrap();
        engine
            .write_record(id, 0, 0, &21.5f64.to_le_bytes())
            .unwrap();
        let title = engine.create_attribute(id, "Title", Scope::Global).unwrap();
        engine
            .put_entry(
                id,
                Scope::Global,
                title,
                0,
                &TypedValue::new(ElemType::Char, 9, b"Mission X".to_vec()).unwrap(),
            )
            .unwrap();
        engine.close(id).unwrap();

        let id = engine.open(path).unwrap();
        assert_eq!(engine.variable_count(id).unwrap(), 1);
        assert_eq!(
            engine.read_record(id, 0, 0).unwrap(),
            21.5f64.to_le_bytes()
        );
        assert_eq!(
            engine
                .entry_value(id, Scope::Global, 0, 0)
                .unwrap()
                .bytes(),
            b"Mission X".as_slice()
        );
        engine.close(id).unwrap();
    }

    #[test]
    fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.atab");
        let path = path.to_str().unwrap();

        let engine = FileEngine::new();
        let id = engine.create(path).unwrap();
        engine.delete(id).unwrap();
        assert!(!Path::new(path).exists());
        let err = engine.open(path).unwrap_err();
        assert_eq!(err.status, status::NO_SUCH_CONTAINER);
    }

    #[test]
    fn reopening_unmodified_container_does_not_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.atab");
        let path = path.to_str().unwrap();

        let engine = FileEngine::new();
        let id = engine.create(path).unwrap();
        engine.close(id).unwrap();
        let before = std::fs::metadata(path).unwrap().modified().unwrap();

        let id = engine.open(path).unwrap();
        engine.close(id).unwrap();
        let after = std::fs::metadata(path).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }
}
