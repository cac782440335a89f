//! Module registration and table lifecycle: the database side of the
//! protocol, plus the argument-normalization glue.

use crate::vtab::Table;
use arraytab_core::error::{Error, ValidationError};
use arraytab_engine::{ContainerEngine, ContainerId};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

pub const MODULE_FILE: &str = "atabfile";
pub const MODULE_VARS: &str = "atabvars";
pub const MODULE_RECS: &str = "atabrecs";
pub const MODULE_ATTRS: &str = "atabattrs";
pub const MODULE_GENTRIES: &str = "atabgentries";
pub const MODULE_VENTRIES: &str = "atabventries";

/// A table constructor registered under a module name.
///
/// Returning `Ok(None)` means the module completed without leaving a table
/// behind (the delete-on-open mode does this).
pub trait Module {
    fn connect(
        &self,
        registry: &mut Registry,
        table_name: &str,
        args: &[&str],
    ) -> Result<Option<Rc<dyn Table>>, Error>;
}

pub struct Registry {
    engine: Rc<dyn ContainerEngine>,
    modules: HashMap<String, Rc<dyn Module>>,
    tables: HashMap<String, Rc<dyn Table>>,
    /// One schema epoch per container handle; the variable catalog bumps it
    /// on structural change and the record table rebuilds when it moves.
    epochs: HashMap<u64, Rc<Cell<u64>>>,
}

impl Registry {
    pub fn new(engine: Rc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            modules: HashMap::new(),
            tables: HashMap::new(),
            epochs: HashMap::new(),
        }
    }

    pub fn engine(&self) -> Rc<dyn ContainerEngine> {
        Rc::clone(&self.engine)
    }

    pub fn register_module(&mut self, name: &str, module: Rc<dyn Module>) {
        self.modules.insert(name.to_string(), module);
    }

    /// The `CREATE VIRTUAL TABLE` equivalent.
    pub fn create_table(
        &mut self,
        module: &str,
        table_name: &str,
        args: &[&str],
    ) -> Result<(), Error> {
        if self.tables.contains_key(table_name) {
            return Err(ValidationError::DuplicateTable(table_name.to_string()).into());
        }
        let constructor = self
            .modules
            .get(module)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownModule(module.to_string()))?;
        if let Some(table) = constructor.connect(self, table_name, args)? {
            self.tables.insert(table_name.to_string(), table);
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<Rc<dyn Table>, Error> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| ValidationError::NoSuchTable(name.to_string()).into())
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Disconnects and removes one table.
    pub fn drop_table(&mut self, name: &str) -> Result<(), Error> {
        let table = self
            .tables
            .remove(name)
            .ok_or_else(|| ValidationError::NoSuchTable(name.to_string()))?;
        table.disconnect()
    }

    /// Disconnects every table; the container-owning tables close their
    /// handles (and flush, for persistent engines).
    pub fn disconnect_all(&mut self) -> Result<(), Error> {
        // Borrowing tables disconnect as no-ops in any order; owners last
        // would be stricter, but no shipped table touches the handle on
        // disconnect unless it owns it.
        let names: Vec<String> = self.tables.keys().cloned().collect();
        for name in names {
            self.drop_table(&name)?;
        }
        Ok(())
    }

    pub fn schema_epoch(&mut self, id: ContainerId) -> Rc<Cell<u64>> {
        Rc::clone(self.epochs.entry(id.0).or_default())
    }
}

/// Registers the six standard modules.
pub fn standard_registry(engine: Rc<dyn ContainerEngine>) -> Registry {
    let mut registry = Registry::new(engine);
    registry.register_module(MODULE_FILE, Rc::new(crate::file::FileModule));
    registry.register_module(MODULE_VARS, Rc::new(crate::vars::VarsModule));
    registry.register_module(MODULE_RECS, Rc::new(crate::recs::RecsModule));
    registry.register_module(MODULE_ATTRS, Rc::new(crate::attrs::AttrsModule));
    registry.register_module(
        MODULE_GENTRIES,
        Rc::new(crate::entries::EntriesModule::global()),
    );
    registry.register_module(
        MODULE_VENTRIES,
        Rc::new(crate::entries::EntriesModule::variable()),
    );
    registry
}

/// Strips one level of front-end quoting: `'x'` or `"x"` becomes `x`, with
/// doubled quotes collapsing.
pub(crate) fn dequote(arg: &str) -> String {
    let bytes = arg.as_bytes();
    let quote = match bytes.first() {
        Some(&q @ (b'\'' | b'"')) => q,
        _ => return arg.to_string(),
    };
    if bytes.len() < 2 || bytes[bytes.len() - 1] != quote {
        return arg.to_string();
    }
    let inner = &arg[1..arg.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == quote as char && chars.peek() == Some(&(quote as char)) {
            chars.next();
        }
    }
    out
}

/// Dequotes a container path argument; the engine sees paths verbatim
/// otherwise.
pub fn normalize_container_arg(arg: &str) -> String {
    dequote(arg)
}

/// Parses a mode argument: exactly one character once dequoted.
pub(crate) fn parse_mode_char(arg: &str) -> Result<char, Error> {
    let dequoted = dequote(arg);
    let mut chars = dequoted.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ValidationError::BadModeArgument.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequote_handles_doubled_quotes() {
        assert_eq!(dequote("'abc'"), "abc");
        assert_eq!(dequote("\"a\"\"b\""), "a\"b");
        assert_eq!(dequote("plain"), "plain");
        assert_eq!(dequote("'unterminated"), "'unterminated");
    }

    #[test]
    fn mode_arguments_must_be_one_char() {
        assert_eq!(parse_mode_char("'w'").unwrap(), 'w');
        assert_eq!(parse_mode_char("r").unwrap(), 'r');
        assert!(parse_mode_char("rw").is_err());
        assert!(parse_mode_char("''").is_err());
    }
}
