//! Relational adapters over array containers.
//!
//! A [`Registry`] plays the role of the database: modules are registered
//! under well-known names, tables are created from (path-or-handle, mode)
//! argument lists, and cursors scan them. Connecting a container table
//! cascades creation of the five dependent tables bound to the same handle:
//! the variable catalog, the record table, the attribute catalog, and the
//! two attribute-entry tables.

mod attrs;
mod codec;
mod entries;
mod file;
mod recs;
mod registry;
mod vars;
mod vtab;
mod walk;

pub use registry::{
    normalize_container_arg, standard_registry, Module, Registry, MODULE_ATTRS, MODULE_FILE,
    MODULE_GENTRIES, MODULE_RECS, MODULE_VARS, MODULE_VENTRIES,
};
pub use vtab::{
    render_declaration, ColumnDecl, Constraint, ConstraintOp, ConstraintUsage, Cursor, ScanPlan,
    Table, TableSchema,
};
