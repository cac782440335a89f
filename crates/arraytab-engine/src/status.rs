//! Status codes the shipped engines report. Negative codes are failures;
//! the descriptive text travels with the code inside [`EngineError`].

use arraytab_core::error::EngineError;

pub const NO_SUCH_CONTAINER: i32 = -101;
pub const CONTAINER_EXISTS: i32 = -102;
pub const BAD_HANDLE: i32 = -103;
pub const IO: i32 = -104;
pub const BAD_FORMAT: i32 = -105;

pub const NO_SUCH_VARIABLE: i32 = -201;
pub const DUPLICATE_VARIABLE: i32 = -202;
pub const BAD_RECORD_NUMBER: i32 = -203;
pub const BAD_RECORD_SIZE: i32 = -204;

pub const NO_SUCH_ATTRIBUTE: i32 = -301;
pub const DUPLICATE_ATTRIBUTE: i32 = -302;
pub const NO_SUCH_ENTRY: i32 = -303;
pub const SCOPE_MISMATCH: i32 = -304;

pub const BAD_ARGUMENT: i32 = -401;

pub(crate) fn no_such_container(path: &str) -> EngineError {
    EngineError::new(NO_SUCH_CONTAINER, format!("no such container: {path:?}"))
}

pub(crate) fn container_exists(path: &str) -> EngineError {
    EngineError::new(CONTAINER_EXISTS, format!("container already exists: {path:?}"))
}

pub(crate) fn bad_handle(handle: u64) -> EngineError {
    EngineError::new(BAD_HANDLE, format!("handle {handle} is not open"))
}

pub(crate) fn io(path: &str, err: &std::io::Error) -> EngineError {
    EngineError::new(IO, format!("i/o error on {path:?}: {err}"))
}

pub(crate) fn no_such_variable(var: i64) -> EngineError {
    EngineError::new(NO_SUCH_VARIABLE, format!("no variable at index {var}"))
}

pub(crate) fn duplicate_variable(name: &str) -> EngineError {
    EngineError::new(
        DUPLICATE_VARIABLE,
        format!("a variable named {name:?} already exists"),
    )
}

pub(crate) fn bad_record_number(rec: i64) -> EngineError {
    EngineError::new(BAD_RECORD_NUMBER, format!("invalid record number {rec}"))
}

pub(crate) fn bad_record_size(got: usize, expected: usize) -> EngineError {
    EngineError::new(
        BAD_RECORD_SIZE,
        format!("record payload is {got} bytes, the variable holds {expected}"),
    )
}

pub(crate) fn no_such_attribute(attr: i64) -> EngineError {
    EngineError::new(NO_SUCH_ATTRIBUTE, format!("no attribute at index {attr}"))
}

pub(crate) fn duplicate_attribute(name: &str) -> EngineError {
    EngineError::new(
        DUPLICATE_ATTRIBUTE,
        format!("an attribute named {name:?} already exists"),
    )
}

pub(crate) fn no_such_entry(attr: i64, entry: i64) -> EngineError {
    EngineError::new(
        NO_SUCH_ENTRY,
        format!("attribute {attr} has no entry {entry}"),
    )
}

pub(crate) fn scope_mismatch(attr: i64) -> EngineError {
    EngineError::new(
        SCOPE_MISMATCH,
        format!("attribute {attr} does not have the requested scope"),
    )
}

pub(crate) fn bad_argument(detail: impl std::fmt::Display) -> EngineError {
    EngineError::new(BAD_ARGUMENT, detail.to_string())
}
