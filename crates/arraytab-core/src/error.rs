use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A container engine call failed; `op` names what was being attempted
    /// and the source carries the engine's own status text.
    #[error("{op} failed: {source}")]
    Engine {
        op: &'static str,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Corrupt(#[from] CorruptionError),

    /// Distinct from validation so callers can tell "wrong argument" from
    /// "not permitted in this mode".
    #[error("{op} is not permitted in mode '{mode}' (read only)")]
    ReadOnly { op: &'static str, mode: char },
}

/// A failure reported by the file-format engine: a negative status code plus
/// the engine's descriptive text.
#[derive(Debug, Clone, Error)]
#[error("{text} (status {status})")]
pub struct EngineError {
    pub status: i32,
    pub text: String,
}

impl EngineError {
    pub fn new(status: i32, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }
}

/// Attaches the attempted operation to an engine failure.
pub trait EngineOp<T> {
    fn op(self, op: &'static str) -> Result<T, Error>;
}

impl<T> EngineOp<T> for Result<T, EngineError> {
    fn op(self, op: &'static str) -> Result<T, Error> {
        self.map_err(|source| Error::Engine { op, source })
    }
}

/// Schema or argument problems detected before any engine call is made.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid element type id {0}")]
    BadTypeId(i64),

    #[error("unknown element type mnemonic {0:?}")]
    BadTypeName(String),

    #[error("element type must be an id, a mnemonic, or null")]
    BadTypeSpec,

    #[error("no element type can be inferred from the supplied value")]
    NoInferableType,

    #[error("invalid element count {0}")]
    BadElementCount(i64),

    #[error("element count {count} exceeds the plausible maximum {max}")]
    ImplausibleElementCount { count: i64, max: i64 },

    #[error("element count {count} does not match the string length {len}")]
    ElementCountStringMismatch { count: i64, len: usize },

    #[error("invalid dimension count {0}")]
    BadDimCount(i64),

    #[error("invalid dimension size {0}")]
    BadDimSize(i64),

    #[error("dimension list {list:?} must hold exactly {expected} positive integers")]
    BadDimList { list: String, expected: i64 },

    #[error("invalid variance {0}, must be -1 (vary) or 0 (novary)")]
    BadVariance(i64),

    #[error("column {0} is read-only")]
    ReadOnlyColumn(&'static str),

    #[error("only the name, allocated records, and pad value of a variable can be updated")]
    ImmutableVariableShape,

    #[error("{got} data columns supplied, expected {expected}")]
    ColumnCountMismatch { got: usize, expected: usize },

    #[error("payload is {got} bytes, expected {width} x {count}")]
    BlobSizeMismatch {
        got: usize,
        width: usize,
        count: i64,
    },

    #[error("a {0:?} value requires an exact-width blob payload")]
    ExactBlobRequired(crate::types::ElemType),

    #[error("pad values of type {0:?} are not supported")]
    UnsupportedPadType(crate::types::ElemType),

    #[error("a {0} value is required")]
    WrongValueType(&'static str),

    #[error("attribute entries cannot be null")]
    NullEntryValue,

    #[error("attribute index {index} is out of range (count {count})")]
    AttrOutOfRange { index: i64, count: i64 },

    #[error("attribute {name:?} does not exist")]
    NoSuchAttribute { name: String },

    #[error("attribute at index {index} is named {actual:?}, not {given:?}")]
    AttrNameMismatch {
        index: i64,
        actual: String,
        given: String,
    },

    #[error("attribute {index} has {actual} scope, this table holds {expected} entries")]
    ScopeMismatch {
        index: i64,
        actual: &'static str,
        expected: &'static str,
    },

    #[error("entry number {entry} is implausibly far past the maximum {max}")]
    ImplausibleEntryNumber { entry: i64, max: i64 },

    #[error("variable index {index} is out of range (count {count})")]
    VarOutOfRange { index: i64, count: i64 },

    #[error("variable {name:?} does not exist")]
    NoSuchVariable { name: String },

    #[error("no variables have been created yet")]
    NoVariables,

    #[error("every variable already holds an entry under this attribute")]
    NoVariableSlotLeft,

    #[error("no usable entry owner could be resolved")]
    BadEntryOwner,

    #[error("invalid scope {0:?} for attribute")]
    BadScope(String),

    #[error("rowid {0} does not name a visited row")]
    BadRowid(i64),

    #[error("{0} is not a valid column number")]
    BadColumn(usize),

    #[error("mode '{0}' is not valid here")]
    BadMode(char),

    #[error("a container path argument is required")]
    MissingPath,

    #[error("mode argument must be exactly one character")]
    BadModeArgument,

    #[error("this table cannot be modified")]
    NotModifiable,

    #[error("no module named {0:?} is registered")]
    UnknownModule(String),

    #[error("a table named {0:?} already exists")]
    DuplicateTable(String),

    #[error("no table named {0:?} exists")]
    NoSuchTable(String),

    #[error("updating rows of this table is not supported, delete then insert")]
    UpdateUnsupported,
}

/// Signals that the container's metadata contradicts itself. Never tolerated
/// silently; the data is presumed damaged.
#[derive(Debug, Error, PartialEq)]
pub enum CorruptionError {
    #[error("variable {name:?} was created at index {got}, expected {expected}")]
    VariableIndexSkew {
        name: String,
        got: i64,
        expected: i64,
    },

    #[error("attribute {attr} reports {entries} entries but none has a positive element count")]
    EmptyAttributeWalk { attr: i64, entries: i64 },
}
