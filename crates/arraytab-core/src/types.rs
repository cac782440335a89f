use crate::error::ValidationError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element types a container can store.
///
/// The discriminants are the container format's stable type ids; the id space
/// is sparse, so conversions go through [`ElemType::from_id`] rather than a
/// plain cast.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ElemType {
    Int1 = 1,
    Int2 = 2,
    Int4 = 4,
    Int8 = 8,
    Uint1 = 11,
    Uint2 = 12,
    Uint4 = 14,
    Real4 = 21,
    Real8 = 22,
    Epoch = 31,
    Epoch16 = 32,
    Tt2000 = 33,
    Byte = 41,
    Float = 44,
    Double = 45,
    Char = 51,
    Uchar = 52,
}

/// All defined element types, in id order.
pub const ELEM_TYPES: [ElemType; 17] = [
    ElemType::Int1,
    ElemType::Int2,
    ElemType::Int4,
    ElemType::Int8,
    ElemType::Uint1,
    ElemType::Uint2,
    ElemType::Uint4,
    ElemType::Real4,
    ElemType::Real8,
    ElemType::Epoch,
    ElemType::Epoch16,
    ElemType::Tt2000,
    ElemType::Byte,
    ElemType::Float,
    ElemType::Double,
    ElemType::Char,
    ElemType::Uchar,
];

impl ElemType {
    pub fn from_id(id: i64) -> Option<Self> {
        ELEM_TYPES.iter().copied().find(|t| t.id() == id)
    }

    pub fn id(self) -> i64 {
        self as i64
    }

    /// Lowercase mnemonic, bijective with the type id.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Int1 => "int1",
            Self::Int2 => "int2",
            Self::Int4 => "int4",
            Self::Int8 => "int8",
            Self::Uint1 => "uint1",
            Self::Uint2 => "uint2",
            Self::Uint4 => "uint4",
            Self::Real4 => "real4",
            Self::Real8 => "real8",
            Self::Epoch => "epoch",
            Self::Epoch16 => "epoch16",
            Self::Tt2000 => "tt2000",
            Self::Byte => "byte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::Uchar => "uchar",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        ELEM_TYPES.iter().copied().find(|t| t.mnemonic() == name)
    }

    /// Fixed per-element width in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            Self::Int1 | Self::Uint1 | Self::Byte | Self::Char | Self::Uchar => 1,
            Self::Int2 | Self::Uint2 => 2,
            Self::Int4 | Self::Uint4 | Self::Real4 | Self::Float => 4,
            Self::Int8 | Self::Real8 | Self::Epoch | Self::Tt2000 | Self::Double => 8,
            Self::Epoch16 => 16,
        }
    }

    /// Relational storage class of a single element.
    ///
    /// The 4-byte floats and the two wide epoch types land in BLOB: an 8-byte
    /// relational REAL cannot hold them losslessly, so the widening decision
    /// is left to the caller.
    pub fn rel_type(self) -> RelType {
        match self {
            Self::Real8 | Self::Double | Self::Epoch => RelType::Real,
            Self::Int1
            | Self::Int2
            | Self::Int4
            | Self::Int8
            | Self::Uint1
            | Self::Uint2
            | Self::Uint4
            | Self::Byte => RelType::Integer,
            Self::Char | Self::Uchar => RelType::Text,
            Self::Real4 | Self::Float | Self::Epoch16 | Self::Tt2000 => RelType::Blob,
        }
    }

    /// Which of the five scalar writers handles this element type.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Int1
            | Self::Int2
            | Self::Int4
            | Self::Int8
            | Self::Uint1
            | Self::Uint2
            | Self::Uint4
            | Self::Byte
            | Self::Tt2000 => ValueKind::Integer,
            Self::Real8 | Self::Double | Self::Epoch => ValueKind::Real,
            Self::Char | Self::Uchar => ValueKind::Text,
            Self::Real4 | Self::Float => ValueKind::Float32,
            Self::Epoch16 => ValueKind::Wide,
        }
    }

    pub fn is_character(self) -> bool {
        matches!(self, Self::Char | Self::Uchar)
    }

    /// Element type to use when a caller supplies a value but no type.
    /// Binary payloads have no inference; the caller must name a type.
    pub fn infer_from(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(_) => Some(Self::Int8),
            Value::Real(_) => Some(Self::Real8),
            Value::Text(_) => Some(Self::Char),
            Value::Null | Value::Blob(_) | Value::NoChange => None,
        }
    }
}

/// The relational storage classes a column can declare.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelType {
    Integer,
    Real,
    Text,
    Blob,
}

impl RelType {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// Scalar writer selection, one per marshalling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Real,
    Text,
    /// 4-byte float; accepts a number or a raw 4-byte blob.
    Float32,
    /// 16-byte binary; requires an exact-width blob.
    Wide,
}

/// Record/dimension variance. The on-disk encoding is -1 for varying and 0
/// for fixed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    Vary,
    NoVary,
}

impl Variance {
    pub fn from_code(code: i64) -> Result<Self, ValidationError> {
        match code {
            -1 => Ok(Self::Vary),
            0 => Ok(Self::NoVary),
            other => Err(ValidationError::BadVariance(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Vary => -1,
            Self::NoVary => 0,
        }
    }
}

/// Attribute scope. Displayed as 1 (global) or 2 (variable) in catalog scans.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Variable,
}

impl Scope {
    pub fn code(self) -> i64 {
        match self {
            Self::Global => 1,
            Self::Variable => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Variable => "variable",
        }
    }
}

/// How an adapter was attached to its container, derived once from the mode
/// character at construction time.
///
/// Borrowed modes mean the handle belongs to another adapter and must never
/// be closed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Create,
    DeleteOnOpen,
    ReadOnly,
    ReadWrite,
    BorrowedReadOnly,
    BorrowedReadWrite,
}

impl AccessMode {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Self::Create),
            'd' => Some(Self::DeleteOnOpen),
            'r' => Some(Self::ReadOnly),
            'w' => Some(Self::ReadWrite),
            's' => Some(Self::BorrowedReadOnly),
            't' => Some(Self::BorrowedReadWrite),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Create => 'c',
            Self::DeleteOnOpen => 'd',
            Self::ReadOnly => 'r',
            Self::ReadWrite => 'w',
            Self::BorrowedReadOnly => 's',
            Self::BorrowedReadWrite => 't',
        }
    }

    pub fn is_borrowed(self) -> bool {
        matches!(self, Self::BorrowedReadOnly | Self::BorrowedReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Self::Create | Self::ReadWrite | Self::BorrowedReadWrite
        )
    }

    /// The mode dependent adapters are created with when this adapter owns
    /// the handle.
    pub fn sub_mode(self) -> Self {
        if self == Self::ReadOnly {
            Self::BorrowedReadOnly
        } else {
            Self::BorrowedReadWrite
        }
    }
}

/// A relational cell value, as exchanged with the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Placeholder the front-end passes for columns untouched by a partial
    /// UPDATE, and that cursors may return when told the value is not needed.
    NoChange,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }

    /// The value as an integer if it is numeric; None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Real(v) => Some(*v as i64),
            Self::Null | Self::Text(_) | Self::Blob(_) | Self::NoChange => None,
        }
    }

    /// Front-end style numeric coercion: text parses, everything else is 0.
    pub fn coerce_i64(&self) -> i64 {
        match self {
            Self::Integer(v) => *v,
            Self::Real(v) => *v as i64,
            Self::Text(s) => s.trim().parse().unwrap_or(0),
            Self::Null | Self::Blob(_) | Self::NoChange => 0,
        }
    }

    pub fn coerce_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Real(v) => *v,
            Self::Text(s) => s.trim().parse().unwrap_or(0.0),
            Self::Null | Self::Blob(_) | Self::NoChange => 0.0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// A typed byte payload: pad values and attribute entries.
///
/// The tag travels with the bytes so no consumer ever reinterprets an
/// untagged buffer; construction validates the byte length against the
/// element width and count.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    elem_type: ElemType,
    count: i64,
    bytes: Vec<u8>,
}

impl TypedValue {
    pub fn new(elem_type: ElemType, count: i64, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        if count <= 0 {
            return Err(ValidationError::BadElementCount(count));
        }
        let expected = elem_type.byte_width() * count as usize;
        if bytes.len() != expected {
            return Err(ValidationError::BlobSizeMismatch {
                got: bytes.len(),
                width: elem_type.byte_width(),
                count,
            });
        }
        Ok(Self {
            elem_type,
            count,
            bytes,
        })
    }

    pub fn elem_type(&self) -> ElemType {
        self.elem_type
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
