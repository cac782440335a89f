//! Binary layout of a container file.
//!
//! One header, then the variable table (records inline), then the attribute
//! table (entries inline). Everything is little-endian. The layout is private
//! to this crate; the adapters never see it.

use crate::container::{Attribute, Container, Variable};
use arraytab_core::error::EngineError;
use arraytab_core::types::{ElemType, Scope, TypedValue, Variance};
use std::collections::BTreeMap;
use thiserror::Error;

const MAGIC_ATAB: u32 = 0x4241_5441; // 'A' 'T' 'A' 'B'
const VERSION_MAJOR: u16 = 1;
const VERSION_MINOR: u16 = 0;
const HEADER_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("truncated input at byte {at}, need {needed} bytes")]
    Truncated { at: usize, needed: usize },

    #[error("bad magic: expected 0x42415441, got 0x{0:08x}")]
    BadMagic(u32),

    #[error("unsupported version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("file length mismatch: header {header} bytes, actual {actual} bytes")]
    FileLengthMismatch { header: u64, actual: u64 },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid utf-8 string in {0}")]
    InvalidUtf8(&'static str),
}

impl From<FormatError> for EngineError {
    fn from(err: FormatError) -> Self {
        EngineError::new(crate::status::BAD_FORMAT, err.to_string())
    }
}

pub(crate) fn encode_container(c: &Container) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + 256);
    buf.extend_from_slice(&MAGIC_ATAB.to_le_bytes());
    buf.extend_from_slice(&VERSION_MAJOR.to_le_bytes());
    buf.extend_from_slice(&VERSION_MINOR.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes()); // file length, patched below
    buf.extend_from_slice(&(c.variables.len() as u64).to_le_bytes());
    buf.extend_from_slice(&(c.attributes.len() as u64).to_le_bytes());

    for v in &c.variables {
        put_str(&mut buf, &v.name);
        buf.extend_from_slice(&v.elem_type.id().to_le_bytes());
        buf.extend_from_slice(&v.elem_count.to_le_bytes());
        buf.extend_from_slice(&v.rec_variance.code().to_le_bytes());
        buf.extend_from_slice(&v.max_allocated.to_le_bytes());
        buf.extend_from_slice(&(v.dim_sizes.len() as u32).to_le_bytes());
        for (size, variance) in v.dim_sizes.iter().zip(&v.dim_variances) {
            buf.extend_from_slice(&size.to_le_bytes());
            buf.extend_from_slice(&variance.code().to_le_bytes());
        }
        match &v.pad {
            Some(pad) => {
                buf.push(1);
                buf.extend_from_slice(&pad.count().to_le_bytes());
                buf.extend_from_slice(pad.bytes());
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(&(v.records.len() as u64).to_le_bytes());
        for (rec, bytes) in &v.records {
            buf.extend_from_slice(&rec.to_le_bytes());
            buf.extend_from_slice(bytes);
        }
    }

    for a in &c.attributes {
        put_str(&mut buf, &a.name);
        buf.extend_from_slice(&(a.scope.code() as u32).to_le_bytes());
        buf.extend_from_slice(&(a.entries.len() as u64).to_le_bytes());
        for (index, value) in &a.entries {
            buf.extend_from_slice(&index.to_le_bytes());
            buf.extend_from_slice(&value.elem_type().id().to_le_bytes());
            buf.extend_from_slice(&value.count().to_le_bytes());
            buf.extend_from_slice(value.bytes());
        }
    }

    let len = buf.len() as u64;
    buf[8..16].copy_from_slice(&len.to_le_bytes());
    buf
}

pub(crate) fn decode_container(name: &str, data: &[u8]) -> Result<Container, FormatError> {
    let mut r = Reader { data, pos: 0 };

    let magic = r.u32()?;
    if magic != MAGIC_ATAB {
        return Err(FormatError::BadMagic(magic));
    }
    let major = r.u16()?;
    let minor = r.u16()?;
    if major != VERSION_MAJOR {
        return Err(FormatError::UnsupportedVersion { major, minor });
    }
    let file_length = r.u64()?;
    if file_length != data.len() as u64 {
        return Err(FormatError::FileLengthMismatch {
            header: file_length,
            actual: data.len() as u64,
        });
    }
    let variable_count = r.u64()?;
    let attribute_count = r.u64()?;

    let mut container = Container::new(name);

    for _ in 0..variable_count {
        let name = r.string("Variable.name")?;
        let elem_type = ElemType::from_id(r.i64()?).ok_or(FormatError::InvalidValue {
            field: "Variable.elem_type",
            reason: "unknown element type id",
        })?;
        let elem_count = r.i64()?;
        if elem_count < 1 {
            return Err(FormatError::InvalidValue {
                field: "Variable.elem_count",
                reason: "must be positive",
            });
        }
        let rec_variance = variance(r.i64()?, "Variable.rec_variance")?;
        let max_allocated = r.i64()?;
        let dim_count = r.u32()? as usize;
        let mut dim_sizes = Vec::with_capacity(dim_count);
        let mut dim_variances = Vec::with_capacity(dim_count);
        for _ in 0..dim_count {
            let size = r.i64()?;
            if size < 1 {
                return Err(FormatError::InvalidValue {
                    field: "Variable.dim_sizes",
                    reason: "must be positive",
                });
            }
            dim_sizes.push(size);
            dim_variances.push(variance(r.i64()?, "Variable.dim_variances")?);
        }
        let pad = match r.u8()? {
            0 => None,
            1 => {
                let count = r.i64()?;
                Some(typed_value(&mut r, elem_type, count, "Variable.pad")?)
            }
            _ => {
                return Err(FormatError::InvalidValue {
                    field: "Variable.pad",
                    reason: "flag must be 0 or 1",
                })
            }
        };

        let mut variable = Variable {
            name,
            elem_type,
            elem_count,
            dim_sizes,
            rec_variance,
            dim_variances,
            records: BTreeMap::new(),
            max_allocated,
            pad,
        };
        let row = variable.record_bytes();
        let record_count = r.u64()?;
        for _ in 0..record_count {
            let rec = r.i64()?;
            if rec < 0 {
                return Err(FormatError::InvalidValue {
                    field: "Variable.records",
                    reason: "negative record number",
                });
            }
            let bytes = r.take(row)?.to_vec();
            variable.records.insert(rec, bytes);
        }
        container.variables.push(variable);
    }

    for _ in 0..attribute_count {
        let name = r.string("Attribute.name")?;
        let scope = match r.u32()? {
            1 => Scope::Global,
            2 => Scope::Variable,
            _ => {
                return Err(FormatError::InvalidValue {
                    field: "Attribute.scope",
                    reason: "must be 1 (global) or 2 (variable)",
                })
            }
        };
        let entry_count = r.u64()?;
        let mut entries = BTreeMap::new();
        for _ in 0..entry_count {
            let index = r.i64()?;
            if index < 0 {
                return Err(FormatError::InvalidValue {
                    field: "Attribute.entries",
                    reason: "negative entry index",
                });
            }
            let elem_type = ElemType::from_id(r.i64()?).ok_or(FormatError::InvalidValue {
                field: "Entry.elem_type",
                reason: "unknown element type id",
            })?;
            let count = r.i64()?;
            entries.insert(index, typed_value(&mut r, elem_type, count, "Entry.value")?);
        }
        container.attributes.push(Attribute {
            name,
            scope,
            entries,
        });
    }

    Ok(container)
}

fn variance(code: i64, field: &'static str) -> Result<Variance, FormatError> {
    Variance::from_code(code).map_err(|_| FormatError::InvalidValue {
        field,
        reason: "must be -1 (vary) or 0 (novary)",
    })
}

fn typed_value(
    r: &mut Reader<'_>,
    elem_type: ElemType,
    count: i64,
    field: &'static str,
) -> Result<TypedValue, FormatError> {
    if count < 1 {
        return Err(FormatError::InvalidValue {
            field,
            reason: "element count must be positive",
        });
    }
    let bytes = r.take(elem_type.byte_width() * count as usize)?.to_vec();
    TypedValue::new(elem_type, count, bytes).map_err(|_| FormatError::InvalidValue {
        field,
        reason: "payload length disagrees with element count",
    })
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        if self.pos + n > self.data.len() {
            return Err(FormatError::Truncated {
                at: self.pos,
                needed: n,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap_or([0; 2])))
    }

    fn u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap_or([0; 4])))
    }

    fn u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap_or([0; 8])))
    }

    fn i64(&mut self) -> Result<i64, FormatError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap_or([0; 8])))
    }

    fn string(&mut self, field: &'static str) -> Result<String, FormatError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8(field))
    }
}
