//! Cell marshalling between relational values and container byte payloads.
//!
//! Scalar writes go through a closed set of typed writers selected by
//! [`ElemType::value_kind`]; reads dispatch on the declared relational
//! class. Pad values get their own 8-way encoding keyed by element width.

use arraytab_core::error::{Error, ValidationError};
use arraytab_core::types::{ElemType, RelType, TypedValue, Value, ValueKind};

/// Encodes an integer into the element's width, two's-complement truncating.
pub(crate) fn encode_int(elem_type: ElemType, v: i64) -> Vec<u8> {
    match elem_type.byte_width() {
        1 => vec![v as u8],
        2 => (v as i16).to_le_bytes().to_vec(),
        4 => (v as i32).to_le_bytes().to_vec(),
        _ => v.to_le_bytes().to_vec(),
    }
}

/// Decodes the first element as an integer, honoring the type's signedness.
pub(crate) fn decode_int(elem_type: ElemType, bytes: &[u8]) -> i64 {
    let width = elem_type.byte_width().min(bytes.len());
    let b = &bytes[..width];
    match elem_type {
        ElemType::Int1 | ElemType::Byte => b.first().map_or(0, |&v| v as i8 as i64),
        ElemType::Uint1 => b.first().map_or(0, |&v| v as i64),
        ElemType::Int2 => i16::from_le_bytes(pad_array(b)) as i64,
        ElemType::Uint2 => u16::from_le_bytes(pad_array(b)) as i64,
        ElemType::Int4 => i32::from_le_bytes(pad_array(b)) as i64,
        ElemType::Uint4 => u32::from_le_bytes(pad_array(b)) as i64,
        _ => i64::from_le_bytes(pad_array(b)),
    }
}

fn pad_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

fn decode_f64(bytes: &[u8]) -> f64 {
    f64::from_le_bytes(pad_array(bytes))
}

fn numeric(v: &Value, what: &'static str) -> Result<f64, Error> {
    match v {
        Value::Integer(i) => Ok(*i as f64),
        Value::Real(r) => Ok(*r),
        Value::Null | Value::Text(_) | Value::Blob(_) | Value::NoChange => {
            Err(ValidationError::WrongValueType(what).into())
        }
    }
}

fn numeric_i64(v: &Value, what: &'static str) -> Result<i64, Error> {
    match v {
        Value::Integer(i) => Ok(*i),
        Value::Real(r) => Ok(*r as i64),
        Value::Null | Value::Text(_) | Value::Blob(_) | Value::NoChange => {
            Err(ValidationError::WrongValueType(what).into())
        }
    }
}

fn exact_blob(v: &Value, width: usize) -> Result<Vec<u8>, Error> {
    match v.as_blob() {
        Some(b) if b.len() == width => Ok(b.to_vec()),
        Some(b) => Err(ValidationError::BlobSizeMismatch {
            got: b.len(),
            width,
            count: 1,
        }
        .into()),
        None => Err(ValidationError::WrongValueType("blob").into()),
    }
}

/// Encodes one scalar record cell for the variable's element type.
pub(crate) fn encode_scalar_record(
    elem_type: ElemType,
    elem_count: i64,
    v: &Value,
) -> Result<Vec<u8>, Error> {
    match elem_type.value_kind() {
        ValueKind::Integer => Ok(encode_int(elem_type, v.coerce_i64())),
        ValueKind::Real => Ok(v.coerce_f64().to_le_bytes().to_vec()),
        ValueKind::Text => {
            let s = v
                .as_text()
                .ok_or(ValidationError::WrongValueType("text"))?;
            let mut bytes = s.as_bytes().to_vec();
            bytes.resize(elem_count.max(1) as usize, 0);
            Ok(bytes)
        }
        ValueKind::Float32 => match v {
            Value::Blob(_) => exact_blob(v, 4),
            _ => Ok((numeric(v, "number or 4-byte blob")? as f32)
                .to_le_bytes()
                .to_vec()),
        },
        ValueKind::Wide => exact_blob(v, 16),
    }
}

/// Decodes one record cell for the column's declared relational class.
pub(crate) fn decode_record_cell(rel: RelType, elem_type: ElemType, bytes: Vec<u8>) -> Value {
    match rel {
        RelType::Integer => Value::Integer(decode_int(elem_type, &bytes)),
        RelType::Real => Value::Real(decode_f64(&bytes)),
        RelType::Text => Value::Text(text_from_bytes(&bytes)),
        RelType::Blob => Value::Blob(bytes),
    }
}

fn text_from_bytes(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |k| k + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// The 8-way typed pad-value writer. Each branch produces an exact-width
/// payload for the variable's element type; TT2000 has no pad encoding.
pub(crate) fn encode_pad(elem_type: ElemType, v: &Value) -> Result<TypedValue, Error> {
    let (count, bytes) = match elem_type {
        ElemType::Real8 | ElemType::Double | ElemType::Epoch => {
            (1, numeric(v, "number")?.to_le_bytes().to_vec())
        }
        ElemType::Int8 => (1, numeric_i64(v, "integer")?.to_le_bytes().to_vec()),
        ElemType::Int4 | ElemType::Uint4 => {
            (1, (numeric_i64(v, "integer")? as i32).to_le_bytes().to_vec())
        }
        ElemType::Int2 | ElemType::Uint2 => {
            (1, (numeric_i64(v, "integer")? as i16).to_le_bytes().to_vec())
        }
        ElemType::Int1 | ElemType::Uint1 | ElemType::Byte => {
            (1, vec![numeric_i64(v, "integer")? as u8])
        }
        ElemType::Char | ElemType::Uchar => {
            let s = v
                .as_text()
                .ok_or(ValidationError::WrongValueType("text"))?;
            (s.len() as i64, s.as_bytes().to_vec())
        }
        ElemType::Real4 | ElemType::Float => (
            1,
            (numeric(v, "number")? as f32).to_le_bytes().to_vec(),
        ),
        ElemType::Epoch16 => (1, exact_blob(v, 16)?),
        ElemType::Tt2000 => return Err(ValidationError::UnsupportedPadType(elem_type).into()),
    };
    Ok(TypedValue::new(elem_type, count, bytes)?)
}

/// Renders a stored pad value for the catalog's pad column. The 4-byte
/// floats widen to REAL here; only the wide epoch type stays raw.
pub(crate) fn pad_value(tv: &TypedValue) -> Value {
    match tv.elem_type().rel_type() {
        RelType::Real => Value::Real(decode_f64(tv.bytes())),
        RelType::Integer => Value::Integer(decode_int(tv.elem_type(), tv.bytes())),
        RelType::Text => Value::Text(text_from_bytes(tv.bytes())),
        RelType::Blob => match tv.elem_type() {
            ElemType::Real4 | ElemType::Float => {
                Value::Real(f32::from_le_bytes(pad_array(tv.bytes())) as f64)
            }
            _ => Value::Blob(tv.bytes().to_vec()),
        },
    }
}

/// Encodes one scalar attribute entry. Scalar writers store their canonical
/// element type; the resolved type id only selects the writer.
pub(crate) fn encode_scalar_entry(
    kind: ValueKind,
    text_count: i64,
    v: &Value,
) -> Result<TypedValue, Error> {
    let tv = match kind {
        ValueKind::Integer => TypedValue::new(
            ElemType::Int8,
            1,
            numeric_i64(v, "integer")?.to_le_bytes().to_vec(),
        )?,
        ValueKind::Real => TypedValue::new(
            ElemType::Double,
            1,
            numeric(v, "number")?.to_le_bytes().to_vec(),
        )?,
        ValueKind::Text => {
            let s = v
                .as_text()
                .ok_or(ValidationError::WrongValueType("text"))?;
            TypedValue::new(ElemType::Char, text_count, s.as_bytes().to_vec())?
        }
        ValueKind::Float32 => {
            let bytes = match v {
                Value::Blob(_) => exact_blob(v, 4)?,
                _ => (numeric(v, "number or 4-byte blob")? as f32)
                    .to_le_bytes()
                    .to_vec(),
            };
            TypedValue::new(ElemType::Float, 1, bytes)?
        }
        ValueKind::Wide => TypedValue::new(ElemType::Epoch16, 1, exact_blob(v, 16)?)?,
    };
    Ok(tv)
}

/// Renders an entry's value column: scalars and text read as themselves,
/// every other shape reads as a blob sized by width x count.
pub(crate) fn entry_value(tv: &TypedValue) -> Value {
    let rel = tv.elem_type().rel_type();
    match rel {
        RelType::Text => Value::Text(text_from_bytes(tv.bytes())),
        RelType::Integer if tv.count() == 1 => {
            Value::Integer(decode_int(tv.elem_type(), tv.bytes()))
        }
        RelType::Real if tv.count() == 1 => Value::Real(decode_f64(tv.bytes())),
        RelType::Integer | RelType::Real | RelType::Blob => Value::Blob(tv.bytes().to_vec()),
    }
}
