//! Encode values into bytes.

use crate::{
    layout::{ArrayItem, ArrayLength, BytesItem, Custom, Field, IntItem, Item, Layout, Span},
    num, size, Error, ResultExt, Value,
};
use bytes::{BufMut, Bytes, BytesMut};
use num_bigint::BigInt;

/// Encodes `data` into a freshly allocated buffer of exactly [size] bytes.
pub fn serialize(layout: &Layout, data: &Value) -> Result<BytesMut, Error> {
    let len = size(layout, data)?;
    let mut buffer = BytesMut::with_capacity(len);
    write_layout(layout, data, &mut buffer)?;
    assert_eq!(buffer.len(), len, "write() did not write expected bytes");
    Ok(buffer)
}

/// Encodes `data` into `buf` starting at `offset`, returning the offset after the last byte
/// written.
///
/// Nothing is written if the encoding does not fit.
pub fn serialize_into(
    layout: &Layout,
    data: &Value,
    buf: &mut [u8],
    offset: usize,
) -> Result<usize, Error> {
    let len = size(layout, data)?;
    let remaining = buf.len().saturating_sub(offset);
    if remaining < len {
        return Err(Error::BufferBounds {
            needed: len,
            remaining,
        });
    }
    let end = offset + len;
    let mut target = &mut buf[offset..end];
    write_layout(layout, data, &mut target)?;
    Ok(end)
}

/// Encodes `data` onto the end of `buf`.
pub fn write(layout: &Layout, data: &Value, buf: &mut impl BufMut) -> Result<(), Error> {
    layout.validate()?;
    write_layout(layout, data, buf)
}

fn write_layout(layout: &Layout, data: &Value, buf: &mut impl BufMut) -> Result<(), Error> {
    match layout {
        Layout::Item(item) => write_item(item, Some(data), buf),
        Layout::Fields(fields) => write_fields(fields, data, buf),
    }
}

fn write_fields(fields: &[Field], data: &Value, buf: &mut impl BufMut) -> Result<(), Error> {
    let object = data
        .as_object()
        .ok_or_else(|| Error::ValueMismatch(format!("expected object, got {}", data.kind())))?;
    for field in fields {
        let value = if field.omit {
            None
        } else {
            Some(object.get(&field.name).ok_or_else(missing).field(&field.name)?)
        };
        write_item(&field.item, value, buf).field(&field.name)?;
    }
    Ok(())
}

fn write_item(item: &Item, value: Option<&Value>, buf: &mut impl BufMut) -> Result<(), Error> {
    match item {
        Item::Int(item) => {
            let raw = raw_int(item, value)?;
            buf.put_slice(&num::encode(&raw, item.size, item.endianness, item.signed)?);
        }
        Item::Bytes(item) => {
            let raw = raw_bytes(item, value)?;
            if let Span::Prefixed {
                length_size,
                endianness,
            } = item.span
            {
                buf.put_slice(&num::encode_len(raw.len(), length_size, endianness)?);
            }
            buf.put_slice(&raw);
        }
        Item::Array(item) => {
            let elements = array_elements(item, value)?;
            if let ArrayLength::Prefixed {
                length_size,
                endianness,
            } = item.length
            {
                buf.put_slice(&num::encode_len(elements.len(), length_size, endianness)?);
            }
            for (i, element) in elements.iter().enumerate() {
                write_layout(&item.layout, element, buf).field(&i.to_string())?;
            }
        }
        Item::Object(item) => write_fields(&item.fields, value.ok_or_else(missing)?, buf)?,
        Item::Switch(item) => {
            let value = value.ok_or_else(missing)?;
            let case = item.case_for(value)?;
            buf.put_slice(&num::encode(
                &BigInt::from(case.id),
                item.id_size,
                item.id_endianness,
                false,
            )?);
            write_fields(&case.fields, value, buf)?;
        }
    }
    Ok(())
}

pub(crate) fn missing() -> Error {
    Error::ValueMismatch("missing value".into())
}

/// Resolves the raw value of a custom item, checking constants against `value` when present.
fn resolve<R, F>(custom: &Custom<R>, value: Option<&Value>, plain: F) -> Result<R, Error>
where
    R: Clone + Into<Value>,
    F: FnOnce(&Value) -> Result<R, Error>,
{
    let (expected, raw) = match custom {
        Custom::None => return plain(value.ok_or_else(missing)?),
        Custom::Conversion(conversion) => return conversion.from(value.ok_or_else(missing)?),
        Custom::Fixed(raw) => (raw.clone().into(), raw),
        Custom::FixedConversion { to, from } => (to.clone(), from),
    };
    if let Some(value) = value {
        if *value != expected {
            return Err(Error::ValueMismatch(format!(
                "expected {expected:?}, got {value:?}"
            )));
        }
    }
    Ok(raw.clone())
}

/// Returns the integer to encode for `item`.
pub(crate) fn raw_int(item: &IntItem, value: Option<&Value>) -> Result<BigInt, Error> {
    resolve(&item.custom, value, |value| {
        value.as_int().cloned().ok_or_else(|| {
            Error::ValueMismatch(format!("expected int, got {}", value.kind()))
        })
    })
}

/// Returns the bytes to encode for `item`, checking its declared size.
pub(crate) fn raw_bytes(item: &BytesItem, value: Option<&Value>) -> Result<Bytes, Error> {
    let raw = resolve(&item.custom, value, |value| {
        value.as_bytes().cloned().ok_or_else(|| {
            Error::ValueMismatch(format!("expected bytes, got {}", value.kind()))
        })
    })?;
    if let Span::Size(size) = item.span {
        if raw.len() != size {
            return Err(Error::ValueMismatch(format!(
                "expected {size} bytes, got {}",
                raw.len()
            )));
        }
    }
    Ok(raw)
}

/// Returns the elements of an array value, checking a fixed length.
pub(crate) fn array_elements<'a>(
    item: &ArrayItem,
    value: Option<&'a Value>,
) -> Result<&'a [Value], Error> {
    let value = value.ok_or_else(missing)?;
    let elements = value
        .as_array()
        .ok_or_else(|| Error::ValueMismatch(format!("expected array, got {}", value.kind())))?;
    if let ArrayLength::Fixed(len) = item.length {
        if elements.len() != len {
            return Err(Error::ValueMismatch(format!(
                "expected {len} elements, got {}",
                elements.len()
            )));
        }
    }
    Ok(elements)
}
