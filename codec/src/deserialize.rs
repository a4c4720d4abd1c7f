//! Decode values from untrusted bytes.

use crate::{
    layout::{ArrayLength, Custom, Endianness, Field, Item, Layout, Span},
    num,
    util::at_least,
    Error, Object, ReadCfg, ResultExt, Value,
};
use bytes::{Buf, Bytes};

/// Decodes a value from `bytes`, requiring every byte to be consumed.
pub fn deserialize(layout: &Layout, bytes: &[u8]) -> Result<Value, Error> {
    let mut buf = bytes;
    deserialize_cfg(layout, &mut buf, &ReadCfg::default())
}

/// Decodes a value from `bytes` starting at `offset`, returning it together with the offset
/// after the last byte read. Trailing bytes are allowed.
pub fn deserialize_at(
    layout: &Layout,
    bytes: &[u8],
    offset: usize,
) -> Result<(Value, usize), Error> {
    let mut buf = bytes.get(offset..).ok_or(Error::BufferBounds {
        needed: offset,
        remaining: bytes.len(),
    })?;
    let value = deserialize_cfg(layout, &mut buf, &ReadCfg::partial())?;
    Ok((value, bytes.len() - buf.remaining()))
}

/// Decodes a value from `buf`, advancing it past the bytes read.
pub fn deserialize_cfg(
    layout: &Layout,
    buf: &mut impl Buf,
    cfg: &ReadCfg,
) -> Result<Value, Error> {
    layout.validate()?;
    let value = read_layout(layout, buf, cfg)?;
    if cfg.consume_all && buf.has_remaining() {
        return Err(Error::ExtraData(buf.remaining()));
    }
    Ok(value)
}

fn read_layout(layout: &Layout, buf: &mut impl Buf, cfg: &ReadCfg) -> Result<Value, Error> {
    match layout {
        Layout::Item(item) => read_item(item, buf, cfg),
        Layout::Fields(fields) => Ok(Value::Object(read_fields(fields, buf, cfg)?)),
    }
}

fn read_fields(fields: &[Field], buf: &mut impl Buf, cfg: &ReadCfg) -> Result<Object, Error> {
    let mut object = Object::new();
    for field in fields {
        let value = read_item(&field.item, buf, cfg).field(&field.name)?;
        if !field.omit {
            object.insert(field.name.clone(), value);
        }
    }
    Ok(object)
}

/// Maps a decoded raw value through the item's customization.
fn customize<R>(custom: &Custom<R>, raw: R) -> Result<Value, Error>
where
    R: Clone + PartialEq + Into<Value>,
{
    let (expected, to) = match custom {
        Custom::None => return Ok(raw.into()),
        Custom::Conversion(conversion) => return conversion.to(raw),
        Custom::Fixed(expected) => (expected, None),
        Custom::FixedConversion { to, from } => (from, Some(to)),
    };
    if raw != *expected {
        let expected: Value = expected.clone().into();
        let raw: Value = raw.into();
        return Err(Error::ValueMismatch(format!(
            "expected {expected:?}, got {raw:?}"
        )));
    }
    Ok(to.cloned().unwrap_or_else(|| raw.into()))
}

fn read_prefix(
    buf: &mut impl Buf,
    length_size: usize,
    endianness: Endianness,
) -> Result<usize, Error> {
    at_least(buf, length_size)?;
    let prefix = buf.copy_to_bytes(length_size);
    num::decode_len(&prefix, endianness)
}

fn read_item(item: &Item, buf: &mut impl Buf, cfg: &ReadCfg) -> Result<Value, Error> {
    match item {
        Item::Int(item) => {
            at_least(buf, item.size)?;
            let raw = buf.copy_to_bytes(item.size);
            let raw = num::decode(&raw, item.endianness, item.signed);
            customize(&item.custom, raw)
        }
        Item::Bytes(item) => {
            let len = match (item.custom.constant(), item.span) {
                (Some(constant), _) => constant.len(),
                (None, Span::Size(size)) => size,
                (None, Span::Prefixed {
                    length_size,
                    endianness,
                }) => read_prefix(buf, length_size, endianness)?,
                (None, Span::Remainder) => buf.remaining(),
            };
            at_least(buf, len)?;
            let raw: Bytes = buf.copy_to_bytes(len);
            customize(&item.custom, raw)
        }
        Item::Array(item) => {
            let mut elements = Vec::new();
            match item.length {
                ArrayLength::Fixed(len) => {
                    for i in 0..len {
                        let element = read_layout(&item.layout, buf, cfg).field(&i.to_string())?;
                        elements.push(element);
                    }
                }
                ArrayLength::Prefixed {
                    length_size,
                    endianness,
                } => {
                    let len = read_prefix(buf, length_size, endianness)?;
                    if !cfg.array_len.contains(&len) {
                        return Err(Error::LengthExceeded(len));
                    }
                    elements.reserve(len.min(buf.remaining()));
                    for i in 0..len {
                        let element = read_layout(&item.layout, buf, cfg).field(&i.to_string())?;
                        elements.push(element);
                    }
                }
                ArrayLength::Remainder => {
                    while buf.has_remaining() {
                        let before = buf.remaining();
                        let element = read_layout(&item.layout, buf, cfg)
                            .field(&elements.len().to_string())?;
                        elements.push(element);
                        if buf.remaining() == before {
                            return Err(Error::Schema("array element consumed no bytes".into()));
                        }
                    }
                    if !cfg.array_len.contains(&elements.len()) {
                        return Err(Error::LengthExceeded(elements.len()));
                    }
                }
            }
            Ok(Value::Array(elements))
        }
        Item::Object(item) => Ok(Value::Object(read_fields(&item.fields, buf, cfg)?)),
        Item::Switch(item) => {
            at_least(buf, item.id_size)?;
            let raw = buf.copy_to_bytes(item.id_size);
            let id = num::decode(&raw, item.id_endianness, false);
            let id = u64::try_from(&id)
                .map_err(|_| Error::UnknownDiscriminant(id.to_string()))?;
            let case = item.case_by_id(id)?;
            let mut object = read_fields(&case.fields, buf, cfg)?;
            object.insert(item.id_tag.clone(), case.tag());
            Ok(Value::Object(object))
        }
    }
}
