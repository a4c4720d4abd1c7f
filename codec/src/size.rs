//! Encoded length of layouts and values.

use crate::{
    layout::{ArrayLength, Field, Item, Layout, Span},
    serialize::{array_elements, missing, raw_bytes},
    Error, ResultExt, Value,
};

/// Returns the encoded length of every value of `layout`.
///
/// Fails with [Error::SizeIndeterminate] if the length depends on data.
pub fn static_size(layout: &Layout) -> Result<usize, Error> {
    layout.validate()?;
    static_layout(layout)
}

/// Returns the encoded length of `data` under `layout`.
pub fn size(layout: &Layout, data: &Value) -> Result<usize, Error> {
    layout.validate()?;
    size_layout(layout, data)
}

pub(crate) fn static_layout(layout: &Layout) -> Result<usize, Error> {
    match layout {
        Layout::Item(item) => static_item(item),
        Layout::Fields(fields) => static_fields(fields),
    }
}

fn static_fields(fields: &[Field]) -> Result<usize, Error> {
    fields.iter().try_fold(0, |total, field| {
        let size = static_item(&field.item).field(&field.name)?;
        usize::checked_add(total, size)
            .ok_or_else(|| Error::SizeIndeterminate("length overflows".into()))
    })
}

fn static_item(item: &Item) -> Result<usize, Error> {
    match item {
        Item::Int(item) => Ok(item.size),
        Item::Bytes(item) => match (item.custom.constant(), item.span) {
            (Some(value), _) => Ok(value.len()),
            (None, Span::Size(size)) => Ok(size),
            (None, Span::Prefixed { .. }) => {
                Err(Error::SizeIndeterminate("prefixed bytes".into()))
            }
            (None, Span::Remainder) => Err(Error::SizeIndeterminate("remainder bytes".into())),
        },
        Item::Array(item) => match item.length {
            ArrayLength::Fixed(len) => len
                .checked_mul(static_layout(&item.layout)?)
                .ok_or_else(|| Error::SizeIndeterminate("array length overflows".into())),
            ArrayLength::Prefixed { .. } => {
                Err(Error::SizeIndeterminate("prefixed array".into()))
            }
            ArrayLength::Remainder => Err(Error::SizeIndeterminate("remainder array".into())),
        },
        Item::Object(item) => static_fields(&item.fields),
        Item::Switch(item) => {
            let mut sizes = item
                .cases
                .iter()
                .map(|case| static_fields(&case.fields).field(&case.tag_name()));
            let first = sizes.next().transpose()?.unwrap_or(0);
            for size in sizes {
                if size? != first {
                    return Err(Error::SizeIndeterminate("switch".into()));
                }
            }
            Ok(item.id_size + first)
        }
    }
}

fn size_layout(layout: &Layout, data: &Value) -> Result<usize, Error> {
    match layout {
        Layout::Item(item) => size_item(item, Some(data)),
        Layout::Fields(fields) => size_fields(fields, data),
    }
}

fn size_fields(fields: &[Field], data: &Value) -> Result<usize, Error> {
    let object = data
        .as_object()
        .ok_or_else(|| Error::ValueMismatch(format!("expected object, got {}", data.kind())))?;
    fields.iter().try_fold(0, |total, field| {
        let value = if field.omit {
            None
        } else {
            Some(object.get(&field.name).ok_or_else(missing).field(&field.name)?)
        };
        Ok::<_, Error>(total + size_item(&field.item, value).field(&field.name)?)
    })
}

fn size_item(item: &Item, value: Option<&Value>) -> Result<usize, Error> {
    match item {
        Item::Int(item) => Ok(item.size),
        Item::Bytes(item) => {
            let prefix = match item.span {
                Span::Prefixed { length_size, .. } => length_size,
                Span::Size(_) | Span::Remainder => 0,
            };
            let len = match item.custom.constant() {
                Some(constant) => constant.len(),
                None => raw_bytes(item, value)?.len(),
            };
            Ok(prefix + len)
        }
        Item::Array(item) => {
            let elements = array_elements(item, value)?;
            let prefix = match item.length {
                ArrayLength::Prefixed { length_size, .. } => length_size,
                ArrayLength::Fixed(_) | ArrayLength::Remainder => 0,
            };
            elements
                .iter()
                .enumerate()
                .try_fold(prefix, |total, (i, element)| {
                    let len = size_layout(&item.layout, element).field(&i.to_string())?;
                    Ok::<_, Error>(total + len)
                })
        }
        Item::Object(item) => size_fields(&item.fields, value.ok_or_else(missing)?),
        Item::Switch(item) => {
            let value = value.ok_or_else(missing)?;
            let case = item.case_for(value)?;
            Ok(item.id_size + size_fields(&case.fields, value)?)
        }
    }
}
