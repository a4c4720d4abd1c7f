//! Split layouts into their schema-determined and data-dependent parts.
//!
//! The *fixed* partition of a layout holds every item whose value is a schema constant, the
//! *dynamic* partition everything a caller has to supply. Switches appear in both partitions
//! since their id is always data. [add_fixed_values] reverses the split by merging caller data
//! with the constants.

use crate::{
    layout::{ArrayItem, ArrayLength, Case, Field, Item, Layout, ObjectItem, SwitchItem},
    serialize::missing,
    Error, Object, ResultExt, Value,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Partition {
    Fixed,
    Dynamic,
}

/// Returns the layout restricted to its schema constants.
pub fn fixed_items_of(layout: &Layout) -> Layout {
    partition_layout(layout, Partition::Fixed)
}

/// Returns the layout restricted to its data-dependent items.
pub fn dynamic_items_of(layout: &Layout) -> Layout {
    partition_layout(layout, Partition::Dynamic)
}

fn is_empty(layout: &Layout) -> bool {
    matches!(layout, Layout::Fields(fields) if fields.is_empty())
}

fn partition_layout(layout: &Layout, partition: Partition) -> Layout {
    match layout {
        Layout::Item(item) => match partition_item(item, partition) {
            Some(item) => Layout::Item(item),
            None => Layout::Fields(Vec::new()),
        },
        Layout::Fields(fields) => Layout::Fields(partition_fields(fields, partition)),
    }
}

fn partition_fields(fields: &[Field], partition: Partition) -> Vec<Field> {
    fields
        .iter()
        .filter(|field| !(field.omit && partition == Partition::Dynamic))
        .filter_map(|field| {
            partition_item(&field.item, partition).map(|item| Field {
                name: field.name.clone(),
                item,
                omit: field.omit,
            })
        })
        .collect()
}

fn partition_item(item: &Item, partition: Partition) -> Option<Item> {
    match item {
        Item::Int(_) | Item::Bytes(_) => {
            let keep = match partition {
                Partition::Fixed => item.is_fixed(),
                Partition::Dynamic => !item.is_fixed(),
            };
            keep.then(|| item.clone())
        }
        Item::Array(array) => {
            let layout = partition_layout(&array.layout, partition);
            (!is_empty(&layout)).then(|| {
                Item::Array(ArrayItem {
                    length: array.length,
                    layout: Box::new(layout),
                })
            })
        }
        Item::Object(object) => {
            let fields = partition_fields(&object.fields, partition);
            (!fields.is_empty()).then_some(Item::Object(ObjectItem { fields }))
        }
        Item::Switch(switch) => {
            let decomposed: Vec<Case> = switch
                .cases
                .iter()
                .map(|case| Case {
                    id: case.id,
                    label: case.label.clone(),
                    fields: partition_fields(&case.fields, partition),
                })
                .collect();
            let mut cases: Vec<Case> = decomposed
                .iter()
                .filter(|case| !case.fields.is_empty())
                .cloned()
                .collect();
            if cases.is_empty() {
                cases = decomposed;
            }
            Some(Item::Switch(SwitchItem {
                cases,
                ..switch.clone()
            }))
        }
    }
}

/// Reconstructs a complete value from the dynamic part of it and the constants of `layout`.
pub fn add_fixed_values(layout: &Layout, dynamic: &Value) -> Result<Value, Error> {
    layout.validate()?;
    add_layout(layout, Some(dynamic))
}

/// Returns the constants of a layout whose fixed partition needs no data (no switches and no
/// arrays of data-dependent length).
pub fn fixed_values_of(layout: &Layout) -> Result<Value, Error> {
    layout.validate()?;
    let fixed = fixed_items_of(layout);
    match fixed {
        Layout::Item(_) => add_layout(&fixed, None),
        Layout::Fields(_) => add_layout(&fixed, Some(&Value::object())),
    }
}

fn add_layout(layout: &Layout, value: Option<&Value>) -> Result<Value, Error> {
    match layout {
        Layout::Item(item) => add_item(item, value),
        Layout::Fields(fields) => add_fields(fields, value),
    }
}

fn add_fields(fields: &[Field], value: Option<&Value>) -> Result<Value, Error> {
    let mut object = match value {
        Some(Value::Object(object)) => object.clone(),
        Some(other) => {
            return Err(Error::ValueMismatch(format!(
                "expected object, got {}",
                other.kind()
            )))
        }
        None => Object::new(),
    };
    for field in fields.iter().filter(|field| !field.omit) {
        let value = add_item(&field.item, object.get(&field.name)).field(&field.name)?;
        object.insert(field.name.clone(), value);
    }
    Ok(Value::Object(object))
}

fn add_item(item: &Item, value: Option<&Value>) -> Result<Value, Error> {
    match item {
        Item::Int(int) => match int.custom.fixed_value() {
            Some(fixed) => Ok(fixed),
            None => value.cloned().ok_or_else(missing),
        },
        Item::Bytes(bytes) => match bytes.custom.fixed_value() {
            Some(fixed) => Ok(fixed),
            None => value.cloned().ok_or_else(missing),
        },
        Item::Array(array) => match (value, array.length) {
            (Some(value), _) => {
                let elements = value.as_array().ok_or_else(|| {
                    Error::ValueMismatch(format!("expected array, got {}", value.kind()))
                })?;
                let elements = elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| {
                        add_layout(&array.layout, Some(element)).field(&i.to_string())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(elements))
            }
            (None, ArrayLength::Fixed(len)) => {
                let element = add_layout(&array.layout, None)?;
                Ok(Value::Array(vec![element; len]))
            }
            (None, _) => Err(missing()),
        },
        Item::Object(object) => add_fields(&object.fields, value),
        Item::Switch(switch) => {
            let value = value.ok_or_else(missing)?;
            let case = switch.case_for(value)?;
            add_fields(&case.fields, Some(value))
        }
    }
}
