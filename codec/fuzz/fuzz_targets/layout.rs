#![no_main]

use arbitrary::Arbitrary;
use binlayout_codec::{
    deserialize, deserialize_at, serialize, size, Case, Discriminator, Field, Item, Layout,
};
use libfuzzer_sys::fuzz_target;

const MAX_LAYOUTS: usize = 8;
const MAX_DEPTH: usize = 3;

#[derive(Arbitrary, Debug)]
enum FuzzItem {
    Uint { size: u8, little: bool },
    Int { size: u8, little: bool },
    Fixed { size: u8, value: u64 },
    Bytes { size: u8 },
    FixedBytes(Vec<u8>),
    Prefixed { length_size: u8 },
    Array { length: u8, element: Box<FuzzItem> },
    PrefixedArray { length_size: u8, element: Box<FuzzItem> },
    Object(Vec<FuzzItem>),
    Switch { id_size: u8, cases: Vec<(u16, Vec<FuzzItem>)> },
}

#[derive(Arbitrary, Debug)]
struct FuzzLayout {
    fields: Vec<FuzzItem>,
    remainder: bool,
}

fn fields(items: &[FuzzItem], depth: usize) -> Vec<Field> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| Field::new(&format!("f{i}"), to_item(item, depth)))
        .collect()
}

fn to_item(item: &FuzzItem, depth: usize) -> Item {
    if depth >= MAX_DEPTH {
        return Item::uint(1);
    }
    let width = |size: u8| 1 + (size % 32) as usize;
    let prefix = |size: u8| 1 + (size % 2) as usize;
    match item {
        FuzzItem::Uint { size, little } | FuzzItem::Int { size, little } => {
            let item = match item {
                FuzzItem::Int { .. } => Item::int(width(*size)),
                _ => Item::uint(width(*size)),
            };
            if *little {
                item.little_endian()
            } else {
                item
            }
        }
        FuzzItem::Fixed { size, value } => Item::uint(1 + (size % 8) as usize).fixed(*value),
        FuzzItem::Bytes { size } => Item::bytes((size % 64) as usize),
        FuzzItem::FixedBytes(value) => Item::fixed_bytes(value.clone()),
        FuzzItem::Prefixed { length_size } => Item::prefixed_bytes(prefix(*length_size)),
        FuzzItem::Array { length, element } => {
            Item::array((length % 4) as usize, to_item(element, depth + 1))
        }
        FuzzItem::PrefixedArray {
            length_size,
            element,
        } => Item::prefixed_array(prefix(*length_size), to_item(element, depth + 1)),
        FuzzItem::Object(items) => Item::object(fields(items, depth + 1)),
        FuzzItem::Switch { id_size, cases } => Item::switch(
            1 + (id_size % 2) as usize,
            cases
                .iter()
                .map(|(id, items)| Case::new(*id as u64, fields(items, depth + 1))),
        ),
    }
}

fn to_layout(layout: &FuzzLayout) -> Option<Layout> {
    let mut fields = fields(&layout.fields, 0);
    if layout.remainder {
        fields.push(Field::new("rest", Item::remainder_bytes()));
    }
    let layout = Layout::Fields(fields);
    layout.validate().ok()?;
    Some(layout)
}

#[derive(Arbitrary, Debug)]
enum FuzzInput<'a> {
    Roundtrip(FuzzLayout, &'a [u8]),
    Discriminate(Vec<FuzzLayout>, &'a [u8]),
}

fn roundtrip(layout: &Layout, data: &[u8]) {
    let Ok((value, end)) = deserialize_at(layout, data, 0) else {
        return;
    };
    let encoded = serialize(layout, &value).expect("failed to serialize a decoded value");
    assert_eq!(&encoded[..], &data[..end]);
    assert_eq!(size(layout, &value).unwrap(), end);
}

fn discriminate(layouts: &[Layout], data: &[u8]) {
    let Ok(discriminator) = Discriminator::new(layouts, true) else {
        return;
    };
    let candidates = discriminator.candidates(data);
    let mut decoded = 0;
    for (i, layout) in layouts.iter().enumerate() {
        if deserialize(layout, data).is_ok() {
            assert!(
                candidates.contains(&i),
                "layout {i} decodes but was eliminated: {candidates:?}"
            );
            decoded += 1;
        }
    }
    if discriminator.is_distinguishing() {
        assert!(decoded <= 1, "{decoded} layouts decode the same bytes");
        assert!(candidates.len() <= 1, "too many candidates: {candidates:?}");
    }
}

fn fuzz(input: FuzzInput) {
    match input {
        FuzzInput::Roundtrip(layout, data) => {
            if let Some(layout) = to_layout(&layout) {
                roundtrip(&layout, data);
            }
        }
        FuzzInput::Discriminate(layouts, data) => {
            let layouts: Vec<Layout> = layouts
                .iter()
                .take(MAX_LAYOUTS)
                .filter_map(to_layout)
                .collect();
            if !layouts.is_empty() {
                discriminate(&layouts, data);
            }
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
