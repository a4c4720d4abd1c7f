//! Schema-only evidence about the encodings of a layout.

use crate::{
    layout::{ArrayLength, Field, Item, Layout, Span},
    num, Error,
};
use num_bigint::BigInt;
use std::collections::BTreeMap;

/// Bytes known to appear at an offset of every encoding.
pub type FixedBytes = Vec<(usize, Vec<u8>)>;

/// Inclusive range of encoded lengths. An `upper` of `None` is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub lower: usize,
    pub upper: Option<usize>,
}

impl Bounds {
    pub fn exact(size: usize) -> Self {
        Self {
            lower: size,
            upper: Some(size),
        }
    }

    pub fn unbounded(lower: usize) -> Self {
        Self { lower, upper: None }
    }

    pub fn is_exact(&self) -> bool {
        self.upper == Some(self.lower)
    }

    pub fn contains(&self, size: usize) -> bool {
        self.lower <= size && self.upper.map_or(true, |upper| size <= upper)
    }

    /// Bounds of two consecutive items. An upper bound past `usize::MAX` becomes unbounded.
    fn add(self, other: Bounds) -> Result<Bounds, Error> {
        let lower = self
            .lower
            .checked_add(other.lower)
            .ok_or_else(|| Error::Schema("minimum length overflows".into()))?;
        Ok(Bounds {
            lower,
            upper: self
                .upper
                .zip(other.upper)
                .and_then(|(a, b)| a.checked_add(b)),
        })
    }
}

/// Returns the length bounds of `layout`, appending the bytes every encoding carries at a known
/// offset to `fixed`.
///
/// `offset` is the position of the layout in the encoding, or `None` once it depends on data.
pub fn layout_meta(
    layout: &Layout,
    offset: Option<usize>,
    fixed: &mut FixedBytes,
) -> Result<Bounds, Error> {
    match layout {
        Layout::Item(item) => item_meta(item, offset, fixed),
        Layout::Fields(fields) => fields_meta(fields, offset, fixed),
    }
}

fn fields_meta(
    fields: &[Field],
    mut offset: Option<usize>,
    fixed: &mut FixedBytes,
) -> Result<Bounds, Error> {
    let mut bounds = Bounds::exact(0);
    for field in fields {
        let item = item_meta(&field.item, offset, fixed)?;
        bounds = bounds.add(item)?;
        offset = match item.is_exact() {
            true => offset.and_then(|offset| offset.checked_add(item.lower)),
            false => None,
        };
    }
    Ok(bounds)
}

fn known(bytes: Vec<u8>, offset: Option<usize>, fixed: &mut FixedBytes) -> Bounds {
    let size = bytes.len();
    if let Some(offset) = offset {
        fixed.push((offset, bytes));
    }
    Bounds::exact(size)
}

fn item_meta(item: &Item, offset: Option<usize>, fixed: &mut FixedBytes) -> Result<Bounds, Error> {
    match item {
        Item::Int(int) => match int.custom.constant() {
            Some(value) => {
                let bytes = num::encode(value, int.size, int.endianness, int.signed)?;
                Ok(known(bytes, offset, fixed))
            }
            None => Ok(Bounds::exact(int.size)),
        },
        Item::Bytes(bytes) => match (bytes.custom.constant(), bytes.span) {
            (Some(value), _) => Ok(known(value.to_vec(), offset, fixed)),
            (None, Span::Size(size)) => Ok(Bounds::exact(size)),
            (None, Span::Prefixed { length_size, .. }) => Ok(Bounds::unbounded(length_size)),
            (None, Span::Remainder) => Ok(Bounds::unbounded(0)),
        },
        Item::Array(array) => match array.length {
            ArrayLength::Fixed(0) => Ok(Bounds::exact(0)),
            ArrayLength::Fixed(len) => {
                let mut local = FixedBytes::new();
                let element = layout_meta(&array.layout, Some(0), &mut local)?;
                let lower = len
                    .checked_mul(element.lower)
                    .ok_or_else(|| Error::Schema("minimum length overflows".into()))?;
                if let Some(offset) = offset.filter(|_| !local.is_empty()) {
                    // Element offsets are only known when every element has the same size
                    let repeat = if element.is_exact() { len } else { 1 };
                    for i in 0..repeat {
                        for (o, bytes) in &local {
                            if let Some(pos) = offset.checked_add(i * element.lower + o) {
                                fixed.push((pos, bytes.clone()));
                            }
                        }
                    }
                }
                Ok(Bounds {
                    lower,
                    upper: element.upper.and_then(|upper| len.checked_mul(upper)),
                })
            }
            ArrayLength::Prefixed { length_size, .. } => Ok(Bounds::unbounded(length_size)),
            ArrayLength::Remainder => Ok(Bounds::unbounded(0)),
        },
        Item::Object(object) => fields_meta(&object.fields, offset, fixed),
        Item::Switch(switch) => {
            let mut cases = Vec::with_capacity(switch.cases.len());
            let mut lower = usize::MAX;
            let mut upper = Some(0);
            for case in &switch.cases {
                let mut case_fixed = FixedBytes::new();
                if offset.is_some() {
                    let id = num::encode(
                        &BigInt::from(case.id),
                        switch.id_size,
                        switch.id_endianness,
                        false,
                    )?;
                    case_fixed.push((0, id));
                }
                let case_offset = offset.map(|_| switch.id_size);
                let bounds = fields_meta(&case.fields, case_offset, &mut case_fixed)?;
                lower = lower.min(bounds.lower.saturating_add(switch.id_size));
                upper = upper
                    .zip(bounds.upper)
                    .and_then(|(a, b)| Some(a.max(b.checked_add(switch.id_size)?)));
                cases.push(case_fixed);
            }
            if let Some(offset) = offset {
                for (pos, byte) in common_bytes(&cases) {
                    if let Some(pos) = offset.checked_add(pos) {
                        fixed.push((pos, vec![byte]));
                    }
                }
            }
            Ok(Bounds { lower, upper })
        }
    }
}

/// Returns the positions at which every case carries the same fixed byte.
fn common_bytes(cases: &[FixedBytes]) -> BTreeMap<usize, u8> {
    let by_position = |fixed: &FixedBytes| {
        fixed
            .iter()
            .flat_map(|(offset, bytes)| {
                bytes
                    .iter()
                    .enumerate()
                    .map(move |(i, byte)| (offset + i, *byte))
            })
            .collect::<BTreeMap<_, _>>()
    };
    let mut cases = cases.iter();
    let Some(first) = cases.next() else {
        return BTreeMap::new();
    };
    let mut common = by_position(first);
    for case in cases {
        let case = by_position(case);
        common.retain(|pos, byte| case.get(pos) == Some(&*byte));
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Case;

    fn meta(layout: Layout) -> (Bounds, FixedBytes) {
        let mut fixed = FixedBytes::new();
        let bounds = layout_meta(&layout, Some(0), &mut fixed).unwrap();
        (bounds, fixed)
    }

    #[test]
    fn test_bounds() {
        let (bounds, fixed) = meta(Layout::fields([
            Field::new("a", Item::uint(2)),
            Field::new("b", Item::prefixed_bytes(2)),
            Field::new("c", Item::uint(1).fixed(7)),
        ]));
        assert_eq!(bounds, Bounds::unbounded(5));
        // "c" follows a variable-length item
        assert!(fixed.is_empty());
        assert!(bounds.contains(100));
        assert!(!bounds.contains(4));
    }

    #[test]
    fn test_constants() {
        let (bounds, fixed) = meta(Layout::fields([
            Field::new("magic", Item::fixed_bytes(&b"AB"[..])),
            Field::new("n", Item::uint(4)),
            Field::new("v", Item::uint(2).little_endian().fixed(0x0102)),
        ]));
        assert_eq!(bounds, Bounds::exact(8));
        assert_eq!(fixed, vec![(0, b"AB".to_vec()), (6, vec![0x02, 0x01])]);
    }

    #[test]
    fn test_fixed_array() {
        let element = Layout::fields([
            Field::new("tag", Item::uint(1).fixed(9)),
            Field::new("x", Item::uint(1)),
        ]);
        let (bounds, fixed) = meta(Layout::Item(Item::array(3, element)));
        assert_eq!(bounds, Bounds::exact(6));
        assert_eq!(fixed, vec![(0, vec![9]), (2, vec![9]), (4, vec![9])]);

        let (bounds, _) = meta(Layout::Item(Item::array(0, Item::prefixed_bytes(1))));
        assert_eq!(bounds, Bounds::exact(0));
    }

    #[test]
    fn test_length_overflow() {
        let mut fixed = FixedBytes::new();
        let layout = Layout::Item(Item::array(usize::MAX, Item::uint(2)));
        assert!(matches!(
            layout_meta(&layout, Some(0), &mut fixed),
            Err(Error::Schema(_))
        ));
        let layout = Layout::fields([
            Field::new("a", Item::array(usize::MAX, Item::uint(1))),
            Field::new("b", Item::uint(1)),
        ]);
        assert!(matches!(
            layout_meta(&layout, Some(0), &mut fixed),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_variable_array_element() {
        let element = Layout::fields([
            Field::new("tag", Item::uint(1).fixed(9)),
            Field::new("x", Item::prefixed_bytes(1)),
        ]);
        let (bounds, fixed) = meta(Layout::Item(Item::array(2, element)));
        assert_eq!(bounds, Bounds::unbounded(4));
        assert_eq!(fixed, vec![(0, vec![9])]);
    }

    #[test]
    fn test_switch() {
        let (bounds, fixed) = meta(Layout::fields([
            Field::new("head", Item::uint(1).fixed(0xEE)),
            Field::new(
                "body",
                Item::switch(
                    2,
                    [
                        Case::new(
                            0x0101,
                            [
                                Field::new("a", Item::uint(1).fixed(5)),
                                Field::new("b", Item::uint(1)),
                            ],
                        ),
                        Case::new(
                            0x0102,
                            [
                                Field::new("a", Item::uint(1).fixed(5)),
                                Field::new("c", Item::uint(3)),
                            ],
                        ),
                    ],
                ),
            ),
        ]));
        assert_eq!(
            bounds,
            Bounds {
                lower: 5,
                upper: Some(7)
            }
        );
        // Shared id byte and the shared constant, but not the differing id byte
        assert_eq!(fixed, vec![(0, vec![0xEE]), (1, vec![0x01]), (3, vec![5])]);
    }

    #[test]
    fn test_switch_at_unknown_offset() {
        let mut fixed = FixedBytes::new();
        let layout = Layout::Item(Item::switch(1, [Case::new(1, []), Case::new(2, [])]));
        let bounds = layout_meta(&layout, None, &mut fixed).unwrap();
        assert_eq!(bounds, Bounds::exact(1));
        assert!(fixed.is_empty());
    }
}
