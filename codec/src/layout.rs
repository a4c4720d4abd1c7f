//! The layout description language.
//!
//! A [Layout] is either a single [Item] or an ordered list of named [Field]s. Field order is wire
//! order. Layouts are plain immutable data: they are built once (usually at startup) and shared
//! freely between threads.
//!
//! # Example
//!
//! ```
//! use binlayout_codec::{deserialize, serialize, Field, Item, Layout, Value};
//!
//! let layout = Layout::fields([
//!     Field::new("tag", Item::uint(1)),
//!     Field::new("payload", Item::prefixed_bytes(2)),
//! ]);
//! let value = Value::object().with("tag", 7u8).with("payload", vec![0xAAu8, 0xBB]);
//!
//! let encoded = serialize(&layout, &value).unwrap();
//! assert_eq!(&encoded[..], &[0x07, 0x00, 0x02, 0xAA, 0xBB]);
//! assert_eq!(deserialize(&layout, &encoded).unwrap(), value);
//! ```

use crate::{Error, Value};
use bytes::Bytes;
use num_bigint::BigInt;
use std::{collections::HashSet, fmt, sync::Arc};

/// Largest width of a length prefix or switch id, in bytes.
pub const MAX_PREFIX_SIZE: usize = 8;

/// Byte order of an encoded integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

/// Bidirectional mapping between the raw value of an item and its data-facing value.
pub trait Conversion<R>: Send + Sync {
    /// Converts a decoded raw value into the value handed to callers.
    fn to(&self, raw: R) -> Result<Value, Error>;

    /// Converts a caller-supplied value into the raw value to encode.
    fn from(&self, value: &Value) -> Result<R, Error>;
}

/// [Conversion] built from a pair of closures.
pub struct FnConversion<T, F> {
    to: T,
    from: F,
}

impl<T, F> FnConversion<T, F> {
    pub fn new(to: T, from: F) -> Self {
        Self { to, from }
    }
}

impl<R, T, F> Conversion<R> for FnConversion<T, F>
where
    T: Fn(R) -> Result<Value, Error> + Send + Sync,
    F: Fn(&Value) -> Result<R, Error> + Send + Sync,
{
    fn to(&self, raw: R) -> Result<Value, Error> {
        (self.to)(raw)
    }

    fn from(&self, value: &Value) -> Result<R, Error> {
        (self.from)(value)
    }
}

/// Customization of a numeric or bytes item.
#[derive(Clone, Default)]
pub enum Custom<R> {
    /// The raw value is the data-facing value.
    #[default]
    None,
    /// Schema constant, seen by callers as itself.
    Fixed(R),
    /// Schema constant, seen by callers as `to`.
    FixedConversion { to: Value, from: R },
    /// Data-dependent value passed through a conversion.
    Conversion(Arc<dyn Conversion<R>>),
}

impl<R> Custom<R> {
    /// Returns the raw schema constant, if any.
    pub fn constant(&self) -> Option<&R> {
        match self {
            Custom::Fixed(raw) | Custom::FixedConversion { from: raw, .. } => Some(raw),
            Custom::None | Custom::Conversion(_) => None,
        }
    }

    /// Returns true if the value is fully determined by the schema.
    pub fn is_fixed(&self) -> bool {
        self.constant().is_some()
    }
}

impl<R: Clone + Into<Value>> Custom<R> {
    /// Returns the data-facing value of a schema constant.
    pub fn fixed_value(&self) -> Option<Value> {
        match self {
            Custom::Fixed(raw) => Some(raw.clone().into()),
            Custom::FixedConversion { to, .. } => Some(to.clone()),
            Custom::None | Custom::Conversion(_) => None,
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Custom<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Custom::None => f.write_str("None"),
            Custom::Fixed(raw) => f.debug_tuple("Fixed").field(raw).finish(),
            Custom::FixedConversion { to, from } => f
                .debug_struct("FixedConversion")
                .field("to", to)
                .field("from", from)
                .finish(),
            Custom::Conversion(_) => f.write_str("Conversion(..)"),
        }
    }
}

/// Signed or unsigned integer of `size` bytes.
#[derive(Clone, Debug)]
pub struct IntItem {
    pub size: usize,
    pub endianness: Endianness,
    pub signed: bool,
    pub custom: Custom<BigInt>,
}

/// How the length of a bytes item is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Span {
    /// Declared length.
    Size(usize),
    /// Length given by a preceding unsigned integer.
    Prefixed {
        length_size: usize,
        endianness: Endianness,
    },
    /// Everything up to the end of the buffer.
    Remainder,
}

/// Byte string.
///
/// A schema constant is written verbatim, without any length prefix.
#[derive(Clone, Debug)]
pub struct BytesItem {
    pub span: Span,
    pub custom: Custom<Bytes>,
}

/// How the element count of an array item is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayLength {
    /// Exactly this many elements.
    Fixed(usize),
    /// Count given by a preceding unsigned integer.
    Prefixed {
        length_size: usize,
        endianness: Endianness,
    },
    /// Elements until the buffer is exhausted.
    Remainder,
}

/// Sequence of values sharing one layout.
#[derive(Clone, Debug)]
pub struct ArrayItem {
    pub length: ArrayLength,
    pub layout: Box<Layout>,
}

/// Nested group of fields.
#[derive(Clone, Debug)]
pub struct ObjectItem {
    pub fields: Vec<Field>,
}

/// One alternative of a [SwitchItem].
#[derive(Clone, Debug)]
pub struct Case {
    pub id: u64,
    pub label: Option<String>,
    pub fields: Vec<Field>,
}

impl Case {
    pub fn new(id: u64, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            id,
            label: None,
            fields: fields.into_iter().collect(),
        }
    }

    /// Names this case; decoded values carry the label instead of the raw id.
    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Value of the tag field identifying this case.
    pub fn tag(&self) -> Value {
        match &self.label {
            Some(label) => Value::Str(label.clone()),
            None => Value::from(self.id),
        }
    }

    /// Returns true if `tag` identifies this case.
    pub fn matches(&self, tag: &Value) -> bool {
        match (tag, &self.label) {
            (Value::Str(s), Some(label)) => s == label,
            (Value::Int(_), _) => tag.as_u64() == Some(self.id),
            _ => false,
        }
    }
}

/// Tagged union selected by a leading integer id.
#[derive(Clone, Debug)]
pub struct SwitchItem {
    pub id_size: usize,
    pub id_endianness: Endianness,
    pub id_tag: String,
    pub cases: Vec<Case>,
}

impl SwitchItem {
    /// Returns the case identified by the tag field of `data`.
    pub fn case_for(&self, data: &Value) -> Result<&Case, Error> {
        let tag = data
            .get(&self.id_tag)
            .ok_or_else(|| Error::ValueMismatch(format!("missing tag field {}", self.id_tag)))?;
        self.cases
            .iter()
            .find(|case| case.matches(tag))
            .ok_or_else(|| Error::UnknownDiscriminant(format!("{tag:?}")))
    }

    /// Returns the case with the given raw id.
    pub fn case_by_id(&self, id: u64) -> Result<&Case, Error> {
        self.cases
            .iter()
            .find(|case| case.id == id)
            .ok_or_else(|| Error::UnknownDiscriminant(id.to_string()))
    }
}

/// One schema element.
#[derive(Clone, Debug)]
pub enum Item {
    Int(IntItem),
    Bytes(BytesItem),
    Array(ArrayItem),
    Object(ObjectItem),
    Switch(SwitchItem),
}

impl Item {
    /// Big-endian unsigned integer of `size` bytes.
    pub fn uint(size: usize) -> Self {
        Item::Int(IntItem {
            size,
            endianness: Endianness::Big,
            signed: false,
            custom: Custom::None,
        })
    }

    /// Big-endian two's-complement integer of `size` bytes.
    pub fn int(size: usize) -> Self {
        Item::Int(IntItem {
            size,
            endianness: Endianness::Big,
            signed: true,
            custom: Custom::None,
        })
    }

    /// Bytes of a declared length.
    pub fn bytes(size: usize) -> Self {
        Item::Bytes(BytesItem {
            span: Span::Size(size),
            custom: Custom::None,
        })
    }

    /// Constant bytes.
    pub fn fixed_bytes(value: impl Into<Bytes>) -> Self {
        let value = value.into();
        Item::Bytes(BytesItem {
            span: Span::Size(value.len()),
            custom: Custom::Fixed(value),
        })
    }

    /// Bytes preceded by a big-endian length of `length_size` bytes.
    pub fn prefixed_bytes(length_size: usize) -> Self {
        Item::Bytes(BytesItem {
            span: Span::Prefixed {
                length_size,
                endianness: Endianness::Big,
            },
            custom: Custom::None,
        })
    }

    /// Bytes up to the end of the buffer.
    pub fn remainder_bytes() -> Self {
        Item::Bytes(BytesItem {
            span: Span::Remainder,
            custom: Custom::None,
        })
    }

    /// Array of exactly `length` elements.
    pub fn array(length: usize, layout: impl Into<Layout>) -> Self {
        Item::Array(ArrayItem {
            length: ArrayLength::Fixed(length),
            layout: Box::new(layout.into()),
        })
    }

    /// Array preceded by a big-endian element count of `length_size` bytes.
    pub fn prefixed_array(length_size: usize, layout: impl Into<Layout>) -> Self {
        Item::Array(ArrayItem {
            length: ArrayLength::Prefixed {
                length_size,
                endianness: Endianness::Big,
            },
            layout: Box::new(layout.into()),
        })
    }

    /// Array running to the end of the buffer.
    pub fn remainder_array(layout: impl Into<Layout>) -> Self {
        Item::Array(ArrayItem {
            length: ArrayLength::Remainder,
            layout: Box::new(layout.into()),
        })
    }

    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Item::Object(ObjectItem {
            fields: fields.into_iter().collect(),
        })
    }

    /// Switch on a big-endian id of `id_size` bytes, tagged as `"id"`.
    pub fn switch(id_size: usize, cases: impl IntoIterator<Item = Case>) -> Self {
        Item::Switch(SwitchItem {
            id_size,
            id_endianness: Endianness::Big,
            id_tag: "id".to_string(),
            cases: cases.into_iter().collect(),
        })
    }

    /// Switches the byte order of the integer, length prefix or switch id to little-endian.
    pub fn little_endian(mut self) -> Self {
        match &mut self {
            Item::Int(item) => item.endianness = Endianness::Little,
            Item::Bytes(BytesItem {
                span: Span::Prefixed { endianness, .. },
                ..
            })
            | Item::Array(ArrayItem {
                length: ArrayLength::Prefixed { endianness, .. },
                ..
            }) => *endianness = Endianness::Little,
            Item::Switch(item) => item.id_endianness = Endianness::Little,
            _ => {}
        }
        self
    }

    /// Renames the tag field of a switch.
    pub fn id_tag(mut self, tag: &str) -> Self {
        if let Item::Switch(item) = &mut self {
            item.id_tag = tag.to_string();
        }
        self
    }

    /// Makes an integer a schema constant.
    pub fn fixed(mut self, value: impl Into<BigInt>) -> Self {
        if let Item::Int(item) = &mut self {
            item.custom = Custom::Fixed(value.into());
        }
        self
    }

    /// Makes an integer or bytes item a schema constant seen by callers as `to`.
    pub fn fixed_conversion(mut self, to: impl Into<Value>, from: impl Into<Value>) -> Self {
        let to = to.into();
        match (&mut self, from.into()) {
            (Item::Int(item), Value::Int(from)) => {
                item.custom = Custom::FixedConversion { to, from };
            }
            (Item::Bytes(item), Value::Bytes(from)) => {
                if let Span::Size(_) = item.span {
                    item.span = Span::Size(from.len());
                }
                item.custom = Custom::FixedConversion { to, from };
            }
            _ => {}
        }
        self
    }

    /// Attaches a conversion to an integer item.
    pub fn int_conversion(mut self, conversion: impl Conversion<BigInt> + 'static) -> Self {
        if let Item::Int(item) = &mut self {
            item.custom = Custom::Conversion(Arc::new(conversion));
        }
        self
    }

    /// Attaches a conversion to a bytes item.
    pub fn bytes_conversion(mut self, conversion: impl Conversion<Bytes> + 'static) -> Self {
        if let Item::Bytes(item) = &mut self {
            item.custom = Custom::Conversion(Arc::new(conversion));
        }
        self
    }

    /// Returns true if the item's encoding is fully determined by the schema.
    pub fn is_fixed(&self) -> bool {
        match self {
            Item::Int(item) => item.custom.is_fixed(),
            Item::Bytes(item) => item.custom.is_fixed(),
            Item::Array(_) | Item::Object(_) | Item::Switch(_) => false,
        }
    }
}

/// Named item of a field list.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub item: Item,
    /// Written from the schema constant and absent from values.
    pub omit: bool,
}

impl Field {
    pub fn new(name: &str, item: Item) -> Self {
        Self {
            name: name.to_string(),
            item,
            omit: false,
        }
    }

    /// Field holding a schema constant that does not appear in values.
    pub fn omitted(name: &str, item: Item) -> Self {
        Self {
            name: name.to_string(),
            item,
            omit: true,
        }
    }
}

/// Schema describing the byte encoding of a value.
#[derive(Clone, Debug)]
pub enum Layout {
    Item(Item),
    Fields(Vec<Field>),
}

impl Layout {
    pub fn fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Layout::Fields(fields.into_iter().collect())
    }

    /// Checks the structural invariants of the layout.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Layout::Item(item) => validate_item(item),
            Layout::Fields(fields) => validate_fields(fields),
        }
    }
}

impl From<Item> for Layout {
    fn from(item: Item) -> Self {
        Layout::Item(item)
    }
}

impl From<Vec<Field>> for Layout {
    fn from(fields: Vec<Field>) -> Self {
        Layout::Fields(fields)
    }
}

fn validate_prefix(size: usize, what: &str) -> Result<(), Error> {
    if size == 0 || size > MAX_PREFIX_SIZE {
        return Err(Error::Schema(format!(
            "{what} size must be within 1..={MAX_PREFIX_SIZE}, got {size}"
        )));
    }
    Ok(())
}

fn validate_fields(fields: &[Field]) -> Result<(), Error> {
    let mut names = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(Error::Schema(format!("duplicate field name {}", field.name)));
        }
        if field.omit && !field.item.is_fixed() {
            return Err(Error::Schema(format!(
                "omitted field {} has no fixed value",
                field.name
            )));
        }
        validate_item(&field.item).map_err(|err| err.in_field(&field.name))?;
    }
    Ok(())
}

fn validate_item(item: &Item) -> Result<(), Error> {
    match item {
        Item::Int(item) => {
            if item.size == 0 {
                return Err(Error::Schema("integer size must be positive".into()));
            }
            if let Some(value) = item.custom.constant() {
                crate::num::encode(value, item.size, item.endianness, item.signed)?;
            }
            Ok(())
        }
        Item::Bytes(item) => {
            match (item.span, item.custom.constant()) {
                (Span::Size(size), Some(value)) if size != value.len() => Err(Error::Schema(
                    format!("fixed value of {} bytes declared as {size}", value.len()),
                )),
                (Span::Prefixed { .. }, Some(_)) => Err(Error::Schema(
                    "fixed value cannot have a length prefix".into(),
                )),
                (Span::Prefixed { length_size, .. }, None) => {
                    validate_prefix(length_size, "length")
                }
                _ => Ok(()),
            }
        }
        Item::Array(item) => {
            if let ArrayLength::Prefixed { length_size, .. } = item.length {
                validate_prefix(length_size, "length")?;
            }
            item.layout.validate()?;
            // The element count of these arrays is only bounded by the bytes they consume
            if !matches!(item.length, ArrayLength::Fixed(_))
                && matches!(crate::size::static_layout(&item.layout), Ok(0))
            {
                return Err(Error::Schema(
                    "variable length array of zero-size elements".into(),
                ));
            }
            Ok(())
        }
        Item::Object(item) => validate_fields(&item.fields),
        Item::Switch(item) => {
            validate_prefix(item.id_size, "id")?;
            if item.cases.is_empty() {
                return Err(Error::Schema("switch without cases".into()));
            }
            let limit = u64::MAX >> (64 - 8 * item.id_size as u32);
            let mut ids = HashSet::new();
            let mut labels = HashSet::new();
            for case in &item.cases {
                if case.id > limit {
                    return Err(Error::Schema(format!(
                        "case id {} does not fit in {} bytes",
                        case.id, item.id_size
                    )));
                }
                if !ids.insert(case.id) {
                    return Err(Error::Schema(format!("duplicate case id {}", case.id)));
                }
                if let Some(label) = &case.label {
                    if !labels.insert(label.as_str()) {
                        return Err(Error::Schema(format!("duplicate case label {label}")));
                    }
                }
                if case.fields.iter().any(|field| field.name == item.id_tag) {
                    return Err(Error::Schema(format!(
                        "case field shadows tag {}",
                        item.id_tag
                    )));
                }
                validate_fields(&case.fields).map_err(|err| err.in_field(&case.tag_name()))?;
            }
            Ok(())
        }
    }
}

impl Case {
    /// Path segment naming this case in errors.
    pub(crate) fn tag_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_err(layout: Layout) -> String {
        match layout.validate().unwrap_err().root() {
            Error::Schema(msg) => msg.clone(),
            err => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn test_valid_layout() {
        let layout = Layout::fields([
            Field::omitted("magic", Item::uint(1).fixed(0x01)),
            Field::new("len_prefixed", Item::prefixed_bytes(2)),
            Field::new(
                "body",
                Item::switch(
                    1,
                    [
                        Case::new(0, [Field::new("a", Item::uint(4))]).labeled("A"),
                        Case::new(1, [Field::new("b", Item::bytes(3))]).labeled("B"),
                    ],
                ),
            ),
            Field::new("rest", Item::remainder_array(Item::uint(2).little_endian())),
        ]);
        layout.validate().unwrap();
    }

    #[test]
    fn test_duplicate_field_names() {
        let layout = Layout::fields([
            Field::new("a", Item::uint(1)),
            Field::new("a", Item::uint(2)),
        ]);
        assert_eq!(schema_err(layout), "duplicate field name a");
    }

    #[test]
    fn test_empty_switch() {
        let layout = Layout::fields([Field::new("s", Item::switch(1, []))]);
        let err = layout.validate().unwrap_err();
        assert_eq!(err.path(), Some("s"));
        assert_eq!(schema_err(layout), "switch without cases");
    }

    #[test]
    fn test_duplicate_case_ids() {
        let layout = Layout::Item(Item::switch(1, [Case::new(3, []), Case::new(3, [])]));
        assert_eq!(schema_err(layout), "duplicate case id 3");
    }

    #[test]
    fn test_case_id_overflow() {
        let layout = Layout::Item(Item::switch(1, [Case::new(256, [])]));
        assert_eq!(schema_err(layout), "case id 256 does not fit in 1 bytes");
    }

    #[test]
    fn test_omit_requires_constant() {
        let layout = Layout::fields([Field::omitted("a", Item::uint(1))]);
        assert_eq!(schema_err(layout), "omitted field a has no fixed value");
    }

    #[test]
    fn test_constant_out_of_range() {
        let layout = Layout::Item(Item::uint(1).fixed(256));
        assert!(matches!(
            layout.validate().unwrap_err(),
            Error::EncodingRange(_)
        ));
    }

    #[test]
    fn test_zero_size_elements() {
        let layout = Layout::Item(Item::prefixed_array(4, Item::bytes(0)));
        assert_eq!(
            schema_err(layout),
            "variable length array of zero-size elements"
        );
        let layout = Layout::Item(Item::remainder_array(Item::array(3, Item::bytes(0))));
        assert_eq!(
            schema_err(layout),
            "variable length array of zero-size elements"
        );
        Layout::Item(Item::array(4, Item::bytes(0))).validate().unwrap();
        Layout::Item(Item::prefixed_array(1, Item::prefixed_bytes(1)))
            .validate()
            .unwrap();
    }

    #[test]
    fn test_prefix_size() {
        let layout = Layout::Item(Item::prefixed_bytes(0));
        assert_eq!(schema_err(layout), "length size must be within 1..=8, got 0");
    }

    #[test]
    fn test_case_matching() {
        let labeled = Case::new(2, []).labeled("Two");
        assert!(labeled.matches(&Value::from("Two")));
        assert!(labeled.matches(&Value::from(2u8)));
        assert!(!labeled.matches(&Value::from("Three")));
        assert_eq!(labeled.tag(), Value::from("Two"));

        let raw = Case::new(2, []);
        assert!(raw.matches(&Value::from(2u64)));
        assert!(!raw.matches(&Value::from("2")));
        assert_eq!(raw.tag(), Value::from(2u64));
    }
}
