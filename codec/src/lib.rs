//! Encode and decode values described by binary layouts.
//!
//! # Overview
//!
//! A schema-driven binary codec designed to:
//! - Serialize dynamic values into canonical bytes according to a [Layout]
//! - Deserialize untrusted bytes back into values, enforcing every schema constant
//! - Compute encoded sizes, with or without data
//! - Split a layout into its constant and data-dependent parts
//! - Classify untagged bytes against a set of candidate layouts ([Discriminator])
//!
//! # Supported Items
//!
//! - Integers: any width, signed (two's complement) or unsigned, big- or little-endian
//! - Bytes: of a declared size, length-prefixed, or running to the end of the buffer
//! - Arrays: of a fixed length, count-prefixed, or running to the end of the buffer
//! - Objects: nested field lists
//! - Switches: tagged unions selected by a leading integer id
//!
//! Integer and bytes items may carry a schema constant or a [Conversion] between their raw and
//! data-facing values.
//!
//! # Example
//!
//! ```
//! use binlayout_codec::{deserialize, serialize, size, Case, Field, Item, Layout, Value};
//!
//! let layout = Layout::fields([
//!     Field::omitted("version", Item::uint(1).fixed(1)),
//!     Field::new("sequence", Item::uint(8)),
//!     Field::new(
//!         "action",
//!         Item::switch(
//!             1,
//!             [
//!                 Case::new(1, [Field::new("amount", Item::uint(32))]).labeled("Transfer"),
//!                 Case::new(2, [Field::new("note", Item::prefixed_bytes(2))]).labeled("Note"),
//!             ],
//!         ),
//!     ),
//! ]);
//!
//! let value = Value::object().with("sequence", 42u64).with(
//!     "action",
//!     Value::object().with("id", "Note").with("note", &b"hi"[..]),
//! );
//! let encoded = serialize(&layout, &value).unwrap();
//! assert_eq!(encoded.len(), size(&layout, &value).unwrap());
//! assert_eq!(&encoded[..], b"\x01\x00\x00\x00\x00\x00\x00\x00\x2a\x02\x00\x02hi");
//! assert_eq!(deserialize(&layout, &encoded).unwrap(), value);
//! ```

pub mod config;
pub mod deserialize;
pub mod discriminate;
pub mod error;
pub mod fixed;
pub mod layout;
mod num;
pub mod serialize;
pub mod size;
pub mod util;
pub mod value;

// Re-export main types and functions
pub use config::{RangeCfg, ReadCfg};
pub use deserialize::{deserialize, deserialize_at, deserialize_cfg};
pub use discriminate::{build_discriminator, Bounds, Discriminator};
pub use error::{Error, ResultExt};
pub use fixed::{add_fixed_values, dynamic_items_of, fixed_items_of, fixed_values_of};
pub use layout::{
    ArrayItem, ArrayLength, BytesItem, Case, Conversion, Custom, Endianness, Field, FnConversion,
    IntItem, Item, Layout, ObjectItem, Span, SwitchItem,
};
pub use serialize::{serialize, serialize_into, write};
pub use size::{size, static_size};
pub use value::{Object, Value};
