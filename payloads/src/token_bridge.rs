//! Token bridge payloads, identified by a leading payload id.

use binlayout_codec::{Error as CodecError, Field, FnConversion, Item, Layout, Value};
use binlayout_utils::left_pad;
use bytes::Bytes;

/// Size of token names and symbols.
pub const NAME_SIZE: usize = 32;

fn payload_id(id: u8, name: &str) -> Field {
    Field::new("payload_id", Item::uint(1).fixed_conversion(name, id))
}

/// A string stored left-padded with zeroes in a fixed-size field.
fn padded_string() -> Item {
    Item::bytes(NAME_SIZE).bytes_conversion(FnConversion::new(
        |raw: Bytes| -> Result<Value, CodecError> {
            let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
            let s = std::str::from_utf8(&raw[start..])
                .map_err(|_| CodecError::ValueMismatch("invalid utf-8 string".into()))?;
            Ok(Value::Str(s.to_string()))
        },
        |value: &Value| -> Result<Bytes, CodecError> {
            let s = value.as_str().ok_or_else(|| {
                CodecError::ValueMismatch(format!("expected string, got {}", value.kind()))
            })?;
            left_pad(s.as_bytes(), NAME_SIZE)
                .map(Bytes::from)
                .ok_or_else(|| CodecError::EncodingRange(format!("{s} exceeds {NAME_SIZE} bytes")))
        },
    ))
}

fn transfer_fields(id: u8, name: &str) -> Vec<Field> {
    vec![
        payload_id(id, name),
        Field::new("amount", Item::uint(32)),
        Field::new("token_address", Item::bytes(32)),
        Field::new("token_chain", Item::uint(2)),
        Field::new("to_address", Item::bytes(32)),
        Field::new("to_chain", Item::uint(2)),
    ]
}

/// Transfer of tokens to an address on another chain.
pub fn transfer() -> Layout {
    let mut fields = transfer_fields(1, "Transfer");
    fields.push(Field::new("fee", Item::uint(32)));
    Layout::Fields(fields)
}

/// Metadata of a token, attested before it can be bridged.
pub fn attest_meta() -> Layout {
    Layout::fields([
        payload_id(2, "AttestMeta"),
        Field::new("token_address", Item::bytes(32)),
        Field::new("token_chain", Item::uint(2)),
        Field::new("decimals", Item::uint(1)),
        Field::new("symbol", padded_string()),
        Field::new("name", padded_string()),
    ])
}

/// Transfer of tokens carrying an arbitrary payload for the recipient.
pub fn transfer_with_payload() -> Layout {
    let mut fields = transfer_fields(3, "TransferWithPayload");
    fields.push(Field::new("from_address", Item::bytes(32)));
    fields.push(Field::new("payload", Item::remainder_bytes()));
    Layout::Fields(fields)
}
