//! Signed message envelope.
//!
//! An envelope is a header (version, guardian set index and signatures) followed by the body
//! the guardians sign. The body ends with a payload that runs to the end of the message.

use crate::{Error, Payload};
use binlayout_codec::{deserialize, deserialize_at, serialize, Field, Item, Layout, Value};
use bytes::Bytes;

/// Envelope version.
pub const VERSION: u8 = 1;

/// Size of a recoverable signature.
pub const SIGNATURE_SIZE: usize = 65;

/// Size of an emitter address.
pub const ADDRESS_SIZE: usize = 32;

/// Layout of one guardian signature.
pub fn signature() -> Layout {
    Layout::fields([
        Field::new("guardian_index", Item::uint(1)),
        Field::new("signature", Item::bytes(SIGNATURE_SIZE)),
    ])
}

/// Layout of the unsigned header.
pub fn header() -> Layout {
    Layout::fields(header_fields())
}

/// Layout of the signed body.
pub fn body() -> Layout {
    Layout::fields(body_fields())
}

/// Layout of a complete envelope.
pub fn envelope() -> Layout {
    let mut fields = header_fields();
    fields.extend(body_fields());
    Layout::Fields(fields)
}

fn header_fields() -> Vec<Field> {
    vec![
        Field::omitted("version", Item::uint(1).fixed(VERSION)),
        Field::new("guardian_set_index", Item::uint(4)),
        Field::new("signatures", Item::prefixed_array(1, signature())),
    ]
}

fn body_fields() -> Vec<Field> {
    vec![
        Field::new("timestamp", Item::uint(4)),
        Field::new("nonce", Item::uint(4)),
        Field::new("emitter_chain", Item::uint(2)),
        Field::new("emitter_address", Item::bytes(ADDRESS_SIZE)),
        Field::new("sequence", Item::uint(8)),
        Field::new("consistency_level", Item::uint(1)),
        Field::new("payload", Item::remainder_bytes()),
    ]
}

/// A guardian's signature over the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub guardian_index: u8,
    pub signature: Bytes,
}

/// A decoded envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vaa {
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: Bytes,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Bytes,
}

fn get<'a>(value: &'a Value, name: &'static str) -> Result<&'a Value, Error> {
    value.get(name).ok_or(Error::InvalidField(name))
}

fn int<T: TryFrom<u64>>(value: &Value, name: &'static str) -> Result<T, Error> {
    get(value, name)?
        .as_u64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or(Error::InvalidField(name))
}

fn bytes(value: &Value, name: &'static str) -> Result<Bytes, Error> {
    get(value, name)?
        .as_bytes()
        .cloned()
        .ok_or(Error::InvalidField(name))
}

impl Vaa {
    /// Decodes an envelope, leaving the payload undecoded.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let (header_value, offset) = deserialize_at(&header(), bytes, 0)?;
        let body_value = deserialize(&body(), &bytes[offset..])?;

        let signatures = get(&header_value, "signatures")?
            .as_array()
            .ok_or(Error::InvalidField("signatures"))?
            .iter()
            .map(|s| -> Result<Signature, Error> {
                Ok(Signature {
                    guardian_index: int(s, "guardian_index")?,
                    signature: self::bytes(s, "signature")?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self {
            guardian_set_index: int(&header_value, "guardian_set_index")?,
            signatures,
            timestamp: int(&body_value, "timestamp")?,
            nonce: int(&body_value, "nonce")?,
            emitter_chain: int(&body_value, "emitter_chain")?,
            emitter_address: self::bytes(&body_value, "emitter_address")?,
            sequence: int(&body_value, "sequence")?,
            consistency_level: int(&body_value, "consistency_level")?,
            payload: self::bytes(&body_value, "payload")?,
        })
    }

    fn header_value(&self) -> Value {
        let signatures: Vec<Value> = self
            .signatures
            .iter()
            .map(|s| {
                Value::object()
                    .with("guardian_index", s.guardian_index)
                    .with("signature", s.signature.clone())
            })
            .collect();
        Value::object()
            .with("guardian_set_index", self.guardian_set_index)
            .with("signatures", signatures)
    }

    fn body_value(&self) -> Value {
        Value::object()
            .with("timestamp", self.timestamp)
            .with("nonce", self.nonce)
            .with("emitter_chain", self.emitter_chain)
            .with("emitter_address", self.emitter_address.clone())
            .with("sequence", self.sequence)
            .with("consistency_level", self.consistency_level)
            .with("payload", self.payload.clone())
    }

    /// Returns the signed portion of the envelope. Hashing is left to the caller.
    pub fn digest_body(&self) -> Result<Bytes, Error> {
        Ok(serialize(&body(), &self.body_value())?.freeze())
    }

    /// Encodes the envelope.
    pub fn encode(&self) -> Result<Bytes, Error> {
        let mut value = self.header_value();
        if let (Value::Object(fields), Value::Object(body)) = (&mut value, self.body_value()) {
            fields.extend(body);
        }
        Ok(serialize(&envelope(), &value)?.freeze())
    }

    /// Classifies and decodes the payload.
    pub fn parse_payload(&self) -> Result<Payload, Error> {
        Payload::parse(&self.payload)
    }
}
