//! Fixed-width two's-complement packing of arbitrary-precision integers.

use crate::{layout::Endianness, Error};
use num_bigint::{BigInt, Sign};

/// Packs `value` into exactly `size` bytes.
pub fn encode(
    value: &BigInt,
    size: usize,
    endianness: Endianness,
    signed: bool,
) -> Result<Vec<u8>, Error> {
    if !signed && value.sign() == Sign::Minus {
        return Err(Error::EncodingRange(format!(
            "{value} is negative for an unsigned {size}-byte integer"
        )));
    }
    let minimal = if signed {
        value.to_signed_bytes_be()
    } else {
        value.to_bytes_be().1
    };
    if minimal.len() > size {
        return Err(Error::EncodingRange(format!(
            "{value} does not fit in {size} bytes"
        )));
    }
    let fill = if value.sign() == Sign::Minus { 0xff } else { 0x00 };
    let mut out = vec![fill; size - minimal.len()];
    out.extend_from_slice(&minimal);
    if endianness == Endianness::Little {
        out.reverse();
    }
    Ok(out)
}

/// Unpacks an integer from `bytes`.
pub fn decode(bytes: &[u8], endianness: Endianness, signed: bool) -> BigInt {
    let mut be = bytes.to_vec();
    if endianness == Endianness::Little {
        be.reverse();
    }
    if signed {
        BigInt::from_signed_bytes_be(&be)
    } else {
        BigInt::from_bytes_be(Sign::Plus, &be)
    }
}

/// Packs a length or count prefix.
pub fn encode_len(len: usize, size: usize, endianness: Endianness) -> Result<Vec<u8>, Error> {
    encode(&BigInt::from(len), size, endianness, false)
}

/// Unpacks a length or count prefix.
pub fn decode_len(bytes: &[u8], endianness: Endianness) -> Result<usize, Error> {
    let len = decode(bytes, endianness, false);
    usize::try_from(&len).map_err(|_| Error::EncodingRange(format!("length {len} too large")))
}
