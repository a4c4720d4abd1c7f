//! Codec utility functions

use crate::Error;
use bytes::Buf;

/// Checks that the buffer has at least `len` bytes remaining. Returns an error if not.
#[inline]
pub fn at_least<B: Buf>(buf: &mut B, len: usize) -> Result<(), Error> {
    let remaining = buf.remaining();
    if remaining < len {
        return Err(Error::BufferBounds {
            needed: len,
            remaining,
        });
    }
    Ok(())
}
