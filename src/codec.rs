//! Fixed-width packing helpers for action wire data.
//!
//! Every field written by [`Packer`] has a statically known width, so the size
//! of a packed action is computable without executing it.  [`Unpacker`]
//! mirrors the writer and refuses short or over-long input.

use thiserror::Error;

use crate::{Commitment, Identity, COMMITMENT_LEN, IDENTITY_LEN};

/// Width in bytes of a packed `u64`.
pub const U64_LEN: usize = 8;

/// Errors raised while decoding packed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer ended before a field could be read.
    #[error("unexpected end of input: needed {needed} bytes at offset {offset}")]
    UnexpectedEof {
        /// Offset at which the read started.
        offset: usize,
        /// Number of bytes requested.
        needed: usize,
    },
    /// Bytes were left over after the last field.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
    /// The leading type tag did not match the expected action.
    #[error("unexpected type id {found}, expected {expected}")]
    UnexpectedTypeId {
        /// Type id of the decoder.
        expected: u8,
        /// Type id found on the wire.
        found: u8,
    },
}

/// Append-only writer for fixed-width fields.
#[derive(Debug, Clone, Default)]
pub struct Packer {
    bytes: Vec<u8>,
}

impl Packer {
    /// Creates a writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Writes a single byte.
    pub fn pack_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Writes a big-endian `u64`.
    pub fn pack_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a 32-byte public identity.
    pub fn pack_identity(&mut self, identity: &Identity) {
        self.bytes.extend_from_slice(identity.as_bytes());
    }

    /// Writes a 32-byte digest.
    pub fn pack_commitment(&mut self, commitment: &Commitment) {
        self.bytes.extend_from_slice(commitment.as_bytes());
    }

    /// Returns the bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the writer and returns its buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over packed bytes.
#[derive(Debug, Clone)]
pub struct Unpacker<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Unpacker<'a> {
    /// Starts reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(needed)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(CodecError::UnexpectedEof {
                offset: self.offset,
                needed,
            })?;
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    /// Reads a single byte.
    pub fn unpack_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian `u64`.
    pub fn unpack_u64(&mut self) -> Result<u64, CodecError> {
        let mut buf = [0u8; U64_LEN];
        buf.copy_from_slice(self.take(U64_LEN)?);
        Ok(u64::from_be_bytes(buf))
    }

    /// Reads a 32-byte public identity.
    pub fn unpack_identity(&mut self) -> Result<Identity, CodecError> {
        let mut buf = [0u8; IDENTITY_LEN];
        buf.copy_from_slice(self.take(IDENTITY_LEN)?);
        Ok(Identity::from_bytes(buf))
    }

    /// Reads a 32-byte digest.
    pub fn unpack_commitment(&mut self) -> Result<Commitment, CodecError> {
        let mut buf = [0u8; COMMITMENT_LEN];
        buf.copy_from_slice(self.take(COMMITMENT_LEN)?);
        Ok(Commitment::from_bytes(buf))
    }

    /// Fails if any unread bytes remain.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.bytes.len() - self.offset {
            0 => Ok(()),
            rest => Err(CodecError::TrailingBytes(rest)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_then_unpack_fields_in_order() {
        let mut packer = Packer::with_capacity(41);
        packer.pack_u8(7);
        packer.pack_u64(0x0102_0304_0506_0708);
        packer.pack_identity(&Identity::from_bytes([9u8; 32]));
        assert_eq!(packer.bytes()[0], 7);
        let bytes = packer.into_bytes();
        assert_eq!(bytes.len(), 41);
        assert_eq!(&bytes[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut unpacker = Unpacker::new(&bytes);
        assert_eq!(unpacker.unpack_u8().unwrap(), 7);
        assert_eq!(unpacker.unpack_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(
            unpacker.unpack_identity().unwrap(),
            Identity::from_bytes([9u8; 32])
        );
        assert!(unpacker.finish().is_ok());
    }

    #[test]
    fn test_short_and_trailing_input() {
        let mut short = Unpacker::new(&[0u8; 10]);
        assert_eq!(
            short.unpack_commitment(),
            Err(CodecError::UnexpectedEof {
                offset: 0,
                needed: 32
            })
        );
        let mut long = Unpacker::new(&[0u8; 3]);
        long.unpack_u8().unwrap();
        assert_eq!(long.finish(), Err(CodecError::TrailingBytes(2)));
    }
}
