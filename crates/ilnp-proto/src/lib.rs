//! This crate (ILNP sensor overlay project module) implements serialization and deserialization
//! APIs for the wire formats used by the overlay's routing and control plane: the 40-byte ILNP
//! packet header, the transport/control wrapper carried in its payload, and the six control
//! message subtypes (HELLO, LOCATOR_RREQ, LOCATOR_RREP, LOCATOR_RERR, LSDB, EXPIRED_LINKS).
//!
//! All multi-byte integers are big-endian. Locator and identifier fields are raw 64-bit values
//! with no address-family interpretation — this crate never looks inside them.
//!
//! ## Layout
//! | Module       | Contents                                               |
//! |--------------|---------------------------------------------------------|
//! | [`header`]   | `IlnpHeader`, the fixed 40-byte packet header            |
//! | [`transport`]| the 4-byte transport wrapper distinguishing data/control |
//! | [`control`]  | the 4-byte control header and the six control bodies     |
//! | [`packet`]   | `IlnpPacket`, tying header + opaque payload together      |

#![no_std]
extern crate alloc;

pub mod control;
pub mod header;
pub mod packet;
pub mod transport;

use alloc::vec::Vec;
use nom::IResult;
use thiserror::Error;

pub use header::IlnpHeader;
pub use packet::IlnpPacket;
pub use transport::{
    PayloadKind,
    TransportHeader,
    TransportMessage,
};

/// Implemented by every wire-format value type in this crate: a bijective `nom` parser paired
/// with its serializer. Mirrors the tagged-union-of-parsers idiom used throughout this codec —
/// one `unpack`/`pack` pair per variant, never a generic reflection-based encoder.
pub trait IlnpElement {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self>
    where
        Self: Sized;
    fn pack(&self) -> Vec<u8>;
}

#[derive(Debug, Eq, PartialEq, Error)]
pub enum CodecError {
    #[error("packet shorter than the 40-byte ILNP header")]
    TooShort,
    #[error("unsupported ILNP version {0} (only version 6 is understood)")]
    UnsupportedVersion(u8),
    #[error("declared payload length {declared} exceeds available buffer of {available} bytes")]
    TruncatedPayload { declared: usize, available: usize },
    #[error("malformed control or transport body")]
    MalformedBody,
}
