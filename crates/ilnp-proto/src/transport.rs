//! The transport wrapper carried in an [`crate::IlnpPacket`]'s payload: a 4-byte header
//! distinguishing opaque data from a control message, and (for control) whether that control
//! message concerns only this locator's flood (HELLO/LSDB/EXPIRED_LINKS) or crosses locators
//! (LOCATOR_RREQ/LOCATOR_RREP/LOCATOR_RERR).
//!
//! Grounded on `octavius_bgp::BGPMessage`'s tagged-union `unpack`/`pack` pair, generalised from a
//! single discriminant byte to this crate's two-level wrapper that separates the transport-level
//! payload kind from the control-level subtype, unlike the flatter single-header scheme the
//! original Python prototype used.

use crate::{
    control::ControlMessage,
    CodecError,
    IlnpElement,
};
use alloc::vec::Vec;
use ilnp_common::tag_enum;
use nom::{
    bytes::complete::take,
    number::complete::{
        be_u16,
        be_u8,
    },
    IResult,
};

tag_enum! {
    /// `payload_type` values carried in the transport header.
    #[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
    pub enum PayloadKind: be_u8(u8) {
        Data = 0,
        ControlLocal = 1,
        ControlExternal = 2,
    }
}

impl PayloadKind {
    pub const fn is_control(&self) -> bool {
        matches!(self, Self::ControlLocal | Self::ControlExternal)
    }
}

/// 4-byte transport header: `payload_type`, one reserved byte, `payload_len`.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub struct TransportHeader {
    pub payload_type: PayloadKind,
    pub payload_len: u16,
}

impl TransportHeader {
    pub const SIZE: usize = 4;
}

impl IlnpElement for TransportHeader {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, payload_type) = PayloadKind::unpack(input)?;
        let (input, _reserved) = be_u8(input)?;
        let (input, payload_len) = be_u16(input)?;
        Ok((
            input,
            Self {
                payload_type,
                payload_len,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::SIZE);
        buffer.extend(self.payload_type.pack());
        buffer.push(0);
        buffer.extend_from_slice(&self.payload_len.to_be_bytes());
        buffer
    }
}

/// The transport wrapper's body: either opaque data bytes or a parsed [`ControlMessage`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TransportBody {
    Data(Vec<u8>),
    Control(ControlMessage),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TransportMessage {
    pub header: TransportHeader,
    pub body: TransportBody,
}

impl TransportMessage {
    pub fn data(payload: Vec<u8>) -> Self {
        Self {
            header: TransportHeader {
                payload_type: PayloadKind::Data,
                payload_len: payload.len() as u16,
            },
            body: TransportBody::Data(payload),
        }
    }

    pub fn control(kind: PayloadKind, message: ControlMessage) -> Self {
        debug_assert!(kind.is_control());
        Self {
            header: TransportHeader {
                payload_type: kind,
                payload_len: message.encoded_len() as u16,
            },
            body: TransportBody::Control(message),
        }
    }

    pub const fn is_control(&self) -> bool {
        self.header.payload_type.is_control()
    }

    pub fn parse(input: &[u8]) -> Result<Self, CodecError> {
        let (rest, header) = TransportHeader::unpack(input).map_err(|_| CodecError::MalformedBody)?;
        let (rest, body_bytes) = take::<_, _, nom::error::Error<&[u8]>>(header.payload_len as usize)(rest).map_err(|_| CodecError::TruncatedPayload {
            declared: header.payload_len as usize,
            available: rest.len(),
        })?;
        let _ = rest;

        let body = if header.payload_type.is_control() {
            TransportBody::Control(ControlMessage::parse(body_bytes)?)
        } else {
            TransportBody::Data(body_bytes.to_vec())
        };

        Ok(Self { header, body })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = self.header.pack();
        match &self.body {
            TransportBody::Data(data) => buffer.extend_from_slice(data),
            TransportBody::Control(message) => buffer.extend(message.pack()),
        }
        buffer
    }

    pub fn encoded_len(&self) -> usize {
        TransportHeader::SIZE
            + match &self.body {
                TransportBody::Data(data) => data.len(),
                TransportBody::Control(message) => message.encoded_len(),
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{
        ControlBody,
        Hello,
    };

    #[test]
    fn round_trips_data_message() {
        let message = TransportMessage::data(alloc::vec![1, 2, 3]);
        let bytes = message.pack();
        let parsed = TransportMessage::parse(&bytes).unwrap();
        assert_eq!(parsed, message);
        assert!(!parsed.is_control());
    }

    #[test]
    fn round_trips_control_message() {
        let hello = ControlBody::Hello(Hello { lambda: 42 });
        let control = ControlMessage::new(hello);
        let message = TransportMessage::control(PayloadKind::ControlLocal, control);
        let bytes = message.pack();
        let parsed = TransportMessage::parse(&bytes).unwrap();
        assert_eq!(parsed, message);
        assert!(parsed.is_control());
    }
}
