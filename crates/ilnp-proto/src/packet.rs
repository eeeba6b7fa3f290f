//! The full ILNP packet: a fixed 40-byte header plus an opaque payload whose length is declared
//! by the header's `payload_length` field. The payload is handed to callers as raw bytes rather
//! than eagerly parsed as a [`crate::transport::TransportMessage`] — a forwarding node only needs
//! the header to make a forwarding decision and should not pay to parse a payload it is about to
//! relay unchanged.
//!
//! Grounded on `take2/sensor/ilnp.py::ILNPPacket`, whose `"!IHBB4Q"` struct format is mirrored
//! here as [`crate::header::IlnpHeader`].

use crate::{
    header::NextHeader,
    CodecError,
    IlnpElement,
    IlnpHeader,
};
use alloc::vec::Vec;
use ilnp_common::Address;

/// ILNP only ever appears as version 6 in this deployment; anything else is rejected rather than
/// silently forwarded.
const SUPPORTED_VERSION: u8 = 6;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IlnpPacket {
    pub header: IlnpHeader,
    pub payload: Vec<u8>,
}

impl IlnpPacket {
    pub fn new(src: Address, dst: Address, next_header: NextHeader, hop_limit: u8, payload: Vec<u8>) -> Self {
        let header = IlnpHeader {
            version: SUPPORTED_VERSION,
            traffic_class: 0,
            flow_label: 0,
            payload_length: payload.len() as u16,
            next_header,
            hop_limit,
            src,
            dst,
        };
        Self { header, payload }
    }

    pub fn parse(input: &[u8]) -> Result<Self, CodecError> {
        if input.len() < IlnpHeader::SIZE {
            return Err(CodecError::TooShort);
        }

        let (rest, header) = IlnpHeader::unpack(input).map_err(|_| CodecError::TooShort)?;
        if header.version != SUPPORTED_VERSION {
            return Err(CodecError::UnsupportedVersion(header.version));
        }
        if rest.len() < header.payload_length as usize {
            return Err(CodecError::TruncatedPayload {
                declared: header.payload_length as usize,
                available: rest.len(),
            });
        }

        let payload = rest[..header.payload_length as usize].to_vec();
        Ok(Self { header, payload })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = self.header.pack();
        buffer.extend_from_slice(&self.payload);
        buffer
    }

    pub fn decrement_hop_limit(&mut self) {
        self.header.decrement_hop_limit();
    }

    pub const fn is_control(&self) -> bool {
        matches!(self.header.next_header, NextHeader::Control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_packet() {
        let packet = IlnpPacket::new(
            Address::new(10, 1),
            Address::new(10, 2),
            NextHeader::Data,
            32,
            alloc::vec![1, 2, 3, 4],
        );

        let bytes = packet.pack();
        let parsed = IlnpPacket::parse(&bytes).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = IlnpPacket::parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, CodecError::TooShort));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut packet = IlnpPacket::new(Address::new(0, 0), Address::new(0, 0), NextHeader::Data, 1, Vec::new());
        packet.header.version = 4;
        let bytes = packet.pack();
        let err = IlnpPacket::parse(&bytes).unwrap_err();
        assert_eq!(err, CodecError::UnsupportedVersion(4));
    }

    #[test]
    fn rejects_truncated_payload() {
        let packet = IlnpPacket::new(Address::new(0, 0), Address::new(0, 0), NextHeader::Data, 1, alloc::vec![1, 2, 3]);
        let mut bytes = packet.pack();
        bytes.truncate(bytes.len() - 1);
        let err = IlnpPacket::parse(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedPayload { .. }));
    }

    #[test]
    fn decrements_hop_limit_and_saturates_at_zero() {
        let mut packet = IlnpPacket::new(Address::new(0, 0), Address::new(0, 0), NextHeader::Data, 0, Vec::new());
        packet.decrement_hop_limit();
        assert_eq!(packet.header.hop_limit, 0);
    }
}
