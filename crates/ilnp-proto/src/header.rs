//! The fixed 40-byte ILNP packet header.
//!
//! Grounded on `octavius_bgp::rfc4271::BGPMessageHeader`'s `unpack`/`pack` pair, adapted from
//! BGP's 19-byte marker+length+type header to ILNP's version/traffic-class/flow-label word plus
//! two 64-bit locator/identifier address pairs.

use crate::IlnpElement;
use alloc::vec::Vec;
use ilnp_common::{
    tag_enum,
    Address,
};
use nom::{
    number::complete::{
        be_u16,
        be_u32,
        be_u64,
        be_u8,
    },
    IResult,
};

tag_enum! {
    /// `next_header` values as carried in byte 6 of the ILNP header.
    #[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
    pub enum NextHeader: be_u8(u8) {
        /// Payload begins with a transport wrapper carrying opaque data.
        Data = 0,
        /// Payload begins with a transport wrapper carrying a control message (DSR-style option).
        Control = 48,
    }
}

/// The fixed 40-byte ILNP header: version/traffic-class/flow-label word, payload length,
/// next-header, hop-limit, then source and destination `(locator, identifier)` pairs.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub struct IlnpHeader {
    pub version: u8,
    pub traffic_class: u8,
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: NextHeader,
    pub hop_limit: u8,
    pub src: Address,
    pub dst: Address,
}

impl IlnpHeader {
    pub const SIZE: usize = 40;

    pub fn decrement_hop_limit(&mut self) {
        self.hop_limit = self.hop_limit.saturating_sub(1);
    }
}

impl IlnpElement for IlnpHeader {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, first_word) = be_u32(input)?;
        let version = (first_word >> 28) as u8;
        let traffic_class = ((first_word >> 20) & 0xFF) as u8;
        let flow_label = first_word & 0x000F_FFFF;

        let (input, payload_length) = be_u16(input)?;
        let (input, next_header) = NextHeader::unpack(input)?;
        let (input, hop_limit) = be_u8(input)?;
        let (input, src_loc) = be_u64(input)?;
        let (input, src_id) = be_u64(input)?;
        let (input, dst_loc) = be_u64(input)?;
        let (input, dst_id) = be_u64(input)?;

        Ok((
            input,
            Self {
                version,
                traffic_class,
                flow_label,
                payload_length,
                next_header,
                hop_limit,
                src: Address::new(src_loc, src_id),
                dst: Address::new(dst_loc, dst_id),
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let first_word = ((self.version as u32) << 28) | ((self.traffic_class as u32) << 20) | (self.flow_label & 0x000F_FFFF);

        let mut buffer = Vec::with_capacity(Self::SIZE);
        buffer.extend_from_slice(&first_word.to_be_bytes());
        buffer.extend_from_slice(&self.payload_length.to_be_bytes());
        buffer.extend(self.next_header.pack());
        buffer.extend_from_slice(&self.hop_limit.to_be_bytes());
        buffer.extend_from_slice(&self.src.loc.to_be_bytes());
        buffer.extend_from_slice(&self.src.id.to_be_bytes());
        buffer.extend_from_slice(&self.dst.loc.to_be_bytes());
        buffer.extend_from_slice(&self.dst.id.to_be_bytes());
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header() {
        let header = IlnpHeader {
            version: 6,
            traffic_class: 0,
            flow_label: 0,
            payload_length: 4,
            next_header: NextHeader::Control,
            hop_limit: 32,
            src: Address::new(10, 1),
            dst: Address::ALL_LINK_LOCAL,
        };

        let bytes = header.pack();
        assert_eq!(bytes.len(), IlnpHeader::SIZE);

        let (rest, parsed) = IlnpHeader::unpack(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, header);
    }

    #[test]
    fn packs_version_traffic_class_and_flow_label_into_one_word() {
        let header = IlnpHeader {
            version: 6,
            traffic_class: 0xAB,
            flow_label: 0x00012345,
            payload_length: 0,
            next_header: NextHeader::Data,
            hop_limit: 1,
            src: Address::new(0, 0),
            dst: Address::new(0, 0),
        };

        let bytes = header.pack();
        assert_eq!(bytes[0] >> 4, 6);
        let (_, parsed) = IlnpHeader::unpack(&bytes).unwrap();
        assert_eq!(parsed.traffic_class, 0xAB);
        assert_eq!(parsed.flow_label, 0x00012345);
    }
}
