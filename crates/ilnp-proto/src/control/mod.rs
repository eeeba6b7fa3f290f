//! Control-plane messages carried inside a [`crate::transport::TransportMessage`] whose
//! `payload_type` is `ControlLocal` or `ControlExternal`.
//!
//! Each subtype gets its own `unpack`/`pack` pair rather than a reflection-derived codec, the
//! same tagged-union style `octavius_bgp::BGPMessage` uses for BGP message bodies. Grounded on
//! `take2/sensor/network/router/controlmessages.py`'s `ControlHeader`/`ControlMessage`/
//! `TYPE_TO_CLASS` dispatch table.

mod expired;
mod hello;
mod hoplist;
mod lsdb;
mod rerr;
mod rreq;
mod rrep;

pub use expired::ExpiredLinks;
pub use hello::Hello;
pub use hoplist::LocatorHopList;
pub use lsdb::{
    ExternalLink,
    InternalLink,
    LsdbMessage,
};
pub use rerr::LocatorRerr;
pub use rreq::LocatorRreq;
pub use rrep::LocatorRrep;

use crate::{
    CodecError,
    IlnpElement,
};
use alloc::vec::Vec;
use nom::{
    number::complete::{
        be_u16,
        be_u8,
    },
    IResult,
};

/// 4-byte control header: `control_type`, one reserved byte, `control_payload_len`.
/// Grounded on `controlmessages.py::ControlHeader`'s `"!BB2x"` struct format.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub struct ControlHeader {
    pub control_type: u8,
    pub control_payload_len: u16,
}

impl ControlHeader {
    pub const SIZE: usize = 4;

    const HELLO: u8 = 1;
    const LOCATOR_RREQ: u8 = 2;
    const LOCATOR_RREP: u8 = 3;
    const LOCATOR_RERR: u8 = 4;
    const LSDB: u8 = 5;
    const EXPIRED_LINKS: u8 = 6;
}

impl IlnpElement for ControlHeader {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, control_type) = be_u8(input)?;
        let (input, _reserved) = be_u8(input)?;
        let (input, control_payload_len) = be_u16(input)?;
        Ok((
            input,
            Self {
                control_type,
                control_payload_len,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::SIZE);
        buffer.push(self.control_type);
        buffer.push(0);
        buffer.extend_from_slice(&self.control_payload_len.to_be_bytes());
        buffer
    }
}

/// The parsed body of a control message, one variant per `control_type`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ControlBody {
    Hello(Hello),
    LocatorRreq(LocatorRreq),
    LocatorRrep(LocatorRrep),
    LocatorRerr(LocatorRerr),
    Lsdb(LsdbMessage),
    ExpiredLinks(ExpiredLinks),
    Unknown { control_type: u8, data: Vec<u8> },
}

impl ControlBody {
    fn control_type(&self) -> u8 {
        match self {
            Self::Hello(_) => ControlHeader::HELLO,
            Self::LocatorRreq(_) => ControlHeader::LOCATOR_RREQ,
            Self::LocatorRrep(_) => ControlHeader::LOCATOR_RREP,
            Self::LocatorRerr(_) => ControlHeader::LOCATOR_RERR,
            Self::Lsdb(_) => ControlHeader::LSDB,
            Self::ExpiredLinks(_) => ControlHeader::EXPIRED_LINKS,
            Self::Unknown { control_type, .. } => *control_type,
        }
    }

    fn pack(&self) -> Vec<u8> {
        match self {
            Self::Hello(body) => body.pack(),
            Self::LocatorRreq(body) => body.pack(),
            Self::LocatorRrep(body) => body.pack(),
            Self::LocatorRerr(body) => body.pack(),
            Self::Lsdb(body) => body.pack(),
            Self::ExpiredLinks(body) => body.pack(),
            Self::Unknown { data, .. } => data.clone(),
        }
    }

    fn parse(control_type: u8, data: &[u8]) -> Result<Self, CodecError> {
        let result = match control_type {
            ControlHeader::HELLO => Hello::unpack(data).map(|(_, body)| Self::Hello(body)),
            ControlHeader::LOCATOR_RREQ => LocatorRreq::unpack(data).map(|(_, body)| Self::LocatorRreq(body)),
            ControlHeader::LOCATOR_RREP => LocatorRrep::unpack(data).map(|(_, body)| Self::LocatorRrep(body)),
            ControlHeader::LOCATOR_RERR => LocatorRerr::unpack(data).map(|(_, body)| Self::LocatorRerr(body)),
            ControlHeader::LSDB => LsdbMessage::unpack(data).map(|(_, body)| Self::Lsdb(body)),
            ControlHeader::EXPIRED_LINKS => ExpiredLinks::unpack(data).map(|(_, body)| Self::ExpiredLinks(body)),
            other => {
                return Ok(Self::Unknown {
                    control_type: other,
                    data: data.to_vec(),
                })
            }
        };
        result.map_err(|_| CodecError::MalformedBody)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ControlMessage {
    pub body: ControlBody,
}

impl ControlMessage {
    pub fn new(body: ControlBody) -> Self {
        Self { body }
    }

    pub fn parse(input: &[u8]) -> Result<Self, CodecError> {
        let (rest, header) = ControlHeader::unpack(input).map_err(|_| CodecError::MalformedBody)?;
        if rest.len() < header.control_payload_len as usize {
            return Err(CodecError::TruncatedPayload {
                declared: header.control_payload_len as usize,
                available: rest.len(),
            });
        }
        let payload = &rest[..header.control_payload_len as usize];
        let body = ControlBody::parse(header.control_type, payload)?;
        Ok(Self { body })
    }

    pub fn pack(&self) -> Vec<u8> {
        let payload = self.body.pack();
        let header = ControlHeader {
            control_type: self.body.control_type(),
            control_payload_len: payload.len() as u16,
        };
        let mut buffer = header.pack();
        buffer.extend(payload);
        buffer
    }

    pub fn encoded_len(&self) -> usize {
        ControlHeader::SIZE + self.body.pack().len()
    }
}
