//! LSDB(5): a locator's intra-zone link-state database, broadcast whenever a node's neighbour
//! set or λ changes. Grounded on `controlmessages.py::LSDBMessage`/`InternalLink`/`ExternalLink`
//! and `forwardingtable.py::ZonedNetworkGraph.to_lsdb_message`.

use crate::IlnpElement;
use alloc::vec::Vec;
use nom::{
    multi::count,
    number::complete::{
        be_u16,
        be_u32,
        be_u64,
        be_u8,
    },
    IResult,
};

/// A link between two nodes within the same locator, each end carrying the λ its owner
/// advertised at the time the link was recorded.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct InternalLink {
    pub a: u64,
    pub a_lambda: u32,
    pub b: u64,
    pub b_lambda: u32,
}

impl InternalLink {
    pub const SIZE: usize = 24;
}

impl IlnpElement for InternalLink {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, a) = be_u64(input)?;
        let (input, a_lambda) = be_u32(input)?;
        let (input, b) = be_u64(input)?;
        let (input, b_lambda) = be_u32(input)?;
        Ok((
            input,
            Self {
                a,
                a_lambda,
                b,
                b_lambda,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::SIZE);
        buffer.extend_from_slice(&self.a.to_be_bytes());
        buffer.extend_from_slice(&self.a_lambda.to_be_bytes());
        buffer.extend_from_slice(&self.b.to_be_bytes());
        buffer.extend_from_slice(&self.b_lambda.to_be_bytes());
        buffer
    }
}

/// A link from a border node in this locator to a bridge node in another locator, reached via
/// that bridge's advertised λ.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ExternalLink {
    pub border_id: u64,
    pub locator: u64,
    pub bridge_id: u64,
    pub bridge_lambda: u32,
}

impl ExternalLink {
    pub const SIZE: usize = 28;
}

impl IlnpElement for ExternalLink {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, border_id) = be_u64(input)?;
        let (input, locator) = be_u64(input)?;
        let (input, bridge_id) = be_u64(input)?;
        let (input, bridge_lambda) = be_u32(input)?;
        Ok((
            input,
            Self {
                border_id,
                locator,
                bridge_id,
                bridge_lambda,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::SIZE);
        buffer.extend_from_slice(&self.border_id.to_be_bytes());
        buffer.extend_from_slice(&self.locator.to_be_bytes());
        buffer.extend_from_slice(&self.bridge_id.to_be_bytes());
        buffer.extend_from_slice(&self.bridge_lambda.to_be_bytes());
        buffer
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LsdbMessage {
    pub sequence: u16,
    pub internal_links: Vec<InternalLink>,
    pub external_links: Vec<ExternalLink>,
}

impl LsdbMessage {
    pub fn new(sequence: u16, internal_links: Vec<InternalLink>, external_links: Vec<ExternalLink>) -> Self {
        Self {
            sequence,
            internal_links,
            external_links,
        }
    }
}

impl IlnpElement for LsdbMessage {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, sequence) = be_u16(input)?;
        let (input, n_internal) = be_u8(input)?;
        let (input, n_external) = be_u8(input)?;
        let (input, internal_links) = count(InternalLink::unpack, n_internal as usize)(input)?;
        let (input, external_links) = count(ExternalLink::unpack, n_external as usize)(input)?;
        Ok((
            input,
            Self {
                sequence,
                internal_links,
                external_links,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(
            4 + self.internal_links.len() * InternalLink::SIZE + self.external_links.len() * ExternalLink::SIZE,
        );
        buffer.extend_from_slice(&self.sequence.to_be_bytes());
        buffer.push(self.internal_links.len() as u8);
        buffer.push(self.external_links.len() as u8);
        for link in &self.internal_links {
            buffer.extend(link.pack());
        }
        for link in &self.external_links {
            buffer.extend(link.pack());
        }
        buffer
    }
}
