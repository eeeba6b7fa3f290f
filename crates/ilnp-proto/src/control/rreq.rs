//! LOCATOR_RREQ(2): reactive route request flooded across locators while chasing an unknown
//! destination identifier. Grounded on `controlmessages.py::LocatorRouteRequest`.

use crate::{
    control::hoplist::LocatorHopList,
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

const ALLOW_CACHED_BIT: u8 = 0b1000_0000;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LocatorRreq {
    pub request_id: u16,
    pub allow_cached_replies: bool,
    pub hop_list: LocatorHopList,
}

impl LocatorRreq {
    pub fn new(request_id: u16, allow_cached_replies: bool, hop_list: LocatorHopList) -> Self {
        Self {
            request_id,
            allow_cached_replies,
            hop_list,
        }
    }
}

impl IlnpElement for LocatorRreq {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, request_id) = be_u16(input)?;
        let (input, flags) = be_u8(input)?;
        let (input, _reserved) = be_u8(input)?;
        let (input, hop_list) = LocatorHopList::unpack(input)?;
        Ok((
            input,
            Self {
                request_id,
                allow_cached_replies: flags & ALLOW_CACHED_BIT != 0,
                hop_list,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&self.request_id.to_be_bytes());
        buffer.push(if self.allow_cached_replies { ALLOW_CACHED_BIT } else { 0 });
        buffer.push(0);
        buffer.extend(self.hop_list.pack());
        buffer
    }
}
