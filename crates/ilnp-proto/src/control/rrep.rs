//! LOCATOR_RREP(3): reply to a LOCATOR_RREQ, carrying the path back to the destination's
//! locator (the path's last entry). Grounded on `controlmessages.py::LocatorRouteReply`.

use crate::{
    control::hoplist::LocatorHopList,
    IlnpElement,
};
use alloc::vec::Vec;
use nom::{
    number::complete::be_u64,
    IResult,
};

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LocatorRrep {
    pub original_dest_id: u64,
    pub route_list: LocatorHopList,
}

impl LocatorRrep {
    pub fn new(original_dest_id: u64, route_list: LocatorHopList) -> Self {
        Self {
            original_dest_id,
            route_list,
        }
    }

    /// The locator of the destination node, i.e. the last entry of `route_list`.
    pub fn destination_locator(&self) -> Option<u64> {
        self.route_list.locators.last().copied()
    }
}

impl IlnpElement for LocatorRrep {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, original_dest_id) = be_u64(input)?;
        let (input, route_list) = LocatorHopList::unpack(input)?;
        Ok((
            input,
            Self {
                original_dest_id,
                route_list,
            },
        ))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&self.original_dest_id.to_be_bytes());
        buffer.extend(self.route_list.pack());
        buffer
    }
}
