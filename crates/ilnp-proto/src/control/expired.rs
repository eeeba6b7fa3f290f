//! EXPIRED_LINKS(6): broadcast when a neighbour's HELLO has not been seen within
//! `MAX_AGE_OF_LINK`, telling the rest of the locator to drop any links through that neighbour.
//! Grounded on `control.py::__handle_expired_links` and `controlmessages.py::ExpiredLinkList`.

use crate::IlnpElement;
use alloc::vec::Vec;
use nom::{
    multi::count,
    number::complete::{
        be_u64,
        be_u8,
    },
    IResult,
};

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ExpiredLinks {
    pub lost_ids: Vec<u64>,
}

impl ExpiredLinks {
    pub fn new(lost_ids: Vec<u64>) -> Self {
        Self { lost_ids }
    }
}

impl IlnpElement for ExpiredLinks {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, n) = be_u8(input)?;
        let (input, lost_ids) = count(be_u64, n as usize)(input)?;
        Ok((input, Self { lost_ids }))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(1 + self.lost_ids.len() * 8);
        buffer.push(self.lost_ids.len() as u8);
        for id in &self.lost_ids {
            buffer.extend_from_slice(&id.to_be_bytes());
        }
        buffer
    }
}
