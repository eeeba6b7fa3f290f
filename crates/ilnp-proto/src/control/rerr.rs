//! LOCATOR_RERR(4): signals that an inter-locator link used by a cached path has broken.
//! Grounded on `controlmessages.py::LocatorLinkError`.
//!
//! The original prototype's handler for this message is a bare `pass` stub, so this crate
//! round-trips the wire format but `ilnpd` does not act on it beyond logging.

use crate::IlnpElement;
use alloc::vec::Vec;
use nom::{
    number::complete::be_u64,
    IResult,
};

#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub struct LocatorRerr {
    pub lost_locator: u64,
}

impl IlnpElement for LocatorRerr {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, lost_locator) = be_u64(input)?;
        Ok((input, Self { lost_locator }))
    }

    fn pack(&self) -> Vec<u8> {
        self.lost_locator.to_be_bytes().to_vec()
    }
}
