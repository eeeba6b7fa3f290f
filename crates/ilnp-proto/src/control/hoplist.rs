//! A list of locators, used both by `LOCATOR_RREQ`'s traversed-locator list and by
//! `LOCATOR_RREP`'s return path. Grounded on `take2/sensor/network/router/controlmessages.py`'s
//! `LocatorHopList`.

use crate::IlnpElement;
use alloc::vec::Vec;
use nom::{
    multi::many0,
    number::complete::be_u64,
    IResult,
};

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct LocatorHopList {
    pub locators: Vec<u64>,
}

impl LocatorHopList {
    pub fn new(locators: Vec<u64>) -> Self {
        Self { locators }
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl IlnpElement for LocatorHopList {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, locators) = many0(be_u64)(input)?;
        Ok((input, Self { locators }))
    }

    fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.locators.len() * 8);
        for locator in &self.locators {
            buffer.extend_from_slice(&locator.to_be_bytes());
        }
        buffer
    }
}
