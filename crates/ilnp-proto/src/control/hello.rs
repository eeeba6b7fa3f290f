//! HELLO(1): broadcast periodically so neighbours can learn this node's current λ.
//! Grounded on `controlmessages.py::Hello`.

use crate::IlnpElement;
use alloc::vec::Vec;
use nom::{
    number::complete::be_u32,
    IResult,
};

#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub struct Hello {
    pub lambda: u32,
}

impl IlnpElement for Hello {
    fn unpack(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, lambda) = be_u32(input)?;
        Ok((input, Self { lambda }))
    }

    fn pack(&self) -> Vec<u8> {
        self.lambda.to_be_bytes().to_vec()
    }
}
