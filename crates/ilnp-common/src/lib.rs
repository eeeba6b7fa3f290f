//! Shared address type and wire-format helper macros for the ILNP sensor overlay stack.
//!
//! This crate has no opinion on transport, threading, or storage — it exists purely so that
//! `ilnp-proto` (wire format) and the downstream daemon crate agree on the shape of an ILNP
//! address without either depending on the other.

#![no_std]
extern crate alloc;

pub mod macros;

use alloc::string::{
    String,
    ToString,
};
use core::{
    fmt::{
        Display,
        Formatter,
    },
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("expected format <locator>:<identifier> (e.g. 10:1), but got '{0}'")]
    InvalidAddressFormat(String),
    #[error("unable to parse integer => '{0}'")]
    IntParse(#[from] ParseIntError),
}

/// An ILNP address: a 64-bit locator naming a one-hop broadcast zone and a 64-bit identifier
/// naming a node within (or reachable beyond) that zone.
///
/// A `loc` of `0` means "locator unknown" — used on outgoing packets whose destination locator
/// has not yet been resolved by reactive route discovery.
#[derive(Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub struct Address {
    pub loc: u64,
    pub id: u64,
}

impl Address {
    /// Sentinel locator meaning "not yet resolved".
    pub const UNKNOWN_LOCATOR: u64 = 0;

    /// Reserved destination address used for all link-local control broadcasts.
    pub const ALL_LINK_LOCAL: Address = Address {
        loc: u64::MAX,
        id: u64::MAX,
    };

    pub const fn new(loc: u64, id: u64) -> Self {
        Self { loc, id }
    }

    pub const fn with_unknown_locator(id: u64) -> Self {
        Self {
            loc: Self::UNKNOWN_LOCATOR,
            id,
        }
    }

    pub const fn has_known_locator(&self) -> bool {
        self.loc != Self::UNKNOWN_LOCATOR
    }
}

impl FromStr for Address {
    type Err = CommonError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let (loc, id) = string.split_once(':').ok_or_else(|| CommonError::InvalidAddressFormat(string.to_string()))?;
        Ok(Self {
            loc: loc.parse()?,
            id: id.parse()?,
        })
    }
}

impl Display for Address {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> core::fmt::Result {
        write!(formatter, "{}:{}", self.loc, self.id)
    }
}
