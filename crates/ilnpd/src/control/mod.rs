//! The control plane: neighbour tracking, link-state flooding, and reactive inter-zone route
//! discovery, split the way the original's later iteration was split (`control.py` vs
//! `interzone.py`).

pub mod external;
pub mod plane;

pub use plane::ControlPlane;

use std::time::Duration;

/// Cadence of the HELLO keepalive and the maintenance tick. Grounded on
/// `control.py::KEEP_ALIVE_INTERVAL_SECS`.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// A neighbour link is considered dead once its age reaches twice the keepalive interval.
/// Grounded on `control.py::MAX_AGE_OF_LINK`.
pub const MAX_AGE_OF_LINK_SECS: u32 = 40;

/// The λ energy metric is carried as a 4-byte wire field; this is its maximum representable
/// value. Grounded on `control.py::MAX_LAMBDA`.
pub const MAX_LAMBDA: u32 = u32::MAX;

/// LSDB sequence numbers and RREQ request ids both wrap at this modulus. Grounded on
/// `control.py`'s and `interzone.py`'s shared use of `BoundedSequenceGenerator(511)`.
pub const SEQUENCE_MODULUS: u16 = 511;

/// Hop limit used for single-hop-only control broadcasts (HELLO). Grounded on
/// `control.py::__send_keepalive`'s explicit `hop_limit=0`.
pub const HELLO_HOP_LIMIT: u8 = 0;

/// Hop limit used for packets that may be relayed (LSDB, EXPIRED_LINKS, data, and reactive
/// discovery traffic), matching the original's `ILNPPacket` default.
pub const DEFAULT_HOP_LIMIT: u8 = 32;

/// Computes this node's λ metric from its remaining battery fraction.
///
/// Grounded on `control.py::__calc_my_lambda`: `floor((1 - (1 - fraction)^2) * MAX_LAMBDA)`.
pub fn calc_lambda(battery_fraction_remaining: f64) -> u32 {
    let normalized = 1.0 - (1.0 - battery_fraction_remaining).powi(2);
    (normalized * MAX_LAMBDA as f64).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_battery_gives_max_lambda() {
        assert_eq!(calc_lambda(1.0), MAX_LAMBDA);
    }

    #[test]
    fn empty_battery_gives_zero_lambda() {
        assert_eq!(calc_lambda(0.0), 0);
    }

    #[test]
    fn half_battery_gives_partial_lambda() {
        let lambda = calc_lambda(0.5);
        assert!(lambda > 0 && lambda < MAX_LAMBDA);
    }
}
