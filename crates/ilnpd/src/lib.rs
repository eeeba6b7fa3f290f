//! Library surface for the ILNP sensor overlay daemon: the pieces `main.rs`'s binary wires
//! together, exposed here as well so integration tests under `tests/` can drive multiple
//! in-process nodes through [`net::memory::MemoryNetwork`] without a real UDP socket.

pub mod battery;
pub mod config;
pub mod control;
pub mod monitor;
pub mod net;
pub mod router;
pub mod sensor;
