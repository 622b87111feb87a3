//! Chat backend abstraction and the request/reply correlator built on top of it.

pub mod correlator;
pub mod port;
