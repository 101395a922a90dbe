//! BER (Basic Encoding Rules) codec for the SNMP messages a probe exchanges.
//!
//! Encoding uses a reverse buffer so lengths never need pre-calculating;
//! decoding is zero-copy over [`bytes::Bytes`] and permissive in the same
//! places net-snmp is (non-minimal integers and lengths are accepted).

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
