//! SNMP message wrappers.
//!
//! Messages encapsulate PDUs with version and security information.
//!
//! - [`CommunityMessage`] - v1/v2c messages with a community string
//! - [`V3Message`] - v3 messages carrying USM security parameters

mod community;
mod v3;

pub use community::CommunityMessage;
pub use v3::{MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message, V3MessageData};

/// Largest message we advertise we can receive (max UDP payload).
pub const MSG_MAX_SIZE: i32 = 65507;
