//! Error types for snmp-probe.
//!
//! Probe code sees four kinds of failure: malformed opaque-float payloads,
//! bad configuration, transport failures and agent-reported errors. Codec,
//! authentication and crypto problems inside the SNMP engine are logged
//! with full detail via `tracing` and surface as [`Error::Transport`]
//! carrying a short indication text.
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without breaking changes.

pub(crate) mod internal;

use std::fmt;

use crate::oid::Oid;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Indication text used when no response arrives within the retry budget.
pub const TIMEOUT_INDICATION: &str = "No SNMP response received before timeout";

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Empty OID string.
    Empty,
    /// Invalid arc value.
    InvalidArc,
    /// First arc must be 0, 1, or 2.
    InvalidFirstArc(u32),
    /// Second arc too large for first arc value.
    InvalidSecondArc { first: u32, second: u32 },
    /// OID too short (minimum 2 arcs).
    TooShort,
    /// OID has too many arcs (exceeds MAX_OID_LEN).
    TooManyArcs { count: usize, max: usize },
}

impl fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::InvalidArc => write!(f, "invalid arc value"),
            Self::InvalidFirstArc(v) => write!(f, "first arc must be 0, 1, or 2, got {}", v),
            Self::InvalidSecondArc { first, second } => {
                write!(f, "second arc {} too large for first arc {}", second, first)
            }
            Self::TooShort => write!(f, "OID must have at least 2 arcs"),
            Self::TooManyArcs { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
        }
    }
}

/// SNMP error status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown/future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether this status reports a failure.
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::NoError)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Library error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Value is not a `0x9f78`-tagged opaque float.
    #[error("Data {value} not in opaque float format")]
    Format { value: String },

    /// Missing or invalid credentials, or an unrecognised algorithm name.
    ///
    /// Always raised before any network I/O is attempted.
    #[error("{message}")]
    Configuration { message: String },

    /// Invalid OID format.
    #[error("invalid OID: {kind}")]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>, // Only allocated when parsing string input
    },

    /// The exchange with the agent could not be completed.
    ///
    /// Covers timeouts, resolution and socket failures, and replies that
    /// could not be decoded or authenticated. `message` is the indication
    /// text.
    #[error("{message}")]
    Transport { target: String, message: String },

    /// The agent answered with a non-zero error status.
    ///
    /// `index` is the OID of the offending binding, or `"?"` when the agent
    /// gave no usable error index.
    #[error("{status} at {index}")]
    Agent { status: ErrorStatus, index: String },

    /// Fetching or parsing vendor firmware metadata failed.
    #[cfg(feature = "firmware")]
    #[error("{message}")]
    Firmware { message: String },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a transport error for `target`.
    pub fn transport(target: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::Transport {
            target: target.to_string(),
            message: message.into(),
        }
    }

    /// Create an agent error from a raw status and one-based error index.
    ///
    /// The index is resolved against `oids` (the bindings of the response);
    /// zero, negative and out-of-range indices become `"?"`.
    pub fn agent(status: i32, index: i32, oids: &[Oid]) -> Self {
        let index = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| oids.get(i))
            .map(|oid| oid.to_string())
            .unwrap_or_else(|| "?".to_string());
        Self::Agent {
            status: ErrorStatus::from_i32(status),
            index,
        }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// Whether the exchange itself failed (as opposed to the agent refusing it).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether this is the no-response timeout indication.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { message, .. } if message == TIMEOUT_INDICATION)
    }

    /// Get the target this error refers to, if any.
    ///
    /// Decode failures raised outside an exchange carry no target.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Transport { target, .. } if !target.is_empty() => Some(target),
            _ => None,
        }
    }
}

impl From<internal::WireError> for Error {
    fn from(err: internal::WireError) -> Self {
        Self::Transport {
            target: String::new(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn agent_error_resolves_one_based_index() {
        let oids = [oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)];
        let err = Error::agent(2, 2, &oids);
        assert_eq!(err.to_string(), "noSuchName at 1.3.6.1.2.1.1.5.0");
    }

    #[test]
    fn agent_error_zero_index_is_unknown() {
        let oids = [oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)];
        assert_eq!(Error::agent(5, 0, &oids).to_string(), "genErr at ?");
        assert_eq!(Error::agent(5, 7, &oids).to_string(), "genErr at ?");
        assert_eq!(Error::agent(5, -1, &oids).to_string(), "genErr at ?");
    }

    #[test]
    fn transport_error_displays_indication_only() {
        let err = Error::transport("10.0.0.1:161", TIMEOUT_INDICATION);
        assert_eq!(err.to_string(), TIMEOUT_INDICATION);
        assert_eq!(err.target(), Some("10.0.0.1:161"));
        assert!(err.is_transport());
    }

    #[test]
    fn wire_error_has_no_target() {
        let err = crate::message::CommunityMessage::decode(bytes::Bytes::from_static(&[0x02, 0x01]))
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.target(), None);
    }

    #[test]
    fn error_status_round_trips_known_codes() {
        for code in 0..=18 {
            assert_eq!(ErrorStatus::from_i32(code).as_i32(), code);
        }
        assert_eq!(ErrorStatus::from_i32(99), ErrorStatus::Unknown(99));
        assert_eq!(ErrorStatus::TooBig.to_string(), "tooBig");
    }
}
