//! SNMP version enumerations.

use std::str::FromStr;

/// Wire-level SNMP message version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// SNMPv1 (RFC 1157)
    V1,
    /// SNMPv2c (RFC 1901)
    V2c,
    /// SNMPv3 (RFC 3411-3418)
    V3,
}

impl Version {
    /// Get the BER-encoded version number.
    pub const fn as_i32(self) -> i32 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
            Version::V3 => 3,
        }
    }

    /// Create from BER-encoded version number.
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Version::V1),
            1 => Some(Version::V2c),
            3 => Some(Version::V3),
            _ => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::V1 => write!(f, "SNMPv1"),
            Version::V2c => write!(f, "SNMPv2c"),
            Version::V3 => write!(f, "SNMPv3"),
        }
    }
}

/// Message version used when a community string is configured.
///
/// Parsed from the probe's `"1"` / `"2c"` version argument. It has no
/// effect on user-based (SNMPv3) profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommunityVersion {
    V1,
    #[default]
    V2c,
}

impl CommunityVersion {
    /// Message processing model number (0 for v1, 1 for v2c).
    pub const fn model(self) -> i32 {
        match self {
            CommunityVersion::V1 => 0,
            CommunityVersion::V2c => 1,
        }
    }

    /// Wire-level version for this model.
    pub const fn version(self) -> Version {
        match self {
            CommunityVersion::V1 => Version::V1,
            CommunityVersion::V2c => Version::V2c,
        }
    }
}

impl FromStr for CommunityVersion {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(CommunityVersion::V1),
            "2c" => Ok(CommunityVersion::V2c),
            other => Err(crate::error::Error::configuration(format!(
                "Unknown SNMP version {other}"
            ))),
        }
    }
}

impl std::fmt::Display for CommunityVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommunityVersion::V1 => write!(f, "1"),
            CommunityVersion::V2c => write!(f, "2c"),
        }
    }
}
