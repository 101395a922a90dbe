//! Credential profiles built from a [`Configuration`].

use std::str::FromStr;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{Configuration, MISSING_CREDENTIALS};
use crate::error::{Error, Result};
use crate::v3::{AuthProtocol, PrivProtocol};
use crate::version::CommunityVersion;

/// Version argument accepted by the probes; only consulted for
/// community-based profiles.
pub type SnmpVersion = CommunityVersion;

/// Credentials for one query.
#[derive(Clone, PartialEq, Eq)]
pub enum SecurityProfile {
    /// SNMPv1/v2c community string
    Community {
        community: String,
        version: CommunityVersion,
    },
    /// SNMPv3 USM user at authPriv
    User(UserProfile),
}

/// SNMPv3 user credentials with resolved algorithms.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct UserProfile {
    #[zeroize(skip)]
    pub user: String,
    #[zeroize(skip)]
    pub auth_protocol: AuthProtocol,
    #[zeroize(skip)]
    pub priv_protocol: PrivProtocol,
    auth_password: String,
    priv_password: String,
}

impl UserProfile {
    pub fn auth_password(&self) -> &[u8] {
        self.auth_password.as_bytes()
    }

    pub fn priv_password(&self) -> &[u8] {
        self.priv_password.as_bytes()
    }
}

impl SecurityProfile {
    /// Build the profile for `config`.
    ///
    /// A non-empty community always wins and never looks at the protocol
    /// names. Otherwise the privacy then authentication protocol names are
    /// resolved, and all three v3 fields must be present.
    pub fn build(config: &Configuration, version: SnmpVersion) -> Result<Self> {
        if let Some(community) = config.community() {
            return Ok(Self::Community {
                community: community.to_string(),
                version,
            });
        }

        let priv_protocol = PrivProtocol::from_str(&config.privprotocol)
            .map_err(|e| Error::configuration(e.to_string()))?;
        let auth_protocol = AuthProtocol::from_str(&config.authprotocol)
            .map_err(|e| Error::configuration(e.to_string()))?;

        let (user, auth_password, priv_password) = config
            .v3_credentials()
            .ok_or_else(|| Error::configuration(MISSING_CREDENTIALS))?;

        Ok(Self::User(UserProfile {
            user: user.to_string(),
            auth_protocol,
            priv_protocol,
            auth_password: auth_password.to_string(),
            priv_password: priv_password.to_string(),
        }))
    }

    /// Whether this profile speaks SNMPv3.
    pub fn is_v3(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl std::fmt::Debug for SecurityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Community { version, .. } => f
                .debug_struct("Community")
                .field("community", &"[REDACTED]")
                .field("version", version)
                .finish(),
            Self::User(user) => user.fmt(f),
        }
    }
}

impl std::fmt::Debug for UserProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("user", &self.user)
            .field("auth_protocol", &self.auth_protocol)
            .field("priv_protocol", &self.priv_protocol)
            .field("auth_password", &"[REDACTED]")
            .field("priv_password", &"[REDACTED]")
            .finish()
    }
}
