//! Probe configuration and its precondition check.

use crate::error::{Error, Result};

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Message used whenever neither a community nor complete v3 credentials
/// are configured.
pub const MISSING_CREDENTIALS: &str = "Missing SNMP community or SNMPv3 authentication options";

/// Connection and credential settings for one probe invocation.
///
/// Empty strings count as absent, matching how the classic probes treat
/// blank command-line values.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Deserialize))]
#[cfg_attr(feature = "cli", serde(default))]
pub struct Configuration {
    pub host: String,
    pub port: u16,
    pub community: Option<String>,
    pub user: Option<String>,
    pub authpassword: Option<String>,
    pub privpassword: Option<String>,
    pub authprotocol: String,
    pub privprotocol: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            community: None,
            user: None,
            authpassword: None,
            privpassword: None,
            authprotocol: "SHA".to_string(),
            privprotocol: "AES".to_string(),
        }
    }
}

impl Configuration {
    /// Configuration for `host` with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set SNMPv3 user credentials.
    pub fn with_user(
        mut self,
        user: impl Into<String>,
        authpassword: impl Into<String>,
        privpassword: impl Into<String>,
    ) -> Self {
        self.user = Some(user.into());
        self.authpassword = Some(authpassword.into());
        self.privpassword = Some(privpassword.into());
        self
    }

    pub fn with_protocols(
        mut self,
        authprotocol: impl Into<String>,
        privprotocol: impl Into<String>,
    ) -> Self {
        self.authprotocol = authprotocol.into();
        self.privprotocol = privprotocol.into();
        self
    }

    /// The community string, if one is set and non-empty.
    pub fn community(&self) -> Option<&str> {
        non_empty(&self.community)
    }

    /// User, auth password and priv password, if all three are non-empty.
    pub fn v3_credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_empty(&self.user)?,
            non_empty(&self.authpassword)?,
            non_empty(&self.privpassword)?,
        ))
    }

    /// Fail unless a community or a complete set of v3 credentials is set.
    ///
    /// Does not look at protocol names; those are checked when the
    /// security profile is built.
    pub fn validate(&self) -> Result<()> {
        if self.community().is_none() && self.v3_credentials().is_none() {
            return Err(Error::configuration(MISSING_CREDENTIALS));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |field: &Option<String>| field.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Configuration")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("community", &redact(&self.community))
            .field("user", &self.user)
            .field("authpassword", &redact(&self.authpassword))
            .field("privpassword", &redact(&self.privpassword))
            .field("authprotocol", &self.authprotocol)
            .field("privprotocol", &self.privprotocol)
            .finish()
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
