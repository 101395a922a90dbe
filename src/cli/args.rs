//! Command-line argument structures for the probe binaries.
//!
//! Flags follow the classic Nagios SNMP plugin layout (`-H`, `-C`, `-u`,
//! `-a`, `-A`, `-x`, `-X`), so existing service definitions keep working.

use clap::{ArgAction, Parser};
use std::time::Duration;

use crate::config::{Configuration, DEFAULT_PORT};
use crate::engine::{DEFAULT_RETRIES, SnmpEngine};
use crate::version::CommunityVersion;

/// Target and credential arguments shared by every probe.
#[derive(Debug, Parser)]
pub struct SnmpArgs {
    /// Name or IPv4 address of host to check.
    #[arg(short = 'H', long = "host")]
    pub host: String,

    /// SNMP v1 and v2c community string.
    #[arg(short = 'C', long = "community")]
    pub community: Option<String>,

    /// SNMP port.
    #[arg(short = 'P', long = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// User for SNMPv3 authentication.
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Auth protocol for SNMPv3: SHA or MD5.
    #[arg(short = 'a', long = "authprotocol", default_value = "SHA")]
    pub authprotocol: String,

    /// Password for SNMPv3 authentication.
    #[arg(short = 'A', long = "authpassword")]
    pub authpassword: Option<String>,

    /// Password for SNMPv3 privacy.
    #[arg(short = 'X', long = "privpassword")]
    pub privpassword: Option<String>,

    /// Privacy protocol for SNMPv3: AES or DES.
    #[arg(short = 'x', long = "privprotocol", default_value = "AES")]
    pub privprotocol: String,

    /// Community-based SNMP version: 1 or 2c.
    #[arg(long = "snmp-version", default_value = "2c")]
    pub snmp_version: CommunityVersion,

    /// Per-attempt timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value = "1")]
    pub timeout: f64,

    /// Resends after the first attempt.
    #[arg(short = 'r', long = "retries", default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,
}

impl SnmpArgs {
    /// The probe configuration these flags describe.
    pub fn configuration(&self) -> Configuration {
        Configuration {
            host: self.host.clone(),
            port: self.port,
            community: self.community.clone(),
            user: self.user.clone(),
            authpassword: self.authpassword.clone(),
            privpassword: self.privpassword.clone(),
            authprotocol: self.authprotocol.clone(),
            privprotocol: self.privprotocol.clone(),
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout).unwrap_or(crate::engine::DEFAULT_TIMEOUT)
    }

    /// The engine handle for this invocation.
    pub fn engine(&self) -> SnmpEngine {
        SnmpEngine::new()
            .with_timeout(self.timeout_duration())
            .with_retries(self.retries)
    }
}

/// Logging arguments.
#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Log more to stderr (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl OutputArgs {
    /// Initialize tracing on stderr; stdout is reserved for the status line.
    ///
    /// `RUST_LOG` overrides the verbosity flags.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = match self.verbose {
            0 => "snmp_probe=warn",
            1 => "snmp_probe=debug",
            _ => "snmp_probe=trace",
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
            )
            .with_writer(std::io::stderr)
            .try_init();
    }
}
