//! # snmp-probe
//!
//! Building blocks for Nagios-style SNMP health checks.
//!
//! A probe validates its [`Configuration`], builds a [`SecurityProfile`],
//! reads scalars or table columns through an [`Engine`], projects the
//! bindings into label-keyed records and finishes with a one-line
//! [`Report`](verdict::Report).
//!
//! ```rust,no_run
//! use snmp_probe::prelude::*;
//! use snmp_probe::project::project_scalar;
//! use snmp_probe::verdict::report;
//!
//! # async fn probe() -> snmp_probe::Result<()> {
//! let config = Configuration::new("192.0.2.1").with_community("public");
//! config.validate()?;
//! let profile = SecurityProfile::build(&config, SnmpVersion::V2c)?;
//!
//! let engine = SnmpEngine::new();
//! let bindings = get_scalar(&engine, &config, &profile, &[oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)]).await?;
//! let record = project_scalar(&NameRegistry::new(), &bindings, "sysName", false);
//! let name = record.get("sysName").map(ToString::to_string).unwrap_or_default();
//!
//! let outcome = report("OK", format!("SNMP OK - {}", name));
//! assert_eq!(outcome.exit_code(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `cli`: argument parsing and logging setup for the probe binaries
//! - `firmware`: UniFi firmware lookup (`check-ubnt-firmware`)
//! - `testing`: exposes `transport::MockTransport` outside this crate

pub mod ber;
pub mod config;
pub mod engine;
pub mod error;
pub mod message;
pub mod names;
pub mod oid;
pub mod opaque;
pub mod pdu;
pub mod prelude;
pub mod project;
pub mod query;
pub mod security;
pub mod transport;
pub mod v3;
pub mod value;
pub mod varbind;
pub mod verdict;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "firmware")]
pub mod firmware;

pub use config::Configuration;
pub use engine::{Engine, Response, SnmpEngine, Target};
pub use error::{Error, ErrorStatus, Result};
pub use names::NameRegistry;
pub use oid::Oid;
pub use query::{get_scalar, get_table};
pub use security::{SecurityProfile, SnmpVersion};
pub use value::Value;
pub use varbind::VarBind;
