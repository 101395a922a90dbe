//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use snmp_probe::prelude::*;
//! ```
//!
//! This imports:
//! - Probe inputs: [`Configuration`], [`SecurityProfile`], [`SnmpVersion`]
//! - Queries: [`SnmpEngine`], [`get_scalar`], [`get_table`]
//! - Core types: [`Oid`], [`Value`], [`VarBind`], [`NameRegistry`]
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro for compile-time OID construction

pub use crate::config::Configuration;
pub use crate::engine::{Engine, SnmpEngine};
pub use crate::error::{Error, Result};
pub use crate::names::NameRegistry;
pub use crate::oid::Oid;
pub use crate::query::{get_scalar, get_table};
pub use crate::security::{SecurityProfile, SnmpVersion};
pub use crate::value::Value;
pub use crate::varbind::VarBind;

#[doc(no_inline)]
pub use crate::oid;
