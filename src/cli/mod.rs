//! Command-line support for the probe binaries.
//!
//! This module is only available with the `cli` feature.

pub mod args;
