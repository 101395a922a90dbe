//! Shared test utilities for snmp-probe integration tests.

// Not every test file uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

mod agent;
mod fixtures;

pub use agent::*;
pub use fixtures::*;
