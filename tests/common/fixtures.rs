//! Common test fixtures and constants.

use snmp_probe::{Configuration, Oid, Value, oid};
use std::collections::BTreeMap;

/// Community the test agent answers to.
pub const COMMUNITY: &str = "public";

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn sys_location() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)
}

/// ifTable column `column`.
pub fn if_column(column: u32) -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1).child(column)
}

/// UCD-SNMP-MIB laLoadFloat column.
pub fn la_load_float() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 2021, 10, 1, 6)
}

/// Opaque float content for `value`.
pub fn opaque_float(value: f32) -> Value {
    Value::Opaque(snmp_probe::opaque::encode_float(value))
}

/// A small agent MIB: system group, three interfaces, 1/5/15 minute load.
pub fn sample_mib() -> BTreeMap<Oid, Value> {
    let mut mib = BTreeMap::new();
    mib.insert(sys_descr(), Value::from("Linux ap-lobby 4.4.153"));
    mib.insert(sys_name(), Value::from("ap-lobby"));
    mib.insert(sys_location(), Value::from("Lobby"));

    for (index, descr, status) in [(1, "lo", 1), (2, "eth0", 1), (3, "ath0", 2)] {
        mib.insert(if_column(1).child(index), Value::Integer(index as i32));
        mib.insert(if_column(2).child(index), Value::from(descr));
        mib.insert(if_column(8).child(index), Value::Integer(status));
    }

    for (index, load) in [(1, 0.25f32), (2, 0.5), (3, 1.5)] {
        mib.insert(la_load_float().child(index), opaque_float(load));
    }
    mib
}

/// Community configuration for an agent listening on localhost.
pub fn local_config(port: u16) -> Configuration {
    Configuration::new("127.0.0.1")
        .with_port(port)
        .with_community(COMMUNITY)
}
