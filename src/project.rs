//! Turning variable bindings into keyed records.
//!
//! Keys come from the resolved MIB label of each binding's OID (see
//! [`PrettyOid::matching_label`](crate::names::PrettyOid::matching_label)),
//! so the label pattern doubles as a column filter. When two bindings
//! yield the same key the later one wins.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::names::NameRegistry;
use crate::opaque;
use crate::value::hex_string;
use crate::varbind::VarBind;

/// Key holding the dotted OID in raw output.
pub const RAW_OID_KEY: &str = "oid";

/// Key holding the resolved OID name in raw output.
pub const RAW_PRETTY_OID_KEY: &str = "pretty_oid";

/// A decoded record value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Printable rendering of a value.
    Text(String),
    /// Raw value octets.
    Raw(Bytes),
    /// A decoded float.
    Float(f32),
}

impl Field {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Bytes> {
        match self {
            Field::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    /// The value as an opaque float.
    ///
    /// Text is taken to be the printable hex form; raw octets the Opaque
    /// content. Fails with [`Error::Format`](crate::Error::Format) otherwise.
    pub fn to_float(&self) -> Result<f32> {
        match self {
            Field::Float(value) => Ok(*value),
            Field::Text(text) => opaque::decode_float(text),
            Field::Raw(raw) => opaque::decode_float_octets(raw),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text(text) => f.write_str(text),
            Field::Raw(raw) => f.write_str(&hex_string(raw)),
            Field::Float(value) => write!(f, "{}", value),
        }
    }
}

/// Label to value. Iterates in key order.
pub type Record = BTreeMap<String, Field>;

/// Insert every binding whose label starts with `pattern`.
fn project_into(record: &mut Record, registry: &NameRegistry, bindings: &[VarBind], pattern: &str) {
    for vb in bindings {
        let pretty = registry.resolve(&vb.oid);
        if let Some(label) = pretty.matching_label(pattern) {
            record.insert(label.to_string(), Field::Text(vb.value.to_string()));
        }
    }
}

/// Project one scalar response.
///
/// With `raw_output`, every binding overwrites [`RAW_OID_KEY`],
/// [`RAW_PRETTY_OID_KEY`] and `pattern` (holding the raw value octets),
/// so the record describes the last binding.
pub fn project_scalar(
    registry: &NameRegistry,
    bindings: &[VarBind],
    pattern: &str,
    raw_output: bool,
) -> Record {
    let mut record = Record::new();
    if raw_output {
        for vb in bindings {
            record.insert(RAW_OID_KEY.to_string(), Field::Text(vb.oid.to_string()));
            record.insert(
                RAW_PRETTY_OID_KEY.to_string(),
                Field::Text(registry.resolve(&vb.oid).to_string()),
            );
            record.insert(pattern.to_string(), Field::Raw(vb.value.as_octets()));
        }
    } else {
        project_into(&mut record, registry, bindings, pattern);
    }
    record
}

/// Project a table walk, one record per row.
///
/// Rows without a single matching binding still produce an (empty) record,
/// so record `n` always corresponds to row `n`.
pub fn project_table(registry: &NameRegistry, rows: &[Vec<VarBind>], pattern: &str) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            let mut record = Record::new();
            project_into(&mut record, registry, row, pattern);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::oid::Oid;
    use crate::value::Value;
    use proptest::prelude::*;

    fn vb(oid: Oid, value: impl Into<Value>) -> VarBind {
        VarBind::new(oid, value.into())
    }

    #[test]
    fn test_scalar_keys_by_label() {
        let mut registry = NameRegistry::new();
        registry.insert(oid!(1, 3, 6, 1, 4, 1, 99999, 1), "VENDOR-MIB", "cpuTemp0");
        let bindings = [vb(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0), 45)];

        let record = project_scalar(&registry, &bindings, "cpuTemp", false);
        assert_eq!(record.len(), 1);
        assert_eq!(record["cpuTemp0"], Field::Text("45".into()));
    }

    #[test]
    fn test_scalar_pattern_filters_bindings() {
        let registry = NameRegistry::new();
        let bindings = [
            vb(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), "ap-lobby"),
            vb(oid!(1, 3, 6, 1, 2, 1, 1, 6, 0), "Lobby"),
            vb(oid!(1, 3, 6, 1, 99, 0), "unnamed"),
        ];

        let record = project_scalar(&registry, &bindings, "sysN", false);
        assert_eq!(record.keys().collect::<Vec<_>>(), ["sysName"]);

        let record = project_scalar(&registry, &bindings, "sys", false);
        assert_eq!(record.len(), 2);
        assert_eq!(record["sysLocation"].as_text(), Some("Lobby"));
    }

    #[test]
    fn test_scalar_last_write_wins() {
        let registry = NameRegistry::new();
        let bindings = [
            vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1), "lo"),
            vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2), "eth0"),
        ];
        let record = project_scalar(&registry, &bindings, "ifDescr", false);
        assert_eq!(record["ifDescr"].as_text(), Some("eth0"));
    }

    #[test]
    fn test_scalar_raw_output() {
        let registry = NameRegistry::new();
        let load = oid!(1, 3, 6, 1, 4, 1, 2021, 10, 1, 6, 1);
        let bindings = [vb(load.clone(), Value::Opaque(opaque::encode_float(0.25)))];

        let record = project_scalar(&registry, &bindings, "load", true);
        assert_eq!(record[RAW_OID_KEY].as_text(), Some("1.3.6.1.4.1.2021.10.1.6.1"));
        assert_eq!(
            record[RAW_PRETTY_OID_KEY].as_text(),
            Some("UCD-SNMP-MIB::laLoadFloat.1")
        );
        assert_eq!(record["load"].as_raw().map(|b| b.len()), Some(7));
        assert_eq!(record["load"].to_float().unwrap(), 0.25);
    }

    #[test]
    fn test_printable_opaque_decodes_too() {
        let registry = NameRegistry::new();
        let bindings = [vb(
            oid!(1, 3, 6, 1, 4, 1, 2021, 10, 1, 6, 2),
            Value::Opaque(opaque::encode_float(1.5)),
        )];
        let record = project_scalar(&registry, &bindings, "laLoadFloat", false);
        assert_eq!(record["laLoadFloat"].as_text(), Some("0x9f78043fc00000"));
        assert_eq!(record["laLoadFloat"].to_float().unwrap(), 1.5);
        assert!(Field::Text("45".into()).to_float().is_err());
    }

    #[test]
    fn test_table_rows_keep_position() {
        let registry = NameRegistry::new();
        let rows = vec![
            vec![
                vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1), "lo"),
                vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 1), 1),
            ],
            vec![vb(oid!(1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 3, 1), "Physical memory")],
            vec![
                vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2), "eth0"),
                vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 2), 2),
            ],
        ];

        let records = project_table(&registry, &rows, "if");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["ifOperStatus"].as_text(), Some("1"));
        assert!(records[1].is_empty());
        assert_eq!(records[2]["ifDescr"].as_text(), Some("eth0"));
    }

    proptest! {
        #[test]
        fn table_projection_preserves_row_count(
            rows in prop::collection::vec(
                prop::collection::vec((1u32..30, 1u32..5, any::<i32>()), 0..4),
                0..16,
            ),
            pattern in prop::sample::select(vec!["if", "ifDescr", "sys", "", "zzz"]),
        ) {
            let registry = NameRegistry::new();
            let rows: Vec<Vec<VarBind>> = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(column, index, value)| {
                            vb(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1).child(column).child(index), value)
                        })
                        .collect()
                })
                .collect();
            prop_assert_eq!(project_table(&registry, &rows, pattern).len(), rows.len());
        }
    }
}
