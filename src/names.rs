//! OID label resolution.
//!
//! A small built-in table of MIB object names, enough to give the probes'
//! OIDs a printable `MODULE::label.index` form. This is NOT MIB support:
//! there is no MIB parsing, only longest-prefix lookup over known nodes.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::oid::Oid;

/// Table columns: module, entry OID, column labels (column `n` is `labels[n - 1]`).
static BUILTIN_COLUMNS: &[(&str, &[u32], &[&str])] = &[
    (
        "SNMPv2-MIB",
        &[1, 3, 6, 1, 2, 1, 1],
        &[
            "sysDescr",
            "sysObjectID",
            "sysUpTime",
            "sysContact",
            "sysName",
            "sysLocation",
            "sysServices",
        ],
    ),
    (
        "IF-MIB",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1],
        &[
            "ifIndex",
            "ifDescr",
            "ifType",
            "ifMtu",
            "ifSpeed",
            "ifPhysAddress",
            "ifAdminStatus",
            "ifOperStatus",
            "ifLastChange",
            "ifInOctets",
            "ifInUcastPkts",
            "ifInNUcastPkts",
            "ifInDiscards",
            "ifInErrors",
            "ifInUnknownProtos",
            "ifOutOctets",
            "ifOutUcastPkts",
            "ifOutNUcastPkts",
            "ifOutDiscards",
            "ifOutErrors",
            "ifOutQLen",
            "ifSpecific",
        ],
    ),
    (
        "IF-MIB",
        &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1],
        &[
            "ifName",
            "ifInMulticastPkts",
            "ifInBroadcastPkts",
            "ifOutMulticastPkts",
            "ifOutBroadcastPkts",
            "ifHCInOctets",
            "ifHCInUcastPkts",
            "ifHCInMulticastPkts",
            "ifHCInBroadcastPkts",
            "ifHCOutOctets",
            "ifHCOutUcastPkts",
            "ifHCOutMulticastPkts",
            "ifHCOutBroadcastPkts",
            "ifLinkUpDownTrapEnable",
            "ifHighSpeed",
            "ifPromiscuousMode",
            "ifConnectorPresent",
            "ifAlias",
            "ifCounterDiscontinuityTime",
        ],
    ),
    (
        "HOST-RESOURCES-MIB",
        &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1],
        &[
            "hrStorageIndex",
            "hrStorageType",
            "hrStorageDescr",
            "hrStorageAllocationUnits",
            "hrStorageSize",
            "hrStorageUsed",
            "hrStorageAllocationFailures",
        ],
    ),
    (
        "HOST-RESOURCES-MIB",
        &[1, 3, 6, 1, 2, 1, 25, 3, 3, 1],
        &["hrProcessorFrwID", "hrProcessorLoad"],
    ),
    (
        "UCD-SNMP-MIB",
        &[1, 3, 6, 1, 4, 1, 2021, 10, 1],
        &["laIndex", "laNames", "laLoad", "laConfig", "laLoadInt", "laLoadFloat"],
    ),
    (
        "UBNT-UniFi-MIB",
        &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 1, 1],
        &[
            "unifiRadioIndex",
            "unifiRadioName",
            "unifiRadioRadio",
            "unifiRadioRxPackets",
            "unifiRadioTxPackets",
            "unifiRadioCuTotal",
            "unifiRadioCuSelfRx",
            "unifiRadioCuSelfTx",
            "unifiRadioOtherBss",
        ],
    ),
    (
        "UBNT-UniFi-MIB",
        &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 2, 1],
        &[
            "unifiVapIndex",
            "unifiVapBssId",
            "unifiVapCcq",
            "unifiVapChannel",
            "unifiVapExtChannel",
            "unifiVapEssId",
            "unifiVapName",
            "unifiVapNumStations",
            "unifiVapRadio",
        ],
    ),
    (
        "UBNT-UniFi-MIB",
        &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 3],
        &[
            "unifiApSystemIp",
            "unifiApSystemIsolated",
            "unifiApSystemModel",
            "unifiApSystemUplink",
            "unifiApSystemUptime",
            "unifiApSystemVersion",
        ],
    ),
];

/// Individual nodes that are not part of a contiguous column list.
static BUILTIN_NODES: &[(&str, &[u32], &str)] = &[
    ("SNMPv2-MIB", &[1, 3, 6, 1, 2, 1, 1], "system"),
    ("IF-MIB", &[1, 3, 6, 1, 2, 1, 2], "interfaces"),
    ("IF-MIB", &[1, 3, 6, 1, 2, 1, 2, 1], "ifNumber"),
    ("IF-MIB", &[1, 3, 6, 1, 2, 1, 2, 2], "ifTable"),
    ("IF-MIB", &[1, 3, 6, 1, 2, 1, 2, 2, 1], "ifEntry"),
    ("IF-MIB", &[1, 3, 6, 1, 2, 1, 31, 1, 1], "ifXTable"),
    ("IF-MIB", &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1], "ifXEntry"),
    ("HOST-RESOURCES-MIB", &[1, 3, 6, 1, 2, 1, 25, 1, 1], "hrSystemUptime"),
    ("HOST-RESOURCES-MIB", &[1, 3, 6, 1, 2, 1, 25, 2, 2], "hrMemorySize"),
    ("HOST-RESOURCES-MIB", &[1, 3, 6, 1, 2, 1, 25, 2, 3], "hrStorageTable"),
    ("HOST-RESOURCES-MIB", &[1, 3, 6, 1, 2, 1, 25, 3, 3], "hrProcessorTable"),
    ("UCD-SNMP-MIB", &[1, 3, 6, 1, 4, 1, 2021, 10], "laTable"),
    ("UCD-SNMP-MIB", &[1, 3, 6, 1, 4, 1, 2021, 10, 1, 100], "laErrorFlag"),
    ("UCD-SNMP-MIB", &[1, 3, 6, 1, 4, 1, 2021, 10, 1, 101], "laErrMessage"),
    ("UBNT-UniFi-MIB", &[1, 3, 6, 1, 4, 1, 41112], "ubnt"),
    ("UBNT-UniFi-MIB", &[1, 3, 6, 1, 4, 1, 41112, 1, 6], "unifiAp"),
    ("UBNT-UniFi-MIB", &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 1], "unifiRadioTable"),
    ("UBNT-UniFi-MIB", &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 2], "unifiVapTable"),
    ("UBNT-UniFi-MIB", &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 3], "unifiApSystem"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Name {
    module: String,
    label: String,
}

/// Longest-prefix map from OIDs to MIB object names.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    names: HashMap<Oid, Name>,
    longest: usize,
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NameRegistry {
    /// Registry preloaded with the built-in names.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (module, entry, labels) in BUILTIN_COLUMNS {
            let entry = Oid::from_slice(entry);
            for (column, label) in (1u32..).zip(labels.iter()) {
                registry.insert(entry.child(column), *module, *label);
            }
        }
        for (module, arcs, label) in BUILTIN_NODES {
            registry.insert(Oid::from_slice(arcs), *module, *label);
        }
        registry
    }

    /// Registry with no names at all.
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
            longest: 0,
        }
    }

    /// Register (or replace) the name of the node at `oid`.
    pub fn insert(&mut self, oid: Oid, module: impl Into<String>, label: impl Into<String>) {
        self.longest = self.longest.max(oid.len());
        self.names.insert(
            oid,
            Name {
                module: module.into(),
                label: label.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve `oid` against the longest registered prefix.
    pub fn resolve<'a>(&'a self, oid: &'a Oid) -> PrettyOid<'a> {
        let arcs = oid.arcs();
        let resolved = (1..=arcs.len().min(self.longest))
            .rev()
            .find_map(|len| {
                self.names
                    .get(&Oid::from_slice(&arcs[..len]))
                    .map(|name| (name, &arcs[len..]))
            });
        PrettyOid { oid, resolved }
    }

    /// Parse dotted notation or a registered name.
    ///
    /// Accepts `1.3.6.1.2.1.1.5.0`, `sysName.0` and `SNMPv2-MIB::sysName.0`.
    /// Names match case-insensitively.
    pub fn parse(&self, s: &str) -> Result<Oid> {
        if s.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return Oid::parse(s);
        }

        let (module, rest) = match s.split_once("::") {
            Some((module, rest)) => (Some(module), rest),
            None => (None, s),
        };
        let (label, index) = match rest.split_once('.') {
            Some((label, index)) => (label, Some(index)),
            None => (rest, None),
        };

        let unknown = || Error::configuration(format!("Unknown OID name {}", s));
        let (base, _) = self
            .names
            .iter()
            .find(|(_, name)| {
                name.label.eq_ignore_ascii_case(label)
                    && module.is_none_or(|m| name.module.eq_ignore_ascii_case(m))
            })
            .ok_or_else(unknown)?;

        let mut oid = base.clone();
        if let Some(index) = index {
            for arc in index.split('.') {
                oid = oid.child(arc.parse().map_err(|_| unknown())?);
            }
        }
        Ok(oid)
    }
}

/// An OID together with its resolved name, if any.
///
/// Displays as `MODULE::label.index`, `MODULE::label` when the OID names
/// the node itself, or dotted notation when nothing matched.
#[derive(Debug, Clone, Copy)]
pub struct PrettyOid<'a> {
    oid: &'a Oid,
    resolved: Option<(&'a Name, &'a [u32])>,
}

impl<'a> PrettyOid<'a> {
    pub fn oid(&self) -> &'a Oid {
        self.oid
    }

    pub fn module(&self) -> Option<&'a str> {
        self.resolved.map(|(name, _)| name.module.as_str())
    }

    pub fn label(&self) -> Option<&'a str> {
        self.resolved.map(|(name, _)| name.label.as_str())
    }

    /// Arcs after the named node.
    pub fn index(&self) -> &'a [u32] {
        match self.resolved {
            Some((_, index)) => index,
            None => &[],
        }
    }

    /// The label, when it starts with `pattern` and an instance index follows.
    ///
    /// Equivalent to [`extract_label`] on the printable form.
    pub fn matching_label(&self, pattern: &str) -> Option<&'a str> {
        let (name, index) = self.resolved?;
        (name.label.starts_with(pattern) && !index.is_empty()).then_some(name.label.as_str())
    }
}

impl fmt::Display for PrettyOid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((name, index)) = self.resolved else {
            return write!(f, "{}", self.oid);
        };
        write!(f, "{}::{}", name.module, name.label)?;
        for arc in index {
            write!(f, ".{}", arc)?;
        }
        Ok(())
    }
}

/// Find the label in a printable OID that starts with `pattern`.
///
/// The label is the text after a `::` separator, beginning with `pattern`
/// and running up to (not including) the next `.`. Without a following `.`
/// there is no match.
///
/// ```
/// use snmp_probe::names::extract_label;
///
/// assert_eq!(extract_label("IF-MIB::ifDescr.3", "if"), Some("ifDescr"));
/// assert_eq!(extract_label("IF-MIB::ifDescr", "if"), None);
/// assert_eq!(extract_label("1.3.6.1.2.1.2.2.1.2.3", "if"), None);
/// ```
pub fn extract_label<'a>(pretty: &'a str, pattern: &str) -> Option<&'a str> {
    pretty.match_indices("::").find_map(|(at, sep)| {
        let rest = &pretty[at + sep.len()..];
        let tail = rest.strip_prefix(pattern)?;
        let dot = tail.find('.')?;
        Some(&rest[..pattern.len() + dot])
    })
}
