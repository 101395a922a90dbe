//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.

use crate::error::internal::DecodeErrorKind;
use crate::error::{Error, OidErrorKind, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted notation.
    ///
    /// A single leading dot is accepted (`.1.3.6.1.2.1.1.1.0`), as printed by
    /// net-snmp tools. Empty interior arcs are rejected.
    ///
    /// ```
    /// use snmp_probe::oid::Oid;
    ///
    /// let oid = Oid::parse(".1.3.6.1.2.1.1.1.0").unwrap();
    /// assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
    /// assert!(Oid::parse("1.3..6").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let arcs = body
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<std::result::Result<SmallVec<[u32; 16]>, _>>()
            .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;

        let oid = Self { arcs };
        if let Some(kind) = oid.violation() {
            return Err(Error::invalid_oid_with_input(kind, s));
        }
        Ok(oid)
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.starts_with(&other.arcs)
    }

    /// Arcs following `prefix`, if `self` lies under it.
    ///
    /// ```
    /// use snmp_probe::oid;
    ///
    /// let if_descr_3 = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 3);
    /// assert_eq!(if_descr_3.suffix_after(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2)), Some(&[3][..]));
    /// assert_eq!(if_descr_3.suffix_after(&oid!(1, 3, 6, 1, 2, 1, 1)), None);
    /// ```
    pub fn suffix_after(&self, prefix: &Oid) -> Option<&[u32]> {
        self.arcs.strip_prefix(&prefix.arcs[..])
    }

    /// Create a child OID by appending an arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Validate arc constraints (X.690 Section 8.19.4) and the arc count limit.
    pub fn validate(&self) -> Result<()> {
        match self.violation() {
            Some(kind) => Err(Error::invalid_oid(kind)),
            None => Ok(()),
        }
    }

    fn violation(&self) -> Option<OidErrorKind> {
        if self.arcs.len() > MAX_OID_LEN {
            return Some(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            });
        }
        match self.arcs[..] {
            [] => None,
            [first, ..] if first > 2 => Some(OidErrorKind::InvalidFirstArc(first)),
            [first, second, ..] if first < 2 && second >= 40 => {
                Some(OidErrorKind::InvalidSecondArc { first, second })
            }
            _ => None,
        }
    }

    /// Encode to BER content octets (X.690 Section 8.19).
    ///
    /// The first two arcs share one subidentifier (`arc1 * 40 + arc2`);
    /// every subidentifier is base-128 with continuation bits.
    pub fn to_ber(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();
        let (head, tail) = match self.arcs[..] {
            [] => return bytes,
            [first] => (first * 40, &[][..]),
            [first, second, ref rest @ ..] => (first * 40 + second, rest),
        };
        push_subidentifier(&mut bytes, head);
        for &arc in tail {
            push_subidentifier(&mut bytes, arc);
        }
        bytes
    }

    /// Decode from BER content octets.
    ///
    /// Enforces [`MAX_OID_LEN`].
    pub(crate) fn from_ber(data: &[u8]) -> std::result::Result<Self, DecodeErrorKind> {
        let mut arcs: SmallVec<[u32; 16]> = SmallVec::new();
        let mut rest = data;

        while !rest.is_empty() {
            let (value, consumed) = read_subidentifier(rest)?;
            rest = &rest[consumed..];

            if arcs.is_empty() {
                let first = (value / 40).min(2);
                arcs.push(first);
                arcs.push(value - first * 40);
            } else {
                arcs.push(value);
            }

            if arcs.len() > MAX_OID_LEN {
                return Err(DecodeErrorKind::OidTooLong {
                    count: arcs.len(),
                    max: MAX_OID_LEN,
                });
            }
        }

        Ok(Self { arcs })
    }
}

fn push_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u32) {
    let groups = (32 - value.leading_zeros()).div_ceil(7).max(1);
    for i in (0..groups).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

fn read_subidentifier(data: &[u8]) -> std::result::Result<(u32, usize), DecodeErrorKind> {
    let mut value: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if value > (u32::MAX >> 7) {
            return Err(DecodeErrorKind::InvalidOidEncoding);
        }
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeErrorKind::TruncatedData)
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.arcs.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{}", first)?;
        }
        for arc in arcs {
            write!(f, ".{}", arc)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

/// Macro to create an OID from literal arcs.
///
/// ```
/// use snmp_probe::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}
