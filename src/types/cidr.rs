//! IPv4 CIDR blocks for the network topology.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SynthError;

/// An IPv4 address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    /// The open block, `0.0.0.0/0`.
    pub const ANY: Cidr = Cidr {
        addr: Ipv4Addr::new(0, 0, 0, 0),
        prefix: 0,
    };

    /// Construct from an address and prefix length.
    ///
    /// The topology blocks are fixed constants, so the constructor stays
    /// infallible; a prefix above 32 is a bad constant and asserts in debug
    /// builds rather than quietly clamping.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Self {
        debug_assert!(prefix <= 32, "prefix /{prefix} is not a valid IPv4 length");
        Cidr {
            addr,
            prefix: prefix.min(32),
        }
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    /// First address of the block.
    fn first(&self) -> u32 {
        u32::from(self.addr) & self.mask()
    }

    /// Last address of the block.
    fn last(&self) -> u32 {
        self.first() | !self.mask()
    }

    /// Whether `other` is fully contained in this block.
    pub fn contains(&self, other: &Cidr) -> bool {
        self.first() <= other.first() && other.last() <= self.last()
    }

    /// Whether the two blocks share any address.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }
}

impl Display for Cidr {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SynthError::InvalidReference(format!("invalid CIDR block `{s}`"));
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix > 32 {
            return Err(invalid());
        }
        Ok(Cidr { addr, prefix })
    }
}

impl Serialize for Cidr {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(de)?;
        raw.parse().map_err(|e: SynthError| D::Error::custom(e))
    }
}

#[cfg(test)]
mod tests {
    use yare::parameterized;

    use super::*;

    #[parameterized(
        vpc = { "10.0.0.0/16", 16 },
        subnet = { "10.0.1.0/24", 24 },
        open = { "0.0.0.0/0", 0 },
        host = { "192.0.2.1/32", 32 },
    )]
    fn test_parse_and_display_round_trip(text: &str, prefix: u8) {
        let cidr: Cidr = text.parse().unwrap();
        assert_eq!(cidr.prefix(), prefix);
        assert_eq!(cidr.to_string(), text);
    }

    #[parameterized(
        no_slash = { "10.0.0.0" },
        bad_prefix = { "10.0.0.0/33" },
        bad_addr = { "10.0.0/16" },
        empty = { "" },
    )]
    fn test_parse_rejects_malformed_blocks(text: &str) {
        assert!(matches!(
            text.parse::<Cidr>(),
            Err(SynthError::InvalidReference(_))
        ));
    }

    #[test]
    #[should_panic(expected = "not a valid IPv4 length")]
    fn test_constructing_with_an_oversized_prefix_asserts() {
        let _ = Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 33);
    }

    #[test]
    fn test_containment() {
        let vpc: Cidr = "10.0.0.0/16".parse().unwrap();
        let subnet: Cidr = "10.0.1.0/24".parse().unwrap();
        let outside: Cidr = "10.1.0.0/24".parse().unwrap();

        assert!(vpc.contains(&subnet));
        assert!(!vpc.contains(&outside));
        assert!(!subnet.contains(&vpc));
        assert!(Cidr::ANY.contains(&vpc));
    }

    #[test]
    fn test_overlap_is_symmetric_and_strict() {
        let a: Cidr = "10.0.0.0/24".parse().unwrap();
        let b: Cidr = "10.0.1.0/24".parse().unwrap();
        let wide: Cidr = "10.0.0.0/16".parse().unwrap();

        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(wide.overlaps(&a));
        assert!(a.overlaps(&wide));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_serializes_as_string() {
        let cidr: Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(serde_json::to_value(cidr).unwrap(), "10.0.0.0/16");
    }
}
