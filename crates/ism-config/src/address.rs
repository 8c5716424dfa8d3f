//! On-chain identifiers
//!
//! [`Address`] is a protocol-agnostic 32-byte account identifier. EVM
//! addresses occupy the low 20 bytes, left-padded with zeros.
//! [`DomainId`] is the stable numeric identifier of a chain and [`ChainId`]
//! pairs it with the registry name of the deployment target.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte module or account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address
    pub const ZERO: Self = Self([0; 32]);

    /// Create an address from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create an address from up to 32 bytes, left-padding shorter input
    ///
    /// # Errors
    /// Returns error if the slice is longer than 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() > 32 {
            return Err(AddressError::TooLong { len: bytes.len() });
        }
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Address derived from a 20-byte EVM account
    #[inline]
    #[must_use]
    pub fn from_evm(bytes: [u8; 20]) -> Self {
        let mut arr = [0u8; 32];
        arr[12..].copy_from_slice(&bytes);
        Self(arr)
    }

    /// Short form for logs (last 6 bytes)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        format!("0x…{}", hex::encode(&self.0[26..]))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() {
            return Err(AddressError::Empty);
        }
        if digits.len() > 64 {
            return Err(AddressError::TooLong {
                len: digits.len().div_ceil(2),
            });
        }
        let bytes = if digits.len() % 2 == 1 {
            hex::decode(format!("0{digits}"))?
        } else {
            hex::decode(digits)?
        };
        Self::from_slice(&bytes)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing an address
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    /// No hex digits
    #[error("empty address")]
    Empty,

    /// More than 32 bytes
    #[error("address too long: {len} bytes (max 32)")]
    TooLong { len: usize },

    /// Not hex
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Stable numeric identifier of a chain
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct DomainId(pub u32);

impl DomainId {
    /// Raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for DomainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DomainId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for DomainId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Deployment target: a registry name bound to its domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ChainId {
    name: String,
    domain: DomainId,
}

impl ChainId {
    /// Create a chain id
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, domain: DomainId) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }

    /// Registry name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric domain
    #[inline]
    #[must_use]
    pub fn domain(&self) -> DomainId {
        self.domain
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_hex_left_padded() {
        let addr: Address = "0xAAA".parse().unwrap();
        let mut expected = [0u8; 32];
        expected[30] = 0x0a;
        expected[31] = 0xaa;
        assert_eq!(addr.as_bytes(), &expected);
    }

    #[test]
    fn display_is_full_width_lowercase() {
        let addr: Address = "0xBBB".parse().unwrap();
        let s = addr.to_string();
        assert_eq!(s.len(), 66);
        assert!(s.ends_with("0bbb"));
        assert_eq!(s.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parses_without_prefix() {
        let a: Address = "ff".parse().unwrap();
        let b: Address = "0xff".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert_eq!("0x".parse::<Address>(), Err(AddressError::Empty));
        let long = format!("0x{}", "1".repeat(66));
        assert!(matches!(
            long.parse::<Address>(),
            Err(AddressError::TooLong { .. })
        ));
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressError::HexDecode(_))
        ));
    }

    #[test]
    fn evm_address_occupies_low_bytes() {
        let addr = Address::from_evm([0x11; 20]);
        assert_eq!(&addr.as_bytes()[..12], &[0u8; 12]);
        assert_eq!(&addr.as_bytes()[12..], &[0x11; 20]);
    }

    #[test]
    fn address_serde_as_string() {
        let addr: Address = "0x1234".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn chain_id_display() {
        let chain = ChainId::new("test1", DomainId(13371));
        assert_eq!(chain.to_string(), "test1 (13371)");
    }
}
