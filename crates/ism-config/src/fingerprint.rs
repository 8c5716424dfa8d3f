//! Content fingerprints
//!
//! Provides [`Fingerprint`], a strongly-typed 32-byte Blake3 digest used to
//! identify module configurations by content, and [`CanonicalHasher`], the
//! length-delimited encoder every fingerprint is computed through.

use crate::address::{Address, DomainId};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const FINGERPRINT_CONTEXT: &str = "ism-config 2024 module fingerprint v1";

/// A 32-byte content fingerprint (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from raw bytes
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

    /// Create fingerprint from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        if bytes.len() != 32 {
            return Err(FingerprintError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct FingerprintVisitor;

        impl<'de> serde::de::Visitor<'de> for FingerprintVisitor {
            type Value = Fingerprint;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 32-byte fingerprint as hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Fingerprint::from_slice(value).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(FingerprintVisitor)
        } else {
            deserializer.deserialize_bytes(FingerprintVisitor)
        }
    }
}

/// Canonical, length-delimited encoder feeding a keyed Blake3 hasher
///
/// Every variable-length field is prefixed with its element count so that
/// distinct field layouts never produce the same byte stream.
#[derive(Debug, Clone)]
pub struct CanonicalHasher {
    inner: blake3::Hasher,
}

impl CanonicalHasher {
    /// Start a new fingerprint computation
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new_derive_key(FINGERPRINT_CONTEXT),
        }
    }

    /// Write a single tag byte
    pub fn tag(&mut self, tag: u8) -> &mut Self {
        self.inner.update(&[tag]);
        self
    }

    /// Write a big-endian u32
    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.inner.update(&value.to_be_bytes());
        self
    }

    /// Write a length prefix
    pub fn count(&mut self, len: usize) -> &mut Self {
        self.inner.update(&(len as u64).to_be_bytes());
        self
    }

    /// Write a domain id
    pub fn domain(&mut self, domain: DomainId) -> &mut Self {
        self.u32(domain.get())
    }

    /// Write an address
    pub fn address(&mut self, address: &Address) -> &mut Self {
        self.inner.update(address.as_bytes());
        self
    }

    /// Write a count-prefixed address list
    pub fn addresses(&mut self, addresses: &[Address]) -> &mut Self {
        self.count(addresses.len());
        for address in addresses {
            self.address(address);
        }
        self
    }

    /// Write a nested fingerprint
    pub fn fingerprint(&mut self, fingerprint: &Fingerprint) -> &mut Self {
        self.inner.update(fingerprint.as_bytes());
        self
    }

    /// Write a count-prefixed string
    pub fn str(&mut self, value: &str) -> &mut Self {
        self.count(value.len());
        self.inner.update(value.as_bytes());
        self
    }

    /// Finish and produce the fingerprint
    #[must_use]
    pub fn finish(&self) -> Fingerprint {
        Fingerprint::new(*self.inner.finalize().as_bytes())
    }
}

impl Default for CanonicalHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when working with fingerprints
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Invalid length
    #[error("invalid fingerprint length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_from_slice_invalid_length() {
        let result = Fingerprint::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(FingerprintError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn hasher_is_deterministic() {
        let a = CanonicalHasher::new().tag(4).u32(2).finish();
        let b = CanonicalHasher::new().tag(4).u32(2).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn length_prefix_separates_layouts() {
        let x = Address::new([1; 32]);
        let y = Address::new([2; 32]);
        let one_list = CanonicalHasher::new().addresses(&[x, y]).addresses(&[]).finish();
        let two_lists = CanonicalHasher::new().addresses(&[x]).addresses(&[y]).finish();
        assert_ne!(one_list, two_lists);
    }

    #[test]
    fn fingerprint_display_and_parse() {
        let fp = CanonicalHasher::new().str("test").finish();
        let parsed: Fingerprint = fp.to_string().parse().unwrap();
        assert_eq!(fp, parsed);
        assert!(fp.to_string().starts_with(&fp.short()));
    }

    #[test]
    fn fingerprint_serde_json() {
        let fp = CanonicalHasher::new().tag(7).finish();
        let json = serde_json::to_string(&fp).unwrap();
        let decoded: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, decoded);
    }
}
