//! Contains the [PreimageKey] type, which is used to identify preimages that may be fetched from
//! the preimage oracle.

use crate::errors::PreimageOracleError;
use alloy_primitives::{keccak256, B256};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The type byte of a [PreimageKey]. Occupies the high-order byte of the rendered 32-byte key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PreimageKeyType {
    /// Local key types are local to a given session and context dependent. They identify the
    /// bootstrap data of the session, not a digest of any content.
    Local = 1,
    /// Keccak256 key types are global and context independent. Preimages are mapped from the
    /// low-order 31 bytes of the preimage's `keccak256` digest to the preimage itself.
    Keccak256 = 2,
}

impl TryFrom<u8> for PreimageKeyType {
    type Error = PreimageOracleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let key_type = match value {
            1 => Self::Local,
            2 => Self::Keccak256,
            _ => return Err(PreimageOracleError::InvalidPreimageKey),
        };
        Ok(key_type)
    }
}

/// A preimage key is a 32-byte value that identifies a preimage that may be fetched from the
/// oracle.
///
/// **Layout**:
/// | Variant        | Bytes `[0, 1)` | Bytes `[1, 24)` | Bytes `[24, 32)`        |
/// |----------------|----------------|-----------------|-------------------------|
/// | `Local(i)`     | `0x01`         | zero            | `i` as big-endian `u64` |
/// | `Keccak256(d)` | `0x02`         | `d[0..23]`      | `d[23..31]`             |
///
/// The keccak variant holds the low-order 31 bytes of the digest; the type byte replaces the
/// digest's high-order byte so the rendered key stays 32 bytes wide.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PreimageKey {
    /// A session-local index.
    Local(u64),
    /// The low-order 31 bytes of a `keccak256` digest.
    Keccak256([u8; 31]),
}

impl PreimageKey {
    /// Creates a new local [PreimageKey] from a 64-bit local identifier.
    pub const fn local(index: u64) -> Self {
        Self::Local(index)
    }

    /// Creates a [PreimageKeyType::Keccak256] key from a `keccak256` digest.
    pub fn keccak256(digest: B256) -> Self {
        Self::Keccak256(low_order_bytes(digest))
    }

    /// Derives the only valid [PreimageKeyType::Keccak256] key for `value`.
    pub fn for_keccak256_preimage(value: &[u8]) -> Self {
        Self::keccak256(keccak256(value))
    }

    /// Returns the [PreimageKeyType] for the [PreimageKey].
    pub const fn key_type(&self) -> PreimageKeyType {
        match self {
            Self::Local(_) => PreimageKeyType::Local,
            Self::Keccak256(_) => PreimageKeyType::Keccak256,
        }
    }

    /// Returns `true` if `value` may be stored under this key. Local keys accept any value;
    /// keccak keys only accept the value whose digest they were derived from.
    pub fn verify(&self, value: &[u8]) -> bool {
        match self {
            Self::Local(_) => true,
            Self::Keccak256(_) => *self == Self::for_keccak256_preimage(value),
        }
    }
}

fn low_order_bytes(digest: B256) -> [u8; 31] {
    let mut data = [0u8; 31];
    data.copy_from_slice(&digest[1..]);
    data
}

impl From<PreimageKey> for [u8; 32] {
    fn from(key: PreimageKey) -> Self {
        let mut rendered_key = [0u8; 32];
        rendered_key[0] = key.key_type() as u8;
        match key {
            PreimageKey::Local(index) => rendered_key[24..].copy_from_slice(&index.to_be_bytes()),
            PreimageKey::Keccak256(data) => rendered_key[1..].copy_from_slice(&data),
        }
        rendered_key
    }
}

impl From<PreimageKey> for B256 {
    fn from(value: PreimageKey) -> Self {
        let raw: [u8; 32] = value.into();
        Self::from(raw)
    }
}

impl TryFrom<[u8; 32]> for PreimageKey {
    type Error = PreimageOracleError;

    fn try_from(value: [u8; 32]) -> Result<Self, Self::Error> {
        match PreimageKeyType::try_from(value[0])? {
            PreimageKeyType::Local => {
                if value[1..24].iter().any(|b| *b != 0) {
                    return Err(PreimageOracleError::InvalidPreimageKey);
                }
                let mut index = [0u8; 8];
                index.copy_from_slice(&value[24..]);
                Ok(Self::Local(u64::from_be_bytes(index)))
            }
            PreimageKeyType::Keccak256 => {
                let mut data = [0u8; 31];
                data.copy_from_slice(&value[1..]);
                Ok(Self::Keccak256(data))
            }
        }
    }
}

impl TryFrom<B256> for PreimageKey {
    type Error = PreimageOracleError;

    fn try_from(value: B256) -> Result<Self, Self::Error> {
        Self::try_from(value.0)
    }
}

impl core::fmt::Display for PreimageKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", B256::from(*self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_local_key_layout() {
        let key: [u8; 32] = PreimageKey::local(0x0102).into();

        let mut expected = [0u8; 32];
        expected[0] = 0x01;
        expected[30] = 0x01;
        expected[31] = 0x02;
        assert_eq!(key, expected);
    }

    #[test]
    fn test_keccak_key_replaces_high_order_byte() {
        let value = 1000u64.to_be_bytes();
        let digest = keccak256(value);

        let key: [u8; 32] = PreimageKey::for_keccak256_preimage(&value).into();
        assert_eq!(key[0], PreimageKeyType::Keccak256 as u8);
        assert_eq!(key[1..], digest[1..]);
    }

    #[test]
    fn test_preimage_keys_decode() {
        let keys = [
            PreimageKey::local(0),
            PreimageKey::local(u64::MAX),
            PreimageKey::keccak256(B256::repeat_byte(0xFF)),
        ];

        for key in keys {
            let rendered: [u8; 32] = key.into();
            assert_eq!(PreimageKey::try_from(rendered).unwrap(), key);
        }
    }

    #[test]
    fn test_invalid_key_type() {
        for type_byte in [0u8, 3, 4, 5, 6, 0xFF] {
            let mut raw = [0u8; 32];
            raw[0] = type_byte;
            assert!(matches!(
                PreimageKey::try_from(raw),
                Err(PreimageOracleError::InvalidPreimageKey)
            ));
        }
    }

    #[test]
    fn test_local_key_with_high_bits_is_invalid() {
        let mut raw: [u8; 32] = PreimageKey::local(7).into();
        raw[5] = 1;
        assert!(PreimageKey::try_from(raw).is_err());
    }

    #[test]
    fn test_verify() {
        let value = b"preimage";
        assert!(PreimageKey::for_keccak256_preimage(value).verify(value));
        assert!(!PreimageKey::for_keccak256_preimage(value).verify(b"other"));
        assert!(PreimageKey::local(3).verify(b"anything"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PreimageKey::local(2).to_string(),
            "0x0100000000000000000000000000000000000000000000000000000000000002"
        );
    }
}
