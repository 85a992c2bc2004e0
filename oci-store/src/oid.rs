use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A content identifier for a commit object.
///
/// Most repositories use 20-byte (SHA-1) identifiers; repositories that have
/// migrated to the SHA-256 object format use 32 bytes. We keep both in one
/// type rather than parameterizing every caller over a hash algorithm.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Oid {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

#[derive(thiserror::Error, Debug)]
pub enum OidError {
    #[error("invalid object id `{0}`: expected 40 or 64 hex characters")]
    InvalidLength(String),
    #[error("invalid object id `{0}`: not valid hex")]
    InvalidHex(String),
}

impl Oid {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(b) => b.as_slice(),
            Self::Sha256(b) => b.as_slice(),
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({self})")
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes =
            hex::decode(s).map_err(|_| OidError::InvalidHex(s.to_owned()))?;
        match bytes.len() {
            20 => {
                let mut buf = [0u8; 20];
                buf.copy_from_slice(&bytes);
                Ok(Self::Sha1(buf))
            }
            32 => {
                let mut buf = [0u8; 32];
                buf.copy_from_slice(&bytes);
                Ok(Self::Sha256(buf))
            }
            _ => Err(OidError::InvalidLength(s.to_owned())),
        }
    }
}

impl Serialize for Oid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha1_round_trip() {
        let s = "a".repeat(40);
        let oid: Oid = s.parse().unwrap();
        assert!(matches!(oid, Oid::Sha1(_)));
        assert_eq!(oid.to_string(), s);
    }

    #[test]
    fn sha256_round_trip() {
        let s = "b".repeat(64);
        let oid: Oid = s.parse().unwrap();
        assert!(matches!(oid, Oid::Sha256(_)));
        assert_eq!(oid.to_string(), s);
    }

    #[test]
    fn rejects_bad_length() {
        assert!("abcd".parse::<Oid>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!("z".repeat(40).parse::<Oid>().is_err());
    }
}
