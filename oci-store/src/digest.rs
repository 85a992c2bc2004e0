use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// A content digest identifying an OCI blob, e.g. `sha256:9f86d0...`.
///
/// The helper only ever produces and consumes `sha256` digests; other
/// algorithms are preserved verbatim when read back from a registry (a
/// manifest we didn't write ourselves may use a different one) but we can't
/// construct them locally.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

#[derive(thiserror::Error, Debug)]
pub enum DigestError {
    #[error("malformed digest `{0}`: expected `<algorithm>:<hex>`")]
    Malformed(String),
    #[error("i/o error computing digest: {0}")]
    Io(#[from] io::Error),
}

impl Digest {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Compute the `sha256` digest of a byte slice.
    pub fn sha256(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self {
            algorithm: "sha256".to_owned(),
            hex: hex::encode(digest),
        }
    }

    /// Compute the `sha256` digest of a reader, consuming it.
    pub fn sha256_reader(mut r: impl Read) -> Result<Self, DigestError> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = r.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self {
            algorithm: "sha256".to_owned(),
            hex: hex::encode(hasher.finalize()),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| DigestError::Malformed(s.to_owned()))?;
        if algorithm.is_empty() || hex.is_empty() {
            return Err(DigestError::Malformed(s.to_owned()));
        }
        Ok(Self {
            algorithm: algorithm.to_owned(),
            hex: hex.to_owned(),
        })
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
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
    fn sha256_is_reproducible() {
        let a = Digest::sha256(b"hello world");
        let b = Digest::sha256(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), format!("sha256:{}", a.hex()));
    }

    #[test]
    fn round_trips_through_display() {
        let d = Digest::sha256(b"content");
        let parsed: Digest = d.to_string().parse().unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn rejects_malformed() {
        assert!("not-a-digest".parse::<Digest>().is_err());
    }
}
