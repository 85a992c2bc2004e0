use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A VCS reference name, restricted to the namespaces this system projects
/// onto the OCI manifest graph (spec §3.1): branches, tags, and the
/// symbolic `HEAD`. Any other namespace (`refs/notes/*`, `refs/remotes/*`,
/// ...) is rejected at the boundary rather than carried around as a bare
/// string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefName {
    Branch(String),
    Tag(String),
    Head,
}

#[derive(thiserror::Error, Debug)]
pub enum RefNameError {
    #[error("unsupported reference namespace: `{0}`")]
    UnsupportedNamespace(String),
    #[error("empty reference name")]
    Empty,
}

impl RefName {
    /// The namespace this reference lives in (`heads` or `tags`), or `None`
    /// for `HEAD`.
    pub fn namespace(&self) -> Option<&'static str> {
        match self {
            Self::Branch(_) => Some("heads"),
            Self::Tag(_) => Some("tags"),
            Self::Head => None,
        }
    }

    /// The short name, without the `refs/<namespace>/` prefix.
    pub fn short_name(&self) -> &str {
        match self {
            Self::Branch(name) | Self::Tag(name) => name,
            Self::Head => "HEAD",
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag(_))
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "refs/heads/{name}"),
            Self::Tag(name) => write!(f, "refs/tags/{name}"),
            Self::Head => write!(f, "HEAD"),
        }
    }
}

impl fmt::Debug for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefName({self})")
    }
}

impl FromStr for RefName {
    type Err = RefNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "HEAD" {
            return Ok(Self::Head);
        }
        if let Some(name) = s.strip_prefix("refs/heads/") {
            if name.is_empty() {
                return Err(RefNameError::Empty);
            }
            return Ok(Self::Branch(name.to_owned()));
        }
        if let Some(name) = s.strip_prefix("refs/tags/") {
            if name.is_empty() {
                return Err(RefNameError::Empty);
            }
            return Ok(Self::Tag(name.to_owned()));
        }
        Err(RefNameError::UnsupportedNamespace(s.to_owned()))
    }
}

impl Serialize for RefName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RefName {
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
    fn parses_branch_and_tag() {
        assert_eq!(
            "refs/heads/main".parse::<RefName>().unwrap(),
            RefName::Branch("main".into())
        );
        assert_eq!(
            "refs/tags/v1".parse::<RefName>().unwrap(),
            RefName::Tag("v1".into())
        );
        assert_eq!("HEAD".parse::<RefName>().unwrap(), RefName::Head);
    }

    #[test]
    fn round_trips_to_display() {
        for s in ["refs/heads/main", "refs/tags/v1", "HEAD"] {
            let r: RefName = s.parse().unwrap();
            assert_eq!(r.to_string(), s);
        }
    }

    #[test]
    fn rejects_other_namespaces() {
        assert!("refs/notes/commits".parse::<RefName>().is_err());
        assert!("refs/remotes/origin/main".parse::<RefName>().is_err());
    }

    #[test]
    fn rejects_empty_short_name() {
        assert!("refs/heads/".parse::<RefName>().is_err());
    }
}
