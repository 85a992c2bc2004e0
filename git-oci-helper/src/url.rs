//! Parsing for the `oci://<registry-host>/<repo-path>[:<tag>]` remote URL
//! git hands the helper as its second argument. A dedicated `FromStr` impl
//! rather than a generic URL crate, matching the teacher's handling of its
//! own scheme-specific `rad://` address.

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TAG: &str = "latest";
const SCHEME: &str = "oci://";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("missing `{SCHEME}` scheme in `{0}`")]
    MissingScheme(String),
    #[error("missing registry host in `{0}`")]
    MissingHost(String),
    #[error("missing repository path in `{0}`")]
    MissingRepoPath(String),
}

/// `oci://registry.example.com/org/repo:v1` → host `registry.example.com`,
/// repo path `org/repo`, tag `v1` (defaulting to [`DEFAULT_TAG`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OciUrl {
    pub host: String,
    pub repo_path: String,
    pub tag: String,
}

impl OciUrl {
    pub fn reference(&self) -> String {
        format!("{}/{}:{}", self.host, self.repo_path, self.tag)
    }
}

impl fmt::Display for OciUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}", self.reference())
    }
}

impl FromStr for OciUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| UrlError::MissingScheme(s.to_string()))?;
        let (host, path) = rest
            .split_once('/')
            .ok_or_else(|| UrlError::MissingHost(s.to_string()))?;
        if host.is_empty() {
            return Err(UrlError::MissingHost(s.to_string()));
        }
        if path.is_empty() {
            return Err(UrlError::MissingRepoPath(s.to_string()));
        }
        let (repo_path, tag) = match path.rsplit_once(':') {
            Some((repo_path, tag)) if !repo_path.is_empty() => {
                (repo_path.to_string(), tag.to_string())
            }
            _ => (path.to_string(), DEFAULT_TAG.to_string()),
        };
        Ok(Self {
            host: host.to_string(),
            repo_path,
            tag,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_host_path_and_tag() {
        let url: OciUrl = "oci://registry.example.com/org/repo:v1".parse().unwrap();
        assert_eq!(url.host, "registry.example.com");
        assert_eq!(url.repo_path, "org/repo");
        assert_eq!(url.tag, "v1");
    }

    #[test]
    fn defaults_tag_when_absent() {
        let url: OciUrl = "oci://registry.example.com/org/repo".parse().unwrap();
        assert_eq!(url.tag, DEFAULT_TAG);
    }

    #[test]
    fn rejects_missing_scheme() {
        assert_eq!(
            "registry.example.com/org/repo".parse::<OciUrl>(),
            Err(UrlError::MissingScheme(
                "registry.example.com/org/repo".to_string()
            ))
        );
    }

    #[test]
    fn rejects_missing_repo_path() {
        assert_eq!(
            "oci://registry.example.com".parse::<OciUrl>(),
            Err(UrlError::MissingHost("oci://registry.example.com".to_string()))
        );
    }

    #[test]
    fn round_trips_through_display() {
        let url = OciUrl {
            host: "reg".into(),
            repo_path: "a/b".into(),
            tag: "latest".into(),
        };
        assert_eq!(url.to_string(), "oci://reg/a/b:latest");
    }
}
