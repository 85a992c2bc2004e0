//! Request and response vocabulary for the VCS remote-helper line protocol
//! (spec §4.1.1). Every line the helper may read or write has a tagged type
//! here with a parser from whitespace-separated fields and a formatter back
//! to the wire; there is no shared "generic command" type with optional
//! fields, since each request kind has a disjoint payload (spec §9).

use std::fmt;
use std::str::FromStr;

use oci_store::{Oid, RefName};

use crate::protocol::ProtocolError;

/// `option <name> <value>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionRequest {
    pub name: String,
    pub value: String,
}

impl fmt::Display for OptionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option {} {}", self.name, self.value)
    }
}

impl OptionRequest {
    pub(crate) fn parse(tokens: &[&str]) -> Result<Self, ProtocolError> {
        match tokens {
            ["option", name, value] => Ok(Self {
                name: (*name).to_owned(),
                value: (*value).to_owned(),
            }),
            _ => Err(ProtocolError::BadRequest(tokens.join(" "))),
        }
    }
}

/// `list` or `list for-push`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListRequest {
    pub for_push: bool,
}

impl fmt::Display for ListRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.for_push {
            write!(f, "list for-push")
        } else {
            write!(f, "list")
        }
    }
}

impl ListRequest {
    pub(crate) fn parse(tokens: &[&str]) -> Result<Self, ProtocolError> {
        match tokens {
            ["list"] => Ok(Self { for_push: false }),
            ["list", "for-push"] => Ok(Self { for_push: true }),
            _ => Err(ProtocolError::BadRequest(tokens.join(" "))),
        }
    }
}

/// `fetch <sha> <ref>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub oid: Oid,
    pub refname: RefName,
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch {} {}", self.oid, self.refname)
    }
}

impl FetchRequest {
    pub(crate) fn parse(tokens: &[&str]) -> Result<Self, ProtocolError> {
        match tokens {
            ["fetch", oid, refname] => {
                let oid = Oid::from_str(oid)
                    .map_err(|e| ProtocolError::BadRequest(e.to_string()))?;
                let refname = RefName::from_str(refname)
                    .map_err(|e| ProtocolError::BadRequest(e.to_string()))?;
                Ok(Self { oid, refname })
            }
            _ => Err(ProtocolError::BadRequest(tokens.join(" "))),
        }
    }
}

/// `push [+]<src-ref>:<dst-ref>`. `src` is `None` when the input requested a
/// deletion (an empty source, e.g. `push :refs/heads/old`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushRequest {
    pub src: Option<RefName>,
    pub dst: RefName,
    pub force: bool,
}

impl fmt::Display for PushRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push ")?;
        if self.force {
            write!(f, "+")?;
        }
        if let Some(src) = &self.src {
            write!(f, "{src}")?;
        }
        write!(f, ":{}", self.dst)
    }
}

impl PushRequest {
    pub(crate) fn parse(tokens: &[&str]) -> Result<Self, ProtocolError> {
        let spec = match tokens {
            ["push", spec] => *spec,
            _ => return Err(ProtocolError::BadRequest(tokens.join(" "))),
        };
        let (src, dst) = spec
            .split_once(':')
            .ok_or_else(|| ProtocolError::BadRequest(spec.to_owned()))?;
        let (src, force) = match src.strip_prefix('+') {
            Some(rest) => (rest, true),
            None => (src, false),
        };
        let dst = RefName::from_str(dst).map_err(|e| ProtocolError::BadRequest(e.to_string()))?;
        let src = if src.is_empty() {
            None
        } else {
            Some(RefName::from_str(src).map_err(|e| ProtocolError::BadRequest(e.to_string()))?)
        };

        Ok(Self { src, dst, force })
    }
}

/// Response to the `option` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionResponse {
    Ok,
    Unsupported,
}

impl fmt::Display for OptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// One line of a `list` response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListLine {
    /// `<commit> <ref>`
    Ref { commit: Oid, name: RefName },
    /// `@<target> HEAD`
    Head { target: RefName },
}

impl fmt::Display for ListLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ref { commit, name } => write!(f, "{commit} {name}"),
            Self::Head { target } => write!(f, "@{target} HEAD"),
        }
    }
}

/// One line of a `push` response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushResult {
    Ok(RefName),
    Error { dst: RefName, message: String },
}

impl fmt::Display for PushResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(dst) => write!(f, "ok {dst}"),
            Self::Error { dst, message } => write!(f, "error {dst} {message}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn fetch_request_round_trips() {
        let req = FetchRequest {
            oid: "a".repeat(40).parse().unwrap(),
            refname: RefName::Branch("main".into()),
        };
        let wire = req.to_string();
        let toks = tokens(&wire);
        assert_eq!(FetchRequest::parse(&toks).unwrap(), req);
    }

    #[test]
    fn push_request_round_trips_with_force() {
        let req = PushRequest {
            src: Some(RefName::Branch("main".into())),
            dst: RefName::Branch("main".into()),
            force: true,
        };
        let wire = req.to_string();
        let toks = tokens(&wire);
        assert_eq!(PushRequest::parse(&toks).unwrap(), req);
    }

    #[test]
    fn push_request_round_trips_delete() {
        let req = PushRequest {
            src: None,
            dst: RefName::Tag("v1".into()),
            force: false,
        };
        let toks = tokens(&req.to_string());
        let parsed = PushRequest::parse(&toks).unwrap();
        assert_eq!(parsed, req);
        assert_eq!(req.to_string(), "push :refs/tags/v1");
    }

    #[test]
    fn list_line_formats_as_spec_requires() {
        let line = ListLine::Ref {
            commit: "a".repeat(40).parse().unwrap(),
            name: RefName::Branch("main".into()),
        };
        assert_eq!(line.to_string(), format!("{} refs/heads/main", "a".repeat(40)));

        let head = ListLine::Head {
            target: RefName::Branch("main".into()),
        };
        assert_eq!(head.to_string(), "@refs/heads/main HEAD");
    }
}
