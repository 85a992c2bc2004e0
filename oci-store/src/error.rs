use thiserror::Error;

use crate::digest::DigestError;

/// Errors surfaced by the [`crate::LocalRepository`] and [`crate::GraphTarget`]
/// facades.
///
/// Spec §7 classifies failures from these two collaborators as `LocalRepo`
/// and `RemoteTransport` respectively; both map onto this one enum so
/// callers in `git-oci-helper` can propagate either with a single `?`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("git: {0}")]
    Git(#[from] git2::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry returned {status}: {body}")]
    Registry { status: u16, body: String },
    #[error("registry transport error: {0}")]
    Transport(#[from] Box<ureq::Error>),
    #[error("malformed manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("malformed digest: {0}")]
    Digest(#[from] DigestError),
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("descriptor not found: {0}")]
    NotFound(String),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
