//! Wire vocabularies for the two line-based protocols the helper binaries
//! speak: the VCS remote-helper protocol (spec §4.1.1) and the LFS
//! custom-transfer-agent protocol (spec §4.1.2). Reading/writing those lines
//! off a stream lives in `crate::communicator`; this module only owns the
//! request/response types and their wire (de)serialization.

pub mod lfs;
pub mod vcs;

/// Failures in decoding a line of the VCS protocol. End-of-input and a
/// blank batch terminator are not errors (spec §7) and are represented as
/// ordinary return values in `Communicator`, not as variants here.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error("unexpected request: {0}")]
    Unexpected(String),
    #[error("unsupported command: {0}")]
    Unsupported(String),
    #[error("I/O error: {0}")]
    Io(String),
}
