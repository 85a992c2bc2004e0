//! The top-level error type each binary's `main` renders to stderr (spec
//! §7): every module's error aggregates here so handler functions can use
//! plain `?` regardless of which collaborator failed.

use thiserror::Error;

use crate::comparator::ComparatorError;
use crate::model::ModelError;
use crate::protocol::ProtocolError;
use crate::url::UrlError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("remote: {0}")]
    Remote(#[from] oci_store::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Comparator(#[from] ComparatorError),
    #[error("invalid remote url: {0}")]
    Url(#[from] UrlError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid arguments: {0:?}")]
    InvalidArguments(Vec<String>),
}
