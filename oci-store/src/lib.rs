//! Facades consumed by the `git-oci-helper` core (spec §6): a local
//! repository (§6.3) and an OCI registry (§6.4), plus the primitive types
//! (`Oid`, `Digest`, `RefName`) both sides of that boundary share.
//!
//! Nothing in this crate knows about the remote-helper line protocol or the
//! Git-over-OCI data model; those live in `git-oci-helper`.

mod digest;
mod error;
mod local;
mod oid;
mod refname;
mod registry;

pub use digest::{Digest, DigestError};
pub use error::Error;
pub use local::{GitRepository, LocalRepository};
pub use oid::{Oid, OidError};
pub use refname::{RefName, RefNameError};
pub use registry::{
    memory_reader, Descriptor, GraphTarget, HttpRegistry, Manifest, ManifestOptions,
    CREATED_ANNOTATION, EPOCH, MANIFEST_MEDIA_TYPE,
};
