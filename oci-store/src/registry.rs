use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::Error;

/// Media type of an OCI image manifest (spec §6.2).
pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
/// Media type of an OCI image index, used by the referrers API.
const INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";
/// Annotation used to make manifest digests reproducible (spec §3.4, §6.2).
pub const CREATED_ANNOTATION: &str = "org.opencontainers.image.created";
/// Fixed value of [`CREATED_ANNOTATION`].
pub const EPOCH: &str = "1970-01-01T00:00:00Z";

/// A reference to a blob or manifest, as it appears inside an OCI manifest
/// or image index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
    #[serde(rename = "artifactType", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
}

impl Descriptor {
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest,
            size,
            artifact_type: None,
        }
    }
}

/// The on-wire shape of an OCI image manifest (spec §3.4, §3.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    #[serde(rename = "artifactType", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    pub config: Descriptor,
    pub layers: Vec<Descriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Descriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ReferrerIndex {
    manifests: Vec<Descriptor>,
}

/// Parameters for building a manifest, without pushing it (spec §4.6:
/// "layers are written before the manifest that references them").
pub struct ManifestOptions {
    pub artifact_type: String,
    pub config: Descriptor,
    pub layers: Vec<Descriptor>,
    pub subject: Option<Descriptor>,
    pub annotations: BTreeMap<String, String>,
}

impl ManifestOptions {
    pub fn build(self) -> Manifest {
        Manifest {
            schema_version: 2,
            media_type: MANIFEST_MEDIA_TYPE.to_owned(),
            artifact_type: Some(self.artifact_type),
            config: self.config,
            layers: self.layers,
            subject: self.subject,
            annotations: self.annotations,
        }
    }
}

/// The abstract content-addressed store consumed by the core (spec §6.4).
///
/// Authentication, TLS, and retry/backoff are the transport's concern, not
/// the core's; this trait exposes only the distribution-API shaped
/// operations the data model needs.
pub trait GraphTarget {
    /// Resolve a tag (or any other reference string) to its manifest
    /// descriptor.
    fn resolve(&self, reference: &str) -> Result<Option<Descriptor>, Error>;

    /// Fetch a blob by digest.
    fn fetch_blob(&self, digest: &Digest) -> Result<Box<dyn Read>, Error>;

    /// Fetch and parse a manifest by descriptor.
    fn fetch_manifest(&self, desc: &Descriptor) -> Result<Manifest, Error>;

    /// Push a blob, returning its descriptor. Idempotent: pushing the same
    /// bytes twice is a no-op from the registry's point of view.
    fn push_blob(&self, media_type: &str, data: &mut dyn Read) -> Result<Descriptor, Error>;

    /// Serialize a manifest and compute its descriptor, without pushing it.
    fn pack_manifest(&self, opts: ManifestOptions) -> Result<(Descriptor, Vec<u8>), Error>;

    /// Push manifest bytes previously produced by [`GraphTarget::pack_manifest`],
    /// optionally tagging it.
    fn push_manifest(&self, bytes: &[u8], tag: Option<&str>) -> Result<Descriptor, Error>;

    /// List the manifests that declare `subject` as their `subject` field
    /// (spec §3.5), optionally filtered by artifact type.
    fn list_referrers(
        &self,
        subject: &Descriptor,
        artifact_type: Option<&str>,
    ) -> Result<Vec<Descriptor>, Error>;

    /// Apply a tag to an already-pushed manifest, without re-sending its
    /// body. Rounds out the facade's tagging surface for a caller that only
    /// has a descriptor in hand; the handlers in this workspace always have
    /// the manifest bytes too and push+tag in one `push_manifest` call, so
    /// this is currently unused here but is part of the trait's contract.
    fn tag(&self, desc: &Descriptor, tag: &str) -> Result<(), Error>;
}

/// A [`GraphTarget`] backed by the OCI Distribution HTTP API.
pub struct HttpRegistry {
    base_url: String,
    repository: String,
    token: Option<String>,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>, repository: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            repository: repository.into(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}/{}", self.base_url, self.repository, path)
    }

    fn get(&self, url: &str) -> ureq::Request {
        let req = ureq::get(url);
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let req = ureq::request(method, url);
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn is_missing(err: &ureq::Error) -> bool {
        matches!(err, ureq::Error::Status(404, _))
    }
}

impl GraphTarget for HttpRegistry {
    fn resolve(&self, reference: &str) -> Result<Option<Descriptor>, Error> {
        let url = self.url(&format!("manifests/{reference}"));
        match self.get(&url).set("Accept", MANIFEST_MEDIA_TYPE).call() {
            Ok(resp) => {
                let digest: Digest = resp
                    .header("Docker-Content-Digest")
                    .ok_or_else(|| Error::NotFound(format!("no digest header for `{reference}`")))?
                    .parse()?;
                let size = resp
                    .header("Content-Length")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                Ok(Some(Descriptor::new(MANIFEST_MEDIA_TYPE, digest, size)))
            }
            Err(e) if Self::is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch_blob(&self, digest: &Digest) -> Result<Box<dyn Read>, Error> {
        let url = self.url(&format!("blobs/{digest}"));
        match self.get(&url).call() {
            Ok(resp) => Ok(Box::new(resp.into_reader())),
            Err(e) if Self::is_missing(&e) => Err(Error::NotFound(digest.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch_manifest(&self, desc: &Descriptor) -> Result<Manifest, Error> {
        let url = self.url(&format!("manifests/{}", desc.digest));
        let resp = self
            .get(&url)
            .set("Accept", MANIFEST_MEDIA_TYPE)
            .call()?;
        Ok(resp.into_json()?)
    }

    fn push_blob(&self, media_type: &str, data: &mut dyn Read) -> Result<Descriptor, Error> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf)?;
        let digest = Digest::sha256(&buf);

        let session = self
            .request("POST", &self.url("blobs/uploads/"))
            .call()?;
        let location = session
            .header("Location")
            .ok_or_else(|| Error::Registry {
                status: 202,
                body: "upload session missing Location header".into(),
            })?
            .to_owned();
        let put_url = if location.contains('?') {
            format!("{location}&digest={digest}")
        } else {
            format!("{location}?digest={digest}")
        };
        self.request("PUT", &put_url)
            .set("Content-Type", "application/octet-stream")
            .send_bytes(&buf)?;

        Ok(Descriptor::new(media_type, digest, buf.len() as u64))
    }

    fn pack_manifest(&self, opts: ManifestOptions) -> Result<(Descriptor, Vec<u8>), Error> {
        let manifest = opts.build();
        let bytes = serde_json::to_vec(&manifest)?;
        let digest = Digest::sha256(&bytes);
        let descriptor = Descriptor::new(MANIFEST_MEDIA_TYPE, digest, bytes.len() as u64);
        Ok((descriptor, bytes))
    }

    fn push_manifest(&self, bytes: &[u8], tag: Option<&str>) -> Result<Descriptor, Error> {
        let digest = Digest::sha256(bytes);
        let reference = tag.map(str::to_owned).unwrap_or_else(|| digest.to_string());
        let url = self.url(&format!("manifests/{reference}"));

        self.request("PUT", &url)
            .set("Content-Type", MANIFEST_MEDIA_TYPE)
            .send_bytes(bytes)?;

        Ok(Descriptor::new(MANIFEST_MEDIA_TYPE, digest, bytes.len() as u64))
    }

    fn list_referrers(
        &self,
        subject: &Descriptor,
        artifact_type: Option<&str>,
    ) -> Result<Vec<Descriptor>, Error> {
        let mut url = self.url(&format!("referrers/{}", subject.digest));
        if let Some(artifact_type) = artifact_type {
            url = format!("{url}?artifactType={artifact_type}");
        }

        match self.get(&url).set("Accept", INDEX_MEDIA_TYPE).call() {
            Ok(resp) => {
                let index: ReferrerIndex = resp.into_json()?;
                Ok(index.manifests)
            }
            Err(e) if Self::is_missing(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn tag(&self, desc: &Descriptor, tag: &str) -> Result<(), Error> {
        let mut buf = Vec::new();
        self.fetch_manifest_bytes(desc, &mut buf)?;

        let url = self.url(&format!("manifests/{tag}"));
        self.request("PUT", &url)
            .set("Content-Type", &desc.media_type)
            .send_bytes(&buf)?;
        Ok(())
    }
}

impl HttpRegistry {
    fn fetch_manifest_bytes(&self, desc: &Descriptor, out: &mut Vec<u8>) -> Result<(), Error> {
        let url = self.url(&format!("manifests/{}", desc.digest));
        let resp = self
            .get(&url)
            .set("Accept", &desc.media_type)
            .call()?;
        let mut reader = resp.into_reader();
        reader.read_to_end(out)?;
        Ok(())
    }
}

/// An in-memory blob reader, useful for tests and for re-reading a buffer
/// that was already materialized in memory (e.g. a freshly built pack).
pub fn memory_reader(bytes: Vec<u8>) -> Box<dyn Read> {
    Box::new(Cursor::new(bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manifest_round_trips_through_json() {
        let config = Descriptor::new("application/vnd.git.config+json", Digest::sha256(b"{}"), 2);
        let layer = Descriptor::new("application/vnd.git.packfile", Digest::sha256(b"PACK"), 4);
        let mut annotations = BTreeMap::new();
        annotations.insert(CREATED_ANNOTATION.to_owned(), EPOCH.to_owned());

        let opts = ManifestOptions {
            artifact_type: "application/vnd.git.manifest".into(),
            config,
            layers: vec![layer],
            subject: None,
            annotations,
        };
        let manifest = opts.build();
        let bytes = serde_json::to_vec(&manifest).unwrap();
        let parsed: Manifest = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed.layers.len(), 1);
        assert_eq!(parsed.annotations.get(CREATED_ANNOTATION), Some(&EPOCH.to_owned()));
    }

    #[test]
    fn pack_manifest_digest_is_reproducible() {
        let config = Descriptor::new("application/vnd.git.config+json", Digest::sha256(b"{}"), 2);
        let opts = || ManifestOptions {
            artifact_type: "application/vnd.git.manifest".into(),
            config: config.clone(),
            layers: vec![],
            subject: None,
            annotations: BTreeMap::new(),
        };
        let a = opts().build();
        let b = opts().build();
        assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
    }
}
