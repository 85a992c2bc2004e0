//! The repository data model (spec §3): the in-memory projection of a VCS
//! repository onto an OCI manifest graph, plus the fetch/mutate/push
//! operations and the layer-to-commits index consumed by the ref comparator
//! (§4.7).

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;

use oci_store::{
    Descriptor, Digest, GraphTarget, Manifest, ManifestOptions, Oid, RefName, CREATED_ANNOTATION,
    EPOCH,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::FileStore;

pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.git-oci-helper.config+json";
pub const PACKFILE_MEDIA_TYPE: &str = "application/vnd.git-oci-helper.packfile";
pub const LFS_MEDIA_TYPE: &str = "application/vnd.git-oci-helper.lfs";
pub const GIT_MANIFEST_ARTIFACT_TYPE: &str = "application/vnd.git-oci-helper.git-manifest";
pub const LFS_MANIFEST_ARTIFACT_TYPE: &str = "application/vnd.git-oci-helper.lfs-manifest";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("remote: {0}")]
    Remote(#[from] oci_store::Error),
    #[error("malformed config blob: {0}")]
    Config(#[from] serde_json::Error),
    #[error("local I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("ref `{0}` already exists in both heads and tags")]
    DuplicateRef(String),
    #[error("no git manifest found for `{0}`")]
    NoSuchManifest(String),
}

/// `(commit_id, layer_digest)` — spec §3.2.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub commit: Oid,
    pub layer: Digest,
}

/// An order-preserving `Ref → ReferenceInfo` map (spec §3.3: "ordering
/// irrelevant on the wire but stable inside a single session").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefMap(Vec<(RefName, ReferenceInfo)>);

impl RefMap {
    pub fn get(&self, name: &RefName) -> Option<&ReferenceInfo> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, i)| i)
    }

    pub fn insert(&mut self, name: RefName, info: ReferenceInfo) {
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| n == &name) {
            slot.1 = info;
        } else {
            self.0.push((name, info));
        }
    }

    pub fn remove(&mut self, name: &RefName) -> Option<ReferenceInfo> {
        let idx = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RefName, ReferenceInfo)> {
        self.0.iter()
    }
}

/// A JSON object keyed by the ref's short name, per §6.2's schema
/// `{"<ref>": {"commit": "<hex>", "layer": "<digest>"}}`.
impl Serialize for RefMap {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&str, &ReferenceInfo> = self
            .0
            .iter()
            .map(|(name, info)| (name.short_name(), info))
            .collect();
        map.serialize(s)
    }
}

/// `heads: Ref → ReferenceInfo, tags: Ref → ReferenceInfo` — spec §3.3.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GitConfig {
    pub heads: RefMap,
    pub tags: RefMap,
}

impl<'de> Deserialize<'de> for GitConfig {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            heads: BTreeMap<String, ReferenceInfo>,
            #[serde(default)]
            tags: BTreeMap<String, ReferenceInfo>,
        }
        let raw = Raw::deserialize(d)?;
        let mut heads = RefMap::default();
        for (name, info) in raw.heads {
            heads.insert(RefName::Branch(name), info);
        }
        let mut tags = RefMap::default();
        for (name, info) in raw.tags {
            tags.insert(RefName::Tag(name), info);
        }
        Ok(GitConfig { heads, tags })
    }
}

impl GitConfig {
    pub fn get(&self, name: &RefName) -> Option<&ReferenceInfo> {
        match name {
            RefName::Branch(_) => self.heads.get(name),
            RefName::Tag(_) => self.tags.get(name),
            RefName::Head => None,
        }
    }

    pub fn insert(&mut self, name: RefName, info: ReferenceInfo) {
        match name {
            RefName::Branch(_) => self.heads.insert(name, info),
            RefName::Tag(_) => self.tags.insert(name, info),
            RefName::Head => {}
        }
    }

    pub fn remove(&mut self, name: &RefName) {
        match name {
            RefName::Branch(_) => {
                self.heads.remove(name);
            }
            RefName::Tag(_) => {
                self.tags.remove(name);
            }
            RefName::Head => {}
        }
    }
}

/// layer_digest → commits that reach it, ordered oldest-layer-first to make
/// the commit-exists scan in §4.7 deterministic.
#[derive(Clone, Debug, Default)]
pub struct LayerIndex(Vec<(Digest, Vec<Oid>)>);

impl LayerIndex {
    pub fn iter(&self) -> impl Iterator<Item = &(Digest, Vec<Oid>)> {
        self.0.iter()
    }
}

/// One packfile built during this session but not yet pushed to the
/// registry; bytes live in the ephemeral file store until the batch commits.
struct PendingLayer {
    descriptor: Descriptor,
    path: PathBuf,
}

/// The in-memory projection of a remote repository (spec §3.7): populated
/// once by `fetch_or_default`, mutated by handlers, sealed by `push`.
pub struct DataModel {
    pub manifest: Manifest,
    pub config: GitConfig,
    pub lfs_manifest: Option<Manifest>,
    index: LayerIndex,
    pending_layers: Vec<PendingLayer>,
    /// The git manifest's own descriptor, known once it has been fetched or
    /// pushed; used as the `subject` when packing the LFS manifest (§4.9).
    manifest_descriptor: Option<Descriptor>,
}

fn empty_manifest() -> Manifest {
    ManifestOptions {
        artifact_type: GIT_MANIFEST_ARTIFACT_TYPE.to_string(),
        config: Descriptor::new(CONFIG_MEDIA_TYPE, Digest::sha256(b"{}"), 2),
        layers: Vec::new(),
        subject: None,
        annotations: [(CREATED_ANNOTATION.to_string(), EPOCH.to_string())]
            .into_iter()
            .collect(),
    }
    .build()
}

impl DataModel {
    /// spec §3.7 / §4.5 step 1: fetch the tagged manifest, its config blob
    /// and (if any) its LFS referrer manifest, or fall back to an empty
    /// model when the tag does not resolve.
    pub fn fetch_or_default(
        target: &dyn GraphTarget,
        tag: &str,
    ) -> Result<Self, ModelError> {
        let Some(descriptor) = target.resolve(tag)? else {
            return Ok(Self {
                manifest: empty_manifest(),
                config: GitConfig::default(),
                lfs_manifest: None,
                index: LayerIndex::default(),
                pending_layers: Vec::new(),
                manifest_descriptor: None,
            });
        };

        let manifest = target.fetch_manifest(&descriptor)?;
        let config_bytes = {
            let mut reader = target.fetch_blob(&manifest.config.digest)?;
            let mut buf = Vec::new();
            std::io::copy(&mut reader, &mut buf)?;
            buf
        };
        let config: GitConfig = serde_json::from_slice(&config_bytes)?;

        let lfs_manifest = target
            .list_referrers(&descriptor, Some(LFS_MANIFEST_ARTIFACT_TYPE))?
            .into_iter()
            .next()
            .map(|d| target.fetch_manifest(&d))
            .transpose()?;

        let mut model = Self {
            manifest,
            config,
            lfs_manifest,
            index: LayerIndex::default(),
            pending_layers: Vec::new(),
            manifest_descriptor: Some(descriptor),
        };
        model.rebuild_index();
        Ok(model)
    }

    pub fn manifest_descriptor(&self) -> Option<&Descriptor> {
        self.manifest_descriptor.as_ref()
    }

    /// spec §3.6: rebuilt from the authoritative config, not incrementally
    /// maintained, so it can never drift out of sync with a mutation.
    pub fn rebuild_index(&mut self) {
        let mut index = Vec::new();
        for layer in &self.manifest.layers {
            let mut commits = Vec::new();
            for (_, info) in self.config.heads.iter().chain(self.config.tags.iter()) {
                if info.layer == layer.digest {
                    commits.push(info.commit.clone());
                }
            }
            index.push((layer.digest.clone(), commits));
        }
        self.index = LayerIndex(index);
    }

    pub fn index(&self) -> &LayerIndex {
        &self.index
    }

    pub fn resolve(&self, name: &RefName) -> Option<&ReferenceInfo> {
        self.config.get(name)
    }

    /// spec §4.7 "Commit-exists check": the first layer (oldest-first) that
    /// already contains an ancestor-or-equal of `commit`, if any.
    pub fn commit_exists(
        &self,
        repo: &dyn oci_store::LocalRepository,
        commit: Oid,
    ) -> Result<Option<Digest>, oci_store::Error> {
        for (layer, commits) in self.index.iter() {
            for c in commits {
                if repo.is_ancestor(commit, *c)? {
                    return Ok(Some(layer.clone()));
                }
            }
        }
        Ok(None)
    }

    pub fn delete_ref(&mut self, name: &RefName) {
        self.config.remove(name);
    }

    pub fn update_ref(&mut self, name: RefName, info: ReferenceInfo) {
        self.config.insert(name, info);
    }

    /// Stages a newly-built packfile: writes it to the ephemeral store,
    /// records its descriptor, and appends it to the manifest layer order
    /// (spec §3.4: "layers are stored oldest-first; newer packfiles are
    /// appended").
    pub fn stage_layer(&mut self, store: &FileStore, bytes: &[u8]) -> Result<Digest, ModelError> {
        let digest = Digest::sha256(bytes);
        let path = store.write(&digest, bytes)?;
        self.manifest.layers.push(Descriptor::new(
            PACKFILE_MEDIA_TYPE,
            digest.clone(),
            bytes.len() as u64,
        ));
        self.pending_layers.push(PendingLayer {
            descriptor: Descriptor::new(PACKFILE_MEDIA_TYPE, digest.clone(), bytes.len() as u64),
            path,
        });
        Ok(digest)
    }

    /// Records a blob already pushed straight to the registry (the LFS
    /// upload path streams directly rather than staging through the
    /// ephemeral store first). Dedups by digest, per spec §3.5.
    pub fn append_lfs_descriptor(&mut self, descriptor: Descriptor) {
        let lfs = self.lfs_manifest.get_or_insert_with(|| {
            ManifestOptions {
                artifact_type: LFS_MANIFEST_ARTIFACT_TYPE.to_string(),
                config: Descriptor::new(CONFIG_MEDIA_TYPE, Digest::sha256(b"{}"), 2),
                layers: Vec::new(),
                subject: None,
                annotations: [(CREATED_ANNOTATION.to_string(), EPOCH.to_string())]
                    .into_iter()
                    .collect(),
            }
            .build()
        });
        if !lfs.layers.iter().any(|l| l.digest == descriptor.digest) {
            lfs.layers.push(descriptor);
        }
    }

    /// Looks up an LFS blob by its OID (the hex half of its digest).
    pub fn find_lfs_layer(&self, oid: &str) -> Option<Descriptor> {
        self.lfs_manifest
            .as_ref()?
            .layers
            .iter()
            .find(|l| l.digest.hex() == oid)
            .cloned()
    }

    /// spec §4.6 post-batch sequence: push staged layers, then the config
    /// blob, then the git manifest, tagging the requested remote tag.
    pub fn push(&mut self, target: &dyn GraphTarget, tag: &str) -> Result<(), ModelError> {
        for pending in self.pending_layers.drain(..) {
            let mut file = std::fs::File::open(&pending.path)?;
            let pushed = target.push_blob(PACKFILE_MEDIA_TYPE, &mut file)?;
            debug_assert_eq!(pushed.digest, pending.descriptor.digest);
        }

        let config_bytes = serde_json::to_vec(&self.config)?;
        let config_descriptor =
            target.push_blob(CONFIG_MEDIA_TYPE, &mut Cursor::new(&config_bytes))?;
        self.manifest.config = config_descriptor;

        let (manifest_descriptor, manifest_bytes) = target.pack_manifest(ManifestOptions {
            artifact_type: GIT_MANIFEST_ARTIFACT_TYPE.to_string(),
            config: self.manifest.config.clone(),
            layers: self.manifest.layers.clone(),
            subject: None,
            annotations: [(CREATED_ANNOTATION.to_string(), EPOCH.to_string())]
                .into_iter()
                .collect(),
        })?;
        target.push_manifest(&manifest_bytes, Some(tag))?;
        self.manifest_descriptor = Some(manifest_descriptor);

        Ok(())
    }

    /// spec §4.9 LFS `terminate`: pack and push the LFS manifest with the
    /// git manifest as subject. Blobs were already pushed straight to the
    /// registry as each `upload` request completed.
    pub fn push_lfs_manifest(&mut self, target: &dyn GraphTarget, tag: &str) -> Result<(), ModelError> {
        let Some(lfs) = &self.lfs_manifest else {
            return Ok(());
        };
        let subject = match self.manifest_descriptor.clone() {
            Some(descriptor) => descriptor,
            None => target
                .resolve(tag)?
                .ok_or_else(|| ModelError::NoSuchManifest(tag.to_string()))?,
        };
        let (_, lfs_bytes) = target.pack_manifest(ManifestOptions {
            artifact_type: LFS_MANIFEST_ARTIFACT_TYPE.to_string(),
            config: lfs.config.clone(),
            layers: lfs.layers.clone(),
            subject: Some(subject),
            annotations: [(CREATED_ANNOTATION.to_string(), EPOCH.to_string())]
                .into_iter()
                .collect(),
        })?;
        target.push_manifest(&lfs_bytes, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn oid(n: u8) -> Oid {
        format!("{:02x}", n).repeat(20).parse().unwrap()
    }

    fn digest(tag: &str) -> Digest {
        Digest::sha256(tag.as_bytes())
    }

    #[test]
    fn refmap_insert_is_order_preserving_update_in_place() {
        let mut map = RefMap::default();
        let name = RefName::Branch("main".into());
        map.insert(
            name.clone(),
            ReferenceInfo {
                commit: oid(1),
                layer: digest("a"),
            },
        );
        map.insert(
            name.clone(),
            ReferenceInfo {
                commit: oid(2),
                layer: digest("b"),
            },
        );
        assert_eq!(map.iter().count(), 1);
        assert_eq!(map.get(&name).unwrap().commit, oid(2));
    }

    #[test]
    fn config_json_round_trips_through_spec_schema() {
        let mut config = GitConfig::default();
        config.insert(
            RefName::Branch("main".into()),
            ReferenceInfo {
                commit: oid(1),
                layer: digest("a"),
            },
        );
        config.insert(
            RefName::Tag("v1".into()),
            ReferenceInfo {
                commit: oid(2),
                layer: digest("b"),
            },
        );
        let bytes = serde_json::to_vec(&config).unwrap();
        let decoded: GitConfig = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn index_is_ordered_by_manifest_layer_order() {
        let mut model = DataModel {
            manifest: empty_manifest(),
            config: GitConfig::default(),
            lfs_manifest: None,
            index: LayerIndex::default(),
            pending_layers: Vec::new(),
            manifest_descriptor: None,
        };
        model
            .manifest
            .layers
            .push(Descriptor::new(PACKFILE_MEDIA_TYPE, digest("l1"), 10));
        model
            .manifest
            .layers
            .push(Descriptor::new(PACKFILE_MEDIA_TYPE, digest("l2"), 10));
        model.config.insert(
            RefName::Branch("main".into()),
            ReferenceInfo {
                commit: oid(1),
                layer: digest("l2"),
            },
        );
        model.rebuild_index();
        let layers: Vec<_> = model.index().iter().map(|(d, _)| d.clone()).collect();
        assert_eq!(layers, vec![digest("l1"), digest("l2")]);
    }
}
