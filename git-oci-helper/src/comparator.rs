//! The ref comparator (spec §4.7): a pure-ish function over
//! `(local head, remote head, force)` that decides what a push must do to a
//! single ref. "Pure-ish" because ancestry and the commit-exists check read
//! the local repo and the data model's layer index, but nothing here
//! mutates either.

use oci_store::{Digest, LocalRepository, Oid};
use thiserror::Error;

use crate::model::{DataModel, ReferenceInfo};

/// `{delete, update-ref, add-commit, force}` — spec §4.7.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub delete: bool,
    pub update_ref: bool,
    pub add_commit: bool,
    pub force: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub status: Status,
    pub reuse_layer: Option<Digest>,
}

#[derive(Debug, Error)]
pub enum ComparatorError {
    #[error("non-fast-forward")]
    NonFastForward,
    #[error(transparent)]
    Local(#[from] oci_store::Error),
}

/// Decide the status for one ref update. `local` is `None` when the push
/// request has an empty source (a delete). `remote` is the ref's current
/// entry in the data model, if any.
pub fn compare(
    local: Option<Oid>,
    remote: Option<&ReferenceInfo>,
    force: bool,
    repo: &dyn LocalRepository,
    model: &DataModel,
) -> Result<Decision, ComparatorError> {
    let Some(local) = local else {
        return Ok(Decision {
            status: Status {
                delete: true,
                ..Status::default()
            },
            reuse_layer: None,
        });
    };

    let Some(remote) = remote else {
        let reuse_layer = model.commit_exists(repo, local)?;
        return Ok(Decision {
            status: Status {
                update_ref: true,
                add_commit: reuse_layer.is_none(),
                ..Status::default()
            },
            reuse_layer,
        });
    };

    if local == remote.commit {
        return Ok(Decision {
            status: Status {
                update_ref: true,
                ..Status::default()
            },
            reuse_layer: Some(remote.layer.clone()),
        });
    }

    let fast_forward = repo.is_ancestor(remote.commit, local)?;
    if !fast_forward && !force {
        return Err(ComparatorError::NonFastForward);
    }

    let reuse_layer = model.commit_exists(repo, local)?;
    Ok(Decision {
        status: Status {
            update_ref: true,
            add_commit: reuse_layer.is_none(),
            force: !fast_forward && force,
        },
        reuse_layer,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::ModelError;
    use oci_store::{Error, RefName};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::io::Read;

    /// A local repo fake whose only notion of history is an explicit
    /// ancestor-pair table, set up per test.
    #[derive(Default)]
    struct FakeRepo {
        ancestors: RefCell<BTreeSet<(Oid, Oid)>>,
    }

    impl FakeRepo {
        fn mark_ancestor(&self, ancestor: Oid, descendant: Oid) {
            self.ancestors.borrow_mut().insert((ancestor, descendant));
        }
    }

    impl LocalRepository for FakeRepo {
        fn head(&self) -> Result<Option<RefName>, Error> {
            Ok(None)
        }
        fn resolve(&self, _name: &RefName) -> Result<Option<Oid>, Error> {
            Ok(None)
        }
        fn resolve_rev(&self, _rev: &str) -> Result<Option<Oid>, Error> {
            Ok(None)
        }
        fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool, Error> {
            Ok(ancestor == descendant || self.ancestors.borrow().contains(&(ancestor, descendant)))
        }
        fn pack(&self, _tip: Oid, _have: &[Oid]) -> Result<Vec<u8>, Error> {
            Ok(Vec::new())
        }
        fn index_pack(&self, _pack: &mut dyn Read) -> Result<(), Error> {
            Ok(())
        }
    }

    fn oid(n: u8) -> Oid {
        format!("{:02x}", n).repeat(20).parse().unwrap()
    }

    fn empty_model() -> Result<DataModel, ModelError> {
        struct NullTarget;
        impl oci_store::GraphTarget for NullTarget {
            fn resolve(&self, _r: &str) -> Result<Option<oci_store::Descriptor>, Error> {
                Ok(None)
            }
            fn fetch_blob(&self, _d: &oci_store::Digest) -> Result<Box<dyn Read>, Error> {
                unreachable!()
            }
            fn fetch_manifest(
                &self,
                _d: &oci_store::Descriptor,
            ) -> Result<oci_store::Manifest, Error> {
                unreachable!()
            }
            fn push_blob(
                &self,
                _media_type: &str,
                _data: &mut dyn Read,
            ) -> Result<oci_store::Descriptor, Error> {
                unreachable!()
            }
            fn pack_manifest(
                &self,
                _opts: oci_store::ManifestOptions,
            ) -> Result<(oci_store::Descriptor, Vec<u8>), Error> {
                unreachable!()
            }
            fn push_manifest(
                &self,
                _bytes: &[u8],
                _tag: Option<&str>,
            ) -> Result<oci_store::Descriptor, Error> {
                unreachable!()
            }
            fn list_referrers(
                &self,
                _subject: &oci_store::Descriptor,
                _artifact_type: Option<&str>,
            ) -> Result<Vec<oci_store::Descriptor>, Error> {
                Ok(Vec::new())
            }
            fn tag(&self, _desc: &oci_store::Descriptor, _tag: &str) -> Result<(), Error> {
                Ok(())
            }
        }
        DataModel::fetch_or_default(&NullTarget, "latest")
    }

    #[test]
    fn missing_local_deletes() {
        let model = empty_model().unwrap();
        let repo = FakeRepo::default();
        let decision = compare(None, None, false, &repo, &model).unwrap();
        assert!(decision.status.delete);
        assert_eq!(decision.reuse_layer, None);
    }

    #[test]
    fn new_ref_with_no_existing_layer_needs_add_commit() {
        let model = empty_model().unwrap();
        let repo = FakeRepo::default();
        let decision = compare(Some(oid(1)), None, false, &repo, &model).unwrap();
        assert!(decision.status.update_ref);
        assert!(decision.status.add_commit);
        assert_eq!(decision.reuse_layer, None);
    }

    #[test]
    fn fast_forward_without_force_succeeds() {
        let model = empty_model().unwrap();
        let repo = FakeRepo::default();
        repo.mark_ancestor(oid(1), oid(2));
        let remote = ReferenceInfo {
            commit: oid(1),
            layer: Digest::sha256(b"L1"),
        };
        let decision = compare(Some(oid(2)), Some(&remote), false, &repo, &model).unwrap();
        assert!(decision.status.update_ref);
        assert!(!decision.status.force);
    }

    #[test]
    fn non_fast_forward_without_force_fails() {
        let model = empty_model().unwrap();
        let repo = FakeRepo::default();
        let remote = ReferenceInfo {
            commit: oid(1),
            layer: Digest::sha256(b"L1"),
        };
        let err = compare(Some(oid(9)), Some(&remote), false, &repo, &model).unwrap_err();
        assert!(matches!(err, ComparatorError::NonFastForward));
    }

    #[test]
    fn non_fast_forward_with_force_succeeds_and_sets_force_bit() {
        let model = empty_model().unwrap();
        let repo = FakeRepo::default();
        let remote = ReferenceInfo {
            commit: oid(1),
            layer: Digest::sha256(b"L1"),
        };
        let decision = compare(Some(oid(9)), Some(&remote), true, &repo, &model).unwrap();
        assert!(decision.status.force);
        assert!(decision.status.update_ref);
    }
}
