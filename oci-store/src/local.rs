use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::oid::Oid;
use crate::refname::RefName;

/// The minimum set of operations the core requires from the local object
/// database (spec §6.3). Everything about packfile encoding, commit
/// ancestry resolution, and the on-disk layout of the repository stays
/// behind this trait; the core never touches `git2` (or any other VCS
/// library) directly.
pub trait LocalRepository {
    /// The branch `HEAD` currently points to, or `None` if `HEAD` is
    /// unborn (a fresh repository with no commits).
    fn head(&self) -> Result<Option<RefName>, Error>;

    /// Resolve a local reference to the commit it points at.
    fn resolve(&self, name: &RefName) -> Result<Option<Oid>, Error>;

    /// Resolve an arbitrary revision expression (a commit id, a branch
    /// name that isn't namespaced, ...) the way `git rev-parse` would.
    fn resolve_rev(&self, rev: &str) -> Result<Option<Oid>, Error>;

    /// Whether `ancestor` is an ancestor of (or equal to) `descendant`.
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool, Error>;

    /// Build a thin packfile containing every commit reachable from `tip`
    /// that isn't reachable from any oid in `have`.
    fn pack(&self, tip: Oid, have: &[Oid]) -> Result<Vec<u8>, Error>;

    /// Ingest a packfile stream into the local object database (used by
    /// the fetch handler, spec §4.8).
    fn index_pack(&self, pack: &mut dyn Read) -> Result<(), Error>;
}

/// A [`LocalRepository`] backed by `git2`/libgit2.
pub struct GitRepository {
    repo: git2::Repository,
    path: PathBuf,
}

impl GitRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let repo = git2::Repository::open(&path)?;
        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn to_git2(oid: Oid) -> Result<git2::Oid, Error> {
        Ok(git2::Oid::from_bytes(oid.as_bytes())?)
    }

    fn from_git2(oid: git2::Oid) -> Result<Oid, Error> {
        oid.to_string().parse().map_err(|_| {
            Error::Git(git2::Error::from_str("object id has an unsupported length"))
        })
    }
}

impl LocalRepository for GitRepository {
    fn head(&self) -> Result<Option<RefName>, Error> {
        match self.repo.head() {
            Ok(head) => {
                if !head.is_branch() {
                    return Ok(None);
                }
                let name = head
                    .shorthand()
                    .ok_or_else(|| Error::Git(git2::Error::from_str("HEAD is not valid UTF-8")))?;
                Ok(Some(RefName::Branch(name.to_owned())))
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, name: &RefName) -> Result<Option<Oid>, Error> {
        match self.repo.find_reference(&name.to_string()) {
            Ok(reference) => {
                let commit = reference.peel_to_commit()?;
                Ok(Some(Self::from_git2(commit.id())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_rev(&self, rev: &str) -> Result<Option<Oid>, Error> {
        match self.repo.revparse_single(rev) {
            Ok(obj) => {
                let commit = obj.peel_to_commit()?;
                Ok(Some(Self::from_git2(commit.id())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool, Error> {
        let ancestor = Self::to_git2(ancestor)?;
        let descendant = Self::to_git2(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn pack(&self, tip: Oid, have: &[Oid]) -> Result<Vec<u8>, Error> {
        let mut walk = self.repo.revwalk()?;
        walk.push(Self::to_git2(tip)?)?;
        for oid in have {
            // Nb. hiding an oid we don't have locally is harmless; git2
            // simply treats it as already-visited.
            let _ = walk.hide(Self::to_git2(*oid)?);
        }

        let mut builder = self.repo.packbuilder()?;
        for oid in walk {
            builder.insert_commit(oid?)?;
        }

        let mut buf = git2::Buf::new();
        builder.write_buf(&mut buf)?;
        Ok(buf.to_vec())
    }

    fn index_pack(&self, pack: &mut dyn Read) -> Result<(), Error> {
        let odb = self.repo.odb()?;
        let mut writer = odb.writepack(|_stats| true)?;
        io::copy(pack, &mut writer)?;
        writer.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn init_repo_with_commit(path: &Path) -> (git2::Repository, git2::Oid) {
        let repo = git2::Repository::init(path).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        (repo, oid)
    }

    #[test]
    fn head_resolves_to_the_current_branch() {
        let dir = tempdir().unwrap();
        let (repo, _) = init_repo_with_commit(dir.path());
        let branch = repo.head().unwrap().shorthand().unwrap().to_string();
        drop(repo);

        let git_repo = GitRepository::open(dir.path()).unwrap();
        assert_eq!(git_repo.head().unwrap(), Some(RefName::Branch(branch)));
    }

    #[test]
    fn resolve_finds_the_commit_a_ref_points_at() {
        let dir = tempdir().unwrap();
        let (repo, oid) = init_repo_with_commit(dir.path());
        let branch = repo.head().unwrap().shorthand().unwrap().to_string();
        drop(repo);

        let git_repo = GitRepository::open(dir.path()).unwrap();
        let resolved = git_repo.resolve(&RefName::Branch(branch)).unwrap();
        assert_eq!(resolved.map(|o| o.to_string()), Some(oid.to_string()));
    }

    #[test]
    fn resolve_returns_none_for_a_missing_ref() {
        let dir = tempdir().unwrap();
        init_repo_with_commit(dir.path());

        let git_repo = GitRepository::open(dir.path()).unwrap();
        assert_eq!(git_repo.resolve(&RefName::Branch("nope".into())).unwrap(), None);
    }

    #[test]
    fn is_ancestor_holds_for_self_and_parent_but_not_the_reverse() {
        let dir = tempdir().unwrap();
        let (repo, first) = init_repo_with_commit(dir.path());
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let parent = repo.find_commit(first).unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let second = repo
            .commit(Some("HEAD"), &sig, &sig, "second", &tree, &[&parent])
            .unwrap();
        drop(repo);

        let git_repo = GitRepository::open(dir.path()).unwrap();
        let first: Oid = first.to_string().parse().unwrap();
        let second: Oid = second.to_string().parse().unwrap();
        assert!(git_repo.is_ancestor(first, first).unwrap());
        assert!(git_repo.is_ancestor(first, second).unwrap());
        assert!(!git_repo.is_ancestor(second, first).unwrap());
    }

    #[test]
    fn pack_and_index_pack_round_trip_between_repositories() {
        let src_dir = tempdir().unwrap();
        let (repo, oid) = init_repo_with_commit(src_dir.path());
        drop(repo);
        let src = GitRepository::open(src_dir.path()).unwrap();
        let tip: Oid = oid.to_string().parse().unwrap();

        let bytes = src.pack(tip, &[]).unwrap();
        assert!(!bytes.is_empty());

        let dst_dir = tempdir().unwrap();
        git2::Repository::init_bare(dst_dir.path()).unwrap();
        let dst = GitRepository::open(dst_dir.path()).unwrap();
        let mut reader = bytes.as_slice();
        dst.index_pack(&mut reader).unwrap();

        assert_eq!(dst.resolve_rev(&tip.to_string()).unwrap(), Some(tip));
    }
}
