//! The ephemeral file store (spec §4.3, §5): one temporary directory per
//! session holding packfiles and LFS blobs staged before (or downloaded
//! after) a registry round-trip. Cleanup is tied to the value's lifetime —
//! dropping it removes the directory on every exit path, success or error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use oci_store::Digest;
use tempfile::TempDir;

pub struct FileStore {
    dir: TempDir,
}

impl FileStore {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("git-oci-helper-").tempdir()?,
        })
    }

    fn path_for(&self, digest: &Digest) -> PathBuf {
        self.dir.path().join(format!("{}-{}", digest.algorithm(), digest.hex()))
    }

    pub fn write(&self, digest: &Digest, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(digest);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn create(&self, name: &str) -> io::Result<(PathBuf, fs::File)> {
        let path = self.dir.path().join(name);
        let file = fs::File::create(&path)?;
        Ok((path, file))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let store = FileStore::new().unwrap();
        let digest = Digest::sha256(b"hello");
        let path = store.write(&digest, b"hello").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"hello");
    }

    #[test]
    fn directory_is_removed_on_drop() {
        let store = FileStore::new().unwrap();
        let dir = store.path().to_path_buf();
        assert!(dir.exists());
        drop(store);
        assert!(!dir.exists());
    }
}
