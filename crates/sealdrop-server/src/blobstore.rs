//! Filesystem blob store
//!
//! One ciphertext blob per file record, named by a server-assigned uuid and
//! fanned out into two-hex-char subdirectories. Writes go to a temp file,
//! are flushed with `sync_all`, and commit with an atomic rename, so a blob is
//! never partially visible. The store never inspects, re-encrypts, or
//! re-compresses blob bytes.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Handle to the on-disk blob directory
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open the store, creating the root and scratch directories
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("tmp")).await?;
        Ok(Self { root })
    }

    /// Allocate a fresh storage name for an incoming blob
    pub fn allocate_name() -> String {
        format!("{}.enc", Uuid::new_v4().simple())
    }

    fn blob_path(&self, storage_name: &str) -> PathBuf {
        self.root.join(&storage_name[..2]).join(storage_name)
    }

    /// Write a blob under `storage_name`, atomically
    pub async fn put(&self, storage_name: &str, blob: &[u8]) -> io::Result<()> {
        let final_path = self.blob_path(storage_name);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.root.join("tmp").join(storage_name);
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(blob).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    /// Read a blob back in full
    pub async fn get(&self, storage_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.blob_path(storage_name)).await
    }

    /// Remove a blob; idempotent on a missing file
    pub async fn delete(&self, storage_name: &str) -> io::Result<()> {
        match fs::remove_file(self.blob_path(storage_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}
