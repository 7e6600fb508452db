//! On-disk blob storage for file contents.
//! Layout is flat: `<root>/<workspaceName>/<fileId>`, one blob per file, no
//! nesting. Upload chunks are appended raw in arrival order; downloads read
//! fixed-size windows.

use anyhow::{Context, Result};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Window size used for chunked downloads.
pub const CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating storage root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workspace_dir(&self, workspace_name: &str) -> PathBuf {
        self.root.join(workspace_name)
    }

    pub fn blob_path(&self, workspace_name: &str, file_id: &str) -> PathBuf {
        self.workspace_dir(workspace_name).join(file_id)
    }

    pub fn create_workspace_dir(&self, workspace_name: &str) -> Result<()> {
        let dir = self.workspace_dir(workspace_name);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))
    }

    pub fn delete_workspace_dir(&self, workspace_name: &str) -> Result<()> {
        let dir = self.workspace_dir(workspace_name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn rename_workspace_dir(&self, old_name: &str, new_name: &str) -> Result<()> {
        let src = self.workspace_dir(old_name);
        let dst = self.workspace_dir(new_name);
        if src.exists() {
            std::fs::rename(&src, &dst)
                .with_context(|| format!("renaming {} to {}", src.display(), dst.display()))?;
        } else {
            std::fs::create_dir_all(&dst).with_context(|| format!("creating {}", dst.display()))?;
        }
        Ok(())
    }

    /// Append one upload chunk to the blob, creating it on first write.
    pub fn append_chunk(&self, workspace_name: &str, file_id: &str, chunk: &[u8]) -> Result<()> {
        let path = self.blob_path(workspace_name, file_id);
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("opening {} for append", path.display()))?;
        file.write_all(chunk).with_context(|| format!("appending to {}", path.display()))?;
        Ok(())
    }

    /// Read chunk `chunk_number` (1-based) of a `file_size`-byte blob:
    /// bytes `[(k-1)*CHUNK_SIZE, min(k*CHUNK_SIZE, size))`.
    pub fn read_chunk(
        &self,
        workspace_name: &str,
        file_id: &str,
        chunk_number: u64,
        file_size: u64,
    ) -> Result<Vec<u8>> {
        let path = self.blob_path(workspace_name, file_id);
        let mut file = std::fs::File::open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let start = CHUNK_SIZE * (chunk_number.saturating_sub(1));
        let end = (start + CHUNK_SIZE).min(file_size);
        if start >= end {
            return Ok(Vec::new());
        }
        file.seek(SeekFrom::Start(start))
            .with_context(|| format!("seeking in {}", path.display()))?;
        let mut chunk = vec![0u8; (end - start) as usize];
        file.read_exact(&mut chunk)
            .with_context(|| format!("reading chunk {} of {}", chunk_number, path.display()))?;
        Ok(chunk)
    }

    /// Remove a blob; a missing blob is not an error.
    pub fn remove_blob(&self, workspace_name: &str, file_id: &str) -> Result<()> {
        let path = self.blob_path(workspace_name, file_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }

    pub fn blob_len(&self, workspace_name: &str, file_id: &str) -> Result<u64> {
        let path = self.blob_path(workspace_name, file_id);
        Ok(std::fs::metadata(&path)
            .with_context(|| format!("stat {}", path.display()))?
            .len())
    }
}
