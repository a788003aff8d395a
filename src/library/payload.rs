//! File payload materialization and release.
//!
//! A selected PDF becomes either an inline `data:` URL or a `blob:` reference
//! to a copy kept in the blob directory. Blob references are transient
//! resources: the store releases them when the owning item is deleted or its
//! payload is replaced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;

use super::content::BLOB_SCHEME;

/// Errors from reading or releasing file payloads
#[derive(Debug, Error)]
pub enum FileReadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Not a blob reference: {0}")]
    InvalidReference(String),
}

/// A user-selected file, as handed over by the file picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File name without its directory
    pub fn name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.trim().is_empty())
    }

    fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    fn mime_type(&self) -> &'static str {
        match self.extension().as_str() {
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

/// How PDF payloads are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfStorage {
    /// Base64 `data:` URL stored inside the record
    #[default]
    Inline,

    /// Copy in the blob directory, referenced as `blob:<name>`
    Blob,
}

/// Turns a selected file into an embeddable payload string
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read_embeddable(&self, file: &FileRef) -> Result<String, FileReadError>;
}

/// Releases transient payload references
pub trait ResourceReleaser: Send + Sync {
    fn release(&self, reference: &str) -> Result<(), FileReadError>;
}

async fn read_bytes(file: &FileRef) -> Result<Vec<u8>, FileReadError> {
    let meta = fs::metadata(&file.path).await.map_err(|source| FileReadError::Io {
        path: file.path.clone(),
        source,
    })?;
    if !meta.is_file() {
        return Err(FileReadError::NotAFile(file.path.clone()));
    }

    fs::read(&file.path).await.map_err(|source| FileReadError::Io {
        path: file.path.clone(),
        source,
    })
}

/// Reads files into base64 `data:` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlReader;

#[async_trait]
impl FileReader for DataUrlReader {
    async fn read_embeddable(&self, file: &FileRef) -> Result<String, FileReadError> {
        let bytes = read_bytes(file).await?;
        Ok(format!(
            "data:{};base64,{}",
            file.mime_type(),
            BASE64_STANDARD.encode(bytes)
        ))
    }
}

/// Content-addressed blob directory
#[derive(Debug, Clone)]
pub struct BlobDir {
    dir: PathBuf,
}

impl BlobDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a `blob:` reference to its file path
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, FileReadError> {
        let name = reference
            .strip_prefix(BLOB_SCHEME)
            .filter(|n| !n.is_empty() && !n.contains('/') && !n.contains('\\') && *n != "..")
            .ok_or_else(|| FileReadError::InvalidReference(reference.to_string()))?;
        Ok(self.dir.join(name))
    }
}

/// Blob name: SHA256(content)[0:16] plus the original extension
fn blob_name(bytes: &[u8], file: &FileRef) -> String {
    let digest = Sha256::digest(bytes);
    let hash = hex::encode(&digest[..8]);
    match file.extension().as_str() {
        "" => hash,
        ext => format!("{}.{}", hash, ext),
    }
}

#[async_trait]
impl FileReader for BlobDir {
    async fn read_embeddable(&self, file: &FileRef) -> Result<String, FileReadError> {
        let bytes = read_bytes(file).await?;
        let name = blob_name(&bytes, file);
        let path = self.dir.join(&name);

        let io_err = |source: std::io::Error| FileReadError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        if !path.exists() {
            fs::write(&path, &bytes).await.map_err(io_err)?;
        }

        tracing::debug!(blob = %name, source = %file.path.display(), "Stored file blob");
        Ok(format!("{}{}", BLOB_SCHEME, name))
    }
}

impl ResourceReleaser for BlobDir {
    fn release(&self, reference: &str) -> Result<(), FileReadError> {
        let path = self.resolve(reference)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(reference, "Released blob");
                Ok(())
            }
            // Already gone; nothing left to release
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FileReadError::Io { path, source }),
        }
    }
}
