//! On-disk storage for source and signed PDFs
//!
//! Files live under a single root as `uploads/<id>.pdf` and
//! `signed/<id>.pdf`. Locations handed out and stored in the database are
//! those root-relative strings.

use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

const UPLOADS_DIR: &str = "uploads";
const SIGNED_DIR: &str = "signed";

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open (and create if needed) a storage root
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(UPLOADS_DIR)).await?;
        fs::create_dir_all(root.join(SIGNED_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn upload_location(document_id: &str) -> String {
        format!("{}/{}.pdf", UPLOADS_DIR, document_id)
    }

    pub fn signed_location(document_id: &str) -> String {
        format!("{}/{}.pdf", SIGNED_DIR, document_id)
    }

    /// Absolute path of a location. Only plain relative paths are accepted.
    pub fn path_of(&self, location: &str) -> io::Result<PathBuf> {
        let relative = Path::new(location);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if location.is_empty() || !plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage location: {}", location),
            ));
        }
        Ok(self.root.join(relative))
    }

    pub async fn read(&self, location: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(location)?).await
    }

    /// Write through a temporary file so readers never see a partial file
    pub async fn write(&self, location: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_of(location)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("pdf.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await
    }

    /// Returns `false` when there was nothing to remove
    pub async fn remove(&self, location: &str) -> io::Result<bool> {
        match fs::remove_file(self.path_of(location)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self, location: &str) -> io::Result<bool> {
        fs::try_exists(self.path_of(location)?).await
    }
}
