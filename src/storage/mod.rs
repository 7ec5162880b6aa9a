//! Output directory access for finished downloads

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Directory the fetcher writes finished files into
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of downloaded files, reverse lexicographic
    ///
    /// Creates the directory when it does not exist yet. Dotfiles (the
    /// download archive among them) and subdirectories are not listed.
    pub async fn list(&self) -> Result<Vec<String>> {
        tokio::fs::create_dir_all(&self.root).await?;

        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };
            if !name.starts_with('.') {
                names.push(name);
            }
        }

        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Delete one downloaded file by bare name
    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tokio::fs::remove_file(&path).await?;
        tracing::info!(file = name, "Deleted downloaded file");
        Ok(())
    }

    /// Map a bare file name onto the output directory, refusing anything
    /// that could escape it
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let invalid = || StorageError::InvalidName(name.to_string());

        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return Err(invalid());
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(invalid()),
        }
    }
}
