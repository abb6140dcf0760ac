use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use super::{ArchiveUnpacker, Unpacked};
use crate::io::LocalFileReader;
use crate::zip::ZipExtractor;

/// Extracts bloomPUBs below a working directory.
#[derive(Debug, Clone)]
pub struct ZipUnpacker {
    work_dir: PathBuf,
}

impl ZipUnpacker {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Folder an archive extracts to: its stem plus a hash of its full path,
    /// so same-named archives from different folders do not collide.
    pub fn destination_for(&self, archive_path: &Path) -> PathBuf {
        let stem = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "book".to_string());
        let path_hash = crc32fast::hash(archive_path.to_string_lossy().as_bytes());
        self.work_dir.join(format!("{stem}-{path_hash:08x}"))
    }
}

#[async_trait]
impl ArchiveUnpacker for ZipUnpacker {
    async fn unpack(&self, archive_path: &Path, replace_existing: bool) -> Result<Unpacked> {
        let dest = self.destination_for(archive_path);

        if replace_existing && fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(dest = %dest.display(), "removing previous extraction");
            fs::remove_dir_all(&dest)
                .await
                .with_context(|| format!("Failed to clear {}", dest.display()))?;
        }

        let reader = Arc::new(LocalFileReader::open(archive_path)?);
        let extractor = ZipExtractor::new(reader);
        let files = extractor
            .extract_all(&dest)
            .await
            .with_context(|| format!("Failed to extract {}", archive_path.display()))?;

        info!(
            archive = %archive_path.display(),
            dest = %dest.display(),
            files,
            "unpacked bloomPUB"
        );

        Ok(Unpacked {
            unpacked_to_folder_path: dest,
        })
    }
}
