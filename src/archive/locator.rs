use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{ArchiveLocator, has_bloompub_extension};
use crate::io::LocalFileReader;
use crate::zip::ZipExtractor;

/// Metadata file every bloomPUB carries at its root.
const META_JSON: &str = "meta.json";

#[derive(Debug, Deserialize)]
struct BookMeta {
    #[serde(rename = "bookInstanceId")]
    book_instance_id: Option<String>,
    id: Option<String>,
}

impl BookMeta {
    fn matches(&self, book_id: &str) -> bool {
        self.book_instance_id.as_deref() == Some(book_id) || self.id.as_deref() == Some(book_id)
    }
}

/// Finds bloomPUBs in a folder tree.
///
/// An archive named after the book id wins; otherwise the `meta.json` of
/// each archive is consulted. Archives are visited in path order.
#[derive(Debug, Clone)]
pub struct FolderLocator {
    recursive: bool,
}

impl Default for FolderLocator {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl FolderLocator {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// bloomPUBs below `search_folder`, sorted by path. Unreadable entries
    /// below the top folder are skipped.
    async fn candidates(&self, search_folder: &Path) -> Result<Vec<PathBuf>> {
        let root = search_folder.to_path_buf();
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        tokio::task::spawn_blocking(move || scan(&root, max_depth))
            .await
            .context("Folder scan task failed")?
    }

    async fn read_meta(archive: &Path) -> Result<Option<BookMeta>> {
        let reader = Arc::new(LocalFileReader::open(archive)?);
        let extractor = ZipExtractor::new(reader);
        let Some(raw) = extractor.read_named(META_JSON).await? else {
            return Ok(None);
        };
        let meta = serde_json::from_slice(&raw)
            .with_context(|| format!("Invalid {META_JSON} in {}", archive.display()))?;
        Ok(Some(meta))
    }
}

fn scan(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e)
                    .with_context(|| format!("Failed to read search folder {}", root.display()));
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                bail!("Search folder {} is not a folder", root.display());
            }
        } else if entry.file_type().is_file() && has_bloompub_extension(entry.path()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

#[async_trait]
impl ArchiveLocator for FolderLocator {
    async fn locate(&self, book_id: &str, search_folder: &Path) -> Result<Option<PathBuf>> {
        let exists = fs::try_exists(search_folder)
            .await
            .with_context(|| format!("Failed to access search folder {}", search_folder.display()))?;
        if !exists {
            debug!(folder = %search_folder.display(), "search folder does not exist");
            return Ok(None);
        }

        let candidates = self.candidates(search_folder).await?;
        debug!(book_id, count = candidates.len(), "searching bloomPUBs");

        if let Some(by_name) = candidates
            .iter()
            .find(|path| path.file_stem().is_some_and(|stem| stem == book_id))
        {
            return Ok(Some(by_name.clone()));
        }

        for candidate in candidates {
            match Self::read_meta(&candidate).await {
                Ok(Some(meta)) if meta.matches(book_id) => return Ok(Some(candidate)),
                Ok(_) => {}
                Err(e) => {
                    let reason = format!("{e:#}");
                    debug!(archive = %candidate.display(), error = %reason, "skipping unreadable bloomPUB");
                }
            }
        }

        Ok(None)
    }
}
