use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::error;

/// Name the player always asks for first.
pub const ENTRY_DOCUMENT: &str = "index.htm";

/// Extension that marks a bloomPUB's entry document.
const ENTRY_EXTENSION: &str = "htm";

/// Map a requested file to a path inside an unpacked book.
///
/// bloomPUBs do not have to name their entry document `index.htm`, so a
/// request for it falls back to the first `.htm` file (in name order) at the
/// top of the folder. Returns `None` when no entry document exists.
pub async fn resolve_file(unpacked_folder: &Path, requested_file: &str) -> Option<PathBuf> {
    let requested = unpacked_folder.join(requested_file.trim_start_matches('/'));
    if requested_file != ENTRY_DOCUMENT || fs::try_exists(&requested).await.unwrap_or(false) {
        return Some(requested);
    }

    match find_entry_document(unpacked_folder).await {
        Ok(Some(path)) => Some(path),
        Ok(None) => {
            error!(folder = %unpacked_folder.display(), "no .htm file found in book folder");
            None
        }
        Err(e) => {
            error!(folder = %unpacked_folder.display(), error = %e, "failed to list book folder");
            None
        }
    }
}

async fn find_entry_document(folder: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(folder).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !Path::new(&name).extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
            continue;
        }
        if entry.file_type().await.is_ok_and(|t| t.is_file()) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names.into_iter().next().map(|name| folder.join(name)))
}
