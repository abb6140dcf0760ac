//! Finding a book's archive on disk and unpacking it.
//!
//! [`BookResolver`](crate::resolver::BookResolver) only talks to the two
//! traits here; [`FolderLocator`] and [`ZipUnpacker`] are the filesystem
//! implementations the CLI wires in.

mod locator;
mod unpacker;

pub use locator::FolderLocator;
pub use unpacker::ZipUnpacker;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File extensions of bloomPUB archives.
pub const BLOOMPUB_EXTENSIONS: &[&str] = &["bloompub", "bloomd"];

/// Finds the archive that holds a book.
#[async_trait]
pub trait ArchiveLocator: Send + Sync {
    /// Path of the archive for `book_id` below `search_folder`, or `None`
    /// when there is no such archive.
    async fn locate(&self, book_id: &str, search_folder: &Path) -> Result<Option<PathBuf>>;
}

/// Unpacks an archive into a working directory.
#[async_trait]
pub trait ArchiveUnpacker: Send + Sync {
    /// Extract `archive_path`. With `replace_existing`, a previous
    /// extraction of the same archive is removed first.
    async fn unpack(&self, archive_path: &Path, replace_existing: bool) -> Result<Unpacked>;
}

/// Result of a successful unpack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpacked {
    pub unpacked_to_folder_path: PathBuf,
}

pub(crate) fn has_bloompub_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BLOOMPUB_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
