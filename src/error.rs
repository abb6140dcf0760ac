//! Error types for book resolution.
//!
//! A missing archive is not an error: it is reported as
//! [`Resolution::NotFound`](crate::resolver::Resolution::NotFound).

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Why a book could not be resolved to an unpacked folder.
///
/// Cloneable so every caller waiting on the same unpack receives the same
/// failure.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("invalid {field}: must not be empty")]
    InvalidInput { field: &'static str },

    #[error("failed to search for book {book_id}: {cause:#}")]
    Locate {
        book_id: String,
        cause: Arc<anyhow::Error>,
    },

    #[error("failed to unpack {}: {cause:#}", .archive.display())]
    Unpack {
        archive: PathBuf,
        cause: Arc<anyhow::Error>,
    },

    #[error("unpacking {} reported no destination folder", .archive.display())]
    IncompleteUnpack { archive: PathBuf },

    #[error("unpack task for book {book_id} ended abnormally")]
    TaskAborted { book_id: String },
}
