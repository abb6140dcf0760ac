//! # bpub-resolver
//!
//! Resolves cross-book `bpub://` links to files inside unpacked bloomPUB
//! archives.
//!
//! A bloomPUB page can link to another book with a URL such as
//! `bpub://bloom-player/book/<book id>/index.htm`. Serving that request means
//! finding the other book's archive, unpacking it, and mapping the requested
//! file into the unpacked folder. Several such requests usually arrive at once
//! for a freshly opened book; [`BookResolver`] unpacks each book only once and
//! answers every later request from its cache.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use bpub_resolver::{BookResolver, FolderLocator, ZipUnpacker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolver = BookResolver::new(
//!         Arc::new(FolderLocator::default()),
//!         Arc::new(ZipUnpacker::new(std::env::temp_dir().join("bpub-resolver"))),
//!     );
//!
//!     let url = "bpub://bloom-player/book/2c1b71ac-f399-446d-8398-e61a8efd4e83/index.htm";
//!     if let Some(path) = resolver.resolve_resource_path(url, Path::new("/home/me/Books")).await {
//!         println!("{}", path.display());
//!     }
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod io;
pub mod logging;
pub mod resolver;
pub mod url;
pub mod zip;

pub use archive::{ArchiveLocator, ArchiveUnpacker, FolderLocator, Unpacked, ZipUnpacker};
pub use cli::Cli;
pub use error::ResolveError;
pub use io::{LocalFileReader, ReadAt};
pub use resolver::{BookResolver, Resolution};
pub use url::{BookRequest, book_link, url_for_path};
pub use zip::{ZipExtractor, ZipFileEntry};
