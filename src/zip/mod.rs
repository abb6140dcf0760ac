//! ZIP archive reading and extraction.
//!
//! bloomPUB files are plain ZIP archives. This module reads them through the
//! [`ReadAt`](crate::io::ReadAt) abstraction:
//!
//! - [`structures`]: fixed records of the format (EOCD, ZIP64 records, entries)
//! - [`parser`]: locating and decoding the Central Directory
//! - [`extractor`]: decompression, CRC-32 verification and writing to disk
//!
//! STORED and DEFLATE entries are supported, including ZIP64 archives.
//! Encrypted and multi-disk archives are not.

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
