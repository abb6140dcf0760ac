use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::trace;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on the buffer reserved up front for an inflated entry; the
/// declared size comes from the archive and is not trusted.
const MAX_PREALLOC: u64 = 1 << 20;

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Decompress an entry into memory and verify its CRC-32.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            bail!("Encrypted entries are not supported: {}", entry.file_name);
        }

        let data_offset = self.parser.data_offset(entry).await?;
        let available = self.parser.reader().size().saturating_sub(data_offset);
        if entry.compressed_size > available {
            bail!(
                "Data of {} extends past the end of the archive ({} bytes declared, {} available)",
                entry.file_name,
                entry.compressed_size,
                available
            );
        }
        let mut compressed = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut compressed)
            .await
            .with_context(|| format!("Failed to read data of {}", entry.file_name))?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => compressed,
            CompressionMethod::Deflate => {
                let capacity = entry.uncompressed_size.min(MAX_PREALLOC) as usize;
                let mut out = Vec::with_capacity(capacity);
                // one byte past the declared size is enough for the size check to fail
                DeflateDecoder::new(compressed.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .with_context(|| format!("Failed to inflate {}", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => bail!(
                "Unsupported compression method {} for {} (only STORED and DEFLATE are supported)",
                method,
                entry.file_name
            ),
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }
        let actual_crc = crc32fast::hash(&data);
        if actual_crc != entry.crc32 {
            bail!(
                "CRC-32 mismatch for {}: expected {:08x}, got {:08x}",
                entry.file_name,
                entry.crc32,
                actual_crc
            );
        }

        Ok(data)
    }

    /// Read the entry called `name`, if the archive has one.
    pub async fn read_named(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.list_files().await?;
        match entries.iter().find(|e| e.file_name == name) {
            Some(entry) => Ok(Some(self.read_entry(entry).await?)),
            None => Ok(None),
        }
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = self.read_entry(entry).await?;

        let mut file = fs::File::create(output_path)
            .await
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(())
    }

    /// Extract every entry below `dest`, returning the number of files written.
    ///
    /// Entry names are validated before anything is written, so an archive
    /// with an escaping name leaves `dest` untouched.
    pub async fn extract_all(&self, dest: &Path) -> Result<usize> {
        let entries = self.list_files().await?;
        let mut planned = Vec::with_capacity(entries.len());
        for entry in &entries {
            planned.push((entry, dest.join(entry.relative_path()?)));
        }

        fs::create_dir_all(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut written = 0;
        for (entry, output_path) in planned {
            if entry.is_directory {
                fs::create_dir_all(&output_path).await?;
                continue;
            }
            trace!(entry = %entry.file_name, "extracting");
            self.extract_to_file(entry, &output_path).await?;
            written += 1;
        }

        Ok(written)
    }
}
