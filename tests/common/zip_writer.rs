//! Minimal ZIP writer for building bloomPUB fixtures.

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

struct Entry {
    name: String,
    data: Vec<u8>,
    deflate: bool,
    zip64_uncompressed: Option<u64>,
    zip64_compressed: Option<u64>,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
    bad_crc: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            data: data.to_vec(),
            deflate: false,
            zip64_uncompressed: None,
            zip64_compressed: None,
        });
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            data: data.to_vec(),
            deflate: true,
            zip64_uncompressed: None,
            zip64_compressed: None,
        });
        self
    }

    pub fn dir(self, name: &str) -> Self {
        self.stored(name, b"")
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    /// Make the central directory of the last entry claim the given sizes
    /// through a ZIP64 extra field. The local header keeps the real sizes.
    pub fn zip64_sizes(mut self, uncompressed: Option<u64>, compressed: Option<u64>) -> Self {
        let entry = self.entries.last_mut().expect("no entry to declare sizes for");
        entry.zip64_uncompressed = uncompressed;
        entry.zip64_compressed = compressed;
        self
    }

    /// Record a wrong CRC-32 for every entry.
    pub fn bad_crc(mut self) -> Self {
        self.bad_crc = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let method: u16 = if entry.deflate { 8 } else { 0 };
            let payload = if entry.deflate {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&entry.data).unwrap();
                encoder.finish().unwrap()
            } else {
                entry.data.clone()
            };
            let mut crc = crc32fast::hash(&entry.data);
            if self.bad_crc {
                crc ^= 0xdead_beef;
            }
            let offset = out.len() as u32;
            let name = entry.name.as_bytes();

            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&20u16.to_le_bytes()); // version needed
            out.extend_from_slice(&0u16.to_le_bytes()); // flags
            out.extend_from_slice(&method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // time
            out.extend_from_slice(&0x21u16.to_le_bytes()); // date: 1980-01-01
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra length
            out.extend_from_slice(name);
            out.extend_from_slice(&payload);

            central.extend_from_slice(b"PK\x01\x02");
            central.extend_from_slice(&20u16.to_le_bytes()); // version made by
            central.extend_from_slice(&20u16.to_le_bytes()); // version needed
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&method.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&0x21u16.to_le_bytes());
            central.extend_from_slice(&crc.to_le_bytes());
            let mut zip64 = Vec::new();
            let mut cd_compressed = payload.len() as u32;
            let mut cd_uncompressed = entry.data.len() as u32;
            if let Some(size) = entry.zip64_uncompressed {
                cd_uncompressed = u32::MAX;
                zip64.extend_from_slice(&size.to_le_bytes());
            }
            if let Some(size) = entry.zip64_compressed {
                cd_compressed = u32::MAX;
                zip64.extend_from_slice(&size.to_le_bytes());
            }
            let mut extra = Vec::new();
            if !zip64.is_empty() {
                extra.extend_from_slice(&1u16.to_le_bytes()); // ZIP64 header id
                extra.extend_from_slice(&(zip64.len() as u16).to_le_bytes());
                extra.extend_from_slice(&zip64);
            }

            central.extend_from_slice(&cd_compressed.to_le_bytes());
            central.extend_from_slice(&cd_uncompressed.to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // comment length
            central.extend_from_slice(&0u16.to_le_bytes()); // disk start
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(name);
            central.extend_from_slice(&extra);
        }

        let cd_offset = out.len() as u32;
        let count = self.entries.len() as u16;
        out.extend_from_slice(&central);
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }

    pub fn write_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, self.build()).unwrap();
    }
}

pub const STORY_HTML: &[u8] = b"<html><body><div class=\"bloom-page\">Once upon a time</div></body></html>";

/// A typical bloomPUB: `meta.json`, an entry document named `htm_name`
/// and an audio folder.
pub fn bloompub(path: &Path, book_instance_id: &str, htm_name: &str) -> PathBuf {
    let meta = format!(r#"{{"bookInstanceId":"{book_instance_id}","title":"Story"}}"#);
    ZipBuilder::new()
        .deflated("meta.json", meta.as_bytes())
        .deflated(htm_name, STORY_HTML)
        .stored(".distribution", b"bloom-web")
        .dir("audio/")
        .stored("audio/p1.mp3", &[0xff, 0xfb, 0x90, 0x00, 0x01, 0x02])
        .write_to(path);
    path.to_path_buf()
}
