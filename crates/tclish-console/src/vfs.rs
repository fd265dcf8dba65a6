//! In-memory filesystem populated from bundle archives.

use crate::error::Result;
use rustc_hash::FxHashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::read::ZipArchive;

/// Text files keyed by normalized `/`-separated relative paths
#[derive(Debug, Default, Clone)]
pub struct VirtualFs {
    files: FxHashMap<String, String>,
}

/// Strip `./` segments and leading or doubled separators
pub fn normalize(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

impl VirtualFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(normalize(path), content.into());
    }

    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize(path)).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sorted paths, for listings
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.files.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Unpack every file of a zip archive, returning how many were added.
    /// Entries escaping the archive root and non-UTF-8 files are skipped.
    pub fn unpack_zip(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut added = 0;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let Some(path) = entry.enclosed_name() else {
                warn!("Skipping unsafe archive entry {}", entry.name());
                continue;
            };
            let path = normalize(&path.to_string_lossy());
            let mut content = String::new();
            if entry.read_to_string(&mut content).is_err() {
                warn!("Skipping non-text archive entry {}", path);
                continue;
            }
            debug!("Unpacked {}", path);
            self.files.insert(path, content);
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./a//b/c.tcl"), "a/b/c.tcl");
        assert_eq!(normalize("/a\\b"), "a/b");
    }

    #[test]
    fn test_unpack_zip() {
        let bytes = archive(&[
            ("tclish/init.tcl", b"print hi"),
            ("data.bin", &[0xff, 0xfe, 0x00]),
        ]);
        let mut vfs = VirtualFs::new();
        assert_eq!(vfs.unpack_zip(&bytes).unwrap(), 1);
        assert_eq!(vfs.read("./tclish/init.tcl"), Some("print hi"));
        assert!(!vfs.contains("data.bin"));
    }

    #[test]
    fn test_malformed_archive() {
        let mut vfs = VirtualFs::new();
        assert!(vfs.unpack_zip(b"definitely not a zip").is_err());
        assert!(vfs.is_empty());
    }
}
