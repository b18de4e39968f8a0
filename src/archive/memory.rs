//! Archives whose entries are already held in memory.

use crate::{
    archive::{Archive, ArchiveEntry},
    Error, Result,
};

/// An archive assembled in memory, for hosts that already extracted a package or that
/// synthesise one.
///
/// Entries keep their insertion order. Extraction clones the stored bytes and is reentrant.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    entries: Vec<(ArchiveEntry, Vec<u8>)>,
}

impl MemoryArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file entry.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        self.push(path, data, false);
        self
    }

    /// Append a directory entry.
    #[must_use]
    pub fn with_directory(mut self, path: impl Into<String>) -> Self {
        self.push(path, Vec::new(), true);
        self
    }

    /// Number of entries, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, path: impl Into<String>, data: Vec<u8>, is_dir: bool) {
        let entry = ArchiveEntry::new(self.entries.len(), path, is_dir);
        self.entries.push((entry, data));
    }
}

impl Archive for MemoryArchive {
    fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        Ok(self.entries.iter().map(|(entry, _)| entry.clone()).collect())
    }

    fn extract(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        match self.entries.get(entry.index) {
            Some((stored, data)) if !stored.is_dir && stored.path == entry.path => {
                Ok(data.clone())
            }
            Some((stored, _)) if stored.is_dir => Err(Error::Configuration(format!(
                "Cannot extract directory entry '{}'",
                stored.path
            ))),
            _ => Err(Error::Configuration(format!(
                "No entry '{}' at index {}",
                entry.path, entry.index
            ))),
        }
    }
}
