//! Candidate index over the binaries of an archive.
//!
//! The index is a single structural pass: no entry is extracted and no metadata is parsed.
//! Directories and entries without a recognised [`BinaryExtension`](super::BinaryExtension)
//! are dropped, everything else lands in the bucket of its case-folded simple name, in
//! enumeration order. After construction the index is never mutated and can be shared freely
//! between threads.

use std::collections::HashMap;

use crate::{
    archive::{Archive, ArchiveEntry},
    identity::fold_name,
    Result,
};

/// Map from case-insensitive simple name to the ordered entries carrying that name.
///
/// # Examples
///
/// ```rust
/// use bindscope::archive::{ArchiveIndex, MemoryArchive};
///
/// let archive = MemoryArchive::new()
///     .with_file("Lib.dll", vec![])
///     .with_file("sub/LIB.dll", vec![])
///     .with_file("tools/Tool.exe", vec![]);
///
/// let index = ArchiveIndex::build(&archive)?;
/// let bucket = index.candidates("lib");
/// assert_eq!(bucket.len(), 2);
/// assert_eq!(bucket[0].path, "Lib.dll");
/// assert_eq!(index.bucket_count(), 2);
/// # Ok::<(), bindscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    buckets: HashMap<String, Vec<ArchiveEntry>>,
    entry_count: usize,
}

impl ArchiveIndex {
    /// Index `archive`, keeping its enumeration order inside every bucket.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be enumerated.
    pub fn build<A: Archive + ?Sized>(archive: &A) -> Result<Self> {
        Ok(Self::from_entries(archive.entries()?))
    }

    /// Index `archive` after sorting its entries by path.
    ///
    /// Use this for archive sources that do not guarantee a stable enumeration order; the
    /// first-wins tie-break between identical candidates then follows path order.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be enumerated.
    pub fn build_sorted<A: Archive + ?Sized>(archive: &A) -> Result<Self> {
        let mut entries = archive.entries()?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        let total = entries.len();
        let mut index = ArchiveIndex::default();

        for entry in entries {
            if entry.is_dir {
                continue;
            }
            if entry.binary_extension().is_none() {
                tracing::trace!(path = %entry.path, "skipping non-binary entry");
                continue;
            }

            index
                .buckets
                .entry(fold_name(entry.simple_name()))
                .or_default()
                .push(entry);
            index.entry_count += 1;
        }

        tracing::debug!(
            entries = total,
            candidates = index.entry_count,
            buckets = index.buckets.len(),
            "indexed archive"
        );
        index
    }

    /// The bucket for `simple_name`, compared case-insensitively. Empty if there is none.
    #[must_use]
    pub fn candidates(&self, simple_name: &str) -> &[ArchiveEntry] {
        self.buckets
            .get(&fold_name(simple_name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether a bucket exists for `simple_name`.
    #[must_use]
    pub fn contains(&self, simple_name: &str) -> bool {
        self.buckets.contains_key(&fold_name(simple_name))
    }

    /// Number of indexed binary entries across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// `true` if the archive holds no candidate binaries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Number of distinct simple names.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The case-folded simple names present, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;

    fn sample() -> MemoryArchive {
        MemoryArchive::new()
            .with_directory("lib/")
            .with_file("sub/Lib.dll", vec![])
            .with_file("Lib.dll", vec![])
            .with_file("Lib.xml", vec![])
            .with_file("Lib.pdb", vec![])
            .with_file("tools/Lib.EXE", vec![])
            .with_file("Other.dll", vec![])
            .with_directory("lib/Fake.dll/")
    }

    #[test]
    fn only_binaries_are_indexed() {
        let index = ArchiveIndex::build(&sample()).unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.bucket_count(), 2);
        assert!(index.candidates("fake").is_empty());
        assert!(!index.contains("Fake"));

        let mut names: Vec<&str> = index.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["lib", "other"]);
    }

    #[test]
    fn buckets_keep_enumeration_order() {
        let index = ArchiveIndex::build(&sample()).unwrap();

        let paths: Vec<&str> = index
            .candidates("LIB")
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, ["sub/Lib.dll", "Lib.dll", "tools/Lib.EXE"]);
    }

    #[test]
    fn sorted_build_orders_by_path() {
        let index = ArchiveIndex::build_sorted(&sample()).unwrap();

        let paths: Vec<&str> = index
            .candidates("lib")
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, ["Lib.dll", "sub/Lib.dll", "tools/Lib.EXE"]);
        // Entry indexes still point into the original enumeration.
        assert_eq!(index.candidates("lib")[0].index, 2);
    }

    #[test]
    fn empty_archive() {
        let index = ArchiveIndex::build(&MemoryArchive::new()).unwrap();

        assert!(index.is_empty());
        assert_eq!(index.bucket_count(), 0);
        assert!(index.candidates("anything").is_empty());
    }

    #[test]
    fn enumeration_failure_is_fatal() {
        struct Broken;

        impl Archive for Broken {
            fn entries(&self) -> Result<Vec<ArchiveEntry>> {
                Err(crate::Error::NotSupported)
            }

            fn extract(&self, _entry: &ArchiveEntry) -> Result<Vec<u8>> {
                unreachable!()
            }
        }

        assert!(ArchiveIndex::build(&Broken).is_err());
    }
}
