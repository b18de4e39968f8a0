//! Read-only package archives and the candidate index built over them.
//!
//! An archive is anything that can enumerate its entries and extract one entry into bytes.
//! The resolver never owns the archive; it borrows it for its whole lifetime and only keeps
//! [`ArchiveEntry`] keys grouped by simple name.
//!
//! # Key Components
//!
//! - [`Archive`] - the enumerate / extract capability
//! - [`ArchiveEntry`] - one entry of an archive, identified by its enumeration index
//! - [`BinaryExtension`] - the two file extensions that mark a candidate binary
//! - [`ZipPackage`] - a zip based package (e.g. `.nupkg`)
//! - [`MemoryArchive`] - entries held in memory
//! - [`ArchiveIndex`] - simple name to candidate bucket map
//!
//! # Examples
//!
//! ```rust
//! use bindscope::archive::{Archive, ArchiveIndex, MemoryArchive};
//!
//! let archive = MemoryArchive::new()
//!     .with_file("lib/net48/Lib.dll", vec![0x4D, 0x5A])
//!     .with_file("lib/net48/Lib.xml", b"<doc/>".to_vec());
//!
//! let index = ArchiveIndex::build(&archive)?;
//! assert_eq!(index.candidates("lib").len(), 1);
//! # Ok::<(), bindscope::Error>(())
//! ```

mod index;
mod memory;
mod package;

pub use index::ArchiveIndex;
pub use memory::MemoryArchive;
pub use package::{ZipPackage, MAX_ENTRY_SIZE};

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::Result;

/// A read-only collection of entries that can be extracted on demand.
///
/// `extract` may be called concurrently from several resolution sessions; implementations
/// must either be reentrant or serialise extraction internally.
pub trait Archive: Send + Sync {
    /// Enumerate every entry, in a stable order.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be enumerated.
    fn entries(&self) -> Result<Vec<ArchiveEntry>>;

    /// Extract the bytes of `entry`.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be read or decompressed.
    fn extract(&self, entry: &ArchiveEntry) -> Result<Vec<u8>>;
}

/// The file extensions that identify a candidate binary, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum BinaryExtension {
    /// Class libraries
    #[strum(serialize = "dll")]
    Dll,
    /// Executables
    #[strum(serialize = "exe")]
    Exe,
}

impl BinaryExtension {
    /// Classify a path by its extension.
    #[must_use]
    pub fn of(path: &str) -> Option<Self> {
        split_extension(file_name(path)).1?.parse().ok()
    }
}

/// One entry of an [`Archive`].
///
/// `index` is the position of the entry in the archive's own enumeration and is the key used
/// to extract it again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveEntry {
    /// Position in the archive's enumeration
    pub index: usize,
    /// Internal path, `/` separated for zip packages
    pub path: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl ArchiveEntry {
    /// Create an entry descriptor.
    pub fn new(index: usize, path: impl Into<String>, is_dir: bool) -> Self {
        ArchiveEntry {
            index,
            path: path.into(),
            is_dir,
        }
    }

    /// Last path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    /// File name without directory path and without its final extension.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        split_extension(self.file_name()).0
    }

    /// Final extension of the file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        split_extension(self.file_name()).1
    }

    /// The recognised binary kind of this entry, if any.
    #[must_use]
    pub fn binary_extension(&self) -> Option<BinaryExtension> {
        if self.is_dir {
            return None;
        }
        self.extension()?.parse().ok()
    }
}

fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, None),
        Some(pos) => (&file_name[..pos], Some(&file_name[pos + 1..])),
    }
}
