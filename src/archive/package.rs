//! Zip based packages such as `.nupkg` files.
//!
//! The central directory is read once when the package is opened; a package that cannot be
//! opened or enumerated is rejected there. Extraction shares one `ZipArchive` reader, so it
//! is serialised behind a mutex. Only the decompression of a single entry holds the lock.
//!
//! Entry sizes recorded in the archive are not trusted: extraction stops at the package's
//! entry limit ([`MAX_ENTRY_SIZE`] unless changed) and fails the entry instead.

use std::{
    fs,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
    sync::Mutex,
};

use zip::ZipArchive;

use crate::{
    archive::{Archive, ArchiveEntry},
    Error, Result,
};

/// Default upper bound for the uncompressed size of a single extracted entry (256 MiB).
pub const MAX_ENTRY_SIZE: u64 = 0x1000_0000;

/// Largest buffer reserved up front, whatever size the entry claims.
const INITIAL_CAPACITY: u64 = 0x80_0000;

/// A package stored as a zip archive.
///
/// # Examples
///
/// ```rust,no_run
/// use bindscope::archive::{Archive, ZipPackage};
///
/// let package = ZipPackage::open("Newtonsoft.Json.13.0.3.nupkg")?;
/// for entry in package.entries()? {
///     println!("{}", entry.path);
/// }
/// # Ok::<(), bindscope::Error>(())
/// ```
pub struct ZipPackage<R> {
    archive: Mutex<ZipArchive<R>>,
    entries: Vec<ArchiveEntry>,
    entry_limit: u64,
}

impl ZipPackage<BufReader<fs::File>> {
    /// Open the package at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a readable zip archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl ZipPackage<Cursor<Vec<u8>>> {
    /// Open a package held in memory.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a readable zip archive.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(data))
    }
}

impl<R: Read + Seek> ZipPackage<R> {
    /// Open a package from any seekable reader.
    ///
    /// # Errors
    /// Returns an error if the central directory cannot be read.
    pub fn new(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            entries.push(ArchiveEntry::new(index, file.name(), file.is_dir()));
        }

        Ok(ZipPackage {
            archive: Mutex::new(archive),
            entries,
            entry_limit: MAX_ENTRY_SIZE,
        })
    }

    /// Set the largest uncompressed size accepted for one entry. Bigger entries fail to
    /// extract and are skipped by the resolver.
    #[must_use]
    pub fn with_entry_limit(mut self, limit: u64) -> Self {
        self.entry_limit = limit;
        self
    }

    /// The largest uncompressed size accepted for one entry.
    #[must_use]
    pub fn entry_limit(&self) -> u64 {
        self.entry_limit
    }

    /// Number of entries, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the package has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R: Read + Seek + Send> Archive for ZipPackage<R> {
    fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        Ok(self.entries.clone())
    }

    fn extract(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        if entry.is_dir {
            return Err(Error::Configuration(format!(
                "Cannot extract directory entry '{}'",
                entry.path
            )));
        }

        let mut archive = self.archive.lock().map_err(|_| Error::LockError)?;
        let mut file = archive.by_index(entry.index)?;

        let declared = file.size();
        if declared > self.entry_limit {
            return Err(malformed_error!(
                "Entry '{}' declares {} bytes, limit is {}",
                entry.path,
                declared,
                self.entry_limit
            ));
        }

        let capacity = usize::try_from(declared.min(INITIAL_CAPACITY)).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        file.by_ref()
            .take(self.entry_limit.saturating_add(1))
            .read_to_end(&mut data)?;

        if data.len() as u64 > self.entry_limit {
            return Err(malformed_error!(
                "Entry '{}' exceeds the limit of {} bytes",
                entry.path,
                self.entry_limit
            ));
        }
        Ok(data)
    }
}
