//! Byte storage for resolved assemblies.
//!
//! An assembly found inside a package is extracted into an owned buffer ([`Memory`]), while the
//! host assembly is memory-mapped from disk ([`Physical`]). Both are exposed through the
//! [`Backend`] trait and wrapped by [`AssemblyData`], so callers receive the same type no matter
//! where the binary came from.
//!
//! # Key Components
//!
//! - [`Backend`] - bounds-checked access to raw bytes
//! - [`AssemblyData`] - the owned, shareable byte handle returned by the resolver
//! - [`io`] - little-endian read helpers used by the metadata reader

pub mod io;
mod memory;
mod physical;

pub use memory::Memory;
pub use physical::Physical;

use crate::{Error::OutOfBounds, Result};
use std::{fmt, ops::Deref, path::Path};

/// Backend for assembly data.
///
/// Implementations must be shareable between threads, as a resolved assembly is handed to
/// every resolution session that asks for it.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let data = self.data();
        offset
            .checked_add(len)
            .and_then(|end| data.get(offset..end))
            .ok_or(OutOfBounds)
    }

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }
}

/// The raw bytes of a resolved assembly.
///
/// Dereferences to `[u8]`.
///
/// # Examples
///
/// ```rust
/// use bindscope::file::AssemblyData;
///
/// let data = AssemblyData::from_mem(vec![0x4D, 0x5A]);
/// assert_eq!(&data[..2], b"MZ");
/// assert_eq!(data.len(), 2);
/// ```
pub struct AssemblyData {
    backend: Box<dyn Backend>,
}

impl AssemblyData {
    /// Wrap an owned buffer.
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> Self {
        AssemblyData {
            backend: Box::new(Memory::from(data)),
        }
    }

    /// Memory-map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(AssemblyData {
            backend: Box::new(Physical::new(path)?),
        })
    }

    /// Returns the entire data buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Returns a bounds-checked slice of the data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.backend.data_slice(offset, len)
    }
}

impl Deref for AssemblyData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.backend.data()
    }
}

impl fmt::Debug for AssemblyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyData")
            .field("len", &self.backend.len())
            .finish()
    }
}
