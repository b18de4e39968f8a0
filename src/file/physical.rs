//! Memory-mapped byte backend for the host assembly, the only binary read from outside the
//! package.

use super::Backend;
use crate::Result;

use memmap2::Mmap;
use std::{fs, path::Path};

/// Assembly bytes backed by a read-only memory map.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path` into memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // The mapping is read-only and the file handle stays owned by the map.
        let data = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn physical() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"MZ\x90\x00rest-of-image").unwrap();
        file.flush().unwrap();

        let physical = Physical::new(file.path()).unwrap();

        assert_eq!(physical.len(), 17);
        assert_eq!(physical.data_slice(0, 2).unwrap(), b"MZ");
        assert!(physical.data_slice(16, 2).is_err());
    }

    #[test]
    fn missing_file() {
        let result = Physical::new("/nonexistent/bindscope/host.dll");
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }
}
