//! The host assembly: the one binary that may be resolved from disk instead of the archive.

use std::path::{Path, PathBuf};

use crate::{
    file::AssemblyData,
    metadata::IdentityReader,
    resolver::{AssemblySource, ResolvedAssembly},
    Error, Result,
};

/// Descriptor of the host assembly.
///
/// When a query names this assembly and the archive has no match, the resolver loads the
/// binary at `path` and returns it. The file is only touched on the first such query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAssembly {
    /// Simple name compared (case-insensitively) against queries
    pub name: String,
    /// Location of the binary on disk
    pub path: PathBuf,
}

impl HostAssembly {
    /// Describe a host assembly by explicit name and path.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        HostAssembly {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Describe the host assembly at `path`, named after the file stem.
    ///
    /// ```rust
    /// use bindscope::resolver::HostAssembly;
    ///
    /// let host = HostAssembly::from_path("/opt/tool/Tool.Core.dll")?;
    /// assert_eq!(host.name, "Tool.Core");
    /// # Ok::<(), bindscope::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the path has no file stem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            return Err(Error::Configuration(format!(
                "Host assembly path has no usable file name: {}",
                path.display()
            )));
        };

        Ok(HostAssembly::new(stem, path))
    }

    /// Map the binary from disk and read its identity.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or `reader` rejects it.
    pub(crate) fn load(&self, reader: &dyn IdentityReader) -> Result<ResolvedAssembly> {
        let data = AssemblyData::from_path(&self.path)?;
        let identity = reader.read_identity(&data)?;

        Ok(ResolvedAssembly {
            identity,
            data,
            source: AssemblySource::Host {
                path: self.path.clone(),
            },
        })
    }
}
