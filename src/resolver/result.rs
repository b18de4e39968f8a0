//! Resolution result types.

use std::{fmt, path::PathBuf, sync::Arc};

use crate::{file::AssemblyData, identity::AssemblyIdentity};

/// Where a resolved binary was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssemblySource {
    /// An entry of the package archive
    Archive {
        /// Internal path of the entry
        path: String,
    },
    /// The host assembly, loaded from disk
    Host {
        /// Location of the host binary
        path: PathBuf,
    },
}

impl fmt::Display for AssemblySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblySource::Archive { path } => write!(f, "archive:{}", path),
            AssemblySource::Host { path } => write!(f, "host:{}", path.display()),
        }
    }
}

/// A located binary: its bytes, the identity parsed from them and where it came from.
#[derive(Debug)]
pub struct ResolvedAssembly {
    /// Identity read from the binary's metadata
    pub identity: AssemblyIdentity,
    /// The raw bytes of the binary
    pub data: AssemblyData,
    /// Origin of the binary
    pub source: AssemblySource,
}

impl ResolvedAssembly {
    /// `true` if this is the host assembly rather than an archive entry.
    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self.source, AssemblySource::Host { .. })
    }

    /// Internal archive path, if the binary came from the archive.
    #[must_use]
    pub fn archive_path(&self) -> Option<&str> {
        match &self.source {
            AssemblySource::Archive { path } => Some(path),
            AssemblySource::Host { .. } => None,
        }
    }
}

/// Outcome of one resolution query.
///
/// `NotFound` is a regular answer, not a failure: resolution itself never returns an error.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A matching binary was found
    Found(Arc<ResolvedAssembly>),
    /// Neither the archive nor the host assembly matched
    NotFound,
}

impl Resolution {
    /// `true` for [`Resolution::Found`].
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// The resolved binary, if any.
    #[must_use]
    pub fn assembly(&self) -> Option<&Arc<ResolvedAssembly>> {
        match self {
            Resolution::Found(assembly) => Some(assembly),
            Resolution::NotFound => None,
        }
    }

    /// Identity of the resolved binary, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&AssemblyIdentity> {
        self.assembly().map(|assembly| &assembly.identity)
    }

    /// Convert into an `Option`, dropping the distinction into `None`.
    #[must_use]
    pub fn into_option(self) -> Option<Arc<ResolvedAssembly>> {
        match self {
            Resolution::Found(assembly) => Some(assembly),
            Resolution::NotFound => None,
        }
    }
}

impl From<Option<Arc<ResolvedAssembly>>> for Resolution {
    fn from(value: Option<Arc<ResolvedAssembly>>) -> Self {
        value.map_or(Resolution::NotFound, Resolution::Found)
    }
}
