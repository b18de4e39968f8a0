//! Builder-style configuration of an [`ArchiveResolver`].

use std::sync::Arc;

use crate::{
    archive::{Archive, ArchiveIndex},
    metadata::{CilIdentityReader, IdentityReader},
    resolver::{ArchiveResolver, HostAssembly},
    Error, Result,
};

/// Configures and builds an [`ArchiveResolver`].
///
/// Obtained through [`ArchiveResolver::builder`]. Building indexes the archive; once
/// [`ResolverBuilder::build`] returns, the resolver is complete and can be shared between
/// threads.
///
/// # Examples
///
/// ```rust,no_run
/// use bindscope::{archive::ZipPackage, resolver::{ArchiveResolver, HostAssembly}};
///
/// let package = ZipPackage::open("Newtonsoft.Json.13.0.3.nupkg")?;
/// let resolver = ArchiveResolver::builder(&package)
///     .host_assembly(HostAssembly::from_path("/opt/tool/Tool.Core.dll")?)
///     .sort_entries(true)
///     .build()?;
///
/// let resolution = resolver.resolve_name("Newtonsoft.Json");
/// # Ok::<(), bindscope::Error>(())
/// ```
pub struct ResolverBuilder<'a> {
    archive: &'a dyn Archive,
    reader: Option<Arc<dyn IdentityReader>>,
    host: Option<HostAssembly>,
    sort_entries: bool,
    cache_candidates: bool,
}

impl<'a> ResolverBuilder<'a> {
    pub(crate) fn new(archive: &'a dyn Archive) -> Self {
        ResolverBuilder {
            archive,
            reader: None,
            host: None,
            sort_entries: false,
            cache_candidates: true,
        }
    }

    /// Use `reader` to parse the identity of candidates and of the host assembly.
    ///
    /// Defaults to [`CilIdentityReader`].
    #[must_use]
    pub fn reader(mut self, reader: impl IdentityReader + 'static) -> Self {
        self.reader = Some(Arc::new(reader));
        self
    }

    /// Share an existing reader with this resolver.
    #[must_use]
    pub fn shared_reader(mut self, reader: Arc<dyn IdentityReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Fall back to `host` for queries naming it that the archive cannot satisfy.
    #[must_use]
    pub fn host_assembly(mut self, host: HostAssembly) -> Self {
        self.host = Some(host);
        self
    }

    /// Sort archive entries by path before indexing, instead of keeping archive order.
    ///
    /// Only affects which of several identical candidates wins. Enable it when the archive
    /// source does not guarantee a stable enumeration order.
    #[must_use]
    pub fn sort_entries(mut self, enabled: bool) -> Self {
        self.sort_entries = enabled;
        self
    }

    /// Keep every extracted and parsed candidate for the lifetime of the resolver.
    ///
    /// Enabled by default. When disabled, every query extracts and parses its candidates
    /// again.
    #[must_use]
    pub fn cache_candidates(mut self, enabled: bool) -> Self {
        self.cache_candidates = enabled;
        self
    }

    /// Index the archive and create the resolver.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the host assembly has an empty name, or the error of
    /// the archive if it cannot be enumerated.
    pub fn build(self) -> Result<ArchiveResolver<'a>> {
        if let Some(host) = &self.host {
            if host.name.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "Host assembly at {} has an empty name",
                    host.path.display()
                )));
            }
        }

        let index = if self.sort_entries {
            ArchiveIndex::build_sorted(self.archive)?
        } else {
            ArchiveIndex::build(self.archive)?
        };

        let reader = self
            .reader
            .unwrap_or_else(|| Arc::new(CilIdentityReader::new()));

        Ok(ArchiveResolver::from_parts(
            self.archive,
            index,
            reader,
            self.host,
            self.cache_candidates,
        ))
    }
}
