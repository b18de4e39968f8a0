//! Archive-aware assembly resolution.
//!
//! An [`ArchiveResolver`] answers "which binary in this package is `Name, Version, Token`?"
//! without loading or executing any code. Candidates are found through the
//! [`ArchiveIndex`], extracted on demand, identified through an [`IdentityReader`] and ranked:
//!
//! 1. Candidates whose parsed name differs from the query are ignored.
//! 2. A candidate whose token equals the query token (both absent counts as equal) is an
//!    exact match; among exact matches the highest version wins.
//! 3. Only if the query has no token and no exact match exists, candidates carrying a token
//!    are considered as fallback, again highest version first.
//! 4. Ties keep the candidate seen first in index order.
//! 5. Without any archive match, a query naming the configured [`HostAssembly`] returns the
//!    host binary loaded from disk.
//!
//! A query with a token never resolves to a binary signed with a different key, however high
//! its version.
//!
//! # Key Components
//!
//! - [`ArchiveResolver`] - the resolution engine
//! - [`ResolverBuilder`] - configuration
//! - [`Resolution`] / [`ResolvedAssembly`] - query results
//! - [`HostAssembly`] - the on-disk fallback
//!
//! # Thread Safety
//!
//! The index is immutable after construction and the candidate cache is a [`DashMap`], so a
//! single resolver can serve concurrent queries. Extraction safety is the archive's
//! responsibility, see [`Archive`].

mod builder;
mod host;
mod result;

pub use builder::ResolverBuilder;
pub use host::HostAssembly;
pub use result::{AssemblySource, Resolution, ResolvedAssembly};

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    archive::{Archive, ArchiveEntry, ArchiveIndex},
    file::AssemblyData,
    identity::AssemblyIdentity,
    metadata::IdentityReader,
    Result,
};

/// Parsed candidates by archive entry index; `None` marks a candidate that failed.
type CandidateCache = DashMap<usize, Option<Arc<ResolvedAssembly>>>;

/// Resolves assembly identities against the binaries of one archive.
///
/// The resolver borrows the archive for its whole lifetime. Construction indexes the archive
/// and is the only step that can fail; resolving never does, "not found" is a normal
/// [`Resolution`].
///
/// # Examples
///
/// ```rust
/// use bindscope::{
///     archive::MemoryArchive,
///     identity::AssemblyIdentity,
///     resolver::ArchiveResolver,
/// };
///
/// // A reader for identities stored as display names, instead of real PE images.
/// let reader = |data: &[u8]| {
///     AssemblyIdentity::parse(std::str::from_utf8(data).unwrap_or_default())
/// };
///
/// let archive = MemoryArchive::new()
///     .with_file("lib/net48/Lib.dll", b"Lib, Version=1.2.0.0".to_vec())
///     .with_file("lib/net6.0/Lib.dll", b"Lib, Version=1.3.0.0".to_vec());
///
/// let resolver = ArchiveResolver::builder(&archive).reader(reader).build()?;
/// let resolution = resolver.resolve_name("lib");
///
/// let assembly = resolution.assembly().unwrap();
/// assert_eq!(assembly.identity.version.to_string(), "1.3.0.0");
/// assert_eq!(assembly.archive_path(), Some("lib/net6.0/Lib.dll"));
/// # Ok::<(), bindscope::Error>(())
/// ```
pub struct ArchiveResolver<'a> {
    archive: &'a dyn Archive,
    index: ArchiveIndex,
    reader: Arc<dyn IdentityReader>,
    host: Option<HostAssembly>,
    host_loaded: OnceLock<Option<Arc<ResolvedAssembly>>>,
    cache: Option<CandidateCache>,
}

impl<'a> ArchiveResolver<'a> {
    /// Index `archive` and create a resolver with the default configuration: the
    /// [`crate::metadata::CilIdentityReader`], no host assembly, archive order kept and
    /// candidates cached.
    ///
    /// # Errors
    /// Returns the archive's error if it cannot be enumerated.
    pub fn new(archive: &'a dyn Archive) -> Result<Self> {
        ResolverBuilder::new(archive).build()
    }

    /// Start configuring a resolver over `archive`.
    pub fn builder(archive: &'a dyn Archive) -> ResolverBuilder<'a> {
        ResolverBuilder::new(archive)
    }

    pub(crate) fn from_parts(
        archive: &'a dyn Archive,
        index: ArchiveIndex,
        reader: Arc<dyn IdentityReader>,
        host: Option<HostAssembly>,
        cache_candidates: bool,
    ) -> Self {
        ArchiveResolver {
            archive,
            index,
            reader,
            host,
            host_loaded: OnceLock::new(),
            cache: cache_candidates.then(DashMap::new),
        }
    }

    /// The candidate index built over the archive.
    #[must_use]
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// The configured host assembly, if any.
    #[must_use]
    pub fn host_assembly(&self) -> Option<&HostAssembly> {
        self.host.as_ref()
    }

    /// Find the binary best matching `query`.
    ///
    /// Culture is ignored. See the [module documentation](self) for the ranking rules.
    #[must_use]
    pub fn resolve(&self, query: &AssemblyIdentity) -> Resolution {
        let mut best_exact: Option<Arc<ResolvedAssembly>> = None;
        let mut best_fallback: Option<Arc<ResolvedAssembly>> = None;

        for entry in self.index.candidates(&query.name) {
            let Some(candidate) = self.candidate(entry) else {
                continue;
            };

            let identity = &candidate.identity;
            if !identity.name_matches(&query.name) {
                tracing::trace!(
                    path = %entry.path,
                    parsed = %identity.name,
                    "rejecting candidate, parsed name differs"
                );
                continue;
            }

            if identity.token_matches(query) {
                if is_better(best_exact.as_ref(), &candidate) {
                    best_exact = Some(candidate);
                }
            } else if query.public_key_token.is_none() && best_exact.is_none() {
                if is_better(best_fallback.as_ref(), &candidate) {
                    best_fallback = Some(candidate);
                }
            } else {
                tracing::trace!(
                    path = %entry.path,
                    identity = %identity,
                    "rejecting candidate, public key token differs"
                );
            }
        }

        if let Some(chosen) = best_exact.or(best_fallback) {
            tracing::trace!(query = %query, chosen = %chosen.source, "resolved from archive");
            return Resolution::Found(chosen);
        }

        self.resolve_host(query).into()
    }

    /// Resolve `name` without a version or token, i.e. the best candidate of any signer.
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> Resolution {
        self.resolve(&AssemblyIdentity::named(name))
    }

    /// Resolve a batch of queries in parallel. Results are in query order.
    #[must_use]
    pub fn resolve_many(&self, queries: &[AssemblyIdentity]) -> Vec<Resolution> {
        queries.par_iter().map(|query| self.resolve(query)).collect()
    }

    fn candidate(&self, entry: &ArchiveEntry) -> Option<Arc<ResolvedAssembly>> {
        let Some(cache) = &self.cache else {
            return self.load_candidate(entry);
        };

        if let Some(cached) = cache.get(&entry.index) {
            return cached.value().clone();
        }

        // Loaded outside of the map lock; if another session raced us, its value is kept.
        let loaded = self.load_candidate(entry);
        cache.entry(entry.index).or_insert(loaded).value().clone()
    }

    fn load_candidate(&self, entry: &ArchiveEntry) -> Option<Arc<ResolvedAssembly>> {
        match self.read_candidate(entry) {
            Ok(candidate) => Some(Arc::new(candidate)),
            Err(error) => {
                tracing::warn!(path = %entry.path, %error, "skipping unreadable candidate");
                None
            }
        }
    }

    fn read_candidate(&self, entry: &ArchiveEntry) -> Result<ResolvedAssembly> {
        let bytes = self.archive.extract(entry)?;
        let identity = self.reader.read_identity(&bytes)?;

        Ok(ResolvedAssembly {
            identity,
            data: AssemblyData::from_mem(bytes),
            source: AssemblySource::Archive {
                path: entry.path.clone(),
            },
        })
    }

    fn resolve_host(&self, query: &AssemblyIdentity) -> Option<Arc<ResolvedAssembly>> {
        let host = self.host.as_ref()?;
        if !query.name_matches(&host.name) {
            return None;
        }

        tracing::debug!(
            query = %query,
            path = %host.path.display(),
            "falling back to host assembly"
        );
        self.host_loaded
            .get_or_init(|| match host.load(self.reader.as_ref()) {
                Ok(assembly) => Some(Arc::new(assembly)),
                Err(error) => {
                    tracing::warn!(
                        path = %host.path.display(),
                        %error,
                        "failed to load host assembly"
                    );
                    None
                }
            })
            .clone()
    }
}

impl fmt::Debug for ArchiveResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveResolver")
            .field("index", &self.index)
            .field("host", &self.host)
            .field("cached", &self.cache.as_ref().map(DashMap::len))
            .finish_non_exhaustive()
    }
}

/// `true` if `candidate` should replace `best`: there is none yet, or its version is strictly
/// greater. Equal versions keep the earlier candidate.
fn is_better(best: Option<&Arc<ResolvedAssembly>>, candidate: &ResolvedAssembly) -> bool {
    match best {
        None => true,
        Some(best) => candidate.identity.version > best.identity.version,
    }
}
