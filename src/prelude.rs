//! # bindscope Prelude
//!
//! The most commonly used types, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all bindscope operations
pub use crate::Error;

/// The result type used throughout bindscope
pub use crate::Result;

// ================================================================================================
// Archives
// ================================================================================================

/// Archive capability and the provided archive sources
pub use crate::archive::{Archive, ArchiveEntry, ArchiveIndex, MemoryArchive, ZipPackage};

// ================================================================================================
// Identities
// ================================================================================================

/// Assembly identity, version and signer fingerprint
pub use crate::identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken};

// ================================================================================================
// Metadata
// ================================================================================================

/// Identity extraction from binaries
pub use crate::metadata::{CilIdentityReader, IdentityReader};

// ================================================================================================
// Resolution
// ================================================================================================

/// Resolver, its configuration and results
pub use crate::resolver::{
    ArchiveResolver, AssemblySource, HostAssembly, Resolution, ResolvedAssembly, ResolverBuilder,
};

/// Byte storage of resolved binaries
pub use crate::file::AssemblyData;
