//! Reading assembly identities out of binaries.
//!
//! The resolver never parses binaries itself. It delegates to an [`IdentityReader`], so hosts
//! with their own metadata loader can plug it in, while [`CilIdentityReader`] covers managed
//! PE images out of the box.
//!
//! # Key Components
//!
//! - [`IdentityReader`] - the "bytes in, identity out" capability
//! - [`CilIdentityReader`] - reads the `Assembly` row of ECMA-335 metadata
//! - [`root`], [`tables`], [`heaps`] - the metadata structures walked to get there
//!
//! # Examples
//!
//! Any closure with the right shape is a reader:
//!
//! ```rust
//! use bindscope::{identity::AssemblyIdentity, metadata::IdentityReader};
//!
//! let reader = |data: &[u8]| AssemblyIdentity::parse(std::str::from_utf8(data).unwrap_or(""));
//! let identity = reader.read_identity(b"Lib, Version=1.0.0.0")?;
//! assert_eq!(identity.name, "Lib");
//! # Ok::<(), bindscope::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 Partition II](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

pub mod cor20;
pub mod heaps;
mod image;
mod reader;
pub mod root;
pub mod tables;

pub use image::CilImage;
pub use reader::CilIdentityReader;

use crate::{identity::AssemblyIdentity, Result};

/// Turns the raw bytes of a candidate binary into its assembly identity.
///
/// Called concurrently from every resolution session that shares a resolver, hence the
/// `Send + Sync` bound. A failure only disqualifies the one candidate being read.
pub trait IdentityReader: Send + Sync {
    /// Parse the identity of the binary in `data`.
    ///
    /// # Errors
    /// Returns an error if `data` is not a binary this reader understands.
    fn read_identity(&self, data: &[u8]) -> Result<AssemblyIdentity>;
}

impl<F> IdentityReader for F
where
    F: Fn(&[u8]) -> Result<AssemblyIdentity> + Send + Sync,
{
    fn read_identity(&self, data: &[u8]) -> Result<AssemblyIdentity> {
        self(data)
    }
}
