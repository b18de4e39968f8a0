// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # bindscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/bindscope.svg)](https://crates.io/crates/bindscope)
//! [![Documentation](https://docs.rs/bindscope/badge.svg)](https://docs.rs/bindscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/bindscope/blob/main/LICENSE-APACHE)
//!
//! Archive-aware .NET assembly binding. Given a package (a `.nupkg` or any other archive of
//! binaries) and a stream of assembly identities, `bindscope` finds the binary inside the
//! package that a runtime binder would pick, using nothing but structural metadata: simple
//! name, version and public key token. No code is loaded, JIT-compiled or executed.
//!
//! ## Features
//!
//! - **📦 One pass indexing** - The archive is enumerated once, candidates are extracted lazily
//! - **🔍 Real binding rules** - Token-exact matches always win, version only breaks ties
//! - **🧩 Pluggable metadata** - Bring your own [`metadata::IdentityReader`] or use the built-in ECMA-335 reader
//! - **⚡ Concurrent** - One resolver serves many threads, batches resolve in parallel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bindscope::prelude::*;
//!
//! let package = ZipPackage::open("Newtonsoft.Json.13.0.3.nupkg")?;
//! let resolver = ArchiveResolver::new(&package)?;
//!
//! let query = AssemblyIdentity::parse(
//!     "Newtonsoft.Json, Version=13.0.0.0, Culture=neutral, PublicKeyToken=30ad4fe6b2a6aeed",
//! )?;
//! match resolver.resolve(&query) {
//!     Resolution::Found(assembly) => println!("{} -> {}", assembly.identity, assembly.source),
//!     Resolution::NotFound => println!("not in package"),
//! }
//! # Ok::<(), bindscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`archive`] - the [`archive::Archive`] capability, zip packages and the candidate index
//! - [`identity`] - assembly identities, versions and public key tokens
//! - [`metadata`] - reading an identity out of a managed PE image
//! - [`resolver`] - the resolution engine and its configuration
//! - [`file`] - byte storage of resolved binaries
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! Only opening an archive and building a resolver can fail. Resolving never returns an
//! error: a candidate that cannot be extracted or parsed is logged through `tracing` and
//! skipped, and "nothing matched" is [`Resolution::NotFound`].
//!
//! ## Logging
//!
//! `bindscope` emits [`tracing`](https://docs.rs/tracing) events and never installs a
//! subscriber; install one in the host to see them.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use bindscope::prelude::*;
///
/// let package = ZipPackage::open("package.nupkg")?;
/// let resolver = ArchiveResolver::new(&package)?;
/// println!("{} candidate binaries", resolver.index().len());
/// # Ok::<(), bindscope::Error>(())
/// ```
pub mod prelude;

pub mod archive;
pub mod file;
pub mod identity;
pub mod metadata;
pub mod resolver;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `bindscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use bindscope::{archive::ZipPackage, Error};
///
/// match ZipPackage::open("package.nupkg") {
///     Ok(_) => println!("Opened successfully"),
///     Err(Error::ArchiveError(e)) => println!("Not a package: {}", e),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The resolution engine. See [`resolver::ArchiveResolver`].
pub use resolver::{ArchiveResolver, Resolution, ResolvedAssembly};

/// Identity types used to build queries.
pub use identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken};
