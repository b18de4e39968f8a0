//! Assembly identities and signer fingerprints.
//!
//! # Key Components
//!
//! - [`AssemblyIdentity`] - simple name, version, culture and optional public key token
//! - [`AssemblyVersion`] - four-part version numbering with total ordering
//! - [`PublicKeyToken`] - the fingerprint compared during binding
//!
//! The fingerprint is always an `Option<PublicKeyToken>`. "No fingerprint" and "a fingerprint
//! made of zero bytes" are different values and never compare equal.

mod assembly;
mod token;

pub(crate) use assembly::fold_name;
pub use assembly::{AssemblyIdentity, AssemblyVersion};
pub use token::{PublicKeyToken, PUBLIC_KEY_TOKEN_LEN};
