//! Shared helpers for unit tests.

mod image;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub use image::ImageBuilder;

use crate::{identity::AssemblyIdentity, metadata::IdentityReader, Result};

/// Reads identities stored as plain display names, e.g. `Lib, Version=1.2.0.0`.
///
/// Lets resolver tests describe candidates as text instead of crafting PE images.
pub fn text_identity(data: &[u8]) -> Result<AssemblyIdentity> {
    let display_name = std::str::from_utf8(data)
        .map_err(|_| malformed_error!("Candidate is not a textual identity"))?;
    AssemblyIdentity::parse(display_name)
}

/// A textual reader together with the number of times it has been invoked.
pub fn counting_reader() -> (Arc<AtomicUsize>, impl IdentityReader + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let reader = move |data: &[u8]| {
        counter.fetch_add(1, Ordering::SeqCst);
        text_identity(data)
    };

    (calls, reader)
}
