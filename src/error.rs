use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only a small part of these ever reaches the caller of [`crate::ArchiveResolver::resolve`]:
/// resolution itself never fails, "not found" is a regular [`crate::Resolution`]. Errors surface
/// when an archive cannot be opened or enumerated, when a resolver is misconfigured, or when the
/// [`crate::metadata::IdentityReader`] is used directly.
///
/// # Error Categories
///
/// ## Binary Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid PE / metadata structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
/// - [`Error::ArchiveError`] - Package (zip) errors from the zip crate
///
/// ## Resolver Errors
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::Configuration`] - Invalid resolver configuration
///
/// # Examples
///
/// ```rust,no_run
/// use bindscope::{archive::ZipPackage, Error};
///
/// match ZipPackage::open("Newtonsoft.Json.13.0.3.nupkg") {
///     Ok(package) => println!("Package has {} entries", package.len()),
///     Err(Error::ArchiveError(zip_err)) => eprintln!("Not a valid package: {}", zip_err),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The binary is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Error from the zip crate while opening, enumerating or extracting a package.
    #[error("{0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// Failed to lock target.
    ///
    /// Occurs when a mutex guarding a shared archive handle has been poisoned by a
    /// panicking thread.
    #[error("Failed to lock target")]
    LockError,

    /// Invalid resolver or archive configuration.
    #[error("{0}")]
    Configuration(String),
}
