//! Assembly identity as seen by the binder.
//!
//! A binding query and every candidate found in a package are described by the same
//! [`AssemblyIdentity`]: simple name, four-part version, culture and an optional public key
//! token. Matching only ever looks at the name, the token and the version; culture is
//! carried along for display and for hosts, but never influences a decision.
//!
//! # Examples
//!
//! ```rust
//! use bindscope::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let query = AssemblyIdentity::parse(
//!     "Newtonsoft.Json, Version=13.0.0.0, Culture=neutral, PublicKeyToken=30ad4fe6b2a6aeed",
//! )?;
//! assert_eq!(query.version, AssemblyVersion::new(13, 0, 0, 0));
//! assert!(query.is_strong_named());
//! assert!(query.name_matches("newtonsoft.json"));
//! # Ok::<(), bindscope::Error>(())
//! ```

use std::{fmt, fmt::Write as _, str::FromStr};

use crate::{identity::PublicKeyToken, Error, Result};

/// Complete identity information for a .NET assembly.
///
/// # Equality Semantics
///
/// `PartialEq` compares all four fields. The binder does not use it: it relies on
/// [`AssemblyIdentity::name_matches`] (case-insensitive) and
/// [`AssemblyIdentity::token_matches`] (both absent, or both present and byte-identical).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple assembly name (e.g., "mscorlib", "System.Core").
    pub name: String,

    /// Four-part version number.
    pub version: AssemblyVersion,

    /// Culture information for localized assemblies, `None` for culture-neutral ones.
    pub culture: Option<String>,

    /// Signer fingerprint, `None` for assemblies without a strong name.
    pub public_key_token: Option<PublicKeyToken>,
}

/// Four-part version numbering for .NET assemblies.
///
/// Versions are compared component-wise in order: major, minor, build, revision.
///
/// # Examples
///
/// ```rust
/// use bindscope::identity::AssemblyVersion;
///
/// let version = AssemblyVersion::new(1, 2, 3, 4);
/// assert_eq!(version.to_string(), "1.2.3.4");
///
/// let parsed = AssemblyVersion::parse("2.0")?;
/// assert!(parsed > version);
/// # Ok::<(), bindscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

/// Fold a simple name for case-insensitive comparison and bucket keys.
pub(crate) fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

impl AssemblyIdentity {
    /// Create a new assembly identity with the specified components.
    pub fn new(
        name: impl Into<String>,
        version: AssemblyVersion,
        culture: Option<String>,
        public_key_token: Option<PublicKeyToken>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            public_key_token,
        }
    }

    /// A query for `name` at [`AssemblyVersion::UNKNOWN`] without a token.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, AssemblyVersion::UNKNOWN, None, None)
    }

    /// Parse assembly identity from a display name string.
    ///
    /// # Format
    ///
    /// ```text
    /// AssemblyName[, Version=Major.Minor.Build.Revision][, Culture=culture][, PublicKeyToken=token]
    /// ```
    ///
    /// `Culture=neutral` and `PublicKeyToken=null` map to `None`. Unknown attributes such as
    /// `ProcessorArchitecture` are ignored.
    ///
    /// # Errors
    /// Returns an error if the name is empty or a component cannot be parsed.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = Self::named(name);
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!("Invalid display name component '{}'", part));
            };
            let value = value.trim();

            match key.trim() {
                key if key.eq_ignore_ascii_case("Version") => {
                    identity.version = AssemblyVersion::parse(value)?;
                }
                key if key.eq_ignore_ascii_case("Culture") => {
                    if !value.eq_ignore_ascii_case("neutral") && !value.is_empty() {
                        identity.culture = Some(value.to_string());
                    }
                }
                key if key.eq_ignore_ascii_case("PublicKeyToken") => {
                    if !value.eq_ignore_ascii_case("null") && !value.is_empty() {
                        identity.public_key_token = Some(PublicKeyToken::parse(value)?);
                    }
                }
                _ => {}
            }
        }

        Ok(identity)
    }

    /// Generate the display name string for this assembly identity.
    ///
    /// ```rust
    /// use bindscope::identity::{AssemblyIdentity, AssemblyVersion};
    ///
    /// let identity = AssemblyIdentity::new("Lib", AssemblyVersion::new(1, 2, 0, 0), None, None);
    /// assert_eq!(
    ///     identity.display_name(),
    ///     "Lib, Version=1.2.0.0, Culture=neutral, PublicKeyToken=null"
    /// );
    /// ```
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 64);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );
        match &self.public_key_token {
            Some(token) => {
                let _ = write!(result, ", PublicKeyToken={}", token);
            }
            None => result.push_str(", PublicKeyToken=null"),
        }

        result
    }

    /// Get the simple assembly name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Check if this assembly carries a signer fingerprint.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.public_key_token.is_some()
    }

    /// Check if this assembly is culture-neutral.
    #[must_use]
    pub fn is_culture_neutral(&self) -> bool {
        self.culture.is_none()
    }

    /// Case-insensitive comparison of the simple name.
    #[must_use]
    pub fn name_matches(&self, name: &str) -> bool {
        self.name == name || fold_name(&self.name) == fold_name(name)
    }

    /// Fingerprint equality: both tokens absent, or both present and byte-identical.
    #[must_use]
    pub fn token_matches(&self, other: &AssemblyIdentity) -> bool {
        self.public_key_token == other.public_key_token
    }
}

impl AssemblyVersion {
    /// Sentinel value representing an unknown or unspecified version (0.0.0.0).
    pub const UNKNOWN: Self = Self {
        major: 0,
        minor: 0,
        build: 0,
        revision: 0,
    };

    /// Create a new assembly version with the specified components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Check if this version equals [`AssemblyVersion::UNKNOWN`].
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.build == 0 && self.revision == 0
    }

    /// Parse assembly version from string representation.
    ///
    /// Between one and four dot-separated components are accepted; missing components
    /// default to 0.
    ///
    /// # Errors
    /// Returns an error if the version string has an invalid format.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.trim().split('.').collect();

        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: '{}'", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
