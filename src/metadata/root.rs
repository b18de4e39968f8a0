//! Metadata root header and stream directory.
//!
//! The metadata root starts with the `BSJB` signature, followed by a padded runtime version
//! string and the directory of streams (`#~` or `#-`, `#Strings`, `#Blob`, `#GUID`, `#US`).
//! Stream offsets are relative to the start of the root.
//!
//! # Example
//!
//! ```rust
//! use bindscope::metadata::root::Root;
//! let root = Root::read(&[
//!            0x42, 0x53, 0x4A, 0x42,
//!            0x01, 0x00,
//!            0x01, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!            0x04, 0x00, 0x00, 0x00,
//!            b'v', b'4', 0x00, 0x00,
//!            0x00, 0x00,
//!            0x01, 0x00,
//!            0x20, 0x00, 0x00, 0x00, // StreamHeader
//!            0x04, 0x00, 0x00, 0x00,
//!            0x23, 0x7E, 0x00, 0x00,
//!        ])?;
//! assert_eq!(root.version, "v4");
//! assert!(root.stream("#~").is_some());
//! # Ok::<(), bindscope::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::io::{read_le, read_le_at},
    Error::OutOfBounds,
    Result,
};

/// Signature of the metadata root, `BSJB` in little-endian.
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Longest stream name accepted, terminator excluded.
const MAX_STREAM_NAME: usize = 32;

/// One entry of the stream directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream, e.g. `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`.
    ///
    /// Unknown stream names are accepted; obfuscated images routinely carry extra streams
    /// and only the well-known ones are ever looked up.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header is truncated, or
    /// [`crate::Error::Malformed`] if the name is not terminated within 32 bytes.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_bytes = &data[8..];
        let Some(name_len) = name_bytes
            .iter()
            .take(MAX_STREAM_NAME + 1)
            .position(|&b| b == 0)
        else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name = std::str::from_utf8(&name_bytes[..name_len])
            .map_err(|_| malformed_error!("Stream header name is not valid UTF-8"))?;

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name: name.to_string(),
        })
    }

    /// Number of bytes this header occupies in the directory, name padding included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}

/// The metadata root header.
#[derive(Debug, Clone)]
pub struct Root {
    /// Magic signature, always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version of the metadata format
    pub major_version: u16,
    /// Minor version of the metadata format
    pub minor_version: u16,
    /// Runtime version string with its padding removed, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// The stream directory, in file order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root at the start of `data`, validating that every stream lies
    /// within `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] if the header or
    /// any stream is outside of `data` or otherwise invalid.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let version_length = read_le_at::<u32>(data, &mut 12)? as usize;
        let Some(version_end) = version_length.checked_add(16) else {
            return Err(malformed_error!(
                "Version string length causing integer overflow - {}",
                version_length
            ));
        };
        if version_end > data.len() {
            return Err(OutOfBounds);
        }

        let version_bytes = &data[16..version_end];
        let version_len = version_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_len]).into_owned();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || usize::from(stream_count) * 9 > data.len() {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            if offset > data.len() {
                return Err(OutOfBounds);
            }

            let stream = StreamHeader::from(&data[offset..])?;
            match stream.offset.checked_add(stream.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        stream.offset,
                        stream.size
                    ))
                }
            }

            offset += stream.encoded_len();
            stream_headers.push(stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            version,
            flags,
            stream_headers,
        })
    }

    /// The first stream header called `name`.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_header() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00,
        ];

        let parsed = StreamHeader::from(&header_bytes).unwrap();

        assert_eq!(parsed.offset, 0x6C);
        assert_eq!(parsed.size, 0x45A4);
        assert_eq!(parsed.name, "#~");
        assert_eq!(parsed.encoded_len(), 12);
    }

    #[test]
    fn stream_header_unterminated() {
        let mut header_bytes = vec![0x00; 8];
        header_bytes.extend(std::iter::repeat(b'A').take(40));

        assert!(StreamHeader::from(&header_bytes).is_err());
    }

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            b'v', b'4', b'.', b'0', 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x02, 0x00,

            0x34, 0x00, 0x00, 0x00, // #~
            0x04, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,

            0x38, 0x00, 0x00, 0x00, // #Strings
            0x04, 0x00, 0x00, 0x00,
            b'#', b'S', b't', b'r', b'i', b'n', b'g', b's', 0x00, 0x00, 0x00, 0x00,

            0x00, 0x00, 0x00, 0x00,
            0x00, b'A', 0x00, 0x00,
        ];

        let root = Root::read(&header_bytes).unwrap();

        assert_eq!(root.signature, CIL_HEADER_MAGIC);
        assert_eq!(root.version, "v4.0");
        assert_eq!(root.stream_headers.len(), 2);
        assert_eq!(root.stream("#Strings").unwrap().offset, 0x38);
        assert!(root.stream("#Blob").is_none());
    }

    #[test]
    fn bad_magic() {
        let mut data = vec![0u8; 40];
        data[0..4].copy_from_slice(b"BSJA");
        assert!(Root::read(&data).is_err());
    }

    #[test]
    fn stream_outside_of_root() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            b'v', b'4', 0x00, 0x00,
            0x00, 0x00,
            0x01, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];

        assert!(matches!(Root::read(&header_bytes), Err(OutOfBounds)));
    }
}
