//! Read access to the `#Strings` and `#Blob` heaps.
//!
//! # References
//!
//! - [ECMA-335 II.24.2.3: #Strings heap](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
//! - [ECMA-335 II.24.2.4: #Blob heap](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{Error::OutOfBounds, Result};

/// The `#Strings` heap: null-terminated UTF-8 identifiers addressed by byte offset.
#[derive(Debug, Clone, Copy)]
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap the raw bytes of a `#Strings` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the mandatory
    /// empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #Strings heap is invalid"));
        }

        Ok(Strings { data })
    }

    /// The string starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is outside the heap, or
    /// [`crate::Error::Malformed`] if the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let tail = &self.data[index..];
        let Some(len) = tail.iter().position(|&b| b == 0) else {
            return Err(malformed_error!("Unterminated string at index {}", index));
        };

        std::str::from_utf8(&tail[..len])
            .map_err(|_| malformed_error!("Invalid UTF-8 string at index {}", index))
    }
}

/// The `#Blob` heap: length-prefixed byte sequences addressed by byte offset.
#[derive(Debug, Clone, Copy)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wrap the raw bytes of a `#Blob` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the mandatory
    /// empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #Blob heap is invalid"));
        }

        Ok(Blob { data })
    }

    /// The blob starting at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob extends beyond the heap, or
    /// [`crate::Error::Malformed`] if its length prefix is invalid.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut offset = index;
        let len = read_compressed_u32(self.data, &mut offset)? as usize;
        let Some(end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };
        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..end])
    }
}

/// Decode an ECMA-335 compressed unsigned integer (1, 2 or 4 bytes, big-endian).
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the encoding is truncated, or
/// [`crate::Error::Malformed`] for the reserved `111xxxxx` lead byte.
pub fn read_compressed_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    let Some(&first) = data.get(*offset) else {
        return Err(OutOfBounds);
    };

    let (len, value) = match first {
        b if b & 0x80 == 0 => (1, u32::from(b)),
        b if b & 0xC0 == 0x80 => (2, u32::from(b & 0x3F)),
        b if b & 0xE0 == 0xC0 => (4, u32::from(b & 0x1F)),
        b => {
            return Err(malformed_error!(
                "Invalid compressed integer lead byte - 0x{:02X}",
                b
            ))
        }
    };

    let Some(bytes) = data.get(*offset + 1..*offset + len) else {
        return Err(OutOfBounds);
    };

    *offset += len;
    Ok(bytes
        .iter()
        .fold(value, |acc, &b| (acc << 8) | u32::from(b)))
}
