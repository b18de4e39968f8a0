//! The CLI header (`IMAGE_COR20_HEADER`) that links a PE image to its metadata.
//!
//! Only the leading fields up to and including `Flags` are needed to locate the metadata root;
//! the remaining directory pairs are bounds checked but not kept.
//!
//! # References
//!
//! - [ECMA-335 II.25.3.3: CLI header](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::io::read_le_at, Error::OutOfBounds, Result};

/// Size in bytes of a well-formed CLI header.
pub const COR20_HEADER_SIZE: usize = 72;

/// The parsed leading part of the CLI header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header in bytes, always 72
    pub cb: u32,
    /// Major runtime version required to run the image
    pub major_runtime_version: u16,
    /// Minor runtime version required to run the image
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata in bytes
    pub meta_data_size: u32,
    /// Runtime flags (`COMIMAGE_FLAGS_*`)
    pub flags: u32,
}

impl Cor20Header {
    /// Parse a CLI header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the header, or
    /// [`crate::Error::Malformed`] if the size field or the metadata directory is invalid.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(OutOfBounds);
        }

        let mut offset = 0;
        let cb = read_le_at::<u32>(data, &mut offset)?;
        if cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = read_le_at::<u16>(data, &mut offset)?;
        let minor_runtime_version = read_le_at::<u16>(data, &mut offset)?;

        let meta_data_rva = read_le_at::<u32>(data, &mut offset)?;
        if meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        let meta_data_size = read_le_at::<u32>(data, &mut offset)?;
        if meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        } else if meta_data_size > 0x1000_0000 {
            return Err(malformed_error!(
                "Metadata size {} exceeds reasonable limit (256MB)",
                meta_data_size
            ));
        }

        let flags = read_le_at::<u32>(data, &mut offset)?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
        })
    }
}
