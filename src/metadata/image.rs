//! Locating the CLI metadata inside a PE image.

use goblin::pe::{section_table::SectionTable, PE};

use crate::{
    metadata::cor20::{Cor20Header, COR20_HEADER_SIZE},
    Error::{Empty, OutOfBounds},
    Result,
};

/// A parsed PE image that carries a CLR runtime header.
pub struct CilImage<'a> {
    data: &'a [u8],
    sections: Vec<SectionTable>,
    clr_rva: u32,
    clr_size: u32,
}

impl<'a> CilImage<'a> {
    /// Parse `data` as a PE image and check that it has a CLR runtime header directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::GoblinErr`] if the
    /// PE structure is invalid, or [`crate::Error::Malformed`] if the image is not managed.
    pub fn parse(data: &'a [u8]) -> Result<CilImage<'a>> {
        if data.is_empty() {
            return Err(Empty);
        }

        let pe = PE::parse(data)?;
        let Some(optional_header) = pe.header.optional_header else {
            return Err(malformed_error!("File does not have an OptionalHeader"));
        };

        let Some((clr_rva, clr_size)) = optional_header
            .data_directories
            .get_clr_runtime_header()
            .as_ref()
            .map(|dir| (dir.virtual_address, dir.size))
        else {
            return Err(malformed_error!(
                "File does not have a CLR runtime header directory"
            ));
        };

        if clr_rva == 0 || (clr_size as usize) < COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "CLR runtime header directory is invalid - 0x{:X}:{}",
                clr_rva,
                clr_size
            ));
        }

        Ok(CilImage {
            data,
            sections: pe.sections,
            clr_rva,
            clr_size,
        })
    }

    /// Convert a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        for section in &self.sections {
            let span = section.virtual_size.max(section.size_of_raw_data);
            let Some(section_max) = section.virtual_address.checked_add(span) else {
                return Err(malformed_error!(
                    "Section malformed, causing integer overflow - {} + {}",
                    section.virtual_address,
                    span
                ));
            };

            if section.virtual_address <= rva && rva < section_max {
                return Ok((rva - section.virtual_address) as usize
                    + section.pointer_to_raw_data as usize);
            }
        }

        Err(malformed_error!(
            "RVA could not be converted to offset - {}",
            rva
        ))
    }

    /// `len` bytes of the file starting at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn slice_at_rva(&self, rva: u32, len: usize) -> Result<&'a [u8]> {
        let start = self.rva_to_offset(rva)?;
        let end = start.checked_add(len).ok_or(OutOfBounds)?;
        self.data.get(start..end).ok_or(OutOfBounds)
    }

    /// The CLI header of the image.
    ///
    /// # Errors
    /// Returns an error if the header is outside the file or invalid.
    pub fn cor20(&self) -> Result<Cor20Header> {
        let len = (self.clr_size as usize).min(COR20_HEADER_SIZE);
        Cor20Header::read(self.slice_at_rva(self.clr_rva, len)?)
    }

    /// The metadata blob the CLI header points at, starting with the `BSJB` root.
    ///
    /// # Errors
    /// Returns an error if the CLI header is invalid or the metadata is outside the file.
    pub fn metadata(&self) -> Result<&'a [u8]> {
        let header = self.cor20()?;
        self.slice_at_rva(header.meta_data_rva, header.meta_data_size as usize)
    }
}
