//! The `#~` / `#-` table stream, sized just far enough to reach the `Assembly` table.
//!
//! Rows of the metadata tables have no length prefix: the width of every column depends on
//! the heap size flags and on the row counts of the tables a column refers to. Reading the
//! `Assembly` table (`0x20`) therefore requires the row sizes of all tables `0x00..=0x1F`
//! that precede it, including their coded index columns.
//!
//! # References
//!
//! - [ECMA-335 II.24.2.6: #~ stream](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
//! - [ECMA-335 II.22: Metadata logical format: tables](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use bitflags::bitflags;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    Error::OutOfBounds,
    Result,
};

bitflags! {
    /// The `HeapSizes` byte of the tables header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeapSizes: u8 {
        /// `#Strings` indexes are 4 bytes wide
        const LARGE_STRINGS = 0x01;
        /// `#GUID` indexes are 4 bytes wide
        const LARGE_GUID = 0x02;
        /// `#Blob` indexes are 4 bytes wide
        const LARGE_BLOB = 0x04;
        /// Uncompressed stream with extra padding rows
        const PADDING = 0x08;
        /// Delta metadata only
        const DELTA_ONLY = 0x20;
        /// Four bytes of extra data follow the row counts
        const EXTRA_DATA = 0x40;
        /// Rows may be marked deleted
        const HAS_DELETE = 0x80;
    }
}

bitflags! {
    /// The `Flags` column of the `Assembly` table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AssemblyFlags: u32 {
        /// The public key column holds the full key
        const PUBLIC_KEY = 0x0001;
        /// The assembly may be retargeted at runtime
        const RETARGETABLE = 0x0100;
        /// JIT optimizer disabled
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// JIT tracking enabled
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// Identifiers of the metadata tables, in stream order.
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, Eq, Hash)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRVA = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOS = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOS = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

/// The coded index kinds used by the tables preceding `Assembly`.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef` or `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param` or `Property`
    HasConstant,
    /// Anything that can carry a custom attribute
    HasCustomAttribute,
    /// `Field` or `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef` or `Assembly`
    HasDeclSecurity,
    /// Parent of a `MemberRef`
    MemberRefParent,
    /// `Event` or `Property`
    HasSemantics,
    /// `MethodDef` or `MemberRef`
    MethodDefOrRef,
    /// `Field` or `MethodDef`
    MemberForwarded,
    /// Constructor of a custom attribute
    CustomAttributeType,
    /// Scope of a `TypeRef`
    ResolutionScope,
}

impl CodedIndexType {
    /// Tables this coded index may point into. Reserved tag values are omitted.
    #[must_use]
    pub fn tables(self) -> &'static [TableId] {
        use TableId::*;

        match self {
            CodedIndexType::TypeDefOrRef => &[TypeDef, TypeRef, TypeSpec],
            CodedIndexType::HasConstant => &[Field, Param, Property],
            CodedIndexType::HasCustomAttribute => &[
                MethodDef,
                Field,
                TypeRef,
                TypeDef,
                Param,
                InterfaceImpl,
                MemberRef,
                Module,
                DeclSecurity,
                Property,
                Event,
                StandAloneSig,
                ModuleRef,
                TypeSpec,
                Assembly,
                AssemblyRef,
                File,
                ExportedType,
                ManifestResource,
                GenericParam,
                GenericParamConstraint,
                MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[Field, Param],
            CodedIndexType::HasDeclSecurity => &[TypeDef, MethodDef, Assembly],
            CodedIndexType::MemberRefParent => &[TypeDef, TypeRef, ModuleRef, MethodDef, TypeSpec],
            CodedIndexType::HasSemantics => &[Event, Property],
            CodedIndexType::MethodDefOrRef => &[MethodDef, MemberRef],
            CodedIndexType::MemberForwarded => &[Field, MethodDef],
            CodedIndexType::CustomAttributeType => &[MethodDef, MemberRef],
            CodedIndexType::ResolutionScope => &[Module, ModuleRef, AssemblyRef, TypeRef],
        }
    }

    /// Number of low bits used for the tag.
    #[must_use]
    pub fn tag_bits(self) -> u32 {
        match self {
            CodedIndexType::HasFieldMarshal
            | CodedIndexType::HasSemantics
            | CodedIndexType::MethodDefOrRef
            | CodedIndexType::MemberForwarded => 1,
            CodedIndexType::TypeDefOrRef
            | CodedIndexType::HasConstant
            | CodedIndexType::HasDeclSecurity
            | CodedIndexType::ResolutionScope => 2,
            CodedIndexType::MemberRefParent | CodedIndexType::CustomAttributeType => 3,
            CodedIndexType::HasCustomAttribute => 5,
        }
    }
}

/// Row counts and heap index widths of a table stream.
#[derive(Debug, Clone)]
pub struct TableInfo {
    rows: [u32; 64],
    heap_sizes: HeapSizes,
}

impl TableInfo {
    /// Build from explicit row counts, for crafting table data.
    #[must_use]
    pub fn new(rows: &[(TableId, u32)], heap_sizes: HeapSizes) -> TableInfo {
        let mut info = TableInfo {
            rows: [0; 64],
            heap_sizes,
        };
        for &(table, count) in rows {
            info.rows[table as usize] = count;
        }
        info
    }

    /// Number of rows of `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize]
    }

    /// Width of a `#Strings` index in bytes
    #[must_use]
    pub fn str_bytes(&self) -> u32 {
        Self::width(self.heap_sizes.contains(HeapSizes::LARGE_STRINGS))
    }

    /// Width of a `#GUID` index in bytes
    #[must_use]
    pub fn guid_bytes(&self) -> u32 {
        Self::width(self.heap_sizes.contains(HeapSizes::LARGE_GUID))
    }

    /// Width of a `#Blob` index in bytes
    #[must_use]
    pub fn blob_bytes(&self) -> u32 {
        Self::width(self.heap_sizes.contains(HeapSizes::LARGE_BLOB))
    }

    /// Width of a simple index into `table`.
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u32 {
        Self::width(self.rows(table) > u32::from(u16::MAX))
    }

    /// Width of a coded index of kind `coded`.
    #[must_use]
    pub fn coded_index_bytes(&self, coded: CodedIndexType) -> u32 {
        let max_rows = coded
            .tables()
            .iter()
            .map(|&table| self.rows(table))
            .max()
            .unwrap_or(0);

        Self::width(max_rows >= 1 << (16 - coded.tag_bits()))
    }

    /// `true` if `#Strings` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.heap_sizes.contains(HeapSizes::LARGE_STRINGS)
    }

    /// `true` if `#Blob` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.heap_sizes.contains(HeapSizes::LARGE_BLOB)
    }

    /// Size in bytes of one row of `table`.
    ///
    /// Only tables up to and including `Assembly` are supported; later tables are never
    /// needed to reach it.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for tables after `Assembly`.
    #[rustfmt::skip]
    pub fn row_size(&self, table: TableId) -> Result<u32> {
        use CodedIndexType as C;
        use TableId as T;

        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();
        let idx = |t| self.table_index_bytes(t);
        let coded = |c| self.coded_index_bytes(c);

        Ok(match table {
            T::Module =>          2 + s + g + g + g,
            T::TypeRef =>         coded(C::ResolutionScope) + s + s,
            T::TypeDef =>         4 + s + s + coded(C::TypeDefOrRef) + idx(T::Field) + idx(T::MethodDef),
            T::FieldPtr =>        idx(T::Field),
            T::Field =>           2 + s + b,
            T::MethodPtr =>       idx(T::MethodDef),
            T::MethodDef =>       4 + 2 + 2 + s + b + idx(T::Param),
            T::ParamPtr =>        idx(T::Param),
            T::Param =>           2 + 2 + s,
            T::InterfaceImpl =>   idx(T::TypeDef) + coded(C::TypeDefOrRef),
            T::MemberRef =>       coded(C::MemberRefParent) + s + b,
            T::Constant =>        1 + 1 + coded(C::HasConstant) + b,
            T::CustomAttribute => coded(C::HasCustomAttribute) + coded(C::CustomAttributeType) + b,
            T::FieldMarshal =>    coded(C::HasFieldMarshal) + b,
            T::DeclSecurity =>    2 + coded(C::HasDeclSecurity) + b,
            T::ClassLayout =>     2 + 4 + idx(T::TypeDef),
            T::FieldLayout =>     4 + idx(T::Field),
            T::StandAloneSig =>   b,
            T::EventMap =>        idx(T::TypeDef) + idx(T::Event),
            T::EventPtr =>        idx(T::Event),
            T::Event =>           2 + s + coded(C::TypeDefOrRef),
            T::PropertyMap =>     idx(T::TypeDef) + idx(T::Property),
            T::PropertyPtr =>     idx(T::Property),
            T::Property =>        2 + s + b,
            T::MethodSemantics => 2 + idx(T::MethodDef) + coded(C::HasSemantics),
            T::MethodImpl =>      idx(T::TypeDef) + coded(C::MethodDefOrRef) + coded(C::MethodDefOrRef),
            T::ModuleRef =>       s,
            T::TypeSpec =>        b,
            T::ImplMap =>         2 + coded(C::MemberForwarded) + s + idx(T::ModuleRef),
            T::FieldRVA =>        4 + idx(T::Field),
            T::EncLog =>          4 + 4,
            T::EncMap =>          4,
            T::Assembly =>        4 + 2 + 2 + 2 + 2 + 4 + b + s + s,
            _ => return Err(crate::Error::NotSupported),
        })
    }

    fn width(is_large: bool) -> u32 {
        if is_large {
            4
        } else {
            2
        }
    }
}

/// The header of the table stream, followed by the row data it describes.
#[derive(Debug, Clone)]
pub struct TablesHeader<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfo,
    data: &'a [u8],
    tables_offset: usize,
}

impl<'a> TablesHeader<'a> {
    /// Parse the header of a `#~` or `#-` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or its row counts are truncated,
    /// or [`crate::Error::Malformed`] if no table is present.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let major_version = data[4];
        let minor_version = data[5];
        let heap_sizes = HeapSizes::from_bits_retain(data[6]);
        let valid = read_le_at::<u64>(data, &mut 8)?;
        let sorted = read_le_at::<u64>(data, &mut 16)?;

        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let mut info = TableInfo::new(&[], heap_sizes);
        let mut offset = 24;
        for bit in 0..64 {
            if valid & (1u64 << bit) != 0 {
                info.rows[bit] = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes.contains(HeapSizes::EXTRA_DATA) {
            offset += 4;
        }
        if offset > data.len() {
            return Err(OutOfBounds);
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            valid,
            sorted,
            info,
            data,
            tables_offset: offset,
        })
    }

    /// `true` if `table` is present in the stream.
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.valid & (1u64 << table as u64) != 0
    }

    /// Byte offset of the first row of `table`, relative to the start of the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for tables after `Assembly`, or
    /// [`crate::Error::Malformed`] if the preceding tables overflow the offset.
    pub fn table_offset(&self, table: TableId) -> Result<usize> {
        let mut offset = self.tables_offset;
        for preceding in TableId::iter().take_while(|&t| t != table) {
            let row_size = self.info.row_size(preceding)? as usize;
            let table_len = row_size
                .checked_mul(self.info.rows(preceding) as usize)
                .ok_or_else(|| malformed_error!("Table {:?} size overflows", preceding))?;
            offset = offset
                .checked_add(table_len)
                .ok_or_else(|| malformed_error!("Table {:?} offset overflows", preceding))?;
        }

        Ok(offset)
    }

    /// The first row of the `Assembly` table, if the stream has one.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row lies outside the stream.
    pub fn assembly(&self) -> Result<Option<AssemblyRow>> {
        if self.info.rows(TableId::Assembly) == 0 {
            return Ok(None);
        }

        let mut offset = self.table_offset(TableId::Assembly)?;
        AssemblyRow::read(self.data, &mut offset, &self.info).map(Some)
    }
}

/// One raw row of the `Assembly` table; heap columns are still indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRow {
    /// Hash algorithm used for the manifest
    pub hash_alg_id: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// Assembly flags
    pub flags: AssemblyFlags,
    /// `#Blob` index of the public key
    pub public_key: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
}

impl AssemblyRow {
    /// Read one row at `offset`, advancing it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row is truncated.
    pub fn read(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<AssemblyRow> {
        Ok(AssemblyRow {
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: AssemblyFlags::from_bits_retain(read_le_at::<u32>(data, offset)?),
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ids_are_dense() {
        assert_eq!(TableId::COUNT, 0x2D);
        for (position, table) in TableId::iter().enumerate() {
            assert_eq!(table as usize, position);
        }
    }

    #[test]
    fn heap_index_widths() {
        let small = TableInfo::new(&[], HeapSizes::empty());
        assert_eq!(small.str_bytes(), 2);
        assert_eq!(small.guid_bytes(), 2);
        assert_eq!(small.blob_bytes(), 2);

        let large = TableInfo::new(
            &[],
            HeapSizes::LARGE_STRINGS | HeapSizes::LARGE_GUID | HeapSizes::LARGE_BLOB,
        );
        assert_eq!(large.str_bytes(), 4);
        assert_eq!(large.guid_bytes(), 4);
        assert_eq!(large.blob_bytes(), 4);
        assert_eq!(large.row_size(TableId::Module).unwrap(), 2 + 4 * 4);
    }

    #[test]
    fn coded_index_widths() {
        let info = TableInfo::new(&[(TableId::TypeRef, 0x3FFF)], HeapSizes::empty());
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::ResolutionScope), 2);

        let info = TableInfo::new(&[(TableId::TypeRef, 0x4000)], HeapSizes::empty());
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::MemberForwarded), 2);

        // 5 tag bits leave 11 bits for the row.
        let info = TableInfo::new(&[(TableId::Assembly, 0x800)], HeapSizes::empty());
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 4);
        assert_eq!(info.row_size(TableId::CustomAttribute).unwrap(), 4 + 2 + 2);
    }

    #[test]
    fn table_index_widths() {
        let info = TableInfo::new(
            &[(TableId::Field, 0xFFFF), (TableId::MethodDef, 0x1_0000)],
            HeapSizes::empty(),
        );
        assert_eq!(info.table_index_bytes(TableId::Field), 2);
        assert_eq!(info.table_index_bytes(TableId::MethodDef), 4);
        assert_eq!(info.row_size(TableId::TypeDef).unwrap(), 4 + 2 + 2 + 2 + 2 + 4);
        assert!(info.row_size(TableId::AssemblyRef).is_err());
    }

    #[test]
    fn crafted_stream() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x00, 0x00,   // reserved
            0x02, 0x00,               // version 2.0
            0x00,                     // heap sizes
            0x01,                     // reserved
            0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, // valid: Module, Assembly
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // sorted
            0x01, 0x00, 0x00, 0x00,   // Module rows
            0x01, 0x00, 0x00, 0x00,   // Assembly rows
            // Module
            0x00, 0x00, 0x0A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Assembly
            0x04, 0x80, 0x00, 0x00,   // hash_alg_id
            0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00,
            0x01, 0x00, 0x00, 0x00,   // flags
            0x07, 0x00,               // public_key
            0x08, 0x00,               // name
            0x00, 0x00,               // culture
        ];

        let header = TablesHeader::from(&data).unwrap();
        assert_eq!(header.major_version, 2);
        assert!(header.has_table(TableId::Module));
        assert!(header.has_table(TableId::Assembly));
        assert!(!header.has_table(TableId::TypeDef));
        assert_eq!(header.table_offset(TableId::Assembly).unwrap(), 32 + 10);

        let row = header.assembly().unwrap().unwrap();
        assert_eq!(row.hash_alg_id, 0x8004);
        assert_eq!(
            (row.major_version, row.minor_version, row.build_number, row.revision_number),
            (1, 2, 3, 4)
        );
        assert!(row.flags.contains(AssemblyFlags::PUBLIC_KEY));
        assert_eq!(row.public_key, 7);
        assert_eq!(row.name, 8);
        assert_eq!(row.culture, 0);
    }

    #[test]
    fn module_without_assembly() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x0A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let header = TablesHeader::from(&data).unwrap();
        assert!(header.assembly().unwrap().is_none());
    }

    #[test]
    fn truncated_row_counts() {
        let mut data = vec![0u8; 24];
        data[8] = 0xFF;
        assert!(matches!(TablesHeader::from(&data), Err(OutOfBounds)));
    }
}
