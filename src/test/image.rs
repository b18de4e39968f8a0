//! Builds minimal but well-formed managed PE images.
//!
//! The image is a PE32 file with a single `.text` section holding the CLI header followed by
//! the metadata: a `BSJB` root, a `#~` stream with one `Module` and one `Assembly` row, and
//! the `#Strings`, `#Blob` and `#GUID` heaps they refer to.

const PE_OFFSET: usize = 0x80;
const FILE_ALIGNMENT: usize = 0x200;
const SECTION_ALIGNMENT: usize = 0x2000;
const TEXT_RVA: u32 = 0x2000;
const CLI_HEADER_SIZE: usize = 72;

/// Builder for a managed PE image with a chosen assembly identity.
pub struct ImageBuilder {
    name: String,
    version: [u16; 4],
    culture: String,
    public_key: Vec<u8>,
    large_heaps: bool,
    assembly_row: bool,
    clr: bool,
}

impl ImageBuilder {
    pub fn new(name: &str) -> Self {
        ImageBuilder {
            name: name.to_string(),
            version: [1, 0, 0, 0],
            culture: String::new(),
            public_key: Vec::new(),
            large_heaps: false,
            assembly_row: true,
            clr: true,
        }
    }

    pub fn version(mut self, major: u16, minor: u16, build: u16, revision: u16) -> Self {
        self.version = [major, minor, build, revision];
        self
    }

    pub fn culture(mut self, culture: &str) -> Self {
        self.culture = culture.to_string();
        self
    }

    pub fn public_key(mut self, key: &[u8]) -> Self {
        self.public_key = key.to_vec();
        self
    }

    /// Flag all heaps as large, widening every heap index to 4 bytes.
    pub fn large_heaps(mut self) -> Self {
        self.large_heaps = true;
        self
    }

    /// Produce a net-module: metadata without an `Assembly` row.
    pub fn without_assembly_row(mut self) -> Self {
        self.assembly_row = false;
        self
    }

    /// Produce a native image without a CLR runtime header directory.
    pub fn without_clr(mut self) -> Self {
        self.clr = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let metadata = self.metadata();

        let mut text = Vec::new();
        put_u32(&mut text, CLI_HEADER_SIZE as u32);
        put_u16(&mut text, 2);
        put_u16(&mut text, 5);
        put_u32(&mut text, TEXT_RVA + CLI_HEADER_SIZE as u32);
        put_u32(&mut text, metadata.len() as u32);
        put_u32(&mut text, 1); // ILONLY
        text.resize(CLI_HEADER_SIZE, 0);
        text.extend_from_slice(&metadata);

        let virtual_size = text.len();
        let raw_size = align(virtual_size, FILE_ALIGNMENT);
        text.resize(raw_size, 0);

        let mut image = vec![0u8; FILE_ALIGNMENT];
        image[0] = b'M';
        image[1] = b'Z';
        image[0x3C..0x40].copy_from_slice(&(PE_OFFSET as u32).to_le_bytes());

        let mut headers = Vec::new();
        headers.extend_from_slice(b"PE\0\0");

        // COFF header
        put_u16(&mut headers, 0x014C);
        put_u16(&mut headers, 1);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, 0);
        put_u16(&mut headers, 0xE0);
        put_u16(&mut headers, 0x2102);

        // PE32 optional header, standard fields
        put_u16(&mut headers, 0x010B);
        headers.push(8);
        headers.push(0);
        put_u32(&mut headers, raw_size as u32);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, TEXT_RVA);
        put_u32(&mut headers, 0);

        // Windows specific fields
        put_u32(&mut headers, 0x0040_0000);
        put_u32(&mut headers, SECTION_ALIGNMENT as u32);
        put_u32(&mut headers, FILE_ALIGNMENT as u32);
        put_u16(&mut headers, 4);
        put_u16(&mut headers, 0);
        put_u16(&mut headers, 0);
        put_u16(&mut headers, 0);
        put_u16(&mut headers, 4);
        put_u16(&mut headers, 0);
        put_u32(&mut headers, 0);
        put_u32(
            &mut headers,
            (TEXT_RVA as usize + align(virtual_size, SECTION_ALIGNMENT)) as u32,
        );
        put_u32(&mut headers, FILE_ALIGNMENT as u32);
        put_u32(&mut headers, 0);
        put_u16(&mut headers, 3);
        put_u16(&mut headers, 0x8540);
        put_u32(&mut headers, 0x0010_0000);
        put_u32(&mut headers, 0x1000);
        put_u32(&mut headers, 0x0010_0000);
        put_u32(&mut headers, 0x1000);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, 16);

        // Data directories, only the CLR runtime header (#14) is set
        for directory in 0..16 {
            if directory == 14 && self.clr {
                put_u32(&mut headers, TEXT_RVA);
                put_u32(&mut headers, CLI_HEADER_SIZE as u32);
            } else {
                put_u32(&mut headers, 0);
                put_u32(&mut headers, 0);
            }
        }

        // Section table
        headers.extend_from_slice(b".text\0\0\0");
        put_u32(&mut headers, virtual_size as u32);
        put_u32(&mut headers, TEXT_RVA);
        put_u32(&mut headers, raw_size as u32);
        put_u32(&mut headers, FILE_ALIGNMENT as u32);
        put_u32(&mut headers, 0);
        put_u32(&mut headers, 0);
        put_u16(&mut headers, 0);
        put_u16(&mut headers, 0);
        put_u32(&mut headers, 0x6000_0020);

        image[PE_OFFSET..PE_OFFSET + headers.len()].copy_from_slice(&headers);
        image.extend_from_slice(&text);
        image
    }

    fn metadata(&self) -> Vec<u8> {
        let index_size = if self.large_heaps { 4 } else { 2 };

        let mut strings = vec![0u8];
        let name_index = push_str(&mut strings, &self.name);
        let culture_index = if self.culture.is_empty() {
            0
        } else {
            push_str(&mut strings, &self.culture)
        };
        let module_index = push_str(&mut strings, &format!("{}.dll", self.name));
        strings.resize(align(strings.len(), 4), 0);

        let mut blob = vec![0u8];
        let key_index = if self.public_key.is_empty() {
            0
        } else {
            let index = blob.len() as u32;
            push_compressed(&mut blob, self.public_key.len() as u32);
            blob.extend_from_slice(&self.public_key);
            index
        };
        blob.resize(align(blob.len(), 4), 0);

        let guid: Vec<u8> = (1..=16).collect();

        let mut tables = Vec::new();
        put_u32(&mut tables, 0);
        tables.push(2);
        tables.push(0);
        tables.push(if self.large_heaps { 0x07 } else { 0x00 });
        tables.push(1);
        let valid: u64 = if self.assembly_row { 1 | 1 << 0x20 } else { 1 };
        tables.extend_from_slice(&valid.to_le_bytes());
        tables.extend_from_slice(&0u64.to_le_bytes());
        put_u32(&mut tables, 1);
        if self.assembly_row {
            put_u32(&mut tables, 1);
        }

        // Module row
        put_u16(&mut tables, 0);
        put_index(&mut tables, module_index, index_size);
        put_index(&mut tables, 1, index_size);
        put_index(&mut tables, 0, index_size);
        put_index(&mut tables, 0, index_size);

        if self.assembly_row {
            put_u32(&mut tables, 0x8004);
            for part in self.version {
                put_u16(&mut tables, part);
            }
            put_u32(&mut tables, u32::from(!self.public_key.is_empty()));
            put_index(&mut tables, key_index, index_size);
            put_index(&mut tables, name_index, index_size);
            put_index(&mut tables, culture_index, index_size);
        }
        tables.resize(align(tables.len(), 4), 0);

        let streams: [(&str, &[u8]); 4] = [
            ("#~", &tables),
            ("#Strings", &strings),
            ("#Blob", &blob),
            ("#GUID", &guid),
        ];

        let version = b"v4.0.30319\0\0";
        let directory_len: usize = streams
            .iter()
            .map(|(name, _)| 8 + align(name.len() + 1, 4))
            .sum();

        let mut root = Vec::new();
        put_u32(&mut root, 0x424A_5342);
        put_u16(&mut root, 1);
        put_u16(&mut root, 1);
        put_u32(&mut root, 0);
        put_u32(&mut root, version.len() as u32);
        root.extend_from_slice(version);
        put_u16(&mut root, 0);
        put_u16(&mut root, streams.len() as u16);

        let mut offset = root.len() + directory_len;
        for (name, data) in &streams {
            put_u32(&mut root, offset as u32);
            put_u32(&mut root, data.len() as u32);
            root.extend_from_slice(name.as_bytes());
            root.push(0);
            root.resize(align(root.len(), 4), 0);
            offset += data.len();
        }
        for (_, data) in &streams {
            root.extend_from_slice(data);
        }

        root
    }
}

fn align(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn put_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_index(buffer: &mut Vec<u8>, value: u32, size: usize) {
    if size == 4 {
        put_u32(buffer, value);
    } else {
        put_u16(buffer, value as u16);
    }
}

fn push_str(heap: &mut Vec<u8>, value: &str) -> u32 {
    let index = heap.len() as u32;
    heap.extend_from_slice(value.as_bytes());
    heap.push(0);
    index
}

fn push_compressed(heap: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        heap.push(value as u8);
    } else if value < 0x4000 {
        heap.extend_from_slice(&((value as u16) | 0x8000).to_be_bytes());
    } else {
        heap.extend_from_slice(&(value | 0xC000_0000).to_be_bytes());
    }
}
