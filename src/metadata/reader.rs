use crate::{
    identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken},
    metadata::{
        heaps::{Blob, Strings},
        image::CilImage,
        root::Root,
        tables::{AssemblyFlags, TablesHeader},
        IdentityReader,
    },
    Result,
};

/// Reads the identity of a managed PE image from its ECMA-335 metadata.
///
/// The reader walks PE headers, CLI header, metadata root and the table stream far enough to
/// decode the single `Assembly` row. Nothing else of the image is parsed, and no code is
/// loaded or executed.
///
/// # Examples
///
/// ```rust,no_run
/// use bindscope::metadata::{CilIdentityReader, IdentityReader};
///
/// let data = std::fs::read("Newtonsoft.Json.dll")?;
/// let identity = CilIdentityReader.read_identity(&data)?;
/// println!("{}", identity);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CilIdentityReader;

impl CilIdentityReader {
    /// Create a new reader.
    #[must_use]
    pub fn new() -> Self {
        CilIdentityReader
    }
}

impl IdentityReader for CilIdentityReader {
    fn read_identity(&self, data: &[u8]) -> Result<AssemblyIdentity> {
        let image = CilImage::parse(data)?;
        let metadata = image.metadata()?;
        let root = Root::read(metadata)?;

        let stream = |name: &str| {
            root.stream(name).map(|header| {
                let start = header.offset as usize;
                &metadata[start..start + header.size as usize]
            })
        };

        let Some(tables) = stream("#~").or_else(|| stream("#-")) else {
            return Err(malformed_error!("Metadata has no table stream"));
        };
        let Some(strings) = stream("#Strings") else {
            return Err(malformed_error!("Metadata has no #Strings heap"));
        };

        let tables = TablesHeader::from(tables)?;
        let Some(row) = tables.assembly()? else {
            return Err(malformed_error!(
                "Image has no Assembly table, it is a module and not an assembly"
            ));
        };

        let strings = Strings::from(strings)?;
        let name = strings.get(row.name as usize)?;
        if name.is_empty() {
            return Err(malformed_error!("Assembly name is empty"));
        }

        let culture = match strings.get(row.culture as usize)? {
            "" => None,
            culture => Some(culture.to_string()),
        };

        let public_key = match (row.public_key, stream("#Blob")) {
            (0, _) => &[][..],
            (index, Some(blob)) => Blob::from(blob)?.get(index as usize)?,
            (_, None) => return Err(malformed_error!("Metadata has no #Blob heap")),
        };

        let public_key_token = if public_key.is_empty() {
            if row.flags.contains(AssemblyFlags::PUBLIC_KEY) {
                return Err(malformed_error!(
                    "Assembly is flagged as strong named but has no public key"
                ));
            }
            None
        } else {
            Some(PublicKeyToken::from_public_key(public_key))
        };

        Ok(AssemblyIdentity::new(
            name,
            AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture,
            public_key_token,
        ))
    }
}
