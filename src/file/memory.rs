use super::Backend;

/// An assembly extracted from a package into an owned buffer.
#[derive(Debug, Default)]
pub struct Memory {
    data: Box<[u8]>,
}

impl From<Vec<u8>> for Memory {
    fn from(data: Vec<u8>) -> Self {
        Memory {
            data: data.into_boxed_slice(),
        }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        &self.data
    }
}
