use thiserror::Error;

use crate::insns::DecodeError;

/// A decode failure inside one method body. Fatal for that method only;
/// the rest of the DEX keeps processing.
#[derive(Debug, Error)]
pub struct MethodError {
    pub class_name: String,
    pub method_name: String,
    pub source: DecodeError,
}

impl std::fmt::Display for MethodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}: {}",
            self.class_name, self.method_name, self.source
        )
    }
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("file of {0} bytes is too small for a DEX header")]
    Truncated(usize),
    #[error("invalid DEX magic {0:02x?}")]
    BadMagic([u8; 8]),
    #[error("unrecognized endian tag {0:#010x}")]
    BadEndianTag(u32),
    #[error("header size {0:#x} is not 0x70")]
    BadHeaderSize(u32),
    #[error("checksum mismatch: header says {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("structure at {offset:#x} runs past the end of the image")]
    Truncated { offset: usize },
    #[error("oversized ULEB128 value at {offset:#x}")]
    BadUleb128 { offset: usize },
}
