//! The fixed 0x70-byte DEX header: parsing, checksum verification, and the
//! `-f`/`-h` renderings.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::errors::HeaderError;

pub const HEADER_SIZE: u32 = 0x70;
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;

/// Adler-32 starts after the magic and checksum fields.
const CHECKSUM_DATA_OFFSET: usize = 0x0C;

#[derive(Debug, Clone)]
pub struct DexHeader {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl DexHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(HeaderError::Truncated(bytes.len()));
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[..8]);
        if !is_magic_valid(&magic) {
            return Err(HeaderError::BadMagic(magic));
        }

        let mut cursor = Cursor::new(&bytes[8..HEADER_SIZE as usize]);
        // reads from an in-bounds fixed-size slice cannot fail
        let mut read = || cursor.read_u32::<LittleEndian>().unwrap_or_default();

        let checksum = read();
        let mut signature = [0u8; 20];
        signature.copy_from_slice(&bytes[0x0C..0x20]);
        for _ in 0..5 {
            read();
        }
        let file_size = read();
        let header_size = read();
        let endian_tag = read();
        if endian_tag != ENDIAN_CONSTANT {
            return Err(HeaderError::BadEndianTag(endian_tag));
        }
        if header_size != HEADER_SIZE {
            return Err(HeaderError::BadHeaderSize(header_size));
        }

        Ok(DexHeader {
            magic,
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size: read(),
            link_off: read(),
            map_off: read(),
            string_ids_size: read(),
            string_ids_off: read(),
            type_ids_size: read(),
            type_ids_off: read(),
            proto_ids_size: read(),
            proto_ids_off: read(),
            field_ids_size: read(),
            field_ids_off: read(),
            method_ids_size: read(),
            method_ids_off: read(),
            class_defs_size: read(),
            class_defs_off: read(),
            data_size: read(),
            data_off: read(),
        })
    }

    pub fn dex_version(&self) -> u8 {
        (self.magic[4] - 0x30) * 100 + (self.magic[5] - 0x30) * 10 + (self.magic[6] - 0x30)
    }

    /// Adler-32 over everything after the magic and checksum fields.
    pub fn verify_checksum(&self, bytes: &[u8]) -> Result<(), HeaderError> {
        let actual = adler32(&bytes[CHECKSUM_DATA_OFFSET.min(bytes.len())..]);
        if actual != self.checksum {
            return Err(HeaderError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }

    /// The `-f` rendering.
    pub fn summary(&self) -> String {
        let signature: String = self.signature.iter().map(|b| format!("{b:02x}")).collect();
        format!(
            "DEX version {:03}\nchecksum        : {:#010x}\nsignature       : {}\n\
             file_size       : {}\nheader_size     : {}\nlink_size       : {}\n\
             link_off        : {:#x}\ndata_size       : {}\ndata_off        : {:#x}",
            self.dex_version(),
            self.checksum,
            signature,
            self.file_size,
            self.header_size,
            self.link_size,
            self.link_off,
            self.data_size,
            self.data_off,
        )
    }

    /// The `-h` rendering: one line per id section.
    pub fn section_headers(&self) -> String {
        let line = |name: &str, size: u32, off: u32| {
            format!("{name:<12} size {size:>8}  offset {off:#010x}")
        };
        [
            line("string_ids", self.string_ids_size, self.string_ids_off),
            line("type_ids", self.type_ids_size, self.type_ids_off),
            line("proto_ids", self.proto_ids_size, self.proto_ids_off),
            line("field_ids", self.field_ids_size, self.field_ids_off),
            line("method_ids", self.method_ids_size, self.method_ids_off),
            line("class_defs", self.class_defs_size, self.class_defs_off),
            line("map", 0, self.map_off),
        ]
        .join("\n")
    }
}

fn is_magic_valid(magic: &[u8; 8]) -> bool {
    magic[..4] == [0x64, 0x65, 0x78, 0x0A]
        && magic[7] == 0x00
        && magic[4..7].iter().all(|b| (0x30..=0x39).contains(b))
}

/// The Adler-32 variant DEX uses for its header checksum.
fn adler32(data: &[u8]) -> u32 {
    const MOD: u32 = 65_521;
    let mut a = 1u32;
    let mut b = 0u32;
    for &byte in data {
        a = (a + byte as u32) % MOD;
        b = (b + a) % MOD;
    }
    (b << 16) | a
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal structurally-valid header with a correct checksum.
    fn sample_header_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x70];
        bytes[..8].copy_from_slice(b"dex\n035\0");
        bytes[0x20..0x24].copy_from_slice(&0x70u32.to_le_bytes()); // file_size
        bytes[0x24..0x28].copy_from_slice(&HEADER_SIZE.to_le_bytes());
        bytes[0x28..0x2C].copy_from_slice(&ENDIAN_CONSTANT.to_le_bytes());
        let checksum = adler32(&bytes[0x0C..]);
        bytes[0x08..0x0C].copy_from_slice(&checksum.to_le_bytes());
        bytes
    }

    #[test]
    fn adler32_of_nothing_is_one() {
        assert_eq!(adler32(&[]), 1);
    }

    #[test]
    fn adler32_known_vector() {
        assert_eq!(adler32(b"Wikipedia"), 0x11E60398);
    }

    #[test]
    fn parses_and_verifies_a_valid_header() {
        let bytes = sample_header_bytes();
        let header = DexHeader::parse(&bytes).unwrap();
        assert_eq!(header.dex_version(), 35);
        assert_eq!(header.file_size, 0x70);
        assert_eq!(header.endian_tag, ENDIAN_CONSTANT);
        header.verify_checksum(&bytes).unwrap();
    }

    #[test]
    fn corrupted_body_fails_the_checksum() {
        let mut bytes = sample_header_bytes();
        bytes[0x6F] ^= 0xFF;
        let header = DexHeader::parse(&bytes).unwrap();
        assert!(matches!(
            header.verify_checksum(&bytes),
            Err(HeaderError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_header_bytes();
        bytes[0] = b'x';
        assert!(matches!(
            DexHeader::parse(&bytes),
            Err(HeaderError::BadMagic(_))
        ));
    }

    #[test]
    fn rejects_big_endian_images() {
        let mut bytes = sample_header_bytes();
        bytes[0x28..0x2C].copy_from_slice(&REVERSE_ENDIAN_CONSTANT.to_le_bytes());
        assert!(matches!(
            DexHeader::parse(&bytes),
            Err(HeaderError::BadEndianTag(_))
        ));
    }

    #[test]
    fn rejects_short_files() {
        assert!(matches!(
            DexHeader::parse(&[0u8; 0x20]),
            Err(HeaderError::Truncated(0x20))
        ));
    }

    #[test]
    fn summary_names_the_version() {
        let bytes = sample_header_bytes();
        let header = DexHeader::parse(&bytes).unwrap();
        assert!(header.summary().starts_with("DEX version 035"));
        assert!(header.section_headers().contains("class_defs"));
    }
}
