//! Locating method bodies inside the mapped image.
//!
//! The constant pool is served by the `dex` crate, but node identity needs
//! the file offset of each code item, which means walking the class-def
//! table and each class-data item ourselves: four ULEB128 counts, the
//! field list, then `(method_idx_diff, access_flags, code_off)` triples
//! for direct and virtual methods.

use byteorder::{ByteOrder, LittleEndian};

use super::errors::ImageError;
use super::header::DexHeader;

const CLASS_DEF_ITEM_SIZE: usize = 32;
const CLASS_DATA_OFF_FIELD: usize = 24;

/// Number of bytes between a code item's start and its first code unit.
pub const CODE_ITEM_INSNS_OFFSET: u32 = 16;
const CODE_ITEM_INSNS_SIZE_FIELD: usize = 12;

/// One method body: where its code item lives and which method-id it
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodBody {
    pub method_idx: u32,
    pub code_off: u32,
}

/// Every method body in the image, in class-def then class-data order.
/// Abstract and native methods (`code_off == 0`) are not listed.
pub fn method_bodies(bytes: &[u8], header: &DexHeader) -> Result<Vec<MethodBody>, ImageError> {
    let mut bodies = Vec::new();
    for i in 0..header.class_defs_size as usize {
        let def_off = header.class_defs_off as usize + i * CLASS_DEF_ITEM_SIZE;
        let field_off = def_off + CLASS_DATA_OFF_FIELD;
        let class_data_off = read_u32(bytes, field_off)?;
        if class_data_off == 0 {
            // no class data, no methods
            continue;
        }
        walk_class_data(bytes, class_data_off as usize, &mut bodies)?;
    }
    Ok(bodies)
}

fn walk_class_data(
    bytes: &[u8],
    class_data_off: usize,
    bodies: &mut Vec<MethodBody>,
) -> Result<(), ImageError> {
    let mut pos = class_data_off;
    let static_fields = read_uleb128(bytes, &mut pos)?;
    let instance_fields = read_uleb128(bytes, &mut pos)?;
    let direct_methods = read_uleb128(bytes, &mut pos)?;
    let virtual_methods = read_uleb128(bytes, &mut pos)?;

    for _ in 0..static_fields + instance_fields {
        read_uleb128(bytes, &mut pos)?; // field_idx_diff
        read_uleb128(bytes, &mut pos)?; // access_flags
    }

    for count in [direct_methods, virtual_methods] {
        let mut method_idx = 0u32;
        for _ in 0..count {
            method_idx = method_idx.wrapping_add(read_uleb128(bytes, &mut pos)?);
            read_uleb128(bytes, &mut pos)?; // access_flags
            let code_off = read_uleb128(bytes, &mut pos)?;
            if code_off != 0 {
                bodies.push(MethodBody {
                    method_idx,
                    code_off,
                });
            }
        }
    }
    Ok(())
}

/// The code units of the code item at `code_off`, decoded to host-order
/// `u16`s.
pub fn code_units(bytes: &[u8], code_off: u32) -> Result<Vec<u16>, ImageError> {
    let insns_size = read_u32(bytes, code_off as usize + CODE_ITEM_INSNS_SIZE_FIELD)? as usize;
    let start = code_off as usize + CODE_ITEM_INSNS_OFFSET as usize;
    let end = start + insns_size * 2;
    let raw = bytes.get(start..end).ok_or(ImageError::Truncated {
        offset: code_off as usize,
    })?;
    let mut units = vec![0u16; insns_size];
    LittleEndian::read_u16_into(raw, &mut units);
    Ok(units)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ImageError> {
    let raw = bytes
        .get(offset..offset + 4)
        .ok_or(ImageError::Truncated { offset })?;
    Ok(LittleEndian::read_u32(raw))
}

fn read_uleb128(bytes: &[u8], pos: &mut usize) -> Result<u32, ImageError> {
    let start = *pos;
    let mut result = 0u32;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or(ImageError::Truncated { offset: start })?;
        *pos += 1;
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 35 {
            return Err(ImageError::BadUleb128 { offset: start });
        }
    }
    Ok(result)
}
