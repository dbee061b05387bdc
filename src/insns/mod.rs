mod error;
mod format;
mod opcode;

pub use error::DecodeError;
pub use format::*;
pub use opcode::{ControlKind, Opcode};

use num_traits::FromPrimitive;

pub const PACKED_SWITCH_SIGNATURE: u16 = 0x0100;
pub const SPARSE_SWITCH_SIGNATURE: u16 = 0x0200;
pub const FILL_ARRAY_DATA_SIGNATURE: u16 = 0x0300;

/// One decoded instruction. `width` is in 16-bit code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInsn {
    pub opcode: Opcode,
    pub width: usize,
    pub format: Format,
}

const fn word_to_bytes(word: u16) -> (u8, u8) {
    let u2 = word.to_le_bytes();
    (u2[0], u2[1])
}

const fn word_to_nibbles(word: u16) -> (u8, u8, u8, u8) {
    let u2 = word.to_le_bytes();
    (u2[0] >> 4, u2[0] & 0x0F, u2[1] >> 4, u2[1] & 0x0F)
}

const fn byte_to_nibbles(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

/// Decode the instruction starting at code-unit index `offset`.
///
/// The three payload signatures are recognized before the opcode byte is
/// looked at; a payload decodes as a wide `nop` so it keeps its place in
/// the node list.
pub fn decode(code: &[u16], offset: usize) -> Result<DecodedInsn, DecodeError> {
    let units = code.get(offset..).ok_or(DecodeError::TooShort { offset })?;
    let first = *units.first().ok_or(DecodeError::TooShort { offset })?;

    macro_rules! unit {
        ($i:expr) => {
            *units.get($i).ok_or(DecodeError::TooShort { offset })?
        };
    }
    macro_rules! dword {
        ($i:expr) => {
            (unit!($i + 1) as u32) << 16 | unit!($i) as u32
        };
    }
    macro_rules! qword {
        ($i:expr) => {
            (dword!($i + 2) as u64) << 32 | dword!($i) as u64
        };
    }

    match first {
        PACKED_SWITCH_SIGNATURE => {
            let size = unit!(1) as usize;
            return payload(units, offset, PayloadKind::PackedSwitch, 4 + size * 2);
        }
        SPARSE_SWITCH_SIGNATURE => {
            let size = unit!(1) as usize;
            return payload(units, offset, PayloadKind::SparseSwitch, 2 + size * 4);
        }
        FILL_ARRAY_DATA_SIGNATURE => {
            let element_width = unit!(1) as usize;
            let size = dword!(2) as usize;
            // the +1 rounds an odd byte total up to a whole code unit
            let width = 4 + (size * element_width + 1) / 2;
            return payload(units, offset, PayloadKind::FillArrayData, width);
        }
        _ => {}
    }

    let (opcode_byte, immediate) = word_to_bytes(first);
    let opcode: Opcode = FromPrimitive::from_u8(opcode_byte).ok_or(DecodeError::BadOpcode {
        offset,
        value: opcode_byte,
    })?;

    let format = match opcode_byte {
        0x00 | 0x0E => Format::F10x,
        0x01 | 0x04 | 0x07 | 0x21 | 0x7B..=0x8F | 0xB0..=0xCF => {
            let (vb, va) = byte_to_nibbles(immediate);
            Format::F12x(F12x { va, vb })
        }
        0x02 | 0x05 | 0x08 => Format::F22x(F22x {
            va: immediate,
            vb: unit!(1),
        }),
        0x03 | 0x06 | 0x09 => Format::F32x(F32x {
            va: unit!(1),
            vb: unit!(2),
        }),
        0x0A..=0x0D | 0x0F..=0x11 | 0x1D | 0x1E | 0x27 => Format::F11x(F11x { va: immediate }),
        0x12 => {
            let (literal, va) = byte_to_nibbles(immediate);
            // the literal is a signed nibble
            Format::F11n(F11n {
                va,
                literal: ((literal << 4) as i8) >> 4,
            })
        }
        0x13 | 0x16 => Format::F21s(F21s {
            va: immediate,
            literal: unit!(1) as i16,
        }),
        0x14 | 0x17 => Format::F31i(F31i {
            va: immediate,
            literal: dword!(1) as i32,
        }),
        0x15 | 0x19 => Format::F21h(F21h {
            va: immediate,
            literal: unit!(1) as i16,
        }),
        0x18 => Format::F51l(F51l {
            va: immediate,
            literal: qword!(1) as i64,
        }),
        0x1A | 0x1C | 0x1F | 0x22 | 0x60..=0x6D | 0xFE | 0xFF => Format::F21c(F21c {
            va: immediate,
            idx: unit!(1),
        }),
        0x1B => Format::F31c(F31c {
            va: immediate,
            idx: dword!(1),
        }),
        0x20 | 0x23 | 0x52..=0x5F => {
            let (vb, va) = byte_to_nibbles(immediate);
            Format::F22c(F22c {
                va,
                vb,
                idx: unit!(1),
            })
        }
        0x24 | 0x6E..=0x72 | 0xFC => {
            let (va, vg) = byte_to_nibbles(immediate);
            let idx = unit!(1);
            let (vd, vc, vf, ve) = word_to_nibbles(unit!(2));
            Format::F35c(F35c {
                va,
                args: [vc, vd, ve, vf, vg],
                idx,
            })
        }
        0x25 | 0x74..=0x78 | 0xFD => Format::F3rc(F3rc {
            va: immediate,
            idx: unit!(1),
            reg: unit!(2),
        }),
        0x26 | 0x2B | 0x2C => Format::F31t(F31t {
            va: immediate,
            offset: dword!(1) as i32,
        }),
        0x28 => Format::F10t(F10t {
            offset: immediate as i8,
        }),
        0x29 => Format::F20t(F20t {
            offset: unit!(1) as i16,
        }),
        0x2A => Format::F30t(F30t {
            offset: dword!(1) as i32,
        }),
        0x2D..=0x31 | 0x44..=0x51 | 0x90..=0xAF => {
            let (vb, vc) = word_to_bytes(unit!(1));
            Format::F23x(F23x {
                va: immediate,
                vb,
                vc,
            })
        }
        0x32..=0x37 => {
            let (vb, va) = byte_to_nibbles(immediate);
            Format::F22t(F22t {
                va,
                vb,
                offset: unit!(1) as i16,
            })
        }
        0x38..=0x3D => Format::F21t(F21t {
            va: immediate,
            offset: unit!(1) as i16,
        }),
        0xD0..=0xD7 => {
            let (vb, va) = byte_to_nibbles(immediate);
            Format::F22s(F22s {
                va,
                vb,
                literal: unit!(1) as i16,
            })
        }
        0xD8..=0xE2 => {
            let (vb, literal) = word_to_bytes(unit!(1));
            Format::F22b(F22b {
                va: immediate,
                vb,
                literal: literal as i8,
            })
        }
        0xFA => {
            let (va, vg) = byte_to_nibbles(immediate);
            let meth = unit!(1);
            let (vd, vc, vf, ve) = word_to_nibbles(unit!(2));
            let proto = unit!(3);
            Format::F45cc(F45cc {
                va,
                args: [vc, vd, ve, vf, vg],
                meth,
                proto,
            })
        }
        0xFB => Format::F4rcc(F4rcc {
            va: immediate,
            meth: unit!(1),
            reg: unit!(2),
            proto: unit!(3),
        }),
        _ => {
            return Err(DecodeError::BadOpcode {
                offset,
                value: opcode_byte,
            })
        }
    };

    let width = format.len();
    if width == 0 {
        return Err(DecodeError::ZeroWidth { offset });
    }
    Ok(DecodedInsn {
        opcode,
        width,
        format,
    })
}

fn payload(
    units: &[u16],
    offset: usize,
    kind: PayloadKind,
    width: usize,
) -> Result<DecodedInsn, DecodeError> {
    if width > units.len() {
        return Err(DecodeError::TooShort { offset });
    }
    Ok(DecodedInsn {
        opcode: Opcode::Nop,
        width,
        format: Format::Payload(kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_void_is_one_unit() {
        let insn = decode(&[0x000E], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::ReturnVoid);
        assert_eq!(insn.width, 1);
        assert_eq!(insn.format, Format::F10x);
    }

    #[test]
    fn if_eqz_carries_its_displacement() {
        let insn = decode(&[0x0038, 0x0003], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::IfEqz);
        assert_eq!(insn.width, 2);
        assert_eq!(insn.format.branch_offset(), Some(3));
    }

    #[test]
    fn if_eq_two_register_form() {
        // if-eq v1, v2, -4
        let word = (2u16 << 12) | (1 << 8) | 0x32;
        let insn = decode(&[word, (-4i16) as u16], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::IfEq);
        assert_eq!(
            insn.format,
            Format::F22t(F22t {
                va: 1,
                vb: 2,
                offset: -4
            })
        );
    }

    #[test]
    fn goto_negative_displacement() {
        let insn = decode(&[0xFF28], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::Goto);
        assert_eq!(insn.width, 1);
        assert_eq!(insn.format.branch_offset(), Some(-1));
    }

    #[test]
    fn goto32_displacement() {
        let insn = decode(&[0x002A, 0xFFFE, 0xFFFF], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::Goto32);
        assert_eq!(insn.width, 3);
        assert_eq!(insn.format.branch_offset(), Some(-2));
    }

    #[test]
    fn invoke_static_references_a_method() {
        let insn = decode(&[0x0071, 0x0001, 0x0000], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::InvokeStatic);
        assert_eq!(insn.width, 3);
        assert_eq!(insn.format.method_index(), Some(1));
    }

    #[test]
    fn invoke_virtual_range_references_a_method() {
        let insn = decode(&[0x0274, 0x0042, 0x0005], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::InvokeVirtualRange);
        assert_eq!(
            insn.format,
            Format::F3rc(F3rc {
                va: 2,
                idx: 0x42,
                reg: 5
            })
        );
    }

    #[test]
    fn packed_switch_instruction_points_at_its_payload() {
        let insn = decode(&[0x002B, 0x0008, 0x0000], 0).unwrap();
        assert_eq!(insn.opcode, Opcode::PackedSwitch);
        assert_eq!(insn.format.branch_offset(), Some(8));
    }

    #[test]
    fn packed_switch_payload_width_comes_from_its_header() {
        // ident, size=2, first_key, 2 * i32 targets
        let code = [0x0100, 2, 0, 0, 4, 0, 6, 0];
        let insn = decode(&code, 0).unwrap();
        assert_eq!(insn.opcode, Opcode::Nop);
        assert_eq!(insn.width, 8);
        assert_eq!(insn.format, Format::Payload(PayloadKind::PackedSwitch));
    }

    #[test]
    fn sparse_switch_payload_width_comes_from_its_header() {
        let code = [0x0200, 1, 0, 0, 4, 0];
        let insn = decode(&code, 0).unwrap();
        assert_eq!(insn.width, 6);
        assert_eq!(insn.format, Format::Payload(PayloadKind::SparseSwitch));
    }

    #[test]
    fn fill_array_data_rounds_odd_byte_totals_up() {
        // 3 one-byte elements: 2 data units
        let code = [0x0300, 1, 3, 0, 0x0201, 0x0003];
        let insn = decode(&code, 0).unwrap();
        assert_eq!(insn.width, 6);
        assert_eq!(insn.format, Format::Payload(PayloadKind::FillArrayData));
    }

    #[test]
    fn truncated_instruction_is_an_error() {
        assert_eq!(
            decode(&[0x0038], 0),
            Err(DecodeError::TooShort { offset: 0 })
        );
    }

    #[test]
    fn truncated_payload_is_an_error() {
        assert_eq!(
            decode(&[0x0100, 4, 0, 0], 0),
            Err(DecodeError::TooShort { offset: 0 })
        );
    }

    #[test]
    fn unassigned_byte_is_an_error() {
        assert_eq!(
            decode(&[0x003E], 0),
            Err(DecodeError::BadOpcode {
                offset: 0,
                value: 0x3E
            })
        );
    }

    #[test]
    fn const4_literal_is_sign_extended() {
        // const/4 v0, #-1
        let insn = decode(&[0xF012], 0).unwrap();
        assert_eq!(
            insn.format,
            Format::F11n(F11n {
                va: 0,
                literal: -1
            })
        );
    }
}
