use num_derive::FromPrimitive;

/// Dalvik opcodes, by their byte value. Unassigned byte values have no
/// variant and fail `FromPrimitive` conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    Move = 0x01,
    MoveFrom16 = 0x02,
    Move16 = 0x03,
    MoveWide = 0x04,
    MoveWideFrom16 = 0x05,
    MoveWide16 = 0x06,
    MoveObject = 0x07,
    MoveObjectFrom16 = 0x08,
    MoveObject16 = 0x09,
    MoveResult = 0x0A,
    MoveResultWide = 0x0B,
    MoveResultObject = 0x0C,
    MoveException = 0x0D,
    ReturnVoid = 0x0E,
    Return = 0x0F,
    ReturnWide = 0x10,
    ReturnObject = 0x11,
    Const4 = 0x12,
    Const16 = 0x13,
    Const = 0x14,
    ConstHigh16 = 0x15,
    ConstWide16 = 0x16,
    ConstWide32 = 0x17,
    ConstWide = 0x18,
    ConstWideHigh16 = 0x19,
    ConstString = 0x1A,
    ConstStringJumbo = 0x1B,
    ConstClass = 0x1C,
    MonitorEnter = 0x1D,
    MonitorExit = 0x1E,
    CheckCast = 0x1F,
    InstanceOf = 0x20,
    ArrayLength = 0x21,
    NewInstance = 0x22,
    NewArray = 0x23,
    FilledNewArray = 0x24,
    FilledNewArrayRange = 0x25,
    FillArrayData = 0x26,
    Throw = 0x27,
    Goto = 0x28,
    Goto16 = 0x29,
    Goto32 = 0x2A,
    PackedSwitch = 0x2B,
    SparseSwitch = 0x2C,
    CmplFloat = 0x2D,
    CmpgFloat = 0x2E,
    CmplDouble = 0x2F,
    CmpgDouble = 0x30,
    CmpLong = 0x31,
    IfEq = 0x32,
    IfNe = 0x33,
    IfLt = 0x34,
    IfGe = 0x35,
    IfGt = 0x36,
    IfLe = 0x37,
    IfEqz = 0x38,
    IfNez = 0x39,
    IfLtz = 0x3A,
    IfGez = 0x3B,
    IfGtz = 0x3C,
    IfLez = 0x3D,
    Aget = 0x44,
    AgetWide = 0x45,
    AgetObject = 0x46,
    AgetBoolean = 0x47,
    AgetByte = 0x48,
    AgetChar = 0x49,
    AgetShort = 0x4A,
    Aput = 0x4B,
    AputWide = 0x4C,
    AputObject = 0x4D,
    AputBoolean = 0x4E,
    AputByte = 0x4F,
    AputChar = 0x50,
    AputShort = 0x51,
    Iget = 0x52,
    IgetWide = 0x53,
    IgetObject = 0x54,
    IgetBoolean = 0x55,
    IgetByte = 0x56,
    IgetChar = 0x57,
    IgetShort = 0x58,
    Iput = 0x59,
    IputWide = 0x5A,
    IputObject = 0x5B,
    IputBoolean = 0x5C,
    IputByte = 0x5D,
    IputChar = 0x5E,
    IputShort = 0x5F,
    Sget = 0x60,
    SgetWide = 0x61,
    SgetObject = 0x62,
    SgetBoolean = 0x63,
    SgetByte = 0x64,
    SgetChar = 0x65,
    SgetShort = 0x66,
    Sput = 0x67,
    SputWide = 0x68,
    SputObject = 0x69,
    SputBoolean = 0x6A,
    SputByte = 0x6B,
    SputChar = 0x6C,
    SputShort = 0x6D,
    InvokeVirtual = 0x6E,
    InvokeSuper = 0x6F,
    InvokeDirect = 0x70,
    InvokeStatic = 0x71,
    InvokeInterface = 0x72,
    InvokeVirtualRange = 0x74,
    InvokeSuperRange = 0x75,
    InvokeDirectRange = 0x76,
    InvokeStaticRange = 0x77,
    InvokeInterfaceRange = 0x78,
    NegInt = 0x7B,
    NotInt = 0x7C,
    NegLong = 0x7D,
    NotLong = 0x7E,
    NegFloat = 0x7F,
    NegDouble = 0x80,
    IntToLong = 0x81,
    IntToFloat = 0x82,
    IntToDouble = 0x83,
    LongToInt = 0x84,
    LongToFloat = 0x85,
    LongToDouble = 0x86,
    FloatToInt = 0x87,
    FloatToLong = 0x88,
    FloatToDouble = 0x89,
    DoubleToInt = 0x8A,
    DoubleToLong = 0x8B,
    DoubleToFloat = 0x8C,
    IntToByte = 0x8D,
    IntToChar = 0x8E,
    IntToShort = 0x8F,
    AddInt = 0x90,
    SubInt = 0x91,
    MulInt = 0x92,
    DivInt = 0x93,
    RemInt = 0x94,
    AndInt = 0x95,
    OrInt = 0x96,
    XorInt = 0x97,
    ShlInt = 0x98,
    ShrInt = 0x99,
    UshrInt = 0x9A,
    AddLong = 0x9B,
    SubLong = 0x9C,
    MulLong = 0x9D,
    DivLong = 0x9E,
    RemLong = 0x9F,
    AndLong = 0xA0,
    OrLong = 0xA1,
    XorLong = 0xA2,
    ShlLong = 0xA3,
    ShrLong = 0xA4,
    UshrLong = 0xA5,
    AddFloat = 0xA6,
    SubFloat = 0xA7,
    MulFloat = 0xA8,
    DivFloat = 0xA9,
    RemFloat = 0xAA,
    AddDouble = 0xAB,
    SubDouble = 0xAC,
    MulDouble = 0xAD,
    DivDouble = 0xAE,
    RemDouble = 0xAF,
    AddInt2Addr = 0xB0,
    SubInt2Addr = 0xB1,
    MulInt2Addr = 0xB2,
    DivInt2Addr = 0xB3,
    RemInt2Addr = 0xB4,
    AndInt2Addr = 0xB5,
    OrInt2Addr = 0xB6,
    XorInt2Addr = 0xB7,
    ShlInt2Addr = 0xB8,
    ShrInt2Addr = 0xB9,
    UshrInt2Addr = 0xBA,
    AddLong2Addr = 0xBB,
    SubLong2Addr = 0xBC,
    MulLong2Addr = 0xBD,
    DivLong2Addr = 0xBE,
    RemLong2Addr = 0xBF,
    AndLong2Addr = 0xC0,
    OrLong2Addr = 0xC1,
    XorLong2Addr = 0xC2,
    ShlLong2Addr = 0xC3,
    ShrLong2Addr = 0xC4,
    UshrLong2Addr = 0xC5,
    AddFloat2Addr = 0xC6,
    SubFloat2Addr = 0xC7,
    MulFloat2Addr = 0xC8,
    DivFloat2Addr = 0xC9,
    RemFloat2Addr = 0xCA,
    AddDouble2Addr = 0xCB,
    SubDouble2Addr = 0xCC,
    MulDouble2Addr = 0xCD,
    DivDouble2Addr = 0xCE,
    RemDouble2Addr = 0xCF,
    AddIntLit16 = 0xD0,
    RsubInt = 0xD1,
    MulIntLit16 = 0xD2,
    DivIntLit16 = 0xD3,
    RemIntLit16 = 0xD4,
    AndIntLit16 = 0xD5,
    OrIntLit16 = 0xD6,
    XorIntLit16 = 0xD7,
    AddIntLit8 = 0xD8,
    RsubIntLit8 = 0xD9,
    MulIntLit8 = 0xDA,
    DivIntLit8 = 0xDB,
    RemIntLit8 = 0xDC,
    AndIntLit8 = 0xDD,
    OrIntLit8 = 0xDE,
    XorIntLit8 = 0xDF,
    ShlIntLit8 = 0xE0,
    ShrIntLit8 = 0xE1,
    UshrIntLit8 = 0xE2,
    InvokePolymorphic = 0xFA,
    InvokePolymorphicRange = 0xFB,
    InvokeCustom = 0xFC,
    InvokeCustomRange = 0xFD,
    ConstMethodHandle = 0xFE,
    ConstMethodType = 0xFF,
}

/// Control-transfer classification of an opcode. The discriminant is the
/// encoding written into EDG node records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ControlKind {
    Seq = 0,
    If = 1,
    Call = 2,
    New = 3,
    Jmp = 4,
    Switch = 5,
    Throw = 6,
    Ret = 7,
}

impl ControlKind {
    pub fn name(self) -> &'static str {
        match self {
            ControlKind::Seq => "SEQ",
            ControlKind::If => "IF",
            ControlKind::Call => "CALL",
            ControlKind::New => "NEW",
            ControlKind::Jmp => "JMP",
            ControlKind::Switch => "SWITCH",
            ControlKind::Throw => "THROW",
            ControlKind::Ret => "RET",
        }
    }
}

impl Opcode {
    /// Total classification; anything outside the control tables is SEQ.
    pub fn kind(self) -> ControlKind {
        use Opcode::*;
        match self {
            IfEq | IfNe | IfLt | IfGe | IfGt | IfLe | IfEqz | IfNez | IfLtz | IfGez | IfGtz
            | IfLez => ControlKind::If,
            InvokeVirtual | InvokeSuper | InvokeDirect | InvokeStatic | InvokeInterface
            | InvokeVirtualRange | InvokeSuperRange | InvokeDirectRange | InvokeStaticRange
            | InvokeInterfaceRange => ControlKind::Call,
            Goto | Goto16 | Goto32 => ControlKind::Jmp,
            PackedSwitch | SparseSwitch => ControlKind::Switch,
            Throw => ControlKind::Throw,
            ReturnVoid | Return | ReturnWide | ReturnObject => ControlKind::Ret,
            NewInstance | NewArray | FilledNewArray | FilledNewArrayRange => ControlKind::New,
            _ => ControlKind::Seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use num_traits::FromPrimitive;

    use super::{ControlKind, Opcode};

    #[test]
    fn classification_matches_control_tables() {
        assert_eq!(Opcode::IfEqz.kind(), ControlKind::If);
        assert_eq!(Opcode::IfLe.kind(), ControlKind::If);
        assert_eq!(Opcode::InvokeStatic.kind(), ControlKind::Call);
        assert_eq!(Opcode::InvokeInterfaceRange.kind(), ControlKind::Call);
        assert_eq!(Opcode::Goto32.kind(), ControlKind::Jmp);
        assert_eq!(Opcode::PackedSwitch.kind(), ControlKind::Switch);
        assert_eq!(Opcode::SparseSwitch.kind(), ControlKind::Switch);
        assert_eq!(Opcode::Throw.kind(), ControlKind::Throw);
        assert_eq!(Opcode::ReturnVoid.kind(), ControlKind::Ret);
        assert_eq!(Opcode::ReturnObject.kind(), ControlKind::Ret);
        assert_eq!(Opcode::NewInstance.kind(), ControlKind::New);
        assert_eq!(Opcode::FilledNewArrayRange.kind(), ControlKind::New);
    }

    #[test]
    fn everything_else_is_seq() {
        assert_eq!(Opcode::Nop.kind(), ControlKind::Seq);
        assert_eq!(Opcode::Move.kind(), ControlKind::Seq);
        assert_eq!(Opcode::FillArrayData.kind(), ControlKind::Seq);
        assert_eq!(Opcode::AddInt2Addr.kind(), ControlKind::Seq);
        // invoke-polymorphic and friends are not in the CALL table
        assert_eq!(Opcode::InvokePolymorphic.kind(), ControlKind::Seq);
    }

    #[test]
    fn unassigned_bytes_have_no_opcode() {
        for byte in (0x3Eu8..=0x43).chain([0x73]).chain(0x79..=0x7A).chain(0xE3..=0xF9) {
            assert!(Opcode::from_u8(byte).is_none(), "{byte:#04x}");
        }
        assert_eq!(Opcode::from_u8(0x70), Some(Opcode::InvokeDirect));
        assert_eq!(Opcode::from_u8(0xFF), Some(Opcode::ConstMethodType));
    }

    #[test]
    fn kind_discriminants_follow_enum_order() {
        assert_eq!(ControlKind::Seq as u32, 0);
        assert_eq!(ControlKind::If as u32, 1);
        assert_eq!(ControlKind::Call as u32, 2);
        assert_eq!(ControlKind::New as u32, 3);
        assert_eq!(ControlKind::Jmp as u32, 4);
        assert_eq!(ControlKind::Switch as u32, 5);
        assert_eq!(ControlKind::Throw as u32, 6);
        assert_eq!(ControlKind::Ret as u32, 7);
    }
}
