//! Instruction set.
//!
//! The subset of the JVM instruction set produced by the emitter. Each
//! opcode is a single byte with big-endian operands following inline.
//! Fixed stack effects are tabulated here; field access and invocations
//! depend on their descriptors and are accounted by the caller.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    Nop = 0x00,
    AconstNull = 0x01,
    IconstM1 = 0x02,
    Iconst0 = 0x03,
    Iconst1 = 0x04,
    Iconst2 = 0x05,
    Iconst3 = 0x06,
    Iconst4 = 0x07,
    Iconst5 = 0x08,
    Lconst0 = 0x09,
    Lconst1 = 0x0a,
    Fconst0 = 0x0b,
    Fconst1 = 0x0c,
    Fconst2 = 0x0d,
    Dconst0 = 0x0e,
    Dconst1 = 0x0f,
    /// Operand: i8
    Bipush = 0x10,
    /// Operand: i16
    Sipush = 0x11,
    /// Operand: u8 pool index
    Ldc = 0x12,
    /// Operand: u16 pool index
    LdcW = 0x13,
    /// Operand: u16 pool index of a long or double
    Ldc2W = 0x14,

    // =========================================================================
    // Locals
    // =========================================================================
    Iload = 0x15,
    Lload = 0x16,
    Fload = 0x17,
    Dload = 0x18,
    Aload = 0x19,
    Iload0 = 0x1a,
    Iload1 = 0x1b,
    Iload2 = 0x1c,
    Iload3 = 0x1d,
    Lload0 = 0x1e,
    Lload1 = 0x1f,
    Lload2 = 0x20,
    Lload3 = 0x21,
    Fload0 = 0x22,
    Fload1 = 0x23,
    Fload2 = 0x24,
    Fload3 = 0x25,
    Dload0 = 0x26,
    Dload1 = 0x27,
    Dload2 = 0x28,
    Dload3 = 0x29,
    Aload0 = 0x2a,
    Aload1 = 0x2b,
    Aload2 = 0x2c,
    Aload3 = 0x2d,

    // =========================================================================
    // Array loads
    // =========================================================================
    Iaload = 0x2e,
    Laload = 0x2f,
    Faload = 0x30,
    Daload = 0x31,
    Aaload = 0x32,
    Baload = 0x33,
    Caload = 0x34,
    Saload = 0x35,

    Istore = 0x36,
    Lstore = 0x37,
    Fstore = 0x38,
    Dstore = 0x39,
    Astore = 0x3a,
    Istore0 = 0x3b,
    Istore1 = 0x3c,
    Istore2 = 0x3d,
    Istore3 = 0x3e,
    Lstore0 = 0x3f,
    Lstore1 = 0x40,
    Lstore2 = 0x41,
    Lstore3 = 0x42,
    Fstore0 = 0x43,
    Fstore1 = 0x44,
    Fstore2 = 0x45,
    Fstore3 = 0x46,
    Dstore0 = 0x47,
    Dstore1 = 0x48,
    Dstore2 = 0x49,
    Dstore3 = 0x4a,
    Astore0 = 0x4b,
    Astore1 = 0x4c,
    Astore2 = 0x4d,
    Astore3 = 0x4e,

    // =========================================================================
    // Array stores
    // =========================================================================
    Iastore = 0x4f,
    Lastore = 0x50,
    Fastore = 0x51,
    Dastore = 0x52,
    Aastore = 0x53,
    Bastore = 0x54,
    Castore = 0x55,
    Sastore = 0x56,

    // =========================================================================
    // Stack
    // =========================================================================
    Pop = 0x57,
    Pop2 = 0x58,
    Dup = 0x59,
    DupX1 = 0x5a,
    DupX2 = 0x5b,
    Dup2 = 0x5c,
    Dup2X1 = 0x5d,
    Dup2X2 = 0x5e,
    Swap = 0x5f,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    Iadd = 0x60,
    Ladd = 0x61,
    Fadd = 0x62,
    Dadd = 0x63,
    Isub = 0x64,
    Lsub = 0x65,
    Fsub = 0x66,
    Dsub = 0x67,
    Imul = 0x68,
    Lmul = 0x69,
    Fmul = 0x6a,
    Dmul = 0x6b,
    Idiv = 0x6c,
    Ldiv = 0x6d,
    Fdiv = 0x6e,
    Ddiv = 0x6f,
    Irem = 0x70,
    Lrem = 0x71,
    Frem = 0x72,
    Drem = 0x73,
    Ineg = 0x74,
    Lneg = 0x75,
    Fneg = 0x76,
    Dneg = 0x77,
    Ishl = 0x78,
    Lshl = 0x79,
    Ishr = 0x7a,
    Lshr = 0x7b,
    Iushr = 0x7c,
    Lushr = 0x7d,
    Iand = 0x7e,
    Land = 0x7f,
    Ior = 0x80,
    Lor = 0x81,
    Ixor = 0x82,
    Lxor = 0x83,
    /// Operands: u8 slot, i8 delta
    Iinc = 0x84,

    // =========================================================================
    // Conversions
    // =========================================================================
    I2l = 0x85,
    I2f = 0x86,
    I2d = 0x87,
    L2i = 0x88,
    L2f = 0x89,
    L2d = 0x8a,
    F2i = 0x8b,
    F2l = 0x8c,
    F2d = 0x8d,
    D2i = 0x8e,
    D2l = 0x8f,
    D2f = 0x90,
    I2b = 0x91,
    I2c = 0x92,
    I2s = 0x93,

    // =========================================================================
    // Comparisons and branches
    // =========================================================================
    Lcmp = 0x94,
    Fcmpl = 0x95,
    Fcmpg = 0x96,
    Dcmpl = 0x97,
    Dcmpg = 0x98,
    /// Operand: i16 offset from this instruction
    Ifeq = 0x99,
    Ifne = 0x9a,
    Iflt = 0x9b,
    Ifge = 0x9c,
    Ifgt = 0x9d,
    Ifle = 0x9e,
    IfIcmpeq = 0x9f,
    IfIcmpne = 0xa0,
    IfIcmplt = 0xa1,
    IfIcmpge = 0xa2,
    IfIcmpgt = 0xa3,
    IfIcmple = 0xa4,
    IfAcmpeq = 0xa5,
    IfAcmpne = 0xa6,
    Goto = 0xa7,
    /// Padded to a 4-byte boundary, then default, low, high and offsets.
    Tableswitch = 0xaa,
    /// Padded to a 4-byte boundary, then default, count and sorted pairs.
    Lookupswitch = 0xab,

    // =========================================================================
    // Returns
    // =========================================================================
    Ireturn = 0xac,
    Lreturn = 0xad,
    Freturn = 0xae,
    Dreturn = 0xaf,
    Areturn = 0xb0,
    Return = 0xb1,

    // =========================================================================
    // Objects and invocation
    // =========================================================================
    /// Operand: u16 field reference
    Getstatic = 0xb2,
    Putstatic = 0xb3,
    Getfield = 0xb4,
    Putfield = 0xb5,
    /// Operand: u16 method reference
    Invokevirtual = 0xb6,
    Invokespecial = 0xb7,
    Invokestatic = 0xb8,
    /// Operands: u16 interface method reference, u8 argument slots, u8 zero
    Invokeinterface = 0xb9,
    /// Operand: u16 class
    New = 0xbb,
    /// Operand: u8 primitive array type code
    Newarray = 0xbc,
    /// Operand: u16 class
    Anewarray = 0xbd,
    Arraylength = 0xbe,
    Athrow = 0xbf,
    Checkcast = 0xc0,
    Instanceof = 0xc1,
    Monitorenter = 0xc2,
    Monitorexit = 0xc3,
    /// Prefix widening the slot operand of the next load, store or iinc.
    Wide = 0xc4,
    /// Operand: i16 offset from this instruction
    Ifnull = 0xc6,
    Ifnonnull = 0xc7,
}

impl OpCode {
    /// Mnemonic as printed by disassemblers.
    pub fn name(self) -> String {
        format!("{self:?}").to_lowercase()
    }

    /// Inline operand bytes, `None` for variable-length instructions.
    pub fn operand_size(self) -> Option<usize> {
        use OpCode::*;
        let size = match self {
            Bipush | Ldc | Newarray => 1,
            Iload | Lload | Fload | Dload | Aload => 1,
            Istore | Lstore | Fstore | Dstore | Astore => 1,
            Sipush | LdcW | Ldc2W | Iinc => 2,
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle => 2,
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => 2,
            IfAcmpeq | IfAcmpne | Goto | Ifnull | Ifnonnull => 2,
            Getstatic | Putstatic | Getfield | Putfield => 2,
            Invokevirtual | Invokespecial | Invokestatic => 2,
            New | Anewarray | Checkcast | Instanceof => 2,
            Invokeinterface => 4,
            Tableswitch | Lookupswitch | Wide => return None,
            _ => 0,
        };
        Some(size)
    }

    /// Conditional or unconditional branch with a 16-bit offset.
    pub fn is_branch(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            Ifeq | Ifne
                | Iflt
                | Ifge
                | Ifgt
                | Ifle
                | IfIcmpeq
                | IfIcmpne
                | IfIcmplt
                | IfIcmpge
                | IfIcmpgt
                | IfIcmple
                | IfAcmpeq
                | IfAcmpne
                | Goto
                | Ifnull
                | Ifnonnull
        )
    }

    /// Control never falls through to the next instruction.
    pub fn ends_flow(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            Goto | Tableswitch
                | Lookupswitch
                | Ireturn
                | Lreturn
                | Freturn
                | Dreturn
                | Areturn
                | Return
                | Athrow
        )
    }

    /// Operand-stack slots `(popped, pushed)`, `None` when the effect
    /// depends on a descriptor.
    pub fn stack_effect(self) -> Option<(u16, u16)> {
        use OpCode::*;
        let effect = match self {
            Nop | Goto | Return | Iinc => (0, 0),
            AconstNull | IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 => {
                (0, 1)
            }
            Fconst0 | Fconst1 | Fconst2 | Bipush | Sipush | Ldc | LdcW => (0, 1),
            Lconst0 | Lconst1 | Dconst0 | Dconst1 | Ldc2W => (0, 2),
            Iload | Fload | Aload | Iload0 | Iload1 | Iload2 | Iload3 => (0, 1),
            Fload0 | Fload1 | Fload2 | Fload3 | Aload0 | Aload1 | Aload2 | Aload3 => (0, 1),
            Lload | Dload | Lload0 | Lload1 | Lload2 | Lload3 => (0, 2),
            Dload0 | Dload1 | Dload2 | Dload3 => (0, 2),
            Iaload | Faload | Aaload | Baload | Caload | Saload => (2, 1),
            Laload | Daload => (2, 2),
            Istore | Fstore | Astore | Istore0 | Istore1 | Istore2 | Istore3 => (1, 0),
            Fstore0 | Fstore1 | Fstore2 | Fstore3 | Astore0 | Astore1 | Astore2 | Astore3 => (1, 0),
            Lstore | Dstore | Lstore0 | Lstore1 | Lstore2 | Lstore3 => (2, 0),
            Dstore0 | Dstore1 | Dstore2 | Dstore3 => (2, 0),
            Iastore | Fastore | Aastore | Bastore | Castore | Sastore => (3, 0),
            Lastore | Dastore => (4, 0),
            Pop => (1, 0),
            Pop2 => (2, 0),
            Dup => (1, 2),
            DupX1 => (2, 3),
            DupX2 => (3, 4),
            Dup2 => (2, 4),
            Dup2X1 => (3, 5),
            Dup2X2 => (4, 6),
            Swap => (2, 2),
            Iadd | Fadd | Isub | Fsub | Imul | Fmul | Idiv | Fdiv | Irem | Frem => (2, 1),
            Ishl | Ishr | Iushr | Iand | Ior | Ixor => (2, 1),
            Ladd | Dadd | Lsub | Dsub | Lmul | Dmul | Ldiv | Ddiv | Lrem | Drem => (4, 2),
            Land | Lor | Lxor => (4, 2),
            Lshl | Lshr | Lushr => (3, 2),
            Ineg | Fneg => (1, 1),
            Lneg | Dneg => (2, 2),
            I2f | F2i | I2b | I2c | I2s => (1, 1),
            I2l | I2d | F2l | F2d => (1, 2),
            L2i | L2f | D2i | D2f => (2, 1),
            L2d | D2l => (2, 2),
            Lcmp | Dcmpl | Dcmpg => (4, 1),
            Fcmpl | Fcmpg => (2, 1),
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle | Ifnull | Ifnonnull => (1, 0),
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => (2, 0),
            IfAcmpeq | IfAcmpne => (2, 0),
            Tableswitch | Lookupswitch => (1, 0),
            Ireturn | Freturn | Areturn | Athrow => (1, 0),
            Lreturn | Dreturn => (2, 0),
            New => (0, 1),
            Newarray | Anewarray | Arraylength | Checkcast | Instanceof => (1, 1),
            Monitorenter | Monitorexit => (1, 0),
            Getstatic | Putstatic | Getfield | Putfield => return None,
            Invokevirtual | Invokespecial | Invokestatic | Invokeinterface | Wide => return None,
        };
        Some(effect)
    }
}

/// Element type codes for `newarray`.
pub mod array_type {
    pub const BOOLEAN: u8 = 4;
    pub const CHAR: u8 = 5;
    pub const FLOAT: u8 = 6;
    pub const DOUBLE: u8 = 7;
    pub const BYTE: u8 = 8;
    pub const SHORT: u8 = 9;
    pub const INT: u8 = 10;
    pub const LONG: u8 = 11;
}
