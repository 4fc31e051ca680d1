//! Opcodes of method-call scripts.
//!
//! Only the instructions needed to stage arguments and dispatch calls are
//! decoded here; the runtime that executes scripts owns the full semantics.
//!
//! ```text
//! LOAD    reg  type  len(varint)  bytes
//! PUSH    reg
//! POP     reg
//! MOVE    dst  src
//! CTX     src  dst        dst <- context named by src
//! SWITCH  reg             call into the context held by reg
//! EXTCALL reg             call the interop named by reg
//! RET
//! ```

/// Script opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    Load = 0x01,
    Push = 0x02,
    Pop = 0x03,
    Move = 0x04,
    Ctx = 0x05,
    Switch = 0x06,
    ExtCall = 0x07,
    Ret = 0x0B,
}

impl Opcode {
    /// Try to decode an opcode from a byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Load),
            0x02 => Some(Self::Push),
            0x03 => Some(Self::Pop),
            0x04 => Some(Self::Move),
            0x05 => Some(Self::Ctx),
            0x06 => Some(Self::Switch),
            0x07 => Some(Self::ExtCall),
            0x0B => Some(Self::Ret),
            _ => None,
        }
    }
}

/// Type tag of a LOAD payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    None = 0,
    Bool = 1,
    Number = 2,
    String = 3,
    Bytes = 4,
    Address = 5,
}

impl ValueType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::Bool),
            2 => Some(Self::Number),
            3 => Some(Self::String),
            4 => Some(Self::Bytes),
            5 => Some(Self::Address),
            _ => None,
        }
    }
}

/// Append `value` as an unsigned LEB128 varint.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 varint, returning the value and bytes consumed.
pub fn read_varint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_byte() {
        assert_eq!(Opcode::from_byte(0x01), Some(Opcode::Load));
        assert_eq!(Opcode::from_byte(0x0B), Some(Opcode::Ret));
        assert_eq!(Opcode::from_byte(0x08), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn test_varint() {
        for value in [0u64, 1, 127, 128, 300, 16_384, u32::MAX as u64] {
            let mut out = Vec::new();
            write_varint(&mut out, value);
            assert_eq!(read_varint(&out), Some((value, out.len())));
        }
        assert_eq!(read_varint(&[0x80, 0x80]), None);
    }
}
