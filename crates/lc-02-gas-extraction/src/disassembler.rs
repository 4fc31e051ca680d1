//! # Static Disassembler
//!
//! Walks a script once, tracking register contents and the argument stack,
//! and records every method call with the arguments it would receive. No
//! call is executed.

use crate::error::{DisassemblyError, Result};
use crate::method_table::MethodTable;
use crate::opcodes::{read_varint, Opcode, ValueType};
use shared_types::{Address, ScriptValue, ADDRESS_LEN, U256};
use std::collections::HashMap;

/// A method call recovered from a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    /// Full name, `contract.method` or an interop such as `Runtime.Log`.
    pub name: String,
    /// Arguments in declaration order.
    pub args: Vec<ScriptValue>,
}

impl MethodCall {
    /// Contract (or interop namespace) part of the name.
    pub fn contract(&self) -> &str {
        self.name.split_once('.').map(|(c, _)| c).unwrap_or(&self.name)
    }

    /// Method part of the name.
    pub fn method(&self) -> &str {
        self.name.split_once('.').map(|(_, m)| m).unwrap_or("")
    }

    pub fn arg(&self, index: usize) -> Option<&ScriptValue> {
        self.args.get(index)
    }
}

struct Cursor<'a> {
    script: &'a [u8],
    offset: usize,
    /// Start of the instruction being decoded, for error reporting.
    start: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8> {
        let byte = *self
            .script
            .get(self.offset)
            .ok_or(DisassemblyError::Truncated { offset: self.start })?;
        self.offset += 1;
        Ok(byte)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.script.len())
            .ok_or(DisassemblyError::Truncated { offset: self.start })?;
        let script = self.script;
        let slice = &script[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn varint(&mut self) -> Result<usize> {
        let (value, used) = read_varint(&self.script[self.offset..])
            .ok_or(DisassemblyError::Truncated { offset: self.start })?;
        self.offset += used;
        usize::try_from(value).map_err(|_| DisassemblyError::Truncated { offset: self.start })
    }

    fn malformed(&self, reason: impl Into<String>) -> DisassemblyError {
        DisassemblyError::MalformedValue {
            offset: self.start,
            reason: reason.into(),
        }
    }
}

fn decode_value(cursor: &mut Cursor<'_>) -> Result<ScriptValue> {
    let tag = cursor.byte()?;
    let kind = ValueType::from_byte(tag).ok_or(DisassemblyError::UnknownValueType {
        tag,
        offset: cursor.start,
    })?;
    let len = cursor.varint()?;
    let payload = cursor.bytes(len)?;

    match kind {
        ValueType::None => Ok(ScriptValue::None),
        ValueType::Bool => match payload {
            [b] => Ok(ScriptValue::Bool(*b != 0)),
            _ => Err(cursor.malformed("bool must be one byte")),
        },
        ValueType::Number if payload.len() <= 32 => {
            Ok(ScriptValue::Number(U256::from_big_endian(payload)))
        }
        ValueType::Number => Err(cursor.malformed("number wider than 256 bits")),
        ValueType::String => String::from_utf8(payload.to_vec())
            .map(ScriptValue::String)
            .map_err(|_| cursor.malformed("string is not utf-8")),
        ValueType::Bytes => Ok(ScriptValue::Bytes(payload.to_vec())),
        ValueType::Address => {
            let raw: [u8; ADDRESS_LEN] = payload
                .try_into()
                .map_err(|_| cursor.malformed("address has wrong length"))?;
            Address::from_bytes(raw)
                .map(ScriptValue::Address)
                .map_err(|e| cursor.malformed(e.to_string()))
        }
    }
}

#[derive(Default)]
struct Machine {
    registers: HashMap<u8, ScriptValue>,
    stack: Vec<ScriptValue>,
    calls: Vec<MethodCall>,
}

impl Machine {
    fn register(&self, register: u8, offset: usize) -> Result<&ScriptValue> {
        self.registers
            .get(&register)
            .ok_or(DisassemblyError::EmptyRegister { register, offset })
    }

    fn name_in(&self, register: u8, cursor: &Cursor<'_>) -> Result<String> {
        match self.register(register, cursor.start)? {
            ScriptValue::String(name) => Ok(name.clone()),
            _ => Err(cursor.malformed(format!("register {} does not hold a name", register))),
        }
    }

    fn call(&mut self, name: String, table: &MethodTable) -> Result<()> {
        let count = table
            .arg_count(&name)
            .ok_or_else(|| DisassemblyError::UnknownMethod(name.clone()))?;
        if self.stack.len() < count {
            return Err(DisassemblyError::StackUnderflow { method: name });
        }
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(arg) = self.stack.pop() {
                args.push(arg);
            }
        }
        self.calls.push(MethodCall { name, args });
        Ok(())
    }
}

/// Recover every method call in `script`, in call order.
pub fn disassemble(script: &[u8], table: &MethodTable) -> Result<Vec<MethodCall>> {
    let mut cursor = Cursor {
        script,
        offset: 0,
        start: 0,
    };
    let mut machine = Machine::default();

    while cursor.offset < script.len() {
        cursor.start = cursor.offset;
        let byte = cursor.byte()?;
        let opcode = Opcode::from_byte(byte).ok_or(DisassemblyError::UnknownOpcode {
            opcode: byte,
            offset: cursor.start,
        })?;

        match opcode {
            Opcode::Nop => {}
            Opcode::Ret => break,
            Opcode::Load => {
                let register = cursor.byte()?;
                let value = decode_value(&mut cursor)?;
                machine.registers.insert(register, value);
            }
            Opcode::Push => {
                let register = cursor.byte()?;
                let value = machine.register(register, cursor.start)?.clone();
                machine.stack.push(value);
            }
            Opcode::Pop => {
                let register = cursor.byte()?;
                let value = machine.stack.pop().ok_or(DisassemblyError::StackUnderflow {
                    method: "POP".to_string(),
                })?;
                machine.registers.insert(register, value);
            }
            Opcode::Move | Opcode::Ctx => {
                let (dst, src) = if opcode == Opcode::Move {
                    let dst = cursor.byte()?;
                    (dst, cursor.byte()?)
                } else {
                    let src = cursor.byte()?;
                    (cursor.byte()?, src)
                };
                let value = machine.register(src, cursor.start)?.clone();
                machine.registers.insert(dst, value);
            }
            Opcode::Switch => {
                let register = cursor.byte()?;
                let contract = machine.name_in(register, &cursor)?;
                let method = match machine.stack.pop() {
                    Some(ScriptValue::String(method)) => method,
                    Some(_) => return Err(cursor.malformed("method name is not a string")),
                    None => return Err(DisassemblyError::StackUnderflow { method: contract }),
                };
                machine.call(format!("{}.{}", contract, method), table)?;
            }
            Opcode::ExtCall => {
                let register = cursor.byte()?;
                let name = machine.name_in(register, &cursor)?;
                machine.call(name, table)?;
            }
        }
    }

    Ok(machine.calls)
}
