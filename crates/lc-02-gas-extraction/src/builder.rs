//! Script assembly.
//!
//! Arguments are pushed in reverse so the callee pops them in declaration
//! order.

use crate::opcodes::{write_varint, Opcode, ValueType};
use shared_types::{Address, ScriptValue, U256};

/// Register used for staging values.
const STAGING: u8 = 0;
/// Register that receives the loaded contract context.
const CONTEXT: u8 = 1;

/// Minimal big-endian encoding; zero encodes as no bytes.
pub fn encode_number(value: &U256) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Builds method-call scripts.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    code: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        self.code.push(opcode as u8);
        self
    }

    /// `LOAD reg value`
    pub fn emit_load(&mut self, register: u8, value: &ScriptValue) -> &mut Self {
        let (tag, payload) = match value {
            ScriptValue::None => (ValueType::None, Vec::new()),
            ScriptValue::Bool(b) => (ValueType::Bool, vec![u8::from(*b)]),
            ScriptValue::Number(n) => (ValueType::Number, encode_number(n)),
            ScriptValue::String(s) => (ValueType::String, s.as_bytes().to_vec()),
            ScriptValue::Bytes(b) => (ValueType::Bytes, b.clone()),
            ScriptValue::Address(a) => (ValueType::Address, a.as_bytes().to_vec()),
        };
        self.code.push(Opcode::Load as u8);
        self.code.push(register);
        self.code.push(tag as u8);
        write_varint(&mut self.code, payload.len() as u64);
        self.code.extend_from_slice(&payload);
        self
    }

    pub fn emit_push(&mut self, register: u8) -> &mut Self {
        self.code.push(Opcode::Push as u8);
        self.code.push(register);
        self
    }

    /// Stage `value` on the stack.
    pub fn push(&mut self, value: ScriptValue) -> &mut Self {
        self.emit_load(STAGING, &value);
        self.emit_push(STAGING)
    }

    fn push_args(&mut self, args: Vec<ScriptValue>) {
        for arg in args.into_iter().rev() {
            self.push(arg);
        }
    }

    /// Call a runtime interop such as `Runtime.TransferTokens`.
    pub fn call_interop(&mut self, method: &str, args: Vec<ScriptValue>) -> &mut Self {
        self.push_args(args);
        self.emit_load(STAGING, &ScriptValue::String(method.to_string()));
        self.code.push(Opcode::ExtCall as u8);
        self.code.push(STAGING);
        self
    }

    /// Call `contract.method`.
    pub fn call_contract(&mut self, contract: &str, method: &str, args: Vec<ScriptValue>) -> &mut Self {
        self.push_args(args);
        self.push(ScriptValue::String(method.to_string()));
        self.emit_load(STAGING, &ScriptValue::String(contract.to_string()));
        self.code.push(Opcode::Ctx as u8);
        self.code.push(STAGING);
        self.code.push(CONTEXT);
        self.code.push(Opcode::Switch as u8);
        self.code.push(CONTEXT);
        self
    }

    /// Declare the fee payer, fee target and limits.
    pub fn allow_gas(&mut self, payer: Address, target: Address, price: U256, limit: U256) -> &mut Self {
        self.call_contract(
            "gas",
            "AllowGas",
            vec![
                ScriptValue::Address(payer),
                ScriptValue::Address(target),
                ScriptValue::Number(price),
                ScriptValue::Number(limit),
            ],
        )
    }

    /// Settle the fees reserved by `allow_gas`.
    pub fn spend_gas(&mut self, payer: Address) -> &mut Self {
        self.call_contract("gas", "SpendGas", vec![ScriptValue::Address(payer)])
    }

    /// Terminate with RET and return the bytes.
    pub fn end_script(&mut self) -> Vec<u8> {
        self.emit(Opcode::Ret);
        std::mem::take(&mut self.code)
    }
}
