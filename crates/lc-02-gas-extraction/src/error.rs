//! Error types for gas extraction

use thiserror::Error;

/// Result type alias for disassembly
pub type Result<T> = std::result::Result<T, DisassemblyError>;

/// Errors raised while statically decoding a script
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassemblyError {
    /// Script ended inside an instruction
    #[error("Script truncated at offset {offset}")]
    Truncated {
        /// Offset of the instruction being decoded
        offset: usize,
    },

    /// Byte is not a known opcode
    #[error("Unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode {
        /// Offending byte
        opcode: u8,
        /// Offset of the byte
        offset: usize,
    },

    /// LOAD carried an unknown value type tag
    #[error("Unknown value type {tag} at offset {offset}")]
    UnknownValueType {
        /// Offending tag
        tag: u8,
        /// Offset of the instruction
        offset: usize,
    },

    /// Loaded bytes do not form a value of the declared type
    #[error("Malformed value at offset {offset}: {reason}")]
    MalformedValue {
        /// Offset of the instruction
        offset: usize,
        /// What was wrong
        reason: String,
    },

    /// A call needed more arguments than were pushed
    #[error("Stack underflow calling {method}")]
    StackUnderflow {
        /// Method being called
        method: String,
    },

    /// Register read before any value was loaded into it
    #[error("Register {register} is empty at offset {offset}")]
    EmptyRegister {
        /// Register index
        register: u8,
        /// Offset of the instruction
        offset: usize,
    },

    /// Method name is not in the method table
    #[error("Unknown method {0}")]
    UnknownMethod(String),
}

/// Errors raised while locating and validating the `AllowGas` call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GasExtractionError {
    /// Script could not be disassembled
    #[error("Disassembly failed: {0}")]
    Disassembly(#[from] DisassemblyError),

    /// No `gas.AllowGas` call in the script
    #[error("Script does not call gas.AllowGas")]
    MissingAllowGas,

    /// An AllowGas argument has the wrong type
    #[error("AllowGas argument {index} is not {expected}")]
    InvalidArgument {
        /// Argument position
        index: usize,
        /// Expected type
        expected: &'static str,
    },

    /// Fee payer is the null address
    #[error("Gas payer is the null address")]
    NullPayer,

    /// Gas price is zero
    #[error("Gas price must be positive")]
    ZeroPrice,

    /// Gas limit is zero
    #[error("Gas limit must be positive")]
    ZeroLimit,
}

impl GasExtractionError {
    /// True when the script itself is malformed, as opposed to a well-formed
    /// script without a usable fee declaration.
    pub fn is_malformed_script(&self) -> bool {
        matches!(self, Self::Disassembly(_))
    }
}
