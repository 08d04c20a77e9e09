//! Bytecode instruction set and chunk format
//!
//! This module defines the bytecode format used by the VM.
//! We use a register-based design with up to 256 virtual registers.
//! The offset following a `Yield` or `YieldStar` is the resume point
//! stored in a suspended frame.

use std::fmt;

use crate::value::JsString;

/// Virtual register index (0-255)
pub type Register = u8;

/// Constant pool index (0-65535)
pub type ConstantIndex = u16;

/// Jump target (instruction offset)
pub type JumpTarget = u32;

/// Bytecode instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Constants & Register Operations
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Load constant from pool: r[dst] = constants[idx]
    LoadConst { dst: Register, idx: ConstantIndex },

    /// Load undefined: r[dst] = undefined
    LoadUndefined { dst: Register },

    /// Load null: r[dst] = null
    LoadNull { dst: Register },

    /// Load boolean: r[dst] = value
    LoadBool { dst: Register, value: bool },

    /// Load integer (small numbers without constant pool): r[dst] = value
    LoadInt { dst: Register, value: i32 },

    /// Move register: r[dst] = r[src]
    Move { dst: Register, src: Register },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Arithmetic & Comparison
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Add: r[dst] = r[left] + r[right] (concatenates strings)
    Add {
        dst: Register,
        left: Register,
        right: Register,
    },

    Sub {
        dst: Register,
        left: Register,
        right: Register,
    },

    Mul {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Strict equality: r[dst] = r[left] === r[right]
    StrictEq {
        dst: Register,
        left: Register,
        right: Register,
    },

    StrictNotEq {
        dst: Register,
        left: Register,
        right: Register,
    },

    Lt {
        dst: Register,
        left: Register,
        right: Register,
    },

    LtEq {
        dst: Register,
        left: Register,
        right: Register,
    },

    Gt {
        dst: Register,
        left: Register,
        right: Register,
    },

    GtEq {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Logical not: r[dst] = !r[src]
    Not { dst: Register, src: Register },

    /// Negate: r[dst] = -r[src]
    Neg { dst: Register, src: Register },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Control Flow
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Unconditional jump
    Jump { target: JumpTarget },

    /// Jump if r[cond] is truthy
    JumpIfTrue { cond: Register, target: JumpTarget },

    /// Jump if r[cond] is falsy
    JumpIfFalse { cond: Register, target: JumpTarget },

    /// Leave a loop (break or continue), running finally blocks above `try_depth`.
    /// `finally_depth` is the number of finally bodies active at the loop.
    Break {
        target: JumpTarget,
        try_depth: u8,
        finally_depth: u8,
    },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Variable Access
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Load global: r[dst] = globals[name]
    GetGlobal { dst: Register, name: ConstantIndex },

    /// Store global: globals[name] = r[src]
    SetGlobal { name: ConstantIndex, src: Register },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Object Operations
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Create empty object: r[dst] = {}
    CreateObject { dst: Register },

    /// Get property with constant key: r[dst] = r[obj].name
    GetPropertyConst {
        dst: Register,
        obj: Register,
        key: ConstantIndex,
    },

    /// Set property with constant key: r[obj].name = r[value]
    SetPropertyConst {
        obj: Register,
        key: ConstantIndex,
        value: Register,
    },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Call function: r[dst] = r[callee](r[args_start..args_start+argc])
    Call {
        dst: Register,
        callee: Register,
        args_start: Register,
        argc: u8,
    },

    /// Call method: r[dst] = r[obj].name(args...)
    CallMethod {
        dst: Register,
        obj: Register,
        method: ConstantIndex,
        args_start: Register,
        argc: u8,
    },

    /// Return from the generator body with value
    Return { value: Register },

    /// Return undefined from the generator body
    ReturnUndefined,

    // ═══════════════════════════════════════════════════════════════════════════════
    // Exception Handling
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Throw exception: throw r[value]
    Throw { value: Register },

    /// Push try handler. A target of 0 means the clause is absent.
    PushTry {
        catch_target: JumpTarget,
        finally_target: JumpTarget,
    },

    /// Pop try handler (normal completion)
    PopTry,

    /// Enter a finally block by falling through (no pending completion)
    EnterFinally { target: JumpTarget },

    /// End of a finally block: resume whatever completion was pending
    FinallyEnd,

    /// Get caught exception value: r[dst] = caught_exception
    GetException { dst: Register },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Generator
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Yield: suspend generator, r[dst] = yield r[value]
    Yield { dst: Register, value: Register },

    /// Yield*: delegate to iterator, r[dst] = yield* r[iterable]
    YieldStar { dst: Register, iterable: Register },
}

/// A compiled chunk of bytecode
#[derive(Debug, Clone)]
pub struct BytecodeChunk {
    /// The bytecode instructions
    pub code: Vec<Op>,

    /// Constant pool (strings, numbers)
    pub constants: Vec<Constant>,

    /// Number of registers needed for this chunk
    pub register_count: u8,

    /// Function metadata (if this is a function body)
    pub function_info: Option<FunctionInfo>,
}

/// Constants that can be stored in the pool
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// String constant (names and string literals)
    String(JsString),

    /// Number constant
    Number(f64),
}

/// Function metadata
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Function name (if any)
    pub name: Option<JsString>,

    /// Number of parameters; arguments occupy registers 0..param_count
    pub param_count: usize,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            constants: Vec::new(),
            register_count: 0,
            function_info: None,
        }
    }

    /// Get the instruction at the given offset
    pub fn get(&self, offset: usize) -> Option<&Op> {
        self.code.get(offset)
    }

    /// Get a constant from the pool
    pub fn get_constant(&self, idx: ConstantIndex) -> Option<&Constant> {
        self.constants.get(idx as usize)
    }

    /// Offsets at which a suspended body can be resumed
    pub fn resume_points(&self) -> Vec<usize> {
        self.code
            .iter()
            .enumerate()
            .filter(|(_, op)| matches!(op, Op::Yield { .. } | Op::YieldStar { .. }))
            .map(|(offset, _)| offset + 1)
            .collect()
    }
}

impl Default for BytecodeChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BytecodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .function_info
            .as_ref()
            .and_then(|info| info.name.as_ref())
            .map_or("<anonymous>", JsString::as_str);
        writeln!(f, "== {} ({} registers) ==", name, self.register_count)?;
        for (offset, op) in self.code.iter().enumerate() {
            writeln!(f, "{:04} {:?}", offset, op)?;
        }
        for (idx, constant) in self.constants.iter().enumerate() {
            writeln!(f, "  #{} {:?}", idx, constant)?;
        }
        Ok(())
    }
}
