//! Semantic analysis and code generation.
pub mod builtins;
mod bytecode;
mod codegen;
mod consteval;
mod opcode;
mod resolve;
mod symbol;

pub use bytecode::{marker, BytecodeBuilder, FunctionEntry, Label, Segment};
pub use codegen::{CodeGen, Output};
pub use consteval::ConstEval;
pub use opcode::Opcode;
pub use resolve::Resolver;
pub use symbol::{Scope, ScopeId, ScopeKind, Symbol, SymbolKind, SymbolTable};

use smol_str::SmolStr;
use std::{error, fmt};

/// Failure to bind a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Name read or called without a declaration.
    Unresolved { name: SmolStr, line: usize },
    /// Name declared twice in one scope, or assigned while constant.
    Duplicate { name: SmolStr, line: usize },
    /// Constant initializer can't be evaluated at compile time.
    NotConstant { name: SmolStr, line: usize },
}

impl ResolveError {
    pub fn line(&self) -> usize {
        match self {
            Self::Unresolved { line, .. } | Self::Duplicate { line, .. } | Self::NotConstant { line, .. } => *line,
        }
    }
}

impl error::Error for ResolveError {}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unresolved { name, line } => write!(f, "unresolved reference '{}' at line {}", name, line),
            Self::Duplicate { name, line } => write!(f, "duplicate declaration '{}' at line {}", name, line),
            Self::NotConstant { name, line } => {
                write!(f, "initializer of constant '{}' is not constant at line {}", name, line)
            }
        }
    }
}

/// Failure while emitting bytecode.
///
/// These are never caused by the script itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// Jump target doesn't fit the operand.
    JumpOutOfRange { target: usize },
    /// Label points outside the instruction buffer.
    DanglingLabel { pos: usize },
    DuplicateFunction(String),
    /// Segment longer than its length field can express.
    ImageTooLarge,
    /// `break` or `continue` without an enclosing loop.
    NoLoop { line: usize },
    /// Name reached code generation without a binding.
    Unbound { name: SmolStr, line: usize },
}

impl error::Error for CodegenError {}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::JumpOutOfRange { target } => write!(f, "jump target {} out of range", target),
            Self::DanglingLabel { pos } => write!(f, "jump label at byte {} outside of bytecode", pos),
            Self::DuplicateFunction(name) => write!(f, "function '{}' emitted twice", name),
            Self::ImageTooLarge => write!(f, "bytecode image too large"),
            Self::NoLoop { line } => write!(f, "loop control outside of loop at line {}", line),
            Self::Unbound { name, line } => write!(f, "name '{}' at line {} was never resolved", name, line),
        }
    }
}
