pub mod compile;
mod conf;
mod context;
mod diagnostic;
pub mod disasm;
pub mod encoding;
mod error;
pub mod ffi;
pub mod header;
pub mod lex;
pub mod parsing;
pub mod source;
pub mod token_stream;
pub mod tokens;

pub use self::context::compile_str;

pub mod prelude {
    pub use super::{
        conf::CompilerConf,
        context::{CompileResult, Context, ContextError},
        diagnostic::Diagnostic,
        disasm::Disassembler,
        error::{CompileError, ErrorKind, Gs2Result},
        header::{ScriptType, SCRIPT_TYPES},
    };
}
