//! Compilation context.
//!
//! A context owns everything produced while compiling one script: the
//! source, the syntax tree, the symbol table and the result. It is
//! resolved exactly once, and all artifacts are freed together when
//! it is dropped.
use crate::{
    compile::{CodeGen, Output, Resolver, SymbolTable},
    conf::CompilerConf,
    diagnostic::Diagnostic,
    error::Gs2Result,
    header::{Environment, Header, HeaderSynth, SCRIPT_TYPES},
    lex::Lexer,
    parsing::{CompilationUnit, Parse},
    source::SourceMap,
    token_stream::TokenStream,
};
use std::{ffi::CString, fmt};

/// Outcome of a compile, stored in the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    Success {
        /// Bytecode image, prologue included.
        bytecode: Vec<u8>,
        /// Classes the script joins by literal name.
        joined_classes: Vec<String>,
    },
    Failure(Diagnostic),
}

impl CompileResult {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, CompileResult::Success { .. })
    }

    /// Message of a failed compile.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            CompileResult::Success { .. } => None,
            CompileResult::Failure(diag) => Some(diag.message()),
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CompileResult::Success { .. } => None,
            CompileResult::Failure(diag) => Some(diag),
        }
    }

    /// Bytecode of a successful compile, empty on failure.
    pub fn bytecode(&self) -> &[u8] {
        match self {
            CompileResult::Success { bytecode, .. } => bytecode,
            CompileResult::Failure(_) => &[],
        }
    }

    #[inline]
    pub fn bytecode_len(&self) -> usize {
        self.bytecode().len()
    }

    pub fn joined_classes(&self) -> &[String] {
        match self {
            CompileResult::Success { joined_classes, .. } => joined_classes,
            CompileResult::Failure(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context already holds a result.
    AlreadyResolved,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AlreadyResolved => write!(f, "context has already compiled a script"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Intermediate products kept after a compile.
#[derive(Debug, Default)]
struct Artifacts {
    program: Option<CompilationUnit>,
    symbols: Option<SymbolTable>,
}

/// Owner of one compilation.
#[derive(Debug, Default)]
pub struct Context {
    conf: CompilerConf,
    source: SourceMap,
    artifacts: Artifacts,
    result: Option<CompileResult>,
    /// Message handed out through the C interface.
    pub(crate) c_message: Option<CString>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_conf(CompilerConf::default())
    }

    pub fn with_conf(conf: CompilerConf) -> Self {
        Self {
            conf,
            ..Default::default()
        }
    }

    #[inline]
    pub fn conf(&self) -> &CompilerConf {
        &self.conf
    }

    /// Compile a script with the header for its type and name.
    pub fn compile(
        &mut self,
        source: &str,
        script_type: &str,
        script_name: &str,
    ) -> Result<&CompileResult, ContextError> {
        self.resolve(source, Some((script_type, script_name)))
    }

    /// Compile a script without any header.
    ///
    /// Names only provided by a script type's environment are unresolved.
    pub fn compile_raw(&mut self, source: &str) -> Result<&CompileResult, ContextError> {
        self.resolve(source, None)
    }

    /// Result of the compile, if there was one.
    #[inline]
    pub fn result(&self) -> Option<&CompileResult> {
        self.result.as_ref()
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }

    /// Syntax tree, when parsing succeeded.
    #[inline]
    pub fn program(&self) -> Option<&CompilationUnit> {
        self.artifacts.program.as_ref()
    }

    /// Symbol table, when name resolution succeeded.
    #[inline]
    pub fn symbols(&self) -> Option<&SymbolTable> {
        self.artifacts.symbols.as_ref()
    }

    #[inline]
    pub fn source(&self) -> &SourceMap {
        &self.source
    }

    /// Release the context and everything it owns.
    pub fn destroy(self) {
        log::debug!("destroying context, resolved: {}", self.is_resolved());
    }

    fn resolve(&mut self, source: &str, script: Option<(&str, &str)>) -> Result<&CompileResult, ContextError> {
        if self.result.is_some() {
            return Err(ContextError::AlreadyResolved);
        }

        self.source = SourceMap::new(source);
        let result = match run(&self.conf, &self.source, script, &mut self.artifacts) {
            Ok(output) => CompileResult::Success {
                bytecode: output.bytecode,
                joined_classes: output.joined_classes.into_iter().collect(),
            },
            Err(err) => {
                log::debug!("compile failed at line {}: {}", err.line, err);
                CompileResult::Failure(Diagnostic::new(&err, &self.source))
            }
        };

        Ok(&*self.result.insert(result))
    }
}

/// Run every stage of the compiler, keeping the intermediate products.
fn run(
    conf: &CompilerConf,
    source: &SourceMap,
    script: Option<(&str, &str)>,
    artifacts: &mut Artifacts,
) -> Gs2Result<Output> {
    let header = match script {
        Some((script_type, script_name)) => {
            HeaderSynth::new(SCRIPT_TYPES, conf.save_to_disk).synthesize(script_type, script_name)?
        }
        None => Header {
            prologue: vec![],
            env: Environment::empty(),
        },
    };

    // Lexical and syntactic analysis
    log::debug!("parsing {} lines", source.line_count());
    let lexer = Lexer::new(source.source());
    let mut stream = TokenStream::with_max_depth(lexer, conf.max_nesting_depth);
    let program = artifacts.program.insert(CompilationUnit::parse(&mut stream)?);

    // Semantic analysis
    log::debug!("resolving {} items", program.items.len());
    let symbols = Resolver::new(&header.env).resolve(program)?;
    artifacts.symbols = Some(symbols);

    // Code generation
    let output = CodeGen::new().compile(program, &header.prologue)?;
    log::debug!("generated {} bytes", output.bytecode.len());

    Ok(output)
}

/// Compile a script without header, returning the bytecode image.
pub fn compile_str(source: &str) -> Gs2Result<Vec<u8>> {
    let source = SourceMap::new(source);
    run(&CompilerConf::default(), &source, None, &mut Artifacts::default()).map(|output| output.bytecode)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_second_compile_rejected() {
        let mut ctx = Context::new();
        let first = ctx.compile_raw("x = 1;").unwrap().clone();
        assert!(first.is_success());

        assert_eq!(ctx.compile_raw("y = 2;"), Err(ContextError::AlreadyResolved));
        assert_eq!(ctx.result(), Some(&first));
    }

    #[test]
    fn test_artifacts_kept() {
        let mut ctx = Context::new();
        ctx.compile("function onCreated() { x = 1; }", "weapon", "Test").unwrap();

        assert_eq!(ctx.program().map(|unit| unit.items.len()), Some(1));
        let symbols = ctx.symbols().unwrap();
        assert!(symbols.find("onCreated").next().is_some());
    }

    #[test]
    fn test_failure_has_no_bytecode() {
        let mut ctx = Context::new();
        let result = ctx.compile_raw("x = ;").unwrap();

        assert!(!result.is_success());
        assert_eq!(result.bytecode_len(), 0);
        assert_eq!(result.diagnostic().map(Diagnostic::kind), Some(ErrorKind::Parse));
    }
}
