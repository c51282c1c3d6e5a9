use crate::token_stream::TokenStream;

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompilerConf {
    /// Deepest nesting of blocks and expressions accepted by the parser.
    pub max_nesting_depth: usize,
    /// Flag embedded in the header prologue.
    pub save_to_disk: bool,
}

impl Default for CompilerConf {
    fn default() -> Self {
        Self {
            max_nesting_depth: TokenStream::DEFAULT_MAX_DEPTH,
            save_to_disk: true,
        }
    }
}
