use thiserror::Error;

/// All of the ways a single assembly can fail. Every variant carries enough
/// context (a line number and/or the offending token text) to produce the
/// single fatal diagnostic spec §7 asks for; there is no local recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("Lex error on line {line}: {reason} (near \"{text}\")")]
    Lex {
        line: u32,
        text: String,
        reason: String,
    },

    #[error("Parse error on line {line}: expected {expected}, found \"{text}\"")]
    Parse {
        line: u32,
        text: String,
        expected: &'static str,
    },

    #[error("Out of range on line {line}: {reason} (\"{text}\")")]
    RangeError {
        line: u32,
        text: String,
        reason: String,
    },

    #[error("Unresolved symbol: {name}")]
    UnresolvedSymbol { name: String },

    #[error("Structural error: {reason}")]
    Structural { reason: String },

    #[error("Unknown directive on line {line}: {name}")]
    UnknownDirective { line: u32, name: String },

    #[error("Unexpected end of token stream")]
    UnexpectedEof,
}
