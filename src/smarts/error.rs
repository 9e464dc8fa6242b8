use thiserror::Error;

/// Errors produced when compiling a SMARTS pattern string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmartsError {
    /// The input string was empty.
    #[error("empty SMARTS string")]
    EmptyInput,
    /// An unexpected character was encountered at the given position.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    /// A bracket atom `[` was opened but never closed with `]`.
    #[error("unclosed bracket starting at position {pos}")]
    UnclosedBracket { pos: usize },
    /// A ring-opening digit was never matched by a ring-closing digit.
    #[error("unclosed ring {digit}")]
    UnclosedRing { digit: u16 },
    /// A parenthesis was opened without a matching close, or vice versa.
    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },
    /// An `#n` atomic number specifier could not be parsed.
    #[error("invalid atomic number at position {pos}")]
    InvalidAtomicNum { pos: usize },
    /// A recursive SMARTS `$( ... )` was opened but never closed.
    #[error("unclosed recursive SMARTS at position {pos}")]
    UnclosedRecursive { pos: usize },
    /// Valid SMARTS this compiler does not evaluate (stereochemistry).
    #[error("unsupported SMARTS feature '{feature}' at position {pos}")]
    Unsupported { pos: usize, feature: &'static str },
    /// A catch-all for other SMARTS parse errors.
    #[error("invalid SMARTS at position {pos}: {msg}")]
    InvalidSmarts { pos: usize, msg: String },
}
