//! Kernel-wide error type. Carries exactly the error kinds named in
//! spec.md §7; CFF CharString VM errors are translated into
//! [`MsdfError::InvalidGlyph`] at the `Font` boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MsdfError {
    #[error("required table missing from font: {0}")]
    MissingTable(&'static str),
    #[error("font data is malformed: {0}")]
    InvalidFontData(String),
    #[error("unsupported font format: {0}")]
    UnsupportedFormat(String),
    #[error("glyph outline is invalid: {0}")]
    InvalidGlyph(String),
    #[error("no glyph mapped for codepoint U+{0:04X}")]
    GlyphNotFound(u32),
    #[error("allocation failed while generating glyph: {0}")]
    OutOfMemory(String),
}

/// Internal error kinds raised by the Type 2 CharString interpreter
/// (spec.md §9, §7). Always translated to [`MsdfError::InvalidGlyph`]
/// before crossing the `Font` boundary.
#[derive(Debug, Error)]
pub enum CharStringError {
    #[error("operand stack overflow (>{0} entries)")]
    StackOverflow(usize),
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("subroutine call nesting exceeded depth {0}")]
    SubroutineCallTooDeep(usize),
    #[error("subroutine index {0} out of range")]
    InvalidSubroutineIndex(i32),
    #[error("unrecognized CharString operator 0x{0:02x}")]
    InvalidOperator(u8),
    #[error("CharString ended without an endchar operator")]
    UnterminatedCharString,
}

impl From<CharStringError> for MsdfError {
    fn from(e: CharStringError) -> Self {
        MsdfError::InvalidGlyph(e.to_string())
    }
}
