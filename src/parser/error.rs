//! Error types for binary module decoding.

use thiserror::Error;

/// A fault encountered while decoding a binary module.
///
/// Every fault is terminal for the stream that produced it: the parser
/// yields the error once and the event stream ends. There is no recovery
/// or resynchronisation on malformed input.
#[derive(Debug, Clone, PartialEq, Error)]
#[must_use]
pub enum ParseError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),

    #[error("invalid magic: expected \\0asm, got {0:#010x}")]
    InvalidMagic(u32),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("varint exceeds {0}-bit range")]
    VarIntTooLarge(u32),

    #[error("invalid utf-8 sequence in name")]
    InvalidUtf8,

    #[error("invalid value type: {0:#04x}")]
    InvalidValType(u8),

    #[error("expected 0x60 to lead function type, got {0:#04x}")]
    InvalidFuncTypeTag(u8),

    #[error("invalid block type: {0:#04x}")]
    InvalidBlockType(u8),

    #[error("invalid limits flags: {0:#04x}")]
    InvalidLimits(u32),

    #[error("invalid external kind: {0:#04x}")]
    InvalidExternalKind(u8),

    #[error("unknown section id: {0}")]
    UnknownSection(u8),

    #[error("section {id} declared {declared} bytes but the decoder consumed {consumed}")]
    SectionSizeMismatch {
        id: u8,
        declared: usize,
        consumed: usize,
    },

    #[error("illegal opcode in constant expression: {0:#04x}")]
    InvalidOpcode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            ParseError::InvalidMagic(0x6d736200).to_string(),
            "invalid magic: expected \\0asm, got 0x6d736200"
        );
        assert_eq!(
            ParseError::InvalidValType(0x6e).to_string(),
            "invalid value type: 0x6e"
        );
        assert_eq!(
            ParseError::SectionSizeMismatch {
                id: 1,
                declared: 5,
                consumed: 4,
            }
            .to_string(),
            "section 1 declared 5 bytes but the decoder consumed 4"
        );
    }
}
