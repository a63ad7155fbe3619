use thiserror::Error;

/// Errors raised while compiling a selection string.
///
/// Compilation either fully succeeds or fails with one of these; there is
/// no partial result. Every variant carries the byte offset of the
/// offending input so callers can point at the exact substring. Evaluation,
/// by contrast, never fails: inapplicable properties make the enclosing
/// predicate evaluate to false instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("lex error at offset {offset}: {kind}")]
    Lex { offset: usize, kind: LexErrorKind },

    #[error("syntax error at offset {offset}: {kind}")]
    Syntax {
        offset: usize,
        kind: SyntaxErrorKind,
    },
}

impl SelectionError {
    /// The byte offset in the selection string where the error occurred.
    pub fn offset(&self) -> usize {
        match self {
            SelectionError::Lex { offset, .. } => *offset,
            SelectionError::Syntax { offset, .. } => *offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("invalid numeric literal '{0}'")]
    InvalidNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    #[error("expected {expected}, found the end of the selection")]
    UnexpectedEnd { expected: String },

    #[error("unknown property or keyword '{0}'")]
    UnknownProperty(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("string property '{property}' can not be compared with '{operator}'")]
    StringComparison { property: String, operator: String },

    #[error("expected a string value for property '{property}', found {found}")]
    ExpectedStringValue { property: String, found: String },

    #[error("string property '{0}' can not be used in a numeric expression")]
    StringPropertyInMath(String),

    #[error("selection argument must be between 1 and 4, got {0}")]
    ArgumentOutOfRange(u64),
}
