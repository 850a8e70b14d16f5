//! Error kinds for the interpreter core.
//!
//! Mirrors the teacher's `litter::error` module: one flat `thiserror` enum
//! plus a `Result` alias. The core adds the kinds spec'd for the call
//! protocol and term conversion on top of the teacher's runtime-error set.

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error)]
pub enum Error {
    /// Incompatible-type: operation invoked on a value whose variant does
    /// not support it (e.g. `size` on an atom).
    #[error("incompatible type: {operation} is not supported on {got}")]
    IncompatibleType { operation: String, got: &'static str },

    /// Undefined-operation: syntactically valid but semantically invalid
    /// conversion (e.g. an expression that cannot be made assignable).
    #[error("undefined operation: {0}")]
    UndefinedOperation(String),

    /// Term-conversion: malformed term during `from_term`.
    #[error("term conversion error: {0}")]
    TermConversion(String),

    /// User-thrown: raised explicitly from the user language via `throw`.
    #[error("{message}")]
    UserThrown { value: Value, message: String },

    /// Language-level runtime error (catch-all for the interpreter driver).
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Language-level: a type mismatch surfaced by the driver's own
    /// expression evaluation (arithmetic, comparisons, indexing, ...).
    #[error("type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    /// Language-level: reference to an identifier that resolves to nothing
    /// (used internally; most unresolved names become `Value::Omega`
    /// instead per spec.md §8 and never reach this variant).
    #[error("name error: '{0}' is not defined")]
    NameError(String),

    /// Stack-overflow: recursion-depth guard tripped. `depth` is the
    /// call-stack depth at the moment of first overflow.
    #[error("stack overflow at call depth {depth}")]
    StackOverflow { depth: usize },
}

impl Error {
    /// True for the error kinds a `catchUsr` clause may intercept.
    pub fn is_user_thrown(&self) -> bool {
        matches!(self, Error::UserThrown { .. })
    }

    /// True for the error kinds a `catchLng` clause may intercept.
    ///
    /// Every kind other than `UserThrown` is language-level per spec.md §7.
    pub fn is_language_level(&self) -> bool {
        !self.is_user_thrown()
    }

    /// The value carried by a user-thrown error, if any, for binding into
    /// a `catchUsr(e)` clause.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Error::UserThrown { value, .. } => Some(value),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
