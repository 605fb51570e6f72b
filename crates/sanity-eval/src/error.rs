//! Runtime errors and control-flow signals for the SanityLang executor.
//!
//! Errors and control flow travel on separate channels: a [`RuntimeError`]
//! is something `try`/`yolo` may catch, while [`Flow::Break`] and
//! [`Flow::Return`] are ordinary results that no handler ever sees.

use sanity_types::ast::Terminator;
use sanity_types::{Mood, Value};
use thiserror::Error;

/// Broad classification of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown variable, function, personality, chapter or handle.
    Undefined,
    TypeMismatch,
    /// Division or modulo by zero, sqrt of a negative.
    ArithmeticTrap,
    /// Use of a feature disabled with `no <feature>`.
    Banned,
    /// `hates` / `ignores` violations.
    Relationship,
    /// Writes to `sure`, `swear` and ghost variables.
    Immutable,
    /// Raised on purpose: `oops`, `cry`, `blame`.
    Raised,
    /// Chapter trust and secrecy violations.
    Chapter,
    Io,
}

/// A runtime error: message, optional blamed variable, and the mood it
/// was raised in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub blame: Option<String>,
    pub mood: Mood,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            blame: None,
            mood: Mood::Neutral,
        }
    }

    pub fn with_blame(mut self, name: impl Into<String>) -> Self {
        self.blame = Some(name.into());
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::Undefined, format!("Variable '{name}' is not defined"))
    }

    pub fn undefined(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Undefined, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArithmeticTrap, message)
    }

    pub fn banned(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Banned, message)
    }

    pub fn relationship(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Relationship, message)
    }

    pub fn immutable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Immutable, message)
    }

    pub fn raised(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Raised, message)
    }

    pub fn chapter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Chapter, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// The error as the record a `cope` block receives.
    pub fn to_blob(&self) -> Value {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("message".to_string(), Value::word(self.message.clone()));
        fields.insert("source".to_string(), Value::word(""));
        fields.insert(
            "blame".to_string(),
            Value::word(self.blame.clone().unwrap_or_default()),
        );
        fields.insert("mood".to_string(), Value::word(self.mood.as_str()));
        Value::Blob(fields)
    }
}

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal(Value),
    /// `enough`: unwinds to the nearest loop.
    Break,
    /// `return`: unwinds to the nearest call, carrying the return
    /// statement's own terminators.
    Return(Value, Vec<Terminator>),
}

impl Flow {
    pub fn void() -> Self {
        Flow::Normal(Value::Void)
    }

    /// The carried value; `Break` carries `Void`.
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(v) | Flow::Return(v, _) => v,
            Flow::Break => Value::Void,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal(_))
    }
}

/// Result alias for expression evaluation.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// Result alias for statement execution.
pub type ExecResult = EvalResult<Flow>;
