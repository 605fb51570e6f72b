//! Shared types for the SanityLang runtime.
//!
//! This crate defines the syntax tree the executor consumes, source spans,
//! the runtime [`Value`] model with its coercion and equality rules, and the
//! [`Mood`]/[`Trait`] vocabulary shared by variables and file handles.

mod mood;
mod span;
mod value;
pub mod ast;

pub use mood::{Mood, Trait};
pub use span::Span;
pub use value::{
    coerce, format_number, levenshtein, loose_equal, strict_equal, vibes_equal, Coerced, Value,
    PERSONALITY_FIELD,
};
