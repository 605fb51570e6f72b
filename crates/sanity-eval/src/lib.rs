//! SanityLang runtime: a tree-walking executor over the [`sanity_types`] AST.
//!
//! The [`Executor`] owns all runtime state: the [`SanityTracker`], scopes,
//! the relationship graph, the Afterlife, function and event registries,
//! chapters, file handles and the stdlib modules. Nothing here is shared
//! across threads; randomness comes from one injectable [`RandomSource`].

mod call;
mod expr;
mod loops;
mod program;
mod stmt;
mod terminator;

pub mod afterlife;
pub mod chapters;
pub mod config;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod files;
pub mod functions;
pub mod persist;
pub mod relations;
pub mod rng;
pub mod sanity;
pub mod stdlib;
pub mod variable;

pub use afterlife::{Afterlife, Soul};
pub use config::{ConfigError, ExecutorConfig, Flags};
pub use env::{EnvRef, Environment, VarRef};
pub use error::{ErrorKind, EvalResult, ExecResult, Flow, RuntimeError};
pub use evaluator::Executor;
pub use files::FileHandle;
pub use persist::{DreamLoad, Sidecars};
pub use relations::{Relation, RelationshipGraph};
pub use rng::{FixedRandom, RandomSource, ScriptedRandom, StdRandom};
pub use sanity::{AuditEntry, SanityTracker};
pub use stdlib::{StdlibModule, StdlibRegistry};
pub use variable::Variable;
