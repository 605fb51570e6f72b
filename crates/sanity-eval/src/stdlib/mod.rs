//! Standard library modules, called as `Module.function(args)`.
//!
//! Each module is a unit struct implementing [`StdlibModule`]. The
//! executor owns a [`StdlibRegistry`] keyed by namespace; embedders can
//! add their own modules with [`Executor::register_module`].

pub mod chaos;
pub mod fate;
pub mod graph;
pub mod lists;
pub mod math;
pub mod time;
pub mod words;
pub mod zen;

use crate::error::{EvalResult, RuntimeError};
use crate::evaluator::Executor;
use crate::env::VarRef;
use sanity_types::{strict_equal, Mood, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

/// A namespace of callable functions.
pub trait StdlibModule {
    /// Namespace the module is called through (`Math`, `Words`, ...).
    fn name(&self) -> &'static str;

    /// Call `function` with already-evaluated arguments.
    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value>;
}

#[derive(Default)]
pub struct StdlibRegistry {
    modules: BTreeMap<String, Rc<dyn StdlibModule>>,
}

impl StdlibRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the eight built-in modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Rc::new(math::MathModule));
        registry.register(Rc::new(words::WordsModule));
        registry.register(Rc::new(time::TimeModule));
        registry.register(Rc::new(lists::ListsModule));
        registry.register(Rc::new(graph::GraphModule));
        registry.register(Rc::new(chaos::ChaosModule));
        registry.register(Rc::new(zen::ZenModule));
        registry.register(Rc::new(fate::FateModule));
        registry
    }

    /// Add a module, replacing any module with the same name.
    pub fn register(&mut self, module: Rc<dyn StdlibModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn StdlibModule>> {
        self.modules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for StdlibRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.modules.keys()).finish()
    }
}

impl Executor {
    pub fn register_module(&mut self, module: Rc<dyn StdlibModule>) {
        tracing::debug!(module = module.name(), "stdlib module registered");
        self.stdlib.register(module);
    }
}

// ── Argument helpers ──

pub(crate) fn unknown_function(module: &str, function: &str) -> RuntimeError {
    RuntimeError::undefined(format!("Module '{module}' has no function '{function}'"))
}

/// Numeric argument `i`; anything else counts as 0.
pub(crate) fn number_or_zero(args: &[Value], i: usize) -> f64 {
    args.get(i).and_then(Value::as_number).unwrap_or(0.0)
}

pub(crate) fn word_arg(args: &[Value], i: usize) -> Option<&str> {
    args.get(i).and_then(Value::as_word)
}

/// An argument naming something: Words as written, anything else by its
/// display form.
pub(crate) fn name_arg(args: &[Value], i: usize) -> Option<String> {
    args.get(i).map(|v| match v {
        Value::Word(s) => s.clone(),
        other => other.to_string(),
    })
}

/// A variable currently holding `value` in the given mood.
pub(crate) fn holder_in_mood(exec: &Executor, value: &Value, mood: Mood) -> Option<VarRef> {
    exec.all_variables().into_values().find(|var| {
        let v = var.borrow();
        v.mood == mood && strict_equal(&v.value, value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;

    struct Echo;

    impl StdlibModule for Echo {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn call(&self, _exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
            match function {
                "first" => Ok(args.into_iter().next().unwrap_or(Value::Void)),
                other => Err(unknown_function(self.name(), other)),
            }
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = StdlibRegistry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["Chaos", "Fate", "Graph", "Lists", "Math", "Time", "Words", "Zen"]
        );
    }

    #[test]
    fn custom_modules_are_callable() {
        let mut exec = Executor::new(ExecutorConfig::new().with_seed(1));
        exec.register_module(Rc::new(Echo));
        let out = exec
            .call_stdlib("Echo", "first", vec![Value::word("hi")])
            .unwrap();
        assert_eq!(out, Value::word("hi"));
        let err = exec.call_stdlib("Echo", "nope", vec![]).unwrap_err();
        assert_eq!(err.message, "Module 'Echo' has no function 'nope'");
    }
}
