//! Function, method and stdlib calls.

use crate::env::{new_var, Environment};
use crate::error::{EvalResult, Flow, RuntimeError};
use crate::evaluator::Executor;
use crate::functions::FunctionDef;
use crate::variable::{drop_last_char, Variable};
use sanity_types::ast::{DeclKeyword, Expr, ExprKind, FuncKeyword, Terminator};
use sanity_types::{Mood, Value};
use std::rc::Rc;

/// Call count that triggers the refactor hint.
const REFACTOR_HINT_AT: u64 = 25;
/// Calls after which results come back tired.
const TIRED_AT: u64 = 50;
/// Calls after which a function may refuse to answer.
const RESENTFUL_AT: u64 = 100;

impl Executor {
    pub(crate) fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> EvalResult<Value> {
        match &callee.kind {
            ExprKind::Identifier(id) => {
                let Some(def) = self.functions.get(&id.name) else {
                    return Err(RuntimeError::undefined(format!(
                        "Function '{}' is not defined",
                        id.name
                    )));
                };
                let args = self.eval_args(args)?;
                self.invoke(&id.name, args, def)
            }
            ExprKind::Member { object, member } => {
                if let Some(module) = object.as_identifier() {
                    if self.stdlib.contains(module) {
                        let args = self.eval_args(args)?;
                        return self.call_stdlib(module, &member.name, args);
                    }
                }
                let receiver = self.eval_expr(object)?;
                let args = self.eval_args(args)?;
                self.call_method(object.as_identifier(), receiver, &member.name, args)
            }
            _ => Err(RuntimeError::type_mismatch("Cannot call non-function")),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    /// Call a declared function by name.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let def = self
            .functions
            .get(name)
            .ok_or_else(|| RuntimeError::undefined(format!("Function '{name}' is not defined")))?;
        self.invoke(name, args, def)
    }

    /// `Module.function(args)` through the stdlib registry.
    pub fn call_stdlib(&mut self, module: &str, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        let Some(m) = self.stdlib.get(module) else {
            return Err(RuntimeError::undefined(format!("Unknown module '{module}'")));
        };
        tracing::trace!(module, function, "stdlib call");
        m.call(self, function, args)
    }

    fn invoke(&mut self, name: &str, args: Vec<Value>, def: FunctionDef) -> EvalResult<Value> {
        let decl = Rc::clone(&def.decl);

        if decl.keyword == FuncKeyword::Might {
            if let Some(condition) = &decl.condition {
                let guard = self.eval_expr(condition)?;
                if !self.truthy(&guard) {
                    return Ok(Value::Void);
                }
            }
        }
        if decl.keyword == FuncKeyword::Will && decl.body.stmts.is_empty() {
            return Ok(Value::Dunno);
        }
        if let Some(pinned) = self.functions.pinned(name) {
            return Ok(pinned);
        }

        let count = self.functions.bump_calls(name);
        let caller = format!("__caller_{}", self.scope_id());
        self.graph.add_edge(name, &caller);
        if count == 1 {
            self.sp.first_function_call();
        } else if count >= 10 {
            self.sp.repetition_penalty();
        }
        if count == REFACTOR_HINT_AT {
            self.emit(format!(
                "[compiler] Function '{name}' has been called {REFACTOR_HINT_AT} times. Maybe refactor?"
            ));
        }

        let memo_key = (decl.keyword == FuncKeyword::Did).then(|| memo_key(&args));
        if let Some(key) = &memo_key {
            if let Some(hit) = self.functions.memo_get(name, key) {
                return Ok(hit);
            }
        }

        if count >= RESENTFUL_AT && self.random().chance(0.05) {
            return Ok(Value::Void);
        }

        let id = self.new_scope_id();
        let scope = Environment::child(&def.closure, id);
        self.sp.enter_scope();
        {
            let visible = def.closure.borrow().all_variables();
            let mut env = scope.borrow_mut();
            for (var_name, var) in visible {
                if var.borrow().keyword == DeclKeyword::Scream {
                    env.define(var_name, var);
                    continue;
                }
                let v = var.borrow();
                let mut copy = Variable::new(v.name.clone(), v.value.clone(), v.keyword, v.decl_line);
                copy.mood = v.mood;
                copy.traits = v.traits.clone();
                copy.trust = v.trust;
                copy.scars = v.scars;
                env.define(var_name, new_var(copy));
            }
            let line = decl.name.span.start_line;
            let mut args = args.iter();
            for param in &decl.params {
                let value = args.next().cloned().unwrap_or(Value::Void);
                env.define(
                    param.name.clone(),
                    new_var(Variable::new(param.name.clone(), value, DeclKeyword::Sure, line)),
                );
            }
        }

        let (mut result, terminators) = self.in_scope(scope, |this| -> EvalResult<_> {
            let mut last = Value::Void;
            for stmt in &decl.body.stmts {
                match this.execute(stmt)? {
                    Flow::Normal(v) => last = v,
                    Flow::Return(v, terms) => return Ok((v, terms)),
                    Flow::Break => break,
                }
            }
            Ok((last, Vec::new()))
        })?;

        for term in &terminators {
            match term {
                Terminator::Cache => self.functions.pin(name, result.clone()),
                Terminator::Debug => self.emit(format!("[?] {result}")),
                Terminator::Normal | Terminator::Uncertain | Terminator::Forceful => {}
            }
        }

        if count >= TIRED_AT {
            result = match result {
                Value::Number(n) => Value::Number(n - 1.0),
                Value::Word(s) if !s.is_empty() => Value::Word(drop_last_char(s)),
                other => other,
            };
        }

        if let Some(key) = memo_key {
            if let Some((evicted_key, evicted)) = self.functions.memo_store(name, key, result.clone()) {
                self.afterlife
                    .send(&format!("__memo_{name}_{evicted_key}"), evicted, Mood::Neutral, 0);
            }
        }

        if count == 1 {
            self.functions.mark_first_call(name);
        } else {
            self.functions.take_first_call(name);
        }
        Ok(result)
    }

    /// Methods on lists, words and personality instances. `push` and `pop`
    /// write the updated list back when the receiver is a variable.
    fn call_method(
        &mut self,
        receiver_name: Option<&str>,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        match receiver {
            Value::List(mut items) => {
                let out = match method {
                    "length" => return Ok(Value::Number(items.len() as f64)),
                    "push" => match args.into_iter().next() {
                        Some(item) => {
                            items.push(item);
                            Value::Void
                        }
                        None => return Ok(Value::Void),
                    },
                    "pop" => items.pop().unwrap_or(Value::Void),
                    _ => return Ok(Value::Void),
                };
                if let Some(var) = receiver_name.and_then(|n| self.lookup(n)) {
                    var.borrow_mut().value = Value::List(items);
                }
                Ok(out)
            }
            Value::Word(s) => Ok(match method {
                "length" => Value::Number(s.chars().count() as f64),
                "upper" => Value::Word(s.to_uppercase()),
                "lower" => Value::Word(s.to_lowercase()),
                "reverse" => Value::Word(s.chars().rev().collect()),
                "split" => {
                    let sep = args.first().and_then(Value::as_word).unwrap_or(" ");
                    Value::List(s.split(sep).map(Value::word).collect())
                }
                _ => Value::Void,
            }),
            Value::Blob(_) => match receiver
                .personality()
                .and_then(|owner| self.functions.find_method(owner, method))
            {
                Some(qualified) => self.call_function(&qualified, args),
                None => Ok(Value::Void),
            },
            _ => Ok(Value::Void),
        }
    }
}

/// Cache key for a `did` call: the arguments' display forms.
fn memo_key(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("({})", parts.join(", "))
}
