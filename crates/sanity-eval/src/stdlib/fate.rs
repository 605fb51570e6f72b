//! `Fate`: function-call forms of foreshadowing plus a fortune teller.

use super::{unknown_function, word_arg, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::{Trait, Value};

pub struct FateModule;

impl StdlibModule for FateModule {
    fn name(&self) -> &'static str {
        "Fate"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        let out = match function {
            "foreshadow" => {
                if let Some(event) = word_arg(&args, 0) {
                    exec.foreshadowed.insert(event.to_string(), false);
                }
                Value::Void
            }
            "fulfill" => {
                if let Some(event) = word_arg(&args, 0) {
                    if let Some(done) = exec.foreshadowed.get_mut(event) {
                        *done = true;
                    }
                }
                Value::Void
            }
            "predict" => match word_arg(&args, 0) {
                Some(name) => predict(exec, name),
                None => Value::Void,
            },
            "odds" => match args.first() {
                Some(v) if exec.truthy(v) => Value::Number(0.7),
                Some(_) => Value::Number(0.3),
                None => Value::Number(0.5),
            },
            other => return Err(unknown_function(self.name(), other)),
        };
        Ok(out)
    }
}

/// Mean of a variable's numeric history, nudged by luck. Without numeric
/// history, the last recorded value.
fn predict(exec: &Executor, name: &str) -> Value {
    let Some(var) = exec.lookup(name) else {
        return Value::Void;
    };
    let v = var.borrow();
    let numbers: Vec<f64> = v.history.iter().filter_map(Value::as_number).collect();
    if numbers.is_empty() {
        return v.history.last().cloned().unwrap_or(Value::Void);
    }
    let mut guess = numbers.iter().sum::<f64>() / numbers.len() as f64;
    if v.has_trait(Trait::Lucky) {
        guess *= 1.1;
    }
    if v.has_trait(Trait::Unlucky) {
        guess *= 0.9;
    }
    Value::Number(guess)
}
