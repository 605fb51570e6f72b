//! `Chaos`: deliberate loss of sanity.

use super::{name_arg, unknown_function, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::{strict_equal, Mood, Value};

pub struct ChaosModule;

impl StdlibModule for ChaosModule {
    fn name(&self) -> &'static str {
        "Chaos"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        match function {
            "embrace" => {
                tracing::info!("chaos embraced");
                exec.sp.set_sp(0);
            }
            "destabilize" => destabilize(exec, &args),
            "scramble" => scramble(exec),
            other => return Err(unknown_function(self.name(), other)),
        }
        Ok(Value::Void)
    }
}

/// Give a variable a random mood. A Word argument names the variable;
/// anything else is matched against current values.
fn destabilize(exec: &mut Executor, args: &[Value]) {
    let target = match args.first() {
        Some(Value::Word(_)) => name_arg(args, 0).and_then(|name| exec.lookup(&name)),
        Some(value) => exec
            .all_variables()
            .into_values()
            .find(|var| strict_equal(&var.borrow().value, value)),
        None => None,
    };
    if let Some(var) = target {
        let mood = Mood::ALL[exec.random().index(Mood::ALL.len())];
        var.borrow_mut().mood = mood;
    }
}

/// Shuffle values between every variable in sight.
fn scramble(exec: &mut Executor) {
    let vars: Vec<_> = exec.all_variables().into_values().collect();
    let mut values: Vec<Value> = vars.iter().map(|v| v.borrow().value.clone()).collect();
    for i in (1..values.len()).rev() {
        let j = exec.random().index(i + 1);
        values.swap(i, j);
    }
    for (var, value) in vars.iter().zip(values) {
        var.borrow_mut().value = value;
    }
}
