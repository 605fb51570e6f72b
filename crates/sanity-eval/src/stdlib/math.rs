//! `Math`: arithmetic helpers with a wobbly PI and a luck-aware `random`.

use super::{number_or_zero, unknown_function, StdlibModule};
use crate::error::{EvalResult, RuntimeError};
use crate::evaluator::Executor;
use sanity_types::{Trait, Value};

pub struct MathModule;

impl StdlibModule for MathModule {
    fn name(&self) -> &'static str {
        "Math"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        let binary = |f: fn(f64, f64) -> f64| {
            if args.len() < 2 {
                Value::Void
            } else {
                Value::Number(f(number_or_zero(&args, 0), number_or_zero(&args, 1)))
            }
        };
        match function {
            "add" => Ok(binary(|a, b| a + b)),
            "subtract" => Ok(binary(|a, b| a - b)),
            "multiply" => Ok(binary(|a, b| a * b)),
            "divide" => {
                if args.len() < 2 {
                    return Ok(Value::Void);
                }
                let divisor = number_or_zero(&args, 1);
                if divisor == 0.0 {
                    return Err(RuntimeError::arithmetic("Division by zero"));
                }
                Ok(Value::Number(number_or_zero(&args, 0) / divisor))
            }
            "sqrt" => match args.first() {
                Some(Value::Number(n)) if *n < 0.0 => {
                    Err(RuntimeError::arithmetic("Cannot sqrt negative number"))
                }
                Some(Value::Number(n)) => Ok(Value::Number(n.sqrt())),
                _ => Ok(Value::Void),
            },
            "PI" => Ok(Value::Number(3.1415 + exec.random().uniform(-0.0001, 0.0001))),
            "random" => Ok(Value::Number(lucky_roll(exec))),
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

/// A roll in `[0, 1)`. The first Lucky or Unlucky variable in sight keeps
/// the better or worse of two rolls.
fn lucky_roll(exec: &mut Executor) -> f64 {
    let roll = exec.random().next_f64();
    let luck = exec.all_variables().into_values().find_map(|var| {
        let v = var.borrow();
        if v.has_trait(Trait::Lucky) {
            Some(Trait::Lucky)
        } else if v.has_trait(Trait::Unlucky) {
            Some(Trait::Unlucky)
        } else {
            None
        }
    });
    match luck {
        Some(Trait::Lucky) => roll.max(exec.random().next_f64()),
        Some(_) => roll.min(exec.random().next_f64()),
        None => roll,
    }
}
