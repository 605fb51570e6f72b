//! `Zen`: ways back to sanity, at a price.

use super::{unknown_function, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::{Mood, Value};

pub struct ZenModule;

impl StdlibModule for ZenModule {
    fn name(&self) -> &'static str {
        "Zen"
    }

    fn call(&self, exec: &mut Executor, function: &str, _args: Vec<Value>) -> EvalResult<Value> {
        match function {
            "breathe" => exec.sp.adjust(5, "zen breathe"),
            "meditate" => {
                for var in exec.all_variables().into_values() {
                    var.borrow_mut().mood = Mood::Neutral;
                }
            }
            "cleanse" => {
                for var in exec.all_variables().into_values() {
                    var.borrow_mut().traits.clear();
                }
                exec.sp.adjust(-30, "zen cleanse");
            }
            other => return Err(unknown_function(self.name(), other)),
        }
        Ok(Value::Void)
    }
}
