//! `Time`: clocks that get less reliable as SP drops.

use super::{unknown_function, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::Value;
use std::time::Duration;

pub struct TimeModule;

impl StdlibModule for TimeModule {
    fn name(&self) -> &'static str {
        "Time"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        match function {
            "now" => {
                // Jitter scale runs from 0.1 at SP 100 up to 1.0 at SP 0.
                let scale = ((100 - exec.sp.sp()) as f64 / 100.0).max(0.1);
                let jitter = exec.random().uniform(-0.1, 0.1) * scale;
                Ok(Value::Number(unix_seconds() + jitter))
            }
            "wait" => match args.first() {
                Some(Value::Number(ms)) => {
                    let actual = ms * exec.random().uniform(0.9, 1.1);
                    if actual > 0.0 {
                        std::thread::sleep(Duration::from_secs_f64(actual / 1000.0));
                    }
                    Ok(Value::Number(actual))
                }
                _ => Ok(Value::Void),
            },
            "elapsed" => Ok(Value::Number(exec.started.elapsed().as_secs_f64() * 1000.0)),
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

fn unix_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
