//! `Graph`: read-only queries over the bond graph.

use super::{name_arg, unknown_function, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::Value;

pub struct GraphModule;

impl StdlibModule for GraphModule {
    fn name(&self) -> &'static str {
        "Graph"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        let out = match function {
            "edges" => Value::List(
                exec.graph
                    .all_edges()
                    .into_iter()
                    .map(|(a, b)| {
                        Value::List(vec![Value::word(a), Value::word(b), Value::word("bond")])
                    })
                    .collect(),
            ),
            "distance" => match (name_arg(&args, 0), name_arg(&args, 1)) {
                (Some(a), Some(b)) => {
                    let hops = exec.graph.distance(&a, &b).map_or(-1.0, |d| d as f64);
                    Value::Number(hops)
                }
                _ => Value::Number(-1.0),
            },
            "connected" => match name_arg(&args, 0) {
                Some(name) => words(exec.graph.neighbours(&name)),
                None => Value::List(Vec::new()),
            },
            "isolated" => {
                let names = exec
                    .all_variables()
                    .into_keys()
                    .filter(|name| exec.graph.degree(name) == 0)
                    .collect();
                words(names)
            }
            other => return Err(unknown_function(self.name(), other)),
        };
        Ok(out)
    }
}

fn words(names: Vec<String>) -> Value {
    Value::List(names.into_iter().map(Value::word).collect())
}
