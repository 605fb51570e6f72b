//! `Lists`: sorting, higher-order helpers and shuffling.

use super::{holder_in_mood, name_arg, unknown_function, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::{Mood, Value};
use std::cmp::Ordering;

pub struct ListsModule;

impl StdlibModule for ListsModule {
    fn name(&self) -> &'static str {
        "Lists"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        let items = match args.first() {
            Some(Value::List(items)) => Some(items.clone()),
            _ => None,
        };
        match function {
            "sort" => {
                let Some(mut items) = items else {
                    return Ok(Value::List(Vec::new()));
                };
                items.sort_by(sort_order);
                // A Sad holder sorts backwards.
                if holder_in_mood(exec, &args[0], Mood::Sad).is_some() {
                    items.reverse();
                }
                Ok(Value::List(items))
            }
            "filter" => {
                let (Some(items), Some(f)) = (items, name_arg(&args, 1)) else {
                    return Ok(Value::List(Vec::new()));
                };
                let has_function = exec.functions.contains(&f);
                let mut kept = Vec::new();
                for item in items {
                    let verdict = if has_function {
                        exec.call_function(&f, vec![item.clone()])?
                    } else {
                        item.clone()
                    };
                    if exec.truthy(&verdict) {
                        kept.push(item);
                    }
                }
                Ok(Value::List(kept))
            }
            "map" => {
                let (Some(items), Some(f)) = (items, name_arg(&args, 1)) else {
                    return Ok(Value::List(Vec::new()));
                };
                if !exec.functions.contains(&f) {
                    return Ok(Value::List(items));
                }
                let mapped = items
                    .into_iter()
                    .map(|item| exec.call_function(&f, vec![item]))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::List(mapped))
            }
            "reduce" => {
                let (Some(items), Some(f)) = (items, name_arg(&args, 1)) else {
                    return Ok(Value::Void);
                };
                let (mut acc, rest) = match args.get(2) {
                    Some(initial) => (initial.clone(), &items[..]),
                    None => match items.split_first() {
                        Some((first, rest)) => (first.clone(), rest),
                        None => (Value::Void, &items[..]),
                    },
                };
                if exec.functions.contains(&f) {
                    for item in rest {
                        acc = exec.call_function(&f, vec![acc, item.clone()])?;
                    }
                }
                Ok(acc)
            }
            "shuffle" => {
                let Some(mut items) = items else {
                    return Ok(Value::List(Vec::new()));
                };
                for i in (1..items.len()).rev() {
                    let j = exec.random().index(i + 1);
                    items.swap(i, j);
                }
                Ok(Value::List(items))
            }
            other => Err(unknown_function(self.name(), other)),
        }
    }
}

/// Numbers first, then Words, then everything else by display form.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::Word(_) => 1,
            _ => 2,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Word(x), Value::Word(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}
