//! `Words`: text helpers that notice the mood of whoever holds the text.

use super::{holder_in_mood, unknown_function, word_arg, StdlibModule};
use crate::error::EvalResult;
use crate::evaluator::Executor;
use sanity_types::{Mood, Value};

pub struct WordsModule;

impl StdlibModule for WordsModule {
    fn name(&self) -> &'static str {
        "Words"
    }

    fn call(&self, exec: &mut Executor, function: &str, args: Vec<Value>) -> EvalResult<Value> {
        let out = match function {
            "length" => match args.first() {
                Some(Value::Word(s)) => Value::Number(s.chars().count() as f64),
                Some(Value::List(items)) => Value::Number(items.len() as f64),
                _ => Value::Number(0.0),
            },
            "reverse" => match args.first() {
                Some(word @ Value::Word(s)) => {
                    // Reversing a Sad word cheers its holder up.
                    if let Some(var) = holder_in_mood(exec, word, Mood::Sad) {
                        var.borrow_mut().mood = Mood::Happy;
                    }
                    Value::word(s.chars().rev().collect::<String>())
                }
                _ => Value::Void,
            },
            "upper" => match args.first() {
                Some(word @ Value::Word(s)) => {
                    let mut chars: Vec<char> = s.to_uppercase().chars().collect();
                    if holder_in_mood(exec, word, Mood::Angry).is_some() {
                        let marks = exec.random().range_inclusive(1, 3);
                        for _ in 0..marks {
                            let at = exec.random().index(chars.len() + 1);
                            chars.insert(at, '!');
                        }
                    }
                    Value::word(chars.into_iter().collect::<String>())
                }
                _ => Value::Void,
            },
            "lower" => match word_arg(&args, 0) {
                Some(s) => Value::word(s.to_lowercase()),
                None => Value::Void,
            },
            "split" => match word_arg(&args, 0) {
                Some(s) => {
                    let sep = word_arg(&args, 1).unwrap_or(" ");
                    Value::List(s.split(sep).map(Value::word).collect())
                }
                None => Value::List(Vec::new()),
            },
            "join" => match args.first() {
                Some(Value::List(items)) => {
                    let sep = word_arg(&args, 1).unwrap_or("");
                    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                    Value::word(parts.join(sep))
                }
                _ => Value::word(""),
            },
            other => return Err(unknown_function(self.name(), other)),
        };
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ExecutorConfig;
    use crate::env::new_var;
    use crate::evaluator::Executor;
    use crate::rng::FixedRandom;
    use crate::variable::Variable;
    use sanity_types::ast::DeclKeyword;
    use sanity_types::{Mood, Value};

    fn exec_with(name: &str, value: Value, mood: Mood) -> Executor {
        let exec = Executor::with_random(ExecutorConfig::new(), Box::new(FixedRandom(0.0)));
        let mut var = Variable::new(name, value, DeclKeyword::Maybe, 1);
        var.mood = mood;
        exec.global.borrow_mut().define(name, new_var(var));
        exec
    }

    #[test]
    fn reversing_a_sad_word_cheers_it_up() {
        let mut exec = exec_with("w", Value::word("abc"), Mood::Sad);
        let out = exec
            .call_stdlib("Words", "reverse", vec![Value::word("abc")])
            .unwrap();
        assert_eq!(out, Value::word("cba"));
        assert_eq!(exec.lookup("w").unwrap().borrow().mood, Mood::Happy);
    }

    #[test]
    fn angry_upper_shouts() {
        let mut exec = exec_with("w", Value::word("hey"), Mood::Angry);
        let out = exec
            .call_stdlib("Words", "upper", vec![Value::word("hey")])
            .unwrap();
        assert_eq!(out, Value::word("!HEY"));
    }

    #[test]
    fn split_and_join() {
        let mut exec = exec_with("w", Value::Void, Mood::Neutral);
        let parts = exec
            .call_stdlib("Words", "split", vec![Value::word("a,b"), Value::word(",")])
            .unwrap();
        assert_eq!(parts, Value::List(vec![Value::word("a"), Value::word("b")]));
        let joined = exec
            .call_stdlib("Words", "join", vec![parts, Value::word("-")])
            .unwrap();
        assert_eq!(joined, Value::word("a-b"));
    }
}
