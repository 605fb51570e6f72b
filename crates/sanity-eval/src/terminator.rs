//! Statement terminators, applied left to right once a statement has run.

use crate::env::VarRef;
use crate::evaluator::Executor;
use sanity_types::ast::Terminator;
use sanity_types::{Span, Value};

impl Executor {
    pub(crate) fn apply_terminators(&mut self, span: Span, value: Value, terms: &[Terminator]) -> Value {
        for term in terms {
            match term {
                Terminator::Normal => {}
                Terminator::Cache => {
                    self.stmt_cache.insert(span, value.clone());
                }
                Terminator::Uncertain => {
                    if !self.is_banned("uncertainty") {
                        for var in self.touched_variables() {
                            var.borrow_mut().is_uncertain = true;
                        }
                    }
                }
                Terminator::Forceful => {
                    for var in self.touched_variables() {
                        var.borrow_mut().traits.clear();
                    }
                }
                Terminator::Debug => {
                    self.emit(format!("[?] {value}"));
                    for var in self.touched_variables() {
                        let collapse = var.borrow().value.is_dunno() && self.random().chance(0.5);
                        let mut v = var.borrow_mut();
                        v.observed = true;
                        if collapse {
                            v.value = Value::Yep;
                        } else if v.value.is_dunno() {
                            v.value = Value::Nope;
                        }
                    }
                }
            }
        }
        value
    }

    /// Variables read during the statement that just ran.
    fn touched_variables(&self) -> Vec<VarRef> {
        self.all_variables()
            .into_values()
            .filter(|v| v.borrow().last_accessed == self.stmt_counter)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ExecutorConfig;
    use crate::env::new_var;
    use crate::evaluator::Executor;
    use crate::rng::FixedRandom;
    use crate::variable::Variable;
    use sanity_types::ast::{DeclKeyword, Terminator};
    use sanity_types::{Span, Value};

    fn executor() -> Executor {
        Executor::with_random(ExecutorConfig::new(), Box::new(FixedRandom(0.1)))
    }

    fn touched(exec: &mut Executor, name: &str, value: Value) {
        let mut var = Variable::new(name, value, DeclKeyword::Maybe, 1);
        var.last_accessed = exec.stmt_counter;
        var.traits.insert(sanity_types::Trait::Lucky);
        exec.global.borrow_mut().define(name, new_var(var));
    }

    #[test]
    fn debug_collapses_dunno_and_marks_observed() {
        let mut exec = executor();
        touched(&mut exec, "x", Value::Dunno);
        exec.apply_terminators(Span::line(1), Value::Void, &[Terminator::Debug]);
        let x = exec.lookup("x").unwrap();
        assert_eq!(x.borrow().value, Value::Yep);
        assert!(x.borrow().observed);
        assert_eq!(exec.output, vec!["[?] Void".to_string()]);
    }

    #[test]
    fn forceful_strips_traits() {
        let mut exec = executor();
        touched(&mut exec, "x", Value::Number(1.0));
        exec.apply_terminators(Span::line(1), Value::Void, &[Terminator::Forceful]);
        assert!(exec.lookup("x").unwrap().borrow().traits.is_empty());
    }

    #[test]
    fn uncertainty_respects_ban() {
        let mut exec = executor();
        touched(&mut exec, "x", Value::Number(1.0));
        exec.banned.insert("uncertainty".to_string());
        exec.apply_terminators(Span::line(1), Value::Void, &[Terminator::Uncertain]);
        assert!(!exec.lookup("x").unwrap().borrow().is_uncertain);
    }

    #[test]
    fn cache_pins_by_span() {
        let mut exec = executor();
        exec.apply_terminators(Span::line(4), Value::Number(7.0), &[Terminator::Cache]);
        assert_eq!(exec.stmt_cache.get(&Span::line(4)), Some(&Value::Number(7.0)));
    }
}
