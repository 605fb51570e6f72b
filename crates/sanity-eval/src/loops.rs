//! Loop statements.
//!
//! Every loop honours `enough` ([`Flow::Break`]) by stopping itself and
//! passes `return` straight up to the enclosing call.

use crate::env::new_var;
use crate::error::{ExecResult, Flow, RuntimeError};
use crate::evaluator::Executor;
use crate::variable::Variable;
use sanity_types::ast::{Block, DeclKeyword, Expr, Ident};
use sanity_types::Value;
use std::rc::Rc;
use std::time::Duration;

/// Iterations of a `hopefully` loop that still earn SP.
const HOPEFUL_ITERATIONS: u64 = 100;
/// Upper bound on the `reluctantly` backoff.
const MAX_RELUCTANCE_MS: u64 = 10_000;

/// What one pass through a loop body asks the loop to do next.
enum Step {
    Continue(Value),
    Stop,
    Return(Flow),
}

fn step(flow: Flow) -> Step {
    match flow {
        Flow::Normal(v) => Step::Continue(v),
        Flow::Break => Step::Stop,
        ret @ Flow::Return(..) => Step::Return(ret),
    }
}

impl Executor {
    pub(crate) fn exec_again(&mut self, body: &Block) -> ExecResult {
        let mut result = Value::Void;
        loop {
            match step(self.exec_block(body)?) {
                Step::Continue(v) => result = v,
                Step::Stop => return Ok(Flow::Normal(result)),
                Step::Return(ret) => return Ok(ret),
            }
        }
    }

    /// Counted loop. The counter starts at 1 while the program is sane
    /// enough and at 0 otherwise.
    pub(crate) fn exec_pls(
        &mut self,
        count: &Expr,
        counter: Option<&Ident>,
        body: &Block,
        line: u32,
    ) -> ExecResult {
        let count = match self.eval_expr(count)? {
            Value::Number(n) => n.trunc() as i64,
            _ => return Err(RuntimeError::type_mismatch("pls loop count must be a Number")),
        };
        let start: i64 = if self.sp.sp() < 50 { 0 } else { 1 };
        let count = if self.ugh_quit_probability > 0.0 {
            ((count as f64 * (1.0 - self.ugh_quit_probability)) as i64).max(0)
        } else {
            count
        };

        let mut result = Value::Void;
        for i in start..start.saturating_add(count) {
            let mut index = i;
            if self.sp.insanity_mode() {
                index += self.random().range_inclusive(-1, 1);
            }
            let scope = self.child_scope();
            if let Some(counter) = counter {
                let var = Variable::new(
                    counter.name.clone(),
                    Value::Number(index as f64),
                    DeclKeyword::Sure,
                    line,
                );
                scope.borrow_mut().define(counter.name.clone(), new_var(var));
            }
            let flow = self.in_scope(Rc::clone(&scope), |this| this.exec_stmts(&body.stmts))?;
            match step(flow) {
                Step::Continue(v) => result = v,
                Step::Stop => break,
                Step::Return(ret) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(result))
    }

    /// Conditional loop that grows more likely to give up on every pass.
    pub(crate) fn exec_ugh(&mut self, condition: &Expr, body: &Block) -> ExecResult {
        let saved = self.ugh_quit_probability;
        let outcome = self.ugh_iterations(condition, body);
        self.ugh_quit_probability = saved;
        outcome
    }

    fn ugh_iterations(&mut self, condition: &Expr, body: &Block) -> ExecResult {
        let mut result = Value::Void;
        let mut iteration = 0u32;
        loop {
            iteration += 1;
            let mut quit_chance = 0.01 * f64::from(iteration);
            if self.sp.insanity_mode() {
                quit_chance *= 2.0;
            }
            self.ugh_quit_probability = quit_chance.min(1.0);
            if self.random().chance(quit_chance) {
                tracing::debug!(iteration, "ugh loop gave up");
                break;
            }
            let cond = self.eval_expr(condition)?;
            if !self.truthy(&cond) {
                break;
            }
            match step(self.exec_block(body)?) {
                Step::Continue(v) => result = v,
                Step::Stop => break,
                Step::Return(ret) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(result))
    }

    /// Runs until `enough` or until a `mercy.san` file appears beside the
    /// source file.
    pub(crate) fn exec_forever(&mut self, body: &Block) -> ExecResult {
        let mercy = self.sidecars.mercy_path();
        let mut result = Value::Void;
        loop {
            if mercy.as_ref().is_some_and(|p| p.exists()) {
                tracing::info!("mercy granted, leaving forever loop");
                break;
            }
            match step(self.exec_block(body)?) {
                Step::Continue(v) => result = v,
                Step::Stop => break,
                Step::Return(ret) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(result))
    }

    pub(crate) fn exec_hopefully(&mut self, condition: &Expr, body: &Block) -> ExecResult {
        let mut result = Value::Void;
        let mut iteration = 0u64;
        loop {
            let cond = self.eval_expr(condition)?;
            if !self.truthy(&cond) {
                break;
            }
            iteration += 1;
            if iteration <= HOPEFUL_ITERATIONS {
                self.sp.hopefully_bonus();
            } else {
                self.sp.hopefully_penalty();
            }
            match step(self.exec_block(body)?) {
                Step::Continue(v) => result = v,
                Step::Stop => break,
                Step::Return(ret) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(result))
    }

    /// Sleeps before every pass, doubling the delay each time.
    pub(crate) fn exec_reluctantly(&mut self, condition: &Expr, body: &Block) -> ExecResult {
        let mut result = Value::Void;
        let mut delay_ms = 1u64;
        loop {
            let cond = self.eval_expr(condition)?;
            if !self.truthy(&cond) {
                break;
            }
            std::thread::sleep(Duration::from_millis(delay_ms));
            delay_ms = (delay_ms * 2).min(MAX_RELUCTANCE_MS);
            match step(self.exec_block(body)?) {
                Step::Continue(v) => result = v,
                Step::Stop => break,
                Step::Return(ret) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(result))
    }

    /// Runs the body in an isolated scope whose variables go straight to
    /// the Afterlife. The first error stops the block and is discarded;
    /// `enough` and `return` still unwind past it.
    pub(crate) fn exec_never(&mut self, body: &Block) -> ExecResult {
        let scope = self.child_scope();
        let flow = match self.in_scope(Rc::clone(&scope), |this| this.exec_stmts(&body.stmts)) {
            Ok(flow) => flow,
            Err(err) => {
                tracing::warn!(error = %err, "error inside never block discarded");
                Flow::Normal(Value::Void)
            }
        };
        let locals: Vec<_> = scope
            .borrow()
            .locals()
            .map(|(name, var)| (name.clone(), Rc::clone(var)))
            .collect();
        for (name, var) in locals {
            self.send_to_afterlife(&name, &var);
        }
        Ok(match flow {
            Flow::Normal(_) => Flow::Normal(Value::Void),
            signal => signal,
        })
    }
}
