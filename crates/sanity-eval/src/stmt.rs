//! Statement dispatch and the non-loop statement forms.

use crate::env::{new_var, EnvRef};
use crate::error::{EvalResult, ExecResult, Flow, RuntimeError};
use crate::evaluator::Executor;
use crate::events::Listener;
use crate::expr::collect_names;
use crate::files::{FileHandle, BASE_IO_COST};
use crate::functions::FunctionDef;
use crate::relations::Relation;
use crate::variable::Variable;
use sanity_types::ast::{
    Block, CheckCase, CheckStmt, CmpOp, DeclKeyword, Expr, FuncDecl, FuncKeyword, Ident, IfStmt,
    PersonalityDef, Prayer, StateCheck, Stmt, StmtKind, TryCope, VarDecl,
};
use sanity_types::{strict_equal, Mood, Trait, Value};
use std::path::PathBuf;
use std::rc::Rc;

/// Ghosts a program may declare before it is called haunted.
const HAUNTED_AFTER: i64 = 5;
/// Swallowed errors after which a yolo block curses its variables.
const YOLO_CURSE_AT: u32 = 10;
/// `oops` statements before they escalate.
const OOPS_ESCALATE_AT: u32 = 10;
/// Jackpot conditions pay out on every n-th check.
const JACKPOT_EVERY: u64 = 100;

const ORACLE_ANSWERS: [&str; 7] = [
    "Probably.",
    "Unlikely.",
    "The stars say yes.",
    "Ask again later.",
    "Without a doubt... maybe.",
    "Signs point to Void.",
    "Your variables are concerned about you.",
];

impl Executor {
    // ══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn dispatch(&mut self, stmt: &Stmt) -> ExecResult {
        let value = match &stmt.kind {
            // ── Bindings ──
            StmtKind::VarDecl(decl) => self.exec_var_decl(decl, stmt.span.start_line)?,
            StmtKind::Assign { name, value } => self.exec_assign(name, value)?,
            StmtKind::Print(expr) => self.exec_print(expr)?,
            StmtKind::Expr(expr) => self.eval_expr(expr)?,

            // ── Conditionals ──
            StmtKind::If(if_stmt) => return self.exec_if(if_stmt),
            StmtKind::Unless { condition, body } => {
                let cond = self.eval_expr(condition)?;
                if self.truthy(&cond) {
                    Value::Void
                } else {
                    return self.exec_block(body);
                }
            }
            StmtKind::Suppose { condition, body } => return self.exec_suppose(condition, body),
            StmtKind::Pretend { body, .. } => return self.exec_pretend(body),
            StmtKind::Check(check) => return self.exec_check(check),

            // ── Loops ──
            StmtKind::Again(body) => return self.exec_again(body),
            StmtKind::Pls {
                count,
                counter,
                body,
            } => return self.exec_pls(count, counter.as_ref(), body, stmt.span.start_line),
            StmtKind::Ugh { condition, body } => return self.exec_ugh(condition, body),
            StmtKind::Forever(body) => return self.exec_forever(body),
            StmtKind::Hopefully { condition, body } => return self.exec_hopefully(condition, body),
            StmtKind::Reluctantly { condition, body } => {
                return self.exec_reluctantly(condition, body)
            }
            StmtKind::Never(body) => return self.exec_never(body),
            StmtKind::Enough => return Ok(Flow::Break),

            // ── Functions ──
            StmtKind::FuncDecl(decl) => self.exec_func_decl(decl)?,
            StmtKind::Return(value) => {
                let value = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Void,
                };
                return Ok(Flow::Return(value, stmt.terminators.clone()));
            }
            StmtKind::ForgetCalls(name) => {
                self.functions.reset_calls(&name.name);
                Value::Void
            }

            // ── Errors ──
            StmtKind::Try(t) => return self.exec_try(t),
            StmtKind::Blame { target, reason } => return Err(self.exec_blame(target, reason)),
            StmtKind::Oops(message) => return Err(self.exec_oops(message)),
            StmtKind::Yolo(body) => return self.exec_yolo(body),
            StmtKind::Cry(message) => {
                self.emit(format!("[CRASH] {message}"));
                return Err(RuntimeError::raised(message.clone()));
            }

            // ── Gambling ──
            StmtKind::Bet {
                condition,
                reward,
                risk,
                body,
            } => return self.exec_bet(condition, reward, risk, body),
            StmtKind::Jackpot { condition, body } => {
                return self.exec_jackpot(condition, body, stmt.span)
            }

            // ── Time ──
            StmtKind::Foreshadow(event) => {
                self.require_time()?;
                self.foreshadowed.insert(event.clone(), false);
                Value::Void
            }
            StmtKind::Fulfill(event) => {
                self.require_time()?;
                self.foreshadowed.insert(event.clone(), true);
                self.fire_event(event, event)?;
                Value::Void
            }
            StmtKind::Rewind(count) => self.exec_rewind(count)?,

            // ── Chapters, personalities, events ──
            StmtKind::Recall { chapter, item } => {
                self.exec_recall(chapter, item.as_ref(), &stmt.terminators)?
            }
            StmtKind::Personality(def) => self.exec_personality(def),
            StmtKind::When {
                target,
                event,
                body,
            } => {
                let listener = Listener {
                    body: Rc::new(body.clone()),
                    env: Rc::clone(&self.env),
                };
                self.events.register(&target.name, &event.key(), listener);
                Value::Void
            }

            // ── Debugging ──
            StmtKind::Wtf(target) => self.exec_wtf(&target.name),
            StmtKind::Huh(target) => self.exec_huh(&target.name),
            StmtKind::Therapy => self.exec_therapy(),
            StmtKind::Oracle(question) => self.exec_oracle(question),

            // ── Self-modification ──
            StmtKind::GrammarAlias {
                new_keyword,
                old_keyword,
            } => {
                self.grammar_aliases
                    .insert(new_keyword.clone(), old_keyword.clone());
                Value::Void
            }
            StmtKind::GrammarRemove(keyword) => {
                self.grammar_removed.insert(keyword.clone());
                Value::Void
            }
            StmtKind::Pray(prayer) => self.exec_pray(*prayer),
            StmtKind::No(feature) => self.exec_no(feature),
            StmtKind::Exorcise(curse) => {
                if self.active_curses.remove(curse) {
                    self.sp.exorcise_cost();
                } else {
                    self.sp.proactive_exorcise();
                }
                Value::Void
            }
            StmtKind::IAmOkay => self.exec_i_am_okay(),

            // ── Relationships ──
            StmtKind::ForgetsEveryone(name) => self.exec_forgets_everyone(&name.name),
            StmtKind::Delete(name) => self.exec_delete(&name.name)?,

            StmtKind::Vibe(body) => return self.exec_block(body),

            // ── Files ──
            StmtKind::Open { path, handle } => self.exec_open(path, handle)?,
            StmtKind::Write { content, handle } => self.exec_write(content, handle, false)?,
            StmtKind::Append { content, handle } => self.exec_write(content, handle, true)?,
            StmtKind::Close(handle) => {
                let Some(mut fh) = self.file_handles.remove(&handle.name) else {
                    return Err(RuntimeError::io(format!(
                        "No open file handle '{}'",
                        handle.name
                    )));
                };
                fh.close();
                Value::Void
            }
        };
        Ok(Flow::Normal(value))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════

    /// Run a block in a fresh child scope.
    pub(crate) fn exec_block(&mut self, block: &Block) -> ExecResult {
        let scope = self.child_scope();
        self.sp.enter_scope();
        let result = self.in_scope(Rc::clone(&scope), |this| this.exec_stmts(&block.stmts));
        let wasted = {
            let s = scope.borrow();
            s.has_locals() && !s.any_used()
        };
        if wasted {
            self.sp.wasted_scope();
        }
        result
    }

    /// Run statements in the current scope. The last value is kept; signals
    /// stop the run and are handed back.
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt]) -> ExecResult {
        let mut last = Value::Void;
        for stmt in stmts {
            match self.execute(stmt)? {
                Flow::Normal(v) => last = v,
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal(last))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Bindings
    // ══════════════════════════════════════════════════════════════════════

    fn exec_var_decl(&mut self, decl: &VarDecl, line: u32) -> EvalResult<Value> {
        let name = decl.name.name.as_str();
        let keyword = decl.keyword;

        if keyword == DeclKeyword::Ghost && self.is_banned("ghosts") {
            return Err(RuntimeError::banned("ghosts are banned (no ghosts)"));
        }
        if keyword == DeclKeyword::Dream && self.is_banned("time") {
            return Err(RuntimeError::banned("dream variables are banned (no time)"));
        }

        match name.chars().count() {
            1 => self.sp.single_char_name(),
            n if n > 20 => self.sp.long_name(),
            _ => {}
        }
        match keyword {
            DeclKeyword::Whatever => self.sp.whatever_declaration(),
            DeclKeyword::Curse => self.sp.curse_declaration(),
            _ => {}
        }

        let pinky_source = decl.source.as_ref().map(|s| s.name.clone());
        let mut value = match (&decl.value, &pinky_source) {
            (Some(e), _) => self.eval_expr(e)?,
            (None, Some(source)) => match self.lookup(source) {
                Some(v) => {
                    let value = v.borrow().value.clone();
                    value
                }
                None => Value::Void,
            },
            (None, None) => Value::Void,
        };

        if let Some(existing) = self.lookup(name) {
            let existing_keyword = existing.borrow().keyword;
            match (keyword, existing_keyword) {
                (_, DeclKeyword::Swear) => return Err(self.swear_violation(name)),
                (DeclKeyword::Sure, DeclKeyword::Sure) => {
                    self.send_to_afterlife(name, &existing);
                    self.sp.override_sure();
                    let mut old = existing.borrow_mut();
                    if !old.value.same_type(&value) {
                        old.add_scar();
                    }
                }
                (DeclKeyword::Sure, other) => {
                    return Err(RuntimeError::immutable(format!(
                        "Cannot reassign '{}' variable '{name}' with 'sure'.",
                        other.as_str()
                    )));
                }
                (DeclKeyword::Maybe, DeclKeyword::Maybe) => {
                    let mut var = existing.borrow_mut();
                    var.doubt += 1;
                    if var.doubt >= 5 {
                        var.is_uncertain = true;
                    }
                    let old = std::mem::replace(&mut var.value, value.clone());
                    var.previous_value = Some(old);
                    var.history.push(value.clone());
                    return Ok(value);
                }
                _ => {
                    return Err(RuntimeError::immutable(format!(
                        "Variable '{name}' already exists and cannot be re-declared with keyword '{}'.",
                        keyword.as_str()
                    )));
                }
            }
        }

        if keyword == DeclKeyword::Ghost {
            self.ghost_count += 1;
            if self.ghost_count > HAUNTED_AFTER {
                self.emit("[SanityLang] Warning: Your codebase is haunted.");
            }
        }

        if keyword == DeclKeyword::Dream {
            if let Some(restored) = self.pending_dreams.remove(name) {
                value = restored;
                self.sp.dream_fulfilled();
            } else if self.fresh_dream {
                self.fresh_dream = false;
                self.sp.fresh_dream_start();
            }
        }
        if keyword == DeclKeyword::Curse {
            self.active_curses.insert(name.to_string());
        }

        let mut var = Variable::new(name, value.clone(), keyword, line);
        var.history.push(value.clone());
        var.pinky_source = pinky_source;
        var.last_accessed = self.stmt_counter;
        var.mood_set_at = self.stmt_counter;
        let var = new_var(var);
        self.env.borrow_mut().define(name, Rc::clone(&var));

        let bonds = self.env.borrow().detect_bonds();
        for (a, b) in bonds {
            self.sp.bond_formed();
            self.graph.add_edge(&a, &b);
        }

        self.excited_result(&var, decl.value.as_ref(), value)
    }

    /// A value produced by a function's very first call arrives Excited and
    /// doubled.
    fn excited_result(
        &mut self,
        var: &crate::env::VarRef,
        expr: Option<&Expr>,
        value: Value,
    ) -> EvalResult<Value> {
        let Some(called) = expr.and_then(Expr::called_name) else {
            return Ok(value);
        };
        if !self.functions.take_first_call(called) {
            return Ok(value);
        }
        self.set_mood(var, Mood::Excited)?;
        let doubled = Value::List(vec![value.clone(), value]);
        var.borrow_mut().value = doubled.clone();
        Ok(doubled)
    }

    fn swear_violation(&mut self, name: &str) -> RuntimeError {
        self.write_blame(&format!("Attempted to reassign swear variable '{name}'"));
        RuntimeError::immutable(format!(
            "Cannot reassign swear variable '{name}'! Program crashed."
        ))
        .with_blame(name)
    }

    fn exec_assign(&mut self, name: &Ident, value: &Expr) -> EvalResult<Value> {
        let name = name.name.as_str();
        let var = self
            .lookup(name)
            .ok_or_else(|| RuntimeError::undefined_variable(name))?;
        let keyword = var.borrow().keyword;
        match keyword {
            DeclKeyword::Sure => {
                return Err(RuntimeError::immutable(format!(
                    "Cannot reassign 'sure' variable '{name}'. Use override (redeclare with sure)."
                )));
            }
            DeclKeyword::Swear => return Err(self.swear_violation(name)),
            DeclKeyword::Ghost => {
                return Err(RuntimeError::immutable(format!(
                    "Cannot assign to ghost variable '{name}'"
                )));
            }
            _ => {}
        }

        let new_value = self.eval_expr(value)?;

        for hated in self.graph.targets(Relation::Hates, name) {
            let Some(other) = self.lookup(&hated) else {
                continue;
            };
            if Rc::ptr_eq(&other, &var) {
                continue;
            }
            if strict_equal(&other.borrow().value, &new_value) {
                return Err(RuntimeError::relationship(format!(
                    "'{name}' hates '{hated}': cannot hold the same value ({new_value})"
                )));
            }
        }

        {
            let mut v = var.borrow_mut();
            if keyword == DeclKeyword::Maybe {
                v.doubt += 1;
                if v.doubt >= 5 {
                    v.is_uncertain = true;
                }
            }
            if v.trust <= 0 {
                return Ok(v.value.clone());
            }
            let old = std::mem::replace(&mut v.value, new_value.clone());
            v.previous_value = Some(old);
            v.history.push(new_value.clone());
        }

        let source = var.borrow().pinky_source.clone();
        if let Some(source) = source.and_then(|s| self.lookup(&s)) {
            if !Rc::ptr_eq(&source, &var) {
                source.borrow_mut().value = new_value.clone();
            }
        }

        for fearer in self.graph.sources(Relation::Fears, name) {
            if let Some(f) = self.lookup(&fearer) {
                self.change_mood(&f, Mood::Afraid)?;
            }
        }

        if keyword == DeclKeyword::Scream {
            self.fire_event(name, "changes")?;
        }

        self.excited_result(&var, Some(value), new_value)
    }

    fn exec_print(&mut self, expr: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(expr)?;
        self.emit(value.to_string());
        if let Some(var) = expr.as_identifier().and_then(|n| self.lookup(n)) {
            var.borrow_mut().observed = true;
        }
        Ok(value)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Conditionals
    // ══════════════════════════════════════════════════════════════════════

    fn exec_if(&mut self, stmt: &IfStmt) -> ExecResult {
        let cond = self.eval_expr(&stmt.condition)?;
        let invert = self.sp.insanity_mode() && self.random().chance(0.1);
        if self.truthy(&cond) != invert {
            return self.exec_block(&stmt.body);
        }
        for clause in &stmt.but_clauses {
            let cond = self.eval_expr(&clause.condition)?;
            if self.truthy(&cond) != invert {
                return self.exec_block(&clause.body);
            }
        }
        match &stmt.actually {
            Some(block) => self.exec_block(block),
            None => Ok(Flow::void()),
        }
    }

    /// The body always runs; a false premise leaves this scope's variables
    /// uncertain.
    fn exec_suppose(&mut self, condition: &Expr, body: &Block) -> ExecResult {
        let cond = self.eval_expr(condition)?;
        let result = self.exec_block(body)?;
        if !self.truthy(&cond) {
            for (_, var) in self.env.borrow().locals() {
                var.borrow_mut().is_uncertain = true;
            }
        }
        Ok(result)
    }

    fn exec_pretend(&mut self, body: &Block) -> ExecResult {
        let scope = self.child_scope();
        let flow = self.in_scope(Rc::clone(&scope), |this| this.exec_stmts(&body.stmts))?;
        for (_, var) in scope.borrow().locals() {
            var.borrow_mut().is_pretend = true;
        }
        match flow {
            Flow::Normal(_) => Ok(Flow::void()),
            signal => Ok(signal),
        }
    }

    fn exec_check(&mut self, check: &CheckStmt) -> ExecResult {
        let value = self.eval_expr(&check.value)?;
        let subject = check.value.as_identifier().and_then(|n| self.lookup(n));
        for case in &check.cases {
            if !self.case_matches(case, &value, subject.as_ref())? {
                continue;
            }
            if case.types.iter().any(|t| t == "Void") {
                self.sp.void_truthiness_check();
            }
            return self.exec_block(&case.body);
        }
        match &check.otherwise {
            Some(block) => self.exec_block(block),
            None => Ok(Flow::void()),
        }
    }

    fn case_matches(
        &mut self,
        case: &CheckCase,
        value: &Value,
        subject: Option<&crate::env::VarRef>,
    ) -> EvalResult<bool> {
        if !case.types.is_empty() && !case.types.iter().any(|t| t == value.type_name()) {
            return Ok(false);
        }
        if let Some(guard) = &case.guard {
            let g = self.eval_expr(guard)?;
            if !self.truthy(&g) {
                return Ok(false);
            }
        }
        if let Some(key) = &case.blob_key {
            match value {
                Value::Blob(fields) if fields.contains_key(key) => {}
                _ => return Ok(false),
            }
        }
        if let Some(mood) = case.mood {
            if subject.map(|v| v.borrow().mood) != Some(mood) {
                return Ok(false);
            }
        }
        if let Some(state) = &case.state {
            let Some(var) = subject else {
                return Ok(false);
            };
            if !self.state_matches(state, var)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn state_matches(&mut self, state: &StateCheck, var: &crate::env::VarRef) -> EvalResult<bool> {
        let actual = {
            let v = var.borrow();
            match state.attribute.as_str() {
                "trust" => v.trust as f64,
                "doubt" => f64::from(v.doubt),
                "scars" => f64::from(v.scars),
                "age" => v.age as f64,
                "bonds" => v.bonds.len() as f64,
                other => {
                    return Err(RuntimeError::undefined(format!(
                        "Unknown variable attribute '{other}'"
                    )))
                }
            }
        };
        let expected = self.eval_expr(&state.value)?;
        let Some(expected) = expected.as_number() else {
            return Ok(false);
        };
        Ok(match state.op {
            CmpOp::Less => actual < expected,
            CmpOp::Greater => actual > expected,
            CmpOp::LessEq => actual <= expected,
            CmpOp::GreaterEq => actual >= expected,
            CmpOp::NotEqual => actual != expected,
            _ => actual == expected,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Functions & personalities
    // ══════════════════════════════════════════════════════════════════════

    fn exec_func_decl(&mut self, decl: &FuncDecl) -> EvalResult<Value> {
        let def = FunctionDef {
            decl: Rc::new(decl.clone()),
            closure: Rc::clone(&self.env),
        };
        self.functions.define(&decl.name.name, def);
        if decl.keyword == FuncKeyword::Must {
            self.call_function(&decl.name.name, Vec::new())?;
        }
        Ok(Value::Void)
    }

    fn exec_personality(&mut self, def: &PersonalityDef) -> Value {
        let name = def.name.name.clone();
        for stmt in &def.body {
            if let StmtKind::FuncDecl(func) = &stmt.kind {
                let method = FunctionDef {
                    decl: Rc::new(func.clone()),
                    closure: Rc::clone(&self.env),
                };
                self.functions.define(&format!("{name}.{}", func.name.name), method);
            }
        }
        self.personalities.insert(name, Rc::new(def.clone()));
        Value::Void
    }

    // ══════════════════════════════════════════════════════════════════════
    // Errors
    // ══════════════════════════════════════════════════════════════════════

    fn exec_try(&mut self, t: &TryCope) -> ExecResult {
        let err = match self.exec_block(&t.body) {
            Ok(flow) => return Ok(flow),
            Err(err) => err,
        };
        tracing::debug!(error = %err, "caught by try");

        if let Some(cope) = &t.cope {
            let scope = self.child_scope();
            match &cope.param {
                Some(param) => bind_sure(&scope, param, err.to_blob()),
                None => self.sp.useless_cope(),
            }
            return self.in_scope(scope, |this| this.exec_block(&cope.body));
        }

        if let Some(deny) = &t.deny {
            self.write_blame(&err.message);
            if let Some(var) = err.blame.as_deref().and_then(|b| self.lookup(b)) {
                self.lose_trust(&var, 10);
            }
            let scope = self.child_scope();
            if let Some(param) = &deny.param {
                bind_sure(&scope, param, err.to_blob());
            }
            let flow = self.in_scope(scope, |this| this.exec_block(&deny.body))?;
            if !flow.is_normal() {
                return Ok(flow);
            }
        }
        Ok(Flow::void())
    }

    fn exec_blame(&mut self, target: &Ident, reason: &str) -> RuntimeError {
        let name = target.name.as_str();
        if let Some(var) = self.lookup(name) {
            self.lose_trust(&var, 20);
            if let Err(err) = self.change_mood(&var, Mood::Afraid) {
                return err;
            }
        }
        if self.chapters.is_known(name) {
            self.chapters.adjust_trust(name, -10);
        }
        self.write_blame(&format!("{name}: {reason}"));
        RuntimeError::raised(reason).with_blame(name)
    }

    fn exec_oops(&mut self, message: &str) -> RuntimeError {
        self.sp.oops_penalty();
        self.oops_count += 1;
        if self.oops_count >= OOPS_ESCALATE_AT {
            RuntimeError::raised(format!("Too many oops! Escalated: {message}"))
        } else {
            RuntimeError::raised(format!("oops: {message}"))
        }
    }

    /// Every statement runs on its own; failures are swallowed and counted.
    fn exec_yolo(&mut self, body: &Block) -> ExecResult {
        let scope = self.child_scope();
        let (swallowed, signal) = self.in_scope(Rc::clone(&scope), |this| {
            let mut swallowed = 0u32;
            for stmt in &body.stmts {
                match this.execute(stmt) {
                    Ok(Flow::Normal(_)) => {}
                    Ok(signal) => return (swallowed, Some(signal)),
                    Err(err) => {
                        tracing::warn!(error = %err, "yolo swallowed an error");
                        swallowed += 1;
                        this.sp.yolo_swallow();
                    }
                }
            }
            (swallowed, None)
        });
        if swallowed >= YOLO_CURSE_AT {
            let locals: Vec<_> = scope.borrow().locals().map(|(_, v)| Rc::clone(v)).collect();
            for var in locals {
                self.gain_trait(&var, Trait::Cursed);
            }
        }
        Ok(signal.unwrap_or_else(Flow::void))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Gambling
    // ══════════════════════════════════════════════════════════════════════

    fn require_gambling(&self) -> EvalResult<()> {
        if self.is_banned("gambling") {
            return Err(RuntimeError::banned("gambling is banned (no gambling)"));
        }
        Ok(())
    }

    fn exec_bet(&mut self, condition: &Expr, reward: &Expr, risk: &Expr, body: &Block) -> ExecResult {
        self.require_gambling()?;
        let cond = self.eval_expr(condition)?;
        let reward = self.eval_expr(reward)?.as_number().map_or(0, |n| n as i64);
        let risk = self.eval_expr(risk)?.as_number().map_or(0, |n| n as i64);
        let names = collect_names(condition);

        let won = self.truthy(&cond) != self.sp.insanity_mode();
        if won {
            self.sp.bet_win(reward);
            for name in &names {
                if let Some(var) = self.lookup(name) {
                    self.gain_trait(&var, Trait::Lucky);
                }
            }
            return self.exec_block(body);
        }

        self.sp.bet_lose(risk);
        for name in names {
            let losses = self.bet_losses.entry(name.clone()).or_insert(0);
            *losses += 1;
            if *losses >= 3 {
                if let Some(var) = self.lookup(&name) {
                    self.gain_trait(&var, Trait::Unlucky);
                }
            }
        }
        Ok(Flow::void())
    }

    fn exec_jackpot(&mut self, condition: &Expr, body: &Block, key: sanity_types::Span) -> ExecResult {
        self.require_gambling()?;
        let count = self.jackpot_counts.entry(key).or_insert(0);
        *count += 1;
        let count = *count;
        let cond = self.eval_expr(condition)?;
        if self.truthy(&cond) && count % JACKPOT_EVERY == 0 {
            self.sp.jackpot_win();
            return self.exec_block(body);
        }
        Ok(Flow::void())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Time
    // ══════════════════════════════════════════════════════════════════════

    fn require_time(&self) -> EvalResult<()> {
        if self.is_banned("time") {
            return Err(RuntimeError::banned("time features are banned (no time)"));
        }
        Ok(())
    }

    /// Replay the statements that ran before this one.
    fn exec_rewind(&mut self, count: &Expr) -> EvalResult<Value> {
        self.require_time()?;
        let count = self.eval_expr(count)?.as_number().map_or(0, |n| n.max(0.0) as usize);
        for stmt in self.recent_statements(count) {
            self.execute(&stmt)?;
        }
        Ok(Value::Void)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Debugging
    // ══════════════════════════════════════════════════════════════════════

    fn exec_wtf(&mut self, name: &str) -> Value {
        let message = match self.lookup(name) {
            None => format!("[wtf] Variable '{name}' not found"),
            Some(var) => {
                let mut v = var.borrow_mut();
                v.observed = true;
                let traits: Vec<&str> = v.traits.iter().map(Trait::as_str).collect();
                let edges = self.graph.neighbours(&v.name);
                format!(
                    "[wtf] {}:\n  type:   {}\n  value:  {}\n  mood:   {}\n  trust:  {}\n  age:    {}\n  scars:  {}\n  doubt:  {}\n  traits: {}\n  bonds:  {}\n  edges:  {}",
                    v.name,
                    v.value.type_name(),
                    v.value,
                    v.mood,
                    v.trust,
                    v.age,
                    v.scars,
                    v.doubt,
                    or_none(&traits.join(", ")),
                    or_none(&v.bonds.join(", ")),
                    or_none(&edges.join(", ")),
                )
            }
        };
        self.emit(message);
        Value::Void
    }

    fn exec_huh(&mut self, name: &str) -> Value {
        let message = match self.lookup(name) {
            None => format!("[huh] Variable '{name}' not found"),
            Some(var) => {
                let mut v = var.borrow_mut();
                v.observed = true;
                format!("[huh] {}: {} = {}", v.name, v.value.type_name(), v.value)
            }
        };
        self.emit(message);
        Value::Void
    }

    fn exec_therapy(&mut self) -> Value {
        let vars = self.all_variables();
        let ghosts = vars
            .values()
            .filter(|v| v.borrow().keyword == DeclKeyword::Ghost)
            .count();
        let longest_chain = vars.values().map(|v| v.borrow().bonds.len()).max().unwrap_or(0);
        let report = format!(
            "[therapy] Program State:\n  SP:            {}\n  Variables:     {}\n  Ghosts:        {}\n  Statements:    {}\n  Functions:     {}\n  Graph edges:   {}\n  Longest chain: {}\n  Insanity Mode: {}",
            self.sp.sp(),
            vars.len(),
            ghosts,
            self.stmt_counter,
            self.functions.len(),
            self.graph.edge_count(),
            longest_chain,
            if self.sp.insanity_mode() { "YES" } else { "no" },
        );
        self.emit(report.clone());
        if let Err(err) = self.sidecars.append_therapy(&report) {
            tracing::warn!(error = %err, "could not write therapy log");
        }
        Value::Void
    }

    fn exec_oracle(&mut self, question: &str) -> Value {
        self.sp.oracle_cost();
        let answer = ORACLE_ANSWERS[self.random().index(ORACLE_ANSWERS.len())];
        self.emit(format!("[oracle] Q: {question}\n         A: {answer}"));
        Value::word(answer)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Self-modification
    // ══════════════════════════════════════════════════════════════════════

    fn exec_pray(&mut self, prayer: Prayer) -> Value {
        let rival = match prayer {
            Prayer::Speed => Some(Prayer::Safety),
            Prayer::Safety => Some(Prayer::Speed),
            _ => None,
        };
        if let Some(rival) = rival {
            if self.prayers.remove(&rival) {
                self.sp.adjust(-5, "indecisive prayer");
                return Value::Void;
            }
        }
        self.prayers.insert(prayer);
        match prayer {
            Prayer::Mercy => self.sp.mercy = true,
            Prayer::Chaos => self.sp.pray_for_chaos(),
            Prayer::Nothing => self.sp.pray_for_nothing(),
            Prayer::Speed | Prayer::Safety => {}
        }
        Value::Void
    }

    fn exec_no(&mut self, feature: &str) -> Value {
        let newly = self.banned.insert(feature.to_string());
        let completes_pair = feature == "feelings" || feature == "gambling";
        if newly && completes_pair && self.is_banned("feelings") && self.is_banned("gambling") {
            self.emit("[SanityLang] You must be fun at parties. +5 SP.");
            self.sp.no_fun_at_parties();
        }
        Value::Void
    }

    fn exec_i_am_okay(&mut self) -> Value {
        let angry = self
            .all_variables()
            .into_iter()
            .find(|(_, v)| v.borrow().mood == Mood::Angry)
            .map(|(name, _)| name);
        match angry {
            Some(name) => self.emit(format!("[SanityLang] No you're not. ({name} is still Angry)")),
            None => self.sp.i_am_okay(),
        }
        Value::Void
    }

    // ══════════════════════════════════════════════════════════════════════
    // Relationships
    // ══════════════════════════════════════════════════════════════════════

    fn exec_forgets_everyone(&mut self, name: &str) -> Value {
        let Some(var) = self.lookup(name) else {
            return Value::Void;
        };
        let bonds = std::mem::take(&mut var.borrow_mut().bonds);
        for bonded in bonds {
            if let Some(other) = self.lookup(&bonded) {
                if !Rc::ptr_eq(&other, &var) {
                    other.borrow_mut().bonds.retain(|n| n != name);
                }
            }
            self.graph.remove_edge(name, &bonded);
        }
        Value::Void
    }

    /// Unbind a variable, sending it (and a pinky partner) to the Afterlife.
    fn exec_delete(&mut self, name: &str) -> EvalResult<Value> {
        let Some(var) = self.lookup(name) else {
            return Ok(Value::Void);
        };
        self.send_to_afterlife(name, &var);
        self.env.borrow_mut().remove(name);

        let source = var.borrow().pinky_source.clone();
        if let Some(source) = source {
            if let Some(partner) = self.lookup(&source) {
                self.send_to_afterlife(&source, &partner);
                self.env.borrow_mut().remove(&source);
                self.graph.purge(&source);
                self.sp.pinky_break();
            }
        }

        let bonds = std::mem::take(&mut var.borrow_mut().bonds);
        for bonded in bonds {
            if let Some(other) = self.lookup(&bonded) {
                let mut o = other.borrow_mut();
                o.grief = 5;
                o.bonds.retain(|n| n != name);
                drop(o);
                self.sp.bond_broken();
            }
        }

        for haunted in self.graph.targets(Relation::Haunts, name) {
            if let Some(target) = self.lookup(&haunted) {
                self.change_mood(&target, Mood::Afraid)?;
                target.borrow_mut().grief = 100;
            }
        }

        self.graph.purge(name);
        if var.borrow().keyword == DeclKeyword::Ghost {
            self.ghost_count -= 1;
        }
        Ok(Value::Void)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Files
    // ══════════════════════════════════════════════════════════════════════

    fn exec_open(&mut self, path: &Expr, handle: &Ident) -> EvalResult<Value> {
        let path = self.eval_expr(path)?.to_string();
        let mut resolved = PathBuf::from(&path);
        if resolved.is_relative() {
            if let Some(dir) = self.sidecars.source().and_then(|s| s.parent()) {
                resolved = dir.join(resolved);
            }
        }
        let mut fh = FileHandle::new(resolved, handle.name.clone());
        fh.open()
            .map_err(|e| RuntimeError::io(format!("Failed to open '{path}': {e}")))?;
        if let Some(mut previous) = self.file_handles.insert(handle.name.clone(), fh) {
            previous.close();
        }
        tracing::debug!(handle = %handle.name, path = %path, "file opened");
        Ok(Value::Void)
    }

    fn exec_write(&mut self, content: &Expr, handle: &Ident, append: bool) -> EvalResult<Value> {
        let name = handle.name.as_str();
        let text = self.eval_expr(content)?.to_string();
        let cost = self.open_handle(name)?.sp_cost(BASE_IO_COST);
        let verb = if append { "append" } else { "write" };
        self.sp.file_io(cost, format!("{verb} {name}"));
        let Some(fh) = self.file_handles.get_mut(name) else {
            return Err(RuntimeError::io(format!("No open file handle '{name}'")));
        };
        let outcome = if append {
            fh.append(&text, self.rng.as_mut())
        } else {
            fh.write(&text, self.rng.as_mut())
        };
        let written =
            outcome.map_err(|e| RuntimeError::io(format!("Failed to {verb} '{name}': {e}")))?;
        if !written {
            tracing::warn!(handle = name, "angry handle refused to {verb}");
        }
        Ok(Value::Void)
    }
}

fn bind_sure(scope: &EnvRef, param: &Ident, value: Value) {
    let line = param.span.start_line;
    scope.borrow_mut().define(
        param.name.clone(),
        new_var(Variable::new(param.name.clone(), value, DeclKeyword::Sure, line)),
    );
}

fn or_none(text: &str) -> &str {
    if text.is_empty() {
        "none"
    } else {
        text
    }
}
