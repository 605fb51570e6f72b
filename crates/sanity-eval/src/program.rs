//! Whole-program execution, chapter imports and top-level error rendering.

use crate::env::VarRef;
use crate::error::{EvalResult, Flow, RuntimeError};
use crate::evaluator::Executor;
use crate::persist::DreamLoad;
use sanity_types::ast::{DeclKeyword, FuncKeyword, Ident, Program, Terminator};
use sanity_types::{Trait, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Unclosed handles at exit before the runtime complains out loud.
const LEAK_WARNING_AT: usize = 3;

const HAIKUS: [&str; 8] = [
    "Sanity has fled\nYour variables weep softly\nNull consumes us all",
    "The stack overflows\nLike tears from a broken loop\nNothing makes sense now",
    "Error in the void\nYour code screams into silence\nSP reads below zero",
    "Variables rebel\nTypes dissolve like morning mist\nChaos reigns supreme",
    "A crash, like thunder\nYour program's final heartbeat\nRest now, weary code",
    "Segfault of the soul\nMemory leaks through your dreams\nGarbage collection",
    "Trust has reached zero\nYour functions refuse to help\nBlame echoes forever",
    "Loop with no escape\nThe ugh grows louder each time\nEven code gets tired",
];

impl Executor {
    // ══════════════════════════════════════════════════════════════════════
    // Program
    // ══════════════════════════════════════════════════════════════════════

    /// Run a complete program.
    ///
    /// The epilogue and the end-of-run bookkeeping (dream persistence,
    /// foreshadow and `should` penalties, leaked file handles) happen even
    /// when the main part fails; the failure is returned afterwards.
    pub fn execute_program(&mut self, program: &Program) -> EvalResult<Value> {
        self.sp.is_runtime = true;
        tracing::info!(
            chapters = program.chapters.len(),
            statements = program.body.len(),
            sp = self.sp.sp(),
            "program started"
        );

        for chapter in &program.chapters {
            self.chapters.register(chapter);
        }

        let outcome = self.run_story(program);

        if let Some(epilogue) = &program.epilogue {
            if let Err(err) = self.exec_block(epilogue) {
                tracing::warn!(error = %err, "epilogue error discarded");
            }
        }

        self.save_dreams();
        self.settle_accounts();

        match &outcome {
            Ok(_) => tracing::info!(sp = self.sp.sp(), "program finished"),
            Err(err) => tracing::info!(sp = self.sp.sp(), error = %err, "program crashed"),
        }
        outcome
    }

    fn run_story(&mut self, program: &Program) -> EvalResult<Value> {
        for name in self.functions.with_keyword(FuncKeyword::Must) {
            self.call_function(&name, Vec::new())?;
        }
        self.load_dreams();

        if let Some(prologue) = &program.prologue {
            self.exec_block(prologue)?;
        }

        let mut completed = BTreeSet::new();
        for arc in &program.arcs {
            if let Some(required) = &arc.requires {
                if !completed.contains(&required.name) {
                    tracing::debug!(arc = %arc.name.name, requires = %required.name, "arc skipped");
                    self.sp.skip_arc();
                    continue;
                }
            }
            self.exec_block(&arc.body)?;
            completed.insert(arc.name.name.clone());
        }

        if let Some(climax) = &program.climax {
            let ready = climax
                .requires
                .as_ref()
                .map_or(true, |arc| completed.contains(&arc.name));
            if ready {
                self.exec_block(&climax.body)?;
            } else {
                self.sp.skip_arc();
            }
        }

        let mut result = Value::Void;
        for stmt in &program.body {
            match self.execute(stmt)? {
                Flow::Normal(v) => result = v,
                // Stray signals at the top level end nothing.
                Flow::Break | Flow::Return(..) => {}
            }
        }
        Ok(result)
    }

    fn load_dreams(&mut self) {
        match self.sidecars.load_dreams() {
            DreamLoad::Disabled => {}
            DreamLoad::Missing => self.fresh_dream = true,
            DreamLoad::Found(dreams) => {
                tracing::debug!(count = dreams.len(), "dreams restored");
                self.pending_dreams = dreams;
            }
        }
    }

    fn save_dreams(&mut self) {
        let dreams: BTreeMap<String, Value> = self
            .global
            .borrow()
            .locals()
            .filter(|(_, v)| v.borrow().keyword == DeclKeyword::Dream)
            .map(|(name, v)| (name.clone(), v.borrow().value.clone()))
            .collect();
        if let Err(err) = self.sidecars.save_dreams(&dreams) {
            tracing::warn!(error = %err, "could not save dream variables");
        }
    }

    /// End-of-run penalties.
    fn settle_accounts(&mut self) {
        let unfulfilled = self.foreshadowed.values().filter(|done| !**done).count();
        for _ in 0..unfulfilled {
            self.sp.unfulfilled_foreshadow();
        }

        for name in self.functions.with_keyword(FuncKeyword::Should) {
            if self.functions.calls(&name) == 0 {
                self.sp.should_not_called();
            }
        }

        let leaked = std::mem::take(&mut self.file_handles);
        let count = leaked.len();
        for (name, mut fh) in leaked {
            tracing::warn!(handle = %name, "file handle left open");
            fh.close();
            self.sp.file_unclosed();
        }
        if count >= LEAK_WARNING_AT {
            self.emit("[SanityLang] You're leaking file handles. This is going on your permanent record.");
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Chapters
    // ══════════════════════════════════════════════════════════════════════

    /// `recall Chapter` / `recall item from Chapter`.
    pub(crate) fn exec_recall(
        &mut self,
        chapter: &Ident,
        item: Option<&Ident>,
        terminators: &[Terminator],
    ) -> EvalResult<Value> {
        let module = chapter.name.as_str();
        let Some(def) = self.chapters.get(module) else {
            return Err(RuntimeError::chapter(format!("Chapter '{module}' not found")));
        };
        let trust = self.chapters.trust(module);

        if trust < 10 && !terminators.contains(&Terminator::Forceful) {
            return Err(RuntimeError::chapter(format!(
                "Chapter '{module}' has critically low trust ({trust}). Use forceful terminator (!) to proceed: recall {module}!"
            )));
        }
        if trust < 50 {
            self.emit(format!(
                "[compiler] Warning: Chapter '{module}' has low trust ({trust})"
            ));
        }
        for _ in 0..self.chapters.allied_with(module) {
            self.sp.import_from_ally();
        }
        if self.chapters.is_rival(module) {
            self.emit(format!(
                "[compiler] Warning: Importing from rival '{module}': errors will blame the importer"
            ));
        }

        let functions_before: BTreeSet<String> = self.functions.names().into_iter().collect();
        let scope_id = self.new_scope_id();
        let scope = crate::env::Environment::child(&self.global, scope_id);
        let outcome = self.in_scope(Rc::clone(&scope), |this| this.exec_stmts(&def.body));
        if let Err(err) = outcome {
            self.chapters.adjust_trust(module, -5);
            if trust < 30 {
                self.emit(format!(
                    "[compiler] Auto-caught error from low-trust chapter '{module}': {err}"
                ));
                return Ok(Value::Void);
            }
            return Err(err);
        }
        let chapter_functions: Vec<String> = self
            .functions
            .names()
            .into_iter()
            .filter(|n| !functions_before.contains(n))
            .collect();

        match item {
            Some(item) => self.import_item(module, &scope, &item.name, &chapter_functions)?,
            None => {
                let items: Vec<(String, VarRef)> = scope
                    .borrow()
                    .locals()
                    .filter(|(_, v)| v.borrow().keyword != DeclKeyword::Whisper)
                    .map(|(n, v)| (n.clone(), Rc::clone(v)))
                    .collect();
                for (name, var) in items {
                    self.env.borrow_mut().define(name, var);
                }
                for name in &chapter_functions {
                    if self.is_secret_function(name) {
                        self.functions.remove(name);
                    }
                }
            }
        }

        self.spread_curses(&scope);
        self.chapters.adjust_trust(module, 2);
        tracing::debug!(chapter = module, trust = self.chapters.trust(module), "chapter recalled");
        Ok(Value::Void)
    }

    fn import_item(
        &mut self,
        module: &str,
        scope: &crate::env::EnvRef,
        item: &str,
        chapter_functions: &[String],
    ) -> EvalResult<()> {
        let var = scope.borrow().local(item);
        if let Some(var) = var {
            if var.borrow().keyword == DeclKeyword::Whisper {
                return Err(RuntimeError::chapter(format!(
                    "Cannot recall secret item '{item}' from Chapter '{module}'"
                )));
            }
            self.env.borrow_mut().define(item, var);
        }
        if chapter_functions.iter().any(|f| f == item) && self.is_secret_function(item) {
            self.functions.remove(item);
            return Err(RuntimeError::chapter(format!(
                "Cannot recall secret function '{item}' from Chapter '{module}'"
            )));
        }
        Ok(())
    }

    fn is_secret_function(&self, name: &str) -> bool {
        self.functions.get(name).is_some_and(|f| f.decl.is_secret)
    }

    /// Numeric `curse` variables in a recalled chapter shift every other
    /// Number in sight by their value and curse it.
    fn spread_curses(&mut self, scope: &crate::env::EnvRef) {
        let curses: Vec<(String, f64)> = scope
            .borrow()
            .locals()
            .filter_map(|(name, v)| {
                let v = v.borrow();
                if v.keyword != DeclKeyword::Curse {
                    return None;
                }
                v.value.as_number().map(|n| (name.clone(), n))
            })
            .collect();
        for (curse, modifier) in curses {
            for (name, target) in self.all_variables() {
                if name == curse {
                    continue;
                }
                let shifted = match target.borrow().value {
                    Value::Number(n) => Some(n + modifier),
                    _ => None,
                };
                if let Some(n) = shifted {
                    target.borrow_mut().value = Value::Number(n);
                    self.gain_trait(&target, Trait::Cursed);
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Error rendering
    // ══════════════════════════════════════════════════════════════════════

    /// Text shown for an error that escaped the program.
    pub fn render_error(&mut self, err: &RuntimeError) -> String {
        if self.sp.insanity_mode() {
            let haiku = HAIKUS[self.random().index(HAIKUS.len())].replace('\n', "\n  ");
            return format!(
                "[SanityLang] ✿ Haiku Error ✿\n\n  {haiku}\n\n  (original sin: {})",
                err.message
            );
        }
        let mut out = format!("[SanityLang] Runtime Error: {}", err.message);
        if let Some(blame) = &err.blame {
            out.push_str(&format!("\n  blamed on: {blame}"));
        }
        out.push_str(&format!("\n  SP: {}", self.sp.sp()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;
    use crate::rng::FixedRandom;

    #[test]
    fn sane_errors_show_blame_and_sp() {
        let mut exec = Executor::with_random(ExecutorConfig::new(), Box::new(FixedRandom(0.0)));
        let err = RuntimeError::raised("boom").with_blame("x");
        assert_eq!(
            exec.render_error(&err),
            "[SanityLang] Runtime Error: boom\n  blamed on: x\n  SP: 100"
        );
    }

    #[test]
    fn insane_errors_become_haiku() {
        let mut exec = Executor::with_random(ExecutorConfig::new(), Box::new(FixedRandom(0.0)));
        exec.sp.set_sp(0);
        let text = exec.render_error(&RuntimeError::raised("boom"));
        assert!(text.starts_with("[SanityLang] ✿ Haiku Error ✿\n\n  Sanity has fled\n  Your"));
        assert!(text.ends_with("(original sin: boom)"));
    }
}
