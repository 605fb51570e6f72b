//! The executor: owns every piece of runtime state and runs statements.
//!
//! Expression evaluation, calls, statements, loops and terminators are
//! split into sibling modules, each adding an `impl Executor` block.

use crate::afterlife::Afterlife;
use crate::chapters::ChapterRegistry;
use crate::config::ExecutorConfig;
use crate::env::{EnvRef, Environment, VarRef};
use crate::error::{EvalResult, ExecResult, Flow, RuntimeError};
use crate::events::EventTable;
use crate::files::FileHandle;
use crate::functions::FunctionRegistry;
use crate::persist::Sidecars;
use crate::relations::RelationshipGraph;
use crate::rng::{RandomSource, StdRandom};
use crate::sanity::SanityTracker;
use crate::stdlib::StdlibRegistry;
use sanity_types::ast::{PersonalityDef, Prayer, Stmt, Terminator};
use sanity_types::{Mood, Span, Trait, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Instant;

/// Statements kept for `rewind`.
pub const HISTORY_LIMIT: usize = 256;
/// Ghost tax and blessed bonus cadence.
const TAX_EVERY: u64 = 100;
/// Periodic sweep cadence.
const SWEEP_EVERY: u64 = 50;
/// Insane statements between value swaps.
const SWAP_EVERY: u32 = 20;
/// Graph degree that makes a variable Popular.
const POPULAR_DEGREE: usize = 5;

/// Runs SanityLang statements against mutable runtime state.
pub struct Executor {
    pub sp: SanityTracker,
    pub global: EnvRef,
    /// Scope statements currently run in.
    pub env: EnvRef,
    scope_counter: u64,
    /// Statements executed so far.
    pub stmt_counter: u64,
    history: VecDeque<Stmt>,

    pub afterlife: Afterlife,
    pub ghost_count: i64,
    pub graph: RelationshipGraph,
    pub functions: FunctionRegistry,
    pub events: EventTable,
    pub chapters: ChapterRegistry,
    pub personalities: BTreeMap<String, Rc<PersonalityDef>>,

    /// Foreshadowed event names and whether they were fulfilled.
    pub foreshadowed: BTreeMap<String, bool>,
    pub banned: BTreeSet<String>,
    pub grammar_aliases: BTreeMap<String, String>,
    pub grammar_removed: BTreeSet<String>,
    pub prayers: HashSet<Prayer>,
    pub active_curses: BTreeSet<String>,
    pub no_mood: bool,
    pub oops_count: u32,
    pub(crate) bet_losses: BTreeMap<String, u32>,
    pub(crate) jackpot_counts: HashMap<Span, u64>,
    pub(crate) ugh_quit_probability: f64,
    insanity_swap_counter: u32,
    pub(crate) stmt_cache: HashMap<Span, Value>,
    pub file_handles: BTreeMap<String, FileHandle>,

    pub(crate) sidecars: Sidecars,
    pub(crate) pending_dreams: BTreeMap<String, Value>,
    /// The dream sidecar was missing at load time; the first dream
    /// declaration earns the fresh-start bonus.
    pub(crate) fresh_dream: bool,

    /// Captured program output, one entry per emitted message.
    pub output: Vec<String>,
    echo: bool,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) stdlib: StdlibRegistry,
    pub(crate) started: Instant,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let rng = Box::new(StdRandom::new(config.seed));
        Self::with_random(config, rng)
    }

    /// Build an executor drawing every chance decision from `rng`.
    pub fn with_random(config: ExecutorConfig, rng: Box<dyn RandomSource>) -> Self {
        let flags = config.flags;
        let mut sp = SanityTracker::new(flags.initial_sp());
        sp.strict = flags.strict;
        sp.lenient = flags.lenient;
        sp.mercy = flags.pray;
        sp.audit = flags.audit;
        let global = Environment::global();
        Self {
            sp,
            env: Rc::clone(&global),
            global,
            scope_counter: 0,
            stmt_counter: 0,
            history: VecDeque::new(),
            afterlife: Afterlife::new(),
            ghost_count: 0,
            graph: RelationshipGraph::new(),
            functions: FunctionRegistry::new(),
            events: EventTable::new(),
            chapters: ChapterRegistry::new(),
            personalities: BTreeMap::new(),
            foreshadowed: BTreeMap::new(),
            banned: BTreeSet::new(),
            grammar_aliases: BTreeMap::new(),
            grammar_removed: BTreeSet::new(),
            prayers: HashSet::new(),
            active_curses: BTreeSet::new(),
            no_mood: flags.no_mood,
            oops_count: 0,
            bet_losses: BTreeMap::new(),
            jackpot_counts: HashMap::new(),
            ugh_quit_probability: 0.0,
            insanity_swap_counter: 0,
            stmt_cache: HashMap::new(),
            file_handles: BTreeMap::new(),
            sidecars: Sidecars::new(config.source_path),
            pending_dreams: BTreeMap::new(),
            fresh_dream: false,
            output: Vec::new(),
            echo: config.echo,
            rng,
            stdlib: StdlibRegistry::with_builtins(),
            started: Instant::now(),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Shared helpers
    // ══════════════════════════════════════════════════════════════════════

    pub fn random(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    pub fn new_scope_id(&mut self) -> u64 {
        self.scope_counter += 1;
        self.scope_counter
    }

    pub fn scope_id(&self) -> u64 {
        self.env.borrow().scope_id()
    }

    /// Truthiness in the current scope.
    pub fn truthy(&self, value: &Value) -> bool {
        value.is_truthy(self.scope_id())
    }

    /// Resolve a variable, marking it used.
    pub fn lookup(&self, name: &str) -> Option<VarRef> {
        self.env.borrow_mut().get(name)
    }

    pub fn all_variables(&self) -> BTreeMap<String, VarRef> {
        self.env.borrow().all_variables()
    }

    /// Record a line of program output.
    pub fn emit(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{line}");
        }
        self.output.push(line);
    }

    pub(crate) fn moods_enabled(&self) -> bool {
        !self.no_mood && !self.banned.contains("feelings")
    }

    pub(crate) fn is_banned(&self, feature: &str) -> bool {
        self.banned.contains(feature)
    }

    /// Run `f` with `env` as the current scope, restoring the previous
    /// scope afterwards whatever `f` returns.
    pub(crate) fn in_scope<T>(&mut self, env: EnvRef, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.env, env);
        let out = f(self);
        self.env = saved;
        out
    }

    pub(crate) fn child_scope(&mut self) -> EnvRef {
        let id = self.new_scope_id();
        Environment::child(&self.env, id)
    }

    pub(crate) fn write_blame(&mut self, message: &str) {
        if let Err(err) = self.sidecars.append_blame(message) {
            tracing::warn!(error = %err, "could not write blame log");
        }
    }

    pub(crate) fn send_to_afterlife(&mut self, name: &str, var: &VarRef) {
        let v = var.borrow();
        self.afterlife.send(name, v.value.clone(), v.mood, v.scars);
    }

    /// Charge the trust-zero penalty when `lose_trust` reported it.
    pub(crate) fn lose_trust(&mut self, var: &VarRef, amount: i64) {
        let hit_zero = var.borrow_mut().lose_trust(amount);
        if hit_zero {
            self.sp.trust_zero();
        }
    }

    // ── Moods & traits ──

    /// Set a mood directly and fire the variable's `mood` event.
    pub(crate) fn change_mood(&mut self, var: &VarRef, mood: Mood) -> EvalResult<()> {
        let name = {
            let mut v = var.borrow_mut();
            v.mood = mood;
            v.mood_set_at = self.stmt_counter;
            v.name.clone()
        };
        self.fire_event(&name, &format!("mood {mood}"))
    }

    /// Set a mood, propagating it one hop through bonds. Elder variables
    /// are immune.
    pub(crate) fn set_mood(&mut self, var: &VarRef, mood: Mood) -> EvalResult<()> {
        if var.borrow().is_elder() {
            return Ok(());
        }
        let bonds = var.borrow().bonds.clone();
        self.change_mood(var, mood)?;
        for bonded in bonds {
            let Some(other) = self.lookup(&bonded) else {
                continue;
            };
            if Rc::ptr_eq(&other, var) {
                continue;
            }
            let mut o = other.borrow_mut();
            if o.mood != mood && !o.is_elder() {
                o.mood = mood;
                o.mood_set_at = self.stmt_counter;
            }
        }
        Ok(())
    }

    /// Add a trait, applying trait interactions and one-hop propagation.
    pub(crate) fn gain_trait(&mut self, var: &VarRef, t: Trait) {
        {
            let mut v = var.borrow_mut();
            if t == Trait::Cursed && v.has_trait(Trait::Blessed) {
                drop(v);
                self.sp.trait_conflict();
                return;
            }
            if t == Trait::Blessed {
                v.traits.remove(&Trait::Cursed);
            }
            v.traits.insert(t);
            if v.has_trait(Trait::Elder) {
                v.traits.remove(&Trait::Tired);
            }
        }
        let bonds = var.borrow().bonds.clone();
        for bonded in bonds {
            let Some(other) = self.lookup(&bonded) else {
                continue;
            };
            if Rc::ptr_eq(&other, var) {
                continue;
            }
            let mut o = other.borrow_mut();
            if o.has_trait(t) || o.has_trait(Trait::Paranoid) {
                continue;
            }
            o.traits.insert(t);
            if o.has_trait(Trait::Elder) {
                o.traits.remove(&Trait::Tired);
            }
            if o.has_trait(Trait::Blessed) {
                o.traits.remove(&Trait::Cursed);
            }
        }
    }

    // ── Events ──

    /// Run every listener for `target`'s `event`, then the `any` listeners.
    pub(crate) fn fire_event(&mut self, target: &str, event: &str) -> EvalResult<()> {
        let listeners = self.events.matching(target, event);
        for listener in listeners {
            tracing::debug!(target, event, "event fired");
            self.in_scope(listener.env, |this| this.exec_block(&listener.body))?;
        }
        Ok(())
    }

    fn fire_threshold_events(&mut self) -> EvalResult<()> {
        for (old, new) in self.sp.take_crossings() {
            for threshold in self.events.crossed_thresholds(old, new) {
                self.fire_event("sp", &format!("crosses {threshold}"))?;
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statement pipeline
    // ══════════════════════════════════════════════════════════════════════

    /// Execute one statement: periodic upkeep, dispatch, mirror sync,
    /// threshold events, then terminators.
    pub fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        self.stmt_counter += 1;
        self.remember_statement(stmt);
        tracing::trace!(counter = self.stmt_counter, line = stmt.span.start_line, "statement");

        if self.stmt_counter % TAX_EVERY == 0 {
            self.collect_taxes();
        }
        if self.stmt_counter % SWEEP_EVERY == 0 {
            self.sweep();
        }
        if self.sp.insanity_mode() {
            self.insanity_swap();
        }

        if stmt.terminators.contains(&Terminator::Cache) {
            if let Some(pinned) = self.stmt_cache.get(&stmt.span) {
                return Ok(Flow::Normal(pinned.clone()));
            }
        }

        let value = match self.dispatch(stmt)? {
            Flow::Normal(v) => v,
            signal => return Ok(signal),
        };

        self.sync_mirrors();
        self.fire_threshold_events()?;

        let auto;
        let terminators: &[Terminator] = if stmt.terminators.is_empty() && !stmt.has_block() {
            auto = [self.sp.auto_terminator()];
            &auto
        } else {
            &stmt.terminators
        };
        let value = self.apply_terminators(stmt.span, value, terminators);
        Ok(Flow::Normal(value))
    }

    fn remember_statement(&mut self, stmt: &Stmt) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(stmt.clone());
    }

    /// The most recent `count` statements before the current one.
    pub(crate) fn recent_statements(&self, count: usize) -> Vec<Stmt> {
        let before_current = self.history.len().saturating_sub(1);
        let start = before_current.saturating_sub(count);
        self.history
            .iter()
            .skip(start)
            .take(before_current - start)
            .cloned()
            .collect()
    }

    fn collect_taxes(&mut self) {
        if self.ghost_count > 0 {
            self.sp.ghost_tax(self.ghost_count);
        }
        let blessed = self
            .all_variables()
            .values()
            .filter(|v| v.borrow().has_trait(Trait::Blessed))
            .count();
        for _ in 0..blessed {
            self.sp.blessed_bonus();
        }
    }

    /// Lifecycle upkeep over every visible variable.
    fn sweep(&mut self) {
        let now = self.stmt_counter;
        for (name, var) in self.all_variables() {
            {
                let mut v = var.borrow_mut();
                v.check_mutation(self.rng.as_mut());
                v.check_mood_decay(now);
                v.check_sad_from_neglect(now);
                if v.observed && now.saturating_sub(v.last_accessed) >= 200 {
                    v.observed = false;
                }
            }
            let degree = self.graph.degree(&name);
            let (popular, lonely, idle) = {
                let v = var.borrow();
                (
                    v.has_trait(Trait::Popular),
                    v.has_trait(Trait::Lonely),
                    now.saturating_sub(v.last_accessed),
                )
            };
            if degree >= POPULAR_DEGREE && !popular {
                self.gain_trait(&var, Trait::Popular);
            }
            if degree == 0 && idle >= 100 && !lonely {
                self.gain_trait(&var, Trait::Lonely);
            }
            let mut v = var.borrow_mut();
            if v.has_trait(Trait::Popular) {
                v.trust = (v.trust + 1).min(100);
            }
            if v.has_trait(Trait::Lonely) {
                v.trust = (v.trust - 1).max(0);
                if v.mood == Mood::Neutral {
                    v.mood = Mood::Sad;
                    v.mood_set_at = now;
                }
            }
        }
    }

    /// Every 20th insane statement, two random variables sharing a graph
    /// edge trade values.
    fn insanity_swap(&mut self) {
        self.insanity_swap_counter += 1;
        if self.insanity_swap_counter < SWAP_EVERY {
            return;
        }
        self.insanity_swap_counter = 0;
        let vars = self.all_variables();
        if vars.len() < 2 {
            return;
        }
        let names: Vec<&String> = vars.keys().collect();
        let i = self.rng.index(names.len());
        let mut j = self.rng.index(names.len() - 1);
        if j >= i {
            j += 1;
        }
        let (a, b) = (names[i], names[j]);
        if !self.graph.has_edge(a, b) {
            return;
        }
        let (va, vb) = (&vars[a], &vars[b]);
        if Rc::ptr_eq(va, vb) {
            return;
        }
        tracing::debug!(a = %a, b = %b, "insanity swap");
        std::mem::swap(&mut va.borrow_mut().value, &mut vb.borrow_mut().value);
    }

    /// Apply last statement's armed mirror values, then arm new ones.
    fn sync_mirrors(&mut self) {
        for (mirrorer, value) in self.graph.take_pending_mirrors() {
            if let Some(var) = self.lookup(&mirrorer) {
                var.borrow_mut().value = value;
            }
        }
        for (mirrorer, target) in self.graph.mirror_pairs() {
            if let Some(source) = self.lookup(&target) {
                let value = source.borrow().value.clone();
                self.graph.arm_mirror(&mirrorer, value);
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Variable reads
    // ══════════════════════════════════════════════════════════════════════

    /// Read a variable through every access rule.
    pub fn read_variable(&mut self, name: &str) -> EvalResult<Value> {
        let var = self
            .lookup(name)
            .ok_or_else(|| RuntimeError::undefined_variable(name))?;
        {
            let v = var.borrow();
            if v.keyword == sanity_types::ast::DeclKeyword::Ghost {
                return Err(RuntimeError::undefined(format!(
                    "Variable '{name}' is a ghost. Use séance to access it."
                )));
            }
            if v.keyword == sanity_types::ast::DeclKeyword::Whisper
                && !self.env.borrow().has_local(name)
            {
                return Ok(Value::Void);
            }
        }
        var.borrow_mut().record_access(self.stmt_counter);

        for envied in self.graph.targets(crate::relations::Relation::Envies, name) {
            if let Some(target) = self.lookup(&envied) {
                let target_value = target.borrow().value.as_number();
                converge(&var, target_value);
            }
        }

        let jealous = {
            let v = var.borrow();
            v.mood == Mood::Jealous && v.observed
        };
        if jealous {
            let shadow = self.env.borrow().shadowed(name);
            if let Some(shadow) = shadow {
                if !Rc::ptr_eq(&shadow, &var) {
                    let shadow_value = shadow.borrow().value.as_number();
                    converge(&var, shadow_value);
                }
            }
        }

        {
            let mut v = var.borrow_mut();
            if v.grief > 0 {
                v.grief -= 1;
                return Ok(Value::Void);
            }
        }
        let (trust, unlucky, uncertain_previous) = {
            let v = var.borrow();
            let previous = if v.is_uncertain { v.previous_value.clone() } else { None };
            (v.trust, v.has_trait(Trait::Unlucky), previous)
        };
        if trust <= 0 && self.rng.chance(0.2) {
            return Ok(Value::Void);
        }
        if unlucky && self.rng.chance(0.1) {
            return Ok(Value::Void);
        }
        if let Some(previous) = uncertain_previous {
            if self.rng.chance(0.15) {
                return Ok(previous);
            }
        }
        let value = var.borrow().value.clone();
        Ok(value)
    }
}

/// Move a numeric variable 10% of the way towards `target`.
fn converge(var: &VarRef, target: Option<f64>) {
    let Some(target) = target else {
        return;
    };
    let mut v = var.borrow_mut();
    if let Value::Number(n) = &mut v.value {
        *n += (target - *n) * 0.1;
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("sp", &self.sp.sp())
            .field("stmt_counter", &self.stmt_counter)
            .field("ghost_count", &self.ghost_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRandom;
    use sanity_types::ast::{Block, StmtKind};

    fn quiet() -> Executor {
        Executor::with_random(ExecutorConfig::default(), Box::new(FixedRandom(0.99)))
    }

    #[test]
    fn recent_statements_exclude_the_current_one() {
        let mut exec = quiet();
        for line in 1..=3 {
            let stmt = Stmt::new(StmtKind::Vibe(Block::default()), Span::line(line))
                .with_terminators(vec![Terminator::Normal]);
            exec.remember_statement(&stmt);
        }
        let recent = exec.recent_statements(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].span.start_line, 1);
    }

    #[test]
    fn scope_ids_increase() {
        let mut exec = quiet();
        let a = exec.new_scope_id();
        let b = exec.new_scope_id();
        assert!(b > a);
    }
}
