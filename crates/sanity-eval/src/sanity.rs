//! Sanity Points: the global resource every construct draws on.
//!
//! All SP writes go through [`SanityTracker::set_sp`], which applies the
//! lenient floor, records audit entries and queues threshold crossings. The
//! catalog methods below are the only way the executor charges or rewards
//! SP; each one names its audit reason.

use std::fmt;

/// SP at or below this value is insanity mode.
pub const INSANITY_THRESHOLD: i64 = 0;

/// Floor applied under `--lenient`.
pub const LENIENT_FLOOR: i64 = 10;

const REPORT_WIDTH: usize = 60;

/// One recorded SP change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub reason: String,
    pub delta: i64,
    pub sp: i64,
}

/// Callback invoked with `(old, new)` whenever SP crosses a multiple of 10.
pub type ThresholdListener = Box<dyn FnMut(i64, i64)>;

pub struct SanityTracker {
    sp: i64,
    /// Double every penalty.
    pub strict: bool,
    /// Never drop below [`LENIENT_FLOOR`].
    pub lenient: bool,
    /// Halve every penalty (after strict doubling).
    pub mercy: bool,
    pub audit: bool,
    /// Set once a program starts running; some costs double.
    pub is_runtime: bool,
    listeners: Vec<ThresholdListener>,
    crossings: Vec<(i64, i64)>,
    audit_log: Vec<AuditEntry>,
    audit_context: Option<String>,
}

impl fmt::Debug for SanityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanityTracker")
            .field("sp", &self.sp)
            .field("strict", &self.strict)
            .field("lenient", &self.lenient)
            .field("mercy", &self.mercy)
            .field("audit", &self.audit)
            .field("is_runtime", &self.is_runtime)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for SanityTracker {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SanityTracker {
    pub fn new(initial: i64) -> Self {
        Self {
            sp: initial,
            strict: false,
            lenient: false,
            mercy: false,
            audit: false,
            is_runtime: false,
            listeners: Vec::new(),
            crossings: Vec::new(),
            audit_log: Vec::new(),
            audit_context: None,
        }
    }

    pub fn sp(&self) -> i64 {
        self.sp
    }

    pub fn insanity_mode(&self) -> bool {
        self.sp <= INSANITY_THRESHOLD
    }

    /// Terminator a simple statement gets when it carries none.
    pub fn auto_terminator(&self) -> sanity_types::ast::Terminator {
        use sanity_types::ast::Terminator;
        if self.sp > 80 {
            Terminator::Normal
        } else if self.sp >= 50 {
            Terminator::Debug
        } else if self.sp >= 20 {
            Terminator::Uncertain
        } else {
            Terminator::Forceful
        }
    }

    pub fn add_listener(&mut self, listener: ThresholdListener) {
        self.listeners.push(listener);
    }

    /// Threshold crossings since the last call, oldest first.
    pub fn take_crossings(&mut self) -> Vec<(i64, i64)> {
        std::mem::take(&mut self.crossings)
    }

    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    /// Write SP through the lenient floor, the audit log and the
    /// threshold listeners.
    pub fn set_sp(&mut self, value: i64) {
        let old = self.sp;
        self.sp = value;
        if self.lenient && self.sp < LENIENT_FLOOR {
            self.sp = LENIENT_FLOOR;
        }
        if self.audit && self.sp != old {
            let reason = self
                .audit_context
                .take()
                .unwrap_or_else(|| "direct SP change".to_string());
            self.audit_log.push(AuditEntry {
                reason,
                delta: self.sp - old,
                sp: self.sp,
            });
        }
        if old.div_euclid(10) != self.sp.div_euclid(10) {
            self.crossings.push((old, self.sp));
            for listener in &mut self.listeners {
                listener(old, self.sp);
            }
        }
    }

    /// Scale a change by the global modifiers. Only penalties are scaled.
    pub fn modifier(&self, amount: i64) -> i64 {
        let mut amount = amount;
        if amount < 0 {
            if self.strict {
                amount *= 2;
            }
            if self.mercy {
                amount = amount.div_euclid(2);
            }
        }
        amount
    }

    /// Apply a catalog change: modifiers, then [`set_sp`](Self::set_sp).
    pub fn apply(&mut self, delta: i64, reason: impl Into<String>) {
        let reason = reason.into();
        let delta = self.modifier(delta);
        tracing::debug!(delta, reason = %reason, sp = self.sp + delta, "sp change");
        self.audit_context = Some(reason);
        self.set_sp(self.sp + delta);
    }

    /// Unmodified change through the setter (prayer conflicts, zen).
    pub fn adjust(&mut self, delta: i64, reason: impl Into<String>) {
        self.audit_context = Some(reason.into());
        self.set_sp(self.sp + delta);
    }

    /// Raw write that skips the floor, listeners and audit log.
    fn set_direct(&mut self, value: i64, reason: String) {
        tracing::debug!(sp = value, reason = %reason, "sp reset");
        self.audit_context = Some(reason);
        self.sp = value;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Catalog
    // ══════════════════════════════════════════════════════════════════════

    pub fn single_char_name(&mut self) {
        self.apply(-5, "single-char variable name");
    }

    pub fn long_name(&mut self) {
        self.apply(-2, "verbose variable name (>20 chars)");
    }

    pub fn override_sure(&mut self) {
        self.apply(-10, "overriding 'sure' variable");
    }

    pub fn whatever_declaration(&mut self) {
        let cost = if self.is_runtime { -6 } else { -3 };
        self.apply(cost, "'whatever' declaration");
    }

    pub fn first_function_call(&mut self) {
        self.apply(1, "first function call");
    }

    pub fn repetition_penalty(&mut self) {
        self.apply(-1, "function repetition (10+ calls)");
    }

    pub fn useless_cope(&mut self) {
        self.apply(-5, "useless cope block");
    }

    pub fn pinky_break(&mut self) {
        self.apply(-15, "pinky bond broken");
    }

    pub fn seance_use(&mut self) {
        self.apply(-5, "séance invocation");
    }

    pub fn seance_ghost(&mut self) {
        self.apply(-8, "séance on ghost variable");
    }

    pub fn trait_conflict(&mut self) {
        self.apply(-3, "trait conflict");
    }

    pub fn bet_win(&mut self, reward: i64) {
        self.apply(reward, format!("bet won (+{reward})"));
    }

    pub fn bet_lose(&mut self, risk: i64) {
        self.apply(-risk, format!("bet lost (-{risk})"));
    }

    pub fn trust_zero(&mut self) {
        let cost = if self.is_runtime { -16 } else { -8 };
        self.apply(cost, "variable trust reached 0");
    }

    pub fn skip_arc(&mut self) {
        self.apply(-10, "skipped narrative arc");
    }

    pub fn enter_scope(&mut self) {
        self.apply(1, "entered scope");
    }

    pub fn wasted_scope(&mut self) {
        self.apply(-4, "wasted scope (no vars used)");
    }

    pub fn dream_fulfilled(&mut self) {
        self.apply(5, "dream variable fulfilled");
    }

    pub fn curse_declaration(&mut self) {
        let cost = if self.is_runtime { -40 } else { -20 };
        self.apply(cost, "curse declaration");
    }

    pub fn bond_formed(&mut self) {
        self.apply(2, "emotional bond formed");
    }

    pub fn bond_broken(&mut self) {
        self.apply(-7, "emotional bond broken");
    }

    pub fn void_truthiness_check(&mut self) {
        self.apply(-1, "void truthiness check");
    }

    pub fn ambiguous_precedence(&mut self) {
        self.apply(-2, "ambiguous whitespace precedence");
    }

    pub fn oops_penalty(&mut self) {
        self.apply(-2, "oops warning");
    }

    pub fn yolo_swallow(&mut self) {
        self.apply(-5, "yolo error swallow");
    }

    pub fn oracle_cost(&mut self) {
        self.apply(-3, "oracle query");
    }

    pub fn exorcise_cost(&mut self) {
        self.apply(-25, "exorcise curse");
    }

    pub fn proactive_exorcise(&mut self) {
        self.apply(5, "proactive exorcise (no curse)");
    }

    pub fn ghost_tax(&mut self, ghosts: i64) {
        self.apply(-ghosts, format!("ghost tax ({ghosts} ghosts)"));
    }

    pub fn should_not_called(&mut self) {
        self.apply(-5, "'should' function never called");
    }

    pub fn unfulfilled_foreshadow(&mut self) {
        self.apply(-5, "unfulfilled foreshadow");
    }

    pub fn hopefully_bonus(&mut self) {
        self.apply(1, "hopefully loop iteration");
    }

    pub fn hopefully_penalty(&mut self) {
        self.apply(-2, "hopefully loop past 100");
    }

    pub fn pray_for_nothing(&mut self) {
        self.apply(1, "pray for nothing");
    }

    pub fn no_fun_at_parties(&mut self) {
        self.apply(5, "no fun at parties bonus");
    }

    pub fn jackpot_win(&mut self) {
        self.apply(50, "JACKPOT!");
    }

    pub fn fresh_dream_start(&mut self) {
        self.apply(5, "fresh dream start");
    }

    pub fn import_from_ally(&mut self) {
        self.apply(3, "import from ally chapter");
    }

    pub fn blessed_bonus(&mut self) {
        self.apply(1, "blessed variable bonus");
    }

    pub fn file_unclosed(&mut self) {
        self.apply(-5, "unclosed file handle");
    }

    /// Reading or writing a file: `base + ceil(log2(KiB + 1))`.
    pub fn file_io(&mut self, cost: i64, reason: impl Into<String>) {
        self.apply(-cost, reason);
    }

    // ── Direct setters ──

    pub fn i_am_okay(&mut self) {
        self.set_direct(50, "i am okay (SP reset)".to_string());
    }

    pub fn reset(&mut self, value: i64) {
        self.set_direct(value, format!("SP reset to {value}"));
    }

    pub fn pray_for_chaos(&mut self) {
        self.set_direct(0, "pray for chaos (insanity mode)".to_string());
    }

    // ══════════════════════════════════════════════════════════════════════
    // Audit Report
    // ══════════════════════════════════════════════════════════════════════

    pub fn audit_report(&self) -> String {
        if self.audit_log.is_empty() {
            return "[Audit] No SP changes recorded.".to_string();
        }
        let heavy = "═".repeat(REPORT_WIDTH);
        let mut lines = vec![
            String::new(),
            heavy.clone(),
            "  SP AUDIT REPORT".to_string(),
            heavy.clone(),
        ];
        let mut gains = 0;
        let mut losses = 0;
        for entry in &self.audit_log {
            let (marker, sign) = if entry.delta > 0 { ("▲", "+") } else { ("▼", "") };
            lines.push(format!(
                "  {marker} {sign}{:>4}  → SP {:>4}  │ {}",
                entry.delta, entry.sp, entry.reason
            ));
            if entry.delta > 0 {
                gains += entry.delta;
            } else {
                losses += entry.delta.abs();
            }
        }
        lines.push("─".repeat(REPORT_WIDTH));
        lines.push(format!("  Total gains:  +{gains}"));
        lines.push(format!("  Total losses: -{losses}"));
        lines.push(format!("  Net change:   {:+}", gains - losses));
        lines.push(format!("  Final SP:     {}", self.sp));
        lines.push(format!("  Events:       {}", self.audit_log.len()));
        if self.insanity_mode() {
            lines.push("  ⚠  INSANITY MODE ACTIVE".to_string());
        }
        lines.push(heavy);
        lines.join("\n")
    }
}
