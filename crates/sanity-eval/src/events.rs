//! `when` listeners, keyed by `"target:event"`.

use crate::env::EnvRef;
use sanity_types::ast::Block;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Target that matches every variable.
pub const ANY_TARGET: &str = "any";

#[derive(Debug, Clone)]
pub struct Listener {
    pub body: Rc<Block>,
    /// Scope the `when` statement ran in.
    pub env: EnvRef,
}

#[derive(Debug, Default)]
pub struct EventTable {
    listeners: BTreeMap<String, Vec<Listener>>,
}

pub fn event_key(target: &str, event: &str) -> String {
    format!("{target}:{event}")
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: &str, event: &str, listener: Listener) {
        self.listeners
            .entry(event_key(target, event))
            .or_default()
            .push(listener);
    }

    /// Listeners for `target`'s `event`, followed by wildcard listeners.
    pub fn matching(&self, target: &str, event: &str) -> Vec<Listener> {
        let mut out: Vec<Listener> = self
            .listeners
            .get(&event_key(target, event))
            .cloned()
            .unwrap_or_default();
        if target != ANY_TARGET {
            if let Some(any) = self.listeners.get(&event_key(ANY_TARGET, event)) {
                out.extend(any.iter().cloned());
            }
        }
        out
    }

    /// `crosses N` thresholds registered on `sp` that lie in the half-open
    /// interval `(min(old, new), max(old, new)]`.
    pub fn crossed_thresholds(&self, old: i64, new: i64) -> Vec<i64> {
        let (lo, hi) = if old < new { (old, new) } else { (new, old) };
        let prefix = event_key("sp", "crosses ");
        self.listeners
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|n| n.parse::<i64>().ok())
            .filter(|n| lo < *n && *n <= hi)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
