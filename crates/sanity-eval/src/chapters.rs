//! Chapters: named modules with a trust score and diplomatic ties.

use sanity_types::ast::ChapterDef;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub const DEFAULT_CHAPTER_TRUST: i64 = 70;
pub const MAX_CHAPTER_TRUST: i64 = 100;

#[derive(Debug, Default)]
pub struct ChapterRegistry {
    chapters: BTreeMap<String, Rc<ChapterDef>>,
    trust: BTreeMap<String, i64>,
    allies: BTreeMap<String, BTreeSet<String>>,
    rivals: BTreeMap<String, BTreeSet<String>>,
}

impl ChapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: &ChapterDef) {
        let name = def.name.name.clone();
        self.trust.insert(name.clone(), DEFAULT_CHAPTER_TRUST);
        self.allies.insert(
            name.clone(),
            def.allies.iter().map(|a| a.name.clone()).collect(),
        );
        self.rivals.insert(
            name.clone(),
            def.rivals.iter().map(|r| r.name.clone()).collect(),
        );
        self.chapters.insert(name, Rc::new(def.clone()));
    }

    pub fn get(&self, name: &str) -> Option<Rc<ChapterDef>> {
        self.chapters.get(name).cloned()
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.trust.contains_key(name)
    }

    pub fn trust(&self, name: &str) -> i64 {
        self.trust.get(name).copied().unwrap_or(DEFAULT_CHAPTER_TRUST)
    }

    /// Shift a known chapter's trust, clamped to `0..=100`.
    pub fn adjust_trust(&mut self, name: &str, delta: i64) {
        if let Some(t) = self.trust.get_mut(name) {
            *t = (*t + delta).clamp(0, MAX_CHAPTER_TRUST);
        }
    }

    /// How many chapters list `name` as an ally.
    pub fn allied_with(&self, name: &str) -> usize {
        self.allies.values().filter(|set| set.contains(name)).count()
    }

    /// Whether any chapter lists `name` as a rival.
    pub fn is_rival(&self, name: &str) -> bool {
        self.rivals.values().any(|set| set.contains(name))
    }
}
