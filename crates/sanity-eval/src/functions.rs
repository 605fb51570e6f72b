//! Function table: declarations with their closure scopes, call counters,
//! `did` memo caches and `..`-pinned results.

use crate::env::EnvRef;
use sanity_types::ast::{FuncDecl, FuncKeyword};
use sanity_types::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

/// Entries a `did` cache holds before the oldest is evicted.
pub const MEMO_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub decl: Rc<FuncDecl>,
    /// Scope the declaration was evaluated in.
    pub closure: EnvRef,
}

#[derive(Debug, Default)]
struct MemoCache {
    entries: BTreeMap<String, Value>,
    order: VecDeque<String>,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    defs: BTreeMap<String, FunctionDef>,
    calls: BTreeMap<String, u64>,
    memo: BTreeMap<String, MemoCache>,
    pinned: BTreeMap<String, Value>,
    /// Functions whose first call has just returned and not yet been
    /// consumed by a declaration or assignment.
    first_call: BTreeSet<String>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, def: FunctionDef) {
        self.defs.insert(name.to_string(), def);
    }

    pub fn get(&self, name: &str) -> Option<FunctionDef> {
        self.defs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FunctionDef> {
        self.defs.remove(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.defs.keys().cloned().collect()
    }

    /// Names declared with `keyword`.
    pub fn with_keyword(&self, keyword: FuncKeyword) -> Vec<String> {
        self.defs
            .iter()
            .filter(|(_, def)| def.decl.keyword == keyword)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The registered `Owner.method` name for an instance of `owner`.
    pub fn find_method(&self, owner: &str, method: &str) -> Option<String> {
        let qualified = format!("{owner}.{method}");
        self.defs.contains_key(&qualified).then_some(qualified)
    }

    // ── Call counting ──

    pub fn bump_calls(&mut self, name: &str) -> u64 {
        let count = self.calls.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn calls(&self, name: &str) -> u64 {
        self.calls.get(name).copied().unwrap_or(0)
    }

    pub fn reset_calls(&mut self, name: &str) {
        self.calls.remove(name);
    }

    // ── Memoization ──

    pub fn memo_get(&self, name: &str, key: &str) -> Option<Value> {
        self.memo.get(name).and_then(|cache| cache.entries.get(key)).cloned()
    }

    /// Store a result. When the cache overflows, the evicted `(key, value)`
    /// is returned.
    pub fn memo_store(&mut self, name: &str, key: String, value: Value) -> Option<(String, Value)> {
        let cache = self.memo.entry(name.to_string()).or_default();
        if cache.entries.insert(key.clone(), value).is_none() {
            cache.order.push_back(key);
        }
        if cache.order.len() > MEMO_CAPACITY {
            let oldest = cache.order.pop_front()?;
            let evicted = cache.entries.remove(&oldest)?;
            return Some((oldest, evicted));
        }
        None
    }

    pub fn memo_len(&self, name: &str) -> usize {
        self.memo.get(name).map_or(0, |cache| cache.entries.len())
    }

    // ── Pinned results ──

    pub fn pin(&mut self, name: &str, value: Value) {
        self.pinned.insert(name.to_string(), value);
    }

    pub fn pinned(&self, name: &str) -> Option<Value> {
        self.pinned.get(name).cloned()
    }

    // ── First calls ──

    pub fn mark_first_call(&mut self, name: &str) {
        self.first_call.insert(name.to_string());
    }

    /// Consume the first-call marker for `name`.
    pub fn take_first_call(&mut self, name: &str) -> bool {
        self.first_call.remove(name)
    }
}
