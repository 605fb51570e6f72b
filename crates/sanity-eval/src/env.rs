//! Lexical scopes.
//!
//! Scopes form a parent-linked chain of shared, mutable frames. Variable
//! slots are themselves shared so that closures can capture `scream`
//! variables live while copying everything else.

use crate::variable::Variable;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub type VarRef = Rc<RefCell<Variable>>;
pub type EnvRef = Rc<RefCell<Environment>>;

/// Declarations within this many lines of each other may bond.
const BOND_DISTANCE: u32 = 3;

#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<EnvRef>,
    scope_id: u64,
    vars: BTreeMap<String, VarRef>,
    used: BTreeSet<String>,
    decl_order: Vec<(String, u32)>,
}

pub fn new_var(var: Variable) -> VarRef {
    Rc::new(RefCell::new(var))
}

impl Environment {
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn child(parent: &EnvRef, scope_id: u64) -> EnvRef {
        Rc::new(RefCell::new(Self {
            parent: Some(Rc::clone(parent)),
            scope_id,
            ..Self::default()
        }))
    }

    pub fn scope_id(&self) -> u64 {
        self.scope_id
    }

    pub fn parent(&self) -> Option<EnvRef> {
        self.parent.clone()
    }

    pub fn define(&mut self, name: impl Into<String>, var: VarRef) {
        let name = name.into();
        let line = var.borrow().decl_line;
        self.decl_order.push((name.clone(), line));
        self.vars.insert(name, var);
    }

    /// Resolve a name through the scope chain, marking it used in the
    /// scope that owns it.
    pub fn get(&mut self, name: &str) -> Option<VarRef> {
        if let Some(var) = self.vars.get(name) {
            let var = Rc::clone(var);
            self.used.insert(name.to_string());
            return Some(var);
        }
        self.parent.as_ref().and_then(|p| p.borrow_mut().get(name))
    }

    /// Resolve without marking anything used.
    pub fn peek(&self, name: &str) -> Option<VarRef> {
        if let Some(var) = self.vars.get(name) {
            return Some(Rc::clone(var));
        }
        self.parent.as_ref().and_then(|p| p.borrow().peek(name))
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn local(&self, name: &str) -> Option<VarRef> {
        self.vars.get(name).cloned()
    }

    pub fn locals(&self) -> impl Iterator<Item = (&String, &VarRef)> {
        self.vars.iter()
    }

    pub fn has_locals(&self) -> bool {
        !self.vars.is_empty()
    }

    /// Whether any local was read since the scope opened.
    pub fn any_used(&self) -> bool {
        !self.used.is_empty()
    }

    /// Remove a binding from the nearest scope that holds it.
    pub fn remove(&mut self, name: &str) -> Option<VarRef> {
        if let Some(var) = self.vars.remove(name) {
            self.decl_order.retain(|(n, _)| n != name);
            self.used.remove(name);
            return Some(var);
        }
        self.parent.as_ref().and_then(|p| p.borrow_mut().remove(name))
    }

    /// Every visible binding; inner scopes shadow outer ones.
    pub fn all_variables(&self) -> BTreeMap<String, VarRef> {
        let mut out = self
            .parent
            .as_ref()
            .map(|p| p.borrow().all_variables())
            .unwrap_or_default();
        for (name, var) in &self.vars {
            out.insert(name.clone(), Rc::clone(var));
        }
        out
    }

    /// The nearest binding of `name` in an ancestor scope.
    pub fn shadowed(&self, name: &str) -> Option<VarRef> {
        self.parent.as_ref().and_then(|p| p.borrow().peek(name))
    }

    /// Pair up same-typed declarations made within three lines of each
    /// other. Bonds are recorded on both variables; only new pairs are
    /// returned.
    pub fn detect_bonds(&self) -> Vec<(String, String)> {
        let mut formed = Vec::new();
        for (i, (name_a, line_a)) in self.decl_order.iter().enumerate() {
            for (name_b, line_b) in &self.decl_order[i + 1..] {
                if name_a == name_b || line_a.abs_diff(*line_b) > BOND_DISTANCE {
                    continue;
                }
                let (Some(a), Some(b)) = (self.vars.get(name_a), self.vars.get(name_b)) else {
                    continue;
                };
                if Rc::ptr_eq(a, b) {
                    continue;
                }
                let mut a = a.borrow_mut();
                let mut b = b.borrow_mut();
                if !a.value.same_type(&b.value) || a.bonds.contains(name_b) {
                    continue;
                }
                a.bonds.push(name_b.clone());
                b.bonds.push(name_a.clone());
                formed.push((name_a.clone(), name_b.clone()));
            }
        }
        formed
    }
}
