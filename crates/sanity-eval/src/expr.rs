//! Expression evaluation.

use crate::env::{Environment, VarRef};
use crate::error::{EvalResult, RuntimeError};
use crate::evaluator::Executor;
use crate::functions::FunctionDef;
use crate::relations::Relation;
use sanity_types::ast::{
    BinOp, CmpOp, EmotionOp, Expr, ExprKind, Ident, LogicalOp, StmtKind, Truth, UnaryOp,
};
use sanity_types::{
    coerce, loose_equal, strict_equal, vibes_equal, Mood, Trait, Value, PERSONALITY_FIELD,
};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

impl Executor {
    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::WordLit(text) => Ok(Value::Word(self.interpolate(text))),
            ExprKind::TruthLit(t) => Ok(match t {
                Truth::Yep => Value::Yep,
                Truth::Nope => Value::Nope,
                Truth::Dunno => Value::Dunno,
            }),
            ExprKind::VoidLit => Ok(Value::Void),
            ExprKind::ListLit(items) => {
                let values = items
                    .iter()
                    .map(|e| self.eval_expr(e))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::List(values))
            }
            ExprKind::BlobLit(fields) => {
                let mut out = BTreeMap::new();
                for (key, value) in fields {
                    out.insert(key.name.clone(), self.eval_expr(value)?);
                }
                Ok(Value::Blob(out))
            }

            ExprKind::Identifier(id) => self.read_variable(&id.name),
            ExprKind::Member { object, member } => self.eval_member(object, member),
            ExprKind::Index { object, index } => self.eval_index(object, index),

            ExprKind::Binary {
                left,
                op,
                right,
                left_spaces,
                right_spaces,
            } => self.eval_binary(left, *op, right, *left_spaces, *right_spaces),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Comparison { left, op, right } => self.eval_comparison(left, *op, right),
            ExprKind::Logical { left, op, right } => self.eval_logical(left, *op, right),
            ExprKind::Emotional { left, op, right } => self.eval_emotional(left, *op, right),

            ExprKind::Call { callee, args } => self.eval_call(callee, args),
            ExprKind::Seance(name) => Ok(self.eval_seance(&name.name)),
            ExprKind::Odds(condition) => Ok(self.eval_odds(condition)),
            ExprKind::Remember { variable, index } => self.eval_remember(variable, index),
            ExprKind::Become { personality, args } => self.eval_become(personality, args),
            ExprKind::Graph { method, args } => self.eval_graph(method, args),
            ExprKind::Sanity { method, .. } => Ok(self.eval_sanity(method)),
            ExprKind::Read(handle) => self.eval_read(handle),
        }
    }

    /// Replace `{name}` holes with the display form of visible variables.
    /// Unknown names are left as written.
    fn interpolate(&mut self, text: &str) -> String {
        if !text.contains('{') {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let name_len = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];
            if !name.is_empty() && after[name_len..].starts_with('}') {
                if let Some(var) = self.lookup(name) {
                    var.borrow_mut().record_access(self.stmt_counter);
                    out.push_str(&var.borrow().value.to_string());
                } else {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                rest = &after[name_len + 1..];
            } else {
                out.push('{');
                rest = after;
            }
        }
        out.push_str(rest);
        out
    }

    // ── Access ──

    fn eval_member(&mut self, object: &Expr, member: &Ident) -> EvalResult<Value> {
        let value = self.eval_expr(object)?;
        Ok(match value {
            Value::Blob(mut fields) => fields.remove(&member.name).unwrap_or(Value::Void),
            Value::List(items) if member.name == "length" => Value::Number(items.len() as f64),
            _ => Value::Void,
        })
    }

    fn eval_index(&mut self, object: &Expr, index: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(object)?;
        let index = self.eval_expr(index)?;
        let Some(i) = index.as_number().filter(|n| *n >= 0.0).map(|n| n as usize) else {
            return Ok(Value::Void);
        };
        Ok(match value {
            Value::List(mut items) if i < items.len() => items.swap_remove(i),
            Value::Word(s) => s.chars().nth(i).map_or(Value::Void, |c| Value::word(c)),
            _ => Value::Void,
        })
    }

    // ── Binary ──

    fn eval_binary(
        &mut self,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        left_spaces: u32,
        right_spaces: u32,
    ) -> EvalResult<Value> {
        if left_spaces == right_spaces && left_spaces > 0 {
            self.sp.ambiguous_precedence();
        }

        let left_names = collect_names(left);
        let right_names = collect_names(right);
        if let Some((a, b)) = self.graph.ignores_conflict(&left_names, &right_names) {
            let (a, b) = if self.graph.relates(Relation::Ignores, &a, &b) {
                (a, b)
            } else {
                (b, a)
            };
            return Err(RuntimeError::relationship(format!(
                "'{a}' ignores '{b}': they cannot appear in the same expression"
            )));
        }

        let mut lhs = self.eval_expr(left)?;
        let mut rhs = self.eval_expr(right)?;

        let left_var = left.as_identifier().and_then(|n| self.lookup(n));
        let right_var = right.as_identifier().and_then(|n| self.lookup(n));
        if let (Some(lv), Some(rv)) = (&left_var, &right_var) {
            if !Rc::ptr_eq(lv, rv) && lv.borrow().mood == Mood::Angry && rv.borrow().mood == Mood::Angry
            {
                std::mem::swap(&mut lv.borrow_mut().value, &mut rv.borrow_mut().value);
                lhs = lv.borrow().value.clone();
                rhs = rv.borrow().value.clone();
            }
        }

        if lhs.is_void() || rhs.is_void() {
            return Ok(Value::Void);
        }
        if lhs.is_dunno() || rhs.is_dunno() {
            return Ok(Value::Dunno);
        }

        let coerced = coerce(&lhs, &rhs, op == BinOp::Concat);
        if coerced.left_coerced {
            scar(left_var.as_ref());
        }
        if coerced.right_coerced {
            scar(right_var.as_ref());
        }

        match (op, &coerced.left, &coerced.right) {
            (BinOp::Concat, l, r) => {
                let joined = format!("{l}{r}");
                Ok(Value::Word(self.word_modifier(left_var.as_ref(), joined)))
            }
            (_, Value::Number(l), Value::Number(r)) => {
                let (mut l, mut r) = (*l, *r);
                if self.sp.insanity_mode() {
                    let noise = self.sp.sp().abs() as f64 / 1000.0;
                    l *= 1.0 + self.random().uniform(-noise, noise);
                    r *= 1.0 + self.random().uniform(-noise, noise);
                }
                let result = arithmetic(op, l, r)?;
                Ok(Value::Number(self.number_modifier(left_var.as_ref(), result)))
            }
            (BinOp::Add, Value::Word(l), Value::Word(r)) => {
                let joined = format!("{l}{r}");
                Ok(Value::Word(self.word_modifier(left_var.as_ref(), joined)))
            }
            (_, Value::Word(_), Value::Word(_)) => Err(RuntimeError::type_mismatch(format!(
                "Cannot apply '{}' to Words",
                op.as_str()
            ))),
            _ => Err(RuntimeError::type_mismatch(format!(
                "Type error: {} {} {}",
                lhs.type_name(),
                op.as_str(),
                rhs.type_name()
            ))),
        }
    }

    fn number_modifier(&self, var: Option<&VarRef>, n: f64) -> f64 {
        match var {
            Some(v) if self.moods_enabled() => v.borrow().apply_mood_to_number(n),
            _ => n,
        }
    }

    fn word_modifier(&self, var: Option<&VarRef>, s: String) -> String {
        match var {
            Some(v) if self.moods_enabled() => v.borrow().apply_mood_to_word(s),
            _ => s,
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnaryOp::Neg => match value {
                Value::Number(n) if self.is_banned("negativity") => Ok(Value::Number(n.abs())),
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(RuntimeError::type_mismatch(format!(
                    "Cannot negate {}",
                    other.type_name()
                ))),
            },
            UnaryOp::Not => Ok(Value::truth(!self.truthy(&value))),
        }
    }

    // ── Comparison ──

    fn eval_comparison(&mut self, left: &Expr, op: CmpOp, right: &Expr) -> EvalResult<Value> {
        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;

        let right_var = right.as_identifier().and_then(|n| self.lookup(n));
        if right_var.as_ref().is_some_and(|v| v.borrow().mood == Mood::Afraid) {
            return Ok(Value::Void);
        }

        let ordered = |f: fn(f64, f64) -> bool| match (&lhs, &rhs) {
            (Value::Number(l), Value::Number(r)) => f(*l, *r),
            _ => false,
        };
        let result = match op {
            CmpOp::Vibes => vibes_equal(&lhs, &rhs),
            CmpOp::Loose => loose_equal(&lhs, &rhs),
            CmpOp::Strict => strict_equal(&lhs, &rhs),
            CmpOp::Identity => match (left.as_identifier(), right.as_identifier()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            CmpOp::NotEqual => !loose_equal(&lhs, &rhs),
            CmpOp::Less => ordered(|l, r| l < r),
            CmpOp::Greater => ordered(|l, r| l > r),
            CmpOp::LessEq => ordered(|l, r| l <= r),
            CmpOp::GreaterEq => ordered(|l, r| l >= r),
            CmpOp::Deep(signs) => {
                let left_var = left.as_identifier().and_then(|n| self.lookup(n));
                strict_equal(&lhs, &rhs) && deep_equal(left_var.as_ref(), right_var.as_ref(), signs)
            }
        };
        Ok(Value::truth(result))
    }

    fn eval_logical(&mut self, left: &Expr, op: LogicalOp, right: &Expr) -> EvalResult<Value> {
        let l = self.eval_expr(left)?;
        let l = self.truthy(&l);
        let result = match op {
            LogicalOp::And => {
                if !l {
                    return Ok(Value::Nope);
                }
                let r = self.eval_expr(right)?;
                self.truthy(&r)
            }
            LogicalOp::Or => {
                if l {
                    return Ok(Value::Yep);
                }
                let r = self.eval_expr(right)?;
                self.truthy(&r)
            }
            LogicalOp::Nor => {
                if l {
                    return Ok(Value::Nope);
                }
                let r = self.eval_expr(right)?;
                !self.truthy(&r)
            }
            LogicalOp::Xor => {
                let r = self.eval_expr(right)?;
                l != self.truthy(&r)
            }
            LogicalOp::ButNot | LogicalOp::Unless => {
                let r = self.eval_expr(right)?;
                l && !self.truthy(&r)
            }
        };
        Ok(Value::truth(result))
    }

    // ── Emotional operators ──

    fn eval_emotional(&mut self, left: &Expr, op: EmotionOp, right: &Expr) -> EvalResult<Value> {
        let (Some(a), Some(b)) = (left.as_identifier(), right.as_identifier()) else {
            return Err(RuntimeError::relationship(
                "Emotional operators require variable names",
            ));
        };
        let (Some(left_var), Some(right_var)) = (self.lookup(a), self.lookup(b)) else {
            return Err(RuntimeError::undefined(format!(
                "Variable not found for emotional operator '{}'",
                op.as_str()
            )));
        };

        self.graph.add_edge(a, b);
        match op {
            EmotionOp::Loves => {
                let already = left_var.borrow().bonds.iter().any(|n| n == b);
                if !already {
                    left_var.borrow_mut().bonds.push(b.to_string());
                    if !Rc::ptr_eq(&left_var, &right_var) {
                        right_var.borrow_mut().bonds.push(a.to_string());
                    }
                    self.sp.bond_formed();
                }
            }
            EmotionOp::Hates => {
                self.graph.relate(Relation::Hates, a, b);
                self.graph.relate(Relation::Hates, b, a);
            }
            EmotionOp::Fears => self.graph.relate(Relation::Fears, a, b),
            EmotionOp::Envies => self.graph.relate(Relation::Envies, a, b),
            EmotionOp::Ignores => self.graph.relate(Relation::Ignores, a, b),
            EmotionOp::Mirrors => self.graph.relate(Relation::Mirrors, a, b),
            EmotionOp::Haunts => self.graph.relate(Relation::Haunts, a, b),
            EmotionOp::Forgets => {
                left_var.borrow_mut().bonds.retain(|n| n != b);
                if !Rc::ptr_eq(&left_var, &right_var) {
                    right_var.borrow_mut().bonds.retain(|n| n != a);
                }
                self.graph.forget_pair(a, b);
            }
        }
        Ok(Value::Yep)
    }

    // ── Special forms ──

    /// Consult the Afterlife, or read a live ghost directly.
    pub(crate) fn eval_seance(&mut self, name: &str) -> Value {
        self.sp.seance_use();
        if let Some(var) = self.lookup(name) {
            if var.borrow().keyword == sanity_types::ast::DeclKeyword::Ghost {
                self.sp.seance_ghost();
                let mut v = var.borrow_mut();
                v.record_access(self.stmt_counter);
                return v.value.clone();
            }
        }
        self.afterlife.summon(name)
    }

    fn eval_odds(&mut self, condition: &Expr) -> Value {
        match self.eval_expr(condition) {
            Ok(v) if self.truthy(&v) => Value::Number(self.random().range_inclusive(60, 100) as f64),
            Ok(_) => Value::Number(self.random().range_inclusive(0, 40) as f64),
            Err(_) => Value::Number(50.0),
        }
    }

    fn eval_remember(&mut self, variable: &Ident, index: &Expr) -> EvalResult<Value> {
        let Some(var) = self.lookup(&variable.name) else {
            return Ok(Value::Void);
        };
        var.borrow_mut().observed = true;
        let index = self.eval_expr(index)?;
        let n = index.as_number().map_or(0, |n| n as i64);
        let v = var.borrow();
        if n > 0 && (n as usize) <= v.history.len() {
            return Ok(v.history[n as usize - 1].clone());
        }
        Ok(Value::Void)
    }

    /// Instantiate a personality: its fields (parents first) become a Blob
    /// and its functions register as `Personality.method`. Arguments fill
    /// fields positionally in declaration order.
    fn eval_become(&mut self, personality: &Ident, args: &[Expr]) -> EvalResult<Value> {
        let name = &personality.name;
        if !self.personalities.contains_key(name) {
            return Err(RuntimeError::undefined(format!(
                "Personality '{name}' is not defined"
            )));
        }
        let args = args
            .iter()
            .map(|a| self.eval_expr(a))
            .collect::<EvalResult<Vec<_>>>()?;

        let id = self.new_scope_id();
        let instance_env = Environment::child(&self.env, id);
        let mut fields = BTreeMap::new();
        let mut field_order = Vec::new();
        for def in self.personality_lineage(name) {
            for stmt in &def.body {
                match &stmt.kind {
                    StmtKind::VarDecl(decl) => {
                        let value = match &decl.value {
                            Some(e) => self.eval_expr(e)?,
                            None => Value::Void,
                        };
                        if fields.insert(decl.name.name.clone(), value).is_none() {
                            field_order.push(decl.name.name.clone());
                        }
                    }
                    StmtKind::FuncDecl(func) => {
                        let method = FunctionDef {
                            decl: Rc::new(func.clone()),
                            closure: Rc::clone(&instance_env),
                        };
                        self.functions.define(&format!("{name}.{}", func.name.name), method);
                    }
                    _ => {}
                }
            }
        }
        for (field, value) in field_order.into_iter().zip(args) {
            fields.insert(field, value);
        }
        fields.insert(PERSONALITY_FIELD.to_string(), Value::word(name.as_str()));
        Ok(Value::Blob(fields))
    }

    /// `name` and its ancestors, root-most first, each visited once.
    fn personality_lineage(&self, name: &str) -> Vec<Rc<sanity_types::ast::PersonalityDef>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        self.collect_lineage(name, &mut seen, &mut out);
        out
    }

    fn collect_lineage(
        &self,
        name: &str,
        seen: &mut BTreeSet<String>,
        out: &mut Vec<Rc<sanity_types::ast::PersonalityDef>>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        let Some(def) = self.personalities.get(name) else {
            return;
        };
        for parent in &def.parents {
            self.collect_lineage(&parent.name, seen, out);
        }
        out.push(Rc::clone(def));
    }

    // ── graph.* / sanity.* ──

    fn eval_graph(&mut self, method: &Ident, args: &[Expr]) -> EvalResult<Value> {
        let args = args
            .iter()
            .map(|a| self.eval_expr(a))
            .collect::<EvalResult<Vec<_>>>()?;
        let word = |i: usize| args.get(i).and_then(|v| v.as_word()).map(str::to_string);
        Ok(match method.name.as_str() {
            "edges" => match word(0) {
                Some(name) => word_list(self.graph.neighbours(&name)),
                None => Value::List(Vec::new()),
            },
            "distance" => match (word(0), word(1)) {
                (Some(a), Some(b)) => {
                    Value::Number(self.graph.distance(&a, &b).map_or(-1.0, |d| d as f64))
                }
                _ => Value::Number(-1.0),
            },
            "connected" => match (word(0), word(1)) {
                (Some(a), Some(b)) => Value::truth(self.graph.distance(&a, &b).is_some()),
                _ => Value::Nope,
            },
            "isolated" => word_list(self.graph.isolated()),
            _ => Value::Void,
        })
    }

    fn eval_sanity(&self, method: &Ident) -> Value {
        match method.name.as_str() {
            "curses" => word_list(self.active_curses.iter().cloned().collect()),
            "points" => Value::Number(self.sp.sp() as f64),
            _ => Value::Void,
        }
    }

    // ── Files ──

    fn eval_read(&mut self, handle: &Ident) -> EvalResult<Value> {
        let name = &handle.name;
        let cost = self.open_handle(name)?.sp_cost(crate::files::BASE_IO_COST);
        self.sp.file_io(cost, format!("read {name}"));
        let Some(fh) = self.file_handles.get_mut(name) else {
            return Err(RuntimeError::io(format!("No open file handle '{name}'")));
        };
        let content = fh
            .read()
            .map_err(|e| RuntimeError::io(format!("Failed to read '{name}': {e}")))?;
        fh.observed = true;
        Ok(Value::Word(content))
    }

    /// An existing, open handle.
    pub(crate) fn open_handle(&self, name: &str) -> EvalResult<&crate::files::FileHandle> {
        let fh = self
            .file_handles
            .get(name)
            .ok_or_else(|| RuntimeError::io(format!("No open file handle '{name}'")))?;
        if !fh.is_open() {
            return Err(RuntimeError::io(format!("File handle '{name}' is closed")));
        }
        Ok(fh)
    }
}

fn word_list(names: Vec<String>) -> Value {
    Value::List(names.into_iter().map(Value::Word).collect())
}

fn scar(var: Option<&VarRef>) {
    if let Some(var) = var {
        let mut v = var.borrow_mut();
        if !v.has_trait(Trait::Resilient) {
            v.add_scar();
        }
    }
}

fn arithmetic(op: BinOp, l: f64, r: f64) -> EvalResult<f64> {
    Ok(match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => {
            if r == 0.0 {
                return Err(RuntimeError::arithmetic("Division by zero"));
            }
            l / r
        }
        BinOp::Mod => {
            if r == 0.0 {
                return Err(RuntimeError::arithmetic("Modulo by zero"));
            }
            l - r * (l / r).floor()
        }
        BinOp::Pow => l.powf(r),
        BinOp::Concat => {
            return Err(RuntimeError::type_mismatch("Cannot apply '&' to Numbers"));
        }
    })
}

/// The extra checks of a 5-to-10-sign equality, cumulative by sign count.
fn deep_equal(left: Option<&VarRef>, right: Option<&VarRef>, signs: u8) -> bool {
    let (Some(l), Some(r)) = (left, right) else {
        return true;
    };
    let (l, r) = (l.borrow(), r.borrow());
    (signs < 5 || l.mood == r.mood)
        && (signs < 6 || l.trust == r.trust)
        && (signs < 7 || l.age == r.age)
        && (signs < 8 || l.scars == r.scars)
        && (signs < 9 || l.doubt == r.doubt)
        && (signs < 10 || l.bonds.len() == r.bonds.len())
}

/// Variable names an operand mentions, for the `ignores` check.
pub(crate) fn collect_names(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    walk_names(expr, &mut out);
    out
}

fn walk_names(expr: &Expr, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Identifier(id) => out.push(id.name.clone()),
        ExprKind::Binary { left, right, .. }
        | ExprKind::Comparison { left, right, .. }
        | ExprKind::Logical { left, right, .. } => {
            walk_names(left, out);
            walk_names(right, out);
        }
        ExprKind::Unary { operand, .. } => walk_names(operand, out),
        ExprKind::Call { callee, args } => {
            if let Some(name) = callee.as_identifier() {
                out.push(name.to_string());
            }
            for arg in args {
                walk_names(arg, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanity_types::Span;

    fn num(n: f64) -> Expr {
        Expr::new(ExprKind::NumberLit(n), Span::default())
    }

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Identifier(Ident::new(name, Span::default())), Span::default())
    }

    #[test]
    fn modulo_follows_the_divisor_sign() {
        assert_eq!(arithmetic(BinOp::Mod, -7.0, 3.0), Ok(2.0));
        assert_eq!(arithmetic(BinOp::Mod, 7.0, -3.0), Ok(-2.0));
    }

    #[test]
    fn division_by_zero_traps() {
        let err = arithmetic(BinOp::Div, 1.0, 0.0).unwrap_err();
        assert_eq!(err.message, "Division by zero");
    }

    #[test]
    fn names_are_collected_through_nested_operators() {
        let expr = Expr::new(
            ExprKind::Binary {
                left: Box::new(ident("a")),
                op: BinOp::Add,
                right: Box::new(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(ident("b")),
                    },
                    Span::default(),
                )),
                left_spaces: 1,
                right_spaces: 0,
            },
            Span::default(),
        );
        assert_eq!(collect_names(&expr), vec!["a".to_string(), "b".to_string()]);
        assert!(collect_names(&num(1.0)).is_empty());
    }
}
