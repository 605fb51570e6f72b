//! Emotional operators and what they do to the variables involved.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use sanity_eval::ErrorKind;
use sanity_types::ast::*;
use sanity_types::{Mood, Value};

/// Two unrelated variables, declared far enough apart not to bond.
fn pair(keyword: DeclKeyword, a: (&str, Expr), b: (&str, Expr)) -> Vec<Stmt> {
    vec![decl(keyword, a.0, a.1, 1), decl(keyword, b.0, b.1, 20)]
}

// ══════════════════════════════════════════════════════════════════════════════
// Bonds
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn loves_forms_a_bond_both_ways() {
    let mut body = pair(DeclKeyword::Sure, ("alpha", num(1.0)), ("omega", word("z")));
    body.push(expr_stmt(emotion("alpha", EmotionOp::Loves, "omega"), 21));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(exec.lookup("alpha").unwrap().borrow().bonds, vec!["omega"]);
    assert_eq!(exec.lookup("omega").unwrap().borrow().bonds, vec!["alpha"]);
    assert!(exec.graph.has_edge("alpha", "omega"));
    assert_eq!(exec.sp.sp(), 102);
}

#[test]
fn nearby_declarations_of_one_type_bond_on_their_own() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Sure, "left", num(1.0), 1),
        decl(DeclKeyword::Sure, "right", num(2.0), 2),
    ]);
    result.unwrap();
    assert_eq!(exec.lookup("left").unwrap().borrow().bonds, vec!["right"]);
    assert_eq!(exec.sp.sp(), 102);
}

#[test]
fn forgetting_twice_is_harmless() {
    let mut body = pair(DeclKeyword::Sure, ("romeo", num(1.0)), ("juliet", word("j")));
    body.push(expr_stmt(emotion("romeo", EmotionOp::Loves, "juliet"), 21));
    body.push(expr_stmt(emotion("romeo", EmotionOp::Forgets, "juliet"), 22));
    body.push(expr_stmt(emotion("romeo", EmotionOp::Forgets, "juliet"), 23));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert!(exec.lookup("romeo").unwrap().borrow().bonds.is_empty());
    assert!(exec.lookup("juliet").unwrap().borrow().bonds.is_empty());
    assert!(!exec.graph.has_edge("romeo", "juliet"));
}

#[test]
fn deleting_a_bonded_variable_leaves_grief() {
    let mut body = pair(DeclKeyword::Sure, ("romeo", num(1.0)), ("juliet", word("j")));
    body.push(expr_stmt(emotion("romeo", EmotionOp::Loves, "juliet"), 21));
    body.push(stmt(StmtKind::Delete(id("romeo")), 22));
    body.push(print(var("juliet"), 23));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(output(&exec), vec!["Void"]);
    assert_eq!(exec.lookup("juliet").unwrap().borrow().grief, 4);
    // bond formed +2, bond broken -7
    assert_eq!(exec.sp.sp(), 95);
}

// ══════════════════════════════════════════════════════════════════════════════
// Directed relations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn hated_variables_cannot_share_a_value() {
    let mut body = pair(DeclKeyword::Maybe, ("cats", num(1.0)), ("dogs", num(2.0)));
    body.push(expr_stmt(emotion("cats", EmotionOp::Hates, "dogs"), 21));
    body.push(assign("dogs", num(1.0), 22));
    let (exec, result) = run_fresh(body);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Relationship);
    assert_eq!(err.message, "'dogs' hates 'cats': cannot hold the same value (1)");
    assert_eq!(exec.lookup("dogs").unwrap().borrow().value, Value::Number(2.0));
}

#[test]
fn fear_spreads_on_assignment() {
    let mut body = pair(DeclKeyword::Maybe, ("mouse", num(1.0)), ("cat", num(2.0)));
    body.push(expr_stmt(emotion("mouse", EmotionOp::Fears, "cat"), 21));
    body.push(assign("cat", num(3.0), 22));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(exec.lookup("mouse").unwrap().borrow().mood, Mood::Afraid);
}

#[test]
fn mirrors_lag_one_statement_behind() {
    let mut body = pair(DeclKeyword::Maybe, ("echo", num(0.0)), ("voice", num(1.0)));
    body.push(expr_stmt(emotion("echo", EmotionOp::Mirrors, "voice"), 21));
    body.push(assign("voice", num(5.0), 22));
    body.push(print(var("echo"), 23));
    body.push(print(var("echo"), 24));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(output(&exec), vec!["1", "5"]);
}

#[test]
fn envy_pulls_values_closer() {
    let mut body = pair(DeclKeyword::Maybe, ("poor", num(0.0)), ("rich", num(100.0)));
    body.push(expr_stmt(emotion("poor", EmotionOp::Envies, "rich"), 21));
    body.push(print(var("poor"), 22));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(output(&exec), vec!["10"]);
}

#[test]
fn haunting_ghosts_frighten_on_deletion() {
    let mut body = pair(DeclKeyword::Sure, ("spirit", num(1.0)), ("victim", word("v")));
    body.push(expr_stmt(emotion("spirit", EmotionOp::Haunts, "victim"), 21));
    body.push(stmt(StmtKind::Delete(id("spirit")), 22));
    body.push(print(var("victim"), 23));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(output(&exec), vec!["Void"]);
    assert_eq!(exec.lookup("victim").unwrap().borrow().mood, Mood::Afraid);
}

#[test]
fn emotional_operators_need_names() {
    let expr = Expr::new(
        ExprKind::Emotional {
            left: Box::new(num(1.0)),
            op: EmotionOp::Loves,
            right: Box::new(var("anyone")),
        },
        sanity_types::Span::default(),
    );
    let (_, result) = run_fresh(vec![expr_stmt(expr, 1)]);
    assert_eq!(result.unwrap_err().kind, ErrorKind::Relationship);
}

// ══════════════════════════════════════════════════════════════════════════════
// Pinky promises
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn pinky_partners_share_writes_and_fate() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Maybe, "promise", num(1.0), 1),
        pinky("vow", "promise", 10),
        assign("vow", num(9.0), 11),
        print(var("promise"), 12),
        stmt(StmtKind::Delete(id("vow")), 13),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["9"]);
    assert!(exec.lookup("promise").is_none());
    assert!(exec.afterlife.contains("promise"));
    assert!(exec.afterlife.contains("vow"));
    assert_eq!(exec.sp.sp(), 85);
}
