//! Statement-level behaviour of the executor: bindings, conditionals,
//! loops, error handling and self-modification.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use sanity_eval::ErrorKind;
use sanity_types::ast::*;
use sanity_types::{Mood, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn print_writes_display_forms() {
    let (exec, result) = run_fresh(vec![
        print(bin(num(2.0), BinOp::Add, num(3.0)), 1),
        print(word("plain"), 2),
        print(list(vec![num(1.0), word("two")]), 3),
        print(yep(), 4),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["5", "plain", "[1, two]", "yep"]);
}

#[test]
fn words_interpolate_visible_variables() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Sure, "name", word("Ada"), 1),
        print(word("hi {name}, {missing}"), 2),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["hi Ada, {missing}"]);
}

#[test]
fn sure_variables_cannot_be_assigned() {
    let (_, result) = run_fresh(vec![
        decl(DeclKeyword::Sure, "score", num(1.0), 1),
        assign("score", num(2.0), 2),
    ]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Immutable);
    assert!(err.message.contains("Use override"));
}

#[test]
fn sure_override_sends_old_value_to_afterlife() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Sure, "score", num(1.0), 1),
        decl(DeclKeyword::Sure, "score", num(2.0), 2),
    ]);
    result.unwrap();
    assert!(exec.afterlife.contains("score"));
    assert_eq!(exec.lookup("score").unwrap().borrow().value, Value::Number(2.0));
    assert_eq!(exec.sp.sp(), 90);
}

#[test]
fn sure_cannot_override_other_keywords() {
    let (_, result) = run_fresh(vec![
        decl(DeclKeyword::Maybe, "score", num(1.0), 1),
        decl(DeclKeyword::Sure, "score", num(2.0), 2),
    ]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Immutable);
    assert_eq!(err.message, "Cannot reassign 'maybe' variable 'score' with 'sure'.");
}

#[test]
fn swear_redeclaration_crashes_with_blame() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Swear, "answer", num(42.0), 1),
        decl(DeclKeyword::Sure, "answer", num(1.0), 2),
        print(word("unreachable"), 3),
    ]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Immutable);
    assert_eq!(err.message, "Cannot reassign swear variable 'answer'! Program crashed.");
    assert_eq!(err.blame.as_deref(), Some("answer"));
    assert!(exec.output.is_empty());
}

#[test]
fn repeated_maybe_declarations_breed_doubt() {
    let mut body = vec![decl(DeclKeyword::Maybe, "guess", num(0.0), 1)];
    for i in 1..=5 {
        body.push(decl(DeclKeyword::Maybe, "guess", num(f64::from(i)), i + 1));
    }
    let (exec, result) = run_fresh(body);
    result.unwrap();
    let var = exec.lookup("guess").unwrap();
    let v = var.borrow();
    assert_eq!(v.doubt, 5);
    assert!(v.is_uncertain);
    assert_eq!(v.value, Value::Number(5.0));
    assert_eq!(v.previous_value, Some(Value::Number(4.0)));
}

#[test]
fn single_character_names_cost_sanity() {
    let (exec, result) = run_fresh(vec![decl(DeclKeyword::Sure, "x", num(1.0), 1)]);
    result.unwrap();
    assert_eq!(exec.sp.sp(), 95);
}

#[test]
fn remember_reads_value_history() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Maybe, "level", num(1.0), 1),
        assign("level", num(2.0), 2),
        assign("level", num(3.0), 3),
        print(remember("level", 1.0), 4),
        print(remember("level", 2.0), 5),
        print(remember("level", 9.0), 6),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["1", "2", "Void"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Conditionals
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn if_falls_through_to_actually() {
    let (exec, result) = run_fresh(vec![
        if_stmt(nope(), vec![print(word("then"), 2)], Some(vec![print(word("actually"), 3)]), 1),
        if_stmt(yep(), vec![print(word("then"), 5)], None, 4),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["actually", "then"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Loops
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn pls_counts_from_one_while_sane() {
    let (exec, result) = run_fresh(vec![pls(
        num(3.0),
        Some("idx"),
        vec![print(var("idx"), 2)],
        1,
    )]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["1", "2", "3"]);
}

#[test]
fn pls_counts_from_zero_when_sanity_is_low() {
    let mut exec = executor();
    exec.sp.reset(40);
    let result = run(
        &mut exec,
        vec![pls(num(2.0), Some("idx"), vec![print(var("idx"), 2)], 1)],
    );
    result.unwrap();
    assert_eq!(output(&exec), vec!["0", "1"]);
}

#[test]
fn enough_stops_a_pls_loop() {
    let (exec, result) = run_fresh(vec![pls(
        num(5.0),
        Some("idx"),
        vec![
            print(var("idx"), 2),
            if_stmt(cmp(var("idx"), CmpOp::Loose, num(2.0)), vec![enough(3)], None, 3),
        ],
        1,
    )]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["1", "2"]);
}

#[test]
fn pls_rejects_non_numeric_counts() {
    let (_, result) = run_fresh(vec![pls(word("many"), None, vec![], 1)]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "pls loop count must be a Number");
}

#[test]
fn pls_survives_counts_past_the_integer_range() {
    let (exec, result) = run_fresh(vec![pls(
        num(9.3e18),
        Some("idx"),
        vec![print(var("idx"), 2), enough(3)],
        1,
    )]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["1"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn cope_binds_the_error() {
    let (exec, result) = run_fresh(vec![try_cope(
        vec![stmt(StmtKind::Oops("boom".into()), 2)],
        Some("err"),
        vec![print(var("err"), 4)],
        1,
    )]);
    result.unwrap();
    assert_eq!(exec.output.len(), 1);
    assert!(exec.output[0].contains("oops: boom"));
}

#[test]
fn empty_handed_cope_is_useless() {
    let (exec, result) = run_fresh(vec![try_cope(
        vec![stmt(StmtKind::Oops("boom".into()), 2)],
        None,
        vec![],
        1,
    )]);
    result.unwrap();
    // oops -2, two scopes entered +2, useless cope -5
    assert_eq!(exec.sp.sp(), 95);
}

#[test]
fn cry_prints_and_crashes() {
    let (exec, result) = run_fresh(vec![stmt(StmtKind::Cry("the end".into()), 1)]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Raised);
    assert_eq!(output(&exec), vec!["[CRASH] the end"]);
}

#[test]
fn yolo_swallows_and_keeps_going() {
    let (exec, result) = run_fresh(vec![stmt(
        StmtKind::Yolo(block(vec![
            stmt(StmtKind::Oops("first".into()), 2),
            print(word("still here"), 3),
        ])),
        1,
    )]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["still here"]);
}

#[test]
fn oops_escalates_after_ten() {
    let mut exec = executor();
    exec.oops_count = 9;
    let err = run(&mut exec, vec![stmt(StmtKind::Oops("again".into()), 1)]).unwrap_err();
    assert_eq!(err.message, "Too many oops! Escalated: again");
}

// ══════════════════════════════════════════════════════════════════════════════
// Self-modification
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn pray_for_chaos_then_recover() {
    let mut exec = executor();
    run(&mut exec, vec![stmt(StmtKind::Pray(Prayer::Chaos), 1)]).unwrap();
    assert_eq!(exec.sp.sp(), 0);
    assert!(exec.sp.insanity_mode());
    run(&mut exec, vec![stmt(StmtKind::IAmOkay, 2)]).unwrap();
    assert_eq!(exec.sp.sp(), 50);
}

#[test]
fn i_am_okay_is_refused_while_someone_is_angry() {
    let mut exec = executor();
    run(&mut exec, vec![decl(DeclKeyword::Maybe, "temper", num(1.0), 1)]).unwrap();
    exec.lookup("temper").unwrap().borrow_mut().mood = Mood::Angry;
    let before = exec.sp.sp();
    run(&mut exec, vec![stmt(StmtKind::IAmOkay, 2)]).unwrap();
    assert_eq!(exec.sp.sp(), before);
    assert_eq!(
        exec.output.last().map(String::as_str),
        Some("[SanityLang] No you're not. (temper is still Angry)")
    );
}

#[test]
fn banning_feelings_and_gambling_is_no_fun() {
    let (exec, result) = run_fresh(vec![
        stmt(StmtKind::No("feelings".into()), 1),
        stmt(StmtKind::No("gambling".into()), 2),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["[SanityLang] You must be fun at parties. +5 SP."]);
    assert_eq!(exec.sp.sp(), 105);
}

#[test]
fn banned_gambling_rejects_bets() {
    let (_, result) = run_fresh(vec![
        stmt(StmtKind::No("gambling".into()), 1),
        stmt(
            StmtKind::Bet {
                condition: yep(),
                reward: num(10.0),
                risk: num(5.0),
                body: block(vec![]),
            },
            2,
        ),
    ]);
    assert_eq!(result.unwrap_err().kind, ErrorKind::Banned);
}

#[test]
fn curses_cost_and_exorcism_costs_more() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Curse, "doom", num(1.0), 1),
        stmt(StmtKind::Exorcise("doom".into()), 2),
        stmt(StmtKind::Exorcise("nothing".into()), 3),
    ]);
    result.unwrap();
    // runtime curse -40, exorcise -25, proactive exorcise +5
    assert_eq!(exec.sp.sp(), 40);
    assert!(exec.active_curses.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Deletion and the Afterlife
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn seance_reads_the_dead_three_times() {
    let mut body = vec![
        decl(DeclKeyword::Sure, "old", num(7.0), 1),
        stmt(StmtKind::Delete(id("old")), 2),
    ];
    for line in 3..=6 {
        body.push(print(seance("old"), line));
    }
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(output(&exec), vec!["7", "7", "7", "Void"]);
    assert!(exec.lookup("old").is_none());
}

#[test]
fn ghosts_are_only_reachable_by_seance() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Ghost, "phantom", num(3.0), 1),
        print(seance("phantom"), 2),
        print(var("phantom"), 3),
    ]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Undefined);
    assert_eq!(output(&exec), vec!["3"]);
    assert_eq!(exec.ghost_count, 1);
}

// ══════════════════════════════════════════════════════════════════════════════
// Never blocks
// ══════════════════════════════════════════════════════════════════════════════

fn never(body: Vec<Stmt>, line: u32) -> Stmt {
    stmt(StmtKind::Never(block(body)), line)
}

#[test]
fn never_sends_its_locals_to_the_afterlife() {
    let (exec, result) = run_fresh(vec![
        never(vec![decl(DeclKeyword::Sure, "secret", num(7.0), 2)], 1),
        print(seance("secret"), 3),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["7"]);
    assert!(exec.lookup("secret").is_none());
}

#[test]
fn never_discards_its_first_error() {
    let (exec, result) = run_fresh(vec![
        never(
            vec![
                stmt(StmtKind::Oops("boom".into()), 2),
                print(word("unreachable"), 3),
            ],
            1,
        ),
        print(word("after"), 4),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["after"]);
}

#[test]
fn return_inside_never_leaves_the_function() {
    let (exec, result) = run_fresh(vec![
        func(
            FuncKeyword::Does,
            "pick",
            &[],
            vec![never(vec![ret(num(7.0), 3)], 2), ret(num(1.0), 4)],
            1,
        ),
        print(call("pick", vec![]), 5),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["7"]);
}

#[test]
fn enough_inside_never_stops_the_loop() {
    let (exec, result) = run_fresh(vec![pls(
        num(3.0),
        Some("idx"),
        vec![print(var("idx"), 2), never(vec![enough(4)], 3)],
        1,
    )]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["1"]);
}
