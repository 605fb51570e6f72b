//! Whole-program runs: narrative sections, end-of-run accounting,
//! chapters, events, files and sidecar persistence.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use sanity_eval::{ErrorKind, Executor, ExecutorConfig, FixedRandom, Flags};
use sanity_types::ast::*;
use sanity_types::{Mood, Span};
use std::fs;
use std::path::Path;

fn persistent(source: &Path) -> Executor {
    Executor::with_random(
        ExecutorConfig::new().with_source_path(source),
        Box::new(FixedRandom(0.99)),
    )
}

fn arc(name: &str, requires: Option<&str>, body: Vec<Stmt>) -> ArcDef {
    ArcDef {
        name: id(name),
        requires: requires.map(id),
        body: block(body),
        span: Span::default(),
    }
}

fn chapter(name: &str, body: Vec<Stmt>) -> ChapterDef {
    ChapterDef {
        name: id(name),
        allies: vec![],
        rivals: vec![],
        body,
        span: Span::default(),
    }
}

fn recall(chapter: &str, item: Option<&str>, line: u32) -> Stmt {
    stmt(
        StmtKind::Recall {
            chapter: id(chapter),
            item: item.map(id),
        },
        line,
    )
}

// ══════════════════════════════════════════════════════════════════════════════
// Narrative Structure
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn sections_run_in_story_order() {
    let program = Program {
        prologue: Some(block(vec![print(word("prologue"), 1)])),
        arcs: vec![arc("rising", None, vec![print(word("arc"), 2)])],
        climax: Some(ClimaxDef {
            requires: Some(id("rising")),
            body: block(vec![print(word("climax"), 3)]),
            span: Span::default(),
        }),
        body: vec![print(word("body"), 4)],
        epilogue: Some(block(vec![print(word("epilogue"), 5)])),
        ..Program::default()
    };
    let mut exec = executor();
    exec.execute_program(&program).unwrap();
    assert_eq!(output(&exec), vec!["prologue", "arc", "climax", "body", "epilogue"]);
}

#[test]
fn arcs_wait_for_their_requirements() {
    let program = Program {
        arcs: vec![
            arc("second", Some("first"), vec![print(word("second"), 1)]),
            arc("first", None, vec![print(word("first"), 2)]),
        ],
        ..Program::default()
    };
    let mut exec = executor();
    exec.execute_program(&program).unwrap();
    assert_eq!(output(&exec), vec!["first"]);
    // skipped arc -10, one arc scope entered +1
    assert_eq!(exec.sp.sp(), 91);
}

#[test]
fn epilogue_runs_after_a_crash() {
    let program = Program {
        body: vec![stmt(StmtKind::Cry("boom".into()), 1)],
        epilogue: Some(block(vec![print(word("goodbye"), 2)])),
        ..Program::default()
    };
    let mut exec = executor();
    let err = exec.execute_program(&program).unwrap_err();
    assert_eq!(err.message, "boom");
    assert_eq!(output(&exec), vec!["[CRASH] boom", "goodbye"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// End-of-run Accounting
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unfulfilled_foreshadowing_costs() {
    let (exec, result) = run_fresh(vec![
        stmt(StmtKind::Foreshadow("storm".into()), 1),
        stmt(StmtKind::Foreshadow("calm".into()), 2),
        stmt(StmtKind::Fulfill("calm".into()), 3),
    ]);
    result.unwrap();
    assert_eq!(exec.sp.sp(), 95);
}

#[test]
fn banned_time_rejects_foreshadowing() {
    let (_, result) = run_fresh(vec![
        stmt(StmtKind::No("time".into()), 1),
        stmt(StmtKind::Foreshadow("storm".into()), 2),
    ]);
    assert_eq!(result.unwrap_err().kind, ErrorKind::Banned);
}

#[test]
fn leaked_file_handles_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = Vec::new();
    for (i, name) in ["one", "two", "three"].into_iter().enumerate() {
        let path = dir.path().join(format!("{name}.txt"));
        body.push(stmt(
            StmtKind::Open {
                path: word(&path.to_string_lossy()),
                handle: id(name),
            },
            i as u32 + 1,
        ));
    }
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(
        output(&exec),
        vec!["[SanityLang] You're leaking file handles. This is going on your permanent record."]
    );
    assert_eq!(exec.sp.sp(), 85);
    assert!(exec.file_handles.is_empty());
}

#[test]
fn files_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    let (exec, result) = run_fresh(vec![
        stmt(
            StmtKind::Open {
                path: word(&path.to_string_lossy()),
                handle: id("notes"),
            },
            1,
        ),
        stmt(
            StmtKind::Write {
                content: word("hello"),
                handle: id("notes"),
            },
            2,
        ),
        print(read("notes"), 3),
        stmt(StmtKind::Close(id("notes")), 4),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["hello"]);
    assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    // write 3 on an empty file, read 4 once it has content
    assert_eq!(exec.sp.sp(), 93);
}

#[test]
fn closing_an_unknown_handle_fails() {
    let (_, result) = run_fresh(vec![stmt(StmtKind::Close(id("nothing")), 1)]);
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
    assert_eq!(err.message, "No open file handle 'nothing'");
}

// ══════════════════════════════════════════════════════════════════════════════
// Chapters
// ══════════════════════════════════════════════════════════════════════════════

fn utils() -> ChapterDef {
    chapter(
        "Utils",
        vec![
            decl(DeclKeyword::Sure, "helper", num(5.0), 1),
            decl(DeclKeyword::Whisper, "hidden", word("psst"), 10),
        ],
    )
}

#[test]
fn recall_imports_everything_but_whispers() {
    let program = Program {
        chapters: vec![utils()],
        body: vec![recall("Utils", None, 20), print(var("helper"), 21)],
        ..Program::default()
    };
    let mut exec = executor();
    exec.execute_program(&program).unwrap();
    assert_eq!(output(&exec), vec!["5"]);
    assert!(exec.lookup("hidden").is_none());
    assert_eq!(exec.chapters.trust("Utils"), 72);
}

#[test]
fn whispers_cannot_be_recalled_by_name() {
    let program = Program {
        chapters: vec![utils()],
        body: vec![recall("Utils", Some("hidden"), 20)],
        ..Program::default()
    };
    let err = executor().execute_program(&program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Chapter);
    assert_eq!(err.message, "Cannot recall secret item 'hidden' from Chapter 'Utils'");
}

#[test]
fn recalling_an_unknown_chapter_fails() {
    let (_, result) = run_fresh(vec![recall("Nowhere", None, 1)]);
    assert_eq!(result.unwrap_err().message, "Chapter 'Nowhere' not found");
}

// ══════════════════════════════════════════════════════════════════════════════
// Events
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn scream_variables_fire_change_listeners() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Scream, "alarm", num(1.0), 1),
        stmt(
            StmtKind::When {
                target: id("alarm"),
                event: WhenEvent::Changes,
                body: block(vec![print(word("changed"), 3)]),
            },
            2,
        ),
        assign("alarm", num(2.0), 4),
    ]);
    result.unwrap();
    assert_eq!(output(&exec), vec!["changed"]);
}

#[test]
fn mood_listeners_fire_on_mood_changes() {
    let mut body = vec![
        decl(DeclKeyword::Maybe, "mouse", num(1.0), 1),
        decl(DeclKeyword::Maybe, "cat", word("c"), 20),
        stmt(
            StmtKind::When {
                target: id("mouse"),
                event: WhenEvent::Mood(Mood::Afraid),
                body: block(vec![print(word("eek"), 22)]),
            },
            21,
        ),
    ];
    body.push(expr_stmt(emotion("mouse", EmotionOp::Fears, "cat"), 23));
    body.push(assign("cat", word("d"), 24));
    let (exec, result) = run_fresh(body);
    result.unwrap();
    assert_eq!(output(&exec), vec!["eek"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Flags
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn chaos_flag_starts_insane() {
    let exec = with_flags(Flags {
        chaos: true,
        ..Flags::default()
    });
    assert_eq!(exec.sp.sp(), 0);
    assert!(exec.sp.insanity_mode());
}

#[test]
fn audit_flag_records_every_change() {
    let mut exec = with_flags(Flags {
        audit: true,
        ..Flags::default()
    });
    run(&mut exec, vec![decl(DeclKeyword::Sure, "x", num(1.0), 1)]).unwrap();
    let log = exec.sp.audit_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reason, "single-char variable name");
    assert_eq!(log[0].delta, -5);
    assert_eq!(log[0].sp, 95);
}

#[test]
fn strict_flag_doubles_penalties() {
    let mut exec = with_flags(Flags {
        strict: true,
        ..Flags::default()
    });
    run(&mut exec, vec![decl(DeclKeyword::Sure, "x", num(1.0), 1)]).unwrap();
    assert_eq!(exec.sp.sp(), 90);
}

// ══════════════════════════════════════════════════════════════════════════════
// Sidecars
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn dreams_survive_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("prog.san");

    let mut first = persistent(&source);
    run(&mut first, vec![decl(DeclKeyword::Dream, "score", num(42.0), 1)]).unwrap();
    // fresh dream start
    assert_eq!(first.sp.sp(), 105);
    assert!(dir.path().join("prog.san.dream").exists());

    let mut second = persistent(&source);
    run(
        &mut second,
        vec![
            decl(DeclKeyword::Dream, "score", num(0.0), 1),
            print(var("score"), 2),
        ],
    )
    .unwrap();
    assert_eq!(output(&second), vec!["42"]);
    // dream fulfilled
    assert_eq!(second.sp.sp(), 105);
}

#[test]
fn blame_is_written_to_the_sidecar_log() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("prog.san");
    let mut exec = persistent(&source);
    let err = run(
        &mut exec,
        vec![
            decl(DeclKeyword::Maybe, "culprit", num(1.0), 1),
            stmt(
                StmtKind::Blame {
                    target: id("culprit"),
                    reason: "bad value".into(),
                },
                2,
            ),
        ],
    )
    .unwrap_err();
    assert_eq!(err.blame.as_deref(), Some("culprit"));

    let culprit = exec.lookup("culprit").unwrap();
    assert_eq!(culprit.borrow().trust, 80);
    assert_eq!(culprit.borrow().mood, Mood::Afraid);

    let log = fs::read_to_string(dir.path().join("prog.san.blame")).unwrap();
    assert!(log.trim_end().ends_with("culprit: bad value"));
}

#[test]
fn deny_runs_its_block_with_the_error() {
    let (exec, result) = run_fresh(vec![
        decl(DeclKeyword::Maybe, "suspect", num(1.0), 1),
        stmt(
            StmtKind::Try(TryCope {
                body: block(vec![stmt(
                    StmtKind::Blame {
                        target: id("suspect"),
                        reason: "it was them".into(),
                    },
                    3,
                )]),
                cope: None,
                deny: Some(Handler {
                    param: Some(id("err")),
                    body: block(vec![print(var("err"), 5)]),
                }),
            }),
            2,
        ),
    ]);
    result.unwrap();
    assert_eq!(exec.output.len(), 1);
    assert!(exec.output[0].contains("it was them"));
    // blame -20, deny -10
    assert_eq!(exec.lookup("suspect").unwrap().borrow().trust, 70);
}
