//! Shared AST builders for the executor tests.
//!
//! Statements built here carry an explicit `.` terminator so that the
//! SP-selected terminator never adds `[?]` lines to the output.

#![allow(dead_code)]

use sanity_eval::{EvalResult, Executor, ExecutorConfig, FixedRandom, Flags, RandomSource};
use sanity_types::ast::*;
use sanity_types::{Span, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Executors
// ══════════════════════════════════════════════════════════════════════════════

/// An executor whose chance checks always fail.
pub fn executor() -> Executor {
    with_random(FixedRandom(0.99))
}

pub fn with_random(rng: impl RandomSource + 'static) -> Executor {
    Executor::with_random(ExecutorConfig::new(), Box::new(rng))
}

pub fn with_flags(flags: Flags) -> Executor {
    Executor::with_random(ExecutorConfig::new().with_flags(flags), Box::new(FixedRandom(0.99)))
}

/// Run statements as a whole program.
pub fn run(exec: &mut Executor, body: Vec<Stmt>) -> EvalResult<Value> {
    exec.execute_program(&Program::from_body(body))
}

/// Run statements as a program on a fresh executor.
pub fn run_fresh(body: Vec<Stmt>) -> (Executor, EvalResult<Value>) {
    let mut exec = executor();
    let result = run(&mut exec, body);
    (exec, result)
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

fn e(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

pub fn id(name: &str) -> Ident {
    Ident::new(name, Span::default())
}

pub fn num(n: f64) -> Expr {
    e(ExprKind::NumberLit(n))
}

pub fn word(s: &str) -> Expr {
    e(ExprKind::WordLit(s.to_string()))
}

pub fn yep() -> Expr {
    e(ExprKind::TruthLit(Truth::Yep))
}

pub fn nope() -> Expr {
    e(ExprKind::TruthLit(Truth::Nope))
}

pub fn list(items: Vec<Expr>) -> Expr {
    e(ExprKind::ListLit(items))
}

pub fn var(name: &str) -> Expr {
    e(ExprKind::Identifier(id(name)))
}

pub fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
    e(ExprKind::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
        left_spaces: 0,
        right_spaces: 0,
    })
}

pub fn cmp(left: Expr, op: CmpOp, right: Expr) -> Expr {
    e(ExprKind::Comparison {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn emotion(left: &str, op: EmotionOp, right: &str) -> Expr {
    e(ExprKind::Emotional {
        left: Box::new(var(left)),
        op,
        right: Box::new(var(right)),
    })
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::Call {
        callee: Box::new(var(name)),
        args,
    })
}

pub fn module_call(module: &str, function: &str, args: Vec<Expr>) -> Expr {
    e(ExprKind::Call {
        callee: Box::new(e(ExprKind::Member {
            object: Box::new(var(module)),
            member: id(function),
        })),
        args,
    })
}

pub fn seance(name: &str) -> Expr {
    e(ExprKind::Seance(id(name)))
}

pub fn remember(name: &str, n: f64) -> Expr {
    e(ExprKind::Remember {
        variable: id(name),
        index: Box::new(num(n)),
    })
}

pub fn read(handle: &str) -> Expr {
    e(ExprKind::Read(id(handle)))
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A statement on `line` with a `.` terminator.
pub fn stmt(kind: StmtKind, line: u32) -> Stmt {
    Stmt::new(kind, Span::line(line)).with_terminators(vec![Terminator::Normal])
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block::new(stmts, Span::default())
}

pub fn decl(keyword: DeclKeyword, name: &str, value: Expr, line: u32) -> Stmt {
    stmt(
        StmtKind::VarDecl(VarDecl {
            keyword,
            name: id(name),
            value: Some(value),
            source: None,
        }),
        line,
    )
}

pub fn pinky(name: &str, source: &str, line: u32) -> Stmt {
    stmt(
        StmtKind::VarDecl(VarDecl {
            keyword: DeclKeyword::Pinky,
            name: id(name),
            value: None,
            source: Some(id(source)),
        }),
        line,
    )
}

pub fn assign(name: &str, value: Expr, line: u32) -> Stmt {
    stmt(
        StmtKind::Assign {
            name: id(name),
            value,
        },
        line,
    )
}

pub fn print(value: Expr, line: u32) -> Stmt {
    stmt(StmtKind::Print(value), line)
}

pub fn expr_stmt(value: Expr, line: u32) -> Stmt {
    stmt(StmtKind::Expr(value), line)
}

pub fn ret(value: Expr, line: u32) -> Stmt {
    stmt(StmtKind::Return(Some(value)), line)
}

pub fn func(keyword: FuncKeyword, name: &str, params: &[&str], body: Vec<Stmt>, line: u32) -> Stmt {
    stmt(
        StmtKind::FuncDecl(FuncDecl {
            keyword,
            name: Ident::new(name, Span::line(line)),
            params: params.iter().map(|p| id(p)).collect(),
            body: block(body),
            condition: None,
            is_secret: false,
        }),
        line,
    )
}

pub fn if_stmt(condition: Expr, body: Vec<Stmt>, actually: Option<Vec<Stmt>>, line: u32) -> Stmt {
    stmt(
        StmtKind::If(IfStmt {
            condition,
            body: block(body),
            but_clauses: Vec::new(),
            actually: actually.map(block),
        }),
        line,
    )
}

pub fn pls(count: Expr, counter: Option<&str>, body: Vec<Stmt>, line: u32) -> Stmt {
    stmt(
        StmtKind::Pls {
            count,
            counter: counter.map(id),
            body: block(body),
        },
        line,
    )
}

pub fn enough(line: u32) -> Stmt {
    stmt(StmtKind::Enough, line)
}

pub fn try_cope(body: Vec<Stmt>, param: Option<&str>, cope: Vec<Stmt>, line: u32) -> Stmt {
    stmt(
        StmtKind::Try(TryCope {
            body: block(body),
            cope: Some(Handler {
                param: param.map(id),
                body: block(cope),
            }),
            deny: None,
        }),
        line,
    )
}

/// Output lines, for comparison against string literals.
pub fn output(exec: &Executor) -> Vec<&str> {
    exec.output.iter().map(String::as_str).collect()
}
