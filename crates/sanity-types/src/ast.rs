//! Syntax tree for SanityLang programs.
//!
//! Every node carries a [`Span`]. Statements additionally carry their
//! trailing terminator marks, already resolved by the parser.
//! Recursive expressions are boxed; source order is preserved everywhere.

use crate::mood::Mood;
use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program, optionally split into narrative sections.
///
/// Execution order: chapters are registered, then prologue, arcs (gated by
/// `requires`), climax, main body, and finally the epilogue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub chapters: Vec<ChapterDef>,
    pub prologue: Option<Block>,
    pub arcs: Vec<ArcDef>,
    pub climax: Option<ClimaxDef>,
    pub body: Vec<Stmt>,
    pub epilogue: Option<Block>,
    pub span: Span,
}

impl Program {
    /// A program with only a main body.
    pub fn from_body(body: Vec<Stmt>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }
}

/// `chapter Name allies A rivals B { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterDef {
    pub name: Ident,
    pub allies: Vec<Ident>,
    pub rivals: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `arc Name requires Other { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ArcDef {
    pub name: Ident,
    pub requires: Option<Ident>,
    pub body: Block,
    pub span: Span,
}

/// `climax requires Arc { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClimaxDef {
    pub requires: Option<Ident>,
    pub body: Block,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers & Blocks
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// `{ stmt* }`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Terminators
// ══════════════════════════════════════════════════════════════════════════════

/// Trailing punctuation on a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    /// `.`
    Normal,
    /// `..`
    Cache,
    /// `~`
    Uncertain,
    /// `!`
    Forceful,
    /// `?`
    Debug,
}

impl Terminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminator::Normal => ".",
            Terminator::Cache => "..",
            Terminator::Uncertain => "~",
            Terminator::Forceful => "!",
            Terminator::Debug => "?",
        }
    }

    pub fn parse(mark: &str) -> Option<Terminator> {
        match mark {
            "." => Some(Terminator::Normal),
            ".." => Some(Terminator::Cache),
            "~" => Some(Terminator::Uncertain),
            "!" => Some(Terminator::Forceful),
            "?" => Some(Terminator::Debug),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A statement plus its terminator marks.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub terminators: Vec<Terminator>,
    pub span: Span,
}

impl Stmt {
    /// A statement with no explicit terminator; the executor picks one
    /// from the current SP for simple statements.
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            terminators: Vec::new(),
            span,
        }
    }

    pub fn with_terminators(mut self, terminators: Vec<Terminator>) -> Self {
        self.terminators = terminators;
        self
    }

    /// Whether this statement owns a nested block. Such statements never
    /// receive an SP-selected terminator.
    pub fn has_block(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::If(_)
                | StmtKind::Unless { .. }
                | StmtKind::Suppose { .. }
                | StmtKind::Pretend { .. }
                | StmtKind::Check(_)
                | StmtKind::Again(_)
                | StmtKind::Pls { .. }
                | StmtKind::Ugh { .. }
                | StmtKind::Forever(_)
                | StmtKind::Hopefully { .. }
                | StmtKind::Reluctantly { .. }
                | StmtKind::Never(_)
                | StmtKind::FuncDecl(_)
                | StmtKind::Try(_)
                | StmtKind::Yolo(_)
                | StmtKind::Bet { .. }
                | StmtKind::Jackpot { .. }
                | StmtKind::Personality(_)
                | StmtKind::When { .. }
                | StmtKind::Vibe(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    // ── Bindings ──
    VarDecl(VarDecl),
    /// `name = value`
    Assign { name: Ident, value: Expr },
    /// `print expr`
    Print(Expr),
    Expr(Expr),

    // ── Conditionals ──
    If(IfStmt),
    Unless { condition: Expr, body: Block },
    /// Runs the body regardless; a false condition leaves the scope uncertain.
    Suppose { condition: Expr, body: Block },
    /// Runs the body in a throwaway scope.
    Pretend { condition: Expr, body: Block },
    Check(CheckStmt),

    // ── Loops ──
    Again(Block),
    /// `pls N as i { ... }`
    Pls {
        count: Expr,
        counter: Option<Ident>,
        body: Block,
    },
    Ugh { condition: Expr, body: Block },
    Forever(Block),
    Hopefully { condition: Expr, body: Block },
    Reluctantly { condition: Expr, body: Block },
    Never(Block),
    /// `enough` (break)
    Enough,

    // ── Functions ──
    FuncDecl(FuncDecl),
    Return(Option<Expr>),
    /// `forget calls on f`
    ForgetCalls(Ident),

    // ── Errors ──
    Try(TryCope),
    Blame { target: Ident, reason: String },
    Oops(String),
    Yolo(Block),
    Cry(String),

    // ── Gambling ──
    Bet {
        condition: Expr,
        reward: Expr,
        risk: Expr,
        body: Block,
    },
    Jackpot { condition: Expr, body: Block },

    // ── Time ──
    Foreshadow(String),
    Fulfill(String),
    Rewind(Expr),

    // ── Chapters, personalities, events ──
    /// `recall Chapter` or `recall item from Chapter`
    Recall {
        chapter: Ident,
        item: Option<Ident>,
    },
    Personality(PersonalityDef),
    When {
        target: Ident,
        event: WhenEvent,
        body: Block,
    },

    // ── Debugging ──
    Wtf(Ident),
    Huh(Ident),
    Therapy,
    Oracle(String),

    // ── Self-modification ──
    GrammarAlias { new_keyword: String, old_keyword: String },
    GrammarRemove(String),
    Pray(Prayer),
    /// `no <feature>`
    No(String),
    Exorcise(String),
    IAmOkay,

    // ── Relationships ──
    ForgetsEveryone(Ident),
    Delete(Ident),

    /// Nominally concurrent block; runs inline.
    Vibe(Block),

    // ── Files ──
    Open { path: Expr, handle: Ident },
    Write { content: Expr, handle: Ident },
    Append { content: Expr, handle: Ident },
    Close(Ident),
}

/// The ten declaration classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKeyword {
    Sure,
    Maybe,
    Whatever,
    Swear,
    Pinky,
    Ghost,
    Dream,
    Whisper,
    Curse,
    Scream,
}

impl DeclKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKeyword::Sure => "sure",
            DeclKeyword::Maybe => "maybe",
            DeclKeyword::Whatever => "whatever",
            DeclKeyword::Swear => "swear",
            DeclKeyword::Pinky => "pinky",
            DeclKeyword::Ghost => "ghost",
            DeclKeyword::Dream => "dream",
            DeclKeyword::Whisper => "whisper",
            DeclKeyword::Curse => "curse",
            DeclKeyword::Scream => "scream",
        }
    }
}

/// `<keyword> name = value`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub keyword: DeclKeyword,
    pub name: Ident,
    pub value: Option<Expr>,
    /// For `pinky`: the variable this one is linked to.
    pub source: Option<Ident>,
}

/// `if c { } but c2 { } actually { }`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub body: Block,
    pub but_clauses: Vec<ButClause>,
    pub actually: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButClause {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

/// `check value { is T ... { } otherwise { } }`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckStmt {
    pub value: Expr,
    pub cases: Vec<CheckCase>,
    pub otherwise: Option<Block>,
}

/// One `is` arm. Every present constraint must hold for the arm to match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckCase {
    /// Acceptable type tags (`is Yep or Nope`). Empty matches any type.
    pub types: Vec<String>,
    /// `where <expr>`
    pub guard: Option<Expr>,
    /// `with key "name"`: the scrutinee must be a Blob holding this key.
    pub blob_key: Option<String>,
    /// `and mood Happy`: checked against the scrutinee variable.
    pub mood: Option<Mood>,
    /// `and trust < 50`
    pub state: Option<StateCheck>,
    pub body: Block,
    pub span: Span,
}

/// A comparison against one of the scrutinee variable's hidden attributes
/// (`trust`, `doubt`, `scars`, `age`, `bonds`).
#[derive(Debug, Clone, PartialEq)]
pub struct StateCheck {
    pub attribute: String,
    pub op: CmpOp,
    pub value: Expr,
}

/// Function declaration classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncKeyword {
    Does,
    /// Memoized.
    Did,
    /// Stub; an empty body yields `Dunno`.
    Will,
    /// Guarded by `condition`.
    Might,
    /// Penalized if never called.
    Should,
    /// Invoked once on declaration.
    Must,
}

impl FuncKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuncKeyword::Does => "does",
            FuncKeyword::Did => "did",
            FuncKeyword::Will => "will",
            FuncKeyword::Might => "might",
            FuncKeyword::Should => "should",
            FuncKeyword::Must => "must",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub keyword: FuncKeyword,
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
    /// `might ... when <condition>`
    pub condition: Option<Expr>,
    /// Hidden from `recall`.
    pub is_secret: bool,
}

/// `try { } cope e { } deny e { }`
#[derive(Debug, Clone, PartialEq)]
pub struct TryCope {
    pub body: Block,
    pub cope: Option<Handler>,
    pub deny: Option<Handler>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub param: Option<Ident>,
    pub body: Block,
}

/// `personality Name from Parent { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalityDef {
    pub name: Ident,
    pub parents: Vec<Ident>,
    pub traits: Vec<String>,
    pub body: Vec<Stmt>,
}

/// What a `when` listener waits for.
#[derive(Debug, Clone, PartialEq)]
pub enum WhenEvent {
    /// The target was assigned (scream variables only).
    Changes,
    /// The target's mood became this mood.
    Mood(Mood),
    /// SP crossed this threshold (target `sp`).
    Crosses(i64),
    /// A named event fired by `fulfill`.
    Named(String),
}

impl WhenEvent {
    /// Event key as stored in the listener table.
    pub fn key(&self) -> String {
        match self {
            WhenEvent::Changes => "changes".to_string(),
            WhenEvent::Mood(m) => format!("mood {m}"),
            WhenEvent::Crosses(n) => format!("crosses {n}"),
            WhenEvent::Named(name) => name.clone(),
        }
    }
}

/// `pray for <prayer>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prayer {
    Speed,
    Safety,
    Mercy,
    Chaos,
    Nothing,
}

impl Prayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Speed => "speed",
            Prayer::Safety => "safety",
            Prayer::Mercy => "mercy",
            Prayer::Chaos => "chaos",
            Prayer::Nothing => "nothing",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The variable name when this expression is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(id) => Some(&id.name),
            _ => None,
        }
    }

    /// The function name when this expression calls a plain identifier.
    pub fn called_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Call { callee, .. } => callee.as_identifier(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    NumberLit(f64),
    /// May contain `{name}` interpolation holes.
    WordLit(String),
    TruthLit(Truth),
    VoidLit,
    ListLit(Vec<Expr>),
    BlobLit(Vec<(Ident, Expr)>),

    // ── Access ──
    Identifier(Ident),
    Member { object: Box<Expr>, member: Ident },
    Index { object: Box<Expr>, index: Box<Expr> },

    // ── Operators ──
    /// `left_spaces`/`right_spaces` record the whitespace around the operator.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        left_spaces: u32,
        right_spaces: u32,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Comparison {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    Emotional {
        left: Box<Expr>,
        op: EmotionOp,
        right: Box<Expr>,
    },

    // ── Calls ──
    /// `f(args)` or `Module.f(args)` or `obj.method(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `séance(name)`
    Seance(Ident),
    /// `odds(expr)`
    Odds(Box<Expr>),
    /// `remember(x, n)`: the n-th historical value (1-based).
    Remember { variable: Ident, index: Box<Expr> },
    /// `become Personality(args)`
    Become { personality: Ident, args: Vec<Expr> },
    /// `graph.method(args)`
    Graph { method: Ident, args: Vec<Expr> },
    /// `sanity.method(args)`
    Sanity { method: Ident, args: Vec<Expr> },
    /// `read handle`
    Read(Ident),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    Yep,
    Nope,
    Dunno,
}

/// Arithmetic and concatenation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// `&`
    Concat,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
            BinOp::Concat => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `~=`
    Vibes,
    /// `==`
    Loose,
    /// `===`
    Strict,
    /// `====`: both sides name the same variable.
    Identity,
    /// Five to ten `=` signs: strict equality plus, cumulatively, equal
    /// mood, trust, age, scars, doubt and bond count.
    Deep(u8),
    NotEqual,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Vibes => "~=",
            CmpOp::Loose => "==",
            CmpOp::Strict => "===",
            CmpOp::Identity => "====",
            CmpOp::Deep(n) => &"=========="[..usize::from((*n).clamp(5, 10))],
            CmpOp::NotEqual => "!=",
            CmpOp::Less => "<",
            CmpOp::Greater => ">",
            CmpOp::LessEq => "<=",
            CmpOp::GreaterEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nor,
    ButNot,
    Xor,
    Unless,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Nor => "nor",
            LogicalOp::ButNot => "but not",
            LogicalOp::Xor => "xor",
            LogicalOp::Unless => "unless",
        }
    }
}

/// Relationship operators between two variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionOp {
    Loves,
    Hates,
    Fears,
    Envies,
    Ignores,
    Mirrors,
    Haunts,
    Forgets,
}

impl EmotionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionOp::Loves => "loves",
            EmotionOp::Hates => "hates",
            EmotionOp::Fears => "fears",
            EmotionOp::Envies => "envies",
            EmotionOp::Ignores => "ignores",
            EmotionOp::Mirrors => "mirrors",
            EmotionOp::Haunts => "haunts",
            EmotionOp::Forgets => "forgets",
        }
    }
}
