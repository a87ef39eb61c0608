use std::rc::Rc;

use num_bigint::BigInt;

/// A literal constant produced by the scanner.
///
/// Literals are detached from the runtime heap: they become real `Value`s
/// (allocating for strings and big integers) only when evaluated.
#[derive(Debug, Clone)]
pub(crate) enum Literal {
    Int(i64),
    /// Integer literal exceeding the i64 range.
    LongInt(BigInt),
    Float(f64),
    Str(String),
}

/// An expression with the source line it started on.
#[derive(Debug, Clone)]
pub(crate) struct ExprLoc {
    pub line: u32,
    pub expr: Expr,
}

impl ExprLoc {
    pub(crate) fn new(line: u32, expr: Expr) -> Self {
        Self { line, expr }
    }
}

/// An expression in the AST.
///
/// `True`, `False`, and `None` are not literals: the scanner emits them as
/// names and they resolve through the root environment like any other
/// binding.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Literal),
    Name(String),
    Tuple(Vec<ExprLoc>),
    List(Vec<ExprLoc>),
    /// Set display: `{1, 2, 3}`. `{}` is always a dict.
    Set(Vec<ExprLoc>),
    Dict(Vec<(ExprLoc, ExprLoc)>),
    /// Arithmetic or bitwise binary operation.
    Op {
        left: Box<ExprLoc>,
        op: Operator,
        right: Box<ExprLoc>,
    },
    /// A single comparison: `a < b`.
    CmpOp {
        left: Box<ExprLoc>,
        op: CmpOperator,
        right: Box<ExprLoc>,
    },
    /// Chained comparison: `a < b < c`.
    ///
    /// Each interior operand is evaluated once, and the chain short-circuits
    /// on the first false link.
    ChainCmp {
        left: Box<ExprLoc>,
        comparisons: Vec<(CmpOperator, ExprLoc)>,
    },
    /// Short-circuit `and` / `or`; yields the determining operand value.
    BoolOp {
        left: Box<ExprLoc>,
        op: BoolOperator,
        right: Box<ExprLoc>,
    },
    Not(Box<ExprLoc>),
    UnaryMinus(Box<ExprLoc>),
    UnaryPlus(Box<ExprLoc>),
    UnaryInvert(Box<ExprLoc>),
    /// Conditional expression: `body if test else orelse`.
    IfElse {
        test: Box<ExprLoc>,
        body: Box<ExprLoc>,
        orelse: Box<ExprLoc>,
    },
    Call {
        callable: Box<ExprLoc>,
        args: Vec<ExprLoc>,
    },
    AttrGet {
        object: Box<ExprLoc>,
        attr: String,
    },
    Subscript {
        object: Box<ExprLoc>,
        index: Box<ExprLoc>,
    },
    /// Slice expression `object[lower:upper]`; either bound may be omitted.
    Slice {
        object: Box<ExprLoc>,
        lower: Option<Box<ExprLoc>>,
        upper: Option<Box<ExprLoc>>,
    },
}

/// Target of an assignment or `for` loop binding.
///
/// Supports recursive structures like `a, (b, c)`. Built by the parser from
/// an already-parsed expression; anything else is a syntax error.
#[derive(Debug, Clone)]
pub(crate) enum UnpackTarget {
    Name(String),
    Attr {
        object: ExprLoc,
        attr: String,
    },
    Subscript {
        object: ExprLoc,
        index: ExprLoc,
    },
    /// Slice target: `xs[a:b] = ...` replaces the clipped range.
    Slice {
        object: ExprLoc,
        lower: Option<ExprLoc>,
        upper: Option<ExprLoc>,
    },
    Tuple(Vec<Self>),
}

/// Target of an augmented assignment; tuples are excluded by the grammar.
#[derive(Debug, Clone)]
pub(crate) enum AugTarget {
    Name(String),
    Attr { object: ExprLoc, attr: String },
    Subscript { object: ExprLoc, index: ExprLoc },
}

/// A function parameter: name plus optional default expression.
///
/// Defaults are evaluated once, at definition time.
#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub name: String,
    pub default: Option<ExprLoc>,
}

/// A function definition: `def name(params): body`.
#[derive(Debug, Clone)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Rc<[Node]>,
}

/// One `except` clause of a `try` statement.
///
/// `test` is `None` for a bare `except:`; otherwise the handler matches when
/// the evaluated test equals the raised value. `name` binds the caught value
/// for `except E as n:`.
#[derive(Debug, Clone)]
pub(crate) struct ExceptHandler {
    pub test: Option<ExprLoc>,
    pub name: Option<String>,
    pub body: Vec<Node>,
}

/// Name list of a `from ... import` statement.
#[derive(Debug, Clone)]
pub(crate) enum ImportFromNames {
    Star,
    Names(Vec<(String, Option<String>)>),
}

/// A statement in the AST.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Pass,
    Expr(ExprLoc),
    /// Assignment `targets = value`, including chains `a = b = value`:
    /// the value is evaluated once and assigned to each target in turn.
    Assign {
        targets: Vec<UnpackTarget>,
        object: ExprLoc,
    },
    /// Augmented assignment: `target OP= value`, evaluating the target's
    /// object/index subexpressions once.
    OpAssign {
        target: AugTarget,
        op: Operator,
        object: ExprLoc,
    },
    /// `del(x)` unbinds the name `x`; `del(c, k)` removes item or attribute
    /// `k` from container `c`.
    Del {
        items: Vec<ExprLoc>,
    },
    If {
        test: ExprLoc,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    /// `while test: body [else: or_else]`; the else block runs iff the loop
    /// terminated without `break`.
    While {
        test: ExprLoc,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    For {
        target: UnpackTarget,
        iter: ExprLoc,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    Break,
    Continue,
    Return(Option<ExprLoc>),
    FunctionDef(FunctionDef),
    ClassDef {
        name: String,
        base: Option<ExprLoc>,
        body: Vec<Node>,
    },
    Try {
        body: Vec<Node>,
        handlers: Vec<ExceptHandler>,
        or_else: Vec<Node>,
        finally: Vec<Node>,
    },
    /// `raise expr` raises the value; bare `raise` re-raises the exception
    /// currently being handled.
    Raise(Option<ExprLoc>),
    Assert {
        test: ExprLoc,
        msg: Option<ExprLoc>,
    },
    /// Parsed but unevaluated; raises `UnimplementedError` when executed.
    Global {
        names: Vec<String>,
    },
    Import {
        modules: Vec<(String, Option<String>)>,
    },
    ImportFrom {
        module: String,
        names: ImportFromNames,
    },
}

/// Binary operators for arithmetic and bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    BitAnd,
    BitOr,
}

impl Operator {
    /// The source symbol, used in operand-type error messages.
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
        }
    }
}

/// Defined separately since these operators always return a bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    /// Parsed but unevaluated; raises `UnimplementedError`.
    In,
    /// Parsed but unevaluated; raises `UnimplementedError`.
    NotIn,
}

impl CmpOperator {
    /// The source symbol, used in ordering error messages.
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// Short-circuit boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoolOperator {
    And,
    Or,
}
