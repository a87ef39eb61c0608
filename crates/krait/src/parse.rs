use std::fmt;

use crate::{
    expressions::{
        AugTarget, BoolOperator, CmpOperator, ExceptHandler, Expr, ExprLoc, FunctionDef, ImportFromNames, Literal,
        Node, Operator, Param, UnpackTarget,
    },
    scan::{Keyword, Punct, Token, TokenKind, scan},
};

/// A scanner or parser failure.
///
/// Rendered as `expected <wanted> but found <found> at line <N>` for grammar
/// mismatches, or `<detail> at line <N>` for lexical failures. The first
/// error aborts the chunk; there is no recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseErrorKind {
    Expected {
        wanted: Vec<&'static str>,
        found: String,
    },
    Message(String),
}

impl ParseError {
    pub(crate) fn message(detail: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ParseErrorKind::Message(detail.into()),
            line,
        }
    }

    fn expected(wanted: &[&'static str], token: &Token) -> Self {
        Self {
            kind: ParseErrorKind::Expected {
                wanted: wanted.to_vec(),
                found: token.found_display(),
            },
            line: token.line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::Expected { wanted, found } => {
                write!(f, "expected {} but found {found} at line {}", join_wanted(wanted), self.line)
            }
            ParseErrorKind::Message(detail) => write!(f, "{detail} at line {}", self.line),
        }
    }
}

/// Joins grammar alternatives as `a`, `a or b`, or `a, b, or c`.
fn join_wanted(wanted: &[&'static str]) -> String {
    match wanted {
        [] => String::new(),
        [only] => (*only).to_owned(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

/// Grammar alternatives that can begin an expression, in diagnostic order.
const ATOM_STARTERS: &[&str] = &["(", "[", "{", "NAME", "NUMBER", "STRING"];

/// Parses a source chunk into a statement list.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, ParseError> {
    let tokens = scan(source)?;
    Parser { tokens, pos: 0 }.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek2_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn line(&self) -> u32 {
        self.peek().line
    }

    /// Advances past the current token; the trailing `EndMarker` is sticky.
    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !matches!(token.kind, TokenKind::EndMarker) {
            self.pos += 1;
        }
        token
    }

    fn at_op(&self, op: Punct) -> bool {
        matches!(self.peek_kind(), TokenKind::Op(p) if *p == op)
    }

    fn eat_op(&mut self, op: Punct) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Punct, wanted: &'static str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(ParseError::expected(&[wanted], self.peek()))
        }
    }

    fn at_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: Keyword, wanted: &'static str) -> Result<(), ParseError> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(ParseError::expected(&[wanted], self.peek()))
        }
    }

    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Name(_) => {
                let token = self.bump();
                match token.kind {
                    TokenKind::Name(name) => Ok(name),
                    _ => unreachable!("peeked a name token"),
                }
            }
            _ => Err(ParseError::expected(&["NAME"], self.peek())),
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.bump();
                Ok(())
            }
            _ => Err(ParseError::expected(&["NEWLINE"], self.peek())),
        }
    }

    /// Whether the current token can begin an expression.
    fn at_expr_start(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Name(_)
            | TokenKind::Int(_)
            | TokenKind::LongInt(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Keyword(Keyword::Not) => true,
            TokenKind::Op(op) => matches!(
                op,
                Punct::Minus | Punct::Plus | Punct::Tilde | Punct::LParen | Punct::LBracket | Punct::LBrace
            ),
            _ => false,
        }
    }

    fn parse_program(mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::EndMarker => break,
                TokenKind::Newline => {
                    self.bump();
                }
                _ => self.parse_stmt(&mut nodes)?,
            }
        }
        Ok(nodes)
    }

    fn parse_stmt(&mut self, out: &mut Vec<Node>) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::If) => {
                self.bump();
                out.push(self.parse_if_tail()?);
            }
            TokenKind::Keyword(Keyword::While) => out.push(self.parse_while()?),
            TokenKind::Keyword(Keyword::For) => out.push(self.parse_for()?),
            TokenKind::Keyword(Keyword::Def) => out.push(self.parse_def()?),
            TokenKind::Keyword(Keyword::Class) => out.push(self.parse_class()?),
            TokenKind::Keyword(Keyword::Try) => out.push(self.parse_try()?),
            _ => self.parse_simple_stmts(out)?,
        }
        Ok(())
    }

    /// One or more `;`-separated simple statements terminated by a newline.
    fn parse_simple_stmts(&mut self, out: &mut Vec<Node>) -> Result<(), ParseError> {
        loop {
            out.push(self.parse_simple_stmt()?);
            if self.eat_op(Punct::Semi) {
                if matches!(self.peek_kind(), TokenKind::Newline) {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect_newline()
    }

    fn parse_simple_stmt(&mut self) -> Result<Node, ParseError> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Pass) => {
                self.bump();
                Ok(Node::Pass)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                Ok(Node::Break)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                Ok(Node::Continue)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let value = if self.at_expr_start() {
                    Some(self.parse_testlist()?)
                } else {
                    None
                };
                Ok(Node::Return(value))
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.bump();
                let value = if self.at_expr_start() {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(Node::Raise(value))
            }
            TokenKind::Keyword(Keyword::Assert) => {
                self.bump();
                let test = self.parse_test()?;
                let msg = if self.eat_op(Punct::Comma) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                Ok(Node::Assert { test, msg })
            }
            TokenKind::Keyword(Keyword::Global) => {
                self.bump();
                let mut names = vec![self.expect_name()?];
                // No trailing comma here: `global a, b,` is a syntax error.
                while self.eat_op(Punct::Comma) {
                    names.push(self.expect_name()?);
                }
                Ok(Node::Global { names })
            }
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::From) => self.parse_import_from(),
            TokenKind::Name(name) if name == "del" && matches!(self.peek2_kind(), Some(TokenKind::Op(Punct::LParen))) => {
                self.parse_del()
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// `del(x)` or `del(c, k)`; `del` stays a soft keyword so the call shape
    /// is required.
    fn parse_del(&mut self) -> Result<Node, ParseError> {
        self.bump();
        self.expect_op(Punct::LParen, "(")?;
        let mut items = Vec::new();
        if !self.at_op(Punct::RParen) {
            loop {
                items.push(self.parse_test()?);
                if self.eat_op(Punct::Comma) {
                    if self.at_op(Punct::RParen) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect_op(Punct::RParen, ")")?;
        Ok(Node::Del { items })
    }

    fn parse_import(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let modules = self.parse_alias_list()?;
        Ok(Node::Import { modules })
    }

    fn parse_import_from(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let module = self.expect_name()?;
        self.expect_kw(Keyword::Import, "import")?;
        if self.eat_op(Punct::Star) {
            return Ok(Node::ImportFrom {
                module,
                names: ImportFromNames::Star,
            });
        }
        let names = self.parse_alias_list()?;
        Ok(Node::ImportFrom {
            module,
            names: ImportFromNames::Names(names),
        })
    }

    /// `NAME [as NAME] (, NAME [as NAME])* [,]`; the trailing comma is
    /// permitted, unlike in `global`.
    fn parse_alias_list(&mut self) -> Result<Vec<(String, Option<String>)>, ParseError> {
        let mut names = Vec::new();
        loop {
            let name = self.expect_name()?;
            let alias = if self.eat_kw(Keyword::As) {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push((name, alias));
            if self.eat_op(Punct::Comma) {
                if matches!(self.peek_kind(), TokenKind::Name(_)) {
                    continue;
                }
                break;
            }
            break;
        }
        Ok(names)
    }

    fn parse_expr_stmt(&mut self) -> Result<Node, ParseError> {
        let first = self.parse_testlist()?;
        if self.at_op(Punct::Assign) {
            let mut targets = vec![to_target(first)?];
            loop {
                self.bump();
                let next = self.parse_testlist()?;
                if self.at_op(Punct::Assign) {
                    targets.push(to_target(next)?);
                } else {
                    return Ok(Node::Assign { targets, object: next });
                }
            }
        }
        let aug = match self.peek_kind() {
            TokenKind::Op(Punct::PlusAssign) => Some(Operator::Add),
            TokenKind::Op(Punct::MinusAssign) => Some(Operator::Sub),
            TokenKind::Op(Punct::StarAssign) => Some(Operator::Mult),
            TokenKind::Op(Punct::SlashAssign) => Some(Operator::Div),
            TokenKind::Op(Punct::PercentAssign) => Some(Operator::Mod),
            TokenKind::Op(Punct::AmpAssign) => Some(Operator::BitAnd),
            TokenKind::Op(Punct::PipeAssign) => Some(Operator::BitOr),
            _ => None,
        };
        if let Some(op) = aug {
            self.bump();
            let object = self.parse_testlist()?;
            let target = to_aug_target(first)?;
            return Ok(Node::OpAssign { target, op, object });
        }
        Ok(Node::Expr(first))
    }

    // --- compound statements ---

    /// The common tail of `if` and `elif`: an `elif` chain becomes a nested
    /// `If` in the else branch.
    fn parse_if_tail(&mut self) -> Result<Node, ParseError> {
        let test = self.parse_test()?;
        let body = self.parse_suite()?;
        let or_else = if self.eat_kw(Keyword::Elif) {
            vec![self.parse_if_tail()?]
        } else if self.eat_kw(Keyword::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Node::If { test, body, or_else })
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let test = self.parse_test()?;
        let body = self.parse_suite()?;
        let or_else = if self.eat_kw(Keyword::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Node::While { test, body, or_else })
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let target = to_target(self.parse_target_list()?)?;
        self.expect_kw(Keyword::In, "in")?;
        let iter = self.parse_testlist()?;
        let body = self.parse_suite()?;
        let or_else = if self.eat_kw(Keyword::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Node::For {
            target,
            iter,
            body,
            or_else,
        })
    }

    fn parse_def(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let name = self.expect_name()?;
        self.expect_op(Punct::LParen, "(")?;
        let mut params = Vec::new();
        if !self.at_op(Punct::RParen) {
            loop {
                let pname = self.expect_name()?;
                let default = if self.eat_op(Punct::Assign) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                params.push(Param { name: pname, default });
                if self.eat_op(Punct::Comma) {
                    if self.at_op(Punct::RParen) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect_op(Punct::RParen, ")")?;
        let body = self.parse_suite()?;
        Ok(Node::FunctionDef(FunctionDef {
            name,
            params,
            body: body.into(),
        }))
    }

    fn parse_class(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let name = self.expect_name()?;
        let base = if self.eat_op(Punct::LParen) {
            let base = if self.at_op(Punct::RParen) {
                None
            } else {
                Some(self.parse_test()?)
            };
            self.expect_op(Punct::RParen, ")")?;
            base
        } else {
            None
        };
        let body = self.parse_suite()?;
        Ok(Node::ClassDef { name, base, body })
    }

    fn parse_try(&mut self) -> Result<Node, ParseError> {
        self.bump();
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while self.at_kw(Keyword::Except) {
            self.bump();
            let (test, name) = if self.at_op(Punct::Colon) {
                (None, None)
            } else {
                let test = self.parse_test()?;
                let name = if self.eat_kw(Keyword::As) {
                    Some(self.expect_name()?)
                } else {
                    None
                };
                (Some(test), name)
            };
            let handler_body = self.parse_suite()?;
            handlers.push(ExceptHandler {
                test,
                name,
                body: handler_body,
            });
        }
        let or_else = if self.eat_kw(Keyword::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        let finally = if self.eat_kw(Keyword::Finally) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finally.is_empty() {
            return Err(ParseError::expected(&["except", "finally"], self.peek()));
        }
        Ok(Node::Try {
            body,
            handlers,
            or_else,
            finally,
        })
    }

    /// A suite is either an indented block or simple statements on the
    /// header line after the `:`.
    fn parse_suite(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect_op(Punct::Colon, ":")?;
        let mut body = Vec::new();
        if matches!(self.peek_kind(), TokenKind::Newline) {
            self.bump();
            match self.peek_kind() {
                TokenKind::Indent => {
                    self.bump();
                }
                _ => return Err(ParseError::expected(&["INDENT"], self.peek())),
            }
            loop {
                self.parse_stmt(&mut body)?;
                if matches!(self.peek_kind(), TokenKind::Dedent) {
                    self.bump();
                    break;
                }
            }
        } else {
            self.parse_simple_stmts(&mut body)?;
        }
        Ok(body)
    }

    // --- expressions ---

    /// A comma-separated expression list: one comma forms a tuple, and a
    /// trailing comma forces one even with a single element.
    fn parse_testlist(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let first = self.parse_test()?;
        if !self.at_op(Punct::Comma) {
            return Ok(first);
        }
        let mut elems = vec![first];
        while self.eat_op(Punct::Comma) {
            if !self.at_expr_start() {
                break;
            }
            elems.push(self.parse_test()?);
        }
        Ok(ExprLoc::new(line, Expr::Tuple(elems)))
    }

    /// Loop targets parse below comparison level so the `in` of a `for`
    /// header is not swallowed as an operator.
    fn parse_target_list(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let first = self.parse_bitor()?;
        if !self.at_op(Punct::Comma) {
            return Ok(first);
        }
        let mut elems = vec![first];
        while self.eat_op(Punct::Comma) {
            if !self.at_expr_start() {
                break;
            }
            elems.push(self.parse_bitor()?);
        }
        Ok(ExprLoc::new(line, Expr::Tuple(elems)))
    }

    fn parse_test(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let body = self.parse_or_test()?;
        if self.eat_kw(Keyword::If) {
            let test = self.parse_or_test()?;
            self.expect_kw(Keyword::Else, "else")?;
            let orelse = self.parse_test()?;
            return Ok(ExprLoc::new(
                line,
                Expr::IfElse {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
            ));
        }
        Ok(body)
    }

    fn parse_or_test(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut left = self.parse_and_test()?;
        while self.eat_kw(Keyword::Or) {
            let right = self.parse_and_test()?;
            left = ExprLoc::new(
                line,
                Expr::BoolOp {
                    left: Box::new(left),
                    op: BoolOperator::Or,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_and_test(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut left = self.parse_not_test()?;
        while self.eat_kw(Keyword::And) {
            let right = self.parse_not_test()?;
            left = ExprLoc::new(
                line,
                Expr::BoolOp {
                    left: Box::new(left),
                    op: BoolOperator::And,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_not_test(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        if self.eat_kw(Keyword::Not) {
            let operand = self.parse_not_test()?;
            return Ok(ExprLoc::new(line, Expr::Not(Box::new(operand))));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let left = self.parse_bitor()?;
        let mut comparisons = Vec::new();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Op(Punct::EqEq) => CmpOperator::Eq,
                TokenKind::Op(Punct::NotEq) => CmpOperator::NotEq,
                TokenKind::Op(Punct::Lt) => CmpOperator::Lt,
                TokenKind::Op(Punct::LtE) => CmpOperator::LtE,
                TokenKind::Op(Punct::Gt) => CmpOperator::Gt,
                TokenKind::Op(Punct::GtE) => CmpOperator::GtE,
                TokenKind::Keyword(Keyword::In) => CmpOperator::In,
                TokenKind::Keyword(Keyword::Not)
                    if matches!(self.peek2_kind(), Some(TokenKind::Keyword(Keyword::In))) =>
                {
                    self.bump();
                    CmpOperator::NotIn
                }
                _ => break,
            };
            self.bump();
            comparisons.push((op, self.parse_bitor()?));
        }
        match comparisons.len() {
            0 => Ok(left),
            1 => {
                let (op, right) = comparisons.pop().expect("one comparison");
                Ok(ExprLoc::new(
                    line,
                    Expr::CmpOp {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                ))
            }
            _ => Ok(ExprLoc::new(
                line,
                Expr::ChainCmp {
                    left: Box::new(left),
                    comparisons,
                },
            )),
        }
    }

    fn parse_bitor(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut left = self.parse_bitand()?;
        while self.eat_op(Punct::Pipe) {
            let right = self.parse_bitand()?;
            left = binary(line, left, Operator::BitOr, right);
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut left = self.parse_arith()?;
        while self.eat_op(Punct::Amp) {
            let right = self.parse_arith()?;
            left = binary(line, left, Operator::BitAnd, right);
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat_op(Punct::Plus) {
                Operator::Add
            } else if self.eat_op(Punct::Minus) {
                Operator::Sub
            } else {
                break;
            };
            let right = self.parse_term()?;
            left = binary(line, left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.eat_op(Punct::Star) {
                Operator::Mult
            } else if self.eat_op(Punct::Slash) {
                Operator::Div
            } else if self.eat_op(Punct::Percent) {
                Operator::Mod
            } else {
                break;
            };
            let right = self.parse_factor()?;
            left = binary(line, left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        if self.eat_op(Punct::Minus) {
            let operand = self.parse_factor()?;
            return Ok(ExprLoc::new(line, Expr::UnaryMinus(Box::new(operand))));
        }
        if self.eat_op(Punct::Plus) {
            let operand = self.parse_factor()?;
            return Ok(ExprLoc::new(line, Expr::UnaryPlus(Box::new(operand))));
        }
        if self.eat_op(Punct::Tilde) {
            let operand = self.parse_factor()?;
            return Ok(ExprLoc::new(line, Expr::UnaryInvert(Box::new(operand))));
        }
        self.parse_trailer_expr()
    }

    /// Left-associative trailer application: calls, subscripts, attributes.
    fn parse_trailer_expr(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op(Punct::LParen) {
                let mut args = Vec::new();
                if !self.at_op(Punct::RParen) {
                    loop {
                        args.push(self.parse_test()?);
                        if self.eat_op(Punct::Comma) {
                            if self.at_op(Punct::RParen) {
                                break;
                            }
                            continue;
                        }
                        break;
                    }
                }
                self.expect_op(Punct::RParen, ")")?;
                expr = ExprLoc::new(
                    line,
                    Expr::Call {
                        callable: Box::new(expr),
                        args,
                    },
                );
            } else if self.eat_op(Punct::LBracket) {
                expr = self.parse_subscript(line, expr)?;
            } else if self.eat_op(Punct::Dot) {
                let attr = self.expect_name()?;
                expr = ExprLoc::new(
                    line,
                    Expr::AttrGet {
                        object: Box::new(expr),
                        attr,
                    },
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Inside `[...]`: a top-level `:` makes a slice, otherwise an index.
    fn parse_subscript(&mut self, line: u32, object: ExprLoc) -> Result<ExprLoc, ParseError> {
        let expr = if self.eat_op(Punct::Colon) {
            let upper = if self.at_op(Punct::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_test()?))
            };
            Expr::Slice {
                object: Box::new(object),
                lower: None,
                upper,
            }
        } else {
            let index = self.parse_test()?;
            if self.eat_op(Punct::Colon) {
                let upper = if self.at_op(Punct::RBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_test()?))
                };
                Expr::Slice {
                    object: Box::new(object),
                    lower: Some(Box::new(index)),
                    upper,
                }
            } else {
                Expr::Subscript {
                    object: Box::new(object),
                    index: Box::new(index),
                }
            }
        };
        self.expect_op(Punct::RBracket, "]")?;
        Ok(ExprLoc::new(line, expr))
    }

    fn parse_atom(&mut self) -> Result<ExprLoc, ParseError> {
        let line = self.line();
        match self.peek_kind() {
            TokenKind::Name(_) => {
                let token = self.bump();
                match token.kind {
                    TokenKind::Name(name) => Ok(ExprLoc::new(line, Expr::Name(name))),
                    _ => unreachable!("peeked a name token"),
                }
            }
            TokenKind::Int(value) => {
                let value = *value;
                self.bump();
                Ok(ExprLoc::new(line, Expr::Literal(Literal::Int(value))))
            }
            TokenKind::LongInt(value) => {
                let value = value.clone();
                self.bump();
                Ok(ExprLoc::new(line, Expr::Literal(Literal::LongInt(value))))
            }
            TokenKind::Float(value) => {
                let value = *value;
                self.bump();
                Ok(ExprLoc::new(line, Expr::Literal(Literal::Float(value))))
            }
            TokenKind::Str(value) => {
                let value = value.clone();
                self.bump();
                Ok(ExprLoc::new(line, Expr::Literal(Literal::Str(value))))
            }
            TokenKind::Op(Punct::LParen) => {
                self.bump();
                if self.eat_op(Punct::RParen) {
                    return Ok(ExprLoc::new(line, Expr::Tuple(Vec::new())));
                }
                let first = self.parse_test()?;
                if self.at_op(Punct::Comma) {
                    let mut elems = vec![first];
                    while self.eat_op(Punct::Comma) {
                        if !self.at_expr_start() {
                            break;
                        }
                        elems.push(self.parse_test()?);
                    }
                    self.expect_op(Punct::RParen, ")")?;
                    return Ok(ExprLoc::new(line, Expr::Tuple(elems)));
                }
                self.expect_op(Punct::RParen, ")")?;
                // Parenthesized grouping: the inner expression stands alone.
                Ok(first)
            }
            TokenKind::Op(Punct::LBracket) => {
                self.bump();
                let mut elems = Vec::new();
                if !self.at_op(Punct::RBracket) {
                    loop {
                        elems.push(self.parse_test()?);
                        if self.eat_op(Punct::Comma) {
                            if self.at_op(Punct::RBracket) {
                                break;
                            }
                            continue;
                        }
                        break;
                    }
                }
                self.expect_op(Punct::RBracket, "]")?;
                Ok(ExprLoc::new(line, Expr::List(elems)))
            }
            TokenKind::Op(Punct::LBrace) => {
                self.bump();
                self.parse_brace_display(line)
            }
            _ => Err(ParseError::expected(ATOM_STARTERS, self.peek())),
        }
    }

    /// `{...}`: a dict if the first item carries a `:`, otherwise a set;
    /// empty braces are a dict.
    fn parse_brace_display(&mut self, line: u32) -> Result<ExprLoc, ParseError> {
        if self.eat_op(Punct::RBrace) {
            return Ok(ExprLoc::new(line, Expr::Dict(Vec::new())));
        }
        let first = self.parse_test()?;
        if self.eat_op(Punct::Colon) {
            let value = self.parse_test()?;
            let mut pairs = vec![(first, value)];
            while self.eat_op(Punct::Comma) {
                if !self.at_expr_start() {
                    break;
                }
                let key = self.parse_test()?;
                self.expect_op(Punct::Colon, ":")?;
                pairs.push((key, self.parse_test()?));
            }
            self.expect_op(Punct::RBrace, "}")?;
            return Ok(ExprLoc::new(line, Expr::Dict(pairs)));
        }
        let mut elems = vec![first];
        while self.eat_op(Punct::Comma) {
            if !self.at_expr_start() {
                break;
            }
            elems.push(self.parse_test()?);
        }
        self.expect_op(Punct::RBrace, "}")?;
        Ok(ExprLoc::new(line, Expr::Set(elems)))
    }
}

fn binary(line: u32, left: ExprLoc, op: Operator, right: ExprLoc) -> ExprLoc {
    ExprLoc::new(
        line,
        Expr::Op {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}

/// Reinterprets a parsed expression as an assignment target.
fn to_target(expr: ExprLoc) -> Result<UnpackTarget, ParseError> {
    let line = expr.line;
    match expr.expr {
        Expr::Name(name) => Ok(UnpackTarget::Name(name)),
        Expr::AttrGet { object, attr } => Ok(UnpackTarget::Attr {
            object: *object,
            attr,
        }),
        Expr::Subscript { object, index } => Ok(UnpackTarget::Subscript {
            object: *object,
            index: *index,
        }),
        Expr::Slice { object, lower, upper } => Ok(UnpackTarget::Slice {
            object: *object,
            lower: lower.map(|b| *b),
            upper: upper.map(|b| *b),
        }),
        Expr::Tuple(elems) | Expr::List(elems) => {
            let targets = elems.into_iter().map(to_target).collect::<Result<Vec<_>, _>>()?;
            Ok(UnpackTarget::Tuple(targets))
        }
        _ => Err(ParseError::message("cannot assign to expression", line)),
    }
}

/// Augmented assignment allows a single name, attribute, or subscript.
fn to_aug_target(expr: ExprLoc) -> Result<AugTarget, ParseError> {
    let line = expr.line;
    match expr.expr {
        Expr::Name(name) => Ok(AugTarget::Name(name)),
        Expr::AttrGet { object, attr } => Ok(AugTarget::Attr {
            object: *object,
            attr,
        }),
        Expr::Subscript { object, index } => Ok(AugTarget::Subscript {
            object: *object,
            index: *index,
        }),
        _ => Err(ParseError::message(
            "illegal expression for augmented assignment",
            line,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_assignment_collects_targets() {
        let nodes = parse("a = b = 1").unwrap();
        match &nodes[0] {
            Node::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn nested_tuple_targets_parse() {
        let nodes = parse("a, (b, c) = 0, (1, 2)").unwrap();
        match &nodes[0] {
            Node::Assign { targets, .. } => match &targets[0] {
                UnpackTarget::Tuple(outer) => {
                    assert!(matches!(outer[0], UnpackTarget::Name(_)));
                    assert!(matches!(outer[1], UnpackTarget::Tuple(_)));
                }
                other => panic!("expected tuple target, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn elif_chain_nests_in_else_branch() {
        let nodes = parse("if a:\n    b\nelif c:\n    d\nelse:\n    e").unwrap();
        match &nodes[0] {
            Node::If { or_else, .. } => {
                assert_eq!(or_else.len(), 1);
                assert!(matches!(or_else[0], Node::If { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn comparison_chain_becomes_one_node() {
        let nodes = parse("1 < 4 < 5").unwrap();
        match &nodes[0] {
            Node::Expr(e) => match &e.expr {
                Expr::ChainCmp { comparisons, .. } => assert_eq!(comparisons.len(), 2),
                other => panic!("expected chained comparison, got {other:?}"),
            },
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn missing_colon_reports_expected_colon() {
        let err = parse("if 1").unwrap_err();
        assert_eq!(err.to_string(), "expected : but found NEWLINE at line 1");
    }

    #[test]
    fn missing_expression_lists_atom_starters() {
        let err = parse("a = ").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected (, [, {, NAME, NUMBER, or STRING but found NEWLINE at line 1"
        );
    }
}
