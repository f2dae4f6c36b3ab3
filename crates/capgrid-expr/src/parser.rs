//! Recursive-descent parser producing a [`Program`].
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, `== !=`, `< <= > >=`,
//! `+ -`, `* / %`, unary `- !`, then postfix calls, member access and
//! indexing. Outside brackets a line break ends the current statement.

use crate::error::{EvalError, EvalResult};
use crate::lexer::{tokenize, Token, TokenKind};

/// Maximum syntactic nesting (brackets, unary operators, postfix
/// operators, sub-expressions).
const MAX_NESTING: usize = 64;

/// Maximum height of a compiled expression tree. The interpreter enforces
/// the same bound, so anything that compiles stays within it.
pub(crate) const MAX_DEPTH: usize = 256;

/// Maximum operands joined by binary operators in one run.
const MAX_OPERANDS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<Expr>),
    Record(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    /// A left-to-right run of binary operators: `first op1 e1 op2 e2 ...`
    /// evaluates as `((first op1 e1) op2 e2) ...`.
    Binary(Box<Expr>, Vec<(BinaryOp, Expr)>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
}

impl Expr {
    /// Height of the tree. Walks with an explicit stack.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(expr.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Ident(_) => {
                Vec::new()
            }
            Expr::Array(items) => items.iter().collect(),
            Expr::Record(fields) => fields.iter().map(|(_, value)| value).collect(),
            Expr::Unary(_, operand) | Expr::Member(operand, _) => vec![operand.as_ref()],
            Expr::Binary(first, rest) => std::iter::once(first.as_ref())
                .chain(rest.iter().map(|(_, operand)| operand))
                .collect(),
            Expr::Conditional(cond, then, otherwise) => {
                vec![cond.as_ref(), then.as_ref(), otherwise.as_ref()]
            }
            Expr::Index(target, index) => vec![target.as_ref(), index.as_ref()],
            Expr::Call(callee, args) => std::iter::once(callee.as_ref()).chain(args).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(String, Expr),
    Expr(Expr),
    Return(Expr),
}

/// A parsed expression script, ready to run any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub(crate) statements: Vec<Stmt>,
}

impl Program {
    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }
}

impl Stmt {
    fn expr(&self) -> &Expr {
        match self {
            Stmt::Let(_, expr) | Stmt::Expr(expr) | Stmt::Return(expr) => expr,
        }
    }
}

/// Parse `source` without evaluating it.
pub fn compile(source: &str) -> EvalResult<Program> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens, source.len());
    let statements = parser.parse_all()?;
    if statements.is_empty() {
        return Err(EvalError::Empty);
    }
    if statements.iter().any(|stmt| stmt.expr().depth() > MAX_DEPTH) {
        return Err(EvalError::syntax(
            0,
            format!("expression nested deeper than {MAX_DEPTH}"),
        ));
    }
    Ok(Program { statements })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    /// Open `(`/`[`/`{` around the current position.
    depth: usize,
    /// Recursion depth of `parse_expr`/`parse_unary` plus the postfix
    /// operators applied so far.
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
            nesting: 0,
        }
    }

    fn parse_all(&mut self) -> EvalResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while self.skip_separators() {
            statements.push(self.parse_statement()?);
            if !self.eof() && !self.check_symbol(";") && !self.at_line_break() {
                return Err(self.unexpected());
            }
        }
        Ok(statements)
    }

    fn skip_separators(&mut self) -> bool {
        while self.check_symbol(";") {
            self.pos += 1;
        }
        !self.eof()
    }

    fn parse_statement(&mut self) -> EvalResult<Stmt> {
        match self.peek_ident() {
            Some("let" | "const" | "var") => {
                self.pos += 1;
                let name = self.expect_ident()?;
                self.expect_symbol("=")?;
                let value = self.parse_expr()?;
                Ok(Stmt::Let(name, value))
            }
            Some("return") => {
                self.pos += 1;
                Ok(Stmt::Return(self.parse_expr()?))
            }
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_expr(&mut self) -> EvalResult<Expr> {
        self.nested(Self::parse_conditional)
    }

    fn nested(&mut self, parse: fn(&mut Self) -> EvalResult<Expr>) -> EvalResult<Expr> {
        self.enter()?;
        let expr = parse(self);
        self.nesting -= 1;
        expr
    }

    fn enter(&mut self) -> EvalResult<()> {
        if self.nesting >= MAX_NESTING {
            return Err(EvalError::syntax(
                self.current_pos(),
                "expression nested too deeply",
            ));
        }
        self.nesting += 1;
        Ok(())
    }

    fn parse_conditional(&mut self) -> EvalResult<Expr> {
        let cond = self.parse_binary(0)?;
        if self.continues_with("?") {
            self.pos += 1;
            let then = self.parse_expr()?;
            self.expect_symbol(":")?;
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Conditional(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    /// Precedence climbing over the binary operator table. Operators met
    /// at this level are collected into one flat run.
    fn parse_binary(&mut self, min_level: usize) -> EvalResult<Expr> {
        let first = self.parse_unary()?;
        let mut rest = Vec::new();
        while let Some((op, level)) = self.peek_binary_op() {
            if level < min_level {
                break;
            }
            if rest.len() + 1 >= MAX_OPERANDS {
                return Err(EvalError::syntax(
                    self.current_pos(),
                    format!("more than {MAX_OPERANDS} operands in one expression"),
                ));
            }
            self.pos += 1;
            rest.push((op, self.parse_binary(level + 1)?));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        Ok(Expr::Binary(Box::new(first), rest))
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        let token = self.peek()?;
        if token.newline_before && self.depth == 0 {
            return None;
        }
        let TokenKind::Symbol(sym) = token.kind else {
            return None;
        };
        let entry = match sym {
            "||" => (BinaryOp::Or, 0),
            "&&" => (BinaryOp::And, 1),
            "==" => (BinaryOp::Eq, 2),
            "!=" => (BinaryOp::Ne, 2),
            "<" => (BinaryOp::Lt, 3),
            "<=" => (BinaryOp::Le, 3),
            ">" => (BinaryOp::Gt, 3),
            ">=" => (BinaryOp::Ge, 3),
            "+" => (BinaryOp::Add, 4),
            "-" => (BinaryOp::Sub, 4),
            "*" => (BinaryOp::Mul, 5),
            "/" => (BinaryOp::Div, 5),
            "%" => (BinaryOp::Rem, 5),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        if self.check_symbol("-") {
            self.pos += 1;
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        if self.check_symbol("!") {
            self.pos += 1;
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> EvalResult<Expr> {
        let outer = self.nesting;
        let expr = self.parse_postfix_chain();
        self.nesting = outer;
        expr
    }

    /// Each member access, index or call counts as one level of nesting.
    fn parse_postfix_chain(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if !self.continues_with(".")
                && !self.continues_with("[")
                && !self.continues_with("(")
            {
                return Ok(expr);
            }
            self.enter()?;
            if self.continues_with(".") {
                self.pos += 1;
                let field = self.expect_ident()?;
                expr = Expr::Member(Box::new(expr), field);
            } else if self.continues_with("[") {
                self.pos += 1;
                self.depth += 1;
                let index = self.parse_expr()?;
                self.close("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.continues_with("(") {
                self.pos += 1;
                let args = self.parse_list(")")?;
                expr = Expr::Call(Box::new(expr), args);
            }
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        let token = self.next().ok_or_else(|| self.eof_error())?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" | "undefined" => Expr::Null,
                _ => Expr::Ident(name),
            }),
            TokenKind::Symbol("(") => {
                self.depth += 1;
                let inner = self.parse_expr()?;
                self.close(")")?;
                Ok(inner)
            }
            TokenKind::Symbol("[") => Ok(Expr::Array(self.parse_list("]")?)),
            TokenKind::Symbol("{") => self.parse_record(),
            TokenKind::Symbol(sym) => Err(EvalError::syntax(
                token.pos,
                format!("unexpected `{sym}`"),
            )),
        }
    }

    /// Comma-separated expressions up to `close`; the opener is consumed.
    fn parse_list(&mut self, close: &'static str) -> EvalResult<Vec<Expr>> {
        self.depth += 1;
        let mut items = Vec::new();
        while !self.check_symbol(close) {
            items.push(self.parse_expr()?);
            if !self.check_symbol(close) {
                self.expect_symbol(",")?;
            }
        }
        self.close(close)?;
        Ok(items)
    }

    fn parse_record(&mut self) -> EvalResult<Expr> {
        self.depth += 1;
        let mut fields = Vec::new();
        while !self.check_symbol("}") {
            let token = self.next().ok_or_else(|| self.eof_error())?;
            let key = match token.kind {
                TokenKind::Ident(name) | TokenKind::Str(name) => name,
                _ => return Err(EvalError::syntax(token.pos, "expected field name")),
            };
            self.expect_symbol(":")?;
            fields.push((key, self.parse_expr()?));
            if !self.check_symbol("}") {
                self.expect_symbol(",")?;
            }
        }
        self.close("}")?;
        Ok(Expr::Record(fields))
    }

    fn close(&mut self, sym: &'static str) -> EvalResult<()> {
        self.expect_symbol(sym)?;
        self.depth -= 1;
        Ok(())
    }

    // ── token helpers ────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_ident(&self) -> Option<&str> {
        match &self.peek()?.kind {
            TokenKind::Ident(name) => Some(name.as_str()),
            _ => None,
        }
    }

    fn check_symbol(&self, sym: &str) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == sym)
    }

    fn at_line_break(&self) -> bool {
        self.peek().is_some_and(|t| t.newline_before)
    }

    /// Like `check_symbol`, but a line break at top level ends the
    /// statement instead.
    fn continues_with(&self, sym: &str) -> bool {
        self.check_symbol(sym) && (self.depth > 0 || !self.at_line_break())
    }

    fn expect_symbol(&mut self, sym: &str) -> EvalResult<()> {
        if self.check_symbol(sym) {
            self.pos += 1;
            Ok(())
        } else if self.eof() {
            Err(self.eof_error())
        } else {
            Err(EvalError::syntax(
                self.current_pos(),
                format!("expected `{sym}`"),
            ))
        }
    }

    fn expect_ident(&mut self) -> EvalResult<String> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => Ok(name),
            Some(token) => Err(EvalError::syntax(token.pos, "expected identifier")),
            None => Err(self.eof_error()),
        }
    }

    fn current_pos(&self) -> usize {
        self.peek().map(|t| t.pos).unwrap_or(self.end)
    }

    fn unexpected(&self) -> EvalError {
        EvalError::syntax(self.current_pos(), "unexpected token")
    }

    fn eof_error(&self) -> EvalError {
        EvalError::syntax(self.end, "unexpected end of input")
    }
}
