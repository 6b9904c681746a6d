//! Expression sub-language used by function arguments, lambdas, exec blocks
//! and running sums
//!
//! A recursive descent parser produces an [`Expr`] tree which a [`Scope`]
//! evaluates against the current record, the report variables and the cell
//! being generated. Only the names listed below are reachable:
//!
//! - bare names: block temporaries, then record fields, then variables
//! - `record['f']`, `record.f` (and the lambda parameter in place of `record`)
//! - `vars['x']`, `vars.x`
//! - `cell.row`, `cell.col`, `cell.value`, `value`
//! - builtins `len str int float round abs min max upper lower strip`
//! - registered application functions as `pkg.fn(...)`

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::error::{ReportError, ReportResult};
use crate::format::percent_format;
use crate::functions::{FunctionContext, FunctionRegistry};
use crate::query::Record;
use crate::value::Value;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    /// Modulo, or `%` formatting with a string on the left
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    /// `object.name`
    Attr(Box<Expr>, String),
    /// `object[index]`
    Index(Box<Expr>, Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `then if cond else otherwise`
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    /// Builtin call `name(args)`
    Call { name: String, args: Vec<Expr> },
    /// `object.name(args)`: a registered `pkg.fn` or a string method
    Method {
        object: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

/// Statement of an exec block
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

/// Names that cannot be assigned to
const RESERVED: &[&str] = &["record", "cell", "vars"];

/// Parse a single expression
pub fn parse_expr(src: &str) -> ReportResult<Expr> {
    let mut parser = ExprParser::new(src, false);
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a comma separated argument list (possibly empty)
pub fn parse_args(src: &str) -> ReportResult<Vec<Expr>> {
    let mut parser = ExprParser::new(src, false);
    let mut args = Vec::new();
    if parser.current_token() == &Token::Eof {
        return Ok(args);
    }
    loop {
        args.push(parser.parse_expression()?);
        if parser.current_token() != &Token::Comma {
            break;
        }
        parser.consume();
    }
    parser.expect_end()?;
    Ok(args)
}

/// Parse a `;`/newline separated statement block
pub fn parse_block(src: &str) -> ReportResult<Vec<Stmt>> {
    let mut parser = ExprParser::new(src, true);
    let mut stmts = Vec::new();
    loop {
        while parser.current_token() == &Token::Separator {
            parser.consume();
        }
        if parser.current_token() == &Token::Eof {
            break;
        }
        stmts.push(parser.parse_statement()?);
        match parser.current_token() {
            Token::Separator | Token::Eof => {}
            other => {
                return Err(ReportError::eval(format!(
                    "expected end of statement, got {:?}",
                    other
                )))
            }
        }
    }
    Ok(stmts)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Name(String),

    // Keywords
    And,
    Or,
    Not,
    If,
    Else,
    True,
    False,
    None,

    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Assign,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Dot,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    /// `;` or a newline in block mode
    Separator,
    Invalid(String),
    Eof,
}

struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
    /// Newlines separate statements
    block: bool,
    /// Open parentheses/brackets; newlines inside them are whitespace
    depth: usize,
    current_token: Option<Token>,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str, block: bool) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            block,
            depth: 0,
            current_token: None,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.current_token = Some(self.scan_token());
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).map_or(false, |d| d.is_ascii_digit())) {
            return self.scan_number();
        }
        if c == '\'' || c == '"' {
            return self.scan_string(c);
        }
        if c.is_alphabetic() || c == '_' {
            return self.scan_name();
        }

        self.advance();
        let next = self.peek_char();
        let two = |parser: &mut Self, token: Token| {
            parser.advance();
            token
        };
        match c {
            '\n' | ';' => Token::Separator,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' if next == Some('/') => two(self, Token::DoubleSlash),
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' if next == Some('=') => two(self, Token::Equal),
            '=' => Token::Assign,
            '!' if next == Some('=') => two(self, Token::NotEqual),
            '<' if next == Some('=') => two(self, Token::LessEqual),
            '<' if next == Some('>') => two(self, Token::NotEqual),
            '<' => Token::LessThan,
            '>' if next == Some('=') => two(self, Token::GreaterEqual),
            '>' => Token::GreaterThan,
            '.' => Token::Dot,
            ',' => Token::Comma,
            '(' => {
                self.depth += 1;
                Token::LeftParen
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RightParen
            }
            '[' => {
                self.depth += 1;
                Token::LeftBracket
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RightBracket
            }
            other => Token::Invalid(other.to_string()),
        }
    }

    fn scan_string(&mut self, quote: char) -> Token {
        self.advance(); // opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            match c {
                c if c == quote => return Token::Str(s),
                '\\' => {
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(other) => other,
                        None => break,
                    };
                    s.push(escaped);
                    self.advance();
                }
                c => s.push(c),
            }
        }
        Token::Invalid(format!("unterminated string {}{}", quote, s))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let mantissa_end = self.pos;
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            if !self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.pos = mantissa_end;
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(text.to_string()),
        }
    }

    fn scan_name(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        match &self.input[start..self.pos] {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "if" => Token::If,
            "else" => Token::Else,
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None,
            name => Token::Name(name.to_string()),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            let separates = c == '\n' && self.block && self.depth == 0;
            if !c.is_whitespace() || separates {
                break;
            }
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> ReportResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(ReportError::eval(format!(
                "expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    fn expect_end(&mut self) -> ReportResult<()> {
        match self.current_token() {
            Token::Eof => Ok(()),
            other => Err(ReportError::eval(format!(
                "unexpected {:?} after expression",
                other
            ))),
        }
    }

    // === Statements ===

    fn parse_statement(&mut self) -> ReportResult<Stmt> {
        let expr = self.parse_expression()?;
        if self.current_token() != &Token::Assign {
            return Ok(Stmt::Expr(expr));
        }
        self.consume();
        let target = match expr {
            Expr::Name(name) if !RESERVED.contains(&name.as_str()) => name,
            Expr::Attr(object, attr)
                if attr == "value" && matches!(object.as_ref(), Expr::Name(n) if n == "cell") =>
            {
                "value".to_string()
            }
            other => {
                return Err(ReportError::eval(format!("cannot assign to {:?}", other)));
            }
        };
        let value = self.parse_expression()?;
        Ok(Stmt::Assign(target, value))
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Conditional: a if c else b
    // 2. or
    // 3. and
    // 4. not
    // 5. Comparison: == != < <= > >=
    // 6. Additive: + -
    // 7. Multiplicative: * / // %
    // 8. Unary: - +
    // 9. Postfix: .name [index] (args)
    // 10. Primary: literals, names, parentheses

    fn parse_expression(&mut self) -> ReportResult<Expr> {
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> ReportResult<Expr> {
        let then = self.parse_or()?;
        if self.current_token() != &Token::If {
            return Ok(then);
        }
        self.consume();
        let cond = self.parse_or()?;
        self.expect(&Token::Else)?;
        let otherwise = self.parse_conditional()?;
        Ok(Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> ReportResult<Expr> {
        let mut left = self.parse_and()?;
        while self.current_token() == &Token::Or {
            self.consume();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ReportResult<Expr> {
        let mut left = self.parse_not()?;
        while self.current_token() == &Token::And {
            self.consume();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ReportResult<Expr> {
        if self.current_token() == &Token::Not {
            self.consume();
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ReportResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::Ne,
                Token::LessThan => BinaryOp::Lt,
                Token::LessEqual => BinaryOp::Le,
                Token::GreaterThan => BinaryOp::Gt,
                Token::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };

            self.consume();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ReportResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ReportResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::DoubleSlash => BinaryOp::FloorDiv,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };

            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ReportResult<Expr> {
        let op = match self.current_token() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };
        self.consume();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ReportResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current_token() {
                Token::Dot => {
                    self.consume();
                    let name = match self.consume() {
                        Token::Name(name) => name,
                        other => {
                            return Err(ReportError::eval(format!(
                                "expected attribute name, got {:?}",
                                other
                            )))
                        }
                    };
                    if self.current_token() == &Token::LeftParen {
                        let args = self.parse_call_args()?;
                        expr = Expr::Method {
                            object: Box::new(expr),
                            name,
                            args,
                        };
                    } else {
                        expr = Expr::Attr(Box::new(expr), name);
                    }
                }
                Token::LeftBracket => {
                    self.consume();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RightBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::LeftParen => {
                    let name = match &expr {
                        Expr::Name(name) => name.clone(),
                        other => {
                            return Err(ReportError::eval(format!("{:?} is not callable", other)))
                        }
                    };
                    let args = self.parse_call_args()?;
                    expr = Expr::Call { name, args };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> ReportResult<Vec<Expr>> {
        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();
        while self.current_token() != &Token::RightParen {
            args.push(self.parse_expression()?);
            if self.current_token() == &Token::Comma {
                self.consume();
            } else {
                break;
            }
        }
        self.expect(&Token::RightParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ReportResult<Expr> {
        match self.consume() {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::None => Ok(Expr::Literal(Value::None)),
            Token::Name(name) => Ok(Expr::Name(name)),
            Token::LeftParen => self.parse_parenthesized(),
            Token::Invalid(text) => Err(ReportError::eval(format!("invalid token '{}'", text))),
            other => Err(ReportError::eval(format!("unexpected {:?}", other))),
        }
    }

    /// After `(`: a grouped expression or a tuple
    fn parse_parenthesized(&mut self) -> ReportResult<Expr> {
        if self.current_token() == &Token::RightParen {
            self.consume();
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_expression()?;
        if self.current_token() != &Token::Comma {
            self.expect(&Token::RightParen)?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.current_token() == &Token::Comma {
            self.consume();
            if self.current_token() == &Token::RightParen {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(&Token::RightParen)?;
        Ok(Expr::Tuple(items))
    }
}

/// The cell being generated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellInfo {
    pub row: u32,
    pub col: u32,
    /// Settable from exec blocks through `value`
    pub value: Value,
}

/// Evaluation environment for one cell
pub struct Scope<'a> {
    pub record: Option<Record<'a>>,
    /// Extra name bound to the record (a lambda parameter)
    pub record_alias: Option<&'a str>,
    pub variables: &'a BTreeMap<String, Value>,
    pub functions: &'a FunctionRegistry,
    pub cell: CellInfo,
    /// Exec block temporaries
    pub locals: HashMap<String, Value>,
}

impl<'a> Scope<'a> {
    pub fn new(
        record: Option<Record<'a>>,
        variables: &'a BTreeMap<String, Value>,
        functions: &'a FunctionRegistry,
        cell: CellInfo,
    ) -> Self {
        Self {
            record,
            record_alias: None,
            variables,
            functions,
            cell,
            locals: HashMap::new(),
        }
    }

    /// Run a statement block; assignments to `value` update [`Scope::cell`]
    pub fn exec(&mut self, stmts: &[Stmt]) -> ReportResult<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Assign(name, expr) => {
                    let value = self.eval(expr)?;
                    if name == "value" {
                        self.cell.value = value;
                    } else {
                        self.locals.insert(name.clone(), value);
                    }
                }
                Stmt::Expr(expr) => {
                    self.eval(expr)?;
                }
            }
        }
        Ok(())
    }

    pub fn eval(&self, expr: &Expr) -> ReportResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Name(name) => self.lookup(name),
            Expr::Attr(object, attr) => self.attribute(object, attr),
            Expr::Index(object, index) => self.index(object, index),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                let n = numeric(&value).ok_or_else(|| {
                    ReportError::eval(format!("bad operand type for unary {:?}: {}", op, value.type_name()))
                })?;
                Ok(Value::Number(match op {
                    UnaryOp::Neg => -n,
                    UnaryOp::Pos => n,
                }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.truthy())),
            Expr::Cond {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Tuple(items) => Ok(Value::Tuple(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<ReportResult<_>>()?,
            )),
            Expr::Call { name, args } => {
                let args = self.eval_all(args)?;
                builtin(name, &args)
            }
            Expr::Method { object, name, args } => {
                if let Expr::Name(package) = object.as_ref() {
                    let qualified = format!("{}.{}", package, name);
                    if self.functions.contains(&qualified) {
                        let args = self.eval_all(args)?;
                        return self.functions.call(&qualified, &args, &self.function_context());
                    }
                }
                if !matches!(name.as_str(), "upper" | "lower" | "strip") {
                    return Err(ReportError::eval(format!("unknown method or function '{}'", name)));
                }
                let mut all = vec![self.eval(object)?];
                all.extend(self.eval_all(args)?);
                builtin(name, &all)
            }
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> ReportResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    pub fn function_context(&self) -> FunctionContext<'a> {
        FunctionContext {
            record: self.record,
            variables: self.variables,
            row: self.cell.row,
            col: self.cell.col,
        }
    }

    fn is_record_name(&self, name: &str) -> bool {
        name == "record" || self.record_alias == Some(name)
    }

    fn lookup(&self, name: &str) -> ReportResult<Value> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if name == "value" {
            return Ok(self.cell.value.clone());
        }
        if self.is_record_name(name) {
            return Ok(self
                .record
                .map(|r| Value::Tuple(r.values().to_vec()))
                .unwrap_or_default());
        }
        if let Some(v) = self.record.and_then(|r| r.get(name)) {
            return Ok(v.clone());
        }
        if let Some(v) = self.variables.get(name) {
            return Ok(v.clone());
        }
        Err(ReportError::eval(format!("name '{}' is not defined", name)))
    }

    fn field(&self, field: &str) -> Value {
        match self.record.and_then(|r| r.get(field)) {
            Some(v) => v.clone(),
            None => {
                log::warn!("record has no field '{}'", field);
                Value::None
            }
        }
    }

    fn variable(&self, name: &str) -> Value {
        match self.variables.get(name) {
            Some(v) => v.clone(),
            None => {
                log::warn!("report variable '{}' is not defined", name);
                Value::None
            }
        }
    }

    fn attribute(&self, object: &Expr, attr: &str) -> ReportResult<Value> {
        if let Expr::Name(name) = object {
            if !self.locals.contains_key(name) {
                if self.is_record_name(name) {
                    return Ok(self.field(attr));
                }
                match (name.as_str(), attr) {
                    ("vars", _) => return Ok(self.variable(attr)),
                    ("cell", "row") => return Ok(Value::Number(self.cell.row as f64)),
                    ("cell", "col") => return Ok(Value::Number(self.cell.col as f64)),
                    ("cell", "value") => return Ok(self.cell.value.clone()),
                    _ => {}
                }
            }
        }
        Err(ReportError::eval(format!("unknown attribute '{}'", attr)))
    }

    fn index(&self, object: &Expr, index: &Expr) -> ReportResult<Value> {
        let key = self.eval(index)?;
        if let Expr::Name(name) = object {
            if !self.locals.contains_key(name) {
                if self.is_record_name(name) {
                    return Ok(self.field(&key.to_string()));
                }
                if name == "vars" {
                    return Ok(self.variable(&key.to_string()));
                }
            }
        }
        let target = self.eval(object)?;
        let i = match key {
            Value::Number(n) if n.fract() == 0.0 => n as i64,
            other => {
                return Err(ReportError::eval(format!(
                    "indices must be integers, not {}",
                    other.type_name()
                )))
            }
        };
        let item = match &target {
            Value::Tuple(items) => position(i, items.len()).map(|p| items[p].clone()),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                position(i, chars.len()).map(|p| Value::Str(chars[p].to_string()))
            }
            other => {
                return Err(ReportError::eval(format!(
                    "'{}' object is not subscriptable",
                    other.type_name()
                )))
            }
        };
        item.ok_or_else(|| ReportError::eval("index out of range"))
    }
}

/// Resolve a possibly negative index
fn position(i: i64, len: usize) -> Option<usize> {
    let p = if i < 0 { len as i64 + i } else { i };
    (0..len as i64).contains(&p).then_some(p as usize)
}

/// Numeric operand; strings never coerce in arithmetic
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> ReportResult<Value> {
    let unsupported = |left: &Value, right: &Value| {
        ReportError::eval(format!(
            "unsupported operand types for {:?}: {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ))
    };

    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left.loose_eq(&right))),
        BinaryOp::Ne => return Ok(Value::Bool(!left.loose_eq(&right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ord = left.compare(&right).ok_or_else(|| unsupported(&left, &right))?;
            return Ok(Value::Bool(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }));
        }
        _ => {}
    }

    match (op, &left, &right) {
        (BinaryOp::Mod, Value::Str(fmt), _) => {
            let args = match &right {
                Value::Tuple(items) => items.clone(),
                single => vec![single.clone()],
            };
            return percent_format(fmt, &args).map(Value::Str);
        }
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            return Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(s), n) | (BinaryOp::Mul, n, Value::Str(s)) => {
            if let Value::Number(count) = n {
                return Ok(Value::Str(s.repeat(count.max(0.0) as usize)));
            }
        }
        _ => {}
    }

    let (a, b) = match (numeric(&left), numeric(&right)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(&left, &right)),
    };
    let zero_check = || {
        if b == 0.0 {
            Err(ReportError::eval("division by zero"))
        } else {
            Ok(())
        }
    };
    Ok(Value::Number(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            zero_check()?;
            a / b
        }
        BinaryOp::FloorDiv => {
            zero_check()?;
            (a / b).floor()
        }
        BinaryOp::Mod => {
            zero_check()?;
            a - b * (a / b).floor()
        }
        _ => return Err(unsupported(&left, &right)),
    }))
}

fn builtin(name: &str, args: &[Value]) -> ReportResult<Value> {
    let arg = |i: usize| {
        args.get(i)
            .ok_or_else(|| ReportError::eval(format!("{}() missing argument {}", name, i + 1)))
    };
    let number = |v: &Value| {
        numeric(v).ok_or_else(|| {
            ReportError::eval(format!("{}() needs a number, not {}", name, v.type_name()))
        })
    };
    let text = |v: &Value| match v {
        Value::Str(s) => Ok(s.clone()),
        other => Err(ReportError::eval(format!(
            "{}() needs a string, not {}",
            name,
            other.type_name()
        ))),
    };

    Ok(match name {
        "len" => match arg(0)? {
            Value::Str(s) => Value::Number(s.chars().count() as f64),
            Value::Tuple(items) => Value::Number(items.len() as f64),
            other => {
                return Err(ReportError::eval(format!(
                    "object of type {} has no len()",
                    other.type_name()
                )))
            }
        },
        "str" => Value::Str(args.first().map(ToString::to_string).unwrap_or_default()),
        "int" | "float" => {
            let v = arg(0)?;
            let n = match v {
                Value::Str(s) => s.trim().parse::<f64>().ok(),
                other => numeric(other),
            }
            .ok_or_else(|| ReportError::eval(format!("invalid literal for {}(): '{}'", name, v)))?;
            Value::Number(if name == "int" { n.trunc() } else { n })
        }
        "round" => {
            let n = number(arg(0)?)?;
            let digits = match args.get(1) {
                Some(d) => number(d)? as i32,
                None => 0,
            };
            let scale = 10f64.powi(digits);
            Value::Number((n * scale).round() / scale)
        }
        "abs" => Value::Number(number(arg(0)?)?.abs()),
        "min" | "max" => {
            let items = match args {
                [Value::Tuple(items)] => items.as_slice(),
                _ => args,
            };
            let mut best: Option<&Value> = None;
            for item in items {
                best = Some(match best {
                    None => item,
                    Some(current) => {
                        let ord = item.compare(current).ok_or_else(|| {
                            ReportError::eval(format!("{}() cannot compare mixed values", name))
                        })?;
                        let better = if name == "min" {
                            ord == Ordering::Less
                        } else {
                            ord == Ordering::Greater
                        };
                        if better {
                            item
                        } else {
                            current
                        }
                    }
                });
            }
            best.cloned()
                .ok_or_else(|| ReportError::eval(format!("{}() arg is an empty sequence", name)))?
        }
        "upper" => Value::Str(text(arg(0)?)?.to_uppercase()),
        "lower" => Value::Str(text(arg(0)?)?.to_lowercase()),
        "strip" => Value::Str(text(arg(0)?)?.trim().to_string()),
        _ => return Err(ReportError::eval(format!("name '{}' is not callable", name))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryTable;
    use pretty_assertions::assert_eq;

    fn eval_with(src: &str, table: &QueryTable, vars: &BTreeMap<String, Value>) -> ReportResult<Value> {
        let functions = FunctionRegistry::new();
        let scope = Scope::new(
            table.records().next(),
            vars,
            &functions,
            CellInfo {
                row: 7,
                col: 3,
                value: Value::None,
            },
        );
        scope.eval(&parse_expr(src)?)
    }

    fn eval(src: &str) -> Value {
        let table = QueryTable::new(
            ["name", "amount", "dept"],
            vec![vec!["Ann".into(), 10.into(), "Eng".into()]],
        );
        let mut vars = BTreeMap::new();
        vars.insert("rate".to_string(), Value::Number(0.5));
        eval_with(src, &table, &vars).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("-2 * -3"), Value::Number(6.0));
        assert_eq!(eval("7 // 2 + 7 % 3"), Value::Number(4.0));
        assert_eq!(eval("-7 % 3"), Value::Number(2.0));
        assert_eq!(eval("1 < 2 and not 3 > 4"), Value::Bool(true));
        assert_eq!(eval("0 or 'x'"), Value::str("x"));
    }

    #[test]
    fn test_names_and_records() {
        assert_eq!(eval("amount * rate"), Value::Number(5.0));
        assert_eq!(eval("record['name'] + '/' + record.dept"), Value::str("Ann/Eng"));
        assert_eq!(eval("vars.rate"), Value::Number(0.5));
        assert_eq!(eval("(cell.row, cell.col)"), Value::Tuple(vec![7.into(), 3.into()]));
        assert_eq!(eval("record.missing"), Value::None);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let table = QueryTable::default();
        let vars = BTreeMap::new();
        assert!(eval_with("nobody + 1", &table, &vars).is_err());
        assert!(eval_with("open('x')", &table, &vars).is_err());
        assert!(eval_with("cell.__class__", &table, &vars).is_err());
    }

    #[test]
    fn test_conditional_and_formatting() {
        assert_eq!(eval("'big' if amount > 5 else 'small'"), Value::str("big"));
        assert_eq!(eval("'%s-%03d' % (name, amount)"), Value::str("Ann-010"));
        assert_eq!(eval("'%.2f' % None"), Value::str(""));
    }

    #[test]
    fn test_builtins() {
        assert_eq!(eval("len(name) + int('4.9')"), Value::Number(7.0));
        assert_eq!(eval("round(2.567, 2)"), Value::Number(2.57));
        assert_eq!(eval("max(3, amount, 7)"), Value::Number(10.0));
        assert_eq!(eval("min((4, 2, 9))"), Value::Number(2.0));
        assert_eq!(eval("upper(name) + ' ' + '  x '.strip()"), Value::str("ANN x"));
        assert_eq!(eval("str(amount) + str(True)"), Value::str("10True"));
        assert_eq!(eval("'ab'[-1]"), Value::str("b"));
    }

    #[test]
    fn test_registered_functions() {
        assert_eq!(eval("std.concat(name, '#', amount)"), Value::str("Ann#10"));
        assert_eq!(eval("std.row()"), Value::Number(7.0));
    }

    #[test]
    fn test_exec_block() {
        let table = QueryTable::new(["amount"], vec![vec![4.into()]]);
        let vars = BTreeMap::new();
        let functions = FunctionRegistry::new();
        let mut scope = Scope::new(table.records().next(), &vars, &functions, CellInfo::default());
        let block = parse_block("total = amount * 2; label = 'x'\nvalue = label + str(total)").unwrap();
        scope.exec(&block).unwrap();
        assert_eq!(scope.cell.value, Value::str("x8"));

        let block = parse_block("cell.value = (1,\n 2)").unwrap();
        scope.exec(&block).unwrap();
        assert_eq!(scope.cell.value, Value::Tuple(vec![1.into(), 2.into()]));

        assert!(parse_block("record = 1").is_err());
        assert!(parse_block("cell.row = 1").is_err());
        assert!(parse_block("a = 1 b = 2").is_err());
    }

    #[test]
    fn test_lambda_alias() {
        let table = QueryTable::new(["amount"], vec![vec![4.into()]]);
        let vars = BTreeMap::new();
        let functions = FunctionRegistry::new();
        let mut scope = Scope::new(table.records().next(), &vars, &functions, CellInfo::default());
        scope.record_alias = Some("r");
        assert_eq!(scope.eval(&parse_expr("r.amount * 2").unwrap()).unwrap(), Value::Number(8.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expr("1 +").is_err());
        assert!(parse_expr("'open").is_err());
        assert!(parse_expr("a b").is_err());
        assert!(parse_expr("1 if 2").is_err());
        assert_eq!(parse_args("").unwrap(), vec![]);
        assert_eq!(parse_args("1, 'a'").unwrap().len(), 2);
    }
}
