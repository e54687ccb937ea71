//! Small expression language for `<if test>`, `<bind value>` and `${...}` substitution.
//!
//! Grammar (lowest to highest precedence):
//!   or       := and (("or" | "||") and)*
//!   and      := equality (("and" | "&&") equality)*
//!   equality := relation (("==" | "!=" | "eq" | "neq") relation)*
//!   relation := additive (("<" | "<=" | ">" | ">=" | "lt" | "lte" | "gt" | "gte") additive)*
//!   additive := term (("+" | "-") term)*
//!   term     := unary (("*" | "/") unary)*
//!   unary    := ("!" | "not" | "-") unary | primary
//!   primary  := literal | path | "(" or ")"
//! Parsed trees are cached process-wide by source text.

use super::context::{DynamicContext, PARAMETER_OBJECT_KEY};
use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp { Eq, Ne, Lt, Le, Gt, Ge, Add, Sub, Mul, Div, And, Or }

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted identifier path, e.g. `name` or `user.name`.
    Path(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

static EXPRESSION_CACHE: Lazy<RwLock<HashMap<String, Arc<Expr>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Parse (or fetch the cached parse of) an expression.
pub fn parse_expression(source: &str) -> MapperResult<Arc<Expr>> {
    if let Some(e) = EXPRESSION_CACHE.read().get(source) {
        return Ok(e.clone());
    }
    let parsed = Arc::new(Parser::new(source)?.parse()?);
    let mut w = EXPRESSION_CACHE.write();
    Ok(w.entry(source.to_string()).or_insert(parsed).clone())
}

pub fn cached_expression_count() -> usize { EXPRESSION_CACHE.read().len() }

pub fn evaluate(source: &str, ctx: &DynamicContext<'_>) -> MapperResult<Value> {
    let expr = parse_expression(source)?;
    eval(&expr, source, ctx)
}

pub fn evaluate_boolean(source: &str, ctx: &DynamicContext<'_>) -> MapperResult<bool> {
    evaluate(source, ctx).map(|v| is_truthy(&v))
}

/// Booleans are taken literally, numeric zero is false, null is false, anything else is true.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Long(l) => *l != 0,
        Value::Double(d) => *d != 0.0,
        Value::Text(_) | Value::Timestamp(_) => true,
    }
}

fn resolve(path: &str, source: &str, ctx: &DynamicContext<'_>) -> MapperResult<Value> {
    if let Some(v) = ctx.binding(path) { return Ok(v.clone()); }
    let param = ctx.parameter();
    if path == PARAMETER_OBJECT_KEY {
        return Ok(match (param.scalar(), param.meta()) {
            (Some(v), _) => v,
            (None, Some(_)) => Value::Text(param.describe()),
            (None, None) => Value::Null,
        });
    }
    let property = path.strip_prefix("_parameter.").unwrap_or(path);
    if let Some(meta) = param.meta() {
        return match meta.find_property(property) {
            Some(name) => meta.get_value(&name),
            None => Err(MapperError::expression(source, format!("no property '{}' on {}", property, meta.type_name()))),
        };
    }
    if let Some(v) = param.scalar() {
        if !property.contains('.') { return Ok(v); }
        return Err(MapperError::expression(source, format!("cannot navigate '{}' on a scalar parameter", property)));
    }
    Ok(Value::Null)
}

fn eval(expr: &Expr, source: &str, ctx: &DynamicContext<'_>) -> MapperResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path(p) => resolve(p, source, ctx),
        Expr::Not(e) => Ok(Value::Bool(!is_truthy(&eval(e, source, ctx)?))),
        Expr::Neg(e) => match eval(e, source, ctx)? {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| MapperError::expression(source, "integer overflow")),
            Value::Long(l) => l.checked_neg().map(Value::Long).ok_or_else(|| MapperError::expression(source, "integer overflow")),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(MapperError::expression(source, format!("cannot negate {:?}", other))),
        },
        Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
            if !is_truthy(&eval(lhs, source, ctx)?) { return Ok(Value::Bool(false)); }
            Ok(Value::Bool(is_truthy(&eval(rhs, source, ctx)?)))
        }
        Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
            if is_truthy(&eval(lhs, source, ctx)?) { return Ok(Value::Bool(true)); }
            Ok(Value::Bool(is_truthy(&eval(rhs, source, ctx)?)))
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, source, ctx)?;
            let r = eval(rhs, source, ctx)?;
            binary(*op, l, r, source)
        }
    }
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => match (l.as_i64(), r.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => l.as_f64().zip(r.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        },
    }
}

fn binary(op: BinaryOp, l: Value, r: Value, source: &str) -> MapperResult<Value> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (&l, &r) {
                (Value::Null, Value::Null) => true,
                (Value::Null, _) | (_, Value::Null) => false,
                _ => compare(&l, &r) == Some(Ordering::Equal),
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if l.is_null() || r.is_null() { return Ok(Value::Bool(false)); }
            let ord = compare(&l, &r).ok_or_else(|| MapperError::expression(source, format!("cannot compare {:?} with {:?}", l, r)))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinaryOp::Add if matches!(l, Value::Text(_)) || matches!(r, Value::Text(_)) => {
            Ok(Value::Text(format!("{}{}", l, r)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, &l, &r, source),
        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(match op {
            BinaryOp::And => is_truthy(&l) && is_truthy(&r),
            _ => is_truthy(&l) || is_truthy(&r),
        })),
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value, source: &str) -> MapperResult<Value> {
    let bad = || MapperError::expression(source, format!("invalid operands {:?} and {:?}", l, r));
    if !l.is_numeric() || !r.is_numeric() { return Err(bad()); }
    let both_int = matches!((l, r), (Value::Int(_), Value::Int(_)));
    if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
        let out = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            _ => {
                if b == 0 { return Err(MapperError::expression(source, "division by zero")); }
                a.checked_div(b)
            }
        }.ok_or_else(|| MapperError::expression(source, "integer overflow"))?;
        return Ok(match i32::try_from(out) {
            Ok(i) if both_int => Value::Int(i),
            _ => Value::Long(out),
        });
    }
    let (a, b) = l.as_f64().zip(r.as_f64()).ok_or_else(bad)?;
    Ok(Value::Double(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => a / b,
    }))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(String),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(source: &str) -> MapperResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() { i += 1; continue; }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') { i += 1; }
            out.push(Token::Num(chars[start..i].iter().collect()));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') { i += 1; }
            out.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        if c == '\'' || c == '"' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i).copied() {
                    None => return Err(MapperError::expression(source, "unterminated string literal")),
                    Some('\\') if i + 1 < chars.len() => { s.push(chars[i + 1]); i += 2; }
                    Some(ch) if ch == c => { i += 1; break; }
                    Some(ch) => { s.push(ch); i += 1; }
                }
            }
            out.push(Token::Str(s));
            continue;
        }
        if c == '(' { out.push(Token::LParen); i += 1; continue; }
        if c == ')' { out.push(Token::RParen); i += 1; continue; }
        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        let op2 = ["==", "!=", "<=", ">=", "&&", "||"].into_iter().find(|o| *o == two);
        if let Some(op) = op2 { out.push(Token::Op(op)); i += 2; continue; }
        let op1 = ["<", ">", "!", "+", "-", "*", "/"].into_iter().find(|o| o.starts_with(c));
        match op1 {
            Some(op) => { out.push(Token::Op(op)); i += 1; }
            None => return Err(MapperError::expression(source, format!("unexpected character '{}'", c))),
        }
    }
    Ok(out)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> MapperResult<Self> {
        Ok(Self { source, tokens: tokenize(source)?, pos: 0 })
    }

    fn err(&self, msg: impl Into<String>) -> MapperError { MapperError::expression(self.source, msg) }

    fn parse(mut self) -> MapperResult<Expr> {
        if self.tokens.is_empty() { return Err(self.err("empty expression")); }
        let e = self.or()?;
        match self.tokens.get(self.pos) {
            None => Ok(e),
            Some(t) => Err(self.err(format!("unexpected token {:?}", t))),
        }
    }

    /// Consume the next token when it is one of `ops` (symbols) or `words` (keywords).
    fn eat(&mut self, ops: &[&str], words: &[&str]) -> Option<String> {
        let hit = match self.tokens.get(self.pos) {
            Some(Token::Op(o)) if ops.contains(o) => Some(o.to_string()),
            Some(Token::Ident(w)) => words.iter().find(|k| k.eq_ignore_ascii_case(w)).map(|k| k.to_string()),
            _ => None,
        };
        if hit.is_some() { self.pos += 1; }
        hit
    }

    fn binary_level(&mut self, ops: &[&str], words: &[&str], next: fn(&mut Self) -> MapperResult<Expr>) -> MapperResult<Expr> {
        let mut lhs = next(self)?;
        while let Some(tok) = self.eat(ops, words) {
            let op = match tok.as_str() {
                "||" | "or" => BinaryOp::Or,
                "&&" | "and" => BinaryOp::And,
                "==" | "eq" => BinaryOp::Eq,
                "!=" | "neq" => BinaryOp::Ne,
                "<" | "lt" => BinaryOp::Lt,
                "<=" | "lte" => BinaryOp::Le,
                ">" | "gt" => BinaryOp::Gt,
                ">=" | "gte" => BinaryOp::Ge,
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                "*" => BinaryOp::Mul,
                _ => BinaryOp::Div,
            };
            let rhs = next(self)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn or(&mut self) -> MapperResult<Expr> { self.binary_level(&["||"], &["or"], Self::and) }
    fn and(&mut self) -> MapperResult<Expr> { self.binary_level(&["&&"], &["and"], Self::equality) }
    fn equality(&mut self) -> MapperResult<Expr> { self.binary_level(&["==", "!="], &["eq", "neq"], Self::relation) }
    fn relation(&mut self) -> MapperResult<Expr> { self.binary_level(&["<", "<=", ">", ">="], &["lt", "lte", "gt", "gte"], Self::additive) }
    fn additive(&mut self) -> MapperResult<Expr> { self.binary_level(&["+", "-"], &[], Self::term) }
    fn term(&mut self) -> MapperResult<Expr> { self.binary_level(&["*", "/"], &[], Self::unary) }

    fn unary(&mut self) -> MapperResult<Expr> {
        if self.eat(&["!"], &["not"]).is_some() { return Ok(Expr::Not(Box::new(self.unary()?))); }
        if self.eat(&["-"], &[]).is_some() { return Ok(Expr::Neg(Box::new(self.unary()?))); }
        self.primary()
    }

    fn primary(&mut self) -> MapperResult<Expr> {
        let tok = self.tokens.get(self.pos).cloned().ok_or_else(|| self.err("unexpected end of expression"))?;
        self.pos += 1;
        match tok {
            Token::LParen => {
                let e = self.or()?;
                if self.tokens.get(self.pos) != Some(&Token::RParen) { return Err(self.err("expected ')'")); }
                self.pos += 1;
                Ok(e)
            }
            Token::Num(n) => {
                if n.contains('.') {
                    n.parse::<f64>().map(|d| Expr::Literal(Value::Double(d))).map_err(|_| self.err(format!("bad number '{}'", n)))
                } else {
                    let l: i64 = n.parse().map_err(|_| self.err(format!("bad number '{}'", n)))?;
                    Ok(Expr::Literal(i32::try_from(l).map(Value::Int).unwrap_or(Value::Long(l))))
                }
            }
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::Ident(id) => Ok(match id.as_str() {
                "null" => Expr::Literal(Value::Null),
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                _ if id.ends_with('.') || id.contains("..") => return Err(self.err(format!("malformed path '{}'", id))),
                _ => Expr::Path(id),
            }),
            other => Err(self.err(format!("unexpected token {:?}", other))),
        }
    }
}
