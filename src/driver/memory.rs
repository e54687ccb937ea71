//! In-process relational store implementing the driver contract.
//!
//! Understands a small SQL dialect, enough to run mapped statements end to end:
//!   SELECT <cols|*> FROM t [WHERE c <op> x [AND ...]] [ORDER BY c [ASC|DESC]]
//!   INSERT INTO t (c1, c2, ...) VALUES (x1, x2, ...)
//!   UPDATE t SET c1 = x1, ... [WHERE ...]
//!   DELETE FROM t [WHERE ...]
//! where operands are `?` placeholders or literals (numbers, 'quoted strings', NULL, TRUE,
//! FALSE) and <op> is one of = != <> < <= > >= or IS [NOT] NULL.
//!
//! Autocommit connections write straight to the shared tables. Other connections work on a
//! private copy taken at their first write; rollback drops it. Commit publishes only the
//! tables the transaction wrote, so commits touching different tables all survive. Two
//! transactions writing the same table are last-commit-wins for that table.

use super::{ColumnMeta, Connection, DataSource, DriverError, DriverResult, PreparedStatement, ResultSet};
use crate::ident::normalize_identifier;
use crate::value::{JdbcType, Value, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub jdbc_type: JdbcType,
    pub auto_increment: bool,
}

impl ColumnSpec {
    pub fn new<S: Into<String>>(name: S, jdbc_type: JdbcType) -> Self {
        Self { name: name.into(), jdbc_type, auto_increment: false }
    }
    pub fn auto_increment(mut self) -> Self { self.auto_increment = true; self }
}

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<ColumnSpec>,
    next_id: i64,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn column_index(&self, name: &str) -> DriverResult<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DriverError::with_state(format!("column '{}' not found", name), "42703"))
    }
}

type Tables = HashMap<String, Table>;

/// Shared handle to one in-memory database; clones see the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    executed: Arc<AtomicU64>,
    open_statements: Arc<AtomicI64>,
}

impl MemoryDatabase {
    pub fn new() -> Self { Self::default() }

    pub fn create_table(&self, name: &str, columns: Vec<ColumnSpec>) -> DriverResult<()> {
        if columns.iter().filter(|c| c.auto_increment).count() > 1 {
            return Err(DriverError::new("at most one auto-increment column is supported"));
        }
        let key = normalize_identifier(name);
        let mut g = self.tables.lock();
        if g.contains_key(&key) {
            return Err(DriverError::with_state(format!("table '{}' already exists", name), "42P07"));
        }
        g.insert(key, Table { columns, next_id: 1, rows: Vec::new() });
        Ok(())
    }

    /// Number of statements executed (queries and updates) since creation.
    pub fn executed_statements(&self) -> u64 { self.executed.load(AtomicOrdering::SeqCst) }

    /// Statements prepared but not yet closed.
    pub fn open_statements(&self) -> i64 { self.open_statements.load(AtomicOrdering::SeqCst) }

    /// Committed row count of a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().get(&normalize_identifier(table)).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn connect(&self, autocommit: bool) -> MemoryConnection {
        MemoryConnection { db: self.clone(), autocommit, pending: None, touched: HashSet::new(), closed: false }
    }
}

impl DataSource for MemoryDatabase {
    fn connection(&self, autocommit: bool) -> DriverResult<Box<dyn Connection>> {
        Ok(Box::new(self.connect(autocommit)))
    }
}

pub struct MemoryConnection {
    db: MemoryDatabase,
    autocommit: bool,
    pending: Option<Tables>,
    /// Tables written through `pending`.
    touched: HashSet<String>,
    closed: bool,
}

impl MemoryConnection {
    fn run<R>(&mut self, write: bool, f: impl FnOnce(&mut Tables) -> DriverResult<R>) -> DriverResult<R> {
        if self.closed { return Err(DriverError::with_state("connection is closed", "08003")); }
        if self.autocommit {
            let mut g = self.db.tables.lock();
            return f(&mut g);
        }
        if self.pending.is_none() && write {
            self.pending = Some(self.db.tables.lock().clone());
        }
        match self.pending.as_mut() {
            Some(p) => f(p),
            None => {
                let mut g = self.db.tables.lock();
                f(&mut g)
            }
        }
    }
}

impl Connection for MemoryConnection {
    fn prepare<'c>(&'c mut self, sql: &str, return_generated_keys: bool) -> DriverResult<Box<dyn PreparedStatement + 'c>> {
        if self.closed { return Err(DriverError::with_state("connection is closed", "08003")); }
        let (command, param_count) = parse_command(sql)?;
        self.db.open_statements.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(Box::new(MemoryStatement {
            conn: self,
            sql: sql.to_string(),
            command,
            params: vec![None; param_count],
            return_generated_keys,
            generated: None,
            closed: false,
        }))
    }

    fn commit(&mut self) -> DriverResult<()> {
        if let Some(mut p) = self.pending.take() {
            let mut tables = self.db.tables.lock();
            for name in self.touched.drain() {
                if let Some(t) = p.remove(&name) {
                    tables.insert(name, t);
                }
            }
        }
        self.touched.clear();
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.pending = None;
        self.touched.clear();
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.pending = None;
        self.touched.clear();
        self.closed = true;
        Ok(())
    }

    fn is_autocommit(&self) -> bool { self.autocommit }
}

struct MemoryStatement<'c> {
    conn: &'c mut MemoryConnection,
    sql: String,
    command: Command,
    params: Vec<Option<Value>>,
    return_generated_keys: bool,
    generated: Option<ResultSet>,
    closed: bool,
}

impl MemoryStatement<'_> {
    fn check_index(&self, index: usize) -> DriverResult<()> {
        if self.closed { return Err(DriverError::new("statement is closed")); }
        if index == 0 || index > self.params.len() {
            return Err(DriverError::with_state(format!("parameter index {} out of range 1..={}", index, self.params.len()), "07009"));
        }
        Ok(())
    }

    fn bound_params(&self) -> DriverResult<Vec<Value>> {
        self.params.iter().enumerate()
            .map(|(i, p)| p.clone().ok_or_else(|| DriverError::with_state(format!("parameter #{} is not bound", i + 1), "07001")))
            .collect()
    }
}

impl PreparedStatement for MemoryStatement<'_> {
    fn sql(&self) -> &str { &self.sql }

    fn set_value(&mut self, index: usize, value: Value) -> DriverResult<()> {
        self.check_index(index)?;
        self.params[index - 1] = Some(value);
        Ok(())
    }

    fn set_null(&mut self, index: usize, _jdbc_type: JdbcType) -> DriverResult<()> {
        self.check_index(index)?;
        self.params[index - 1] = Some(Value::Null);
        Ok(())
    }

    fn execute_query(&mut self) -> DriverResult<ResultSet> {
        let params = self.bound_params()?;
        let Command::Select { table, columns, conditions, order } = &self.command else {
            return Err(DriverError::new("execute_query requires a SELECT statement"));
        };
        self.conn.db.executed.fetch_add(1, AtomicOrdering::SeqCst);
        debug!(target: "sqlmapper::driver", "memory query: {}", self.sql);
        self.conn.run(false, |tables| {
            let t = lookup_table(tables, table)?;
            let filter = compile_conditions(t, conditions, &params)?;
            let mut rows: Vec<&Vec<Value>> = t.rows.iter().filter(|r| filter.iter().all(|c| c.matches(r))).collect();
            if let Some((col, desc)) = order {
                let idx = t.column_index(col)?;
                rows.sort_by(|a, b| {
                    let o = compare(&a[idx], &b[idx]).unwrap_or_else(|| a[idx].is_null().cmp(&b[idx].is_null()));
                    if *desc { o.reverse() } else { o }
                });
            }
            let projection: Vec<usize> = match columns {
                None => (0..t.columns.len()).collect(),
                Some(cols) => cols.iter().map(|c| t.column_index(c)).collect::<DriverResult<_>>()?,
            };
            let meta = projection.iter().map(|&i| ColumnMeta::new(t.columns[i].name.clone(), t.columns[i].jdbc_type)).collect();
            let data = rows.into_iter().map(|r| projection.iter().map(|&i| r[i].clone()).collect()).collect();
            Ok(ResultSet::new(meta, data))
        })
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        let params = self.bound_params()?;
        self.conn.db.executed.fetch_add(1, AtomicOrdering::SeqCst);
        debug!(target: "sqlmapper::driver", "memory update: {}", self.sql);
        let want_keys = self.return_generated_keys;
        let command = &self.command;
        let (count, keys) = self.conn.run(true, |tables| match command {
            Command::Select { .. } => Err(DriverError::new("execute_update cannot run a SELECT statement")),
            Command::Insert { table, columns, values } => {
                let t = lookup_table_mut(tables, table)?;
                let mut row = vec![Value::Null; t.columns.len()];
                for (col, operand) in columns.iter().zip(values.iter()) {
                    let idx = t.column_index(col)?;
                    row[idx] = coerce(operand.resolve(&params)?, t.columns[idx].jdbc_type)?;
                }
                let mut key = None;
                if let Some(idx) = t.columns.iter().position(|c| c.auto_increment) {
                    if row[idx].is_null() {
                        row[idx] = coerce(Value::Long(t.next_id), t.columns[idx].jdbc_type)?;
                    }
                    let assigned = row[idx].as_i64().unwrap_or(t.next_id);
                    t.next_id = t.next_id.max(assigned + 1);
                    key = Some((ColumnMeta::new(t.columns[idx].name.clone(), t.columns[idx].jdbc_type), row[idx].clone()));
                }
                t.rows.push(row);
                Ok((1u64, key))
            }
            Command::Update { table, assignments, conditions } => {
                let t = lookup_table_mut(tables, table)?;
                let filter = compile_conditions(t, conditions, &params)?;
                let mut sets = Vec::with_capacity(assignments.len());
                for (col, operand) in assignments {
                    let idx = t.column_index(col)?;
                    sets.push((idx, coerce(operand.resolve(&params)?, t.columns[idx].jdbc_type)?));
                }
                let mut count = 0u64;
                for row in t.rows.iter_mut().filter(|r| filter.iter().all(|c| c.matches(r))) {
                    for (idx, v) in &sets { row[*idx] = v.clone(); }
                    count += 1;
                }
                Ok((count, None))
            }
            Command::Delete { table, conditions } => {
                let t = lookup_table_mut(tables, table)?;
                let filter = compile_conditions(t, conditions, &params)?;
                let before = t.rows.len();
                t.rows.retain(|r| !filter.iter().all(|c| c.matches(r)));
                Ok(((before - t.rows.len()) as u64, None))
            }
        })?;
        if !self.conn.autocommit {
            self.conn.touched.insert(self.command.table().to_string());
        }
        if want_keys {
            self.generated = Some(match keys {
                Some((meta, v)) => ResultSet::new(vec![meta], vec![vec![v]]),
                None => ResultSet::default(),
            });
        }
        Ok(count)
    }

    fn generated_keys(&mut self) -> DriverResult<ResultSet> {
        if !self.return_generated_keys {
            return Err(DriverError::new("generated keys were not requested when the statement was prepared"));
        }
        Ok(self.generated.clone().unwrap_or_default())
    }

    fn close(&mut self) -> DriverResult<()> {
        if !self.closed {
            self.closed = true;
            self.conn.db.open_statements.fetch_sub(1, AtomicOrdering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemoryStatement<'_> {
    fn drop(&mut self) { let _ = self.close(); }
}

fn lookup_table<'t>(tables: &'t Tables, name: &str) -> DriverResult<&'t Table> {
    tables.get(name).ok_or_else(|| DriverError::with_state(format!("table '{}' not found", name), "42P01"))
}

fn lookup_table_mut<'t>(tables: &'t mut Tables, name: &str) -> DriverResult<&'t mut Table> {
    tables.get_mut(name).ok_or_else(|| DriverError::with_state(format!("table '{}' not found", name), "42P01"))
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => a.as_f64().zip(b.as_f64()).and_then(|(x, y)| x.partial_cmp(&y)),
        },
    }
}

/// Converts a value to the representation stored for a column of the given wire type.
fn coerce(v: Value, jdbc: JdbcType) -> DriverResult<Value> {
    let bad = |v: &Value| DriverError::with_state(format!("cannot store {:?} in a {} column", v, jdbc), "22018");
    Ok(match (jdbc, v) {
        (_, Value::Null) => Value::Null,
        (JdbcType::Integer, Value::Long(l)) => Value::Int(i32::try_from(l).map_err(|_| bad(&Value::Long(l)))?),
        (JdbcType::Integer, Value::Text(s)) => Value::Int(s.trim().parse().map_err(|_| bad(&Value::Text(s.clone())))?),
        (JdbcType::BigInt, Value::Int(i)) => Value::Long(i as i64),
        (JdbcType::BigInt, Value::Text(s)) => Value::Long(s.trim().parse().map_err(|_| bad(&Value::Text(s.clone())))?),
        (JdbcType::Float | JdbcType::Double | JdbcType::Decimal, v @ (Value::Int(_) | Value::Long(_))) => Value::Double(v.as_f64().unwrap_or_default()),
        (JdbcType::Varchar | JdbcType::Char, Value::Text(s)) => Value::Text(s),
        (JdbcType::Varchar | JdbcType::Char, other) => Value::Text(other.to_string()),
        (JdbcType::Timestamp, Value::Text(s)) => Value::Timestamp(
            NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map_err(|_| bad(&Value::Text(s.clone())))?,
        ),
        (JdbcType::Boolean, v @ (Value::Int(_) | Value::Long(_))) => Value::Bool(v.as_i64() != Some(0)),
        (_, other) => other,
    })
}

// ---------------------------------------------------------------------------------------------
// Statement model and parser
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Operand {
    Param(usize),
    Literal(Value),
}

impl Operand {
    fn resolve(&self, params: &[Value]) -> DriverResult<Value> {
        match self {
            Operand::Param(i) => params.get(*i - 1).cloned().ok_or_else(|| DriverError::with_state(format!("parameter #{} is not bound", i), "07001")),
            Operand::Literal(v) => Ok(v.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp { Eq, Ne, Lt, Le, Gt, Ge, IsNull, IsNotNull }

#[derive(Debug, Clone)]
struct Condition {
    column: String,
    op: CompareOp,
    operand: Option<Operand>,
}

struct CompiledCondition {
    index: usize,
    op: CompareOp,
    value: Value,
}

impl CompiledCondition {
    fn matches(&self, row: &[Value]) -> bool {
        let v = &row[self.index];
        match self.op {
            CompareOp::IsNull => v.is_null(),
            CompareOp::IsNotNull => !v.is_null(),
            op => match compare(v, &self.value) {
                None => false,
                Some(o) => match op {
                    CompareOp::Eq => o == Ordering::Equal,
                    CompareOp::Ne => o != Ordering::Equal,
                    CompareOp::Lt => o == Ordering::Less,
                    CompareOp::Le => o != Ordering::Greater,
                    CompareOp::Gt => o == Ordering::Greater,
                    CompareOp::Ge => o != Ordering::Less,
                    CompareOp::IsNull | CompareOp::IsNotNull => false,
                },
            },
        }
    }
}

fn compile_conditions(t: &Table, conditions: &[Condition], params: &[Value]) -> DriverResult<Vec<CompiledCondition>> {
    conditions.iter().map(|c| {
        let index = t.column_index(&c.column)?;
        let value = match &c.operand { Some(o) => o.resolve(params)?, None => Value::Null };
        Ok(CompiledCondition { index, op: c.op, value })
    }).collect()
}

#[derive(Debug, Clone)]
enum Command {
    Select { table: String, columns: Option<Vec<String>>, conditions: Vec<Condition>, order: Option<(String, bool)> },
    Insert { table: String, columns: Vec<String>, values: Vec<Operand> },
    Update { table: String, assignments: Vec<(String, Operand)>, conditions: Vec<Condition> },
    Delete { table: String, conditions: Vec<Condition> },
}

impl Command {
    fn table(&self) -> &str {
        match self {
            Command::Select { table, .. } | Command::Insert { table, .. } | Command::Update { table, .. } | Command::Delete { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(String),
    Str(String),
    Param,
    Sym(&'static str),
}

fn syntax(msg: impl Into<String>) -> DriverError { DriverError::with_state(msg, "42601") }

fn tokenize(sql: &str) -> DriverResult<Vec<Tok>> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() { i += 1; continue; }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') { i += 1; }
            out.push(Tok::Ident(chars[start..i].iter().collect()));
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') { i += 1; }
            out.push(Tok::Num(chars[start..i].iter().collect()));
            continue;
        }
        if c == '\'' || c == '"' {
            let quote = c;
            let mut s = String::new();
            i += 1;
            loop {
                if i >= chars.len() { return Err(syntax("unterminated quoted token")); }
                if chars[i] == quote {
                    if i + 1 < chars.len() && chars[i + 1] == quote { s.push(quote); i += 2; continue; }
                    i += 1;
                    break;
                }
                s.push(chars[i]);
                i += 1;
            }
            out.push(if quote == '\'' { Tok::Str(s) } else { Tok::Ident(format!("\"{}\"", s)) });
            continue;
        }
        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        let sym = match two.as_str() {
            "<=" => Some("<="), ">=" => Some(">="), "!=" => Some("!="), "<>" => Some("!="),
            _ => None,
        };
        if let Some(s) = sym { out.push(Tok::Sym(s)); i += 2; continue; }
        let one = match c {
            '=' => "=", '<' => "<", '>' => ">", '(' => "(", ')' => ")", ',' => ",", '*' => "*", ';' => ";", '-' => "-",
            '?' => { out.push(Tok::Param); i += 1; continue; }
            other => return Err(syntax(format!("unexpected character '{}'", other))),
        };
        out.push(Tok::Sym(one));
        i += 1;
    }
    Ok(out)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
    params: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> { self.toks.get(self.pos) }

    fn keyword(&mut self, kw: &str) -> bool {
        if let Some(Tok::Ident(s)) = self.peek() {
            if s.eq_ignore_ascii_case(kw) { self.pos += 1; return true; }
        }
        false
    }

    fn expect_keyword(&mut self, kw: &str) -> DriverResult<()> {
        if self.keyword(kw) { Ok(()) } else { Err(syntax(format!("expected {}", kw))) }
    }

    fn sym(&mut self, s: &str) -> bool {
        if let Some(Tok::Sym(t)) = self.peek() {
            if *t == s { self.pos += 1; return true; }
        }
        false
    }

    fn expect_sym(&mut self, s: &str) -> DriverResult<()> {
        if self.sym(s) { Ok(()) } else { Err(syntax(format!("expected '{}'", s))) }
    }

    fn ident(&mut self) -> DriverResult<String> {
        match self.toks.get(self.pos).cloned() {
            Some(Tok::Ident(s)) => { self.pos += 1; Ok(normalize_identifier(&s)) }
            other => Err(syntax(format!("expected identifier, found {:?}", other))),
        }
    }

    fn ident_list(&mut self) -> DriverResult<Vec<String>> {
        let mut out = vec![self.ident()?];
        while self.sym(",") { out.push(self.ident()?); }
        Ok(out)
    }

    fn operand(&mut self) -> DriverResult<Operand> {
        let negative = self.sym("-");
        let tok = self.toks.get(self.pos).cloned();
        self.pos += 1;
        let v = match tok {
            Some(Tok::Param) if !negative => { self.params += 1; return Ok(Operand::Param(self.params)); }
            Some(Tok::Num(n)) => {
                let n = if negative { format!("-{}", n) } else { n };
                if n.contains('.') {
                    Value::Double(n.parse().map_err(|_| syntax(format!("bad number '{}'", n)))?)
                } else {
                    let l: i64 = n.parse().map_err(|_| syntax(format!("bad number '{}'", n)))?;
                    i32::try_from(l).map(Value::Int).unwrap_or(Value::Long(l))
                }
            }
            Some(Tok::Str(s)) if !negative => Value::Text(s),
            Some(Tok::Ident(s)) if !negative && s.eq_ignore_ascii_case("null") => Value::Null,
            Some(Tok::Ident(s)) if !negative && s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Some(Tok::Ident(s)) if !negative && s.eq_ignore_ascii_case("false") => Value::Bool(false),
            other => return Err(syntax(format!("expected value, found {:?}", other))),
        };
        Ok(Operand::Literal(v))
    }

    fn conditions(&mut self) -> DriverResult<Vec<Condition>> {
        let mut out = Vec::new();
        if !self.keyword("WHERE") { return Ok(out); }
        loop {
            let column = self.ident()?;
            if self.keyword("IS") {
                let op = if self.keyword("NOT") { CompareOp::IsNotNull } else { CompareOp::IsNull };
                self.expect_keyword("NULL")?;
                out.push(Condition { column, op, operand: None });
            } else {
                let op = match self.toks.get(self.pos) {
                    Some(Tok::Sym("=")) => CompareOp::Eq,
                    Some(Tok::Sym("!=")) => CompareOp::Ne,
                    Some(Tok::Sym("<")) => CompareOp::Lt,
                    Some(Tok::Sym("<=")) => CompareOp::Le,
                    Some(Tok::Sym(">")) => CompareOp::Gt,
                    Some(Tok::Sym(">=")) => CompareOp::Ge,
                    other => return Err(syntax(format!("expected comparison operator, found {:?}", other))),
                };
                self.pos += 1;
                let operand = self.operand()?;
                out.push(Condition { column, op, operand: Some(operand) });
            }
            if !self.keyword("AND") { break; }
        }
        Ok(out)
    }

    fn finish(&mut self) -> DriverResult<()> {
        self.sym(";");
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(syntax(format!("unexpected trailing token {:?}", t))),
        }
    }
}

/// Parses one statement; returns it with the number of `?` placeholders.
fn parse_command(sql: &str) -> DriverResult<(Command, usize)> {
    let mut p = Parser { toks: tokenize(sql)?, pos: 0, params: 0 };
    let cmd = if p.keyword("SELECT") {
        let columns = if p.sym("*") { None } else { Some(p.ident_list()?) };
        p.expect_keyword("FROM")?;
        let table = p.ident()?;
        let conditions = p.conditions()?;
        let order = if p.keyword("ORDER") {
            p.expect_keyword("BY")?;
            let col = p.ident()?;
            let desc = if p.keyword("DESC") { true } else { p.keyword("ASC"); false };
            Some((col, desc))
        } else { None };
        Command::Select { table, columns, conditions, order }
    } else if p.keyword("INSERT") {
        p.expect_keyword("INTO")?;
        let table = p.ident()?;
        p.expect_sym("(")?;
        let columns = p.ident_list()?;
        p.expect_sym(")")?;
        p.expect_keyword("VALUES")?;
        p.expect_sym("(")?;
        let mut values = vec![p.operand()?];
        while p.sym(",") { values.push(p.operand()?); }
        p.expect_sym(")")?;
        if columns.len() != values.len() {
            return Err(syntax(format!("INSERT has {} columns but {} values", columns.len(), values.len())));
        }
        Command::Insert { table, columns, values }
    } else if p.keyword("UPDATE") {
        let table = p.ident()?;
        p.expect_keyword("SET")?;
        let mut assignments = Vec::new();
        loop {
            let col = p.ident()?;
            p.expect_sym("=")?;
            assignments.push((col, p.operand()?));
            if !p.sym(",") { break; }
        }
        let conditions = p.conditions()?;
        Command::Update { table, assignments, conditions }
    } else if p.keyword("DELETE") {
        p.expect_keyword("FROM")?;
        let table = p.ident()?;
        let conditions = p.conditions()?;
        Command::Delete { table, conditions }
    } else {
        return Err(syntax(format!("unsupported statement: {}", sql)));
    };
    p.finish()?;
    Ok((cmd, p.params))
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
