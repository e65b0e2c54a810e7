//! Reader for phpMyAdmin's `config.inc.php` dialect.
//!
//! Only the straight-line subset such files are written in is understood:
//! `$cfg[...] = expr;` assignments, a server counter (`$i = 0; $i++;`),
//! `ini_set(...)` and `declare(...)`. The parsed settings are exposed as a
//! figment [`Provider`] so they merge like any other source.

use figment::providers::Serialized;
use figment::value::{Dict, Map};
use figment::{Error, Metadata, Profile, Provider};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

const CFG_VAR: &str = "cfg";
const SERVERS_KEY: &str = "Servers";
const MEMORY_LIMIT_KEY: &str = "MemoryLimit";

/// Errors raised while reading PHP configuration text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhpParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("server indices must run from 1 to {expected} without gaps, found {found:?}")]
    ServerIndices { found: Vec<String>, expected: usize },
}

fn syntax(line: usize, message: impl Into<String>) -> PhpParseError {
    PhpParseError::Syntax {
        line,
        message: message.into(),
    }
}

/// Settings read from a `config.inc.php` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpConfig {
    settings: serde_json::Map<String, Value>,
}

impl PhpConfig {
    /// The `$cfg` tree, with `Servers` converted to an ordered list
    pub const fn settings(&self) -> &serde_json::Map<String, Value> {
        &self.settings
    }
}

impl FromStr for PhpConfig {
    type Err = PhpParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser::new(tokens);
        parser.run()?;
        let mut settings = parser.cfg;
        servers_to_list(&mut settings)?;
        Ok(Self { settings })
    }
}

impl Provider for PhpConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("PHP configuration")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        Serialized::defaults(&self.settings).data()
    }
}

/// `$cfg['Servers']` is keyed 1, 2, 3...; turn it into a list in that order.
fn servers_to_list(settings: &mut serde_json::Map<String, Value>) -> Result<(), PhpParseError> {
    let servers = match settings.remove(SERVERS_KEY) {
        Some(Value::Object(servers)) => servers,
        // left for extraction to reject with a type error
        Some(other) => {
            settings.insert(SERVERS_KEY.to_string(), other);
            return Ok(());
        }
        None => return Ok(()),
    };

    let found: Vec<String> = servers.keys().cloned().collect();
    let mut indexed = Vec::with_capacity(servers.len());
    for (key, server) in servers {
        let index = key.parse::<usize>().ok();
        indexed.push((index, server));
    }
    indexed.sort_by_key(|(index, _)| *index);

    let contiguous = indexed
        .iter()
        .enumerate()
        .all(|(pos, (index, _))| *index == Some(pos + 1));
    if !contiguous {
        return Err(PhpParseError::ServerIndices {
            expected: found.len(),
            found,
        });
    }

    let list = indexed.into_iter().map(|(_, server)| server).collect();
    settings.insert(SERVERS_KEY.to_string(), Value::Array(list));
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Variable(String),
    Ident(String),
    Str(String),
    Int(i64),
    Incr,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        // Editors on Windows often save with a byte-order mark
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn tokenize(mut self) -> Result<Vec<Token>, PhpParseError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let line = self.line;
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '<' if self.starts_with("<?php") => self.pos += 5,
                '?' if self.starts_with("?>") => self.pos += 2,
                '#' => self.skip_line(),
                '/' if self.peek_at(1) == Some('/') => self.skip_line(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment()?,
                '$' => {
                    self.bump();
                    let name = self.ident();
                    if name.is_empty() {
                        return Err(syntax(line, "expected variable name after '$'"));
                    }
                    tokens.push(Token { tok: Tok::Variable(name), line });
                }
                '\'' => {
                    let s = self.single_quoted()?;
                    tokens.push(Token { tok: Tok::Str(s), line });
                }
                '"' => {
                    let s = self.double_quoted()?;
                    tokens.push(Token { tok: Tok::Str(s), line });
                }
                '+' if self.peek_at(1) == Some('+') => {
                    self.pos += 2;
                    tokens.push(Token { tok: Tok::Incr, line });
                }
                c if c.is_ascii_digit() => {
                    let n = self.integer()?;
                    tokens.push(Token { tok: Tok::Int(n), line });
                }
                c if c.is_alphabetic() || c == '_' => {
                    let name = self.ident();
                    tokens.push(Token { tok: Tok::Ident(name), line });
                }
                '[' | ']' | '(' | ')' | ';' | '=' | ',' | '.' | '+' | '-' | '*' => {
                    self.bump();
                    tokens.push(Token { tok: Tok::Punct(c), line });
                }
                other => return Err(syntax(line, format!("unexpected character {other:?}"))),
            }
        }
        Ok(tokens)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), PhpParseError> {
        let line = self.line;
        self.pos += 2;
        while self.peek().is_some() {
            if self.starts_with("*/") {
                self.pos += 2;
                return Ok(());
            }
            self.bump();
        }
        Err(syntax(line, "unterminated block comment"))
    }

    fn ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn integer(&mut self) -> Result<i64, PhpParseError> {
        let line = self.line;
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if c != '_' {
                break;
            }
            self.bump();
        }
        digits
            .parse()
            .map_err(|_| syntax(line, format!("integer literal {digits} out of range")))
    }

    fn single_quoted(&mut self) -> Result<String, PhpParseError> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax(line, "unterminated string")),
                Some('\'') => return Ok(out),
                Some('\\') => match self.peek() {
                    Some(c @ ('\'' | '\\')) => {
                        self.bump();
                        out.push(c);
                    }
                    _ => out.push('\\'),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<String, PhpParseError> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax(line, "unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let escaped = match self.peek() {
                        Some('n') => Some('\n'),
                        Some('t') => Some('\t'),
                        Some('r') => Some('\r'),
                        Some('v') => Some('\u{0b}'),
                        Some('f') => Some('\u{0c}'),
                        Some('e') => Some('\u{1b}'),
                        Some(c @ ('\\' | '$' | '"')) => Some(c),
                        _ => None,
                    };
                    match escaped {
                        Some(c) => {
                            self.bump();
                            out.push(c);
                        }
                        None => out.push('\\'),
                    }
                }
                Some('$') if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '{') => {
                    return Err(syntax(
                        self.line,
                        "variable interpolation in strings is not supported",
                    ));
                }
                Some(c) => out.push(c),
            }
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    vars: HashMap<String, Value>,
    cfg: serde_json::Map<String, Value>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            vars: HashMap::new(),
            cfg: serde_json::Map::new(),
        }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Tok::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), PhpParseError> {
        if self.eat(c) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map_or_else(|| "end of input".to_string(), |t| format!("{t:?}"));
            Err(syntax(self.line(), format!("expected '{c}', found {found}")))
        }
    }

    fn run(&mut self) -> Result<(), PhpParseError> {
        while self.peek().is_some() {
            self.statement()?;
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<(), PhpParseError> {
        let line = self.line();
        match self.next() {
            Some(Tok::Punct(';')) => Ok(()),
            Some(Tok::Incr) => match self.next() {
                Some(Tok::Variable(name)) => {
                    self.increment(&name, line)?;
                    self.expect(';')
                }
                _ => Err(syntax(line, "expected variable after '++'")),
            },
            Some(Tok::Variable(name)) => self.variable_statement(name, line),
            Some(Tok::Ident(name)) if name.eq_ignore_ascii_case("declare") => {
                self.skip_parenthesized()?;
                self.expect(';')
            }
            Some(Tok::Ident(name)) if name.eq_ignore_ascii_case("ini_set") => self.ini_set(),
            Some(tok) => Err(syntax(line, format!("unsupported statement starting with {tok:?}"))),
            None => Ok(()),
        }
    }

    fn variable_statement(&mut self, name: String, line: usize) -> Result<(), PhpParseError> {
        if self.peek() == Some(&Tok::Incr) {
            self.pos += 1;
            self.increment(&name, line)?;
            return self.expect(';');
        }

        if self.peek() == Some(&Tok::Punct('[')) {
            if name != CFG_VAR {
                return Err(syntax(line, format!("only ${CFG_VAR} may be indexed, found ${name}")));
            }
            let mut path = Vec::new();
            while self.eat('[') {
                path.push(self.index_key()?);
                self.expect(']')?;
            }
            self.expect('=')?;
            let value = self.expr()?;
            self.expect(';')?;
            return self.assign_cfg(&path, value, line);
        }

        self.expect('=')?;
        if name == CFG_VAR {
            return Err(syntax(line, format!("whole-array assignment to ${CFG_VAR} is not supported")));
        }
        let value = self.expr()?;
        self.expect(';')?;
        self.vars.insert(name, value);
        Ok(())
    }

    fn increment(&mut self, name: &str, line: usize) -> Result<(), PhpParseError> {
        let current = match self.vars.get(name) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| syntax(line, format!("${name} is not an integer")))?,
            Some(_) => return Err(syntax(line, format!("${name} is not an integer"))),
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| syntax(line, "integer overflow"))?;
        self.vars.insert(name.to_string(), Value::from(next));
        Ok(())
    }

    fn index_key(&mut self) -> Result<String, PhpParseError> {
        let line = self.line();
        match self.next() {
            Some(Tok::Str(s)) => Ok(s),
            Some(Tok::Int(n)) => Ok(n.to_string()),
            Some(Tok::Variable(name)) => match self.vars.get(&name) {
                Some(Value::Number(n)) => Ok(n.to_string()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(syntax(line, format!("${name} cannot be used as an array key"))),
                None => Err(syntax(line, format!("undefined variable ${name}"))),
            },
            other => Err(syntax(line, format!("unsupported array key {other:?}"))),
        }
    }

    fn assign_cfg(&mut self, path: &[String], value: Value, line: usize) -> Result<(), PhpParseError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(syntax(line, "empty key path"));
        };
        let mut node = &mut self.cfg;
        for key in parents {
            let entry = node
                .entry(key.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            node = match entry {
                Value::Object(map) => map,
                _ => return Err(syntax(line, format!("cannot index into scalar setting '{key}'"))),
            };
        }
        node.insert(last.clone(), value);
        Ok(())
    }

    fn ini_set(&mut self) -> Result<(), PhpParseError> {
        let line = self.line();
        self.expect('(')?;
        let name = self.expr()?;
        self.expect(',')?;
        let value = self.expr()?;
        self.expect(')')?;
        self.expect(';')?;
        if name.as_str() == Some("memory_limit") {
            self.cfg.insert(MEMORY_LIMIT_KEY.to_string(), value);
        } else {
            tracing::debug!(line, directive = %name, "ignoring ini_set directive");
        }
        Ok(())
    }

    fn skip_parenthesized(&mut self) -> Result<(), PhpParseError> {
        self.expect('(')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(Tok::Punct('(')) => depth += 1,
                Some(Tok::Punct(')')) => depth -= 1,
                Some(_) => {}
                None => return Err(syntax(self.line(), "unbalanced parentheses")),
            }
        }
        Ok(())
    }

    // PHP 8 precedence: '.' binds looser than '+' and '-'.
    fn expr(&mut self) -> Result<Value, PhpParseError> {
        let first = self.additive()?;
        if self.peek() != Some(&Tok::Punct('.')) {
            return Ok(first);
        }
        let mut out = to_php_string(&first);
        while self.eat('.') {
            out.push_str(&to_php_string(&self.additive()?));
        }
        Ok(Value::String(out))
    }

    fn additive(&mut self) -> Result<Value, PhpParseError> {
        let mut acc = self.multiplicative()?;
        loop {
            let line = self.line();
            if self.eat('+') {
                let rhs = self.multiplicative()?;
                acc = int_op(&acc, &rhs, i64::checked_add, line)?;
            } else if self.eat('-') {
                let rhs = self.multiplicative()?;
                acc = int_op(&acc, &rhs, i64::checked_sub, line)?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Value, PhpParseError> {
        let mut acc = self.unary()?;
        loop {
            let line = self.line();
            if self.eat('*') {
                let rhs = self.unary()?;
                acc = int_op(&acc, &rhs, i64::checked_mul, line)?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<Value, PhpParseError> {
        let line = self.line();
        if self.eat('-') {
            let value = self.unary()?;
            return int_op(&Value::from(0), &value, i64::checked_sub, line);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Value, PhpParseError> {
        let line = self.line();
        match self.next() {
            Some(Tok::Int(n)) => Ok(Value::from(n)),
            Some(Tok::Str(s)) => Ok(Value::String(s)),
            Some(Tok::Ident(word)) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                "array" => Err(syntax(line, "array values are not supported")),
                _ => Err(syntax(line, format!("unsupported identifier '{word}'"))),
            },
            Some(Tok::Variable(name)) => self
                .vars
                .get(&name)
                .cloned()
                .ok_or_else(|| syntax(line, format!("undefined variable ${name}"))),
            Some(Tok::Punct('(')) => {
                let value = self.expr()?;
                self.expect(')')?;
                Ok(value)
            }
            Some(Tok::Punct('[')) => Err(syntax(line, "array values are not supported")),
            Some(tok) => Err(syntax(line, format!("unexpected {tok:?} in expression"))),
            None => Err(syntax(line, "unexpected end of input in expression")),
        }
    }
}

fn int_op(
    lhs: &Value,
    rhs: &Value,
    op: fn(i64, i64) -> Option<i64>,
    line: usize,
) -> Result<Value, PhpParseError> {
    match (lhs.as_i64(), rhs.as_i64()) {
        (Some(a), Some(b)) => op(a, b)
            .map(Value::from)
            .ok_or_else(|| syntax(line, "integer overflow")),
        _ => Err(syntax(line, "arithmetic is only supported on integers")),
    }
}

fn to_php_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        other => other.to_string(),
    }
}
