//! `{{ path }}` expressions and their resolution.
//!
//! Grammar:
//!
//! ```text
//! expression := '{{' ws path ws '}}'
//! path       := ident ( '.' ident | '[' digits ']' )*
//! ident      := [A-Za-z0-9_-]+
//! ```
//!
//! A string input is split into literal text and expressions. When a
//! value is exactly one expression with no text around it, the resolved
//! value is substituted as-is, keeping its JSON type. Otherwise each
//! expression is rendered to text and spliced into the string.
//!
//! Resolution is a single pass: substituted text is never parsed again.
//! What a path's root names is decided by a [`Scope`].

use std::fmt;

use serde_json::Value;

use crate::error::FlowError;

/// One step of a path after its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed `{{ ... }}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub root: String,
    pub path: Vec<Segment>,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.path {
            match segment {
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

impl Expression {
    /// Parse the text between `{{` and `}}`.
    pub fn parse(source: &str) -> Result<Self, FlowError> {
        Parser::new(source.trim()).expression()
    }

    /// Walk the path below the root value.
    pub fn evaluate<'v>(&self, root: &'v Value) -> Result<&'v Value, FlowError> {
        let mut current = root;
        for (depth, segment) in self.path.iter().enumerate() {
            let next = match (segment, current) {
                (Segment::Field(name), Value::Object(map)) => map.get(name),
                (Segment::Index(i), Value::Array(items)) => items.get(*i),
                _ => None,
            };
            current = next.ok_or_else(|| {
                let partial = Expression {
                    root: self.root.clone(),
                    path: self.path[..=depth].to_vec(),
                };
                FlowError::UnresolvedVariable(format!("'{}' does not exist", partial))
            })?;
        }
        Ok(current)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, what: &str) -> FlowError {
        FlowError::UnresolvedVariable(format!(
            "invalid expression '{{{{ {} }}}}': {} at offset {}",
            self.src, what, self.pos
        ))
    }

    fn expression(&mut self) -> Result<Expression, FlowError> {
        let root = self.ident()?;
        let mut path = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.bump();
                    path.push(Segment::Field(self.ident()?));
                }
                '[' => {
                    self.bump();
                    path.push(Segment::Index(self.index()?));
                }
                _ => return Err(self.error("unexpected character")),
            }
        }
        Ok(Expression { root, path })
    }

    fn ident(&mut self) -> Result<String, FlowError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn index(&mut self) -> Result<usize, FlowError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let digits = &self.src[start..self.pos];
        if digits.is_empty() {
            return Err(self.error("expected array index"));
        }
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.bump();
        digits.parse().map_err(|_| self.error("index out of range"))
    }
}

/// A string split into literal text and expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    /// Parsed expression together with its original `{{ ... }}` source.
    Expr(Expression, String),
}

/// Split a string into fragments. A `{{` with no closing `}}` is literal.
pub fn parse_fragments(input: &str) -> Result<Vec<Fragment>, FlowError> {
    let mut fragments = Vec::new();
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        if open > 0 {
            fragments.push(Fragment::Text(rest[..open].to_string()));
        }
        let expr = Expression::parse(&after_open[..close])?;
        let source = rest[open..open + 2 + close + 2].to_string();
        fragments.push(Fragment::Expr(expr, source));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        fragments.push(Fragment::Text(rest.to_string()));
    }
    Ok(fragments)
}

/// Every expression found anywhere in a value tree.
pub fn collect_expressions(value: &Value) -> Result<Vec<Expression>, FlowError> {
    let mut out = Vec::new();
    collect_into(value, &mut out)?;
    Ok(out)
}

fn collect_into(value: &Value, out: &mut Vec<Expression>) -> Result<(), FlowError> {
    match value {
        Value::String(s) => {
            for fragment in parse_fragments(s)? {
                if let Fragment::Expr(expr, _) = fragment {
                    out.push(expr);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, out)?;
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_into(item, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// What a scope knows about a path root.
pub enum Binding<'a> {
    /// The root is bound to this value.
    Bound(&'a Value),
    /// The root cannot be resolved; the message explains why.
    Unbound(String),
}

/// Source of root values for expression resolution.
pub trait Scope {
    fn bind(&self, root: &str) -> Binding<'_>;
}

/// Resolves expressions inside arbitrarily nested values against a [`Scope`].
pub struct VariableResolver<'s, S: Scope + ?Sized> {
    scope: &'s S,
}

impl<'s, S: Scope + ?Sized> VariableResolver<'s, S> {
    pub fn new(scope: &'s S) -> Self {
        Self { scope }
    }

    /// Resolve a single expression.
    pub fn lookup(&self, expr: &Expression) -> Result<Value, FlowError> {
        match self.scope.bind(&expr.root) {
            Binding::Bound(root) => expr.evaluate(root).cloned(),
            Binding::Unbound(reason) => Err(FlowError::UnresolvedVariable(format!(
                "'{}': {}",
                expr, reason
            ))),
        }
    }

    /// Resolve every expression in `value`, recursing through arrays and
    /// objects. Object keys are never interpolated.
    pub fn resolve(&self, value: &Value) -> Result<Value, FlowError> {
        match value {
            Value::String(s) => self.resolve_str(s),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.resolve(item)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Resolve every value of an input mapping.
    pub fn resolve_map(
        &self,
        input: &serde_json::Map<String, Value>,
    ) -> Result<serde_json::Map<String, Value>, FlowError> {
        let mut out = serde_json::Map::with_capacity(input.len());
        for (key, item) in input {
            out.insert(key.clone(), self.resolve(item)?);
        }
        Ok(out)
    }

    fn resolve_str(&self, s: &str) -> Result<Value, FlowError> {
        let fragments = parse_fragments(s)?;

        match fragments.as_slice() {
            // Whole-value expression: keep the structural value.
            [Fragment::Expr(expr, _)] => self.lookup(expr),
            _ if !fragments.iter().any(|f| matches!(f, Fragment::Expr(..))) => {
                Ok(Value::String(s.to_string()))
            }
            _ => {
                let mut out = String::with_capacity(s.len());
                for fragment in &fragments {
                    match fragment {
                        Fragment::Text(text) => out.push_str(text),
                        Fragment::Expr(expr, _) => out.push_str(&to_text(&self.lookup(expr)?)),
                    }
                }
                Ok(Value::String(out))
            }
        }
    }
}

/// Canonical string form used when a value is interpolated into text:
/// strings as-is, everything else as compact JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
