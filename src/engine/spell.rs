//! Spells: declarative post-response transforms
//!
//! A spell is a TOML document with a single `[spell]` table. Each entry maps
//! a bundle key to an expression evaluated against the response:
//!
//! ```toml
//! [spell]
//! token   = "$response.header.X-Token"
//! user_id = "$response.body#/data/user/id"
//! status  = "$statusCode"
//! body    = "$response.body"
//! stage   = "logged-in"
//! ```
//!
//! Values that do not start with `$` are literals; a leading `$$` stands
//! for a literal `$`. Evaluation has no access to anything but the response.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use super::dispatch::Response;

/// Spell text used when a quest does not have one yet
pub const DEFAULT_SPELL: &str = "[spell]\n";

const TABLE: &str = "spell";

#[derive(Error, Debug)]
pub enum SpellError {
    #[error("invalid spell syntax: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error("spell must define a [spell] table")]
    MissingTable,
    #[error("unexpected top-level key `{0}`; bindings belong in the [spell] table")]
    UnexpectedKey(String),
    #[error("binding `{key}` must be a string expression")]
    NotAString { key: String },
    #[error("binding `{key}` uses unknown expression `{expr}`")]
    UnknownExpression { key: String, expr: String },
    #[error("response has no `{header}` header")]
    MissingHeader { header: String },
    #[error("response body is not JSON: {0}")]
    BodyNotJson(#[source] serde_json::Error),
    #[error("response body has nothing at `{pointer}`")]
    PointerNotFound { pointer: String },
}

/// Where a binding's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    StatusCode,
    Body,
    BodyPointer(String),
    Header(String),
    Literal(String),
}

impl Expression {
    fn parse(key: &str, raw: &str) -> Result<Self, SpellError> {
        let unknown = || SpellError::UnknownExpression {
            key: key.to_string(),
            expr: raw.to_string(),
        };

        if let Some(escaped) = raw.strip_prefix("$$") {
            return Ok(Expression::Literal(format!("${escaped}")));
        }
        let Some(expr) = raw.strip_prefix('$') else {
            return Ok(Expression::Literal(raw.to_string()));
        };

        match expr {
            "statusCode" => Ok(Expression::StatusCode),
            "response.body" => Ok(Expression::Body),
            _ => {
                if let Some(pointer) = expr.strip_prefix("response.body#") {
                    if pointer.is_empty() || pointer.starts_with('/') {
                        return Ok(Expression::BodyPointer(pointer.to_string()));
                    }
                } else if let Some(header) = expr.strip_prefix("response.header.") {
                    if !header.is_empty() {
                        return Ok(Expression::Header(header.to_string()));
                    }
                }
                Err(unknown())
            }
        }
    }

    fn evaluate(&self, response: &Response, body: &mut BodyCache) -> Result<String, SpellError> {
        match self {
            Expression::StatusCode => Ok(response.status.to_string()),
            Expression::Body => Ok(response.text()),
            Expression::Header(name) => response
                .header(name)
                .map(str::to_string)
                .ok_or_else(|| SpellError::MissingHeader {
                    header: name.clone(),
                }),
            Expression::BodyPointer(pointer) => {
                let json = body.json(response)?;
                match json.pointer(pointer) {
                    Some(Value::String(s)) => Ok(s.clone()),
                    Some(other) => Ok(other.to_string()),
                    None => Err(SpellError::PointerNotFound {
                        pointer: pointer.clone(),
                    }),
                }
            }
            Expression::Literal(value) => Ok(value.clone()),
        }
    }
}

/// Parses the body as JSON at most once per cast
#[derive(Default)]
struct BodyCache {
    json: Option<Value>,
}

impl BodyCache {
    fn json(&mut self, response: &Response) -> Result<&Value, SpellError> {
        if self.json.is_none() {
            let parsed = serde_json::from_slice(&response.body).map_err(SpellError::BodyNotJson)?;
            self.json = Some(parsed);
        }
        Ok(self.json.get_or_insert(Value::Null))
    }
}

/// A parsed spell, ready to cast on responses
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Spell {
    bindings: Vec<(String, Expression)>,
}

impl Spell {
    pub fn parse(source: &str) -> Result<Self, SpellError> {
        let document: toml::Table = toml::from_str(source)?;

        if let Some(key) = document.keys().find(|key| key.as_str() != TABLE) {
            return Err(SpellError::UnexpectedKey(key.clone()));
        }
        let table = match document.get(TABLE) {
            Some(toml::Value::Table(table)) => table,
            Some(_) => return Err(SpellError::UnexpectedKey(TABLE.to_string())),
            None => return Err(SpellError::MissingTable),
        };

        let bindings = table
            .iter()
            .map(|(key, value)| {
                let raw = value
                    .as_str()
                    .ok_or_else(|| SpellError::NotAString { key: key.clone() })?;
                Ok((key.clone(), Expression::parse(key, raw)?))
            })
            .collect::<Result<Vec<_>, SpellError>>()?;

        Ok(Self { bindings })
    }

    /// Bundle keys this spell writes
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(key, _)| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Evaluate every binding against the response.
    ///
    /// All-or-nothing: the first failing binding aborts the cast.
    pub fn cast(&self, response: &Response) -> Result<BTreeMap<String, String>, SpellError> {
        let mut body = BodyCache::default();
        let mut output = BTreeMap::new();
        for (key, expression) in &self.bindings {
            output.insert(key.clone(), expression.evaluate(response, &mut body)?);
        }
        Ok(output)
    }
}

impl FromStr for Spell {
    type Err = SpellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
