//! Query parameters and their translation into a store-agnostic query
//!
//! Collection reads accept four URL parameters:
//!
//! ```text
//! GET /properties?where=[["price","<",500000]]&orderBy=["price","desc"]&limit=10&startAfter=abc
//! ```
//!
//! `where` and `orderBy` carry serialized JSON, `limit` carries decimal text and
//! `startAfter` carries an opaque cursor minted by the store. [`translate`]
//! turns the raw text into a [`QuerySpec`] without touching the store.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Raw query parameters exactly as they arrive on the URL
///
/// Empty strings are treated the same as absent parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQueryParams {
    /// Serialized filter list: `[[field, op, value], ...]`
    #[serde(rename = "where")]
    pub filter: Option<String>,

    /// Serialized sort key: `"field"`, `["field", "desc"]` or `[["field", "desc"]]`
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,

    /// Maximum number of documents, as decimal text
    pub limit: Option<String>,

    /// Opaque pagination cursor
    #[serde(rename = "startAfter")]
    pub start_after: Option<String>,
}

/// Errors raised while translating query parameters
///
/// All of these are caller mistakes and surface as 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query string could not be decoded: {message}")]
    InvalidParameters { message: String },

    #[error("'where' is not valid JSON: {message}")]
    MalformedWhere { message: String },

    #[error("'orderBy' is not valid JSON: {message}")]
    MalformedOrderBy { message: String },

    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("unknown filter operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("operator '{operator}' requires an array value")]
    ExpectedArray { operator: String },

    #[error("invalid field path '{path}'")]
    InvalidFieldPath { path: String },

    #[error("invalid orderBy: {message}")]
    InvalidOrderBy { message: String },

    #[error("'limit' must be a positive integer, got '{value}'")]
    InvalidLimit { value: String },
}

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not-in",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
        }
    }

    /// Operators whose operand is a list of candidates
    pub fn takes_array(&self) -> bool {
        matches!(
            self,
            FilterOp::In | FilterOp::NotIn | FilterOp::ArrayContainsAny
        )
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::Ne),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Lte),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Gte),
            "in" => Ok(FilterOp::In),
            "not-in" => Ok(FilterOp::NotIn),
            "array-contains" => Ok(FilterOp::ArrayContains),
            "array-contains-any" => Ok(FilterOp::ArrayContainsAny),
            other => Err(QueryError::UnknownOperator {
                operator: other.to_string(),
            }),
        }
    }
}

/// A single `(field, operator, value)` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(QueryError::InvalidOrderBy {
                message: format!("unknown direction '{}'", s),
            }),
        }
    }
}

/// Sort key of a read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Opaque pagination cursor
///
/// Minted and consumed only by the store. Nothing in the gateway looks
/// inside it; it is carried from the URL to the store byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Store-agnostic description of a collection read
///
/// `None` means "not requested" and is distinct from an empty value: a
/// `where=[]` parameter yields `Some(vec![])`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub filters: Option<Vec<Filter>>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<NonZeroU32>,
    pub cursor: Option<Cursor>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn with_order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn with_limit(mut self, limit: NonZeroU32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Filters to apply, empty when none were requested
    pub fn filters(&self) -> &[Filter] {
        self.filters.as_deref().unwrap_or(&[])
    }
}

/// Translate raw URL parameters into a [`QuerySpec`]
///
/// Pure: no I/O, no store access.
pub fn translate(raw: &RawQueryParams) -> Result<QuerySpec, QueryError> {
    let filters = present(&raw.filter)
        .map(|text| {
            let value: Value = serde_json::from_str(text).map_err(|e| {
                QueryError::MalformedWhere {
                    message: e.to_string(),
                }
            })?;
            parse_filters(&value)
        })
        .transpose()?;

    let order_by = present(&raw.order_by)
        .map(|text| {
            let value: Value = serde_json::from_str(text).map_err(|e| {
                QueryError::MalformedOrderBy {
                    message: e.to_string(),
                }
            })?;
            parse_order_by(&value)
        })
        .transpose()?;

    let limit = present(&raw.limit).map(parse_limit).transpose()?;

    let cursor = present(&raw.start_after).map(Cursor::new);

    Ok(QuerySpec {
        filters,
        order_by,
        limit,
        cursor,
    })
}

/// Whether `path` is a dot-separated list of identifiers
pub fn is_valid_field_path(path: &str) -> bool {
    static FIELD_PATH_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FIELD_PATH_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
    });
    regex.is_match(path)
}

fn present(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|s| !s.is_empty())
}

fn field_path(value: &Value) -> Result<String, QueryError> {
    let path = value.as_str().ok_or_else(|| QueryError::InvalidFieldPath {
        path: value.to_string(),
    })?;
    if !is_valid_field_path(path) {
        return Err(QueryError::InvalidFieldPath {
            path: path.to_string(),
        });
    }
    Ok(path.to_string())
}

fn parse_filters(value: &Value) -> Result<Vec<Filter>, QueryError> {
    let Some(items) = value.as_array() else {
        return Err(QueryError::InvalidFilter {
            message: "expected an array of [field, operator, value] triples".to_string(),
        });
    };

    // A lone triple is accepted as a one-element list
    if items.first().is_some_and(Value::is_string) {
        return Ok(vec![parse_filter(value)?]);
    }

    items.iter().map(parse_filter).collect()
}

fn parse_filter(value: &Value) -> Result<Filter, QueryError> {
    let parts = match value.as_array() {
        Some(parts) if parts.len() == 3 => parts,
        _ => {
            return Err(QueryError::InvalidFilter {
                message: format!("expected [field, operator, value], got {}", value),
            });
        }
    };

    let field = field_path(&parts[0])?;
    let op: FilterOp = parts[1]
        .as_str()
        .ok_or_else(|| QueryError::UnknownOperator {
            operator: parts[1].to_string(),
        })?
        .parse()?;

    if op.takes_array() && !parts[2].is_array() {
        return Err(QueryError::ExpectedArray {
            operator: op.to_string(),
        });
    }

    Ok(Filter {
        field,
        op,
        value: parts[2].clone(),
    })
}

fn parse_order_by(value: &Value) -> Result<OrderBy, QueryError> {
    match value {
        Value::String(_) => Ok(OrderBy {
            field: field_path(value)?,
            direction: Direction::Asc,
        }),
        Value::Array(items) => match items.as_slice() {
            [nested @ Value::Array(_)] => parse_order_by(nested),
            [field] => Ok(OrderBy {
                field: field_path(field)?,
                direction: Direction::Asc,
            }),
            [field, Value::String(direction)] => Ok(OrderBy {
                field: field_path(field)?,
                direction: direction.parse()?,
            }),
            [Value::Array(_), Value::Array(_), ..] => Err(QueryError::InvalidOrderBy {
                message: "only one sort key is supported".to_string(),
            }),
            _ => Err(QueryError::InvalidOrderBy {
                message: format!("expected \"field\" or [\"field\", direction], got {}", value),
            }),
        },
        other => Err(QueryError::InvalidOrderBy {
            message: format!("expected \"field\" or [\"field\", direction], got {}", other),
        }),
    }
}

fn parse_limit(text: &str) -> Result<NonZeroU32, QueryError> {
    text.trim()
        .parse::<NonZeroU32>()
        .map_err(|_| QueryError::InvalidLimit {
            value: text.to_string(),
        })
}
