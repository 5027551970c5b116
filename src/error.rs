//! Typed errors: structural definition errors, request validation errors, pagination and sequencing.

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Raised while loading or building a schema definition. Fatal at startup.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("duplicate field name on \"{table}\" table")]
    DuplicateField { table: String },
    #[error("circular relations on \"{table}\" table")]
    CircularRelation { table: String },
    #[error("duplicate table reference \"{reference}\"")]
    DuplicateTableReference { reference: String },
    #[error("unknown {kind} field \"{field}\" on \"{table}\" table")]
    UnknownKeyField {
        kind: &'static str,
        table: String,
        field: String,
    },
    /// Both the field's own key and `<table>.<field>` are already indexed.
    #[error("no free filter/sort key for field \"{field}\" on \"{table}\" table")]
    IndexKeyCollision { table: String, field: String },
    #[error("schema load: {0}")]
    Load(String),
}

/// One field-scoped validation failure, keyed by request position (e.g. `filters.2`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub errors: Vec<String>,
}

/// Ordered, aggregated validation failures from compiling request parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            errors: vec![message.into()],
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Messages recorded under one key, in order.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .flat_map(|e| e.errors.iter().map(String::as_str))
            .collect()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.errors.join("")))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Serialized as `{ "<key>": ["message", ...], ... }` in first-seen key order.
impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&str> = Vec::new();
        for e in &self.0 {
            if !keys.contains(&e.field.as_str()) {
                keys.push(&e.field);
            }
        }
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            map.serialize_entry(key, &self.messages_for(key))?;
        }
        map.end()
    }
}

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// The requested page lies outside the filtered id set.
    #[error("invalid pagination parameter")]
    Pagination,
    /// Integrator misuse: query requested before a successful `set_param`.
    #[error("set_param must succeed before building queries")]
    NotProcessed,
    /// Integrator misuse: query requested before `select`.
    #[error("selected fields can't be empty, call select first")]
    EmptySelection,
    /// Integrator misuse: query requested from a passthrough resource.
    #[error("resource has no schema definition")]
    NoDefinition,
    #[error("invalid argument: {0}")]
    Argument(String),
}

/// Raised by the query executor at the database boundary.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("decode: {0}")]
    Decode(String),
}

/// Errors of the two-phase pager: either the resource refused or the executor failed.
#[derive(Error, Debug)]
pub enum PagerError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
