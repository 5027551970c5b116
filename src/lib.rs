//! Resourceful: schema-driven listing queries for PostgreSQL.
//!
//! A [`Definition`] is built once from a declared [`Table`] tree. Each request gets a
//! [`Resource`] that validates search, filter and sort parameters, emits the id query
//! and the row query, and shapes the paged [`Response`].

pub mod definition;
pub mod error;
pub mod resource;
pub mod response;
pub mod schema;
pub mod service;
pub mod sql;

pub use definition::{Definition, FieldId, RelationId, TableId, Usage, UsageSet};
pub use error::{DefinitionError, ExecutorError, FieldError, PagerError, ResourceError, ValidationErrors};
pub use resource::{Parameter, Resource, ResultSet};
pub use response::{Data, Metadata, Response};
pub use schema::{load_table_from_path, load_table_from_str, Field, FieldType, Relation, SortDirection, Table};
pub use service::{PgExecutor, QueryExecutor, ResourceService};
pub use sql::{PgBindValue, QueryBuf};
