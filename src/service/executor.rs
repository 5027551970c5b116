//! Executor boundary: runs emitted queries and returns scanned ids or rows.

use crate::error::ExecutorError;
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run an id query; the first column of every row is decoded as an id.
    async fn fetch_ids<Id>(&self, query: &QueryBuf) -> Result<Vec<Id>, ExecutorError>
    where
        Id: DeserializeOwned + Send + 'static;

    /// Run a row query; every row is returned as a JSON object keyed by column name.
    async fn fetch_rows(&self, query: &QueryBuf) -> Result<Vec<Value>, ExecutorError>;
}
