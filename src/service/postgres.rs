//! PostgreSQL executor over a sqlx pool.

use crate::error::ExecutorError;
use crate::service::QueryExecutor;
use crate::sql::{PgBindValue, QueryBuf};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::{PgRow, PgTypeKind};
use sqlx::{ColumnIndex, PgPool};

#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        PgExecutor { pool }
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, ExecutorError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch_ids<Id>(&self, query: &QueryBuf) -> Result<Vec<Id>, ExecutorError>
    where
        Id: DeserializeOwned + Send + 'static,
    {
        let rows = self.fetch_all(query).await?;
        rows.iter()
            .map(|row| {
                serde_json::from_value(cell_to_value(row, 0usize)?)
                    .map_err(|e| ExecutorError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn fetch_rows(&self, query: &QueryBuf) -> Result<Vec<Value>, ExecutorError> {
        let rows = self.fetch_all(query).await?;
        rows.iter().map(row_to_json).collect()
    }
}

fn row_to_json(row: &PgRow) -> Result<Value, ExecutorError> {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name)?);
    }
    Ok(Value::Object(map))
}

/// Decode one cell by trying the column types a projection usually yields.
/// `numeric` goes through `Decimal`, enums through their label; any other
/// type is a decode error rather than a silent null.
fn cell_to_value<I>(row: &PgRow, index: I) -> Result<Value, ExecutorError>
where
    I: ColumnIndex<PgRow> + Copy + std::fmt::Debug,
{
    use sqlx::{Row, TypeInfo, ValueRef};
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_info = raw.type_info().into_owned();

    if let Ok(n) = row.try_get::<i16, _>(index) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i32, _>(index) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i64, _>(index) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<f32, _>(index) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Ok(Value::Number(n));
        }
    }
    if let Ok(n) = row.try_get::<f64, _>(index) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Ok(Value::Number(n));
        }
    }
    if let Ok(d) = row.try_get::<Decimal, _>(index) {
        return Ok(decimal_to_value(d));
    }
    if let Ok(b) = row.try_get::<bool, _>(index) {
        return Ok(Value::Bool(b));
    }
    if let Ok(u) = row.try_get::<uuid::Uuid, _>(index) {
        return Ok(Value::String(u.to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
        return Ok(Value::String(d.to_rfc3339()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDateTime, _>(index) {
        return Ok(Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDate, _>(index) {
        return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(Value::String(s));
    }
    if let Ok(j) = row.try_get::<Value, _>(index) {
        return Ok(j);
    }
    // enum values travel as their label text
    if matches!(type_info.kind(), PgTypeKind::Enum(_)) {
        if let Ok(s) = row.try_get_unchecked::<String, _>(index) {
            return Ok(Value::String(s));
        }
    }
    Err(ExecutorError::Decode(format!(
        "unsupported column type {} at {:?}",
        type_info.name(),
        index
    )))
}

/// Integral decimals become JSON integers, others the nearest `f64`; values
/// out of `f64` range keep their exact text.
fn decimal_to_value(d: Decimal) -> Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return Value::Number(i.into());
        }
    }
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(d.to_string()))
}
