//! Record reads and writes for schema tables, on either dialect.

use crate::config::Dialect;
use crate::error::AppError;
use crate::schema::{ColumnKind, Entity, Schema, TableDef};
use crate::service::validation::RequestValidator;
use crate::sql::{self, BindValue, QueryBuf};
use crate::store::Database;
use serde_json::{Map, Value};
use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::Row;
use std::sync::Arc;

pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Clone, Debug)]
pub struct RecordService {
    db: Database,
    schema: Arc<Schema>,
}

impl RecordService {
    pub fn new(db: Database, schema: Arc<Schema>) -> Self {
        RecordService { db, schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn table(&self, name: &str) -> Result<&TableDef, AppError> {
        self.schema
            .table(name)
            .ok_or_else(|| AppError::NotFound(format!("table {}", name)))
    }

    /// List rows with exact-match filters, limit (default 100, max 1000) and offset (default 0).
    pub async fn list(
        &self,
        table: &str,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let t = self.table(table)?;
        let q = sql::select_list(
            t,
            filters,
            Some(limit.unwrap_or(DEFAULT_LIMIT)),
            Some(offset.unwrap_or(0)),
        );
        let stmt = self.db.prepare(&q.sql);
        tracing::debug!(sql = %stmt, params = ?q.params, "query");
        let rows = bound(&stmt, &q.params).fetch_all(self.db.pool()).await?;
        Ok(rows.iter().map(|r| row_to_json(t, r)).collect())
    }

    /// Fetch one row by primary key.
    pub async fn read(&self, table: &str, id: &Value) -> Result<Option<Value>, AppError> {
        let t = self.table(table)?;
        self.read_in(t, id).await
    }

    async fn read_in(&self, t: &TableDef, id: &Value) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(t, id);
        let stmt = self.db.prepare(&q.sql);
        tracing::debug!(sql = %stmt, params = ?q.params, "query");
        let row = bound(&stmt, &q.params)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| row_to_json(t, &r)))
    }

    /// Insert one row and return it as stored, server defaults included.
    /// Postgres reads the key from RETURNING; mysql (where RETURNING is stripped) uses the
    /// connection's last insert id.
    pub async fn insert(&self, table: &str, body: &Map<String, Value>) -> Result<Value, AppError> {
        let t = self.table(table)?;
        RequestValidator::validate(t, body)?;
        let q = sql::insert(t, body);
        let id = self.insert_returning_id(t, &q).await?;
        self.read_in(t, &id)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn insert_returning_id(&self, t: &TableDef, q: &QueryBuf) -> Result<Value, AppError> {
        let stmt = self.db.prepare(&q.sql);
        tracing::debug!(sql = %stmt, params = ?q.params, "insert");
        match self.db.dialect() {
            Dialect::Postgres => {
                let row = bound(&stmt, &q.params).fetch_one(self.db.pool()).await?;
                Ok(cell_to_value(&row, t.primary_key().name, ColumnKind::Integer))
            }
            Dialect::MySql => {
                let res = bound(&stmt, &q.params).execute(self.db.pool()).await?;
                res.last_insert_id()
                    .map(Value::from)
                    .ok_or(AppError::Db(sqlx::Error::RowNotFound))
            }
        }
    }

    /// Update the columns present in body. Returns the row after the update, or None if no row
    /// has that id. A body with nothing updatable is a bad request.
    pub async fn update(
        &self,
        table: &str,
        id: &Value,
        body: &Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let t = self.table(table)?;
        RequestValidator::validate_partial(t, body)?;
        let q = sql::update(t, id, body)
            .ok_or_else(|| AppError::BadRequest("no updatable fields in body".into()))?;
        let stmt = self.db.prepare(&q.sql);
        tracing::debug!(sql = %stmt, params = ?q.params, "update");
        // mysql counts changed rows, not matched ones, so affected rows cannot signal a miss.
        bound(&stmt, &q.params).execute(self.db.pool()).await?;
        self.read_in(t, id).await
    }
}

impl RecordService {
    /// Typed insert through an entity's insert contract.
    pub async fn insert_entity<E: Entity>(&self, row: &E::Insert) -> Result<E::Select, AppError> {
        let body = match serde_json::to_value(row) {
            Ok(Value::Object(m)) => m,
            _ => return Err(AppError::BadRequest("insert contract must be an object".into())),
        };
        let stored = self.insert(E::TABLE, &body).await?;
        decode::<E>(stored)
    }

    /// Typed read through an entity's select contract.
    pub async fn read_entity<E: Entity>(&self, id: i64) -> Result<Option<E::Select>, AppError> {
        match self.read(E::TABLE, &Value::from(id)).await? {
            Some(v) => decode::<E>(v).map(Some),
            None => Ok(None),
        }
    }
}

/// A stored row that does not fit its select contract is a server fault, not a caller's.
fn decode<E: Entity>(v: Value) -> Result<E::Select, AppError> {
    serde_json::from_value(v).map_err(|e| {
        tracing::error!(table = E::TABLE, error = %e, "stored row does not match select contract");
        AppError::Db(sqlx::Error::Decode(Box::new(e)))
    })
}

fn bound<'q>(sql: &'q str, params: &'q [BindValue]) -> Query<'q, Any, AnyArguments<'q>> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, p| p.bind(query))
}

/// Decode a row into a JSON object keyed by column name, using the table's column kinds.
pub fn row_to_json(table: &TableDef, row: &AnyRow) -> Value {
    let mut map = Map::new();
    for col in table.select_columns() {
        map.insert(col.name.to_string(), cell_to_value(row, col.name, col.kind));
    }
    Value::Object(map)
}

fn cell_to_value(row: &AnyRow, name: &str, kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Serial | ColumnKind::Integer => int_cell(row, name)
            .map(Value::from)
            .or_else(|| {
                row.try_get::<Option<f64>, _>(name)
                    .ok()
                    .flatten()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or(Value::Null),
        ColumnKind::Boolean => {
            if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
                return Value::Bool(b);
            }
            // TINYINT(1) may surface as an integer.
            int_cell(row, name)
                .map(|n| Value::Bool(n != 0))
                .unwrap_or(Value::Null)
        }
        ColumnKind::Json => match text_cell(row, name) {
            Some(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
            None => Value::Null,
        },
        ColumnKind::Text | ColumnKind::Timestamp => {
            text_cell(row, name).map(Value::String).unwrap_or(Value::Null)
        }
    }
}

fn int_cell(row: &AnyRow, name: &str) -> Option<i64> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
        return v.map(i64::from);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(name) {
        return v.map(i64::from);
    }
    None
}

fn text_cell(row: &AnyRow, name: &str) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v;
    }
    row.try_get::<Option<Vec<u8>>, _>(name)
        .ok()
        .flatten()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}
