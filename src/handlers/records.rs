//! Record handlers: list, read, create, update for schema tables.

use crate::error::AppError;
use crate::response::{success_many, success_one, success_one_ok};
use crate::schema::{ColumnKind, TableDef};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn table<'a>(state: &'a AppState, name: &str) -> Result<&'a TableDef, AppError> {
    state
        .schema()
        .table(name)
        .ok_or_else(|| AppError::NotFound(format!("table {}", name)))
}

fn parse_id(t: &TableDef, id_str: &str) -> Result<Value, AppError> {
    match t.primary_key().kind {
        ColumnKind::Serial | ColumnKind::Integer => id_str
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::BadRequest("invalid id".into())),
        _ => Ok(Value::String(id_str.to_string())),
    }
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Query-string values are text; coerce them by the column's kind.
fn query_value_for_column(kind: ColumnKind, s: &str) -> Value {
    match kind {
        ColumnKind::Serial | ColumnKind::Integer => s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(s.to_string())),
        ColumnKind::Boolean if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        ColumnKind::Boolean if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let t = table(&state, &table_name)?;
    let mut limit: Option<u32> = None;
    let mut offset: Option<u32> = None;
    let mut filters: Vec<(String, Value)> = Vec::new();

    for (k, v) in params {
        match k.as_str() {
            "limit" => limit = v.parse().ok(),
            "offset" => offset = v.parse().ok(),
            _ => {
                if let Some(col) = t.column(&k) {
                    let val = query_value_for_column(col.kind, &v);
                    filters.push((k, val));
                }
            }
        }
    }
    // Stable SQL text for identical requests.
    filters.sort_by(|a, b| a.0.cmp(&b.0));

    let rows = state
        .records
        .list(&table_name, &filters, limit, offset)
        .await?;
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((table_name, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let t = table(&state, &table_name)?;
    let id = parse_id(t, &id_str)?;
    let row = state
        .records
        .read(&table_name, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    table(&state, &table_name)?;
    let body = body_to_map(body)?;
    let row = state.records.insert(&table_name, &body).await?;
    Ok(success_one(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((table_name, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let t = table(&state, &table_name)?;
    let id = parse_id(t, &id_str)?;
    let body = body_to_map(body)?;
    let row = state
        .records
        .update(&table_name, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_follow_column_kind() {
        assert_eq!(query_value_for_column(ColumnKind::Integer, "12"), Value::from(12));
        assert_eq!(query_value_for_column(ColumnKind::Integer, "x"), Value::from("x"));
        assert_eq!(query_value_for_column(ColumnKind::Boolean, "TRUE"), Value::Bool(true));
        assert_eq!(query_value_for_column(ColumnKind::Boolean, "0"), Value::from("0"));
        assert_eq!(query_value_for_column(ColumnKind::Text, "eu"), Value::from("eu"));
    }
}
