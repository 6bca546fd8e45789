//! Schema listing: the active dialect and each table's contracts.

use crate::config::Dialect;
use crate::response::success_one_ok;
use crate::schema::ColumnDef;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct SchemaView<'a> {
    dialect: Dialect,
    tables: Vec<TableView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableView<'a> {
    name: &'static str,
    primary_key: &'static str,
    insert_columns: Vec<&'static str>,
    select_columns: Vec<&'static str>,
    columns: &'a [ColumnDef],
}

pub async fn describe(State(state): State<AppState>) -> impl IntoResponse {
    let schema = state.schema();
    let tables = schema
        .tables()
        .iter()
        .map(|t| TableView {
            name: t.name,
            primary_key: t.primary_key().name,
            insert_columns: t.insert_column_names(),
            select_columns: t.select_column_names(),
            columns: &t.columns,
        })
        .collect();
    success_one_ok(SchemaView {
        dialect: schema.dialect(),
        tables,
    })
    .into_response()
}
