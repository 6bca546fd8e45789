//! Builds parameterized INSERT, SELECT and UPDATE from a table definition.
//!
//! SQL is written PostgreSQL-flavoured (`::text` casts, `RETURNING`) with dialect placeholders
//! (`$n` or `?`); `store::Database::prepare` runs it through the translator before execution.

use crate::config::Dialect;
use crate::schema::{ColumnDef, ColumnKind, TableDef};
use crate::sql::params::BindValue;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const MAX_LIMIT: u32 = 1000;

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
    dialect: Dialect,
}

impl QueryBuf {
    fn new(dialect: Dialect) -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
            dialect,
        }
    }

    /// Add a parameter for `col` and return its placeholder.
    /// On postgres, timestamp and json parameters are cast so text binds correctly.
    fn push_param(&mut self, col: &ColumnDef, v: &Value) -> String {
        self.params.push(BindValue::for_column(v, col.kind));
        match self.dialect {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => {
                let n = self.params.len();
                match col.kind {
                    ColumnKind::Timestamp => format!("${}::timestamp", n),
                    ColumnKind::Json => format!("${}::jsonb", n),
                    _ => format!("${}", n),
                }
            }
        }
    }
}

/// SELECT list: timestamp and json columns as text so every column decodes through `sqlx::Any`.
fn select_column_list(table: &TableDef) -> String {
    table
        .select_columns()
        .map(|c| match c.kind {
            ColumnKind::Timestamp | ColumnKind::Json => format!("{}::text AS {}", c.name, c.name),
            _ => c.name.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(table: &TableDef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new(table.dialect());
    let pk = table.primary_key();
    let ph = q.push_param(pk, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        table.name,
        pk.name,
        ph
    );
    q
}

/// SELECT list with optional exact-match filters, ORDER BY pk, LIMIT (capped) and OFFSET.
/// Filters on unknown columns are ignored.
pub fn select_list(
    table: &TableDef,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new(table.dialect());
    let mut where_parts = Vec::new();
    for (name, val) in filters {
        if let Some(col) = table.column(name) {
            let ph = q.push_param(col, val);
            where_parts.push(format!("{} = {}", col.name, ph));
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let limit_clause = limit
        .map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT)))
        .unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(table),
        table.name,
        where_clause,
        table.primary_key().name,
        limit_clause,
        offset_clause
    );
    q
}

/// INSERT of the insert-contract columns present in `body`, returning the primary key.
/// Columns with a database default are omitted when the body leaves them out or null.
pub fn insert(table: &TableDef, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new(table.dialect());
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in table.insert_columns() {
        let val = match body.get(c.name) {
            Some(Value::Null) | None if c.default.is_some() => continue,
            Some(v) => v.clone(),
            None => Value::Null,
        };
        placeholders.push(q.push_param(c, &val));
        cols.push(c.name);
    }
    q.sql = if cols.is_empty() {
        let all_defaults = match table.dialect() {
            Dialect::Postgres => "DEFAULT VALUES",
            Dialect::MySql => "() VALUES ()",
        };
        format!(
            "INSERT INTO {} {} RETURNING {}",
            table.name,
            all_defaults,
            table.primary_key().name
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table.name,
            cols.join(", "),
            placeholders.join(", "),
            table.primary_key().name
        )
    };
    q
}

/// UPDATE by id: SET only insert-contract columns present in `body`; bumps `updated_at` when the
/// table has one. Returns None when nothing would change.
pub fn update(table: &TableDef, id: &Value, body: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new(table.dialect());
    let allowed: HashSet<&str> = table.insert_columns().map(|c| c.name).collect();
    let mut sets = Vec::new();
    for c in table.columns.iter().filter(|c| allowed.contains(c.name)) {
        if let Some(v) = body.get(c.name) {
            let ph = q.push_param(c, v);
            sets.push(format!("{} = {}", c.name, ph));
        }
    }
    if sets.is_empty() {
        return None;
    }
    if table.column("updated_at").is_some() {
        sets.push("updated_at = CURRENT_TIMESTAMP".to_string());
    }
    let pk = table.primary_key();
    let ph = q.push_param(pk, id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        table.name,
        sets.join(", "),
        pk.name,
        ph
    );
    Some(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entities::{CHARACTERS, GUILDS, RAID_BOSSES};
    use crate::schema::Schema;
    use crate::sql::translate::translate;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn select_by_id_postgres() {
        let schema = Schema::new(Dialect::Postgres).unwrap();
        let q = select_by_id(schema.table(GUILDS).unwrap(), &json!(3));
        assert_eq!(
            q.sql,
            "SELECT id, name, realm, region, faction, raid_progress::text AS raid_progress, \
             last_synced::text AS last_synced, created_at::text AS created_at FROM guilds WHERE id = $1"
        );
        assert_eq!(q.params, vec![BindValue::I64(3)]);
    }

    #[test]
    fn select_by_id_mysql_translates_cleanly() {
        let schema = Schema::new(Dialect::MySql).unwrap();
        let q = select_by_id(schema.table(CHARACTERS).unwrap(), &json!("9"));
        let sql = translate(&q.sql, Dialect::MySql);
        assert!(sql.contains("`rank`"));
        assert!(sql.contains("CAST(created_at AS CHAR) AS created_at"));
        assert!(sql.ends_with("WHERE id = ?"));
        assert!(!sql.contains("::"));
    }

    #[test]
    fn list_filters_known_columns_and_caps_limit() {
        let schema = Schema::new(Dialect::Postgres).unwrap();
        let q = select_list(
            schema.table(RAID_BOSSES).unwrap(),
            &[
                ("guild_id".into(), json!(1)),
                ("nope".into(), json!("x")),
                ("first_kill".into(), json!("2024-01-01 00:00:00")),
            ],
            Some(5000),
            Some(20),
        );
        assert!(q.sql.contains(" WHERE guild_id = $1 AND first_kill = $2::timestamp ORDER BY id LIMIT 1000 OFFSET 20"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn insert_skips_defaults_and_returns_pk() {
        let schema = Schema::new(Dialect::MySql).unwrap();
        let q = insert(
            schema.table(RAID_BOSSES).unwrap(),
            &body(json!({
                "guild_id": 1,
                "raid_name": "Nerub-ar Palace",
                "name": "Ulgrax",
                "slug": "ulgrax",
                "defeated": null,
                "first_kill": null,
                "id": 99,
                "created_at": "2020-01-01"
            })),
        );
        assert_eq!(
            q.sql,
            "INSERT INTO raid_bosses (guild_id, raid_name, name, slug, first_kill, best_percent) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id"
        );
        assert_eq!(q.params[4], BindValue::NullText);
        assert_eq!(q.params[5], BindValue::NullInt);
        assert_eq!(
            translate(&q.sql, Dialect::MySql),
            "INSERT INTO raid_bosses (guild_id, raid_name, name, slug, first_kill, best_percent) \
             VALUES (?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn update_only_touches_present_columns() {
        let schema = Schema::new(Dialect::Postgres).unwrap();
        let table = schema.table(RAID_BOSSES).unwrap();
        let q = update(
            table,
            &json!(4),
            &body(json!({"defeated": true, "pull_count": 212, "created_at": "x"})),
        )
        .unwrap();
        assert_eq!(
            q.sql,
            "UPDATE raid_bosses SET defeated = $1, pull_count = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3"
        );
        assert!(update(table, &json!(4), &body(json!({"id": 5}))).is_none());
    }
}
