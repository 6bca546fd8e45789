//! Entity table definitions: a named column set with one primary key and optional foreign keys.

use crate::config::Dialect;
use crate::error::SchemaError;
use crate::schema::columns::{quote_ident, ColumnDef};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: Vec<ColumnDef>,
    #[serde(skip)]
    pk_index: usize,
    #[serde(skip)]
    dialect: Dialect,
}

impl TableDef {
    /// Build a table. Exactly one primary-key column is required.
    pub fn new(
        dialect: Dialect,
        name: &'static str,
        columns: Vec<ColumnDef>,
    ) -> Result<Self, SchemaError> {
        let pk_index = columns
            .iter()
            .position(|c| c.primary_key)
            .ok_or(SchemaError::MissingPrimaryKey(name))?;
        Ok(TableDef {
            name,
            columns,
            pk_index,
            dialect,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn primary_key(&self) -> &ColumnDef {
        &self.columns[self.pk_index]
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns a caller may supply on insert (server-generated ones excluded).
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.is_server_generated())
    }

    /// Columns returned by reads.
    pub fn select_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    pub fn insert_column_names(&self) -> Vec<&'static str> {
        self.insert_columns().map(|c| c.name).collect()
    }

    pub fn select_column_names(&self) -> Vec<&'static str> {
        self.select_columns().map(|c| c.name).collect()
    }

    /// CREATE TABLE IF NOT EXISTS with foreign keys as table-level constraints
    /// (MySQL ignores inline REFERENCES).
    pub fn create_statement(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::definition).collect();
        for c in &self.columns {
            if let Some(fk) = &c.references {
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_ident(self.dialect, c.name),
                    quote_ident(self.dialect, fk.table),
                    quote_ident(self.dialect, fk.column)
                ));
            }
        }
        let suffix = match self.dialect {
            Dialect::Postgres => "",
            Dialect::MySql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n){}",
            quote_ident(self.dialect, self.name),
            parts.join(",\n  "),
            suffix
        )
    }
}
