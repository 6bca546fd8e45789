//! Dialect-neutral column kinds and their per-dialect constructors.

use crate::config::Dialect;
use serde::Serialize;

/// Abstract column kind used by every table definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Serial,
    Integer,
    Boolean,
    Timestamp,
    Json,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 6] = [
        ColumnKind::Text,
        ColumnKind::Serial,
        ColumnKind::Integer,
        ColumnKind::Boolean,
        ColumnKind::Timestamp,
        ColumnKind::Json,
    ];
}

/// Concrete storage type for one kind in one dialect.
/// `keyed` is used when the column takes part in a key, unique constraint or literal default;
/// `nullable` when the column accepts NULL. Most kinds use `base` for all three.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnType {
    pub base: &'static str,
    pub keyed: &'static str,
    pub nullable: &'static str,
}

impl ColumnType {
    const fn uniform(t: &'static str) -> Self {
        ColumnType {
            base: t,
            keyed: t,
            nullable: t,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    Now,
    Bool(bool),
    Int(i64),
    Text(String),
    JsonArray,
    JsonObject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

/// One column of a table definition, bound to the dialect that built it.
#[derive(Clone, Debug, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
    pub references: Option<ForeignKey>,
    #[serde(skip)]
    types: ColumnType,
    #[serde(skip)]
    dialect: Dialect,
}

impl ColumnDef {
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = Some(ColumnDefault::Now);
        self
    }

    pub fn default_bool(mut self, v: bool) -> Self {
        self.default = Some(ColumnDefault::Bool(v));
        self
    }

    pub fn default_int(mut self, v: i64) -> Self {
        self.default = Some(ColumnDefault::Int(v));
        self
    }

    pub fn default_text(mut self, v: &str) -> Self {
        self.default = Some(ColumnDefault::Text(v.to_string()));
        self
    }

    pub fn default_json_array(mut self) -> Self {
        self.default = Some(ColumnDefault::JsonArray);
        self
    }

    pub fn default_json_object(mut self) -> Self {
        self.default = Some(ColumnDefault::JsonObject);
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    /// Primary key or default filled in by the database; excluded from insert contracts.
    pub fn is_server_generated(&self) -> bool {
        (self.primary_key && self.kind == ColumnKind::Serial)
            || matches!(self.default, Some(ColumnDefault::Now))
    }

    fn is_keyed(&self) -> bool {
        self.primary_key
            || self.unique
            || self.references.is_some()
            || matches!(self.default, Some(ColumnDefault::Text(_)))
    }

    /// Concrete SQL type for this column in its dialect.
    pub fn sql_type(&self) -> &'static str {
        if self.is_keyed() {
            self.types.keyed
        } else if self.nullable {
            self.types.nullable
        } else {
            self.types.base
        }
    }

    /// Column clause for CREATE TABLE, without table-level constraints.
    pub fn definition(&self) -> String {
        let mut def = format!("{} {}", quote_ident(self.dialect, self.name), self.sql_type());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            def.push_str(" UNIQUE");
        }
        if let Some(d) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(&render_default(self.dialect, d));
        }
        def
    }
}

/// Quote an identifier for the dialect (identifiers come from table definitions only).
pub fn quote_ident(dialect: Dialect, s: &str) -> String {
    match dialect {
        Dialect::Postgres => format!("\"{}\"", s.replace('"', "\"\"")),
        Dialect::MySql => format!("`{}`", s.replace('`', "``")),
    }
}

fn render_default(dialect: Dialect, d: &ColumnDefault) -> String {
    match (dialect, d) {
        (Dialect::Postgres, ColumnDefault::Now) => "NOW()".into(),
        (Dialect::MySql, ColumnDefault::Now) => "CURRENT_TIMESTAMP".into(),
        (Dialect::Postgres, ColumnDefault::Bool(b)) => String::from(if *b { "TRUE" } else { "FALSE" }),
        (Dialect::MySql, ColumnDefault::Bool(b)) => String::from(if *b { "1" } else { "0" }),
        (_, ColumnDefault::Int(n)) => n.to_string(),
        (_, ColumnDefault::Text(s)) => format!("'{}'", s.replace('\'', "''")),
        (Dialect::Postgres, ColumnDefault::JsonArray) => "'[]'::jsonb".into(),
        (Dialect::Postgres, ColumnDefault::JsonObject) => "'{}'::jsonb".into(),
        (Dialect::MySql, ColumnDefault::JsonArray) => "(JSON_ARRAY())".into(),
        (Dialect::MySql, ColumnDefault::JsonObject) => "(JSON_OBJECT())".into(),
    }
}

/// Column constructors for one dialect. The kind → type mapping is an exhaustive match,
/// so every kind has exactly one constructor per dialect.
#[derive(Clone, Copy, Debug)]
pub struct ColumnBuilderSet {
    dialect: Dialect,
}

impl ColumnBuilderSet {
    pub fn for_dialect(dialect: Dialect) -> Self {
        ColumnBuilderSet { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn column_type(&self, kind: ColumnKind) -> ColumnType {
        match (self.dialect, kind) {
            (Dialect::Postgres, ColumnKind::Text) => ColumnType::uniform("TEXT"),
            (Dialect::Postgres, ColumnKind::Serial) => ColumnType::uniform("SERIAL"),
            (Dialect::Postgres, ColumnKind::Integer) => ColumnType::uniform("INTEGER"),
            (Dialect::Postgres, ColumnKind::Boolean) => ColumnType::uniform("BOOLEAN"),
            (Dialect::Postgres, ColumnKind::Timestamp) => ColumnType::uniform("TIMESTAMP"),
            (Dialect::Postgres, ColumnKind::Json) => ColumnType::uniform("JSONB"),
            (Dialect::MySql, ColumnKind::Text) => ColumnType {
                base: "TEXT",
                keyed: "VARCHAR(255)",
                nullable: "TEXT",
            },
            (Dialect::MySql, ColumnKind::Serial) => ColumnType::uniform("INT AUTO_INCREMENT"),
            (Dialect::MySql, ColumnKind::Integer) => ColumnType::uniform("INT"),
            (Dialect::MySql, ColumnKind::Boolean) => ColumnType::uniform("TINYINT(1)"),
            (Dialect::MySql, ColumnKind::Timestamp) => ColumnType {
                base: "TIMESTAMP",
                keyed: "TIMESTAMP",
                nullable: "DATETIME",
            },
            (Dialect::MySql, ColumnKind::Json) => ColumnType::uniform("JSON"),
        }
    }

    pub fn column(&self, name: &'static str, kind: ColumnKind) -> ColumnDef {
        ColumnDef {
            name,
            kind,
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
            references: None,
            types: self.column_type(kind),
            dialect: self.dialect,
        }
    }

    pub fn text(&self, name: &'static str) -> ColumnDef {
        self.column(name, ColumnKind::Text)
    }

    pub fn serial(&self, name: &'static str) -> ColumnDef {
        self.column(name, ColumnKind::Serial)
    }

    pub fn integer(&self, name: &'static str) -> ColumnDef {
        self.column(name, ColumnKind::Integer)
    }

    pub fn boolean(&self, name: &'static str) -> ColumnDef {
        self.column(name, ColumnKind::Boolean)
    }

    pub fn timestamp(&self, name: &'static str) -> ColumnDef {
        self.column(name, ColumnKind::Timestamp)
    }

    pub fn json(&self, name: &'static str) -> ColumnDef {
        self.column(name, ColumnKind::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_in_every_dialect() {
        for dialect in Dialect::ALL {
            let b = ColumnBuilderSet::for_dialect(dialect);
            for kind in ColumnKind::ALL {
                let t = b.column_type(kind);
                assert!(!t.base.is_empty(), "{:?}/{:?}", dialect, kind);
                assert!(!t.keyed.is_empty(), "{:?}/{:?}", dialect, kind);
                assert!(!t.nullable.is_empty(), "{:?}/{:?}", dialect, kind);
            }
        }
    }

    #[test]
    fn serial_primary_key_per_dialect() {
        let pg = ColumnBuilderSet::for_dialect(Dialect::Postgres).serial("id").primary_key();
        assert_eq!(pg.definition(), "\"id\" SERIAL PRIMARY KEY");
        let my = ColumnBuilderSet::for_dialect(Dialect::MySql).serial("id").primary_key();
        assert_eq!(my.definition(), "`id` INT AUTO_INCREMENT PRIMARY KEY");
        assert!(my.is_server_generated());
    }

    #[test]
    fn keyed_text_is_bounded_on_mysql() {
        let b = ColumnBuilderSet::for_dialect(Dialect::MySql);
        assert_eq!(b.text("notes").sql_type(), "TEXT");
        assert_eq!(b.text("battletag").not_null().unique().sql_type(), "VARCHAR(255)");
        assert_eq!(
            b.text("status").not_null().default_text("pending").definition(),
            "`status` VARCHAR(255) NOT NULL DEFAULT 'pending'"
        );
    }

    #[test]
    fn defaults_render_per_dialect() {
        let pg = ColumnBuilderSet::for_dialect(Dialect::Postgres);
        let my = ColumnBuilderSet::for_dialect(Dialect::MySql);
        assert_eq!(
            pg.timestamp("created_at").not_null().default_now().definition(),
            "\"created_at\" TIMESTAMP NOT NULL DEFAULT NOW()"
        );
        assert_eq!(
            my.timestamp("created_at").not_null().default_now().definition(),
            "`created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );
        assert_eq!(
            my.boolean("defeated").not_null().default_bool(false).definition(),
            "`defeated` TINYINT(1) NOT NULL DEFAULT 0"
        );
        assert_eq!(
            my.json("details").not_null().default_json_object().definition(),
            "`details` JSON NOT NULL DEFAULT (JSON_OBJECT())"
        );
        assert_eq!(my.timestamp("first_kill").sql_type(), "DATETIME");
    }

    #[test]
    fn timestamp_default_is_server_generated() {
        let b = ColumnBuilderSet::for_dialect(Dialect::Postgres);
        assert!(b.timestamp("updated_at").default_now().is_server_generated());
        assert!(!b.timestamp("first_kill").is_server_generated());
        assert!(!b.integer("id").primary_key().is_server_generated());
    }
}
