//! The guild site's tables, defined once against the dialect's column constructors.

use crate::config::Dialect;
use crate::error::SchemaError;
use crate::schema::columns::ColumnBuilderSet;
use crate::schema::table::TableDef;
use std::collections::HashSet;

pub const USERS: &str = "users";
pub const GUILDS: &str = "guilds";
pub const CHARACTERS: &str = "characters";
pub const RAID_BOSSES: &str = "raid_bosses";
pub const APPLICATIONS: &str = "applications";

/// All entity tables for one dialect. Built once at startup, read-only afterwards.
#[derive(Clone, Debug)]
pub struct Schema {
    dialect: Dialect,
    tables: Vec<TableDef>,
}

impl Schema {
    /// Build every table and check foreign keys, so a broken definition fails at startup.
    pub fn new(dialect: Dialect) -> Result<Self, SchemaError> {
        let b = ColumnBuilderSet::for_dialect(dialect);
        let tables = vec![
            users(&b)?,
            guilds(&b)?,
            characters(&b)?,
            raid_bosses(&b)?,
            applications(&b)?,
        ];
        let schema = Schema { dialect, tables };
        schema.check_references()?;
        Ok(schema)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// DDL for every table, in dependency order, `;`-terminated.
    pub fn ddl(&self) -> String {
        self.tables
            .iter()
            .map(|t| format!("{};\n", t.create_statement()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for t in &self.tables {
            if !seen.insert(t.name) {
                return Err(SchemaError::DuplicateTable(t.name));
            }
        }
        for t in &self.tables {
            for c in &t.columns {
                let Some(fk) = &c.references else { continue };
                let target = self.table(fk.table).and_then(|tt| tt.column(fk.column));
                if target.is_none() {
                    return Err(SchemaError::DanglingReference {
                        table: t.name,
                        column: c.name,
                        target: format!("{}.{}", fk.table, fk.column),
                    });
                }
            }
        }
        Ok(())
    }
}

fn users(b: &ColumnBuilderSet) -> Result<TableDef, SchemaError> {
    TableDef::new(
        b.dialect(),
        USERS,
        vec![
            b.serial("id").primary_key(),
            b.integer("bnet_id").not_null().unique(),
            b.text("battletag").not_null().unique(),
            b.text("access_token"),
            b.boolean("is_admin").not_null().default_bool(false),
            b.timestamp("created_at").not_null().default_now(),
            b.timestamp("updated_at").not_null().default_now(),
        ],
    )
}

fn guilds(b: &ColumnBuilderSet) -> Result<TableDef, SchemaError> {
    TableDef::new(
        b.dialect(),
        GUILDS,
        vec![
            b.serial("id").primary_key(),
            b.text("name").not_null(),
            b.text("realm").not_null(),
            b.text("region").not_null().default_text("eu"),
            b.text("faction"),
            b.json("raid_progress").not_null().default_json_object(),
            b.timestamp("last_synced"),
            b.timestamp("created_at").not_null().default_now(),
        ],
    )
}

fn characters(b: &ColumnBuilderSet) -> Result<TableDef, SchemaError> {
    TableDef::new(
        b.dialect(),
        CHARACTERS,
        vec![
            b.serial("id").primary_key(),
            b.integer("guild_id").not_null().references(GUILDS, "id"),
            b.integer("user_id").references(USERS, "id"),
            b.text("name").not_null(),
            b.text("realm").not_null(),
            b.text("class").not_null(),
            b.text("spec"),
            b.text("role"),
            b.integer("rank").not_null().default_int(0),
            b.integer("item_level"),
            b.boolean("is_main").not_null().default_bool(false),
            b.timestamp("created_at").not_null().default_now(),
            b.timestamp("updated_at").not_null().default_now(),
        ],
    )
}

fn raid_bosses(b: &ColumnBuilderSet) -> Result<TableDef, SchemaError> {
    TableDef::new(
        b.dialect(),
        RAID_BOSSES,
        vec![
            b.serial("id").primary_key(),
            b.integer("guild_id").not_null().references(GUILDS, "id"),
            b.text("raid_name").not_null(),
            b.text("name").not_null(),
            b.text("slug").not_null(),
            b.text("difficulty").not_null().default_text("mythic"),
            b.boolean("defeated").not_null().default_bool(false),
            b.timestamp("first_kill"),
            b.integer("pull_count").not_null().default_int(0),
            b.integer("best_percent"),
            b.integer("sort_order").not_null().default_int(0),
            b.timestamp("created_at").not_null().default_now(),
            b.timestamp("updated_at").not_null().default_now(),
        ],
    )
}

fn applications(b: &ColumnBuilderSet) -> Result<TableDef, SchemaError> {
    TableDef::new(
        b.dialect(),
        APPLICATIONS,
        vec![
            b.serial("id").primary_key(),
            b.text("character_name").not_null(),
            b.text("realm").not_null(),
            b.text("class").not_null(),
            b.text("spec").not_null(),
            b.integer("item_level"),
            b.text("battletag").not_null(),
            b.text("contact"),
            b.text("experience"),
            b.text("status").not_null().default_text("pending"),
            b.json("details").not_null().default_json_object(),
            b.timestamp("created_at").not_null().default_now(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::columns::ColumnKind;

    #[test]
    fn builds_for_both_dialects() {
        for dialect in Dialect::ALL {
            let s = Schema::new(dialect).unwrap();
            assert_eq!(s.tables().len(), 5);
            assert!(s.table(CHARACTERS).is_some());
        }
    }

    #[test]
    fn fields_and_kinds_match_across_dialects() {
        let pg = Schema::new(Dialect::Postgres).unwrap();
        let my = Schema::new(Dialect::MySql).unwrap();
        for (a, b) in pg.tables().iter().zip(my.tables()) {
            assert_eq!(a.name, b.name);
            let ka: Vec<(&str, ColumnKind, bool)> =
                a.columns.iter().map(|c| (c.name, c.kind, c.nullable)).collect();
            let kb: Vec<(&str, ColumnKind, bool)> =
                b.columns.iter().map(|c| (c.name, c.kind, c.nullable)).collect();
            assert_eq!(ka, kb, "table {}", a.name);
            assert_eq!(a.insert_column_names(), b.insert_column_names());
        }
    }

    #[test]
    fn storage_differs_only_in_representation() {
        let pg = Schema::new(Dialect::Postgres).unwrap();
        let my = Schema::new(Dialect::MySql).unwrap();
        let g_pg = pg.table(GUILDS).unwrap().column("raid_progress").unwrap().sql_type();
        let g_my = my.table(GUILDS).unwrap().column("raid_progress").unwrap().sql_type();
        assert_eq!(g_pg, "JSONB");
        assert_eq!(g_my, "JSON");
    }

    #[test]
    fn ddl_orders_parents_before_children() {
        let ddl = Schema::new(Dialect::MySql).unwrap().ddl();
        let guilds = ddl.find("`guilds`").unwrap();
        let characters = ddl.find("CREATE TABLE IF NOT EXISTS `characters`").unwrap();
        assert!(guilds < characters);
        assert_eq!(ddl.matches("CREATE TABLE IF NOT EXISTS").count(), 5);
        assert!(ddl.contains("`rank` INT NOT NULL DEFAULT 0"));
    }
}
