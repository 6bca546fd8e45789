//! Database handle over `sqlx::AnyPool`, bound to the dialect resolved at startup.

use crate::config::{Dialect, Settings};
use crate::error::AppError;
use crate::migration::SqlExecutor;
use crate::sql::translate;
use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

/// Session-store table as the session middleware emits it (PostgreSQL text).
/// On mysql it is replaced wholesale by the translator.
pub const SESSION_TABLE_DDL: &str = r#"CREATE TABLE IF NOT EXISTS "session" (
  "sid" varchar NOT NULL COLLATE "default",
  "sess" json NOT NULL,
  "expire" timestamp(6) NOT NULL DEFAULT (NOW() + '1 day'::interval),
  CONSTRAINT "session_pkey" PRIMARY KEY ("sid")
)"#;

const SESSION_INDEX_DDL: &str =
    r#"CREATE INDEX IF NOT EXISTS "IDX_session_expire" ON "session" ("expire")"#;

#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
}

impl Database {
    /// Connect with the URL and pool size from settings. Installs the Any drivers on first use.
    pub async fn connect(settings: &Settings) -> Result<Self, AppError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.database_url)
            .await?;
        tracing::info!(dialect = %settings.dialect, "database connected");
        Ok(Database {
            pool,
            dialect: settings.dialect,
        })
    }

    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Database { pool, dialect }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Hand-written or generated SQL goes through here before reaching the driver.
    pub fn prepare(&self, sql: &str) -> String {
        translate(sql, self.dialect)
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for Database {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), sqlx::Error> {
        tracing::debug!(bytes = sql.len(), "execute batch");
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
        tracing::debug!(sql = %sql, "execute");
        // Text protocol: MySQL refuses some DDL (procedures) as prepared statements.
        let res = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(res.rows_affected())
    }
}

/// Create the session-store table (and its expiry index on postgres) if missing.
pub async fn ensure_session_table(db: &dyn SqlExecutor) -> Result<(), AppError> {
    let ddl = translate(SESSION_TABLE_DDL, db.dialect());
    db.execute(&ddl).await?;
    if db.dialect() == Dialect::Postgres {
        db.execute(SESSION_INDEX_DDL).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::translate::SESSION_TABLE_MYSQL;
    use std::sync::Mutex;

    struct Recorder {
        dialect: Dialect,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SqlExecutor for Recorder {
        fn dialect(&self) -> Dialect {
            self.dialect
        }
        async fn execute_batch(&self, sql: &str) -> Result<(), sqlx::Error> {
            self.seen.lock().unwrap().push(sql.to_string());
            Ok(())
        }
        async fn execute(&self, sql: &str) -> Result<u64, sqlx::Error> {
            self.seen.lock().unwrap().push(sql.to_string());
            Ok(0)
        }
    }

    #[tokio::test]
    async fn session_table_uses_hand_written_mysql_statement() {
        let r = Recorder {
            dialect: Dialect::MySql,
            seen: Mutex::new(Vec::new()),
        };
        ensure_session_table(&r).await.unwrap();
        assert_eq!(*r.seen.lock().unwrap(), vec![SESSION_TABLE_MYSQL.to_string()]);
    }

    #[tokio::test]
    async fn session_table_postgres_runs_vendor_text_and_index() {
        let r = Recorder {
            dialect: Dialect::Postgres,
            seen: Mutex::new(Vec::new()),
        };
        ensure_session_table(&r).await.unwrap();
        let seen = r.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], SESSION_TABLE_DDL);
    }
}
