//! Guild site server.
//!
//! `cargo run -p guildsite-server` starts the API; `cargo run -p guildsite-server -- emit-migration`
//! prints the schema DDL for the configured dialect and exits.

use guildsite::{
    app, apply_migrations, ensure_session_table, AppState, Database, MigrationOptions, OpsLevel,
    OpsLog, Schema, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("guildsite=info,guildsite_server=info")),
        )
        .init();

    // Missing connection settings are the one fatal startup error.
    let settings = Settings::from_env()?;
    let schema = Arc::new(Schema::new(settings.dialect)?);

    if std::env::args().nth(1).as_deref() == Some("emit-migration") {
        println!("{}", schema.ddl());
        return Ok(());
    }

    let ops = OpsLog::new(&settings.ops_log_path);
    let db = Database::connect(&settings).await?;

    if let Err(e) = ensure_session_table(&db).await {
        tracing::warn!(error = %e, "could not create session table");
        ops.record(OpsLevel::Warn, "session-table", &e.to_string()).await;
    }
    let report = apply_migrations(&db, &MigrationOptions::new(&settings.migrations_dir), &ops).await;
    if !report.failed.is_empty() || report.aborted.is_some() {
        tracing::warn!(
            failed = report.failed.len(),
            aborted = report.aborted.is_some(),
            "starting with a possibly stale schema"
        );
    }

    let app = app(AppState::new(db, schema));
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        dialect = %settings.dialect,
        "guild site listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
