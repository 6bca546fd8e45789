//! Guild site backend core: dialect selection, schema definitions, PostgreSQL → MySQL SQL
//! translation, startup migrations, and the client-side route resolver and response parser.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod ops_log;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{resolve_dialect, ClientContext, Dialect, Settings};
pub use error::{AppError, ClientError, ConfigError, MigrationError, SchemaError};
pub use migration::{apply_migrations, MigrationOptions, MigrationReport, SqlExecutor};
pub use ops_log::{OpsLevel, OpsLog};
pub use response::{success_many, success_one, success_one_ok};
pub use routes::{app, common_routes, common_routes_with_ready, record_routes};
pub use schema::Schema;
pub use service::RecordService;
pub use sql::translate;
pub use state::AppState;
pub use store::{ensure_session_table, Database};
