//! Dialect-neutral schema: column builders, table definitions, entity contracts.

pub mod columns;
pub mod contracts;
pub mod entities;
pub mod table;

pub use columns::{quote_ident, ColumnBuilderSet, ColumnDef, ColumnKind};
pub use contracts::Entity;
pub use entities::Schema;
pub use table::TableDef;
