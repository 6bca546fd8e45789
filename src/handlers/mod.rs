//! Route handlers.

pub mod records;
pub mod schema;
