//! Record service over the schema tables, plus request validation.

mod records;
mod validation;
pub use records::{row_to_json, RecordService, DEFAULT_LIMIT};
pub use validation::RequestValidator;
