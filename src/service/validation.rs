//! Request validation against the table definition.

use crate::error::AppError;
use crate::schema::{ColumnDef, ColumnKind, TableDef};
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate an insert body. Required columns (NOT NULL, no default, not server-generated)
    /// must be present and non-null.
    pub fn validate(table: &TableDef, body: &Map<String, Value>) -> Result<(), AppError> {
        for col in table.insert_columns() {
            let val = body.get(col.name);
            let required = !col.nullable && col.default.is_none();
            if required && val.map_or(true, Value::is_null) {
                return Err(AppError::BadRequest(format!("{} is required", col.name)));
            }
            if let Some(v) = val {
                validate_field(col, v)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PATCH). Null is rejected on NOT NULL columns.
    pub fn validate_partial(table: &TableDef, body: &Map<String, Value>) -> Result<(), AppError> {
        for (name, v) in body {
            let Some(col) = table.column(name) else {
                continue;
            };
            if v.is_null() && !col.nullable {
                return Err(AppError::BadRequest(format!("{} cannot be null", name)));
            }
            validate_field(col, v)?;
        }
        Ok(())
    }
}

fn validate_field(col: &ColumnDef, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let ok = match col.kind {
        ColumnKind::Serial | ColumnKind::Integer => match v {
            Value::Number(n) => n.is_i64() || n.is_u64(),
            Value::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },
        ColumnKind::Boolean => match v {
            Value::Bool(_) => true,
            Value::Number(n) => matches!(n.as_i64(), Some(0 | 1)),
            _ => false,
        },
        ColumnKind::Json => v.is_object() || v.is_array(),
        ColumnKind::Text | ColumnKind::Timestamp => v.is_string() || v.is_number(),
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{} must be {}",
            col.name,
            expected(col.kind)
        )))
    }
}

fn expected(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Serial | ColumnKind::Integer => "an integer",
        ColumnKind::Boolean => "a boolean",
        ColumnKind::Json => "an object or array",
        ColumnKind::Text => "a string",
        ColumnKind::Timestamp => "a timestamp string",
    }
}
