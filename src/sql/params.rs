//! Convert serde_json::Value to values the `sqlx::Any` driver can bind.

use crate::schema::ColumnKind;
use serde_json::Value;
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;

/// A bindable value, typed by the column it targets so NULLs carry the right parameter type.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    NullText,
    NullInt,
    NullBool,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl BindValue {
    /// Coerce a JSON value for a column of `kind`.
    pub fn for_column(v: &Value, kind: ColumnKind) -> Self {
        match (kind, v) {
            (ColumnKind::Serial | ColumnKind::Integer, Value::Null) => BindValue::NullInt,
            (ColumnKind::Boolean, Value::Null) => BindValue::NullBool,
            (_, Value::Null) => BindValue::NullText,
            (ColumnKind::Serial | ColumnKind::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) => BindValue::I64(i),
                None => BindValue::F64(n.as_f64().unwrap_or_default()),
            },
            (ColumnKind::Serial | ColumnKind::Integer, Value::String(s)) => match s.trim().parse() {
                Ok(i) => BindValue::I64(i),
                Err(_) => BindValue::Text(s.clone()),
            },
            (ColumnKind::Boolean, Value::Bool(b)) => BindValue::Bool(*b),
            (ColumnKind::Boolean, Value::Number(n)) => BindValue::Bool(n.as_i64().unwrap_or(0) != 0),
            (ColumnKind::Boolean, Value::String(s)) => {
                BindValue::Bool(matches!(s.trim(), "true" | "1" | "t" | "yes"))
            }
            (ColumnKind::Json, other) => BindValue::Text(other.to_string()),
            (_, Value::String(s)) => BindValue::Text(s.clone()),
            (_, other) => BindValue::Text(other.to_string()),
        }
    }

    pub fn bind<'q>(
        &self,
        query: Query<'q, Any, AnyArguments<'q>>,
    ) -> Query<'q, Any, AnyArguments<'q>> {
        match self {
            BindValue::NullText => query.bind(None::<String>),
            BindValue::NullInt => query.bind(None::<i64>),
            BindValue::NullBool => query.bind(None::<bool>),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::I64(n) => query.bind(*n),
            BindValue::F64(n) => query.bind(*n),
            BindValue::Text(s) => query.bind(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nulls_are_typed_by_column() {
        assert_eq!(BindValue::for_column(&Value::Null, ColumnKind::Integer), BindValue::NullInt);
        assert_eq!(BindValue::for_column(&Value::Null, ColumnKind::Boolean), BindValue::NullBool);
        assert_eq!(BindValue::for_column(&Value::Null, ColumnKind::Timestamp), BindValue::NullText);
    }

    #[test]
    fn coerces_by_kind() {
        assert_eq!(BindValue::for_column(&json!("42"), ColumnKind::Serial), BindValue::I64(42));
        assert_eq!(BindValue::for_column(&json!(1), ColumnKind::Boolean), BindValue::Bool(true));
        assert_eq!(
            BindValue::for_column(&json!({"a": 1}), ColumnKind::Json),
            BindValue::Text("{\"a\":1}".into())
        );
        assert_eq!(
            BindValue::for_column(&json!("2024-05-01 20:00:00"), ColumnKind::Timestamp),
            BindValue::Text("2024-05-01 20:00:00".into())
        );
        assert_eq!(BindValue::for_column(&json!(7), ColumnKind::Text), BindValue::Text("7".into()));
    }
}
