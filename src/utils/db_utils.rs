use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{Executor, MySql};

use crate::error::{AppError, AppResult};

/// SQL bindable value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    F64(f64),
    Date(NaiveDate),
    Null,
}

/// How a whitelisted column's JSON value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Id,
    Money,
    Date,
}

/// An updatable column and whether it accepts `null`.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Column {
    pub const fn nullable(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind, nullable: true }
    }

    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind, nullable: false }
    }
}

/// SQL update container
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn typed_value(column: &Column, value: &Value) -> AppResult<SqlValue> {
    let name = column.name;
    let bad = || AppError::invalid(format!("Invalid value for '{name}'"));

    let typed = match (column.kind, value) {
        (_, Value::Null) if column.nullable => SqlValue::Null,
        (_, Value::Null) => return Err(AppError::invalid(format!("'{name}' cannot be null"))),
        (ColumnKind::Text, Value::String(s)) => SqlValue::String(s.trim().to_string()),
        (ColumnKind::Id, Value::Number(n)) => SqlValue::U64(n.as_u64().ok_or_else(bad)?),
        (ColumnKind::Money, Value::Number(n)) => {
            let amount = n.as_f64().ok_or_else(bad)?;
            if amount < 0.0 {
                return Err(AppError::invalid(format!("'{name}' must not be negative")));
            }
            SqlValue::F64(amount)
        }
        (ColumnKind::Date, Value::String(s)) => {
            SqlValue::Date(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| bad())?)
        }
        _ => return Err(bad()),
    };
    Ok(typed)
}

/// Builds `UPDATE table SET ... WHERE id_column = ?` from a JSON object.
///
/// Only columns listed in `allowed` may appear; the column names in the SQL
/// come from that list, never from the payload. Returns `None` when the
/// payload is empty.
pub fn build_update_sql(
    table: &str,
    payload: &Map<String, Value>,
    allowed: &[Column],
    id_column: &str,
    id_value: u64,
) -> AppResult<Option<SqlUpdate>> {
    if let Some(unknown) = payload
        .keys()
        .find(|k| !allowed.iter().any(|col| col.name == k.as_str()))
    {
        return Err(AppError::invalid(format!("Field '{unknown}' cannot be updated")));
    }

    let mut columns = Vec::with_capacity(payload.len());
    let mut values = Vec::with_capacity(payload.len() + 1);

    // Whitelist order keeps the SQL stable regardless of payload order.
    for column in allowed {
        if let Some(value) = payload.get(column.name) {
            columns.push(format!("{} = ?", column.name));
            values.push(typed_value(column, value)?);
        }
    }

    if columns.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        columns.join(", "),
        id_column
    );
    values.push(SqlValue::U64(id_value));

    Ok(Some(SqlUpdate { sql, values }))
}

/// Execute the update
pub async fn execute_update<'c, E>(executor: E, update: &SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in &update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[Column] = &[
        Column::nullable("designation", ColumnKind::Text),
        Column::nullable("department_id", ColumnKind::Id),
        Column::required("salary", ColumnKind::Money),
        Column::nullable("dob", ColumnKind::Date),
    ];

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn builds_set_clause_in_whitelist_order() {
        let payload = object(json!({"salary": 1200.5, "designation": " Lead ", "dob": "1990-05-17"}));
        let update = build_update_sql("employees", &payload, COLUMNS, "id", 7)
            .unwrap()
            .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET designation = ?, salary = ?, dob = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Lead".into()),
                SqlValue::F64(1200.5),
                SqlValue::Date(NaiveDate::from_ymd_opt(1990, 5, 17).unwrap()),
                SqlValue::U64(7),
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_the_whitelist() {
        let payload = object(json!({"user_id": 1}));
        let err = build_update_sql("employees", &payload, COLUMNS, "id", 1).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_mistyped_or_negative_values() {
        for payload in [
            json!({"salary": -1}),
            json!({"salary": "lots"}),
            json!({"department_id": -3}),
            json!({"dob": "17/05/1990"}),
        ] {
            assert!(build_update_sql("employees", &object(payload), COLUMNS, "id", 1).is_err());
        }
    }

    #[test]
    fn null_clears_and_empty_payload_is_none() {
        let update = build_update_sql("employees", &object(json!({"department_id": null})), COLUMNS, "id", 1)
            .unwrap()
            .unwrap();
        assert_eq!(update.values[0], SqlValue::Null);

        assert!(build_update_sql("employees", &Map::new(), COLUMNS, "id", 1).unwrap().is_none());
    }

    #[test]
    fn null_is_refused_for_required_columns() {
        let err = build_update_sql("employees", &object(json!({"salary": null})), COLUMNS, "id", 1)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(ref msg) if msg == "'salary' cannot be null"));
    }
}
