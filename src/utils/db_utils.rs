use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    Bool(bool),
    /// Serialized JSON document for JSON columns
    Json(String),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(v.into())
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names come from code, never from the request body; only values are bound.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    columns: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Adds `column = ?` when `value` is present.
    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.columns.push(column);
            self.values.push(v.into());
        }
        self
    }

    /// `None` when no field was supplied.
    pub fn build(self, id_column: &'static str, id_value: u64) -> Option<SqlUpdate> {
        if self.columns.is_empty() {
            return None;
        }

        let set_clause = self
            .columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut values = self.values;
        // WHERE id = ?
        values.push(SqlValue::U64(id_value));

        Some(SqlUpdate {
            sql: format!("UPDATE {} SET {} WHERE {} = ?", self.table, set_clause, id_column),
            values,
        })
    }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Json(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supplied_fields_are_set() {
        let update = UpdateBuilder::new("users")
            .set("name", Some("Aminah".to_string()))
            .set::<String>("phone", None)
            .set("is_active", Some(false))
            .build("id", 7)
            .unwrap();

        assert_eq!(update.sql, "UPDATE users SET name = ?, is_active = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Aminah".to_string()),
                SqlValue::Bool(false),
                SqlValue::U64(7)
            ]
        );
    }

    #[test]
    fn nothing_to_update_builds_nothing() {
        let builder = UpdateBuilder::new("classes").set::<i32>("grade_level", None);
        assert!(builder.build("id", 1).is_none());
    }
}
