//! Fluent, typed reads over one entity table.
//!
//! ```no_run
//! # use sqlite_manager::{Direction, Entity, Query, Result};
//! # async fn demo<P: Entity>(products: Query<P>) -> Result<()> {
//! let cheap_first = products
//!     .where_contains("name", "Phone")
//!     .order_by("price", Direction::Ascending)
//!     .to_list()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;

use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use super::database::Database;
use super::entity::{Entity, EntityDescriptor};
use super::error::Result;
use super::mapper::{self, column_list, quote_ident};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// Query operators for building advanced queries
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    /// SQL `LIKE` pattern; ASCII case-insensitive.
    Like(String),
    /// Case-sensitive substring match.
    Contains(String),
    In(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: QueryOperator,
}

impl Condition {
    fn render(&self, sql: &mut Vec<String>, params: &mut Vec<Value>) {
        let column = quote_ident(&self.field);
        let comparison = |sql: &mut Vec<String>, params: &mut Vec<Value>, op: &str, v: &Value| {
            sql.push(format!("{column} {op} ?"));
            params.push(v.clone());
        };
        match &self.op {
            QueryOperator::Equal(Value::Null) => sql.push(format!("{column} IS NULL")),
            QueryOperator::NotEqual(Value::Null) => sql.push(format!("{column} IS NOT NULL")),
            QueryOperator::Equal(v) => comparison(sql, params, "=", v),
            QueryOperator::NotEqual(v) => comparison(sql, params, "<>", v),
            QueryOperator::GreaterThan(v) => comparison(sql, params, ">", v),
            QueryOperator::GreaterThanOrEqual(v) => comparison(sql, params, ">=", v),
            QueryOperator::LessThan(v) => comparison(sql, params, "<", v),
            QueryOperator::LessThanOrEqual(v) => comparison(sql, params, "<=", v),
            QueryOperator::Like(pattern) => {
                sql.push(format!("{column} LIKE ?"));
                params.push(Value::Text(pattern.clone()));
            }
            QueryOperator::Contains(needle) => {
                sql.push(format!("instr({column}, ?) > 0"));
                params.push(Value::Text(needle.clone()));
            }
            QueryOperator::In(values) if values.is_empty() => sql.push("0".to_string()),
            QueryOperator::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push(format!("{column} IN ({placeholders})"));
                params.extend(values.iter().cloned());
            }
        }
    }
}

/// A read over `E`'s table, built by chaining and run by a terminal call.
///
/// Conditions added with [`filter`](Query::filter) and its shortcuts are
/// ANDed together. Results are ordered by the requested terms and then by
/// primary key, so rows that tie keep insertion order. Terminal calls
/// consume the builder; clone it first to run it twice.
pub struct Query<E> {
    database: Database,
    conditions: Vec<Condition>,
    ordering: Vec<(String, Direction)>,
    limit: Option<u32>,
    offset: Option<u32>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<E> {
    pub(crate) fn new(database: Database) -> Self {
        Self {
            database,
            conditions: Vec::new(),
            ordering: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    pub fn filter(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            op,
        });
        self
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, QueryOperator::Equal(value.into()))
    }

    pub fn where_contains(self, field: &str, needle: impl Into<String>) -> Self {
        self.filter(field, QueryOperator::Contains(needle.into()))
    }

    /// Replaces any existing ordering with `field`.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.ordering.clear();
        self.ordering.push((field.to_string(), direction));
        self
    }

    pub fn order_by_descending(self, field: &str) -> Self {
        self.order_by(field, Direction::Descending)
    }

    /// Adds a secondary ordering after the existing ones.
    pub fn then_by(mut self, field: &str, direction: Direction) -> Self {
        self.ordering.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Runs the query and maps every row.
    pub async fn to_list(self) -> Result<Vec<E>> {
        let descriptor = E::descriptor();
        let (sql, params) = self.select_sql(descriptor)?;
        let rows = {
            let connection = self.database.connection().await;
            fetch(&connection, descriptor, &sql, &params)?
        };
        debug!(table = descriptor.table, rows = rows.len(), %sql, "query executed");
        rows.into_iter().map(mapper::from_row).collect()
    }

    /// First matching record, or `None` when nothing matches.
    pub async fn first_or_default(self) -> Result<Option<E>> {
        // a caller's `limit(0)` still wins
        let limit = self.limit.map_or(1, |limit| limit.min(1));
        Ok(self.limit(limit).to_list().await?.into_iter().next())
    }

    /// Number of records the query would return.
    pub async fn count(self) -> Result<usize> {
        let descriptor = E::descriptor();
        let (select, params) = self.select_sql(descriptor)?;
        let sql = format!("SELECT COUNT(*) FROM ({select})");
        let count: i64 = {
            let connection = self.database.connection().await;
            connection.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?
        };
        debug!(table = descriptor.table, count, "count executed");
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn select_sql(&self, descriptor: &EntityDescriptor) -> Result<(String, Vec<Value>)> {
        descriptor.validate()?;
        for condition in &self.conditions {
            descriptor.require_field(&condition.field)?;
        }
        for (field, _) in &self.ordering {
            descriptor.require_field(field)?;
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            column_list(descriptor),
            quote_ident(descriptor.table)
        );

        let mut params = Vec::new();
        if !self.conditions.is_empty() {
            let mut clauses = Vec::with_capacity(self.conditions.len());
            for condition in &self.conditions {
                condition.render(&mut clauses, &mut params);
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let key = descriptor.primary_key()?.name;
        let mut terms = self
            .ordering
            .iter()
            .map(|(field, direction)| format!("{} {}", quote_ident(field), direction.as_sql()))
            .collect::<Vec<_>>();
        if !self.ordering.iter().any(|(field, _)| field == key) {
            terms.push(format!("{} ASC", quote_ident(key)));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        Ok((sql, params))
    }
}

fn fetch(
    connection: &Connection,
    descriptor: &EntityDescriptor,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Vec<Value>>> {
    let mut stmt = connection.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            mapper::read_values(descriptor, row)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            conditions: self.conditions.clone(),
            ordering: self.ordering.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity", &std::any::type_name::<E>())
            .field("database", &self.database)
            .field("conditions", &self.conditions)
            .field("ordering", &self.ordering)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::config::SqliteConfig;
    use crate::sqlite::entity::{DataType, FieldDescriptor};
    use crate::sqlite::error::Error;
    use crate::sqlite::mapper::Row;

    static ITEM: EntityDescriptor = EntityDescriptor::new(
        "items",
        &[
            FieldDescriptor::auto_key("id"),
            FieldDescriptor::new("name", DataType::Text),
            FieldDescriptor::new("price", DataType::Real),
        ],
    );

    struct Item;

    impl Entity for Item {
        fn descriptor() -> &'static EntityDescriptor {
            &ITEM
        }
        fn key(&self) -> i64 {
            0
        }
        fn set_key(&mut self, _key: i64) {}
        fn to_row(&self) -> Vec<Value> {
            Vec::new()
        }
        fn from_row(_row: &Row<'_>) -> Result<Self> {
            Ok(Item)
        }
    }

    fn items() -> Query<Item> {
        let database = Database::open(":memory:".as_ref(), &SqliteConfig::default()).unwrap();
        database.query::<Item>()
    }

    #[test]
    fn plain_select_orders_by_key() {
        let (sql, params) = items().select_sql(&ITEM).unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\", \"price\" FROM \"items\" ORDER BY \"id\" ASC"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn filters_are_anded_in_call_order() {
        let (sql, params) = items()
            .where_eq("name", "Alice")
            .where_contains("name", "li")
            .filter("price", QueryOperator::GreaterThan(Value::Real(10.0)))
            .select_sql(&ITEM)
            .unwrap();
        assert!(
            sql.contains("WHERE \"name\" = ? AND instr(\"name\", ?) > 0 AND \"price\" > ?"),
            "{sql}"
        );
        assert_eq!(
            params,
            [
                Value::Text("Alice".into()),
                Value::Text("li".into()),
                Value::Real(10.0)
            ]
        );
    }

    #[test]
    fn null_and_empty_in_render_without_params() {
        let (sql, params) = items()
            .filter("name", QueryOperator::Equal(Value::Null))
            .filter("price", QueryOperator::In(Vec::new()))
            .select_sql(&ITEM)
            .unwrap();
        assert!(sql.contains("\"name\" IS NULL AND 0"), "{sql}");
        assert!(params.is_empty());
    }

    #[test]
    fn order_by_replaces_and_then_by_appends() {
        let (sql, _) = items()
            .order_by("name", Direction::Ascending)
            .order_by_descending("price")
            .then_by("name", Direction::Ascending)
            .select_sql(&ITEM)
            .unwrap();
        assert!(
            sql.ends_with("ORDER BY \"price\" DESC, \"name\" ASC, \"id\" ASC"),
            "{sql}"
        );
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let (sql, _) = items().offset(2).select_sql(&ITEM).unwrap();
        assert!(sql.ends_with("LIMIT -1 OFFSET 2"), "{sql}");
        let (sql, _) = items().limit(5).offset(2).select_sql(&ITEM).unwrap();
        assert!(sql.ends_with("LIMIT 5 OFFSET 2"), "{sql}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = items().where_eq("colour", "red").select_sql(&ITEM).unwrap_err();
        assert!(matches!(err, Error::UnknownField { field, .. } if field == "colour"));
        let err = items()
            .order_by("colour", Direction::Ascending)
            .select_sql(&ITEM)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }
}
