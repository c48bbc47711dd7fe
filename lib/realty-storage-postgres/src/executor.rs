//! PostgreSQL rendering and execution of the core statement builders.
//!
//! The deadline is enforced by the server: every pooled connection opens with
//! `statement_timeout` set, so an expired statement is cancelled where it runs
//! and can no longer commit. The client keeps a slightly longer timer as a
//! backstop for a server that stops answering. Both surface as
//! [`StorageError::Timeout`].

use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use realty_storage::{
    Assignment, ColumnType, DEFAULT_STATEMENT_TIMEOUT, Delete, Filter, Insert, Query, Storable,
    StorageError, StoreConfig, Update, Value,
};
use sqlx::Arguments;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use tracing::debug;

/// SQLSTATE `query_canceled`, raised when `statement_timeout` expires.
const QUERY_CANCELED: &str = "57014";

/// Extra time the client waits past the server deadline before giving up.
const BACKSTOP_GRACE: Duration = Duration::from_secs(1);

/// Wrapper around sqlx::PgPool that executes the core builders.
#[derive(Clone, Debug)]
pub struct PgPool {
    pool: sqlx::PgPool,
    statement_timeout: Duration,
}

impl PgPool {
    /// Wrap an existing sqlx pool.
    ///
    /// The server-side deadline is only present if the pool's connections
    /// were opened with it (see [`connect_with`](Self::connect_with)).
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            pool,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Connect to a PostgreSQL database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StorageError> {
        let options: PgConnectOptions = config
            .url()
            .parse()
            .map_err(|e: sqlx::Error| StorageError::StorageError(e.to_string()))?;
        let pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.statement_timeout);

        Self::connect_with(pool_options, options, config.statement_timeout).await
    }

    /// Open a pool whose connections all carry `statement_timeout`.
    pub async fn connect_with(
        pool_options: PgPoolOptions,
        options: PgConnectOptions,
        statement_timeout: Duration,
    ) -> Result<Self, StorageError> {
        debug!(timeout = ?statement_timeout, "connecting to postgres");

        let options = options.options([("statement_timeout", statement_timeout.as_millis())]);
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::StorageError(e.to_string()))?;

        Ok(Self::new(pool).with_statement_timeout(statement_timeout))
    }

    pub fn with_statement_timeout(mut self, statement_timeout: Duration) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    pub fn statement_timeout(&self) -> Duration {
        self.statement_timeout
    }

    /// Get the inner sqlx::PgPool.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Run `statement` under the deadline.
    pub async fn within<F, R>(&self, statement: F) -> Result<R, StorageError>
    where
        F: Future<Output = Result<R, sqlx::Error>>,
    {
        let backstop = self.statement_timeout + BACKSTOP_GRACE;
        match tokio::time::timeout(backstop, statement).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if is_statement_timeout(&e) => {
                Err(StorageError::Timeout(self.statement_timeout))
            }
            Ok(Err(e)) => Err(StorageError::StorageError(e.to_string())),
            Err(_) => Err(StorageError::Timeout(self.statement_timeout)),
        }
    }

    /// Execute a SELECT query and return at most one row.
    pub async fn fetch_optional<T: Storable>(
        &self,
        query: Query<T>,
    ) -> Result<Option<PgRow>, StorageError> {
        let sql = build_select_sql::<T>(&query);

        let mut args = PgArguments::default();
        bind_filters(&mut args, &query.filters)?;

        self.within(sqlx::query_with(&sql, args).fetch_optional(&self.pool))
            .await
    }

    /// Execute an INSERT and return the row built from its RETURNING columns.
    pub async fn insert<T: Storable>(&self, insert: Insert<T>) -> Result<PgRow, StorageError> {
        let sql = build_insert_sql(&insert);

        let mut args = PgArguments::default();
        for (_, value) in &insert.values {
            bind_value(&mut args, value)?;
        }

        self.within(sqlx::query_with(&sql, args).fetch_one(&self.pool))
            .await
    }

    /// Execute a conditional UPDATE. `None` means no row matched the filters.
    pub async fn update<T: Storable>(
        &self,
        update: Update<T>,
    ) -> Result<Option<PgRow>, StorageError> {
        if update.filters.is_empty() {
            return Err(StorageError::StorageError(format!(
                "refusing unfiltered update of {}",
                update.table
            )));
        }

        let sql = build_update_sql(&update);

        let mut args = PgArguments::default();
        for (_, assignment) in &update.assignments {
            if let Assignment::Value(value) = assignment {
                bind_value(&mut args, value)?;
            }
        }
        bind_filters(&mut args, &update.filters)?;

        self.within(sqlx::query_with(&sql, args).fetch_optional(&self.pool))
            .await
    }

    /// Execute a DELETE query and return the number of rows affected.
    pub async fn delete<T: Storable>(&self, delete: Delete<T>) -> Result<u64, StorageError> {
        let (where_clause, _) = build_where_clause(&delete.filters, 1);
        let sql = format!("DELETE FROM {}{}", delete.table, where_clause);

        let mut args = PgArguments::default();
        bind_filters(&mut args, &delete.filters)?;

        let result = self
            .within(sqlx::query_with(&sql, args).execute(&self.pool))
            .await?;

        Ok(result.rows_affected())
    }
}

impl Deref for PgPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

/// True when the server cancelled the statement for running past its deadline.
fn is_statement_timeout(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(QUERY_CANCELED),
        _ => false,
    }
}

/// Placeholder for a bound value. Serialized documents travel as text and
/// are cast on the way in.
fn placeholder(idx: usize, value: &Value) -> String {
    match value {
        Value::Json(_) | Value::Null(ColumnType::Json) => format!("${}::json", idx),
        _ => format!("${}", idx),
    }
}

/// Select list for a type. Serialized columns are read back as text.
fn build_select_list<T: Storable>() -> String {
    T::columns()
        .iter()
        .zip(T::column_types().iter())
        .map(|(column, column_type)| match column_type {
            ColumnType::Json => format!("{}::text AS {}", column, column),
            _ => (*column).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// RETURNING clause; the same text casts as the select list apply.
fn build_returning_clause<T: Storable>(columns: &[String]) -> String {
    if columns.is_empty() {
        return format!(" RETURNING {}", build_select_list::<T>());
    }

    let cols: Vec<String> = columns
        .iter()
        .map(|column| match T::column_type(column) {
            Some(ColumnType::Json) => format!("{}::text AS {}", column, column),
            _ => column.clone(),
        })
        .collect();

    format!(" RETURNING {}", cols.join(", "))
}

/// Build a WHERE clause from filters and return the SQL and argument count.
fn build_where_clause(filters: &[Filter], start_param: usize) -> (String, usize) {
    if filters.is_empty() {
        return (String::new(), 0);
    }

    let mut clauses = Vec::new();
    let mut param_idx = start_param;

    for filter in filters {
        let clause = match filter {
            Filter::Eq(field, value) => {
                let c = format!("{} = {}", field, placeholder(param_idx, value));
                param_idx += 1;
                c
            }
        };
        clauses.push(clause);
    }

    let param_count = param_idx - start_param;
    (format!(" WHERE {}", clauses.join(" AND ")), param_count)
}

fn build_select_sql<T: Storable>(query: &Query<T>) -> String {
    let (where_clause, _) = build_where_clause(&query.filters, 1);

    let mut sql = format!(
        "SELECT {} FROM {}{}",
        build_select_list::<T>(),
        query.table,
        where_clause
    );

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

fn build_insert_sql<T: Storable>(insert: &Insert<T>) -> String {
    let cols: Vec<&str> = insert.values.iter().map(|(c, _)| c.as_str()).collect();
    let placeholders: Vec<String> = insert
        .values
        .iter()
        .enumerate()
        .map(|(i, (_, value))| placeholder(i + 1, value))
        .collect();

    let values_clause = if cols.is_empty() {
        " DEFAULT VALUES".to_string()
    } else {
        format!(" ({}) VALUES ({})", cols.join(", "), placeholders.join(", "))
    };

    format!(
        "INSERT INTO {}{}{}",
        insert.table,
        values_clause,
        build_returning_clause::<T>(&insert.returning)
    )
}

fn build_update_sql<T: Storable>(update: &Update<T>) -> String {
    let mut param_idx = 1;
    let assignments: Vec<String> = update
        .assignments
        .iter()
        .map(|(column, assignment)| match assignment {
            Assignment::Value(value) => {
                let a = format!("{} = {}", column, placeholder(param_idx, value));
                param_idx += 1;
                a
            }
            Assignment::Raw(expression) => format!("{} = {}", column, expression),
        })
        .collect();

    let (where_clause, _) = build_where_clause(&update.filters, param_idx);

    format!(
        "UPDATE {} SET {}{}{}",
        update.table,
        assignments.join(", "),
        where_clause,
        build_returning_clause::<T>(&update.returning)
    )
}

/// Bind filter values to PgArguments.
fn bind_filters(args: &mut PgArguments, filters: &[Filter]) -> Result<(), StorageError> {
    for filter in filters {
        match filter {
            Filter::Eq(_, value) => bind_value(args, value)?,
        }
    }
    Ok(())
}

/// Bind a Value to PgArguments.
fn bind_value(args: &mut PgArguments, value: &Value) -> Result<(), StorageError> {
    let bound = match value {
        Value::String(s) | Value::Json(s) => args.add(s.as_str()),
        Value::Int(n) => args.add(*n),
        Value::Float(n) => args.add(*n),
        Value::Bool(b) => args.add(*b),
        Value::Strings(v) => args.add(v.as_slice()),
        Value::Null(column_type) => match column_type {
            ColumnType::Datetime => args.add(None::<chrono::DateTime<chrono::Utc>>),
            ColumnType::BigInt => args.add(None::<i64>),
            ColumnType::Integer => args.add(None::<i32>),
            ColumnType::Double => args.add(None::<f64>),
            ColumnType::Boolean => args.add(None::<bool>),
            ColumnType::TextArray => args.add(None::<Vec<String>>),
            ColumnType::Text | ColumnType::Json => args.add(None::<String>),
        },
    };
    bound.map_err(|e| StorageError::StorageError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use realty_storage::Property;

    #[test]
    fn select_reads_attribute_columns_as_text() {
        let query = Query::<Property>::new().eq("id", 4_i64).limit(1);
        let sql = build_select_sql(&query);

        assert!(sql.starts_with("SELECT id, created_at, title,"));
        assert!(sql.contains("features::text AS features"));
        assert!(sql.contains("nearby::text AS nearby"));
        assert!(sql.ends_with(" FROM properties WHERE id = $1 LIMIT 1"));
    }

    #[test]
    fn update_is_conditional_on_id_and_version() {
        let update = Update::<Property>::new()
            .set("title", "Renamed")
            .set("features", Value::Json("{}".to_string()))
            .set_raw("version", "version + 1")
            .eq("id", 3_i64)
            .eq("version", 5_i32)
            .returning("version");

        assert_eq!(
            build_update_sql(&update),
            "UPDATE properties SET title = $1, features = $2::json, version = version + 1 \
             WHERE id = $3 AND version = $4 RETURNING version"
        );
    }

    #[test]
    fn insert_casts_documents_and_returns_assigned_columns() {
        let insert = Insert::<Property>::new()
            .value("title", "6007 Applegate Lane")
            .value("nearby", Value::Json(r#"{"Hospital":"7km"}"#.to_string()))
            .value("latitude", Value::Null(ColumnType::Double))
            .returning("id")
            .returning("created_at")
            .returning("version");

        assert_eq!(
            build_insert_sql(&insert),
            "INSERT INTO properties (title, nearby, latitude) VALUES ($1, $2::json, $3) \
             RETURNING id, created_at, version"
        );
    }

    #[test]
    fn delete_filters_by_id() {
        let (where_clause, count) = build_where_clause(&[Filter::Eq("id".into(), Value::Int(9))], 1);
        assert_eq!(where_clause, " WHERE id = $1");
        assert_eq!(count, 1);
    }

    #[test]
    fn binds_every_value_kind() {
        let mut args = PgArguments::default();
        for value in [
            Value::from("text"),
            Value::Int(1),
            Value::Float(2.5),
            Value::Bool(true),
            Value::Strings(vec!["Parking".to_string()]),
            Value::Json("{}".to_string()),
            Value::Null(ColumnType::Double),
            Value::Null(ColumnType::TextArray),
        ] {
            bind_value(&mut args, &value).unwrap();
        }
        assert_eq!(args.len(), 8);
    }

    #[test]
    fn only_query_canceled_counts_as_timeout() {
        assert!(!is_statement_timeout(&sqlx::Error::RowNotFound));
        assert!(!is_statement_timeout(&sqlx::Error::PoolTimedOut));
    }
}
