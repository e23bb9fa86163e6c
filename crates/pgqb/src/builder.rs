//! Fluent statement builder.
//!
//! A [`QueryBuilder`] owns its connection handle (often a reference) and the
//! accumulated [`Clauses`]. Configuration calls consume and return the
//! builder; a terminal call assembles and runs the statement:
//!
//! ```ignore
//! let users = pgqb::new(&client)
//!     .select("users")
//!     .alias("u")
//!     .columns(["u.id", "u.name"])
//!     .where_("u.age > ?", [18])
//!     .order_by("u.name", "ASC")
//!     .limit(10)
//!     .rows()
//!     .await?;
//! ```
//!
//! Clause text is trusted and spliced verbatim; only the values passed
//! alongside `?` markers are sent as bound parameters.

use crate::assemble::{Statement, assemble};
use crate::clauses::{Action, Clauses};
use crate::client::Connection;
use crate::error::{QbError, QbResult};
use crate::log::SqlLog;
use crate::record::Record;
use crate::value::Value;
use futures_util::{StreamExt, TryStreamExt};

/// Statement builder bound to a connection.
///
/// A builder describes one statement. Terminal calls borrow it, so calling a
/// second terminal re-assembles and performs a second round trip; for mutating
/// statements that duplicates the side effect.
#[derive(Debug, Clone)]
#[must_use]
pub struct QueryBuilder<C> {
    conn: C,
    clauses: Clauses,
    log: SqlLog,
}

impl<C: Connection> QueryBuilder<C> {
    /// Create an empty builder over `conn`.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            clauses: Clauses::new(),
            log: SqlLog::default(),
        }
    }

    // ==================== Action / target ====================

    pub fn select(mut self, table: &str) -> Self {
        self.clauses.set_action(Action::Select, table);
        self
    }

    pub fn insert(mut self, table: &str) -> Self {
        self.clauses.set_action(Action::Insert, table);
        self
    }

    pub fn update(mut self, table: &str) -> Self {
        self.clauses.set_action(Action::Update, table);
        self
    }

    pub fn delete(mut self, table: &str) -> Self {
        self.clauses.set_action(Action::Delete, table);
        self
    }

    /// Table alias, used in FROM/INTO/UPDATE and for column qualification.
    pub fn alias(mut self, alias: &str) -> Self {
        self.clauses.set_alias(alias);
        self
    }

    // ==================== Columns / parameters ====================

    /// Append columns. For INSERT/UPDATE they pair positionally with parameters.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.push_columns(columns);
        self
    }

    /// Append bound parameters.
    pub fn parameters<I>(mut self, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.clauses.push_params(params);
        self
    }

    /// Append columns and parameters from one record, in the record's key order.
    pub fn cols_with_params(mut self, record: Record) -> Self {
        self.clauses.push_record(record);
        self
    }

    // ==================== Filters ====================

    /// Add a WHERE fragment; `?` markers are bound to `args` left to right.
    ///
    /// Repeated calls are joined with `AND`.
    pub fn where_<I>(mut self, fragment: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.clauses.push_filter(fragment, args);
        self
    }

    /// Add a HAVING fragment; same binding rules as [`where_`](Self::where_).
    pub fn having<I>(mut self, fragment: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.clauses.push_having(fragment, args);
        self
    }

    // ==================== Joins ====================

    /// Add `<kind> JOIN <table> AS <alias> ON <condition>`.
    pub fn join(mut self, kind: &str, table: &str, alias: &str, condition: &str) -> Self {
        self.clauses.push_join(kind, table, alias, condition);
        self
    }

    pub fn inner_join(self, table: &str, alias: &str, condition: &str) -> Self {
        self.join("INNER", table, alias, condition)
    }

    pub fn left_join(self, table: &str, alias: &str, condition: &str) -> Self {
        self.join("LEFT", table, alias, condition)
    }

    pub fn right_join(self, table: &str, alias: &str, condition: &str) -> Self {
        self.join("RIGHT", table, alias, condition)
    }

    pub fn full_join(self, table: &str, alias: &str, condition: &str) -> Self {
        self.join("FULL", table, alias, condition)
    }

    // ==================== Ordering / paging ====================

    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.clauses.push_order_by(column, direction);
        self
    }

    /// Set GROUP BY columns, replacing any earlier call.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.clauses.set_group_by(columns);
        self
    }

    /// LIMIT; zero omits the clause.
    pub fn limit(mut self, limit: u64) -> Self {
        self.clauses.set_limit(limit);
        self
    }

    /// OFFSET; zero omits the clause.
    pub fn offset(mut self, offset: u64) -> Self {
        self.clauses.set_offset(offset);
        self
    }

    // ==================== Raw SQL / settings ====================

    /// Use `sql` as the whole statement. Assembly is skipped, but `?` markers
    /// are still rewritten and bound after any parameters already present.
    pub fn sql<I>(mut self, sql: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.clauses.set_raw(sql, args);
        self
    }

    /// Override SQL logging for this builder.
    pub fn log(mut self, log: SqlLog) -> Self {
        self.log = log;
        self
    }

    /// Accumulated clauses.
    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    /// Assemble without executing.
    pub fn to_statement(&self) -> QbResult<Statement> {
        assemble(self.clauses.clone())
    }

    fn prepare(&self) -> QbResult<Statement> {
        let stmt = self.to_statement()?;
        self.log.emit(self.action_name(), &stmt);
        Ok(stmt)
    }

    fn action_name(&self) -> &'static str {
        if self.clauses.raw.is_some() {
            return "RAW";
        }
        self.clauses.action.map(|a| a.as_str()).unwrap_or("-")
    }

    // ==================== Terminal calls ====================

    /// Fetch the first row.
    ///
    /// Zero rows is [`QbError::NotFound`]. Rows after the first are not read;
    /// the cursor is released when this returns.
    pub async fn row(&self) -> QbResult<Record> {
        let stmt = self.prepare()?;
        let mut cursor = self.conn.query(&stmt.sql, &stmt.params).await?;
        match cursor.next().await {
            Some(record) => record,
            None => Err(QbError::not_found(format!(
                "no rows returned from {}",
                self.clauses.table
            ))),
        }
    }

    /// Fetch all rows. Zero rows is an empty `Vec`.
    ///
    /// The first row that fails to decode aborts the fetch.
    pub async fn rows(&self) -> QbResult<Vec<Record>> {
        let stmt = self.prepare()?;
        let cursor = self.conn.query(&stmt.sql, &stmt.params).await?;
        cursor.try_collect().await
    }

    /// Append ` RETURNING <column>` and return that column of the first row
    /// exactly as the database reported it.
    pub async fn exec_return_id(&self, column: &str) -> QbResult<Value> {
        let mut stmt = self.to_statement()?;
        stmt.sql.push_str(" RETURNING ");
        stmt.sql.push_str(column);
        self.log.emit(self.action_name(), &stmt);
        self.conn
            .query_value(&stmt.sql, &stmt.params)
            .await?
            .ok_or_else(|| {
                QbError::not_found(format!("no row returned for RETURNING {column}"))
            })
    }

    /// Execute the statement and discard any result.
    pub async fn exec(&self) -> QbResult<()> {
        let stmt = self.prepare()?;
        self.conn.execute(&stmt.sql, &stmt.params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
