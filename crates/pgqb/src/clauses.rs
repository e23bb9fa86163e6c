//! Clause accumulation.
//!
//! [`Clauses`] is the plain, owned state behind a [`QueryBuilder`](crate::QueryBuilder).
//! It performs no validation: the only errors it records are deferred ones,
//! reported when the statement is assembled.

use crate::placeholder;
use crate::record::Record;
use crate::value::Value;

/// Statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Select => "SELECT",
            Action::Insert => "INSERT",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

/// Accumulated statement configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clauses {
    pub(crate) action: Option<Action>,
    pub(crate) table: String,
    pub(crate) alias: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) params: Vec<Value>,
    pub(crate) filter: String,
    pub(crate) having: String,
    pub(crate) joins: Vec<String>,
    pub(crate) order_by: Vec<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
    pub(crate) raw: Option<String>,
    pub(crate) build_error: Option<String>,
}

impl Clauses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Bound parameters; index + 1 is the placeholder number.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn having(&self) -> &str {
        &self.having
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Set the action and table; last call wins.
    pub fn set_action(&mut self, action: Action, table: &str) {
        self.action = Some(action);
        self.table = table.to_string();
    }

    pub fn set_alias(&mut self, alias: &str) {
        self.alias = Some(alias.to_string());
    }

    pub fn push_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
    }

    pub fn push_params<I>(&mut self, params: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.params.extend(params.into_iter().map(Into::into));
    }

    /// Append every pair of `record` as a column and its parameter.
    pub fn push_record(&mut self, record: Record) {
        for (column, value) in record {
            self.columns.push(column);
            self.params.push(value);
        }
    }

    /// Append a WHERE fragment (AND-joined with earlier ones).
    pub fn push_filter<I>(&mut self, fragment: &str, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let sql = self.rewrite("WHERE", fragment, args);
        append_and(&mut self.filter, &sql);
    }

    /// Append a HAVING fragment (AND-joined with earlier ones).
    pub fn push_having<I>(&mut self, fragment: &str, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let sql = self.rewrite("HAVING", fragment, args);
        append_and(&mut self.having, &sql);
    }

    /// Replace the statement with raw SQL; assembly will be skipped.
    pub fn set_raw<I>(&mut self, sql: &str, args: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let sql = self.rewrite("raw SQL", sql, args);
        self.raw = Some(sql);
    }

    /// Render and append a join clause; `kind` is e.g. `INNER` or `LEFT`.
    pub fn push_join(&mut self, kind: &str, table: &str, alias: &str, condition: &str) {
        self.joins
            .push(format!("{kind} JOIN {table} AS {alias} ON {condition}"));
    }

    pub fn push_order_by(&mut self, column: &str, direction: &str) {
        self.order_by.push(format!("{column} {direction}"));
    }

    /// Set the GROUP BY list; replaces any earlier one.
    pub fn set_group_by<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cols: Vec<String> = columns.into_iter().map(|c| c.as_ref().to_string()).collect();
        self.group_by = Some(format!("GROUP BY {}", cols.join(", ")));
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn rewrite<I>(&mut self, clause: &str, fragment: &str, args: I) -> String
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let out = placeholder::rewrite(fragment, args, &mut self.params);
        if out.surplus > 0 && self.build_error.is_none() {
            self.build_error = Some(format!(
                "{clause} fragment `{fragment}` got {} more value(s) than `?` markers",
                out.surplus
            ));
        }
        out.sql
    }
}

fn append_and(target: &mut String, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push_str(" AND ");
    }
    target.push_str(fragment);
}
