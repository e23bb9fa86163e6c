//! Statement assembly.
//!
//! [`assemble`] turns an owned [`Clauses`] into SQL text plus its bound
//! parameters. It never touches a connection, so everything here is testable
//! without a database.

use crate::clauses::{Action, Clauses};
use crate::error::{QbError, QbResult};
use crate::value::Value;

/// Final SQL text and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Render `clauses` into a [`Statement`].
///
/// Raw SQL is returned as-is. Otherwise the statement is rendered for the
/// configured action; with no action the result is [`QbError::UnknownAction`].
pub fn assemble(clauses: Clauses) -> QbResult<Statement> {
    if let Some(err) = clauses.build_error {
        return Err(QbError::validation(err));
    }
    if let Some(sql) = clauses.raw.clone() {
        return Ok(Statement {
            sql,
            params: clauses.params,
        });
    }

    let sql = match clauses.action {
        Some(Action::Select) => build_select(&clauses),
        Some(Action::Insert) => build_insert(&clauses),
        Some(Action::Update) => build_update(&clauses)?,
        Some(Action::Delete) => build_delete(&clauses),
        None => return Err(QbError::UnknownAction),
    };

    Ok(Statement {
        sql,
        params: clauses.params,
    })
}

fn push_target(sql: &mut String, c: &Clauses) {
    sql.push_str(&c.table);
    if let Some(alias) = &c.alias {
        sql.push_str(" AS ");
        sql.push_str(alias);
    }
}

fn push_filter(sql: &mut String, c: &Clauses) {
    if !c.filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&c.filter);
    }
}

fn build_select(c: &Clauses) -> String {
    let mut sql = String::from("SELECT ");

    if !c.columns.is_empty() {
        sql.push_str(&c.columns.join(", "));
    } else if let Some(alias) = &c.alias {
        sql.push_str(alias);
        sql.push_str(".*");
    } else {
        sql.push('*');
    }

    sql.push_str(" FROM ");
    push_target(&mut sql, c);

    for join in &c.joins {
        sql.push(' ');
        sql.push_str(join);
    }

    push_filter(&mut sql, c);

    if let Some(group) = &c.group_by {
        sql.push(' ');
        sql.push_str(group);
    }

    if !c.having.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&c.having);
    }

    if !c.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&c.order_by.join(", "));
    }

    if c.offset > 0 {
        sql.push_str(&format!(" OFFSET {}", c.offset));
    }

    if c.limit > 0 {
        sql.push_str(&format!(" LIMIT {}", c.limit));
    }

    sql
}

fn build_insert(c: &Clauses) -> String {
    let mut sql = String::from("INSERT INTO ");
    push_target(&mut sql, c);

    let cols: Vec<String> = match &c.alias {
        Some(alias) => c.columns.iter().map(|col| format!("{alias}.{col}")).collect(),
        None => c.columns.clone(),
    };
    let placeholders: Vec<String> = (1..=c.params.len()).map(|i| format!("${i}")).collect();

    sql.push_str(&format!(
        " ({}) VALUES ({})",
        cols.join(", "),
        placeholders.join(", ")
    ));
    sql
}

fn build_update(c: &Clauses) -> QbResult<String> {
    if c.columns.len() > c.params.len() {
        return Err(QbError::TooManyArgs {
            columns: c.columns.len(),
            params: c.params.len(),
        });
    }

    let mut sql = String::from("UPDATE ");
    push_target(&mut sql, c);

    let sets: Vec<String> = c
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{col} = ${}", i + 1))
        .collect();
    sql.push_str(" SET ");
    sql.push_str(&sets.join(", "));

    push_filter(&mut sql, c);
    Ok(sql)
}

fn build_delete(c: &Clauses) -> String {
    let mut sql = String::from("DELETE FROM ");
    sql.push_str(&c.table);
    push_filter(&mut sql, c);
    sql
}
