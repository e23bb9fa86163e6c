//! SQL statement logging.
//!
//! With the `tracing` feature enabled, every terminal call emits one `DEBUG`
//! event at target `pgqb.sql` before the round trip. Without the feature the
//! settings are accepted and nothing is emitted. No subscriber is installed here.

use crate::assemble::Statement;
use std::borrow::Cow;

/// Log settings applied by a [`QueryBuilder`](crate::QueryBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlLog {
    /// Emit events at all.
    pub enabled: bool,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLog {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// SQL as it will appear in the log line.
    pub fn truncate_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max)))
            }
            _ => Cow::Borrowed(sql),
        }
    }

    #[cfg(feature = "tracing")]
    pub(crate) fn emit(&self, action: &str, stmt: &Statement) {
        if !self.enabled {
            return;
        }
        let sql = self.truncate_sql(&stmt.sql);
        tracing::debug!(
            target: "pgqb.sql",
            action,
            param_count = stmt.params.len(),
            sql = %sql,
        );
    }

    #[cfg(not(feature = "tracing"))]
    pub(crate) fn emit(&self, _action: &str, _stmt: &Statement) {}
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sql_is_borrowed() {
        let log = SqlLog::new();
        assert!(matches!(log.truncate_sql("SELECT 1"), Cow::Borrowed(_)));
    }

    #[test]
    fn long_sql_is_cut_on_char_boundary() {
        let log = SqlLog::new().max_sql_length(5);
        assert_eq!(log.truncate_sql("SELECT 1"), "SELEC...");
        // 'ж' is two bytes; cutting at byte 3 would split it.
        assert_eq!(SqlLog::new().max_sql_length(3).truncate_sql("abжжж"), "ab...");
        assert_eq!(SqlLog::new().no_truncate().truncate_sql("SELECT 1"), "SELECT 1");
    }
}
