use super::*;
use crate::client::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Capture {
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    released: AtomicUsize,
}

impl Capture {
    fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }

    fn last_sql(&self) -> String {
        self.statements().last().map(|(sql, _)| sql.clone()).unwrap()
    }

    fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

struct ReleaseGuard(Arc<Capture>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory connection. `Err(column)` rows fail to decode on that column.
#[derive(Default)]
struct MockConnection {
    capture: Arc<Capture>,
    rows: Vec<Result<Record, String>>,
    returning: Option<Value>,
}

impl MockConnection {
    fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            rows: rows.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    fn returning(value: impl Into<Value>) -> Self {
        Self {
            returning: Some(value.into()),
            ..Self::default()
        }
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.capture
            .statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }
}

impl Connection for MockConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Cursor> {
        self.record(sql, params);
        let guard = ReleaseGuard(self.capture.clone());
        let rows: Vec<QbResult<Record>> = self
            .rows
            .iter()
            .map(|r| {
                r.clone()
                    .map_err(|col| QbError::bad_type(col, "cannot decode"))
            })
            .collect();
        Ok(Cursor::new(futures_util::stream::iter(rows).map(
            move |r| {
                let _held = &guard;
                r
            },
        )))
    }

    async fn query_value(&self, sql: &str, params: &[Value]) -> QbResult<Option<Value>> {
        self.record(sql, params);
        Ok(self.returning.clone())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        self.record(sql, params);
        Ok(1)
    }
}

fn user(id: i64, name: &str) -> Record {
    Record::new().with("id", id).with("name", name)
}

#[tokio::test]
async fn test_select_example_round_trip() {
    let conn = MockConnection::with_rows(vec![user(1, "ann"), user(2, "bob")]);
    let rows = QueryBuilder::new(&conn)
        .select("users")
        .alias("u")
        .columns(["u.id", "u.name"])
        .where_("u.age > ?", [18])
        .order_by("u.name", "ASC")
        .limit(10)
        .rows()
        .await
        .unwrap();

    assert_eq!(rows, vec![user(1, "ann"), user(2, "bob")]);
    assert_eq!(
        conn.capture.statements(),
        vec![(
            "SELECT u.id, u.name FROM users AS u WHERE u.age > $1 ORDER BY u.name ASC LIMIT 10"
                .to_string(),
            vec![Value::Int(18)]
        )]
    );
    assert_eq!(conn.capture.released(), 1);
}

#[tokio::test]
async fn test_insert_example_returns_id() {
    let conn = MockConnection::returning(42);
    let id = QueryBuilder::new(&conn)
        .insert("users")
        .columns(["name", "email"])
        .parameters(["jv", "jv@example.com"])
        .exec_return_id("id")
        .await
        .unwrap();

    assert_eq!(id, Value::Int(42));
    assert_eq!(
        conn.capture.statements(),
        vec![(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id".to_string(),
            vec![Value::from("jv"), Value::from("jv@example.com")]
        )]
    );
}

#[tokio::test]
async fn test_exec_return_id_passes_value_through() {
    let conn = MockConnection::returning("7f1c2d");
    let id = QueryBuilder::new(&conn)
        .insert("tokens")
        .cols_with_params(Record::new().with("owner", 1))
        .exec_return_id("token")
        .await
        .unwrap();
    assert_eq!(id.as_str(), Some("7f1c2d"));
}

#[tokio::test]
async fn test_exec_return_id_without_row_is_not_found() {
    let conn = MockConnection::default();
    let err = QueryBuilder::new(&conn)
        .insert("users")
        .columns(["name"])
        .parameters(["jv"])
        .exec_return_id("id")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_row_returns_first_and_releases_cursor() {
    let conn = MockConnection::with_rows(vec![user(1, "ann"), user(2, "bob")]);
    let rec = QueryBuilder::new(&conn)
        .select("users")
        .row()
        .await
        .unwrap();

    assert_eq!(rec, user(1, "ann"));
    assert_eq!(conn.capture.last_sql(), "SELECT * FROM users");
    assert_eq!(conn.capture.released(), 1);
}

#[tokio::test]
async fn test_row_without_rows_is_not_found() {
    let conn = MockConnection::default();
    let err = QueryBuilder::new(&conn)
        .select("users")
        .where_("id = ?", [404])
        .row()
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(conn.capture.released(), 1);
}

#[tokio::test]
async fn test_row_decode_failure_is_bad_type() {
    let conn = MockConnection {
        rows: vec![Err("payload".to_string())],
        ..MockConnection::default()
    };
    let err = QueryBuilder::new(&conn)
        .select("events")
        .row()
        .await
        .unwrap_err();

    assert!(matches!(err, QbError::BadType { ref column, .. } if column == "payload"));
    assert_eq!(conn.capture.released(), 1);
}

#[tokio::test]
async fn test_rows_empty_is_empty_vec() {
    let conn = MockConnection::default();
    let rows = QueryBuilder::new(&conn)
        .select("users")
        .rows()
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(conn.capture.released(), 1);
}

#[tokio::test]
async fn test_rows_stop_at_first_decode_failure() {
    let conn = MockConnection {
        rows: vec![
            Ok(user(1, "ann")),
            Err("name".to_string()),
            Ok(user(3, "cid")),
        ],
        ..MockConnection::default()
    };
    let err = QueryBuilder::new(&conn)
        .select("users")
        .rows()
        .await
        .unwrap_err();

    assert!(err.is_bad_type());
    assert_eq!(conn.capture.released(), 1);
}

#[tokio::test]
async fn test_unknown_action_skips_round_trip() {
    let conn = MockConnection::default();
    let err = QueryBuilder::new(&conn)
        .where_("id = ?", [1])
        .exec()
        .await
        .unwrap_err();

    assert!(matches!(err, QbError::UnknownAction));
    assert!(conn.capture.statements().is_empty());
}

#[tokio::test]
async fn test_update_too_many_args_skips_round_trip() {
    let conn = MockConnection::default();
    let err = QueryBuilder::new(&conn)
        .update("users")
        .columns(["name", "email"])
        .parameters(["jv"])
        .exec()
        .await
        .unwrap_err();

    assert!(matches!(err, QbError::TooManyArgs { columns: 2, params: 1 }));
    assert!(conn.capture.statements().is_empty());
}

#[tokio::test]
async fn test_update_and_delete_exec() {
    let conn = MockConnection::default();
    QueryBuilder::new(&conn)
        .update("users")
        .columns(["name"])
        .parameters(["jv"])
        .where_("id = ?", [7])
        .exec()
        .await
        .unwrap();
    QueryBuilder::new(&conn)
        .delete("sessions")
        .where_("user_id = ?", [7])
        .exec()
        .await
        .unwrap();

    let statements = conn.capture.statements();
    assert_eq!(statements[0].0, "UPDATE users SET name = $1 WHERE id = $2");
    assert_eq!(statements[0].1, vec![Value::from("jv"), Value::Int(7)]);
    assert_eq!(statements[1].0, "DELETE FROM sessions WHERE user_id = $1");
}

#[tokio::test]
async fn test_second_terminal_call_repeats_round_trip() {
    let conn = MockConnection::default();
    let qb = QueryBuilder::new(&conn)
        .insert("audit")
        .columns(["event"])
        .parameters(["login"]);

    qb.exec().await.unwrap();
    qb.exec().await.unwrap();

    let statements = conn.capture.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0], statements[1]);
}

#[tokio::test]
async fn test_under_supply_sends_literal_marker() {
    let conn = MockConnection::default();
    QueryBuilder::new(&conn)
        .delete("t")
        .where_("a = ? AND b = ?", [1])
        .exec()
        .await
        .unwrap();
    assert_eq!(conn.capture.last_sql(), "DELETE FROM t WHERE a = $1 AND b = ?");
}

#[tokio::test]
async fn test_over_supply_fails_before_round_trip() {
    let conn = MockConnection::default();
    let err = QueryBuilder::new(&conn)
        .select("t")
        .where_("a = ?", [1, 2])
        .rows()
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::Validation(_)));
    assert!(conn.capture.statements().is_empty());
}

#[tokio::test]
async fn test_raw_sql_numbers_after_parameters() {
    let conn = MockConnection::with_rows(vec![Record::new().with("n", 1)]);
    let rec = QueryBuilder::new(&conn)
        .parameters(["first"])
        .sql("SELECT count(*) AS n FROM t WHERE a = $1 AND b = ?", ["second"])
        .row()
        .await
        .unwrap();

    assert_eq!(rec.get("n"), Some(&Value::Int(1)));
    let (sql, params) = conn.capture.statements().remove(0);
    assert_eq!(sql, "SELECT count(*) AS n FROM t WHERE a = $1 AND b = $2");
    assert_eq!(params, vec![Value::from("first"), Value::from("second")]);
}

#[test]
fn test_joins_group_having_to_statement() {
    let conn = MockConnection::default();
    let stmt = QueryBuilder::new(&conn)
        .select("orders")
        .alias("o")
        .columns(["c.name"])
        .inner_join("customers", "c", "c.id = o.customer_id")
        .left_join("refunds", "r", "r.order_id = o.id")
        .right_join("regions", "g", "g.id = c.region_id")
        .full_join("notes", "n", "n.order_id = o.id")
        .group_by(["c.name"])
        .having("COUNT(*) > ?", [1])
        .offset(5)
        .to_statement()
        .unwrap();

    assert_eq!(
        stmt.sql,
        "SELECT c.name FROM orders AS o \
         INNER JOIN customers AS c ON c.id = o.customer_id \
         LEFT JOIN refunds AS r ON r.order_id = o.id \
         RIGHT JOIN regions AS g ON g.id = c.region_id \
         FULL JOIN notes AS n ON n.order_id = o.id \
         GROUP BY c.name HAVING COUNT(*) > $1 OFFSET 5"
    );
}

#[test]
fn test_last_action_wins() {
    let conn = MockConnection::default();
    let stmt = QueryBuilder::new(&conn)
        .select("users")
        .insert("people")
        .columns(["name"])
        .parameters(["jv"])
        .to_statement()
        .unwrap();
    assert_eq!(stmt.sql, "INSERT INTO people (name) VALUES ($1)");
}

#[test]
fn test_cols_with_params_pairs_columns() {
    let conn = MockConnection::default();
    let qb = QueryBuilder::new(&conn)
        .update("users")
        .cols_with_params(Record::new().with("name", "jv").with("age", 40))
        .where_("id = ?", [1]);

    assert_eq!(qb.clauses().columns(), ["age", "name"]);
    assert_eq!(
        qb.to_statement().unwrap().sql,
        "UPDATE users SET age = $1, name = $2 WHERE id = $3"
    );
}
