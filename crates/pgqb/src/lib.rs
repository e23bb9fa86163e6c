//! # pgqb
//!
//! A fluent statement builder for PostgreSQL's positional-parameter dialect.
//!
//! ## Features
//!
//! - **`?` in, `$N` out**: write fragments with `?` markers; they are numbered
//!   as they are added, continuing across WHERE, HAVING and raw SQL
//! - **Pure assembly**: [`Clauses`] → [`Statement`] never touches the database
//! - **Injected connections**: anything implementing [`Connection`] (clients,
//!   transactions, pooled clients) can run the statement
//! - **JSON-shaped rows**: results decode into [`Record`]s of tagged [`Value`]s
//!
//! ## Example
//!
//! ```ignore
//! // SELECT u.id, u.name FROM users AS u WHERE u.age > $1 ORDER BY u.name ASC LIMIT 10
//! let users = pgqb::new(&client)
//!     .select("users")
//!     .alias("u")
//!     .columns(["u.id", "u.name"])
//!     .where_("u.age > ?", [18])
//!     .order_by("u.name", "ASC")
//!     .limit(10)
//!     .rows()
//!     .await?;
//!
//! // INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id
//! let id = pgqb::new(&client)
//!     .insert("users")
//!     .columns(["name", "email"])
//!     .parameters(["jv", "jv@example.com"])
//!     .exec_return_id("id")
//!     .await?;
//! ```

pub mod assemble;
pub mod builder;
pub mod clauses;
pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod log;
pub mod placeholder;
pub mod record;
pub mod row;
pub mod ticker;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

pub use assemble::{Statement, assemble};
pub use builder::QueryBuilder;
pub use clauses::{Action, Clauses};
pub use client::{Connection, Cursor};
pub use config::ConnectConfig;
pub use error::{QbError, QbResult};
pub use log::SqlLog;
pub use record::Record;
pub use ticker::{Ticker, TickerState};
pub use value::Value;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

/// Start a builder over `conn`.
pub fn new<C: Connection>(conn: C) -> QueryBuilder<C> {
    QueryBuilder::new(conn)
}
