//! Connection abstraction used by the builder's terminal calls.

use crate::error::QbResult;
use crate::record::Record;
use crate::row;
use crate::value::Value;
use futures_core::Stream;
use futures_util::TryStreamExt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// The builder never creates, pools or closes connections; it only calls these
/// three methods. Implementations exist for `tokio_postgres::Client`,
/// `tokio_postgres::Transaction`, `deadpool_postgres::Client` (feature `pool`)
/// and references to any of them.
pub trait Connection: Send + Sync {
    /// Execute a query and return a cursor over decoded rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<Cursor>> + Send;

    /// Execute a query and return the first column of the first row.
    ///
    /// Returns `Ok(None)` if the query produced no rows.
    fn query_value(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<Option<Value>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<u64>> + Send;
}

/// A live result set.
///
/// Rows are decoded into [`Record`]s as they are pulled. Dropping the cursor
/// releases the underlying portal, whether or not it was read to the end.
#[must_use]
pub struct Cursor {
    inner: Pin<Box<dyn Stream<Item = QbResult<Record>> + Send>>,
}

impl Cursor {
    /// Create a cursor from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = QbResult<Record>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Cursor over already materialized rows.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = QbResult<Record>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(futures_util::stream::iter(records))
    }

    fn from_rows<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Row, tokio_postgres::Error>> + Send + 'static,
    {
        Self::new(DecodeRowStream {
            inner: Box::pin(stream),
        })
    }
}

impl Stream for Cursor {
    type Item = QbResult<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

struct DecodeRowStream<S> {
    inner: Pin<Box<S>>,
}

impl<S> Stream for DecodeRowStream<S>
where
    S: Stream<Item = Result<Row, tokio_postgres::Error>> + Send + 'static,
{
    type Item = QbResult<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(row::decode_row(&row))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e.into()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn bind(params: &[Value]) -> impl ExactSizeIterator<Item = &(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync))
}

async fn first_value<S>(stream: S) -> QbResult<Option<Value>>
where
    S: Stream<Item = Result<Row, tokio_postgres::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    match stream.try_next().await? {
        Some(row) => row::first_value(&row).map(Some),
        None => Ok(None),
    }
}

impl Connection for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Cursor> {
        let stream = tokio_postgres::Client::query_raw(self, sql, bind(params)).await?;
        Ok(Cursor::from_rows(stream))
    }

    async fn query_value(&self, sql: &str, params: &[Value]) -> QbResult<Option<Value>> {
        let stream = tokio_postgres::Client::query_raw(self, sql, bind(params)).await?;
        first_value(stream).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        Ok(tokio_postgres::Client::execute_raw(self, sql, bind(params)).await?)
    }
}

impl Connection for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Cursor> {
        let stream = tokio_postgres::Transaction::query_raw(self, sql, bind(params)).await?;
        Ok(Cursor::from_rows(stream))
    }

    async fn query_value(&self, sql: &str, params: &[Value]) -> QbResult<Option<Value>> {
        let stream = tokio_postgres::Transaction::query_raw(self, sql, bind(params)).await?;
        first_value(stream).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        Ok(tokio_postgres::Transaction::execute_raw(self, sql, bind(params)).await?)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Connection for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Cursor> {
        // Delegate to the deref target (ClientWrapper -> tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        Connection::query(client, sql, params).await
    }

    async fn query_value(&self, sql: &str, params: &[Value]) -> QbResult<Option<Value>> {
        let client: &tokio_postgres::Client = self;
        Connection::query_value(client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        let client: &tokio_postgres::Client = self;
        Connection::execute(client, sql, params).await
    }
}

impl<C: Connection> Connection for &C {
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<Cursor>> + Send {
        (**self).query(sql, params)
    }

    fn query_value(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<Option<Value>>> + Send {
        (**self).query_value(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QbResult<u64>> + Send {
        (**self).execute(sql, params)
    }
}
