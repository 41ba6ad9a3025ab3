//! Generic client trait for unified database access.

use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::debug;

use crate::error::WeaveResult;

/// A trait that unifies database clients and transactions.
///
/// Every statement's `run` method accepts any implementor, so the same query
/// value can execute over a direct connection, a pooled client, or inside a
/// transaction. Every statement returns rows (via RETURNING or a select), so
/// row-set queries are the whole contract.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = WeaveResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = WeaveResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> WeaveResult<Vec<Row>> {
        debug!(sql, params = params.len(), "query");
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> WeaveResult<Vec<Row>> {
        debug!(sql, params = params.len(), "query");
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> WeaveResult<Vec<Row>> {
        // Delegate through the deref target (tokio_postgres::Client).
        GenericClient::query(&***self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> WeaveResult<Vec<Row>> {
        GenericClient::query(&**self, sql, params).await
    }
}
