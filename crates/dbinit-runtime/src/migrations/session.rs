use std::future::Future;
use std::pin::Pin;

use dbinit_core::Result;

/// Boxed future returned by session operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A single open database session the applier drives.
///
/// All calls happen sequentially on one connection. Transaction control is
/// explicit so the applier owns the begin/commit/rollback policy.
pub trait SchemaSession: Send {
    /// Open a transaction.
    fn begin(&mut self) -> SessionFuture<'_, ()>;

    /// Execute one DDL statement.
    fn execute<'a>(&'a mut self, sql: &'a str) -> SessionFuture<'a, ()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> SessionFuture<'_, ()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> SessionFuture<'_, ()>;

    /// Table names in `schema`, ascending by byte order.
    fn table_names<'a>(&'a mut self, schema: &'a str) -> SessionFuture<'a, Vec<String>>;

    /// Close the session. Consumes it so it can only happen once.
    fn close(self) -> SessionFuture<'static, ()>
    where
        Self: Sized;
}
