//! Connection and factory abstractions supplied by the pool's user

use crate::errors::BoxError;
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A live client connection owned by the pool.
///
/// The pool never inspects a connection; it only closes it when retiring it
/// or when the pool itself closes. Implementations whose teardown happens on drop can
/// rely on the default no-op `close`.
pub trait Connection: Send + Sync + 'static {
    /// Tear down the underlying transport
    fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Creates connections on demand.
///
/// The token is cancelled when the caller that triggered the creation gives
/// up; slow factories should watch it and bail out early.
///
/// Any `Fn(CancellationToken) -> impl Future<Output = Result<C, BoxError>>`
/// closure is a factory:
///
/// ```
/// use connpool::{BoxError, Connection, ConnectionFactory};
/// use tokio_util::sync::CancellationToken;
///
/// struct Channel;
/// impl Connection for Channel {}
///
/// fn assert_factory<F: ConnectionFactory>(_: &F) {}
///
/// let factory = |_cancel: CancellationToken| async { Ok::<_, BoxError>(Channel) };
/// assert_factory(&factory);
/// ```
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Connection;

    async fn connect(&self, cancel: CancellationToken) -> Result<Self::Connection, BoxError>;
}

#[async_trait]
impl<F, Fut, C> ConnectionFactory for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, BoxError>> + Send + 'static,
    C: Connection,
{
    type Connection = C;

    async fn connect(&self, cancel: CancellationToken) -> Result<C, BoxError> {
        (self)(cancel).await
    }
}
