//! Connection handler contract.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::net::BoxedConnection;

/// Application logic invoked once per accepted connection.
///
/// Each call runs on its own task; whatever the future resolves to is ignored.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, conn: BoxedConnection) -> BoxFuture<'static, ()>;
}

impl<F, Fut> ConnectionHandler for F
where
    F: Fn(BoxedConnection) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
{
    fn handle(&self, conn: BoxedConnection) -> BoxFuture<'static, ()> {
        self(conn).map(drop).boxed()
    }
}

/// Handler shared between a hub and every task it spawns.
pub type SharedHandler = Arc<dyn ConnectionHandler>;

/// Wrap an async function or closure as a [`SharedHandler`].
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(BoxedConnection) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
{
    Arc::new(f)
}
