//! Listener plumbing shared by the simulated network endpoints

use std::future::Future;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

/// Accept loop spawning one handler task per connection.
///
/// Connection tasks live in a `JoinSet` owned by the loop, so aborting
/// the returned handle tears down every open connection with it.
pub(crate) fn spawn_listener<S, H, Fut>(
    name: &'static str,
    listener: TcpListener,
    state: S,
    handler: H,
) -> JoinHandle<()>
where
    S: Clone + Send + 'static,
    H: Fn(TcpStream, S) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut connections = JoinSet::new();
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    tracing::debug!("{name}: connection from {peer_addr}");
                    let connection = handler(stream, state.clone());
                    connections.spawn(async move {
                        if let Err(e) = connection.await {
                            tracing::debug!("{name}: connection ended: {e}");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("{name}: accept error: {e}");
                }
            }
            // Reap finished connection tasks.
            while connections.try_join_next().is_some() {}
        }
    })
}
