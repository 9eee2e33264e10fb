//! Throwaway servers on a loopback port.

use std::net::SocketAddr;

use pactum_server::{Router, Server, ShutdownSignal};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::TestError;

/// A server bound to `127.0.0.1` on a free port.
///
/// Dropping it stops the server.
///
/// ```ignore
/// let server = TestServer::spawn(router).await?;
/// let client = pactum_client::Client::builder()
///     .base_url(server.base_url())
///     .build()?;
/// ```
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Starts serving `router` with default server settings.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Spawn`] if no port could be bound.
    pub async fn spawn(router: Router) -> Result<Self, TestError> {
        Self::spawn_server(Server::builder().router(router).build()).await
    }

    /// Starts serving a configured server. Its bind address is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Spawn`] if no port could be bound.
    pub async fn spawn_server(server: Server) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = ShutdownSignal::new();

        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = server.serve_listener(listener, signal).await {
                tracing::error!(error = %e, "test server failed");
            }
        });

        Ok(Self {
            addr,
            shutdown,
            task: Some(task),
        })
    }

    /// Returns the bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns `http://127.0.0.1:<port>`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns an absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Stops the server and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
