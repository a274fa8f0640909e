//! # apicheck-mock: Mock API Server
//!
//! In-memory implementation of the endpoints the harness exercises: login,
//! token issuance, resource and medication CRUD, and user registration.
//! Request bodies are checked against the same schema catalog the tests
//! use, so a payload the generator considers valid is accepted here.
//!
//! Storage is DashMap-backed with no persistence; data is lost on restart.
//!
//! [`spawn`] starts a server on an ephemeral loopback port for tests.

pub mod auth;
pub mod error;
pub mod routes;
pub mod store;

use std::net::SocketAddr;

pub use error::MockError;
pub use routes::router;
pub use store::{AppState, MOCK_PASSWORD, MOCK_USERNAME};

/// A mock server running on a background task. Aborted on drop.
pub struct RunningMock {
    addr: SocketAddr,
    state: AppState,
    task: tokio::task::JoinHandle<()>,
}

impl RunningMock {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `http://127.0.0.1:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The server's stores, for direct inspection.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl Drop for RunningMock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve `state` on `127.0.0.1` at an OS-assigned port.
pub async fn spawn(state: AppState) -> std::io::Result<RunningMock> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let app = router(state.clone());

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(error = %e, "mock server stopped");
        }
    });
    tracing::info!(%addr, "apicheck-mock spawned");
    Ok(RunningMock { addr, state, task })
}
