use std::{future::Future, net::SocketAddr};

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{self, AppState};

/// HTTP front end bound to an already-open listener.
pub struct Server {
    listener: TcpListener,
    state: AppState,
}

impl Server {
    pub fn new(listener: TcpListener, state: AppState) -> Self {
        Self { listener, state }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until `shutdown` resolves, then lets in-flight
    /// requests finish.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server { listener, state } = self;
        axum::serve(listener, api::router(state))
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("server shut down");
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}
