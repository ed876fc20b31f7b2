//! Serve command - run the HTTP API

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Args;
use confer_api::AppState;
use confer_core::{AppContext, Config};

/// Serve `POST /chat` and `GET /health`
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides config)
    #[arg(short, long)]
    bind: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let bind = self.bind.as_deref().unwrap_or(&config.server.bind);
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind, e))?;

        let context = AppContext::bootstrap(config).await?;
        let state = Arc::new(AppState::new(context.orchestrator()));

        confer_api::serve(state, addr).await
    }
}
