use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::init_logging;
use dotenvy::dotenv;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::routes::{self, AppState};
use service::{runtime, storage::StoreRegistry};

/// Grace period for in-flight requests after the shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn load_bind_addr(cfg: &configs::AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Public entry: build the app, serve until interrupted, drain, close stores.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = configs::load_default()?;
    init_logging(cfg.server.debug);

    runtime::ensure_env(&cfg.storage.data_dir).await?;

    let registry = StoreRegistry::new(&cfg.storage.data_dir);
    let state = AppState { registry: Arc::clone(&registry) };
    let app: Router = routes::build_router(state);

    let addr = load_bind_addr(&cfg)?;
    info!(%addr, data_dir = %cfg.storage.data_dir, "starting counter service");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    serve_until_shutdown(listener, app, registry, shutdown_signal()).await
}

/// Serve until the given shutdown future resolves, drain in-flight requests
/// bounded by [`DRAIN_TIMEOUT`], then close every open store. The shutdown
/// trigger is injected so callers other than the signal handler (tests in
/// particular) can drive the same sequence.
pub async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    app: Router,
    registry: Arc<StoreRegistry>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    tokio::select! {
        res = &mut server => {
            // listener died on its own; surface the error and still close stores
            res??;
        }
        _ = shutdown => {
            info!("shutdown signal received, draining in-flight requests");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut server).await {
                Ok(res) => res??,
                Err(_) => {
                    warn!(timeout = ?DRAIN_TIMEOUT, "drain timed out, forcing shutdown");
                    server.abort();
                }
            }
        }
    }

    // Store-close failure is unrecoverable; propagate so the process exits
    // non-zero instead of silently losing the final flush.
    registry.close_all().await?;
    info!("server exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
