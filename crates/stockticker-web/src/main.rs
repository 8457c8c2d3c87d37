mod config;
mod error;
mod router;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use stockticker_core::{AlphaVantageAdapter, QuoteAggregator, TimeSeriesCache};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::error::ServerError;
use crate::router::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG=debug,tower_http=debug ./stockticker
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    fmt().with_env_filter(env_filter).with_target(false).init();

    match run(Config::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server stopped");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(config: Config) -> Result<(), ServerError> {
    let aggregator_config = config.aggregator()?;
    let source = Arc::new(AlphaVantageAdapter::new(config.alpha_vantage()));
    let aggregator = QuoteAggregator::new(aggregator_config, TimeSeriesCache::default(), source);

    let app = router::router(AppState { aggregator }, config.request_timeout());

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(
        %addr,
        symbol = %config.query_stock_symbol,
        ndays = config.query_ndays,
        series = ?config.query_series,
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
