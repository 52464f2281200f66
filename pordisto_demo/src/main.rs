use axum::body::Body;
use clap::Parser;
use pordisto::{jwks::RemoteKeySet, Gate};
use pordisto_demo::{app, config::ServerOpts};
use pordisto_tower::Authorizer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pordisto=debug,tower_http=debug")),
        )
        .init();

    let opts = ServerOpts::parse();
    tracing::debug!(?opts, "starting with options");

    let keys = RemoteKeySet::builder(opts.jwks_uri.clone())
        .requests_per_minute(opts.jwks_requests_per_minute)
        .build()?;
    let gate = Gate::new(opts.verification_config(), keys)?;

    let authorizer = Authorizer::new(gate);
    let router = if opts.verbose_errors {
        app(&authorizer.with_verbose_error_handler::<Body>())
    } else {
        app(&authorizer.with_terse_error_handler::<Body>())
    };

    let listener = tokio::net::TcpListener::bind(opts.listen).await?;
    let url = format!("http://{}", listener.local_addr()?);
    tracing::info!("server is running at {url}");
    tracing::info!("Try {url}/ping");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
