//! Presenter server: loads endpoint definitions and serves them over HTTP.
//!
//! Run from repo root: `cargo run -p presenter-server` with `SERVICE_PORT` set
//! (a `.env` file in the working directory is honoured).

use rest_presenter::{
    common_routes, endpoint_routes, AppState, EndpointRegistry, GrpcQueryClient, RhaiEvaluator,
    Settings, StateDefaults, TemplateStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("rest_presenter=info,presenter_server=info")
                }),
        )
        .init();

    let settings = Settings::from_env()?;

    let mut templates = TemplateStore::new();
    let registry = EndpointRegistry::load(
        &settings.settings_path,
        &mut templates,
        &StateDefaults::default(),
    )?;
    tracing::info!(
        endpoints = registry.len(),
        path = %settings.settings_path.display(),
        "endpoint definitions loaded"
    );

    let client =
        GrpcQueryClient::connect(&settings.querykit_uri(), &settings.pool, settings.request_timeout)
            .await?;
    let state = AppState {
        client: Arc::new(client),
        evaluator: Arc::new(RhaiEvaluator::new(settings.evaluator_limits())),
        renderer: Arc::new(templates),
        query_timeout: settings.request_timeout,
    };

    let app = common_routes(state.clone())
        .merge(endpoint_routes(&registry, state))
        .layer(RequestBodyLimitLayer::new(settings.body_limit))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(settings.listen_addr()).await?;
    tracing::info!("presenter listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("presenter stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
