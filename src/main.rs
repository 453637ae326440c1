use std::sync::Arc;

use anyhow::Context as _;
use async_graphql::http::GraphiQLSource;
use axum::{
    extract::Extension,
    http::{HeaderValue, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use todo_graphql::schema::build_schema;
use todo_graphql::storage::Database;
use todo_graphql::{
    graphql_handler, AuthMode, HeaderSessionResolver, ServerConfig, SessionResolver,
    SessionTokenResolver,
};

async fn healthcheck() -> &'static str {
    "ok"
}

fn cors(config: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let origins = config
        .trusted_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid trusted origin '{}'", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any))
}

fn session_resolver(config: &ServerConfig, db: &Database) -> Arc<dyn SessionResolver> {
    match config.auth_mode {
        AuthMode::Session => Arc::new(SessionTokenResolver::new(db.users())),
        AuthMode::Header => {
            warn!("Trusting x-user-id header; only run behind an authenticating gateway");
            Arc::new(HeaderSessionResolver)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("failed to load configuration")?;

    let db = Database::connect(&config.database_url, config.max_connections)
        .await
        .context("failed to open database")?;

    let schema = build_schema(&db);
    let resolver = session_resolver(&config, &db);
    let endpoint = config.graphql_endpoint.clone();

    let graphql = if config.enable_graphiql {
        let page = GraphiQLSource::build().endpoint(&endpoint).finish();
        get(move || {
            let page = page.clone();
            async move { Html(page) }
        })
        .post(graphql_handler)
    } else {
        post(graphql_handler)
    };

    let app = Router::new()
        .route(&endpoint, graphql)
        .route("/healthcheck", get(healthcheck))
        .layer(Extension(schema))
        .layer(Extension(db.clone()))
        .layer(Extension(resolver))
        .layer(cors(&config)?)
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server listening on http://{}{}", addr, endpoint);
    if config.enable_graphiql {
        info!("GraphiQL available at http://{}{}", addr, endpoint);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}
