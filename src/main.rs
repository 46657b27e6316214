use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use listings::auth::credentials::{hash_secret, CredentialStore, StaticCredentialStore};
use listings::auth::denylist::{spawn_eviction, RedisDenylist};
use listings::auth::jwt::JwtManager;
use listings::auth::scopes::ScopeTable;
use listings::auth::Authenticator;
use listings::service::ListingService;
use listings::store::postgres::PgStore;
use listings::{cli, config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::HashSecret { secret }) => {
            hash_secret(&secret).map(|hash| println!("{}", hash))
        }
        Some(cli::Commands::Migrate) => {
            let cfg = config::load()?;
            let db = PgStore::connect(&cfg.database_url, cfg.database_max_connections).await?;
            db.migrate().await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Some(cli::Commands::Serve { port }) => {
            let cfg = config::load()?;
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        None => {
            let cfg = config::load()?;
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    opentelemetry::global::shutdown_tracer_provider();
    result
}

/// `EnvFilter` + fmt (plain or JSON), plus OTLP export when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
fn init_tracing() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "listings-api"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "listings=debug,tower_http=debug".into()),
        ))
        .with(fmt_layer)
        .with(telemetry_layer)
        .init();
    Ok(())
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url, cfg.database_max_connections).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    tracing::info!("Connecting to Redis...");
    let denylist = Arc::new(RedisDenylist::connect(&cfg.redis_url).await?);
    denylist.ping().await.context("Redis did not answer PING")?;
    spawn_eviction(denylist.clone(), Duration::from_secs(60));

    let credentials: Arc<dyn CredentialStore> = match &cfg.clients_file {
        Some(path) => {
            let store = StaticCredentialStore::from_file(path)
                .with_context(|| format!("failed to load clients file {}", path))?;
            tracing::info!(clients = store.len(), "Loaded client credentials");
            Arc::new(store)
        }
        None => {
            tracing::warn!("CLIENTS_FILE is not set, no client will be able to log in");
            Arc::new(StaticCredentialStore::default())
        }
    };

    let auth = Authenticator::new(
        JwtManager::new(cfg.jwt_secret.as_bytes(), cfg.jwt_expires_in_secs),
        ScopeTable::default(),
        denylist,
        credentials,
    );
    let service = ListingService::new(Arc::new(db), cfg.page_limits());
    let app = listings::app(AppState::new(service, auth));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listings API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
