use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use scaffold_permits::access::{key_router, AccessKeyRegistry};
use scaffold_permits::config::AppConfig;
use scaffold_permits::error::AppError;
use scaffold_permits::permits::{
    scaffold_router, LifecycleMonitor, MessagingGateway, MonitorSettings, RestDbStore, SweepSummary,
};
use scaffold_permits::telemetry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Scaffold Permit Tracker",
    about = "Run the scaffold permit service and its expiration lifecycle monitor",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service together with the lifecycle monitor (default)
    Serve(ServeArgs),
    /// Run a single lifecycle sweep against the configured store and exit
    Sweep(SweepArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Reference day for the sweep (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Sweep(args) => run_sweep(args).await,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = Arc::new(RestDbStore::new(&config.store));
    let alerts = Arc::new(MessagingGateway::new(&config.alerts));
    let access_keys = Arc::new(AccessKeyRegistry::from_entries(&config.access_keys)?);

    let monitor = LifecycleMonitor::new(
        store.clone(),
        alerts,
        MonitorSettings {
            sweep_interval: config.monitor.sweep_interval,
            retry_backoff: config.monitor.retry_backoff,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_task = tokio::spawn(async move { monitor.run(shutdown_rx).await });

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(scaffold_router(store))
        .merge(key_router(access_keys))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scaffold permit service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .map_err(AppError::Io)?;

    let _ = monitor_task.await;
    Ok(())
}

/// Completes when the process receives Ctrl-C, after flipping the monitor's
/// shutdown flag so the loop winds down with the server.
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
    let _ = shutdown.send(true);
}

async fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(RestDbStore::new(&config.store));
    let alerts = Arc::new(MessagingGateway::new(&config.alerts));
    let monitor = LifecycleMonitor::new(
        store,
        alerts,
        MonitorSettings {
            sweep_interval: config.monitor.sweep_interval,
            retry_backoff: config.monitor.retry_backoff,
        },
    );

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let summary = monitor.sweep(today).await?;
    render_sweep_summary(today, &summary);

    Ok(())
}

fn render_sweep_summary(today: NaiveDate, summary: &SweepSummary) {
    println!("Lifecycle sweep for {today}");
    println!("- evaluated:      {}", summary.evaluated);
    println!("- notified:       {}", summary.notified);
    println!("- marked expired: {}", summary.marked_expired);
    println!("- purged:         {}", summary.purged);
    println!("- skipped:        {}", summary.skipped);
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
