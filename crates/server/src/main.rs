use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use clap::Parser;
use secrecy::SecretString;
use tracing::info;

use nightwatch_auth::{JwtManager, OtpAuthenticator};
use nightwatch_core::MessageType;
use nightwatch_notify::{CompositeTransport, DispatcherConfig, MaterializerConfig, OutboxDispatcher, RecurringMaterializer, Transport};
use nightwatch_sms::{SmsConfig, SmsTransport};
use nightwatch_store::Store;
use nightwatch_store_memory::MemoryStore;
use nightwatch_store_postgres::{PostgresConfig, PostgresStore};
use nightwatch_webpush::{WebPushConfig, WebPushTransport};

use nightwatch_server::config::NightwatchConfig;
use nightwatch_server::state::AppState;

/// Night-watch shift coordinator HTTP server.
#[derive(Parser, Debug)]
#[command(name = "nightwatch-server", about = "HTTP server for the night-watch shift coordinator")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "nightwatch.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = NightwatchConfig::load(Some(&cli.config)).map_err(|e| format!("failed to load config: {e}"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    match config.log_format {
        nightwatch_server::config::LogFormat::Json => subscriber.json().init(),
        nightwatch_server::config::LogFormat::Human => subscriber.init(),
    }

    let store: Arc<dyn Store> = if config.database_url.is_empty() {
        info!("no database_url configured, using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let pg_config = PostgresConfig {
            url: config.database_url.clone(),
            pool_size: 10,
            schema: config.database_schema.clone(),
            table_prefix: config.database_table_prefix.clone(),
        };
        Arc::new(PostgresStore::new(pg_config).await?)
    };

    let jwt = Arc::new(JwtManager::new(
        &SecretString::from(config.jwt_secret.clone()),
        ChronoDuration::hours(config.jwt_expiration_hours),
    ));
    let otp = Arc::new(OtpAuthenticator::new(ChronoDuration::minutes(config.otp_validity_minutes)));

    let sms: Arc<dyn Transport> = Arc::new(SmsTransport::new(
        SmsConfig::new(config.twilio_account_sid.clone(), config.twilio_auth_token.clone())
            .with_from_number(config.twilio_from_number.clone())
            .with_dev_mode(config.dev_mode),
    ));
    let push: Arc<dyn Transport> = Arc::new(WebPushTransport::new(
        WebPushConfig::new(config.vapid_public.clone(), config.vapid_private.clone(), config.vapid_subject.clone())
            .with_dev_mode(config.dev_mode),
    ));
    let broadcast: Arc<dyn Transport> = Arc::new(nightwatch_notify::BroadcastTransport::new(push.clone(), store.clone()));

    let mut transports: HashMap<MessageType, Arc<dyn Transport>> = HashMap::new();
    transports.insert(MessageType::OtpVerification, sms.clone());
    transports.insert(MessageType::AdminShiftAssignment, Arc::new(CompositeTransport::new(push.clone(), sms)));
    transports.insert(MessageType::ShiftReminder, push);
    transports.insert(MessageType::Broadcast, broadcast);

    let dispatcher_config = DispatcherConfig {
        batch_size: config.outbox_batch_size,
        tick_interval: Duration::from_secs(config.outbox_tick_interval_secs),
        max_retries: config.outbox_max_retries,
        backoff_base: ChronoDuration::seconds(i64::try_from(config.outbox_backoff_base_secs).unwrap_or(30)),
        backoff_max: ChronoDuration::seconds(i64::try_from(config.outbox_backoff_max_secs).unwrap_or(1800)),
    };
    let dispatcher = OutboxDispatcher::new(store.clone(), transports, dispatcher_config);
    let (dispatcher_shutdown_tx, dispatcher_shutdown_rx) = tokio::sync::mpsc::channel(1);
    let dispatcher_handle = tokio::spawn(async move { dispatcher.run(dispatcher_shutdown_rx).await });

    let materializer_config = MaterializerConfig {
        tick_interval: Duration::from_secs(config.materialize_interval_secs),
        horizon: ChronoDuration::days(config.materialize_horizon_days),
    };
    let materializer = RecurringMaterializer::new(store.clone(), materializer_config);
    let (materializer_shutdown_tx, materializer_shutdown_rx) = tokio::sync::mpsc::channel(1);
    let materializer_handle = tokio::spawn(async move { materializer.run(materializer_shutdown_rx).await });

    let state = AppState { store, jwt, otp, config: Arc::new(config.clone()) };
    let app = nightwatch_server::api::router(state);

    let host = cli.host.unwrap_or(config.server_host);
    let port = cli.port.unwrap_or(config.server_port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "nightwatch-server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = dispatcher_shutdown_tx.send(()).await;
    let _ = materializer_shutdown_tx.send(()).await;
    let _ = dispatcher_handle.await;
    let _ = materializer_handle.await;

    info!("nightwatch-server shut down");
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, then returns to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
