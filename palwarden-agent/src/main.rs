use anyhow::Context;
use palwarden_agent::api::{ServerApi, build_http_client};
use palwarden_agent::config::Config;
use palwarden_agent::poller::run_presence_poller;
use palwarden_agent::sink::WebhookSink;
use palwarden_agent::status::run_status_refresh;
use palwarden_agent::sweep::run_null_sweep;
use palwarden_agent::tailer::{LogTailer, run_log_tailer};
use palwarden_db::Database;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Palwarden agent...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: db_path={}, presence={}s, sweep={}s, tail={}s, status={}s",
        config.database_path,
        config.presence_interval.as_secs(),
        config.sweep_interval.as_secs(),
        config.tail_interval.as_secs(),
        config.status_interval.as_secs(),
    );

    let db = Database::open(&config.database_path)
        .await
        .context("opening database")?;
    let http = build_http_client().context("building http client")?;

    let servers = db.list_servers().await.context("listing servers")?;
    let relays = db.list_chat_relays().await.context("listing chat relays")?;
    tracing::info!(servers = servers.len(), relays = relays.len(), "loaded registry");

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    // One independent task per (server, loop-kind); none blocks another.
    for server in servers {
        let api = ServerApi::new(http.clone(), &server.host, server.api_port, &server.password);
        let sink = WebhookSink::new(http.clone(), None, config.events_webhook_url.clone());

        tasks.push(tokio::spawn(run_presence_poller(
            db.clone(),
            api.clone(),
            sink.clone(),
            server.clone(),
            config.presence_interval,
        )));
        tasks.push(tokio::spawn(run_null_sweep(
            api.clone(),
            server.server_name.clone(),
            config.sweep_interval,
        )));
        tasks.push(tokio::spawn(run_status_refresh(
            api,
            sink,
            server.server_name.clone(),
            config.status_interval,
        )));
    }

    for relay in relays {
        let tailer = LogTailer::new(relay.server_name.clone(), relay.log_dir.clone());
        let sink = WebhookSink::new(
            http.clone(),
            Some(relay.webhook_url.clone()),
            config.events_webhook_url.clone(),
        );
        tasks.push(tokio::spawn(run_log_tailer(
            tailer,
            sink,
            config.tail_interval,
            config.chat_pace,
        )));
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("Shutting down, aborting background tasks");

    // No invariant depends on a tick completing: open sessions stay open and
    // are closed by the next reconciliation after restart.
    for task in tasks {
        task.abort();
    }

    Ok(())
}
