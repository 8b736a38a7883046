//! Follow a community long-poll feed and print each batch as a JSON line.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vkpoll::{CredentialRequest, LongPollConfig, LongPollSession, SessionContext};
use vkpoll_api::{ApiClient, ApiConfig, HttpSender};

#[derive(Debug, Parser)]
#[command(name = "vkpoll", version, about)]
struct Cli {
    /// Community access token.
    #[arg(long)]
    token: String,

    /// Community id.
    #[arg(long)]
    group_id: u64,

    /// TOML file with retry and timeout settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// API origin.
    #[arg(long)]
    api_url: Option<String>,

    /// Log as JSON.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match &cli.config {
        Some(path) => LongPollConfig::from_file(path)?,
        None => LongPollConfig::default(),
    };

    let mut api = ApiConfig::new().with_token(cli.token);
    if let Some(url) = cli.api_url {
        api = api.with_api_url(url);
    }
    api.validate()
        .map_err(|errors| anyhow!("invalid API config: {}", errors.join("; ")))?;
    let client = ApiClient::new(api).context("building API client")?;

    let context = SessionContext::new(Arc::new(client), CredentialRequest::for_group(cli.group_id));
    let mut session = LongPollSession::start(context, Arc::new(HttpSender::new()), config);

    let abort = session.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            abort.abort();
        }
    });

    while let Some(batch) = session.next().await {
        println!("{}", Value::Array(batch));
    }

    session.shutdown().await;
    Ok(())
}
