use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tracing_subscriber::EnvFilter;

use sellio::config::Config;
use sellio::db::{self, AppState, queries};
use sellio::models::{CreateCreator, UpdateCreator};
use sellio::notify::Notifier;
use sellio::payments::Slip2GoClient;
use sellio::util::{generate_token, hash_api_key};

#[derive(Parser)]
#[command(name = "sellio", about = "Creator storefront and booking backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Provision a creator account and print its API key.
    CreateCreator {
        #[arg(long)]
        email: String,
        #[arg(long)]
        store_name: String,
        /// PromptPay id buyers transfer to. Required before the store can sell.
        #[arg(long)]
        promptpay_id: Option<String>,
        /// Publish the storefront immediately.
        #[arg(long)]
        publish: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let pool = db::create_pool(&config.database_path)?;
    {
        let conn = pool.get()?;
        db::init_schema(&conn)?;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::CreateCreator {
            email,
            store_name,
            promptpay_id,
            publish,
        } => create_creator(pool, email, store_name, promptpay_id, publish),
    }
}

async fn serve(config: Config, pool: db::DbPool) -> anyhow::Result<()> {
    let verifier = match (&config.slip2go_api_url, &config.slip2go_api_key) {
        (Some(url), Some(key)) => Some(Slip2GoClient::new(url, key)),
        _ => {
            tracing::warn!("slip2go not configured; slips will await manual review");
            None
        }
    };

    let state = AppState {
        db: pool,
        base_url: config.base_url.clone(),
        verifier,
        notifier: Notifier::new(config.notify_webhook_url.clone()),
    };

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(5)
        .burst_size(40)
        .finish()
        .context("invalid rate limit configuration")?;

    let app = sellio::app(state, config.dev_mode).layer(GovernorLayer::new(governor_conf));

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, dev_mode = config.dev_mode, "sellio listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn create_creator(
    pool: db::DbPool,
    email: String,
    store_name: String,
    promptpay_id: Option<String>,
    publish: bool,
) -> anyhow::Result<()> {
    let conn = pool.get()?;

    let api_key = generate_token();
    let creator = queries::create_creator(
        &conn,
        &CreateCreator {
            email,
            store_name,
            promptpay_id,
        },
        &hash_api_key(&api_key),
    )?;
    if publish {
        queries::update_creator(
            &conn,
            &creator.id,
            &UpdateCreator {
                store_name: None,
                promptpay_id: None,
                is_published: Some(true),
            },
        )?;
    }

    println!("creator id: {}", creator.id);
    println!("api key:    {api_key}");
    println!("(the key is stored only as a hash; save it now)");
    Ok(())
}
