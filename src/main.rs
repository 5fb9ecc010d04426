use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jsonapi_rest::auth::{generate_token, Claims};
use jsonapi_rest::callback::{except, Action, BearerTokenAuthorizer, Callback};
use jsonapi_rest::{config, demo, MemoryStore};

#[derive(Parser)]
#[command(name = "jsonapi-rest")]
#[command(about = "JSON:API server for the demo posts, comments and selections")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides API_PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Mount path for resource routes (overrides API_PREFIX)")]
    prefix: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print a bearer token signed with SECURITY_TOKEN_SECRET")]
    Token {
        #[arg(long, default_value = "dev")]
        sub: String,

        #[arg(long, default_value = "")]
        scope: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SECURITY_TOKEN_SECRET etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.port, cli.prefix).await,
        Commands::Token { sub, scope } => {
            let secret = &config::config().security.token_secret;
            let token = generate_token(&Claims::new(sub, scope), secret).context("cannot sign token")?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>, prefix: Option<String>) -> anyhow::Result<()> {
    let mut config = config::config().clone();
    if let Some(port) = port {
        config.api.port = port;
    }
    if let Some(prefix) = prefix {
        config.api.prefix = config::normalize_prefix(&prefix);
    }
    tracing::info!("Starting in {:?} mode", config.environment);

    // Reads stay public; mutations need a token once a secret is configured
    let authorizer: Option<Arc<dyn Callback>> = if config.security.token_secret.is_empty() {
        tracing::warn!("SECURITY_TOKEN_SECRET not set, all routes are unauthenticated");
        None
    } else {
        Some(except(
            &[Action::List, Action::Find, Action::RelationshipQuery],
            Arc::new(BearerTokenAuthorizer::from_config()),
        ))
    };

    let group = demo::group(config.api.prefix.clone(), Arc::new(MemoryStore::new()), authorizer)
        .context("invalid demo resource declaration")?;
    let app = jsonapi_rest::app(&config, group);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}{}", bind_addr, config.api.prefix);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
