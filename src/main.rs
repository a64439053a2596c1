// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, TokenCommands};
use parcel::server::run_server;
use parcel::{Database, ParcelConfig, TokenAuthority};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { db_path }) => {
            info!("Initializing Parcel database at: {}", db_path.display());
            parcel::db::init(&db_path)?;
            println!("Database initialized successfully at: {}", db_path.display());
            Ok(())
        }
        Some(Commands::Serve {
            config,
            bind,
            db_path,
        }) => {
            let mut config = ParcelConfig::load_or_default(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(db_path) = db_path {
                config.database.path = db_path;
            }
            config.validate()?;

            run_server(config.to_server_config()?).await
        }
        Some(Commands::Token { command }) => cmd_token(command).await,
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "parcel", &mut std::io::stdout());
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn open_authority(db_path: &Path) -> Result<TokenAuthority> {
    let db = Database::init(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(TokenAuthority::new(db))
}

async fn cmd_token(command: TokenCommands) -> Result<()> {
    match command {
        TokenCommands::List { db_path } => {
            let tokens = open_authority(&db_path)?.list().await?;
            if tokens.is_empty() {
                println!("No tokens (server is in bootstrap mode)");
            }
            for token in tokens {
                println!("{}\t{}", token.id.unwrap_or_default(), token.token);
            }
        }
        TokenCommands::Issue { db_path } => {
            let token = open_authority(&db_path)?.issue().await?;
            println!("{}\t{}", token.id.unwrap_or_default(), token.token);
        }
        TokenCommands::Revoke { id, db_path } => {
            open_authority(&db_path)?.revoke_one(id).await?;
            println!("Revoked token {}", id);
        }
        TokenCommands::RevokeAllExcept { token, db_path } => {
            let removed = open_authority(&db_path)?.revoke_all_except(&token).await?;
            println!("Revoked {} token(s)", removed);
        }
        TokenCommands::Rotate { id, db_path } => {
            let token = open_authority(&db_path)?.rotate(id).await?;
            println!("{}\t{}", id, token.token);
        }
    }
    Ok(())
}
