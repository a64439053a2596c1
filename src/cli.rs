// src/cli.rs
//! CLI definitions for the Parcel server
//!
//! Command-line interface definitions using clap. The implementations live
//! in `main.rs`.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parcel")]
#[command(author = "Parcel Contributors")]
#[command(version)]
#[command(about = "Package lifecycle server with background Nix builds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    Init {
        /// Path to the database file
        #[arg(short, long, default_value = "./parcel.db")]
        db_path: PathBuf,
    },

    /// Run the HTTP server
    Serve {
        /// Configuration file (defaults to $PARCEL_CONFIG if set)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bind address, overriding the config file
        #[arg(short, long)]
        bind: Option<String>,

        /// Database path, overriding the config file
        #[arg(short, long)]
        db_path: Option<PathBuf>,
    },

    /// Administer API tokens directly in the database
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// List all tokens
    List {
        #[arg(short, long, default_value = "./parcel.db")]
        db_path: PathBuf,
    },

    /// Issue a new token
    Issue {
        #[arg(short, long, default_value = "./parcel.db")]
        db_path: PathBuf,
    },

    /// Revoke a single token
    Revoke {
        /// Token ID
        id: i64,

        #[arg(short, long, default_value = "./parcel.db")]
        db_path: PathBuf,
    },

    /// Revoke every token except the given value
    RevokeAllExcept {
        /// Token value to keep
        token: String,

        #[arg(short, long, default_value = "./parcel.db")]
        db_path: PathBuf,
    },

    /// Replace a token's value with a fresh one
    Rotate {
        /// Token ID
        id: i64,

        #[arg(short, long, default_value = "./parcel.db")]
        db_path: PathBuf,
    },
}
