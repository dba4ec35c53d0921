use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Parser)]
#[command(name = "httpstash", about = "Content-addressable HTTP exchange store")]
pub struct Cli {
    /// Path to the configuration file (defaults to ./httpstash.toml if present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch a URL, storing both the request and the response.
    Fetch {
        url: String,
        /// Store key; defaults to the URL.
        #[arg(long)]
        key: Option<String>,
        /// Replace existing records.
        #[arg(long = "override")]
        overwrite: bool,
    },
    /// Print a stored request.
    Request { key: String },
    /// Print a stored response header, or its body with --body.
    Response {
        key: String,
        #[arg(long)]
        body: bool,
    },
    /// List stored request records.
    List,
    /// Delete the request and response stored under a key.
    Delete { key: String },
    /// Print the digest a key maps to.
    Digest { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}
