use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "marksheet",
    about = "Student marksheet records over an append-only ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger file (overrides `[ledger] path` in the config file)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// TOML config file with `[store]`, `[server]`, and `[ledger]` sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reset the seed keys to the default dataset
    Seed,
    /// Write a record under a key
    Add(AddArgs),
    /// Show the record stored under a key
    Get(GetArgs),
    /// Locate a record using the configured lookup strategy
    Find(FindArgs),
    /// List every record in the scan window
    All,
    /// Set the mark of a record
    Update(UpdateArgs),
    /// Serve the HTTP gateway
    Serve(ServeArgs),
    /// Rewrite the ledger file keeping only live entries
    Compact,
}

#[derive(Args)]
pub struct AddArgs {
    pub key: String,
    pub name: String,
    pub year: String,
    pub board: String,
    pub mark: String,
    #[arg(long)]
    pub rollno: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
}

#[derive(Args)]
pub struct FindArgs {
    pub identifier: String,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub identifier: String,
    pub mark: String,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides `[server] bind_addr`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Seed the default dataset before serving
    #[arg(long)]
    pub seed: bool,
}
