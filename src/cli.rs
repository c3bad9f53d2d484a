//! CLI surface (C9): `relay-rs serve --port --config`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "relay-rs", about = "A Nostr relay server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the relay server.
    Serve(ServeArgs),
}

#[derive(Debug, Parser)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 9999)]
    pub port: u16,

    #[arg(long, default_value = "./config.toml")]
    pub config: PathBuf,
}
