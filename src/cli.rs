use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mailharvest", about = "Domain email harvester")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the worker loop: poll for pending searches and crawl them
    Worker,
    /// Run the Search Runner once against a single search, then exit
    Crawl {
        /// Search id to process (defaults to `worker.search_id`)
        #[arg(short, long)]
        search_id: Option<i64>,
    },
    /// Serve the REST API
    Serve {
        /// Bind port
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}
