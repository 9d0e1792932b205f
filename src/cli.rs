use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "diagnose",
    version,
    about = "Hole-detection diagnostics for blockchain indexing pipelines (EOS / ETH)"
)]
pub struct Cli {
    /// Specify the config file path (default: ./config.yaml)
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override the listen address from the config file
    #[arg(long)]
    pub listen_addr: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the diagnostic HTTP service
    Serve,
}
