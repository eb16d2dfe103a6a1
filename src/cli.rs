//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// ipinfo - self-hosted IP information service
#[derive(Parser, Debug)]
#[command(name = "ipinfo")]
#[command(version)]
#[command(about = "Self-hosted IP geolocation and ASN lookup service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP lookup server (default)
    Serve,

    /// Keep the GeoLite2 databases up to date
    Refresh {
        /// Run a single refresh cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print or write a sample configuration file
    Generate {
        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
}
