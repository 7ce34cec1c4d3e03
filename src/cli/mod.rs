//! CLI module for callbridge.

pub mod commands;
mod output;

pub use output::{mask_secret, Output};

use clap::{Parser, Subcommand};

/// callbridge - video call credentials and realtime AI agent bridge
///
/// Issues call credentials for clients and attaches an AI agent to calls.
/// Runs the HTTP server when no command is given.
#[derive(Parser, Debug)]
#[command(name = "callbridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (default: from config, 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default: from config, 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a user token for the video platform
    Token {
        /// User id the token authorizes
        user_id: String,

        /// Token lifetime in seconds (default: from config)
        #[arg(long)]
        validity: Option<u64>,
    },

    /// Check required credentials and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            host: None,
            port: None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
