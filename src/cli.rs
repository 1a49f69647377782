//! Command-line interface definition for pocketchat
//!
//! This module defines the CLI structure using clap's derive API, providing
//! commands for starting conversations, continuing them, and managing the
//! stored history.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pocketchat - terminal chat client with durable conversation history
///
/// Start a conversation from a prompt or a quick idea, come back to it later
/// by id, and browse or prune the stored history.
#[derive(Parser, Debug, Clone)]
#[command(name = "pocketchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory of the history database (overrides config and
    /// POCKETCHAT_STORE_PATH)
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for pocketchat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a new conversation and open it
    New {
        /// First message of the conversation
        prompt: Option<String>,

        /// Use quick idea number N as the first message (see `ideas`)
        #[arg(short, long, conflicts_with = "prompt")]
        idea: Option<usize>,

        /// Override the provider from config (data_stream, ollama)
        #[arg(short, long)]
        provider: Option<String>,

        /// Create the conversation and print its id without opening it
        #[arg(short, long)]
        detach: bool,
    },

    /// List the quick-start ideas
    Ideas,

    /// Open an existing conversation
    Chat {
        /// Conversation id (see `history list`)
        id: String,

        /// Override the provider from config (data_stream, ollama)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Manage stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    /// List conversations, most recent first
    List,

    /// Print the messages of a conversation
    Show {
        /// Conversation id
        id: String,
    },

    /// Remove a conversation from the history list
    ///
    /// The message log stays in the store; `history repair --prune` removes it.
    Delete {
        /// Conversation id
        id: String,
    },

    /// Report summaries and message logs that lost their counterpart
    Repair {
        /// Delete message logs that have no summary
        #[arg(long)]
        prune: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            storage_path: None,
            command: Commands::History {
                command: HistoryCommand::List,
            },
        }
    }
}
