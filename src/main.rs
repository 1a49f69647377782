//! pocketchat - terminal chat client with durable conversation history
//!
#![doc = "pocketchat - terminal chat client"]
#![doc = "Main entry point for the pocketchat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pocketchat::cli::{Cli, Commands};
use pocketchat::commands;
use pocketchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::New {
            prompt,
            idea,
            provider,
            detach,
        } => {
            tracing::info!("Starting new conversation");
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }
            commands::landing::run_new(config, prompt, idea, provider, detach).await?;
            Ok(())
        }
        Commands::Ideas => {
            commands::landing::list_ideas();
            Ok(())
        }
        Commands::Chat { id, provider } => {
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }
            commands::chat::run_chat(config, id, provider).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(&config, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set. Logs go to stderr so they never mix with a
/// streamed reply.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pocketchat=debug"
    } else {
        "pocketchat=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
