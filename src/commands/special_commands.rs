//! Special commands parser for the interactive conversation view
//!
//! Input starting with `/` is a command for the view rather than a message
//! for the model. `exit` and `quit` also leave the view. Commands are
//! case-insensitive.

use colored::Colorize;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },
}

/// Commands understood by the conversation view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show conversation id, provider, state and message count
    ShowStatus,

    /// Reprint the whole conversation
    Transcript,

    /// Display help information
    Help,

    /// Leave the conversation view
    Exit,

    /// Not a special command; send the input as a message
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with `/` but is not
/// a known command, and `CommandError::UnsupportedArgument` if a known
/// command is given an argument.
///
/// # Examples
///
/// ```
/// use pocketchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/STATUS").unwrap(), SpecialCommand::ShowStatus);
/// assert_eq!(parse_special_command("quit").unwrap(), SpecialCommand::Exit);
/// assert_eq!(parse_special_command("hello there").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = lower.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    let parsed = match command {
        "/status" => SpecialCommand::ShowStatus,
        "/transcript" | "/history" => SpecialCommand::Transcript,
        "/help" | "/?" => SpecialCommand::Help,
        "/exit" | "/quit" | "exit" | "quit" => SpecialCommand::Exit,
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };

    if !arg.is_empty() {
        return Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        });
    }

    Ok(parsed)
}

/// Print the list of special commands
pub fn print_help() {
    println!();
    println!("{}", "Conversation commands".bold());
    println!("  {}        Show conversation id, provider and state", "/status".cyan());
    println!("  {}    Reprint the conversation", "/transcript".cyan());
    println!("  {}          Show this help", "/help".cyan());
    println!("  {}          Leave the conversation (also: exit, quit)", "/exit".cyan());
    println!();
    println!("Any other input is sent to the model. Ctrl-D leaves the conversation.");
    println!();
}
