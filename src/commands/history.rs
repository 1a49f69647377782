use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::Result;
use crate::history::{ChatHistory, OrphanReport};
use chrono::{DateTime, Local};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub async fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let store = super::open_store(config)?;
    let mut history = ChatHistory::new(store);
    history.load().await;

    match command {
        HistoryCommand::List => list_conversations(&history),
        HistoryCommand::Show { id } => show_conversation(&history, &id).await,
        HistoryCommand::Delete { id } => delete_conversation(&mut history, &id).await,
        HistoryCommand::Repair { prune } => repair(&history, prune).await?,
    }

    Ok(())
}

/// Format a millisecond timestamp in local time
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn list_conversations(history: &ChatHistory) {
    if history.is_empty() {
        println!("{}", "No conversation history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Preview".bold(),
        "Last Updated".bold()
    ]);

    for summary in history.summaries() {
        table.add_row(prettytable::row![
            summary.id.cyan(),
            summary.title,
            summary.preview,
            format_timestamp(summary.last_updated)
        ]);
    }

    println!("\nConversation History:");
    table.printstd();
    println!();
    println!("Use {} to continue a conversation.", "pocketchat chat <ID>".cyan());
    println!();
}

async fn show_conversation(history: &ChatHistory, id: &str) {
    match history.get(id) {
        Some(summary) => {
            println!(
                "\n{} {}",
                summary.title.bold(),
                format!("({})", format_timestamp(summary.last_updated)).dimmed()
            );
        }
        None => {
            println!(
                "{}",
                format!("Conversation {} is not in the history index.", id).yellow()
            );
        }
    }

    let messages = history.message_log().load(id).await;
    if messages.is_empty() {
        println!("{}", "No messages stored for this conversation.".yellow());
        return;
    }
    super::print_transcript(&messages);
}

async fn delete_conversation(history: &mut ChatHistory, id: &str) {
    if history.delete(id).await {
        println!("{}", format!("Deleted conversation {}", id).green());
    } else {
        println!("{}", format!("No conversation with id {}", id).yellow());
    }
}

async fn repair(history: &ChatHistory, prune: bool) -> Result<()> {
    let report = history.find_orphans().await?;
    print_report(&report);

    if prune && !report.logs_without_summary.is_empty() {
        let removed = history.prune_orphan_logs(&report).await?;
        println!("{}", format!("Removed {} orphaned message log(s)", removed).green());
    } else if !report.logs_without_summary.is_empty() {
        println!(
            "Run {} to remove message logs without a summary.",
            "pocketchat history repair --prune".cyan()
        );
    }
    Ok(())
}

fn print_report(report: &OrphanReport) {
    if report.is_clean() {
        println!("{}", "History index and message logs are consistent.".green());
        return;
    }

    if !report.summaries_without_log.is_empty() {
        println!("{}", "Summaries without a message log:".yellow());
        for id in &report.summaries_without_log {
            println!("  {}", id.cyan());
        }
    }

    if !report.logs_without_summary.is_empty() {
        println!("{}", "Message logs without a summary:".yellow());
        for id in &report.logs_without_summary {
            println!("  {}", id.cyan());
        }
    }
}
