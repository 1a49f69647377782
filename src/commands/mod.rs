/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `landing`: Start conversations and list quick ideas
- `chat`: Interactive conversation view
- `history`: List, show, delete and repair stored conversations

Handlers open the configured store, build the library components on top of
it and print to the terminal.
*/

use crate::config::Config;
use crate::error::Result;
use crate::history::{Message, Role};
use crate::storage::{KeyValueStore, SledStore};
use colored::Colorize;
use std::sync::Arc;

// Special commands parser for the conversation view
pub mod special_commands;

// History index commands
pub mod history;

/// Open the store configured in `config`
///
/// # Errors
///
/// Returns error if the database cannot be opened
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let store = match &config.storage.path {
        Some(path) => SledStore::open(path)?,
        None => SledStore::open_default()?,
    };
    tracing::debug!("Using store at {}", store.path().display());
    Ok(Arc::new(store))
}

/// Print `messages` as a labelled transcript
pub fn print_transcript(messages: &[Message]) {
    println!();
    for message in messages {
        print_role_label(message.role);
        println!("{}\n", message.content);
    }
}

fn print_role_label(role: Role) {
    match role {
        Role::User => println!("{}", "You".bold().green()),
        Role::Assistant => println!("{}", "Assistant".bold().cyan()),
    }
}

// Landing command handlers
pub mod landing {
    //! Start new conversations from a prompt or a quick idea.

    use super::*;
    use crate::chat::{quick_idea, start_new_chat, QUICK_IDEAS};
    use crate::error::PocketchatError;
    use crate::history::ChatHistory;
    use prettytable::{format, Table};
    use rustyline::DefaultEditor;

    /// Start a new conversation and open it
    ///
    /// The first message is `prompt`, the prompt of quick idea `idea`
    /// (1-based), or a line read from the terminal. With `detach` the
    /// conversation is created and its id printed without opening it.
    ///
    /// # Errors
    ///
    /// Returns `PocketchatError::EmptyMessage` if the first message is blank
    pub async fn run_new(
        config: Config,
        prompt: Option<String>,
        idea: Option<usize>,
        provider_name: Option<String>,
        detach: bool,
    ) -> Result<()> {
        let message = match (prompt, idea) {
            (Some(prompt), _) => prompt,
            (None, Some(number)) => quick_idea(number)
                .map(|idea| idea.prompt.to_string())
                .ok_or_else(|| {
                    PocketchatError::Config(format!(
                        "There is no quick idea {}; run `pocketchat ideas` to list them",
                        number
                    ))
                })?,
            (None, None) => {
                let mut rl = DefaultEditor::new()?;
                rl.readline("What's on your mind? ")?
            }
        };

        let store = open_store(&config)?;
        let mut history = ChatHistory::new(store);
        history.load().await;

        let summary = start_new_chat(&mut history, &message)
            .await
            .ok_or(PocketchatError::EmptyMessage)?;

        if detach {
            println!("{}", summary.id);
            return Ok(());
        }

        println!(
            "{} {}",
            "Started conversation".green(),
            summary.id.cyan()
        );
        super::chat::run_chat(config, summary.id, provider_name).await
    }

    /// Print the quick-start ideas
    pub fn list_ideas() {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(prettytable::row!["#".bold(), "Idea".bold(), "Prompt".bold()]);

        for (i, idea) in QUICK_IDEAS.iter().enumerate() {
            let number = (i + 1).to_string();
            table.add_row(prettytable::row![number.cyan(), idea.title, idea.prompt]);
        }

        println!("\nQuick ideas:");
        table.printstd();
        println!();
        println!("Use {} to start one.", "pocketchat new --idea <#>".cyan());
        println!();
    }
}

// Chat command handler
pub mod chat {
    //! Interactive conversation view.
    //!
    //! Opens one conversation, answers a pending first message, then runs a
    //! readline loop that sends each line and streams the reply.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::chat::{ConversationSession, SessionState};
    use crate::history::ChatHistory;
    use crate::providers::create_provider;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::io::Write;

    /// Open conversation `conversation_id` interactively
    ///
    /// A failed reply prints the error text and leaves the view.
    ///
    /// # Errors
    ///
    /// Returns error if the store or provider cannot be initialized
    pub async fn run_chat(
        config: Config,
        conversation_id: String,
        provider_name: Option<String>,
    ) -> Result<()> {
        tracing::info!(conversation_id = %conversation_id, "Opening conversation view");

        let store = open_store(&config)?;
        let mut history = ChatHistory::new(Arc::clone(&store));
        history.load().await;

        if !history.contains(&conversation_id) {
            tracing::warn!(conversation_id = %conversation_id, "Conversation is not in the history index");
        }

        let provider = create_provider(&config.provider, provider_name.as_deref())?;
        let mut session = ConversationSession::open(conversation_id, store, provider).await;
        session.on_state_change(|state| {
            if state == SessionState::AwaitingFirstResponse {
                println!("{}", "Waiting for the first response...".dimmed());
            }
        });

        print_banner(&session, history.get(session.conversation_id()).map(|s| s.title.as_str()));
        print_transcript(session.messages());

        let result = session.bootstrap(&mut history, reply_printer()).await;
        if !finish_reply(&session, result.map(|reply| reply.is_some())) {
            return Ok(());
        }

        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline(&format!("{} ", "you>".green().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::ShowStatus) => {
                            print_status(&session);
                            continue;
                        }
                        Ok(SpecialCommand::Transcript) => {
                            print_transcript(session.messages());
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)?;
                    println!();
                    let result = session.send(&mut history, trimmed, reply_printer()).await;
                    if !finish_reply(&session, result.map(|_| true)) {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Prints the assistant label before the first delta, then each delta
    fn reply_printer() -> impl FnMut(&str) + Send {
        let mut started = false;
        move |delta: &str| {
            if !started {
                print_role_label(Role::Assistant);
                started = true;
            }
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        }
    }

    /// Close the streamed reply; on failure show the error and report that
    /// the view should close
    fn finish_reply(session: &ConversationSession, result: Result<bool>) -> bool {
        match result {
            Ok(printed) => {
                if printed {
                    println!("\n");
                }
                true
            }
            Err(e) => {
                println!();
                let text = session
                    .error()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string());
                eprintln!("{}", text.red());
                false
            }
        }
    }

    fn print_banner(session: &ConversationSession, title: Option<&str>) {
        println!("\n{}", title.unwrap_or("Conversation").bold());
        println!(
            "{} {}  {} {}",
            "id:".dimmed(),
            session.conversation_id().cyan(),
            "provider:".dimmed(),
            session.client().provider_name()
        );
        println!("Type '/help' for available commands, 'exit' to quit");
    }

    fn print_status(session: &ConversationSession) {
        println!();
        println!("Conversation: {}", session.conversation_id().cyan());
        println!("Provider:     {}", session.client().provider_name());
        println!("State:        {}", session.state());
        println!("Messages:     {}", session.messages().len());
        if let Some(error) = session.error() {
            println!("Last error:   {}", error.red());
        }
        println!();
    }
}
