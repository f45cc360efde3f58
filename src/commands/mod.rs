/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`: Interactive chat loop
- `ask`: Submit one question and stream the reply to stdout
- `context`: Pick, set or show the tracked context files
- `history`: Print the stored conversation

Every handler works on the session file named by the configuration.
*/

use crate::chat::{ChatClient, ChatObserver, RequestHandle, StreamState};
use crate::config::Config;
use crate::error::Result;
use crate::providers::create_provider;
use crate::session::YamlSessionStore;
use std::sync::Arc;

pub mod history;
pub mod render;
pub mod special_commands;

/// Build a chat client over the configured session file and provider
///
/// # Errors
///
/// Fails if the provider cannot be created or the session cannot be
/// loaded; both are fatal at startup.
pub fn open_client(config: &Config, observer: Arc<dyn ChatObserver>) -> Result<ChatClient> {
    let session_path = config.session.resolved_path();
    tracing::info!("Using session file {}", session_path.display());
    let storage = Arc::new(YamlSessionStore::new(session_path));
    let provider = create_provider(&config.provider)?;
    ChatClient::open(storage, provider, observer)
}

/// Wait for a reply to finish, cancelling it on Ctrl-C
pub async fn await_reply(client: &ChatClient, handle: RequestHandle) -> StreamState {
    let finished = handle.finished();
    tokio::pin!(finished);
    loop {
        tokio::select! {
            state = &mut finished => return state,
            Ok(()) = tokio::signal::ctrl_c() => {
                client.cancel();
            }
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat loop.
    //!
    //! Reads questions with rustyline, streams replies to the terminal and
    //! handles the `/` special commands. Input is not read while a reply
    //! is streaming.

    use super::*;
    use crate::chat::Submission;
    use crate::commands::render::{format_history, format_working_files, TerminalObserver};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::context::{FilePicker, PickerOutcome};
    use crate::session::WorkingSession;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start the interactive chat
    ///
    /// The persisted draft is offered as the initial input. The session is
    /// saved once more on exit.
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let client = open_client(&config, Arc::new(TerminalObserver::new()))?;
        let picker = FilePicker::new(config.picker.command.clone());
        let mut rl = DefaultEditor::new()?;

        let session = client.snapshot().await;
        print_welcome_banner(&config, &session);
        if !session.messages.is_empty() {
            println!("{}\n", format_history(&session.messages, false));
        }
        let mut draft = session.input_text;

        loop {
            let prompt = format!("{} ", "cir>".green().bold());
            let read = if draft.is_empty() {
                rl.readline(&prompt)
            } else {
                rl.readline_with_initial(&prompt, (draft.as_str(), ""))
            };
            draft.clear();

            match read {
                Ok(line) => {
                    // The offered draft is consumed by this line
                    client.set_input_text(String::new()).await;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => {}
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Files) => {
                            let session = client.snapshot().await;
                            println!("{}\n", format_working_files(&session.working_files));
                            continue;
                        }
                        Ok(SpecialCommand::History) => {
                            let session = client.snapshot().await;
                            println!("{}\n", format_history(&session.messages, false));
                            continue;
                        }
                        Ok(SpecialCommand::Context) => {
                            pick_context(&client, &picker).await;
                            continue;
                        }
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    match client.submit_question(trimmed).await {
                        Ok(Submission::Started(handle)) => {
                            println!();
                            let state = await_reply(&client, handle).await;
                            tracing::debug!("Reply ended in state {:?}", state);
                        }
                        Ok(Submission::Busy) => {
                            println!("{}", "A reply is still streaming.".yellow());
                        }
                        Ok(Submission::Ignored) => {}
                        Err(e) => {
                            // The client kept the question as the draft
                            eprintln!("{}\n", format!("Error: {:#}", e).red());
                            draft = client.snapshot().await.input_text;
                        }
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

        client.save().await?;
        println!("Goodbye!");
        Ok(())
    }

    async fn pick_context(client: &ChatClient, picker: &FilePicker) {
        match client.pick_context(picker).await {
            Ok(PickerOutcome::Selected(paths)) => {
                println!(
                    "{}\n",
                    format!("Tracking {} context files", paths.len()).green()
                );
            }
            Ok(PickerOutcome::Cancelled) => {
                println!("{}\n", "Picker cancelled, context unchanged.".yellow());
            }
            Err(e) => {
                eprintln!("{}\n", format!("Error: {:#}", e).red());
            }
        }
    }

    /// Display welcome banner at the start of the interactive chat
    fn print_welcome_banner(config: &Config, session: &WorkingSession) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Cir Interactive Chat                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Model:    {}", config.provider.openai.model.cyan());
        println!(
            "Session:  {}",
            config.session.resolved_path().display().to_string().cyan()
        );
        println!(
            "Context:  {} files, {} messages so far",
            session.working_files.len(),
            session.messages.len()
        );
        println!("Type '/help' for available commands, '/exit' to quit\n");
    }
}

// One-shot question handler
pub mod ask {
    use super::*;
    use crate::chat::Submission;
    use crate::commands::render::TerminalObserver;

    /// Submit a single question and stream the reply to stdout
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be loaded or saved, or if the
    /// reply did not complete.
    pub async fn run_ask(config: Config, question: Vec<String>) -> Result<()> {
        let question = question.join(" ");
        let client = open_client(&config, Arc::new(TerminalObserver::new()))?;

        match client.submit_question(&question).await? {
            Submission::Started(handle) => match await_reply(&client, handle).await {
                StreamState::Completed => Ok(()),
                state => anyhow::bail!("Reply did not complete ({:?})", state),
            },
            Submission::Ignored => anyhow::bail!("Question is empty"),
            Submission::Busy => anyhow::bail!("A reply is already streaming"),
        }
    }
}

// Context file handler
pub mod context {
    use super::*;
    use crate::chat::NullObserver;
    use crate::cli::ContextCommand;
    use crate::commands::render::format_working_files;
    use crate::context::{FilePicker, PickerOutcome};
    use colored::Colorize;

    /// Handle `cir context` subcommands
    pub async fn handle_context(config: &Config, command: ContextCommand) -> Result<()> {
        let client = open_client(config, Arc::new(NullObserver))?;

        match command {
            ContextCommand::Pick => {
                let picker = FilePicker::new(config.picker.command.clone());
                match client.pick_context(&picker).await? {
                    PickerOutcome::Selected(paths) => {
                        println!("{}", format!("Tracking {} context files", paths.len()).green());
                    }
                    PickerOutcome::Cancelled => {
                        println!("{}", "Picker cancelled, context unchanged.".yellow());
                    }
                }
            }
            ContextCommand::Set { paths } => {
                client.set_working_files(paths).await?;
            }
            ContextCommand::Show => {}
        }

        let session = client.snapshot().await;
        println!("{}", format_working_files(&session.working_files));
        Ok(())
    }
}
