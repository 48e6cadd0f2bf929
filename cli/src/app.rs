use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Input, Password};
use gemini_chat_core::{ChatSession, QuickAction, SendOutcome, UnsupportedSpeech};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::debug;

use crate::clipboard::Osc52Clipboard;
use crate::output::{
    print_conversation, print_failed_reply, print_history, print_interactive_help, print_reply,
    print_welcome,
};

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message("Gemini is thinking...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn print_error(error: impl std::fmt::Display) {
    eprintln!("{}", error.to_string().yellow());
}

/// Send one message and render the outcome. Every failure is printed.
async fn send_and_render(session: &mut ChatSession, message: &str) {
    let spinner = spinner();
    let result = session.send_message(message).await;
    spinner.finish_and_clear();

    match result {
        Ok(SendOutcome::Reply(reply)) => print_reply(&reply, session.theme()),
        Ok(outcome @ SendOutcome::Failed(_)) => print_failed_reply(&outcome.display_text()),
        Err(e) => print_error(e),
    }
    if let Some(e) = session.take_save_error() {
        print_error(format!("Reply not saved to history: {}", e));
    }
}

/// Pre-fill the input line with `initial` and send whatever the user confirms.
async fn edit_and_send(session: &mut ChatSession, initial: &str) {
    let edited = Input::<String>::new()
        .with_prompt("You".green().bold().to_string())
        .with_initial_text(initial)
        .interact_text();

    match edited {
        Ok(message) => send_and_render(session, &message).await,
        Err(e) => {
            debug!("Input cancelled: {}", e);
            print_error("Input cancelled.");
        }
    }
}

/// Runs a single query, sending one prompt and displaying the reply
pub async fn run_single_query(prompt: String, session: &mut ChatSession) -> Result<()> {
    debug!("Running single query ({} chars)", prompt.chars().count());
    send_and_render(session, &prompt).await;
    Ok(())
}

/// Ask for a key without echoing it and save it to the session.
pub fn prompt_for_credential(session: &mut ChatSession) -> Result<()> {
    let key = Password::new()
        .with_prompt("Gemini API key")
        .interact()
        .context("Failed to read API key")?;

    match session.set_credential(&key) {
        Ok(()) => println!("{}", "API key saved successfully!".green()),
        Err(e) => print_error(e),
    }
    Ok(())
}

/// Resolve a 1-based list position or a conversation id to an id
pub fn resolve_chat_ref(session: &ChatSession, reference: &str) -> Option<String> {
    let history = session.history();
    match reference.parse::<usize>() {
        Ok(position) if position >= 1 => history.get_index(position - 1).map(|c| c.id.clone()),
        _ => history.get(reference).map(|c| c.id.clone()),
    }
}

/// Interactive command parsed from one input line
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Exit,
    Help,
    NewChat,
    History,
    Load(&'a str),
    Delete(&'a str),
    SetKey,
    Theme,
    Copy,
    Voice,
    Quick(QuickAction),
    Unknown(&'a str),
    Message(&'a str),
}

/// Parse one trimmed, non-empty input line
pub fn parse_command(input: &str) -> Command<'_> {
    if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
        return Command::Exit;
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Command::Message(input);
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "help" => Command::Help,
        "new" => Command::NewChat,
        "history" => Command::History,
        "load" => Command::Load(arg),
        "delete" => Command::Delete(arg),
        "key" => Command::SetKey,
        "theme" => Command::Theme,
        "copy" => Command::Copy,
        "voice" => Command::Voice,
        "research" => Command::Quick(QuickAction::Research),
        "image" => Command::Quick(QuickAction::ImageAnalysis),
        "video" => Command::Quick(QuickAction::VideoAnalysis),
        "review" => Command::Quick(QuickAction::CodeReview),
        "writing" => Command::Quick(QuickAction::WritingHelp),
        _ => Command::Unknown(name),
    }
}

/// Runs an interactive chat session
pub async fn run_interactive_chat(session: &mut ChatSession) -> Result<()> {
    print_welcome();
    if let Some(current) = session.current() {
        print_conversation(current, session.theme());
    }

    if !session.has_credential() {
        println!("{}", "Please enter your Gemini API key to continue.".yellow());
        if let Err(e) = prompt_for_credential(session) {
            print_error(e);
        }
    }

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            // EOF
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Command::Exit => {
                println!("Exiting chat session.");
                break;
            }
            Command::Help => print_interactive_help(),
            Command::NewChat => {
                session.start_new_chat();
                println!("{}", "Started a new chat.".green());
            }
            Command::History => print_history(session.history()),
            Command::Load(reference) => match resolve_chat_ref(session, reference) {
                Some(id) => {
                    let theme = session.theme();
                    match session.load_chat(&id) {
                        Ok(conversation) => print_conversation(conversation, theme),
                        Err(e) => print_error(e),
                    }
                }
                None => print_error(format!("No saved chat matches '{}'", reference)),
            },
            Command::Delete(reference) => match resolve_chat_ref(session, reference) {
                Some(id) => match session.delete_chat(&id) {
                    Ok(removed) => println!("Deleted '{}'", removed.title),
                    Err(e) => print_error(e),
                },
                None => print_error(format!("No saved chat matches '{}'", reference)),
            },
            Command::SetKey => {
                if let Err(e) = prompt_for_credential(session) {
                    print_error(e);
                }
            }
            Command::Theme => match session.toggle_theme() {
                Ok(theme) => println!("Theme set to {}", theme.as_str()),
                Err(e) => print_error(e),
            },
            Command::Copy => match session.copy_last_reply(&Osc52Clipboard) {
                Ok(()) => println!("{}", "Message copied to clipboard!".green()),
                Err(e) => print_error(e),
            },
            Command::Voice => match session.dictate(&mut UnsupportedSpeech) {
                Ok(transcript) => edit_and_send(session, &transcript).await,
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
            Command::Quick(action) => edit_and_send(session, action.prompt()).await,
            Command::Unknown(name) => {
                print_error(format!("Unknown command '/{}'. Type /help for commands.", name));
            }
            Command::Message(message) => send_and_render(session, message).await,
        }

        println!(); // Add spacing between interactions
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemini_chat_core::{
        ChatHistory, Conversation, Dispatcher, HttpTransport, InMemoryStore, Message, Settings,
    };
    use std::sync::Arc;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("quit"), Command::Exit);
        assert_eq!(parse_command("EXIT"), Command::Exit);
        assert_eq!(parse_command("hello there"), Command::Message("hello there"));
        assert_eq!(parse_command("/load 3"), Command::Load("3"));
        assert_eq!(parse_command("/delete   abc "), Command::Delete("abc"));
        assert_eq!(parse_command("/research"), Command::Quick(QuickAction::Research));
        assert_eq!(parse_command("/nope"), Command::Unknown("nope"));
    }

    #[tokio::test]
    async fn test_resolve_chat_ref() {
        let store = Arc::new(InMemoryStore::new());
        let settings = Settings::new(store);
        let mut history = ChatHistory::default();
        let mut saved = Conversation::new();
        saved.push(Message::user("saved chat"));
        history.upsert(saved.clone());
        settings.save_history(&history).unwrap();

        let transport = Arc::new(HttpTransport::new(Duration::from_secs(1)).unwrap());
        let session =
            ChatSession::restore(Dispatcher::new(transport), settings, Some("key".to_string()), 50)
                .unwrap();

        assert_eq!(resolve_chat_ref(&session, "1"), Some(saved.id.clone()));
        assert_eq!(resolve_chat_ref(&session, &saved.id), Some(saved.id.clone()));
        assert_eq!(resolve_chat_ref(&session, "2"), None);
        assert_eq!(resolve_chat_ref(&session, "0"), None);
        assert_eq!(resolve_chat_ref(&session, "unknown-id"), None);
    }
}
