use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use gemini_chat_core::config::{get_default_config_file, APP_NAME};
use gemini_chat_core::{ChatConfig, ChatSession, Dispatcher, FileStore, HttpTransport, Settings};
use std::sync::Arc;
use tracing::{debug, info};

mod app;
mod cli;
mod clipboard;
mod logging;
mod output;

use crate::app::resolve_chat_ref;
use crate::cli::Args;
use crate::output::{print_config, print_history, print_usage_instructions};

/// Wire the config, store and dispatcher into a session
fn build_session(config: &ChatConfig) -> Result<ChatSession> {
    let data_dir = config.data_dir().context("Failed to resolve data directory")?;
    let store = FileStore::open_in_dir(&data_dir)
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;
    debug!("Using store at {}", store.path().display());

    let transport = HttpTransport::new(config.timeout()).context("Failed to build HTTP client")?;
    let dispatcher = Dispatcher::new(Arc::new(transport))
        .with_endpoints(config.endpoints())
        .with_generation_config(config.generation_config())
        .with_safety_settings(config.safety_settings.clone());

    let session = ChatSession::restore(
        dispatcher,
        Settings::new(Arc::new(store)),
        config.api_key.clone(),
        config.history_limit(),
    )
    .context("Failed to restore chat session")?
    .with_max_message_length(config.max_message_length());

    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME)?,
    };
    let config = ChatConfig::load_from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env();

    logging::init(args.log_level.as_deref().or(config.log_level.as_deref()));
    info!("Loaded configuration from {}", config_path.display());

    let mut session = build_session(&config)?;

    if let Some(key) = &args.set_api_key {
        session.set_credential(key)?;
        println!("{}", "API key saved successfully!".green());
        return Ok(());
    }

    if args.toggle_theme {
        let theme = session.toggle_theme()?;
        println!("Theme set to {}", theme.as_str());
        return Ok(());
    }

    if args.show_config {
        print_config(&config, &config_path, session.credential_preview(), session.theme());
        return Ok(());
    }

    if args.list_history {
        print_history(session.history());
        return Ok(());
    }

    if let Some(reference) = &args.load {
        match resolve_chat_ref(&session, reference) {
            Some(id) => {
                session.load_chat(&id)?;
            }
            None => {
                eprintln!("{}", format!("No saved chat matches '{}'", reference).red());
                return Ok(());
            }
        }
    }

    if args.interactive {
        app::run_interactive_chat(&mut session).await?;
    } else if let Some(prompt) = args.prompt {
        if !session.has_credential() {
            eprintln!(
                "{}",
                "Please enter your Gemini API key to continue (use --set-api-key or GEMINI_API_KEY)."
                    .red()
            );
            return Ok(());
        }
        app::run_single_query(prompt, &mut session).await?;
    } else {
        print_usage_instructions();
    }

    Ok(())
}
