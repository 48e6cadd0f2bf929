use clap::Parser;
use std::path::PathBuf;

/// Terminal chat client for the Gemini API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The prompt to send to Gemini
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Save an API key and exit
    #[arg(long)]
    pub set_api_key: Option<String>,

    /// Show the effective configuration and exit
    #[arg(long, default_value_t = false)]
    pub show_config: bool,

    /// List saved conversations and exit
    #[arg(long, default_value_t = false)]
    pub list_history: bool,

    /// Continue a saved conversation (list position or id)
    #[arg(long)]
    pub load: Option<String>,

    /// Switch between the light and dark theme and exit
    #[arg(long, default_value_t = false)]
    pub toggle_theme: bool,

    /// Path to the config file
    #[arg(short, long, env = "GEMINI_CHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}
