use chrono::Utc;
use colored::*;
use gemini_chat_core::conversation::relative_date;
use gemini_chat_core::{ChatConfig, ChatHistory, Conversation, Message, Sender, Theme};
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};
use std::path::Path;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntaxTheme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

/// Prompts suggested on the welcome screen
pub const EXAMPLE_PROMPTS: [&str; 4] = [
    "Explain quantum computing in simple terms",
    "Write a creative story about space exploration",
    "Help me plan a healthy meal for the week",
    "Explain the latest trends in AI technology",
];

fn sender_label(sender: Sender) -> ColoredString {
    match sender {
        Sender::User => "You".green().bold(),
        Sender::Assistant => "Gemini".blue().bold(),
    }
}

/// Print an assistant reply, rendering markdown
pub fn print_reply(reply: &str, theme: Theme) {
    println!("{}: {}", sender_label(Sender::Assistant), render_markdown(reply, theme));
}

/// Print a failure that replaced the assistant reply
pub fn print_failed_reply(message: &str) {
    println!("{}: {}", sender_label(Sender::Assistant), message.red());
}

fn print_message(message: &Message, theme: Theme) {
    match message.sender {
        Sender::User => println!("{}: {}", sender_label(Sender::User), message.content),
        Sender::Assistant => print_reply(&message.content, theme),
    }
}

/// Replay a saved conversation
pub fn print_conversation(conversation: &Conversation, theme: Theme) {
    println!("{}", format!("── {} ──", conversation.title).cyan().bold());
    for message in conversation.messages() {
        print_message(message, theme);
        println!();
    }
}

/// List saved conversations, newest first, numbered from 1
pub fn print_history(history: &ChatHistory) {
    if history.is_empty() {
        println!("{}", "No chat history yet".dimmed());
        return;
    }

    let now = Utc::now();
    for (i, conversation) in history.iter().enumerate() {
        println!(
            "{:>3}. {}  {}",
            i + 1,
            conversation.title.bold(),
            relative_date(conversation.updated_at, now).bright_black()
        );
    }
}

/// Greeting shown when interactive mode starts
pub fn print_welcome() {
    println!("{}", "Hello! How can I help you today?".cyan().bold());
    println!("{}", "Try one of these:".dimmed());
    for prompt in EXAMPLE_PROMPTS {
        println!("  {} {}", "•".yellow(), prompt);
    }
    println!("Type {} for commands, {} to leave.", "/help".green(), "exit".green());
    println!();
}

/// Slash commands available in interactive mode
pub fn print_interactive_help() {
    println!("{}", "Commands:".yellow().bold());
    let commands = [
        ("/new", "Start a new chat"),
        ("/history", "List saved chats"),
        ("/load <n|id>", "Open a saved chat"),
        ("/delete <n|id>", "Delete a saved chat"),
        ("/key", "Set the API key"),
        ("/theme", "Toggle light/dark theme"),
        ("/copy", "Copy the last reply to the clipboard"),
        ("/voice", "Dictate a message to edit and send"),
        ("/research /image /video /review /writing", "Edit and send a canned prompt"),
        ("exit, quit", "End the session"),
    ];
    for (command, description) in commands {
        println!("  {:<42} {}", command.green(), description);
    }
    println!();
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "gemini-chat \"your prompt\"".green().bold());
    println!("    Send a single message to Gemini");
    println!();
    println!("  {}", "gemini-chat -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --set-api-key <KEY>   Save your Gemini API key");
    println!("  --list-history        List saved chats");
    println!("  --load <N|ID>         Continue a saved chat");
    println!("  --show-config         Show the effective configuration");
    println!("  --help                Show this help message");
    println!();
}

/// Print the effective configuration with the credential redacted
pub fn print_config(config: &ChatConfig, config_path: &Path, credential_preview: Option<String>, theme: Theme) {
    println!("{} ({})", "Current Configuration".cyan().bold(), config_path.display());
    let key_display = credential_preview
        .map(|k| k.bright_black().to_string())
        .unwrap_or_else(|| "Not Set".yellow().to_string());
    println!("  {}: {}", "API Key".blue(), key_display);
    println!("  {}:", "Endpoints".blue());
    for (i, endpoint) in config.endpoints().iter().enumerate() {
        println!("    {}. {}", i + 1, endpoint.bright_black());
    }
    let generation = config.generation_config();
    println!(
        "  {}: temperature {}, topK {}, topP {}, maxOutputTokens {}",
        "Generation".blue(),
        generation.temperature,
        generation.top_k,
        generation.top_p,
        generation.max_output_tokens
    );
    println!("  {}: {}s", "Timeout".blue(), config.timeout().as_secs());
    println!("  {}: {}", "History Limit".blue(), config.history_limit());
    println!("  {}: {}", "Max Message Length".blue(), config.max_message_length());
    println!("  {}: {}", "Theme".blue(), theme.as_str());
}

fn syntax_theme(theme_set: &ThemeSet, theme: Theme) -> Option<&SyntaxTheme> {
    let preferred = match theme {
        Theme::Light => "InspiredGitHub",
        Theme::Dark => "base16-ocean.dark",
    };
    theme_set
        .themes
        .get(preferred)
        .or_else(|| theme_set.themes.values().next())
}

/// Render markdown in the terminal with syntax highlighting
pub fn render_markdown(markdown: &str, theme: Theme) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = MdParser::new_ext(markdown, options);

    // Initialize syntax highlighting
    let syntax_set = SyntaxSet::load_defaults_newlines();
    let theme_set = ThemeSet::load_defaults();
    let highlight_theme = syntax_theme(&theme_set, theme);

    let mut in_code_block = false;
    let mut code_block_lang = String::new();
    let mut code_block_content = String::new();
    let mut output = String::new();

    // Table state tracking
    let mut in_table_cell = false;
    let mut current_row: Vec<String> = Vec::new();
    let mut table_rows: Vec<Vec<String>> = Vec::new();

    for event in parser {
        match event {
            MdEvent::Start(Tag::Table(_)) => {
                table_rows.clear();
                output.push('\n');
            }
            MdEvent::End(Tag::Table(_)) => {
                output.push_str(&render_table(&table_rows));
            }
            MdEvent::Start(Tag::TableHead) | MdEvent::Start(Tag::TableRow) => {
                current_row.clear();
            }
            MdEvent::End(Tag::TableHead) | MdEvent::End(Tag::TableRow) => {
                if !current_row.is_empty() {
                    table_rows.push(current_row.clone());
                }
            }
            MdEvent::Start(Tag::TableCell) => {
                in_table_cell = true;
                current_row.push(String::new());
            }
            MdEvent::End(Tag::TableCell) => {
                in_table_cell = false;
            }
            MdEvent::Start(Tag::Heading(level, ..)) => match level {
                HeadingLevel::H1 => output.push_str(&format!("\n{} ", "#".bright_cyan().bold())),
                HeadingLevel::H2 => output.push_str(&format!("\n{} ", "##".bright_cyan().bold())),
                _ => output.push('\n'),
            },
            MdEvent::End(Tag::Heading(..)) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push_str("\n\n");
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::CodeBlock(info)) => {
                in_code_block = true;
                code_block_lang = match info {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block_content.clear();
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                let syntax = syntax_set
                    .find_syntax_by_token(&code_block_lang)
                    .unwrap_or_else(|| syntax_set.find_syntax_plain_text());

                output.push_str(&format!("{}:\n", code_block_lang.cyan()));
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');

                match highlight_theme {
                    Some(highlight_theme) => {
                        let mut highlighter = HighlightLines::new(syntax, highlight_theme);
                        for line in LinesWithEndings::from(&code_block_content) {
                            let highlighted = highlighter
                                .highlight_line(line, &syntax_set)
                                .unwrap_or_default();
                            output.push_str(&as_24_bit_terminal_escaped(&highlighted, false));
                        }
                        output.push_str("\x1b[0m");
                    }
                    None => output.push_str(&code_block_content),
                }

                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push_str("\n\n");

                in_code_block = false;
            }
            MdEvent::Start(Tag::List(_)) | MdEvent::End(Tag::List(_)) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::Item) => {
                output.push_str(&format!("{}  ", "•".yellow()));
            }
            MdEvent::End(Tag::Item) => {
                output.push('\n');
            }
            MdEvent::Code(ref code) => {
                if in_table_cell {
                    if let Some(cell) = current_row.last_mut() {
                        cell.push_str(&format!("`{}`", code));
                    }
                } else {
                    output.push_str(&format!("{}", code.on_bright_black().white()));
                }
            }
            MdEvent::Text(ref text) => {
                if in_code_block {
                    code_block_content.push_str(text);
                } else if in_table_cell {
                    if let Some(cell) = current_row.last_mut() {
                        cell.push_str(text);
                    }
                } else {
                    output.push_str(text);
                }
            }
            MdEvent::SoftBreak | MdEvent::HardBreak => {
                if !in_table_cell {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    output.trim_end().to_string()
}

fn render_table(rows: &[Vec<String>]) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        return output;
    }

    let col_count = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let mut col_widths = vec![0; col_count];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    for (i, row) in rows.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            let padding = col_widths[j].saturating_sub(cell.chars().count());
            if i == 0 {
                output.push_str(&format!("{}{} ", cell.bold(), " ".repeat(padding)));
            } else {
                output.push_str(&format!("{}{} ", cell, " ".repeat(padding)));
            }
        }
        output.push('\n');

        // Separator under the header row
        if i == 0 {
            let separator: Vec<String> = col_widths.iter().map(|w| "─".repeat(*w)).collect();
            output.push_str(&separator.join(" ").dimmed().to_string());
            output.push('\n');
        }
    }
    output.push('\n');
    output
}
