use tracing_subscriber::EnvFilter;

/// Fallback when neither `RUST_LOG`, the flag nor the config names a level
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Normalize a user-supplied level, falling back to the default for unknown names
pub fn parse_level(level: Option<&str>) -> &'static str {
    match level.map(|l| l.to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => DEFAULT_LOG_LEVEL,
    }
}

/// Install the global subscriber; logs go to stderr so replies on stdout stay clean.
pub fn init(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
