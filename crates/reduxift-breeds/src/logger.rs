//! Terminal logging using simplelog

use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Parse a level name, falling back to `Info` for anything unknown.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize terminal logging
///
/// `RUST_LOG` wins over `configured_level`.
pub fn init(configured_level: &str) -> anyhow::Result<LevelFilter> {
    let level = std::env::var("RUST_LOG")
        .map(|v| parse_level(&v))
        .unwrap_or_else(|_| parse_level(configured_level));

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|c| c) // Fallback if local time offset fails
        .build();

    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)?;

    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("chatty"), LevelFilter::Info);
    }
}
