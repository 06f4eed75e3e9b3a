//! CLI argument parsing and command dispatch.

pub mod args;
mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run the agent binary.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let level = cli.log_level.as_deref();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = commands::load_config(&cli.config)?;
            init_tracing(level, config.log_file())?;
            commands::run(&cli.config, &config).await
        }
        Commands::Validate => {
            init_tracing(level, None)?;
            commands::validate(&cli.config)
        }
        Commands::Render => {
            init_tracing(level, None)?;
            commands::render(&cli.config).await
        }
        Commands::Stats => {
            init_tracing(level, None)?;
            commands::stats().await
        }
    }
}

/// `--log-level` wins over `RUST_LOG`; with neither set, log at info.
///
/// When `log_file` is given every line is also appended there. A log file
/// that cannot be opened is reported and skipped.
fn init_tracing(level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let (file, open_error) = match log_file.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(writer))) => (Some(writer), None),
        Some((path, Err(e))) => (None, Some((path, e))),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file.map(file_layer))
        .try_init()?;

    if let Some((path, e)) = open_error {
        tracing::warn!(path = %path.display(), error = %e, "cannot open log file, logging to stdout only");
    }
    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<Mutex<File>> {
    OpenOptions::new().create(true).append(true).open(path).map(Mutex::new)
}

/// Plain-text layer writing timestamped lines to `writer`.
fn file_layer<S>(writer: Mutex<File>) -> fmt::Layer<S, DefaultFields, Format, Mutex<File>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines_reach_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aero-agent.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let writer = open_log_file(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(file_layer(writer));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(node = 1717, "heartbeat failed");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("earlier run\n"), "log was truncated: {written}");
        let line = written.lines().nth(1).unwrap();
        assert!(line.contains("WARN"), "got {line}");
        assert!(line.contains("heartbeat failed"), "got {line}");
        assert!(line.contains("node=1717"), "got {line}");
        assert!(!line.contains('\u{1b}'), "ansi escapes in file: {line}");
    }

    #[test]
    fn test_unopenable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("aero-agent.log");
        assert!(open_log_file(&path).is_err());
    }
}
