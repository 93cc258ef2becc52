use crate::config::{self, Settings};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines end up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    File(PathBuf),
    Stderr,
    /// Interactive run without a writable location.
    Off,
}

/// The TUI owns the terminal, so interactive runs log to a file (the configured one or
/// `fallback`); one-shot commands log to stderr unless a file is configured.
fn log_target(configured: Option<PathBuf>, interactive: bool, fallback: Option<PathBuf>) -> LogTarget {
    match (configured, interactive) {
        (Some(p), _) => LogTarget::File(p),
        (None, true) => fallback.map(LogTarget::File).unwrap_or(LogTarget::Off),
        (None, false) => LogTarget::Stderr,
    }
}

/// Install the global subscriber.
pub fn init(settings: &Settings, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fallback = if interactive {
        config::default_log_path()
    } else {
        None
    };
    match log_target(settings.log_file.clone(), interactive, fallback) {
        LogTarget::File(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create log dir {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Off => {
            // Stay silent rather than draw over the screen.
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_file_wins_in_every_mode() {
        let file = PathBuf::from("/tmp/pm.log");
        let fallback = Some(PathBuf::from("/data/policy-monitor.log"));
        assert_eq!(
            log_target(Some(file.clone()), true, fallback.clone()),
            LogTarget::File(file.clone())
        );
        assert_eq!(
            log_target(Some(file.clone()), false, fallback),
            LogTarget::File(file)
        );
    }

    #[test]
    fn interactive_runs_never_log_to_the_terminal() {
        let fallback = PathBuf::from("/data/policy-monitor.log");
        assert_eq!(
            log_target(None, true, Some(fallback.clone())),
            LogTarget::File(fallback)
        );
        assert_eq!(log_target(None, true, None), LogTarget::Off);
    }

    #[test]
    fn one_shot_runs_log_to_stderr() {
        assert_eq!(log_target(None, false, None), LogTarget::Stderr);
    }
}
