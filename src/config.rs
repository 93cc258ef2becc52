use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "policy-monitor";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".into(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            log_file: None,
        }
    }
}

/// On-disk form; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    #[serde(default, with = "humantime_serde")]
    poll_interval: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    request_timeout: Option<Duration>,
    log_file: Option<PathBuf>,
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub poll_interval: Option<Duration>,
    pub log_file: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_DIR).join("policy-monitor.log"))
}

/// Resolve settings: defaults, then config file, then environment, then CLI.
pub fn load_settings(overrides: &Overrides) -> Result<Settings> {
    let mut settings = Settings::default();

    let explicit = overrides.config_path.is_some();
    if let Some(path) = overrides.config_path.clone().or_else(default_config_path) {
        if explicit || path.exists() {
            apply_file(&mut settings, &path)?;
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;

    if let Some(v) = &overrides.base_url {
        settings.base_url = v.clone();
    }
    if let Some(v) = overrides.poll_interval {
        settings.poll_interval = v;
    }
    if let Some(v) = &overrides.log_file {
        settings.log_file = Some(v.clone());
    }

    if settings.poll_interval.is_zero() {
        anyhow::bail!("poll interval must be greater than zero");
    }
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let file: FileSettings =
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;

    if let Some(v) = file.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file.poll_interval {
        settings.poll_interval = v;
    }
    if let Some(v) = file.request_timeout {
        settings.request_timeout = v;
    }
    if let Some(v) = file.log_file {
        settings.log_file = Some(v);
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = var("POLICY_MONITOR_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = var("POLICY_MONITOR_POLL_INTERVAL") {
        settings.poll_interval = humantime::parse_duration(&v)
            .with_context(|| format!("POLICY_MONITOR_POLL_INTERVAL={v}"))?;
    }
    if let Some(v) = var("POLICY_MONITOR_REQUEST_TIMEOUT") {
        settings.request_timeout = humantime::parse_duration(&v)
            .with_context(|| format!("POLICY_MONITOR_REQUEST_TIMEOUT={v}"))?;
    }
    if let Some(v) = var("POLICY_MONITOR_LOG_FILE") {
        settings.log_file = Some(PathBuf::from(v));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_url = \"https://policies.internal/api\"\npoll_interval = \"2s\"\n",
        )
        .unwrap();

        let mut settings = Settings::default();
        apply_file(&mut settings, &path).unwrap();
        assert_eq!(settings.base_url, "https://policies.internal/api");
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll = \"2s\"\n").unwrap();

        let mut settings = Settings::default();
        assert!(apply_file(&mut settings, &path).is_err());
    }

    #[test]
    fn env_overrides_file_and_parses_durations() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("POLICY_MONITOR_BASE_URL", "http://other:1234"),
            ("POLICY_MONITOR_POLL_INTERVAL", "750ms"),
        ]);
        let mut settings = Settings::default();
        apply_env(&mut settings, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.base_url, "http://other:1234");
        assert_eq!(settings.poll_interval, Duration::from_millis(750));
    }

    #[test]
    fn malformed_env_duration_is_an_error() {
        let mut settings = Settings::default();
        let res = apply_env(&mut settings, |k| {
            (k == "POLICY_MONITOR_REQUEST_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(res.is_err());
    }

    #[test]
    fn cli_overrides_win_and_zero_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://from-file\"\n").unwrap();

        let settings = load_settings(&Overrides {
            config_path: Some(path.clone()),
            base_url: Some("http://from-cli".into()),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(settings.base_url, "http://from-cli");

        let res = load_settings(&Overrides {
            config_path: Some(path),
            poll_interval: Some(Duration::ZERO),
            ..Overrides::default()
        });
        assert!(res.is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = load_settings(&Overrides {
            config_path: Some(dir.path().join("absent.toml")),
            ..Overrides::default()
        });
        assert!(res.is_err());
    }
}
