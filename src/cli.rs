use crate::api::{PolicyClient, StatusSource};
use crate::config::{Overrides, Settings};
use crate::gate::{ActionGate, GateOutcome};
use crate::model::PolicyListItem;
use crate::policy_list::{self, ModalHandle, ModalPresenter, PolicyList, ResolveMap};
use crate::sort::{SortField, SortState};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "policy-monitor",
    version,
    about = "Monitor and control data-processing policies"
)]
pub struct Cli {
    /// Base URL of the policy service API
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Status refresh period
    #[arg(long, global = true)]
    pub poll_interval: Option<humantime::Duration>,

    /// Config file (defaults to <config dir>/policy-monitor/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true, conflicts_with = "text")]
    pub json: bool,

    /// Print text and exit (no TUI)
    #[arg(long, global = true)]
    pub text: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List policies and their current status
    List {
        #[arg(long, value_enum, default_value_t = SortField::Name)]
        sort: SortField,
        #[arg(long)]
        reverse: bool,
    },
    /// Run a policy unless it is already started
    Run { id: String },
    /// Stop a policy if it is started
    Stop { id: String },
    /// Delete the checkpoint of a policy
    DeleteCheckpoint { name: String },
    /// Show the details of one policy
    Info { id: String },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            base_url: self.base_url.clone(),
            poll_interval: self.poll_interval.map(Into::into),
            log_file: self.log_file.clone(),
        }
    }

    /// Whether this invocation takes over the terminal.
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && self.command.is_none() && !self.json && !self.text
    }
}

pub async fn run(args: Cli, settings: Settings) -> Result<()> {
    if args.is_interactive() {
        #[cfg(feature = "tui")]
        return crate::tui::run(settings).await;
    }
    let command = args.command.clone().unwrap_or(Command::List {
        sort: SortField::Name,
        reverse: false,
    });

    let client = PolicyClient::new(&settings)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let res = run_command(&client, command, args.json, &out_tx).await;
    drop(out_tx);
    let _ = out_handle.await;
    res
}

async fn run_command(
    client: &PolicyClient,
    command: Command,
    json: bool,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    match command {
        Command::List { sort, reverse } => {
            let mut list = PolicyList::new(fetch_policies(client).await?);
            list.set_sort_state(SortState {
                field: sort,
                reverse,
            });
            let sorted = list.sorted();
            if json {
                let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&sorted)?));
            } else {
                for line in crate::listing::build_listing(&sorted, list.last_updated()) {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
        }
        Command::Run { id } => {
            let item = find_policy(client, &id).await?;
            let gate = ActionGate::new(client.clone());
            let outcome = gate
                .run_policy(&item.id, &item.status, &item.name)
                .await
                .with_context(|| format!("run {}", item.name))?;
            report(out_tx, "Run", &item, outcome);
        }
        Command::Stop { id } => {
            let item = find_policy(client, &id).await?;
            let gate = ActionGate::new(client.clone());
            let outcome = gate
                .stop_policy(&item.id, &item.status, &item.name)
                .await
                .with_context(|| format!("stop {}", item.name))?;
            report(out_tx, "Stop", &item, outcome);
        }
        Command::DeleteCheckpoint { name } => {
            ActionGate::new(client.clone())
                .delete_checkpoint(&name)
                .await
                .with_context(|| format!("delete checkpoint of {name}"))?;
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Checkpoint deletion requested for {name}"
            )));
        }
        Command::Info { id } => {
            let item = find_policy(client, &id).await?;
            let mut presenter = PrintPresenter {
                json,
                lines: Vec::new(),
            };
            let handle = policy_list::show_info_modal(&mut presenter, &item);
            for line in presenter.lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
            let _ = handle.result.await;
        }
    }
    Ok(())
}

fn report(
    out_tx: &mpsc::UnboundedSender<OutputLine>,
    action: &str,
    item: &PolicyListItem,
    outcome: GateOutcome,
) {
    let msg = match outcome {
        GateOutcome::Sent => format!("{action} requested for {}", item.name),
        GateOutcome::Skipped => format!(
            "{action} skipped for {} (status: {})",
            item.name, item.status
        ),
    };
    let _ = out_tx.send(OutputLine::Stderr(msg));
}

async fn fetch_policies(client: &PolicyClient) -> Result<Vec<PolicyListItem>> {
    client
        .get_all_policies()
        .await
        .with_context(|| format!("fetch policies from {}", client.base_url()))
}

async fn find_policy(client: &PolicyClient, id: &str) -> Result<PolicyListItem> {
    fetch_policies(client)
        .await?
        .into_iter()
        .find(|p| p.id == id || p.name == id)
        .with_context(|| format!("no policy with id or name {id}"))
}

/// Presents the detail modal as printed lines; closes immediately.
struct PrintPresenter {
    json: bool,
    lines: Vec<String>,
}

impl ModalPresenter for PrintPresenter {
    fn open_modal(&mut self, controller: &str, _template: &str, resolve: ResolveMap) -> ModalHandle {
        let values = policy_list::resolve_values(&resolve);
        if self.json {
            let obj: serde_json::Map<String, serde_json::Value> =
                values.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            self.lines.push(
                serde_json::to_string_pretty(&obj).unwrap_or_else(|e| format!("{controller}: {e}")),
            );
        } else {
            self.lines.extend(crate::listing::build_detail(&values));
        }
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        ModalHandle { result: rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_is_interactive_only_with_tui() {
        let args = Cli::parse_from(["policy-monitor"]);
        assert_eq!(args.is_interactive(), cfg!(feature = "tui"));

        let args = Cli::parse_from(["policy-monitor", "--text"]);
        assert!(!args.is_interactive());
    }

    #[test]
    fn parses_subcommands_with_global_flags() {
        let args = Cli::parse_from([
            "policy-monitor",
            "stop",
            "p-1",
            "--base-url",
            "http://x:1",
            "--poll-interval",
            "2s",
        ]);
        assert!(matches!(args.command, Some(Command::Stop { ref id }) if id == "p-1"));
        let o = args.overrides();
        assert_eq!(o.base_url.as_deref(), Some("http://x:1"));
        assert_eq!(o.poll_interval, Some(std::time::Duration::from_secs(2)));

        let args = Cli::parse_from(["policy-monitor", "list", "--sort", "mode", "--reverse"]);
        assert!(matches!(
            args.command,
            Some(Command::List {
                sort: SortField::LastExecutionMode,
                reverse: true
            })
        ));
    }

    #[test]
    fn json_and_text_conflict() {
        assert!(Cli::try_parse_from(["policy-monitor", "--json", "--text"]).is_err());
    }

    #[tokio::test]
    async fn print_presenter_renders_and_resolves() {
        let item = PolicyListItem {
            id: "p-1".into(),
            name: "ingest".into(),
            description: "kafka".into(),
            status: crate::model::PolicyStatus::Started,
            status_info: None,
            submission_id: Some("driver-1".into()),
            last_execution_mode: None,
            last_error: None,
        };
        let mut presenter = PrintPresenter {
            json: true,
            lines: Vec::new(),
        };
        let handle = policy_list::show_info_modal(&mut presenter, &item);
        handle.result.await.unwrap();

        let v: serde_json::Value = serde_json::from_str(&presenter.lines[0]).unwrap();
        assert_eq!(v["policyName"], "ingest");
        assert_eq!(v["submissionId"], "driver-1");
        assert_eq!(v["deployMode"], serde_json::Value::Null);
    }
}
