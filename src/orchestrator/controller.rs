//! Policy list lifecycle controller.
//!
//! Owns the initial load, the status poller and dispatch of user actions, and emits
//! events for presentation layers. The list itself lives with the presentation layer.
//! Polling starts with the controller and does not depend on the list load.

use crate::api::{ActionSink, StatusSource};
use crate::error::RemoteError;
use crate::gate::{ActionGate, GateOutcome};
use crate::model::{InfoEvent, PolicyListItem, PolicyStatus, StatusSnapshot};
use crate::poller::{PollEvent, PollerHandle, PollerState, StatusPoller};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Run {
        id: String,
        name: String,
        status: PolicyStatus,
    },
    Stop {
        id: String,
        name: String,
        status: PolicyStatus,
    },
    DeleteCheckpoint {
        name: String,
    },
    /// Refetch the list and restart polling; the only way out of a suspended poller.
    Reload,
    Quit,
}

/// Events delivered to UI layers.
#[derive(Debug)]
pub(crate) enum UiEvent {
    Loaded(Vec<PolicyListItem>),
    Snapshot(Vec<StatusSnapshot>),
    Poller(PollerState),
    Info(InfoEvent),
}

type LoadResult = (u64, Result<Vec<PolicyListItem>, RemoteError>);

/// Start a fresh cadence; polling does not wait for the list load.
fn start_poller<C>(
    client: &Arc<C>,
    period: Duration,
    event_tx: &UnboundedSender<UiEvent>,
    poll_tx: &UnboundedSender<PollEvent>,
) -> PollerHandle
where
    C: StatusSource + ActionSink + 'static,
{
    let handle = StatusPoller::new(client.clone(), period).spawn(poll_tx.clone());
    let _ = event_tx.send(UiEvent::Poller(handle.state()));
    handle
}

/// Fetch the full list in the background; the result comes back tagged with `generation`.
fn spawn_load<C>(client: &Arc<C>, generation: u64, load_tx: &UnboundedSender<LoadResult>) -> JoinHandle<()>
where
    C: StatusSource + ActionSink + 'static,
{
    let client = client.clone();
    let load_tx = load_tx.clone();
    tokio::spawn(async move {
        let res = client.get_all_policies().await;
        let _ = load_tx.send((generation, res));
    })
}

fn report_load(res: Result<Vec<PolicyListItem>, RemoteError>, event_tx: &UnboundedSender<UiEvent>) {
    match res {
        Ok(policies) => {
            tracing::info!(count = policies.len(), "policy list loaded");
            let count = policies.len();
            let _ = event_tx.send(UiEvent::Loaded(policies));
            let _ = event_tx.send(UiEvent::Info(InfoEvent::Loaded { count }));
        }
        Err(e) => {
            tracing::warn!(error = %e, "policy list load failed");
            let _ = event_tx.send(UiEvent::Info(InfoEvent::Message(format!(
                "Load failed: {e} (press R to retry)"
            ))));
        }
    }
}

fn spawn_action<C>(gate: Arc<ActionGate<Arc<C>>>, cmd: UiCommand, event_tx: UnboundedSender<UiEvent>)
where
    C: StatusSource + ActionSink + 'static,
{
    tokio::spawn(async move {
        let (action, name, res) = match cmd {
            UiCommand::Run { id, name, status } => {
                let res = gate.run_policy(&id, &status, &name).await;
                ("Run", name, res.map(|o| (o, status)))
            }
            UiCommand::Stop { id, name, status } => {
                let res = gate.stop_policy(&id, &status, &name).await;
                ("Stop", name, res.map(|o| (o, status)))
            }
            UiCommand::DeleteCheckpoint { name } => {
                let res = gate.delete_checkpoint(&name).await;
                ("Checkpoint deletion", name, res.map(|o| (o, PolicyStatus::default())))
            }
            UiCommand::Reload | UiCommand::Quit => return,
        };
        let info = match res {
            Ok((GateOutcome::Sent, _)) => InfoEvent::ActionSent { action, name },
            Ok((GateOutcome::Skipped, status)) => InfoEvent::ActionSkipped {
                action,
                name,
                status,
            },
            Err(e) => {
                tracing::warn!(action, policy = %name, error = %e, "action rejected");
                InfoEvent::ActionFailed {
                    action,
                    name,
                    error: e.to_string(),
                }
            }
        };
        let _ = event_tx.send(UiEvent::Info(info));
    });
}

/// Drive the list lifecycle until the UI quits or drops its command sender.
pub(crate) async fn run_controller<C>(
    client: Arc<C>,
    period: Duration,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) where
    C: StatusSource + ActionSink + 'static,
{
    let gate = Arc::new(ActionGate::new(client.clone()));
    let (poll_tx, mut poll_rx) = mpsc::unbounded_channel::<PollEvent>();
    let (load_tx, mut load_rx) = mpsc::unbounded_channel::<LoadResult>();

    let mut generation = 0u64;
    let mut poller = start_poller(&client, period, &event_tx, &poll_tx);
    let mut loading = spawn_load(&client, generation, &load_tx);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Reload) => {
                        loading.abort();
                        // Old poller is gone before the drain, so no stale snapshot slips in later.
                        poller.shutdown().await;
                        while poll_rx.try_recv().is_ok() {}
                        let _ = event_tx.send(UiEvent::Info(InfoEvent::Message("Reloading…".into())));
                        generation += 1;
                        poller = start_poller(&client, period, &event_tx, &poll_tx);
                        loading = spawn_load(&client, generation, &load_tx);
                    }
                    Some(UiCommand::Quit) | None => break,
                    Some(action) => spawn_action(gate.clone(), action, event_tx.clone()),
                }
            }
            Some((tag, res)) = load_rx.recv() => {
                if tag == generation {
                    report_load(res, &event_tx);
                }
            }
            Some(ev) = poll_rx.recv() => {
                match ev {
                    PollEvent::Snapshot(snapshot) => {
                        tracing::debug!(entries = snapshot.len(), "status snapshot received");
                        let _ = event_tx.send(UiEvent::Snapshot(snapshot));
                    }
                    PollEvent::Suspended(e) => {
                        tracing::warn!(error = %e, i18n_code = e.i18n_code(), "status polling suspended");
                        let _ = event_tx.send(UiEvent::Poller(PollerState::Suspended));
                        let _ = event_tx.send(UiEvent::Info(InfoEvent::PollingSuspended {
                            error: e.i18n_code().map(str::to_string).unwrap_or_else(|| e.to_string()),
                        }));
                    }
                }
            }
        }
    }

    loading.abort();
}
