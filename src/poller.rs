//! Fixed-cadence status polling.
//!
//! A poller starts `Idle`, becomes `Polling` once spawned and ends `Suspended` after the
//! first failed fetch. There is no retry: a suspended poller never polls again, the
//! owner has to build a new one.

use crate::api::StatusSource;
use crate::error::RemoteError;
use crate::model::StatusSnapshot;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Suspended,
}

#[derive(Debug)]
pub enum PollEvent {
    Snapshot(Vec<StatusSnapshot>),
    /// The fetch failed; no more events follow.
    Suspended(RemoteError),
}

pub struct StatusPoller<S> {
    source: S,
    period: Duration,
    state: watch::Sender<PollerState>,
}

impl<S: StatusSource + 'static> StatusPoller<S> {
    pub fn new(source: S, period: Duration) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            source,
            period,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    /// Start ticking on the current runtime.
    pub fn spawn(self, event_tx: mpsc::UnboundedSender<PollEvent>) -> PollerHandle {
        self.state.send_replace(PollerState::Polling);
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run(event_tx));
        PollerHandle { task, state }
    }

    async fn run(self, event_tx: mpsc::UnboundedSender<PollEvent>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        // A slow fetch pushes the next tick back instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.source.get_policies_status().await {
                Ok(snapshot) => {
                    if event_tx.send(PollEvent::Snapshot(snapshot)).is_err() {
                        self.state.send_replace(PollerState::Idle);
                        return;
                    }
                }
                Err(e) => {
                    self.state.send_replace(PollerState::Suspended);
                    let _ = event_tx.send(PollEvent::Suspended(e));
                    return;
                }
            }
        }
    }
}

/// Owner side of a running poller. Dropping it cancels the cadence.
pub struct PollerHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<PollerState>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Cancel the cadence and wait until the task is gone, so nothing it held can
    /// still be sent afterwards.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
