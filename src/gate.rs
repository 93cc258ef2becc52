//! Status-guarded run/stop actions.

use crate::api::ActionSink;
use crate::error::RemoteError;
use crate::model::{PolicyStatus, StopRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Sent,
    Skipped,
}

/// Forwards lifecycle actions to the sink, dropping the ones the current status
/// makes redundant. The local list is left alone; the next poll picks up the change.
pub struct ActionGate<A> {
    sink: A,
}

impl<A: ActionSink> ActionGate<A> {
    pub fn new(sink: A) -> Self {
        Self { sink }
    }

    pub async fn run_policy(
        &self,
        id: &str,
        current: &PolicyStatus,
        name: &str,
    ) -> Result<GateOutcome, RemoteError> {
        if current.is_started() {
            tracing::debug!(policy = name, %current, "run skipped, already started");
            return Ok(GateOutcome::Skipped);
        }
        self.sink.run_policy(id).await?;
        tracing::info!(policy = name, id, "run requested");
        Ok(GateOutcome::Sent)
    }

    pub async fn stop_policy(
        &self,
        id: &str,
        current: &PolicyStatus,
        name: &str,
    ) -> Result<GateOutcome, RemoteError> {
        if !current.is_started() {
            tracing::debug!(policy = name, %current, "stop skipped, not started");
            return Ok(GateOutcome::Skipped);
        }
        self.sink.stop_policy(&StopRequest::stopping(id)).await?;
        tracing::info!(policy = name, id, "stop requested");
        Ok(GateOutcome::Sent)
    }

    pub async fn delete_checkpoint(&self, name: &str) -> Result<GateOutcome, RemoteError> {
        self.sink.delete_policy_checkpoint(name).await?;
        tracing::info!(policy = name, "checkpoint deletion requested");
        Ok(GateOutcome::Sent)
    }
}
