//! Remote collaborators of the policy list.
//!
//! The list controller, poller and action gate only see these traits; `PolicyClient`
//! is the HTTP implementation used by the binary.

mod client;

use crate::error::RemoteError;
use crate::model::{PolicyListItem, StatusSnapshot, StopRequest};
use async_trait::async_trait;

pub use client::PolicyClient;

/// Authoritative source of policy definitions and their execution status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn get_all_policies(&self) -> Result<Vec<PolicyListItem>, RemoteError>;

    async fn get_policies_status(&self) -> Result<Vec<StatusSnapshot>, RemoteError>;
}

/// Fire-and-forget lifecycle actions on a policy.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn run_policy(&self, id: &str) -> Result<(), RemoteError>;

    async fn stop_policy(&self, request: &StopRequest) -> Result<(), RemoteError>;

    async fn delete_policy_checkpoint(&self, name: &str) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for std::sync::Arc<T> {
    async fn get_all_policies(&self) -> Result<Vec<PolicyListItem>, RemoteError> {
        (**self).get_all_policies().await
    }

    async fn get_policies_status(&self) -> Result<Vec<StatusSnapshot>, RemoteError> {
        (**self).get_policies_status().await
    }
}

#[async_trait]
impl<T: ActionSink + ?Sized> ActionSink for std::sync::Arc<T> {
    async fn run_policy(&self, id: &str) -> Result<(), RemoteError> {
        (**self).run_policy(id).await
    }

    async fn stop_policy(&self, request: &StopRequest) -> Result<(), RemoteError> {
        (**self).stop_policy(request).await
    }

    async fn delete_policy_checkpoint(&self, name: &str) -> Result<(), RemoteError> {
        (**self).delete_policy_checkpoint(name).await
    }
}
