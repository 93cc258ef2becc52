use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Execution status of a policy as reported by the server.
///
/// Parsing is case-insensitive so `started` and `Started` compare equal; anything the
/// client does not know about is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyStatus {
    #[default]
    NotStarted,
    Launched,
    Starting,
    Started,
    Failed,
    Stopping,
    Stopped,
    Finished,
    Killed,
    NotDefined,
    Other(String),
}

impl PolicyStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyStatus::NotStarted => "NotStarted",
            PolicyStatus::Launched => "Launched",
            PolicyStatus::Starting => "Starting",
            PolicyStatus::Started => "Started",
            PolicyStatus::Failed => "Failed",
            PolicyStatus::Stopping => "Stopping",
            PolicyStatus::Stopped => "Stopped",
            PolicyStatus::Finished => "Finished",
            PolicyStatus::Killed => "Killed",
            PolicyStatus::NotDefined => "NotDefined",
            PolicyStatus::Other(raw) => raw,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, PolicyStatus::Started)
    }
}

impl From<&str> for PolicyStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "notstarted" => PolicyStatus::NotStarted,
            "launched" => PolicyStatus::Launched,
            "starting" => PolicyStatus::Starting,
            "started" => PolicyStatus::Started,
            "failed" => PolicyStatus::Failed,
            "stopping" => PolicyStatus::Stopping,
            "stopped" => PolicyStatus::Stopped,
            "finished" => PolicyStatus::Finished,
            "killed" => PolicyStatus::Killed,
            "notdefined" => PolicyStatus::NotDefined,
            _ => PolicyStatus::Other(raw.to_string()),
        }
    }
}

impl From<String> for PolicyStatus {
    fn from(raw: String) -> Self {
        PolicyStatus::from(raw.as_str())
    }
}

impl From<PolicyStatus> for String {
    fn from(status: PolicyStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last failure recorded by the server for a policy execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub original_msg: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// The service sends `null` for unset fields as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListItem {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PolicyStatus,
    #[serde(default)]
    pub status_info: Option<String>,
    #[serde(default)]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub last_execution_mode: Option<String>,
    #[serde(default)]
    pub last_error: Option<PolicyError>,
}

/// One entry of the periodic status feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PolicyStatus,
    #[serde(default)]
    pub status_info: Option<String>,
    #[serde(default)]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<StatusSnapshot> for PolicyListItem {
    fn from(s: StatusSnapshot) -> Self {
        Self {
            name: s.name.unwrap_or_else(|| s.id.clone()),
            id: s.id,
            description: String::new(),
            status: s.status,
            status_info: s.status_info,
            submission_id: s.submission_id,
            last_execution_mode: None,
            last_error: None,
        }
    }
}

/// Body of the stop request; the client labels the transition itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub id: String,
    pub status: PolicyStatus,
}

impl StopRequest {
    pub fn stopping(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: PolicyStatus::Stopping,
        }
    }
}

/// Structured info events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Loaded { count: usize },
    ActionSent { action: &'static str, name: String },
    ActionSkipped { action: &'static str, name: String, status: PolicyStatus },
    ActionFailed { action: &'static str, name: String, error: String },
    PollingSuspended { error: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Loaded { count } => format!("Loaded {count} policies"),
            InfoEvent::ActionSent { action, name } => format!("{action} requested for {name}"),
            InfoEvent::ActionSkipped {
                action,
                name,
                status,
            } => format!("{action} skipped for {name} (status: {status})"),
            InfoEvent::ActionFailed {
                action,
                name,
                error,
            } => format!("{action} failed for {name}: {error}"),
            InfoEvent::PollingSuspended { error } => {
                format!("Status updates stopped: {error} (press R to reload)")
            }
        }
    }
}
