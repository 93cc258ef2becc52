//! Locally held policy list: initial load, snapshot merge, sorting and the detail view.

use crate::model::{PolicyListItem, StatusSnapshot};
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::sort::{SortField, SortState};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tokio::sync::oneshot;

pub const INFO_MODAL_CONTROLLER: &str = "PolicyInfoModal";
pub const INFO_MODAL_TEMPLATE: &str = "modal/policy-info";

/// Zero-argument accessor handed to a modal.
pub type Accessor = Box<dyn Fn() -> Value + Send + Sync>;

/// Named accessors a modal resolves its inputs from.
pub type ResolveMap = BTreeMap<&'static str, Accessor>;

/// Settles when the modal is closed.
pub struct ModalHandle {
    pub result: oneshot::Receiver<()>,
}

pub trait ModalPresenter {
    fn open_modal(&mut self, controller: &str, template: &str, resolve: ResolveMap) -> ModalHandle;
}

#[derive(Debug, Default)]
pub struct PolicyList {
    policies: Vec<PolicyListItem>,
    sort: SortState,
    last_updated: Option<OffsetDateTime>,
}

impl PolicyList {
    pub fn new(policies: Vec<PolicyListItem>) -> Self {
        Self {
            policies,
            sort: SortState::default(),
            last_updated: Some(now()),
        }
    }

    /// Replace the whole list after a full reload. Sort state is kept.
    pub fn replace(&mut self, policies: Vec<PolicyListItem>) {
        self.policies = policies;
        self.last_updated = Some(now());
    }

    pub fn apply_snapshot(&mut self, snapshot: Vec<StatusSnapshot>) -> ReconcileOutcome {
        let outcome = reconcile(&mut self.policies, snapshot);
        self.last_updated = Some(now());
        outcome
    }

    pub fn sort_policies(&mut self, field: SortField) {
        self.sort.sort_policies(field);
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn set_sort_state(&mut self, sort: SortState) {
        self.sort = sort;
    }

    /// Items in list order, as received.
    pub fn policies(&self) -> &[PolicyListItem] {
        &self.policies
    }

    /// Items in display order.
    pub fn sorted(&self) -> Vec<&PolicyListItem> {
        self.sort.apply(&self.policies)
    }

    pub fn get(&self, id: &str) -> Option<&PolicyListItem> {
        self.policies.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        self.last_updated
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Open the detail modal for `item`.
pub fn show_info_modal<P: ModalPresenter + ?Sized>(
    presenter: &mut P,
    item: &PolicyListItem,
) -> ModalHandle {
    presenter.open_modal(INFO_MODAL_CONTROLLER, INFO_MODAL_TEMPLATE, info_resolve(item))
}

fn info_resolve(item: &PolicyListItem) -> ResolveMap {
    let mut resolve = ResolveMap::new();
    resolve.insert("policyName", constant(Value::from(item.name.clone())));
    resolve.insert(
        "policyDescription",
        constant(Value::from(item.description.clone())),
    );
    resolve.insert("status", constant(Value::from(item.status.to_string())));
    resolve.insert("statusInfo", constant(Value::from(item.status_info.clone())));
    resolve.insert(
        "submissionId",
        constant(Value::from(item.submission_id.clone())),
    );
    resolve.insert(
        "deployMode",
        constant(Value::from(item.last_execution_mode.clone())),
    );
    resolve.insert(
        "error",
        constant(serde_json::to_value(&item.last_error).unwrap_or_default()),
    );
    resolve
}

fn constant(value: Value) -> Accessor {
    Box::new(move || value.clone())
}

/// Evaluate every accessor; used by presenters that only need the values.
pub fn resolve_values(resolve: &ResolveMap) -> BTreeMap<&'static str, Value> {
    resolve.iter().map(|(k, f)| (*k, f())).collect()
}
