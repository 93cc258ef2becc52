use crate::model::PolicyListItem;
use crate::orchestrator::UiEvent;
use crate::policy_list::{resolve_values, ModalHandle, ModalPresenter, PolicyList, ResolveMap};
use crate::poller::PollerState;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// A modal currently on screen.
pub struct OpenModal {
    pub controller: String,
    pub values: BTreeMap<&'static str, Value>,
    close_tx: Option<oneshot::Sender<()>>,
}

/// Single-slot modal presenter; opening a new modal closes the previous one.
#[derive(Default)]
pub struct ModalSlot {
    pub open: Option<OpenModal>,
}

impl ModalSlot {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn close(&mut self) {
        if let Some(mut m) = self.open.take() {
            if let Some(tx) = m.close_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}

impl ModalPresenter for ModalSlot {
    fn open_modal(&mut self, controller: &str, _template: &str, resolve: ResolveMap) -> ModalHandle {
        self.close();
        let (tx, rx) = oneshot::channel();
        self.open = Some(OpenModal {
            controller: controller.to_string(),
            values: resolve_values(&resolve),
            close_tx: Some(tx),
        });
        ModalHandle { result: rx }
    }
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub base_url: String,
    pub list: PolicyList,
    pub loaded: bool,
    /// Index into the sorted view.
    pub selected: usize,
    pub poller: PollerState,
    pub poll_interval: Duration,
    /// Start of the current poll period.
    pub period_start: Instant,
    pub modal: ModalSlot,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            base_url: String::new(),
            list: PolicyList::default(),
            loaded: false,
            selected: 0,
            poller: PollerState::Idle,
            poll_interval: Duration::from_secs(5),
            period_start: Instant::now(),
            modal: ModalSlot::default(),
        }
    }
}

impl UiState {
    pub fn selected_policy(&self) -> Option<&PolicyListItem> {
        self.list.sorted().get(self.selected).copied()
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_policy().map(|p| p.id.clone())
    }

    /// Point the selection at `id` in the current display order, or clamp it.
    pub fn reselect(&mut self, id: Option<String>) {
        let sorted = self.list.sorted();
        if let Some(pos) = id.and_then(|id| sorted.iter().position(|p| p.id == id)) {
            self.selected = pos;
        } else {
            self.selected = self.selected.min(sorted.len().saturating_sub(1));
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.list.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Seconds into the current poll period, for the refresh slider.
    pub fn period_elapsed(&self) -> Duration {
        self.period_start.elapsed().min(self.poll_interval)
    }

    /// Apply an orchestrator event; the selection follows the selected policy.
    pub(crate) fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::Loaded(policies) => {
                let keep = self.selected_id();
                self.list.replace(policies);
                self.loaded = true;
                self.reselect(keep);
            }
            UiEvent::Snapshot(snapshot) => {
                let keep = self.selected_id();
                let outcome = self.list.apply_snapshot(snapshot);
                tracing::debug!(
                    updated = outcome.updated,
                    appended = outcome.appended,
                    "status snapshot applied"
                );
                self.period_start = Instant::now();
                if outcome.appended > 0 {
                    self.info = format!("{} new policy(ies) detected", outcome.appended);
                }
                self.reselect(keep);
            }
            UiEvent::Poller(state) => {
                self.poller = state;
                if state == PollerState::Polling {
                    self.period_start = Instant::now();
                }
            }
            UiEvent::Info(info) => self.info = info.to_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InfoEvent, PolicyStatus, StatusSnapshot};
    use crate::policy_list::show_info_modal;
    use crate::sort::SortField;

    fn item(id: &str, name: &str) -> PolicyListItem {
        PolicyListItem {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            status: PolicyStatus::Stopped,
            status_info: None,
            submission_id: None,
            last_execution_mode: None,
            last_error: None,
        }
    }

    #[test]
    fn selection_follows_policy_across_snapshots() {
        let mut state = UiState::default();
        state.apply_event(UiEvent::Loaded(vec![item("b", "bravo"), item("c", "charlie")]));
        state.selected = 1;
        assert_eq!(state.selected_policy().unwrap().id, "c");

        // "alpha" sorts first and pushes charlie down one row
        state.apply_event(UiEvent::Snapshot(vec![StatusSnapshot {
            id: "a".into(),
            status: PolicyStatus::Started,
            status_info: None,
            submission_id: None,
            name: Some("alpha".into()),
        }]));
        assert_eq!(state.selected_policy().unwrap().id, "c");
        assert_eq!(state.selected, 2);
        assert_eq!(state.info, "1 new policy(ies) detected");

        state.list.sort_policies(SortField::Name);
        let keep = Some("c".to_string());
        state.reselect(keep);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn poller_and_info_events_update_status_line() {
        let mut state = UiState::default();
        state.apply_event(UiEvent::Poller(PollerState::Suspended));
        state.apply_event(UiEvent::Info(InfoEvent::PollingSuspended {
            error: "fake error message".into(),
        }));
        assert_eq!(state.poller, PollerState::Suspended);
        assert!(state.info.contains("fake error message"));
    }

    #[tokio::test]
    async fn modal_slot_closes_previous_modal_and_resolves_handles() {
        let mut state = UiState::default();
        state.apply_event(UiEvent::Loaded(vec![item("a", "alpha"), item("b", "bravo")]));

        let first = show_info_modal(&mut state.modal, &state.list.policies()[0].clone());
        let second = show_info_modal(&mut state.modal, &state.list.policies()[1].clone());
        first.result.await.unwrap();
        assert_eq!(
            state.modal.open.as_ref().unwrap().values["policyName"],
            "bravo"
        );

        state.modal.close();
        assert!(!state.modal.is_open());
        second.result.await.unwrap();
    }
}
