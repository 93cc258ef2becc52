//! Merge of a status snapshot into the locally held policy list.

use crate::model::{PolicyListItem, StatusSnapshot};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub updated: usize,
    pub appended: usize,
}

/// Apply `snapshot` to `list` in place.
///
/// Known ids get their status, status info and submission id overwritten where they
/// sit; unknown ids are appended in snapshot order. Nothing is ever removed or moved.
pub fn reconcile(list: &mut Vec<PolicyListItem>, snapshot: Vec<StatusSnapshot>) -> ReconcileOutcome {
    let mut index: HashMap<String, usize> = list
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.clone(), i))
        .collect();
    let mut outcome = ReconcileOutcome::default();

    for entry in snapshot {
        match index.get(&entry.id) {
            Some(&pos) => {
                let item = &mut list[pos];
                item.status = entry.status;
                item.status_info = entry.status_info;
                item.submission_id = entry.submission_id;
                outcome.updated += 1;
            }
            None => {
                index.insert(entry.id.clone(), list.len());
                list.push(PolicyListItem::from(entry));
                outcome.appended += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PolicyError, PolicyStatus};

    fn item(id: &str, status: PolicyStatus) -> PolicyListItem {
        PolicyListItem {
            id: id.into(),
            name: format!("{id}-name"),
            description: format!("{id} description"),
            status,
            status_info: None,
            submission_id: None,
            last_execution_mode: Some("local".into()),
            last_error: None,
        }
    }

    fn snap(id: &str, status: PolicyStatus) -> StatusSnapshot {
        StatusSnapshot {
            id: id.into(),
            status,
            status_info: None,
            submission_id: None,
            name: None,
        }
    }

    #[test]
    fn known_policy_is_updated_in_place() {
        let mut list = vec![
            item("a", PolicyStatus::Started),
            item("b", PolicyStatus::NotStarted),
        ];
        list[0].last_error = Some(PolicyError {
            message: "old failure".into(),
            ..Default::default()
        });

        let outcome = reconcile(
            &mut list,
            vec![StatusSnapshot {
                status_info: Some("Status info data".into()),
                submission_id: Some("fake submission id".into()),
                ..snap("a", PolicyStatus::Stopped)
            }],
        );

        assert_eq!(outcome, ReconcileOutcome { updated: 1, appended: 0 });
        assert_eq!(list[0].id, "a");
        assert_eq!(list[0].status, PolicyStatus::Stopped);
        assert_eq!(list[0].status_info.as_deref(), Some("Status info data"));
        assert_eq!(list[0].submission_id.as_deref(), Some("fake submission id"));
        // untouched fields survive
        assert_eq!(list[0].name, "a-name");
        assert_eq!(list[0].last_execution_mode.as_deref(), Some("local"));
        assert!(list[0].last_error.is_some());
        assert_eq!(list[1], item("b", PolicyStatus::NotStarted));
    }

    #[test]
    fn unseen_policy_is_appended() {
        let mut list = vec![item("a", PolicyStatus::Stopped)];
        let before = list[0].clone();

        let outcome = reconcile(
            &mut list,
            vec![
                snap("a", PolicyStatus::Stopped),
                snap("b", PolicyStatus::Started),
            ],
        );

        assert_eq!(outcome, ReconcileOutcome { updated: 1, appended: 1 });
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], before);
        assert_eq!(list[1].id, "b");
        assert_eq!(list[1].status, PolicyStatus::Started);
    }

    #[test]
    fn policies_missing_from_snapshot_are_kept() {
        let mut list = vec![
            item("a", PolicyStatus::Started),
            item("b", PolicyStatus::Started),
            item("c", PolicyStatus::Started),
        ];
        reconcile(&mut list, vec![snap("b", PolicyStatus::Failed)]);

        let ids: Vec<_> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(list[0].status, PolicyStatus::Started);
        assert_eq!(list[1].status, PolicyStatus::Failed);
    }

    #[test]
    fn new_ids_keep_snapshot_order_and_are_not_duplicated() {
        let mut list = vec![item("a", PolicyStatus::Started)];
        let outcome = reconcile(
            &mut list,
            vec![
                snap("z", PolicyStatus::Starting),
                snap("a", PolicyStatus::Started),
                snap("m", PolicyStatus::NotStarted),
                snap("z", PolicyStatus::Started),
            ],
        );

        let ids: Vec<_> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "z", "m"]);
        assert_eq!(list[1].status, PolicyStatus::Started);
        assert_eq!(outcome, ReconcileOutcome { updated: 2, appended: 2 });
    }

    #[test]
    fn length_grows_by_exactly_the_unknown_ids() {
        let snapshots: Vec<Vec<StatusSnapshot>> = vec![
            vec![],
            vec![snap("a", PolicyStatus::Stopped)],
            vec![snap("x", PolicyStatus::Stopped), snap("y", PolicyStatus::Started)],
            vec![
                snap("b", PolicyStatus::Killed),
                snap("q", PolicyStatus::Finished),
                snap("a", PolicyStatus::Started),
            ],
        ];

        for snapshot in snapshots {
            let mut list = vec![item("a", PolicyStatus::Started), item("b", PolicyStatus::Stopped)];
            let before_ids: Vec<_> = list.iter().map(|p| p.id.clone()).collect();
            let unknown = snapshot
                .iter()
                .filter(|s| !before_ids.contains(&s.id))
                .count();

            reconcile(&mut list, snapshot);

            assert_eq!(list.len(), before_ids.len() + unknown);
            let prefix: Vec<_> = list.iter().take(before_ids.len()).map(|p| p.id.clone()).collect();
            assert_eq!(prefix, before_ids);
        }
    }
}
