use crate::model::PolicyListItem;
use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortField {
    #[default]
    Name,
    Description,
    Status,
    #[value(name = "mode")]
    LastExecutionMode,
}

impl SortField {
    pub const ALL: [SortField; 4] = [
        SortField::Name,
        SortField::Description,
        SortField::Status,
        SortField::LastExecutionMode,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortField::Name => "Name",
            SortField::Description => "Description",
            SortField::Status => "Status",
            SortField::LastExecutionMode => "Mode",
        }
    }

    fn key(self, item: &PolicyListItem) -> String {
        match self {
            SortField::Name => item.name.to_lowercase(),
            SortField::Description => item.description.to_lowercase(),
            SortField::Status => item.status.as_str().to_lowercase(),
            SortField::LastExecutionMode => item
                .last_execution_mode
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Active column and direction of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub field: SortField,
    pub reverse: bool,
}

impl SortState {
    /// Switch to `field` ascending, or flip direction if it is already active.
    pub fn sort_policies(&mut self, field: SortField) {
        if self.field == field {
            self.reverse = !self.reverse;
        } else {
            self.field = field;
            self.reverse = false;
        }
    }

    /// Ordered view over `items`; the list itself is not reordered.
    pub fn apply<'a>(&self, items: &'a [PolicyListItem]) -> Vec<&'a PolicyListItem> {
        let mut view: Vec<&PolicyListItem> = items.iter().collect();
        view.sort_by_cached_key(|item| self.field.key(item));
        if self.reverse {
            view.reverse();
        }
        view
    }
}
