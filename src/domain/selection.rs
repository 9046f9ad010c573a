//! # Selection State
//!
//! Checkbox state over [`ActivityGroups`]. A group flag follows its items: it
//! is on exactly when every item of the group is selected.

use serde::{Deserialize, Serialize};

use super::activity_group::{ActivityGroupItem, ActivityGroups};

/// Counts shown next to the batch controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSummary {
    /// Groups with at least one selected item
    pub groups: usize,
    pub items: usize,
}

impl ActivityGroups {
    /// Flips the expanded flag. Returns false for an unknown group.
    pub fn toggle_group(&mut self, activity_name: &str) -> bool {
        match self.get_mut(activity_name) {
            Some(group) => {
                group.expanded = !group.expanded;
                true
            }
            None => false,
        }
    }

    pub fn expand_all(&mut self) {
        self.groups.iter_mut().for_each(|g| g.expanded = true);
    }

    pub fn collapse_all(&mut self) {
        self.groups.iter_mut().for_each(|g| g.expanded = false);
    }

    /// Sets the group flag and every item flag to `selected`.
    pub fn set_group_selected(&mut self, activity_name: &str, selected: bool) -> bool {
        let Some(group) = self.get_mut(activity_name) else {
            return false;
        };
        group.selected = selected;
        for item in &mut group.items {
            item.selected = selected;
        }
        true
    }

    /// Sets one item by enroll id and re-derives its group flag.
    pub fn set_item_selected(&mut self, enroll_id: &str, selected: bool) -> bool {
        for group in &mut self.groups {
            let Some(item) = group.items.iter_mut().find(|i| i.enroll_id() == enroll_id) else {
                continue;
            };
            item.selected = selected;
            group.selected = group.items.iter().all(|i| i.selected);
            return true;
        }
        false
    }

    pub fn select_all(&mut self) {
        self.set_everything(true);
    }

    pub fn clear_all(&mut self) {
        self.set_everything(false);
    }

    fn set_everything(&mut self, selected: bool) {
        for group in &mut self.groups {
            group.selected = selected;
            for item in &mut group.items {
                item.selected = selected;
            }
        }
    }

    /// Selected items in group order, then item order.
    #[must_use]
    pub fn selected_items(&self) -> Vec<ActivityGroupItem> {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter())
            .filter(|item| item.selected)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.groups
            .iter()
            .any(|g| g.items.iter().any(|item| item.selected))
    }

    #[must_use]
    pub fn selection_summary(&self) -> SelectionSummary {
        self.groups
            .iter()
            .map(|g| g.selected_count())
            .filter(|count| *count > 0)
            .fold(SelectionSummary::default(), |acc, count| SelectionSummary {
                groups: acc.groups + 1,
                items: acc.items + count,
            })
    }
}
