//! Collapse and visibility state.
//!
//! The state is the list of parent names whose descendants are hidden.
//! Every transition mints an update token. The host persists the list
//! together with the token and later hands it back on refresh, at which
//! point a token we minted ourselves marks the refresh as an echo.

use crate::hierarchy::TaskTree;
use ganttline_core::GanttError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// The `(collapsed list, update token)` pair the host stores
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCollapse {
    /// JSON-encoded array of task names
    pub list: String,
    /// Opaque token, compared but never interpreted
    pub update_id: String,
}

impl PersistedCollapse {
    pub fn new(list: impl Into<String>, update_id: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            update_id: update_id.into(),
        }
    }

    /// Nothing collapsed, no token
    pub fn empty() -> Self {
        Self::new("[]", "")
    }

    /// Decode the stored list; an empty string reads as an empty list
    pub fn collapsed(&self) -> Result<Vec<String>, GanttError> {
        if self.list.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&self.list)?)
    }
}

impl Default for PersistedCollapse {
    fn default() -> Self {
        Self::empty()
    }
}

/// What to do with an incoming refresh
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshDecision {
    /// The refresh carries a token this state minted: skip it
    Echo,
    /// Foreign or absent token: rebuild
    Recompute,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollapseState {
    collapsed: Vec<String>,
    pending: Vec<String>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collapsed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = Self::new();
        for name in names {
            let name = name.into();
            if !state.collapsed.contains(&name) {
                state.collapsed.push(name);
            }
        }
        state
    }

    pub fn collapsed(&self) -> &[String] {
        &self.collapsed
    }

    pub fn is_collapsed(&self, name: &str) -> bool {
        self.collapsed.iter().any(|c| c == name)
    }

    /// Tokens minted but not yet echoed back
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Classify a refresh by its token, consuming the token on a match
    pub fn accept_refresh(&mut self, update_id: &str) -> RefreshDecision {
        match self.pending.iter().position(|t| t == update_id) {
            Some(pos) => {
                self.pending.remove(pos);
                debug!(token = update_id, "refresh is an echo of our own write");
                RefreshDecision::Echo
            }
            None => RefreshDecision::Recompute,
        }
    }

    /// Replace the list from persisted state.
    ///
    /// An undecodable list leaves nothing collapsed.
    pub fn load(&mut self, persisted: &PersistedCollapse) {
        let names = match persisted.collapsed() {
            Ok(names) => names,
            Err(err) => {
                warn!(%err, "ignoring persisted collapsed list");
                Vec::new()
            }
        };
        self.collapsed.clear();
        for name in names {
            if !self.collapsed.contains(&name) {
                self.collapsed.push(name);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------------

    /// A task is hidden when any linked ancestor's name is collapsed
    pub fn is_hidden(&self, tree: &TaskTree, id: usize) -> bool {
        let Some(task) = tree.get(id) else {
            return false;
        };
        tree.ancestors(task).iter().any(|a| self.is_collapsed(&a.name))
    }

    /// Recompute the `visibility` flag of every task in display order.
    ///
    /// Parents always precede their children, so each task can read the
    /// already settled flag of its parent.
    pub fn apply_visibility(&self, tree: &mut TaskTree) {
        let flags: Vec<(usize, bool)> = {
            let mut hidden: HashSet<usize> = HashSet::new();
            tree.tasks()
                .iter()
                .map(|task| {
                    let is_hidden = match tree.parent_of(task) {
                        Some(parent) => {
                            hidden.contains(&parent.id) || self.is_collapsed(&parent.name)
                        }
                        None => false,
                    };
                    if is_hidden {
                        hidden.insert(task.id);
                    }
                    (task.id, !is_hidden)
                })
                .collect()
        };
        for (id, visible) in flags {
            if let Some(task) = tree.get_mut(id) {
                task.visibility = visible;
            }
        }
    }

    fn has_visible_child(&self, tree: &TaskTree, name: &str) -> bool {
        tree.named(name)
            .any(|task| tree.children(task).any(|child| !self.is_hidden(tree, child.id)))
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Hide the descendants of `name`; false when it shows no child
    pub fn collapse(&mut self, tree: &TaskTree, name: &str) -> bool {
        if self.is_collapsed(name) || !self.has_visible_child(tree, name) {
            return false;
        }
        self.collapsed.push(name.to_string());
        true
    }

    /// Show the descendants of `name` again; false when it was not collapsed
    pub fn expand(&mut self, name: &str) -> bool {
        let before = self.collapsed.len();
        self.collapsed.retain(|c| c != name);
        self.collapsed.len() != before
    }

    /// Collapse or expand `name`, whichever applies.
    ///
    /// Returns the persistable record, or `None` when nothing changed.
    pub fn toggle(&mut self, tree: &TaskTree, name: &str) -> Option<PersistedCollapse> {
        let changed = if self.is_collapsed(name) {
            self.expand(name)
        } else {
            self.collapse(tree, name)
        };
        changed.then(|| self.persist())
    }

    /// Collapse every visible task that has children, in display order
    pub fn collapse_all(&mut self, tree: &TaskTree) -> bool {
        let mut names: Vec<String> = Vec::new();
        for task in tree.tasks() {
            let visible = !self.is_hidden(tree, task.id);
            if task.has_children() && visible && !names.contains(&task.name) {
                names.push(task.name.clone());
            }
        }
        if names.is_empty() {
            return false;
        }
        self.collapsed = names;
        true
    }

    pub fn expand_all(&mut self) -> bool {
        let changed = !self.collapsed.is_empty();
        self.collapsed.clear();
        changed
    }

    /// Expand everything when anything is collapsed, otherwise collapse all
    pub fn toggle_all(&mut self, tree: &TaskTree) -> Option<PersistedCollapse> {
        let changed = if self.collapsed.is_empty() {
            self.collapse_all(tree)
        } else {
            self.expand_all()
        };
        changed.then(|| self.persist())
    }

    /// Mint a token and encode the current list for the host
    pub fn persist(&mut self) -> PersistedCollapse {
        let token = Uuid::new_v4().to_string();
        self.pending.push(token.clone());
        let list = serde_json::to_string(&self.collapsed).unwrap_or_else(|_| "[]".to_string());
        debug!(collapsed = self.collapsed.len(), token = %token, "collapse state persisted");
        PersistedCollapse::new(list, token)
    }
}
