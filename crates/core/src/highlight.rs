//! Highlighted (bookmarked) nodes, mirrored into one URL query parameter.
//!
//! Mutations only touch in-memory state and mark it pending. The single
//! effect is [`HighlightState::sync`], which the host calls after each
//! interaction; it writes the parameter at most once per pending mutation and
//! stays out of the way while the host is navigating.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{NodeId, NodeIds};
use crate::node::VirtualNode;

pub const DEFAULT_PARAM: &str = "hl";

/// Read/write access to the host's URL query.
pub trait UrlQuery {
    fn get(&self, key: &str) -> Option<String>;
    /// `None` removes the parameter.
    fn set(&mut self, key: &str, value: Option<&str>);
}

impl UrlQuery for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.insert(key.to_string(), value.to_string());
            }
            None => {
                self.remove(key);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum NavState {
    #[default]
    Idle,
    Navigating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncOutcome {
    /// Nothing to write, or the URL already holds the value.
    Unchanged,
    /// A navigation is in flight; the mutation is kept for a later sync.
    Deferred,
    /// The mutation was made with [`HighlightState::replace_silently`].
    Skipped,
    Written,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightState {
    param: String,
    ids: BTreeSet<NodeId>,
    nav: NavState,
    pending: bool,
    skip_next: bool,
}

impl Default for HighlightState {
    fn default() -> Self {
        Self::new(DEFAULT_PARAM)
    }
}

impl HighlightState {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            ids: BTreeSet::new(),
            nav: NavState::Idle,
            pending: false,
            skip_next: false,
        }
    }

    /// Restore the set from the URL. Tokens that are not ids are dropped.
    pub fn from_url(query: &impl UrlQuery, param: impl Into<String>) -> Self {
        let mut state = Self::new(param);
        if let Some(value) = query.get(&state.param) {
            state.ids = parse_ids(&value);
        }
        state
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn toggle<N: VirtualNode>(&mut self, node: &N) {
        let ids = node.id();
        if self.contains_any(&ids) {
            for id in ids.iter() {
                self.ids.remove(&id);
            }
        } else {
            self.ids.extend(ids.iter());
        }
        self.pending = true;
    }

    /// Make `node` the only highlighted node.
    pub fn replace<N: VirtualNode>(&mut self, node: &N) {
        self.ids = node.id().iter().collect();
        self.pending = true;
    }

    /// Like [`replace`](Self::replace), but the next sync leaves the URL
    /// alone.
    pub fn replace_silently<N: VirtualNode>(&mut self, node: &N) {
        self.replace(node);
        self.skip_next = true;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.pending = true;
    }

    /// Whether any of the node's ids is highlighted. Descendants are not
    /// considered; see [`check`](Self::check).
    pub fn has<N: VirtualNode>(&self, node: &N) -> bool {
        self.contains_any(&node.id())
    }

    pub fn contains_any(&self, ids: &NodeIds) -> bool {
        ids.iter().any(|id| self.ids.contains(&id))
    }

    /// Whether the node or any node below it is highlighted. Each id set is
    /// visited once, so cyclic views terminate.
    pub fn check<N: VirtualNode>(&self, node: &N) -> bool {
        if self.ids.is_empty() {
            return false;
        }
        if self.has(node) {
            return true;
        }
        let mut seen: HashSet<NodeIds> = HashSet::from([node.id()]);
        let mut stack: Vec<N> = node.children();
        while let Some(cur) = stack.pop() {
            let ids = cur.id();
            if self.contains_any(&ids) {
                return true;
            }
            if seen.insert(ids) {
                stack.extend(cur.children());
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &BTreeSet<NodeId> {
        &self.ids
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn nav_state(&self) -> NavState {
        self.nav
    }

    pub fn navigation_started(&mut self) {
        self.nav = NavState::Navigating;
    }

    pub fn navigation_completed(&mut self) {
        self.nav = NavState::Idle;
    }

    pub fn navigation_failed(&mut self) {
        self.nav = NavState::Idle;
    }

    /// Ascending, comma-joined ids; empty for an empty set.
    pub fn serialize(&self) -> String {
        self.ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }

    /// Write the pending state to the URL, if it needs writing.
    pub fn sync(&mut self, url: &mut impl UrlQuery) -> SyncOutcome {
        if !self.pending {
            return SyncOutcome::Unchanged;
        }
        if self.nav == NavState::Navigating {
            return SyncOutcome::Deferred;
        }
        self.pending = false;
        if self.skip_next {
            self.skip_next = false;
            return SyncOutcome::Skipped;
        }

        let value = self.serialize();
        let current = url.get(&self.param).unwrap_or_default();
        if value == current {
            return SyncOutcome::Unchanged;
        }
        debug!(param = %self.param, value = %value, "writing highlight parameter");
        if value.is_empty() {
            url.set(&self.param, None);
        } else {
            url.set(&self.param, Some(&value));
        }
        SyncOutcome::Written
    }
}

/// Parse a comma-separated id list. Blank and invalid tokens are skipped.
pub fn parse_ids(value: &str) -> BTreeSet<NodeId> {
    let mut ids = BTreeSet::new();
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<NodeId>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(e) => warn!(token, error = %e, "ignoring invalid highlight id"),
        }
    }
    ids
}
