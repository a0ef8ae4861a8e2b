use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::source::SourceKey;

/// Arena-assigned node identifier.
pub type NodeId = u32;

/// Identity of a virtual node: an ascending, de-duplicated, non-empty set of
/// arena ids. Direct nodes carry one id; aggregated nodes carry the ids of
/// every occurrence they fold together. Equality is set equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeIds(Vec<NodeId>);

impl NodeIds {
    pub fn single(id: NodeId) -> Self {
        Self(vec![id])
    }

    /// Returns `None` for an empty input.
    pub fn from_ids(ids: impl IntoIterator<Item = NodeId>) -> Option<Self> {
        let mut ids: Vec<NodeId> = ids.into_iter().collect();
        if ids.is_empty() {
            return None;
        }
        ids.sort_unstable();
        ids.dedup();
        Some(Self(ids))
    }

    pub fn union(&self, other: &NodeIds) -> NodeIds {
        let mut ids = Vec::with_capacity(self.0.len() + other.0.len());
        ids.extend_from_slice(&self.0);
        ids.extend_from_slice(&other.0);
        ids.sort_unstable();
        ids.dedup();
        NodeIds(ids)
    }

    /// Smallest id of the set.
    pub fn first(&self) -> NodeId {
        self.0[0]
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.binary_search(&id).is_ok()
    }
}

impl From<NodeId> for NodeIds {
    fn from(id: NodeId) -> Self {
        Self::single(id)
    }
}

impl<'de> Deserialize<'de> for NodeIds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<NodeId>::deserialize(deserializer)?;
        NodeIds::from_ids(ids)
            .ok_or_else(|| serde::de::Error::custom("node id set must not be empty"))
    }
}

/// `3` for single ids, `3-7-9` for aggregated ones. Stable, so renderers can
/// use it as an element key.
impl fmt::Display for NodeIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Thread,
    StackFrame,
}

/// What a node is, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeDetails {
    Thread {
        name: Arc<str>,
    },
    #[serde(rename_all = "camelCase")]
    StackFrame {
        class_name: Arc<str>,
        method_name: Arc<str>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_number: Option<u32>,
    },
}

impl NodeDetails {
    pub fn thread(name: impl Into<Arc<str>>) -> Self {
        Self::Thread { name: name.into() }
    }

    pub fn frame(
        class_name: impl Into<Arc<str>>,
        method_name: impl Into<Arc<str>>,
        line_number: Option<u32>,
    ) -> Self {
        Self::StackFrame {
            class_name: class_name.into(),
            method_name: method_name.into(),
            line_number,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Thread { .. } => NodeKind::Thread,
            Self::StackFrame { .. } => NodeKind::StackFrame,
        }
    }

    pub fn is_thread(&self) -> bool {
        self.kind() == NodeKind::Thread
    }
}

/// The key frames are merged under in the flat and merged-source views.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameSignature {
    pub class_name: Arc<str>,
    pub method_name: Arc<str>,
    pub line_number: Option<u32>,
    pub source: Option<SourceKey>,
}

impl FrameSignature {
    /// `None` for thread details, which have no signature.
    pub fn of(details: &NodeDetails, source: Option<&SourceKey>) -> Option<Self> {
        match details {
            NodeDetails::Thread { .. } => None,
            NodeDetails::StackFrame {
                class_name,
                method_name,
                line_number,
            } => Some(Self {
                class_name: class_name.clone(),
                method_name: method_name.clone(),
                line_number: *line_number,
                source: source.cloned(),
            }),
        }
    }
}
