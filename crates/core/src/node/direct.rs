use std::fmt;

use super::VirtualNode;
use crate::model::{Node, NodeArena, NodeDetails, NodeId, NodeIds, SourceAttribution, SourceKey};

/// One arena record, navigated exactly as recorded.
#[derive(Clone, Copy)]
pub struct DirectNode<'a> {
    arena: &'a NodeArena,
    sources: &'a SourceAttribution,
    node: &'a Node,
}

impl<'a> DirectNode<'a> {
    /// `None` when `id` is not in the arena.
    pub fn new(arena: &'a NodeArena, sources: &'a SourceAttribution, id: NodeId) -> Option<Self> {
        arena.node(id).map(|node| Self { arena, sources, node })
    }

    /// Every thread root, in profile order.
    pub fn roots(arena: &'a NodeArena, sources: &'a SourceAttribution) -> Vec<Self> {
        arena
            .threads()
            .iter()
            .map(|node| Self { arena, sources, node })
            .collect()
    }

    pub fn arena_id(&self) -> NodeId {
        self.node.id
    }

    pub fn record(&self) -> &'a Node {
        self.node
    }

    fn wrap(&self, id: NodeId) -> Option<Self> {
        Self::new(self.arena, self.sources, id)
    }
}

impl VirtualNode for DirectNode<'_> {
    fn id(&self) -> NodeIds {
        NodeIds::single(self.node.id)
    }

    fn details(&self) -> NodeDetails {
        self.node.details.clone()
    }

    fn children(&self) -> Vec<Self> {
        self.node.children.iter().filter_map(|&c| self.wrap(c)).collect()
    }

    fn parents(&self) -> Vec<Self> {
        self.arena
            .parent_id(self.node.id)
            .and_then(|p| self.wrap(p))
            .into_iter()
            .collect()
    }

    fn time(&self) -> f64 {
        self.node.time
    }

    fn source(&self) -> Option<SourceKey> {
        self.sources.source(self.node.id).cloned()
    }
}

impl PartialEq for DirectNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.arena, other.arena) && self.node.id == other.node.id
    }
}

impl fmt::Debug for DirectNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectNode")
            .field("id", &self.node.id)
            .field("details", &self.node.details)
            .finish()
    }
}
