use super::VirtualNode;
use crate::model::{NodeArena, NodeDetails, NodeId, NodeIds, SourceAttribution, SourceKey};
use crate::views::sources::{
    MergedSourceNode, MergedSourceView, SourceThread, SourceView, scoped_children, scoped_parent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Thread,
    Frame(NodeId),
}

/// A node of the separate sources view: arena frames restricted to one
/// source key, grouped under the thread they were found in.
#[derive(Debug, Clone, Copy)]
pub struct SourceNode<'a> {
    arena: &'a NodeArena,
    sources: &'a SourceAttribution,
    view: &'a SourceView,
    thread: &'a SourceThread,
    scope: Scope,
}

impl<'a> SourceNode<'a> {
    /// One synthetic thread node per originating thread of `view`.
    pub fn threads(
        arena: &'a NodeArena,
        sources: &'a SourceAttribution,
        view: &'a SourceView,
    ) -> Vec<Self> {
        view.threads
            .iter()
            .map(|thread| Self {
                arena,
                sources,
                view,
                thread,
                scope: Scope::Thread,
            })
            .collect()
    }

    pub fn arena_id(&self) -> Option<NodeId> {
        match self.scope {
            Scope::Thread => None,
            Scope::Frame(id) => Some(id),
        }
    }

    fn at(&self, scope: Scope) -> Self {
        Self { scope, ..*self }
    }
}

impl VirtualNode for SourceNode<'_> {
    fn id(&self) -> NodeIds {
        match self.scope {
            Scope::Thread => NodeIds::single(self.thread.thread),
            Scope::Frame(id) => NodeIds::single(id),
        }
    }

    fn details(&self) -> NodeDetails {
        match self.scope {
            Scope::Thread => NodeDetails::thread(self.thread.name.clone()),
            Scope::Frame(id) => self
                .arena
                .node(id)
                .map_or_else(
                    || NodeDetails::thread(self.thread.name.clone()),
                    |n| n.details.clone(),
                ),
        }
    }

    fn children(&self) -> Vec<Self> {
        let ids = match self.scope {
            Scope::Thread => self.thread.roots.clone(),
            Scope::Frame(id) => scoped_children(self.arena, self.sources, id, &self.view.source),
        };
        ids.into_iter().map(|id| self.at(Scope::Frame(id))).collect()
    }

    fn parents(&self) -> Vec<Self> {
        match self.scope {
            Scope::Thread => Vec::new(),
            Scope::Frame(id) => {
                let parent = scoped_parent(self.arena, self.sources, id, &self.view.source)
                    .map_or(Scope::Thread, Scope::Frame);
                vec![self.at(parent)]
            }
        }
    }

    fn time(&self) -> f64 {
        match self.scope {
            Scope::Thread => self.thread.time,
            Scope::Frame(id) => self.arena.node(id).map_or(0.0, |n| n.time),
        }
    }

    fn source(&self) -> Option<SourceKey> {
        Some(self.view.source.clone())
    }
}

impl PartialEq for SourceNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.view.source == other.view.source
            && self.thread.thread == other.thread.thread
            && self.scope == other.scope
    }
}

/// A node of the merged sources view, addressed by its child-index path
/// from the synthetic source thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedNode<'a> {
    view: &'a MergedSourceView,
    path: Vec<usize>,
}

impl<'a> MergedNode<'a> {
    pub fn thread(view: &'a MergedSourceView) -> Self {
        Self { view, path: Vec::new() }
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    fn target(&self) -> Option<&'a MergedSourceNode> {
        self.view.node_at(&self.path)
    }

    fn child(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(index);
        Self { view: self.view, path }
    }
}

impl VirtualNode for MergedNode<'_> {
    fn id(&self) -> NodeIds {
        match self.target() {
            Some(node) => node.ids.clone(),
            None => self.view.ids.clone(),
        }
    }

    fn details(&self) -> NodeDetails {
        match self.target() {
            Some(node) => node.details.clone(),
            None => NodeDetails::thread(self.view.source.clone()),
        }
    }

    fn children(&self) -> Vec<Self> {
        let count = match self.target() {
            Some(node) => node.children.len(),
            None if self.path.is_empty() => self.view.roots.len(),
            None => 0,
        };
        (0..count).map(|i| self.child(i)).collect()
    }

    fn parents(&self) -> Vec<Self> {
        match self.path.split_last() {
            Some((_, parent)) => vec![Self {
                view: self.view,
                path: parent.to_vec(),
            }],
            None => Vec::new(),
        }
    }

    fn time(&self) -> f64 {
        match self.target() {
            Some(node) => node.time,
            None => self.view.time,
        }
    }

    fn source(&self) -> Option<SourceKey> {
        Some(self.view.source.clone())
    }
}
