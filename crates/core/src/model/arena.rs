use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::details::{NodeDetails, NodeId, NodeKind};

#[derive(Debug, Error, PartialEq)]
pub enum ArenaError {
    #[error("thread root {0} does not exist")]
    DanglingRoot(usize),
    #[error("node {parent} references missing child {child}")]
    DanglingChild { parent: usize, child: usize },
    #[error("node {0} is reachable more than once (cycle or shared subtree)")]
    Revisited(usize),
    #[error("root {0} is not a thread node")]
    RootNotThread(usize),
    #[error("thread node {0} appears below the root level")]
    NestedThread(usize),
    #[error("node {index} has invalid time {time}")]
    InvalidTime { index: usize, time: f64 },
    #[error("node {0} is not reachable from any thread root")]
    Unreachable(usize),
    #[error("profile has {0} nodes, more than the id space allows")]
    TooManyNodes(usize),
}

/// One node as handed over by the decoder. Children refer to other entries
/// of `ProfileInput::nodes` by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputNode {
    #[serde(flatten)]
    pub details: NodeDetails,
    pub time: f64,
    #[serde(default)]
    pub children: Vec<usize>,
}

/// Decoded profile tree: a flat node list plus the indices of the thread
/// roots, in display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
    pub nodes: Vec<InputNode>,
    pub threads: Vec<usize>,
}

impl ProfileInput {
    /// Append a thread root and return its input index.
    pub fn push_thread(&mut self, name: impl Into<Arc<str>>, time: f64) -> usize {
        let index = self.push(NodeDetails::thread(name), time);
        self.threads.push(index);
        index
    }

    /// Append a stack frame as the last child of `parent` and return its
    /// input index.
    pub fn push_frame(
        &mut self,
        parent: usize,
        class_name: impl Into<Arc<str>>,
        method_name: impl Into<Arc<str>>,
        line_number: Option<u32>,
        time: f64,
    ) -> usize {
        let index = self.push(NodeDetails::frame(class_name, method_name, line_number), time);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(index);
        }
        index
    }

    fn push(&mut self, details: NodeDetails, time: f64) -> usize {
        self.nodes.push(InputNode {
            details,
            time,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }
}

/// A node record owned by the arena.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub details: NodeDetails,
    /// Inclusive sampled weight (milliseconds or bytes).
    pub time: f64,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.details.kind()
    }

    /// `time` minus the children's times, clamped at zero. Overlapping
    /// samples can make the children sum exceed the parent.
    pub fn self_time(&self, arena: &NodeArena) -> f64 {
        let children: f64 = self
            .children
            .iter()
            .filter_map(|&c| arena.node(c))
            .map(|c| c.time)
            .sum();
        (self.time - children).max(0.0)
    }
}

const NO_PARENT: NodeId = NodeId::MAX;

/// Every node of one profile in a single immutable vector, addressed by id.
///
/// Thread roots occupy ids `0..thread_count()`. A node's direct children
/// receive contiguous ids before any grandchild does, so a parent's id is
/// always smaller than its children's.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    parents: Vec<NodeId>,
    thread_count: usize,
}

impl NodeArena {
    /// Assign ids and build the parent index in O(N).
    ///
    /// Walks sibling groups with an explicit stack, so arbitrarily deep
    /// stacks do not recurse. Every input node must be reached exactly once; a
    /// second visit means the input is cyclic or shares a subtree, and a node
    /// never visited is an orphan. Either fails the build.
    pub fn build(input: &ProfileInput) -> Result<Self, ArenaError> {
        if input.nodes.len() >= NO_PARENT as usize {
            return Err(ArenaError::TooManyNodes(input.nodes.len()));
        }

        for &root in &input.threads {
            let node = input.nodes.get(root).ok_or(ArenaError::DanglingRoot(root))?;
            if node.details.kind() != NodeKind::Thread {
                return Err(ArenaError::RootNotThread(root));
            }
        }

        // Input index of every arena id, in id order.
        let mut order: Vec<usize> = Vec::with_capacity(input.nodes.len());
        let mut assigned: Vec<NodeId> = vec![NO_PARENT; input.nodes.len()];

        // (owner of the group, group). The root group has no owner.
        let mut groups: Vec<(Option<usize>, &[usize])> = vec![(None, input.threads.as_slice())];
        while let Some((owner, group)) = groups.pop() {
            for &index in group {
                let Some(node) = input.nodes.get(index) else {
                    return Err(match owner {
                        Some(parent) => ArenaError::DanglingChild {
                            parent,
                            child: index,
                        },
                        None => ArenaError::DanglingRoot(index),
                    });
                };
                if assigned[index] != NO_PARENT {
                    return Err(ArenaError::Revisited(index));
                }
                if owner.is_some() && node.details.is_thread() {
                    return Err(ArenaError::NestedThread(index));
                }
                if !node.time.is_finite() || node.time < 0.0 {
                    return Err(ArenaError::InvalidTime {
                        index,
                        time: node.time,
                    });
                }
                assigned[index] = order.len() as NodeId;
                order.push(index);
            }
            for &index in group.iter().rev() {
                let children = &input.nodes[index].children;
                if !children.is_empty() {
                    groups.push((Some(index), children.as_slice()));
                }
            }
        }

        if let Some(orphan) = assigned.iter().position(|&id| id == NO_PARENT) {
            return Err(ArenaError::Unreachable(orphan));
        }

        let mut nodes = Vec::with_capacity(order.len());
        let mut parents = vec![NO_PARENT; order.len()];
        for (id, &index) in order.iter().enumerate() {
            let source = &input.nodes[index];
            let children: Vec<NodeId> = source.children.iter().map(|&c| assigned[c]).collect();
            for &child in &children {
                parents[child as usize] = id as NodeId;
            }
            nodes.push(Node {
                id: id as NodeId,
                details: source.details.clone(),
                time: source.time,
                children,
            });
        }

        debug!(
            nodes = nodes.len(),
            threads = input.threads.len(),
            "built node arena"
        );

        Ok(Self {
            nodes,
            parents,
            thread_count: input.threads.len(),
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        match self.parents.get(id as usize) {
            Some(&parent) if parent != NO_PARENT => Some(parent),
            _ => None,
        }
    }

    /// `None` exactly for thread roots (and unknown ids).
    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.parent_id(id).and_then(|p| self.node(p))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn threads(&self) -> &[Node] {
        &self.nodes[..self.thread_count]
    }

    pub fn stack_frames(&self) -> &[Node] {
        &self.nodes[self.thread_count..]
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sum of the thread roots' times.
    pub fn total_time(&self) -> f64 {
        self.threads().iter().map(|t| t.time).sum()
    }

    /// Ids from `id` up to its thread root, `id` first.
    pub fn ancestry(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).map(|n| n.id), move |&cur| self.parent_id(cur))
    }
}
