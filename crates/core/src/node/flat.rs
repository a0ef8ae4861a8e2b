use super::VirtualNode;
use crate::model::{NodeDetails, NodeIds, SourceKey};
use crate::views::flat::{FlatEdge, FlatFrame, FlatThread};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Position {
    Thread,
    /// A root of the thread, weighted by the thread's metric.
    Root(usize),
    /// A frame reached over an edge, weighted by the edge.
    Edge { frame: usize, time: f64 },
}

/// A node of a flat view. `bottom_up` swaps callees and callers on read.
///
/// Below a root, a node's time is the weight of the edge it was reached
/// over, in either direction. Bottom-up, that is the caller's whole edge to
/// its callee, not the part of it that ends in the root function, so a
/// caller two levels up can outweigh the caller it hangs under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode<'a> {
    thread: &'a FlatThread,
    position: Position,
    bottom_up: bool,
}

impl<'a> FlatNode<'a> {
    /// Synthetic thread node listing the thread's roots.
    pub fn thread(thread: &'a FlatThread, bottom_up: bool) -> Self {
        Self {
            thread,
            position: Position::Thread,
            bottom_up,
        }
    }

    pub fn is_bottom_up(&self) -> bool {
        self.bottom_up
    }

    /// The graph frame behind this node, `None` for the thread node.
    pub fn frame(&self) -> Option<&'a FlatFrame> {
        match self.position {
            Position::Thread => None,
            Position::Root(i) | Position::Edge { frame: i, .. } => self.thread.frame(i),
        }
    }

    fn at(&self, position: Position) -> Self {
        Self { position, ..*self }
    }

    fn downward(&self, frame: &'a FlatFrame) -> &'a [FlatEdge] {
        if self.bottom_up { &frame.callers } else { &frame.callees }
    }

    fn upward(&self, frame: &'a FlatFrame) -> &'a [FlatEdge] {
        if self.bottom_up { &frame.callees } else { &frame.callers }
    }

    fn over(&self, edges: &[FlatEdge]) -> Vec<Self> {
        edges
            .iter()
            .map(|e| {
                self.at(Position::Edge {
                    frame: e.target,
                    time: e.time,
                })
            })
            .collect()
    }
}

impl VirtualNode for FlatNode<'_> {
    fn id(&self) -> NodeIds {
        match self.frame() {
            Some(frame) => frame.ids.clone(),
            None => NodeIds::single(self.thread.graph.thread),
        }
    }

    fn details(&self) -> NodeDetails {
        match self.frame() {
            Some(frame) => frame.details.clone(),
            None => NodeDetails::thread(self.thread.graph.name.clone()),
        }
    }

    fn children(&self) -> Vec<Self> {
        match self.frame() {
            Some(frame) => self.over(self.downward(frame)),
            None => self.thread.roots.iter().map(|&i| self.at(Position::Root(i))).collect(),
        }
    }

    fn parents(&self) -> Vec<Self> {
        match self.frame() {
            Some(frame) => {
                let edges = self.upward(frame);
                if edges.is_empty() {
                    vec![self.at(Position::Thread)]
                } else {
                    self.over(edges)
                }
            }
            None => Vec::new(),
        }
    }

    fn time(&self) -> f64 {
        match self.position {
            Position::Thread => self.thread.graph.time,
            Position::Root(i) => self
                .thread
                .frame(i)
                .map_or(0.0, |f| f.metric(self.thread.weighting)),
            Position::Edge { time, .. } => time,
        }
    }

    fn source(&self) -> Option<SourceKey> {
        self.frame().and_then(|f| f.source.clone())
    }
}
