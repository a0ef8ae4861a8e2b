//! Per-thread signature graphs: every occurrence of a method folded into one
//! node, with caller/callee edges weighted by the callee's time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::aggregator::{AggregationError, CANCEL_CHECK_INTERVAL, CancelToken};
use crate::model::{
    FrameSignature, Node, NodeArena, NodeDetails, NodeId, NodeIds, SourceAttribution, SourceKey,
};

/// Which metric orders a flat thread's roots and weighs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Weighting {
    SelfTime,
    TotalTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatEdge {
    /// Index into [`FlatGraph::frames`].
    pub target: usize,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatFrame {
    pub details: NodeDetails,
    pub source: Option<SourceKey>,
    pub ids: NodeIds,
    pub self_time: f64,
    pub total_time: f64,
    /// Outgoing edges, heaviest first.
    pub callees: Vec<FlatEdge>,
    /// Incoming edges, heaviest first.
    pub callers: Vec<FlatEdge>,
}

impl FlatFrame {
    pub fn metric(&self, weighting: Weighting) -> f64 {
        match weighting {
            Weighting::SelfTime => self.self_time,
            Weighting::TotalTime => self.total_time,
        }
    }
}

/// Signature graph of one thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatGraph {
    pub thread: NodeId,
    pub name: Arc<str>,
    pub time: f64,
    pub frames: Vec<FlatFrame>,
}

/// A thread of the flat view: a shared graph plus the roots picked for one
/// weighting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatThread {
    pub graph: Arc<FlatGraph>,
    pub weighting: Weighting,
    pub roots: Vec<usize>,
}

impl FlatThread {
    pub fn frame(&self, index: usize) -> Option<&FlatFrame> {
        self.graph.frames.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.graph.frames.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatViewData {
    pub flat_self_time: Vec<FlatThread>,
    pub flat_total_time: Vec<FlatThread>,
}

impl FlatViewData {
    pub fn threads(&self, weighting: Weighting) -> &[FlatThread] {
        match weighting {
            Weighting::SelfTime => &self.flat_self_time,
            Weighting::TotalTime => &self.flat_total_time,
        }
    }
}

/// Build the flat graph of every thread. A thread without frames still gets
/// an (empty) entry in both lists.
pub fn generate_flat_view(
    arena: &NodeArena,
    sources: &SourceAttribution,
    cancel: &CancelToken,
) -> Result<FlatViewData, AggregationError> {
    let mut data = FlatViewData::default();
    for thread in arena.threads() {
        cancel.check()?;
        let graph = Arc::new(build_flat_graph(arena, sources, thread, cancel)?);
        data.flat_self_time.push(FlatThread {
            roots: ordered_roots(&graph, Weighting::SelfTime),
            graph: Arc::clone(&graph),
            weighting: Weighting::SelfTime,
        });
        data.flat_total_time.push(FlatThread {
            roots: ordered_roots(&graph, Weighting::TotalTime),
            graph,
            weighting: Weighting::TotalTime,
        });
    }
    Ok(data)
}

struct FrameBuilder {
    details: NodeDetails,
    source: Option<SourceKey>,
    ids: Vec<NodeId>,
    self_time: f64,
    total_time: f64,
    callees: Vec<FlatEdge>,
    callers: Vec<FlatEdge>,
}

enum Step {
    Enter { id: NodeId, caller: Option<usize> },
    Exit(usize),
}

/// Fold one thread's subtree into its signature graph with a single
/// iterative depth-first pass.
pub fn build_flat_graph(
    arena: &NodeArena,
    sources: &SourceAttribution,
    thread: &Node,
    cancel: &CancelToken,
) -> Result<FlatGraph, AggregationError> {
    let name = match &thread.details {
        NodeDetails::Thread { name } => name.clone(),
        NodeDetails::StackFrame { method_name, .. } => method_name.clone(),
    };

    let mut frames: Vec<FrameBuilder> = Vec::new();
    let mut index: HashMap<FrameSignature, usize> = HashMap::new();
    // (caller, callee) -> position in caller.callees and callee.callers
    let mut edges: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    // Occurrences of each frame on the current path.
    let mut on_path: Vec<u32> = Vec::new();

    let mut stack: Vec<Step> = thread
        .children
        .iter()
        .rev()
        .map(|&id| Step::Enter { id, caller: None })
        .collect();
    let mut visited = 0usize;

    while let Some(step) = stack.pop() {
        let (id, caller) = match step {
            Step::Exit(frame) => {
                on_path[frame] -= 1;
                continue;
            }
            Step::Enter { id, caller } => (id, caller),
        };

        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }

        let Some(node) = arena.node(id) else { continue };
        let source = sources.source(id);
        let Some(signature) = FrameSignature::of(&node.details, source) else {
            continue;
        };

        let frame = *index.entry(signature).or_insert_with(|| {
            frames.push(FrameBuilder {
                details: node.details.clone(),
                source: source.cloned(),
                ids: Vec::new(),
                self_time: 0.0,
                total_time: 0.0,
                callees: Vec::new(),
                callers: Vec::new(),
            });
            on_path.push(0);
            frames.len() - 1
        });

        let builder = &mut frames[frame];
        builder.ids.push(id);
        builder.self_time += node.self_time(arena);
        if on_path[frame] == 0 {
            builder.total_time += node.time;
        }

        if let Some(caller) = caller {
            match edges.get(&(caller, frame)) {
                Some(&(out, inc)) => {
                    frames[caller].callees[out].time += node.time;
                    frames[frame].callers[inc].time += node.time;
                }
                None => {
                    let out = frames[caller].callees.len();
                    let inc = frames[frame].callers.len();
                    frames[caller].callees.push(FlatEdge {
                        target: frame,
                        time: node.time,
                    });
                    frames[frame].callers.push(FlatEdge {
                        target: caller,
                        time: node.time,
                    });
                    edges.insert((caller, frame), (out, inc));
                }
            }
        }

        on_path[frame] += 1;
        stack.push(Step::Exit(frame));
        for &child in node.children.iter().rev() {
            stack.push(Step::Enter {
                id: child,
                caller: Some(frame),
            });
        }
    }

    let firsts: Vec<NodeId> = frames
        .iter()
        .map(|f| f.ids.iter().copied().min().unwrap_or(NodeId::MAX))
        .collect();
    let by_weight = |a: &FlatEdge, b: &FlatEdge| {
        b.time
            .total_cmp(&a.time)
            .then_with(|| firsts[a.target].cmp(&firsts[b.target]))
    };

    let frames = frames
        .into_iter()
        .filter_map(|mut f| {
            f.callees.sort_by(by_weight);
            f.callers.sort_by(by_weight);
            Some(FlatFrame {
                ids: NodeIds::from_ids(f.ids)?,
                details: f.details,
                source: f.source,
                self_time: f.self_time,
                total_time: f.total_time,
                callees: f.callees,
                callers: f.callers,
            })
        })
        .collect();

    Ok(FlatGraph {
        thread: thread.id,
        name,
        time: thread.time,
        frames,
    })
}

/// Frames with a positive metric, heaviest first, ties by smallest id.
fn ordered_roots(graph: &FlatGraph, weighting: Weighting) -> Vec<usize> {
    let mut roots: Vec<usize> = graph
        .frames
        .iter()
        .enumerate()
        .filter(|(_, f)| f.metric(weighting) > 0.0)
        .map(|(i, _)| i)
        .collect();
    roots.sort_by(|&a, &b| {
        let (fa, fb) = (&graph.frames[a], &graph.frames[b]);
        fb.metric(weighting)
            .total_cmp(&fa.metric(weighting))
            .then_with(|| fa.ids.first().cmp(&fb.ids.first()))
    });
    roots
}
