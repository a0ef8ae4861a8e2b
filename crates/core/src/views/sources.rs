//! Source views: the profile regrouped by the plugin, mod, or library each
//! frame ran in.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::aggregator::{AggregationError, CANCEL_CHECK_INTERVAL, CancelToken};
use crate::model::{
    FrameSignature, NodeArena, NodeDetails, NodeId, NodeIds, SourceAttribution, SourceKey,
};

/// Entry points of one source found inside one originating thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceThread {
    pub thread: NodeId,
    pub name: Arc<str>,
    /// Sum of the entry points' times.
    pub time: f64,
    /// Entry points in traversal order.
    pub roots: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceView {
    pub source: SourceKey,
    pub time: f64,
    /// Heaviest originating thread first.
    pub threads: Vec<SourceThread>,
}

/// Entry points (and their scoped descendants) merged by signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSourceNode {
    pub details: NodeDetails,
    pub ids: NodeIds,
    pub time: f64,
    pub children: Vec<MergedSourceNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSourceView {
    pub source: SourceKey,
    /// Union of every merged entry point's ids.
    pub ids: NodeIds,
    pub time: f64,
    pub roots: Vec<MergedSourceNode>,
}

impl MergedSourceView {
    /// Node at `path`, following child indices from the roots.
    pub fn node_at(&self, path: &[usize]) -> Option<&MergedSourceNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get(first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourcesViewData {
    pub sources_separate: Vec<SourceView>,
    pub sources_merged: Vec<MergedSourceView>,
}

impl SourcesViewData {
    pub fn is_empty(&self) -> bool {
        self.sources_separate.is_empty()
    }

    /// Keys of every source that has at least one entry point, in display
    /// order.
    pub fn shown_sources(&self) -> Vec<SourceKey> {
        self.sources_separate.iter().map(|s| s.source.clone()).collect()
    }
}

/// Nearest descendants of `id` whose resolved key is `key`. Frames with
/// another key are walked through.
pub fn scoped_children(
    arena: &NodeArena,
    sources: &SourceAttribution,
    id: NodeId,
    key: &str,
) -> Vec<NodeId> {
    let mut found = Vec::new();
    let Some(node) = arena.node(id) else {
        return found;
    };
    let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
    while let Some(child) = stack.pop() {
        if sources.source(child).is_some_and(|k| &**k == key) {
            found.push(child);
        } else if let Some(node) = arena.node(child) {
            stack.extend(node.children.iter().rev().copied());
        }
    }
    found
}

/// Nearest strict ancestor of `id` whose resolved key is `key`.
pub fn scoped_parent(
    arena: &NodeArena,
    sources: &SourceAttribution,
    id: NodeId,
    key: &str,
) -> Option<NodeId> {
    arena
        .ancestry(id)
        .skip(1)
        .find(|&a| sources.source(a).is_some_and(|k| &**k == key))
}

/// Build both source views. Sources are ordered by total entry time, heaviest
/// first, ties by key.
pub fn generate_sources_view(
    arena: &NodeArena,
    sources: &SourceAttribution,
    cancel: &CancelToken,
) -> Result<SourcesViewData, AggregationError> {
    if !sources.has_sources() {
        return Ok(SourcesViewData::default());
    }

    let mut by_source: HashMap<SourceKey, Vec<SourceThread>> = HashMap::new();
    let mut visited = 0usize;

    for thread in arena.threads() {
        cancel.check()?;
        let name = match &thread.details {
            NodeDetails::Thread { name } => name.clone(),
            NodeDetails::StackFrame { method_name, .. } => method_name.clone(),
        };

        // Keys present on the current path, with their depth count.
        let mut active: HashMap<SourceKey, u32> = HashMap::new();
        let mut found: Vec<(SourceKey, Vec<NodeId>)> = Vec::new();
        let mut slot: HashMap<SourceKey, usize> = HashMap::new();

        enum Step {
            Enter(NodeId),
            Exit(SourceKey),
        }
        let mut stack: Vec<Step> = thread
            .children
            .iter()
            .rev()
            .map(|&c| Step::Enter(c))
            .collect();
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Exit(key) => {
                    if let Some(count) = active.get_mut(&key) {
                        *count -= 1;
                    }
                    continue;
                }
                Step::Enter(id) => id,
            };
            visited += 1;
            if visited % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            let Some(node) = arena.node(id) else { continue };

            if let Some(key) = sources.source(id) {
                let count = active.entry(key.clone()).or_insert(0);
                if *count == 0 {
                    let at = *slot.entry(key.clone()).or_insert_with(|| {
                        found.push((key.clone(), Vec::new()));
                        found.len() - 1
                    });
                    found[at].1.push(id);
                }
                *count += 1;
                stack.push(Step::Exit(key.clone()));
            }
            for &child in node.children.iter().rev() {
                stack.push(Step::Enter(child));
            }
        }

        for (key, roots) in found {
            let time = roots
                .iter()
                .filter_map(|&r| arena.node(r))
                .map(|n| n.time)
                .sum();
            by_source.entry(key).or_default().push(SourceThread {
                thread: thread.id,
                name: name.clone(),
                time,
                roots,
            });
        }
    }

    let mut separate: Vec<SourceView> = by_source
        .into_iter()
        .map(|(source, mut threads)| {
            threads.sort_by(|a, b| b.time.total_cmp(&a.time));
            SourceView {
                time: threads.iter().map(|t| t.time).sum(),
                source,
                threads,
            }
        })
        .collect();
    separate.sort_by(|a, b| b.time.total_cmp(&a.time).then_with(|| a.source.cmp(&b.source)));

    let mut merged = Vec::with_capacity(separate.len());
    for view in &separate {
        cancel.check()?;
        let entries: Vec<NodeId> = view
            .threads
            .iter()
            .flat_map(|t| t.roots.iter().copied())
            .collect();
        let Some(ids) = NodeIds::from_ids(entries.iter().copied()) else {
            continue;
        };
        merged.push(MergedSourceView {
            source: view.source.clone(),
            ids,
            time: view.time,
            roots: merge_occurrences(arena, sources, &view.source, &entries),
        });
    }

    Ok(SourcesViewData {
        sources_separate: separate,
        sources_merged: merged,
    })
}

/// Group occurrences by signature (first-seen order), sum their times, and
/// merge their scoped children the same way. Heaviest group first.
fn merge_occurrences(
    arena: &NodeArena,
    sources: &SourceAttribution,
    key: &SourceKey,
    occurrences: &[NodeId],
) -> Vec<MergedSourceNode> {
    let mut groups: Vec<(NodeDetails, Vec<NodeId>)> = Vec::new();
    let mut slot: HashMap<FrameSignature, usize> = HashMap::new();
    for &id in occurrences {
        let Some(node) = arena.node(id) else { continue };
        let Some(signature) = FrameSignature::of(&node.details, Some(key)) else {
            continue;
        };
        let at = *slot.entry(signature).or_insert_with(|| {
            groups.push((node.details.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[at].1.push(id);
    }

    let mut nodes: Vec<MergedSourceNode> = groups
        .into_iter()
        .filter_map(|(details, ids)| {
            let time = ids
                .iter()
                .filter_map(|&i| arena.node(i))
                .map(|n| n.time)
                .sum();
            let children: Vec<NodeId> = ids
                .iter()
                .flat_map(|&i| scoped_children(arena, sources, i, key))
                .collect();
            Some(MergedSourceNode {
                children: merge_occurrences(arena, sources, key, &children),
                ids: NodeIds::from_ids(ids)?,
                details,
                time,
            })
        })
        .collect();
    nodes.sort_by(|a, b| b.time.total_cmp(&a.time));
    nodes
}
