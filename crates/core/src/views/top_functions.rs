use std::sync::Arc;

use serde::Serialize;

use crate::model::{NodeArena, NodeDetails, NodeId, SourceAttribution, SourceKey};
use crate::node::DirectNode;

/// A frame ranked by its own (exclusive) time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFunction<'a> {
    #[serde(skip)]
    pub node: DirectNode<'a>,
    pub id: NodeId,
    pub time: f64,
    pub self_time: f64,
    pub percentage: f64,
    pub name: String,
    pub class_name: Arc<str>,
    pub method_name: Arc<str>,
    pub source: Option<SourceKey>,
}

/// Rank stack frames by self time, heaviest first, ties by arena id.
///
/// Frames without positive self time are left out. `percentage` is relative
/// to `total_sampled_time` and is zero when that total is zero.
pub fn rank_top_functions<'a>(
    arena: &'a NodeArena,
    sources: &'a SourceAttribution,
    total_sampled_time: f64,
    limit: usize,
) -> Vec<TopFunction<'a>> {
    let mut ranked: Vec<TopFunction<'a>> = arena
        .stack_frames()
        .iter()
        .filter(|node| node.time > 0.0)
        .filter_map(|node| {
            let NodeDetails::StackFrame {
                class_name,
                method_name,
                ..
            } = &node.details
            else {
                return None;
            };
            let self_time = node.self_time(arena);
            if self_time <= 0.0 {
                return None;
            }
            let percentage = if total_sampled_time > 0.0 {
                self_time / total_sampled_time * 100.0
            } else {
                0.0
            };
            Some(TopFunction {
                node: DirectNode::new(arena, sources, node.id)?,
                id: node.id,
                time: node.time,
                self_time,
                percentage,
                name: display_name(class_name, method_name),
                class_name: class_name.clone(),
                method_name: method_name.clone(),
                source: sources.source(node.id).cloned(),
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.self_time.total_cmp(&a.self_time).then_with(|| a.id.cmp(&b.id)));
    ranked.truncate(limit);
    ranked
}

/// Sum of every frame's clamped self time.
pub fn total_self_time(arena: &NodeArena) -> f64 {
    arena.stack_frames().iter().map(|n| n.self_time(arena)).sum()
}

/// `Class.method`, or whichever half is present, or `Unknown`.
fn display_name(class_name: &str, method_name: &str) -> String {
    match (class_name.is_empty(), method_name.is_empty()) {
        (false, false) => format!("{class_name}.{method_name}"),
        (false, true) => class_name.to_string(),
        (true, false) => method_name.to_string(),
        (true, true) => "Unknown".to_string(),
    }
}
