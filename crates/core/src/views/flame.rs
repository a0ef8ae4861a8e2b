//! Flame graph layout over any [`VirtualNode`] tree.
//!
//! Width is proportional to time. Children are laid out heaviest-first from
//! the parent's left edge; children that would be narrower than
//! `min_width` are dropped entirely, and the next sibling starts where the
//! last drawn one ended.

use std::sync::Arc;

use sampler_view_protocol::{Point, Rect, RenderCommand, ThemeToken};
use serde::Serialize;

use super::labels::flame_label;
use crate::config::FlameConfig;
use crate::highlight::HighlightState;
use crate::model::{NodeIds, SamplerMode};
use crate::node::VirtualNode;

/// Upper bounds (exclusive, in percent) of the heat bands below the hottest.
const HEAT_THRESHOLDS: [f64; 6] = [1.0, 5.0, 15.0, 30.0, 50.0, 75.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlameNode {
    pub name: String,
    pub value: f64,
    /// Share of the root's value, in percent.
    pub percentage: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub depth: u32,
    pub ids: NodeIds,
    pub heat: ThemeToken,
    pub children: Vec<FlameNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlameGraph {
    pub root: FlameNode,
    /// Deepest laid-out depth.
    pub max_depth: u32,
    pub config: FlameConfig,
}

/// Map a percentage to its heat band. Out-of-range values are clamped.
pub fn heat_token(percentage: f64) -> ThemeToken {
    let pct = if percentage.is_nan() { 0.0 } else { percentage.clamp(0.0, 100.0) };
    HEAT_THRESHOLDS
        .iter()
        .position(|&limit| pct < limit)
        .map_or(ThemeToken::HeatCritical, |band| ThemeToken::HEAT_BANDS[band])
}

struct Layout<'c, F> {
    time: F,
    root_value: f64,
    config: &'c FlameConfig,
    max_depth: u32,
}

impl<F> Layout<'_, F> {
    fn place<N: VirtualNode>(
        &mut self,
        node: &N,
        x: f64,
        width: f64,
        depth: u32,
        path: &mut Vec<NodeIds>,
    ) -> FlameNode
    where
        F: Fn(&N) -> f64,
    {
        let value = (self.time)(node);
        let percentage = if self.root_value > 0.0 {
            value / self.root_value * 100.0
        } else {
            0.0
        };
        let ids = node.id();
        self.max_depth = self.max_depth.max(depth);

        let mut children = Vec::new();
        if depth < self.config.max_depth {
            let mut kids: Vec<(N, f64)> = node
                .children()
                .into_iter()
                .map(|c| {
                    let t = (self.time)(&c);
                    (c, t)
                })
                .collect();
            kids.sort_by(|a, b| b.1.total_cmp(&a.1));
            let sum: f64 = kids.iter().map(|(_, t)| t).sum();

            if sum > 0.0 {
                path.push(ids.clone());
                let mut child_x = x;
                for (child, t) in &kids {
                    let child_width = width * t / sum;
                    if child_width < self.config.min_width {
                        continue;
                    }
                    let child_ids = child.id();
                    if path.contains(&child_ids) {
                        continue;
                    }
                    children.push(self.place(child, child_x, child_width, depth + 1, path));
                    child_x += child_width;
                }
                path.pop();
            }
        }

        FlameNode {
            name: flame_label(&node.details()),
            value,
            percentage,
            x,
            y: f64::from(depth) * self.config.row_height,
            width,
            depth,
            heat: heat_token(percentage),
            ids,
            children,
        }
    }
}

/// Lay out the tree below `root` across `total_width` pixels. `time` picks
/// the weight of each node (view time, self time, ...).
pub fn layout_flame<N, F>(root: &N, time: F, total_width: f64, config: &FlameConfig) -> FlameGraph
where
    N: VirtualNode,
    F: Fn(&N) -> f64,
{
    let root_value = time(root);
    let mut layout = Layout {
        time,
        root_value,
        config,
        max_depth: 0,
    };
    let mut path = Vec::new();
    let root = layout.place(root, 0.0, total_width.max(0.0), 0, &mut path);
    FlameGraph {
        root,
        max_depth: layout.max_depth,
        config: config.clone(),
    }
}

impl FlameGraph {
    /// Height needed to draw every row.
    pub fn height(&self) -> f64 {
        f64::from(self.max_depth + 1) * self.config.row_height
    }

    /// Topmost-first pre-order search for the node under `(x, y)`.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&FlameNode> {
        let bar = self.config.bar_height();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            let rect = Rect::new(node.x, node.y, node.width, bar);
            if rect.contains(Point::new(x, y)) {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Every laid-out node, pre-order.
    pub fn nodes(&self) -> Vec<&FlameNode> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Hover text: name on the first line, formatted value and share on the
/// second.
pub fn tooltip(node: &FlameNode, mode: SamplerMode) -> String {
    format!(
        "{}\n{} ({:.2}%)",
        node.name,
        mode.format_value(node.value),
        node.percentage
    )
}

/// Draw commands for a laid-out graph. Highlighted nodes get a selection
/// border.
pub fn render_flame(graph: &FlameGraph, highlight: &HighlightState) -> Vec<RenderCommand> {
    let config = &graph.config;
    let mut commands = vec![RenderCommand::BeginGroup {
        id: Arc::from("flame-graph"),
        label: Some(Arc::from("Flame Graph")),
    }];

    for node in graph.nodes() {
        let border = if highlight.contains_any(&node.ids) {
            ThemeToken::SelectionHighlight
        } else {
            ThemeToken::Border
        };
        let label = (node.width > config.label_min_width).then(|| Arc::from(node.name.as_str()));
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(node.x, node.y, node.width, config.bar_height()),
            color: node.heat,
            border_color: Some(border),
            label,
            node_id: Some(node.ids.first()),
        });
    }

    commands.push(RenderCommand::EndGroup);
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeArena, ProfileInput, SourceAttribution};
    use crate::node::{DirectNode, FlatNode};
    use crate::views::aggregator::CancelToken;
    use crate::views::flat::generate_flat_view;

    /// server(100) -> [A(70) -> [C(30)], B(30)]
    fn scenario() -> NodeArena {
        let mut input = ProfileInput::default();
        let server = input.push_thread("server", 100.0);
        let a = input.push_frame(server, "Frame", "A", None, 70.0);
        input.push_frame(server, "Frame", "B", None, 30.0);
        input.push_frame(a, "Frame", "C", None, 30.0);
        NodeArena::build(&input).unwrap()
    }

    fn graph(arena: &NodeArena, width: f64) -> FlameGraph {
        let sources = SourceAttribution::default();
        let roots = DirectNode::roots(arena, &sources);
        layout_flame(&roots[0], |n: &DirectNode<'_>| n.time(), width, &FlameConfig::default())
    }

    #[test]
    fn widths_follow_time() {
        let arena = scenario();
        let g = graph(&arena, 1000.0);
        assert_eq!(g.root.x, 0.0);
        assert_eq!(g.root.width, 1000.0);
        assert_eq!(g.root.name, "server");
        assert_eq!(g.max_depth, 2);

        let a = &g.root.children[0];
        let b = &g.root.children[1];
        assert_eq!((a.name.as_str(), a.x, a.width, a.y), ("Frame.A()", 0.0, 700.0, 24.0));
        assert_eq!((b.name.as_str(), b.x, b.width), ("Frame.B()", 700.0, 300.0));
        // an only child fills its parent
        assert_eq!(a.children[0].width, 700.0);
        assert_eq!(a.children[0].depth, 2);
        assert_eq!(a.percentage, 70.0);
        assert_eq!(a.heat, ThemeToken::HeatHigh);
        assert_eq!(b.heat, ThemeToken::HeatElevated);
    }

    #[test]
    fn narrow_children_are_culled_and_do_not_advance() {
        let mut input = ProfileInput::default();
        let t = input.push_thread("t", 1000.0);
        input.push_frame(t, "X", "big", None, 600.0);
        input.push_frame(t, "X", "tiny", None, 0.1);
        input.push_frame(t, "X", "mid", None, 399.9);
        let arena = NodeArena::build(&input).unwrap();
        let g = graph(&arena, 100.0);
        let names: Vec<_> = g.root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["X.big()", "X.mid()"]);
        let mid = &g.root.children[1];
        assert!((mid.x - 60.0).abs() < 1e-9);
    }

    #[test]
    fn recursion_cycles_are_cut() {
        let mut input = ProfileInput::default();
        let t = input.push_thread("main", 10.0);
        let a = input.push_frame(t, "M", "fib", None, 10.0);
        let b = input.push_frame(a, "M", "fib", None, 6.0);
        input.push_frame(b, "M", "fib", None, 2.0);
        let arena = NodeArena::build(&input).unwrap();
        let flat =
            generate_flat_view(&arena, &SourceAttribution::default(), &CancelToken::new()).unwrap();
        let thread = FlatNode::thread(&flat.flat_total_time[0], false);
        let g = layout_flame(&thread, |n: &FlatNode<'_>| n.time(), 100.0, &FlameConfig::default());
        assert_eq!(g.max_depth, 1);
        assert!(g.root.children[0].children.is_empty());
    }

    #[test]
    fn depth_limit_stops_layout() {
        let arena = scenario();
        let sources = SourceAttribution::default();
        let roots = DirectNode::roots(&arena, &sources);
        let config = FlameConfig {
            max_depth: 1,
            ..FlameConfig::default()
        };
        let g = layout_flame(&roots[0], |n: &DirectNode<'_>| n.time(), 100.0, &config);
        assert_eq!(g.max_depth, 1);
        assert!(g.root.children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn hit_test_finds_the_bar_under_the_cursor() {
        let arena = scenario();
        let g = graph(&arena, 1000.0);
        assert_eq!(g.hit_test(10.0, 5.0).map(|n| n.name.as_str()), Some("server"));
        assert_eq!(g.hit_test(750.0, 30.0).map(|n| n.name.as_str()), Some("Frame.B()"));
        assert_eq!(g.hit_test(100.0, 50.0).map(|n| n.name.as_str()), Some("Frame.C()"));
        // padding gap between rows
        assert!(g.hit_test(10.0, 23.0).is_none());
        assert!(g.hit_test(800.0, 50.0).is_none());
        assert!(g.hit_test(1001.0, 5.0).is_none());
    }

    #[test]
    fn heat_bands_match_thresholds() {
        let cases = [
            (0.5, ThemeToken::HeatIdle),
            (1.0, ThemeToken::HeatLow),
            (14.9, ThemeToken::HeatMild),
            (29.0, ThemeToken::HeatMedium),
            (30.0, ThemeToken::HeatElevated),
            (74.9, ThemeToken::HeatHigh),
            (75.0, ThemeToken::HeatCritical),
            (250.0, ThemeToken::HeatCritical),
            (-3.0, ThemeToken::HeatIdle),
        ];
        for (pct, token) in cases {
            assert_eq!(heat_token(pct), token, "{pct}");
        }
    }

    #[test]
    fn tooltip_uses_the_sampler_unit() {
        let arena = scenario();
        let g = graph(&arena, 1000.0);
        let a = &g.root.children[0];
        assert_eq!(tooltip(a, SamplerMode::Execution), "Frame.A()\n70ms (70.00%)");
        assert_eq!(tooltip(a, SamplerMode::Allocation), "Frame.A()\n70B (70.00%)");
    }

    #[test]
    fn render_wraps_rects_in_a_group() {
        let arena = scenario();
        let g = graph(&arena, 100.0);
        let mut highlight = HighlightState::default();
        let sources = SourceAttribution::default();
        if let Some(b) = DirectNode::new(&arena, &sources, 2) {
            highlight.replace(&b);
        }
        let commands = render_flame(&g, &highlight);
        assert_eq!(commands.len(), 6);
        assert!(matches!(commands.first(), Some(RenderCommand::BeginGroup { .. })));
        assert!(matches!(commands.last(), Some(RenderCommand::EndGroup)));

        let rects: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    node_id,
                    border_color,
                    label,
                    ..
                } => Some((*node_id, *border_color, label.is_some())),
                _ => None,
            })
            .collect();
        assert_eq!(
            rects,
            vec![
                (Some(0), Some(ThemeToken::Border), true),
                (Some(1), Some(ThemeToken::Border), true),
                (Some(3), Some(ThemeToken::Border), true),
                (Some(2), Some(ThemeToken::SelectionHighlight), false),
            ]
        );
    }
}
