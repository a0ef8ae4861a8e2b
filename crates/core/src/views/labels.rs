//! Text forms of nodes used for copying to the clipboard and for flame bars.

use crate::model::unit::{format_ratio, format_time};
use crate::model::{NodeDetails, NodeIds};
use crate::node::VirtualNode;

/// Thread name, or `Class.method` with `:line` when the line is known.
pub fn frame_label(details: &NodeDetails) -> String {
    match details {
        NodeDetails::Thread { name } => name.to_string(),
        NodeDetails::StackFrame {
            class_name,
            method_name,
            line_number: Some(line),
        } => format!("{class_name}.{method_name}:{line}"),
        NodeDetails::StackFrame {
            class_name,
            method_name,
            line_number: None,
        } => format!("{class_name}.{method_name}"),
    }
}

/// Thread name, or `Class.method()`.
pub fn flame_label(details: &NodeDetails) -> String {
    match details {
        NodeDetails::Thread { name } => name.to_string(),
        NodeDetails::StackFrame {
            class_name,
            method_name,
            ..
        } => format!("{class_name}.{method_name}()"),
    }
}

/// The path from the topmost ancestor down to `node`, one line per level,
/// indented two spaces per level:
///
/// ```text
/// Server thread — 100 ms (100.00%)
///   Server.tick — 70 ms (70.00%)
/// ```
///
/// Only the first parent is followed. Shares are relative to the topmost
/// node's time.
pub fn call_chain<N, F>(node: &N, time: F) -> String
where
    N: VirtualNode + Clone,
    F: Fn(&N) -> f64,
{
    let mut chain: Vec<N> = vec![node.clone()];
    let mut seen: Vec<NodeIds> = vec![node.id()];
    loop {
        let Some(parent) = chain.last().and_then(|n| n.parents().into_iter().next()) else {
            break;
        };
        let id = parent.id();
        if seen.contains(&id) {
            break;
        }
        seen.push(id);
        chain.push(parent);
    }
    chain.reverse();

    let root_time = chain.first().map_or(0.0, &time);
    chain
        .iter()
        .enumerate()
        .map(|(depth, n)| {
            let t = time(n);
            let ratio = if root_time != 0.0 { t / root_time } else { 0.0 };
            format!(
                "{}{} — {} ms ({})",
                "  ".repeat(depth),
                frame_label(&n.details()),
                format_time(t),
                format_ratio(ratio)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeArena, ProfileInput, SourceAttribution};
    use crate::node::{DirectNode, FlatNode};
    use crate::views::aggregator::CancelToken;
    use crate::views::flat::generate_flat_view;

    #[test]
    fn labels_render_line_numbers_only_when_known() {
        assert_eq!(frame_label(&NodeDetails::frame("a.B", "run", Some(12))), "a.B.run:12");
        assert_eq!(frame_label(&NodeDetails::frame("a.B", "run", None)), "a.B.run");
        assert_eq!(frame_label(&NodeDetails::thread("main")), "main");
        assert_eq!(flame_label(&NodeDetails::frame("a.B", "run", Some(12))), "a.B.run()");
    }

    #[test]
    fn chain_runs_from_the_thread_down() {
        let mut input = ProfileInput::default();
        let t = input.push_thread("Server thread", 100.0);
        let tick = input.push_frame(t, "Server", "tick", None, 70.0);
        input.push_frame(tick, "World", "save", Some(42), 12.5);
        let arena = NodeArena::build(&input).unwrap();
        let sources = SourceAttribution::default();
        let save = DirectNode::new(&arena, &sources, 2).unwrap();
        let text = call_chain(&save, |n: &DirectNode<'_>| n.time());
        let expected = [
            "Server thread — 100 ms (100.00%)",
            "  Server.tick — 70 ms (70.00%)",
            "    World.save:42 — 12.5 ms (12.50%)",
        ];
        assert_eq!(text, expected.join("\n"));
    }

    #[test]
    fn chain_stops_on_recursive_parents() {
        let mut input = ProfileInput::default();
        let t = input.push_thread("main", 10.0);
        let a = input.push_frame(t, "M", "fib", None, 10.0);
        input.push_frame(a, "M", "fib", None, 4.0);
        let arena = NodeArena::build(&input).unwrap();
        let flat =
            generate_flat_view(&arena, &SourceAttribution::default(), &CancelToken::new()).unwrap();
        let thread = FlatNode::thread(&flat.flat_total_time[0], false);
        let fib = thread.children()[0];
        let text = call_chain(&fib, |n: &FlatNode<'_>| n.time());
        assert_eq!(text, "M.fib — 10 ms (100.00%)");
    }
}
