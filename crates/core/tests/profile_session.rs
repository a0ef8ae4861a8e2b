//! End-to-end scenarios: load a profile, wait for the aggregated views, and
//! drive ranking, flame layout, and highlighting the way a viewer host does.

use std::collections::BTreeMap;
use std::time::Duration;

use sampler_view_core::views::{
    Weighting, call_chain, find_representative, layout_flame, related_sources, render_flame,
    tooltip,
};
use sampler_view_core::{
    FlameConfig, HighlightState, NodeDetails, NodeIds, ProfileInput, SamplerMode, SessionSlot,
    SourceInput, SyncOutcome, ViewNode, ViewState, ViewerConfig, VirtualNode,
};

/// server(100) -> [A(70) -> [C(30)], B(30)]
fn scenario() -> ProfileInput {
    let mut input = ProfileInput::default();
    let server = input.push_thread("server", 100.0);
    let a = input.push_frame(server, "Frame", "A", None, 70.0);
    input.push_frame(server, "Frame", "B", None, 30.0);
    input.push_frame(a, "Frame", "C", None, 30.0);
    input
}

fn loaded(input: &ProfileInput, sources: &SourceInput) -> SessionSlot {
    let mut slot = SessionSlot::default();
    slot.load(input, sources, SamplerMode::Execution).expect("load failed");
    let state = slot.wait_for_views(Duration::from_secs(10));
    assert!(matches!(state, Some(ViewState::Ready(_))), "views not ready: {state:?}");
    slot
}

#[test]
fn scenario_ranks_the_two_hottest_functions() {
    let slot = loaded(&scenario(), &SourceInput::default());
    let session = slot.active().expect("no session");

    let arena = session.arena();
    let names: Vec<_> = arena
        .nodes()
        .iter()
        .map(|n| match &n.details {
            NodeDetails::Thread { name } => name.to_string(),
            NodeDetails::StackFrame { method_name, .. } => method_name.to_string(),
        })
        .collect();
    assert_eq!(names, vec!["server", "A", "B", "C"]);

    let top = session.top_functions(2);
    let rows: Vec<_> = top.iter().map(|t| (t.name.as_str(), t.self_time, t.percentage)).collect();
    assert_eq!(rows, vec![("Frame.A", 40.0, 40.0), ("Frame.B", 30.0, 30.0)]);
    assert_eq!(top[0].node.arena_id(), 1);
}

#[test]
fn zero_threads_give_empty_views() {
    let slot = loaded(&ProfileInput::default(), &SourceInput::default());
    let session = slot.active().expect("no session");
    assert!(session.top_functions(20).is_empty());
    assert!(session.thread_nodes().is_empty());
    assert!(session.flat_threads(Weighting::SelfTime, false).is_empty());
    assert!(session.flat_threads(Weighting::TotalTime, true).is_empty());
    assert!(session.merged_sources().is_empty());
    let data = session.views().data();
    assert!(data.is_some_and(|d| d.sources.is_empty()));
}

#[test]
fn self_and_total_weighting_are_independent_of_direction() {
    // main(100) -> work(100) -> [hash(60), io(40) -> hash(10)]
    let mut input = ProfileInput::default();
    let t = input.push_thread("main", 100.0);
    let work = input.push_frame(t, "App", "work", None, 100.0);
    input.push_frame(work, "Crypto", "hash", None, 60.0);
    let io = input.push_frame(work, "Net", "io", None, 40.0);
    input.push_frame(io, "Crypto", "hash", None, 10.0);
    let slot = loaded(&input, &SourceInput::default());
    let session = slot.active().expect("no session");

    let roots = |weighting, bottom_up| -> Vec<(NodeDetails, f64)> {
        session.flat_threads(weighting, bottom_up)[0]
            .children()
            .iter()
            .map(|n| (n.details(), n.time()))
            .collect()
    };
    let hash = NodeDetails::frame("Crypto", "hash", None);
    let io = NodeDetails::frame("Net", "io", None);
    let work = NodeDetails::frame("App", "work", None);

    // The metric decides the roots; direction does not.
    let by_self = vec![(hash.clone(), 70.0), (io.clone(), 30.0)];
    let by_total = vec![(work.clone(), 100.0), (hash.clone(), 70.0), (io.clone(), 40.0)];
    assert_eq!(roots(Weighting::SelfTime, false), by_self);
    assert_eq!(roots(Weighting::SelfTime, true), by_self);
    assert_eq!(roots(Weighting::TotalTime, false), by_total);
    assert_eq!(roots(Weighting::TotalTime, true), by_total);

    // Direction decides the edges; the metric does not.
    for weighting in [Weighting::SelfTime, Weighting::TotalTime] {
        let thread = session.flat_threads(weighting, true)[0];
        let hash_node = thread.children()[usize::from(weighting == Weighting::TotalTime)];
        let callers: Vec<_> = hash_node
            .children()
            .iter()
            .map(|n| (n.details(), n.time()))
            .collect();
        assert_eq!(callers, vec![(work.clone(), 60.0), (io.clone(), 10.0)]);

        let thread = session.flat_threads(weighting, false)[0];
        let hash_node = thread.children()[usize::from(weighting == Weighting::TotalTime)];
        assert!(hash_node.children().is_empty());
    }
}

#[test]
fn sources_are_navigable_through_the_session() {
    let mut input = ProfileInput::default();
    let t = input.push_thread("Server thread", 100.0);
    let tick = input.push_frame(t, "Server", "tick", None, 100.0);
    let plugin = input.push_frame(tick, "Plugin", "onTick", None, 60.0);
    input.push_frame(tick, "Server", "save", None, 40.0);
    input.push_frame(plugin, "Plugin", "work", None, 45.0);
    // ids: thread=0 tick=1 onTick=2 save=3 work=4
    let mut sources = SourceInput::default();
    sources.node_sources.insert(1, "Core".to_string());
    sources.node_sources.insert(2, "MyPlugin".to_string());

    let slot = loaded(&input, &sources);
    let session = slot.active().expect("no session");
    let merged = session.merged_sources();
    let keys: Vec<_> = merged.iter().map(|m| m.details()).collect();
    assert_eq!(keys, vec![NodeDetails::thread("core"), NodeDetails::thread("myplugin")]);

    let separate = session.source_threads("myplugin");
    assert_eq!(separate.len(), 1);
    let entry = &separate[0].children()[0];
    assert_eq!(entry.id(), NodeIds::single(2));
    assert_eq!(entry.children()[0].id(), NodeIds::single(4));

    let work = session.node(4).expect("node 4 missing");
    let related = related_sources(&work, 8);
    assert_eq!(related.len(), 1);
    assert_eq!(&*related[0].source, "core");
    let rep = find_representative(&work, "core");
    assert_eq!(rep.map(|n| n.arena_id()), Some(1));
}

#[test]
fn highlight_flows_from_ranking_to_url_and_flame() {
    let mut slot = SessionSlot::new(ViewerConfig {
        background_aggregation: false,
        ..ViewerConfig::default()
    });
    let session = slot
        .load(&scenario(), &SourceInput::default(), SamplerMode::Execution)
        .expect("load failed");

    let mut url: BTreeMap<String, String> = BTreeMap::new();
    let mut highlight = HighlightState::from_url(&url, "hl");
    assert!(session.auto_highlight(&mut highlight));
    assert_eq!(highlight.sync(&mut url), SyncOutcome::Written);
    assert_eq!(url.get("hl").map(String::as_str), Some("1"));

    let root = ViewNode::from(session.thread_nodes()[0]);
    assert!(highlight.check(&root));
    let graph = layout_flame(&root, |n: &ViewNode<'_>| n.time(), 600.0, &FlameConfig::default());
    let a = &graph.root.children[0];
    assert_eq!(tooltip(a, session.mode()), "Frame.A()\n70ms (70.00%)");

    let selected: Vec<_> = render_flame(&graph, &highlight)
        .into_iter()
        .filter_map(|c| match c {
            sampler_view_protocol::RenderCommand::DrawRect {
                node_id,
                border_color: Some(sampler_view_protocol::ThemeToken::SelectionHighlight),
                ..
            } => node_id,
            _ => None,
        })
        .collect();
    assert_eq!(selected, vec![1]);

    let c = session.node(3).expect("node 3 missing");
    assert_eq!(
        call_chain(&c, |n: &sampler_view_core::DirectNode<'_>| n.time()),
        "server — 100 ms (100.00%)\n  Frame.A — 70 ms (70.00%)\n    Frame.C — 30 ms (30.00%)"
    );
}

#[test]
fn silent_replace_then_unrelated_mutation() {
    let mut slot = SessionSlot::new(ViewerConfig {
        background_aggregation: false,
        ..ViewerConfig::default()
    });
    let session = slot
        .load(&scenario(), &SourceInput::default(), SamplerMode::Execution)
        .expect("load failed");
    let b = session.node(2).unwrap();
    let c = session.node(3).unwrap();

    let mut url: BTreeMap<String, String> = BTreeMap::new();
    let mut highlight = HighlightState::default();
    highlight.replace_silently(&b);
    assert_eq!(highlight.sync(&mut url), SyncOutcome::Skipped);
    assert!(url.is_empty());

    highlight.toggle(&c);
    assert_eq!(highlight.sync(&mut url), SyncOutcome::Written);
    assert_eq!(url.get("hl").map(String::as_str), Some("2,3"));
}
