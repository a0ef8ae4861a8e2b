use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::model::{NodeIds, SourceKey};
use crate::node::VirtualNode;

/// A source that shows up around a node, with its share of the listed total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedSource {
    pub source: SourceKey,
    pub time: f64,
    /// Fraction of the summed time of the returned entries (0..=1).
    pub share: f64,
}

/// Breadth-first walk over parents and children, visiting every id set once.
fn neighbourhood<N: VirtualNode>(start: N, mut visit: impl FnMut(&N) -> bool) {
    let mut seen: HashSet<NodeIds> = HashSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node.id()) {
            continue;
        }
        if !visit(&node) {
            return;
        }
        queue.extend(node.parents().into_iter().filter(|p| !seen.contains(&p.id())));
        queue.extend(node.children().into_iter().filter(|c| !seen.contains(&c.id())));
    }
}

/// Sources reachable from `node` other than its own, heaviest first, at
/// most `limit` of them.
pub fn related_sources<N: VirtualNode + Clone>(node: &N, limit: usize) -> Vec<RelatedSource> {
    let own = node.source();
    let mut totals: HashMap<SourceKey, f64> = HashMap::new();
    neighbourhood(node.clone(), |cur| {
        if let Some(source) = cur.source() {
            *totals.entry(source).or_default() += cur.time();
        }
        true
    });
    if let Some(own) = &own {
        totals.remove(own);
    }

    let mut entries: Vec<(SourceKey, f64)> = totals.into_iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);

    let sum: f64 = entries.iter().map(|(_, t)| t).sum();
    entries
        .into_iter()
        .map(|(source, time)| RelatedSource {
            share: if sum > 0.0 { time / sum } else { 0.0 },
            source,
            time,
        })
        .collect()
}

/// Closest node to `node` (by the same walk) that belongs to `source`.
pub fn find_representative<N: VirtualNode + Clone>(node: &N, source: &str) -> Option<N> {
    let mut found = None;
    neighbourhood(node.clone(), |cur| {
        if cur.source().is_some_and(|s| &*s == source) {
            found = Some(cur.clone());
            false
        } else {
            true
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeArena, ProfileInput, SourceAttribution, SourceInput};
    use crate::node::DirectNode;

    /// main(100) -> loop(100, core) -> [
    ///     tick(50, modA) -> cb(20, core),
    ///     draw(30, modB),
    ///     io(20, modC),
    /// ]
    fn sample() -> (NodeArena, SourceAttribution) {
        let mut input = ProfileInput::default();
        let t = input.push_thread("main", 100.0);
        let lp = input.push_frame(t, "Game", "loop", None, 100.0);
        let tick = input.push_frame(lp, "A", "tick", None, 50.0);
        input.push_frame(lp, "B", "draw", None, 30.0);
        input.push_frame(lp, "C", "io", None, 20.0);
        input.push_frame(tick, "Game", "cb", None, 20.0);
        let arena = NodeArena::build(&input).unwrap();
        // ids: main=0 loop=1 tick=2 draw=3 io=4 cb=5
        let mut sources = SourceInput::default();
        for (id, key) in [(1, "core"), (2, "moda"), (3, "modb"), (4, "modc"), (5, "core")] {
            sources.node_sources.insert(id, key.to_string());
        }
        let sources = SourceAttribution::resolve(&arena, &sources);
        (arena, sources)
    }

    #[test]
    fn related_sources_exclude_the_own_source() {
        let (arena, sources) = sample();
        let tick = DirectNode::new(&arena, &sources, 2).expect("tick missing");
        let related = related_sources(&tick, 8);
        let rows: Vec<_> = related.iter().map(|r| (&*r.source, r.time)).collect();
        assert_eq!(rows, vec![("core", 120.0), ("modb", 30.0), ("modc", 20.0)]);
        let shares: f64 = related.iter().map(|r| r.share).sum();
        assert!((shares - 1.0).abs() < 1e-9);

        let top = related_sources(&tick, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].share, 1.0);
    }

    #[test]
    fn representative_is_the_nearest_match() {
        let (arena, sources) = sample();
        let tick = DirectNode::new(&arena, &sources, 2).expect("tick missing");
        let rep = find_representative(&tick, "core");
        assert_eq!(rep.map(|n| n.arena_id()), Some(1));
        let rep = find_representative(&tick, "modc");
        assert_eq!(rep.map(|n| n.arena_id()), Some(4));
        assert!(find_representative(&tick, "missing").is_none());
    }
}
