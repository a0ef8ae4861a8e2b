pub mod aggregator;
pub mod flame;
pub mod flat;
pub mod insights;
pub mod labels;
pub mod sources;
pub mod top_functions;

pub use aggregator::{
    AggregationError, AggregationHandle, AggregationMessage, CancelToken, ViewData, aggregate,
    spawn_aggregation,
};
pub use flame::{FlameGraph, FlameNode, heat_token, layout_flame, render_flame, tooltip};
pub use flat::{FlatEdge, FlatFrame, FlatGraph, FlatThread, FlatViewData, Weighting};
pub use insights::{RelatedSource, find_representative, related_sources};
pub use labels::{call_chain, flame_label, frame_label};
pub use sources::{MergedSourceNode, MergedSourceView, SourceThread, SourceView, SourcesViewData};
pub use top_functions::{TopFunction, rank_top_functions, total_self_time};
