//! Core of the sampler profile viewer.
//!
//! ```text
//!   decoded input ─▶ NodeArena ─┬─▶ DirectNode (top-down, synchronous)
//!                               └─▶ aggregation (background) ─▶ FlatViewData
//!                                                             └▶ SourcesViewData
//!   any VirtualNode ─▶ top functions / flame layout / highlight checks
//! ```

pub mod config;
pub mod error;
pub mod highlight;
pub mod model;
pub mod node;
pub mod views;

pub use config::{FlameConfig, ViewerConfig};
pub use error::Error;
pub use highlight::{HighlightState, NavState, SyncOutcome, UrlQuery};
pub use model::{
    NodeArena, NodeDetails, NodeId, NodeIds, NodeKind, ProfileInput, ProfileSession, SamplerMode,
    SessionId, SessionSlot, SourceAttribution, SourceInput, SourceKey, ViewState,
};
pub use node::{DirectNode, FlatNode, MergedNode, SourceNode, ViewNode, VirtualNode};
