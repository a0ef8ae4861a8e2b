use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::arena::{NodeArena, ProfileInput};
use super::details::NodeId;
use super::source::{SourceAttribution, SourceInput};
use super::unit::SamplerMode;
use crate::config::ViewerConfig;
use crate::error::Error;
use crate::highlight::{HighlightState, UrlQuery};
use crate::node::{DirectNode, FlatNode, MergedNode, SourceNode, VirtualNode};
use crate::views::{
    AggregationError, AggregationHandle, AggregationMessage, CancelToken, RelatedSource,
    TopFunction, ViewData, Weighting, aggregate, rank_top_functions, related_sources,
    spawn_aggregation,
};

/// Identifies one load. Background results carry it so late results for an
/// unloaded profile can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Availability of the aggregated (flat and source) views.
#[derive(Debug, Clone)]
pub enum ViewState {
    Loading,
    Ready(Arc<ViewData>),
    /// Aggregation failed; the direct view is still usable.
    Unavailable(AggregationError),
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&ViewData> {
        match self {
            Self::Ready(data) => Some(data),
            _ => None,
        }
    }
}

/// One loaded profile and everything derived from it.
#[derive(Debug)]
pub struct ProfileSession {
    id: SessionId,
    arena: Arc<NodeArena>,
    sources: Arc<SourceAttribution>,
    mode: SamplerMode,
    views: ViewState,
    aggregation: Option<AggregationHandle>,
    auto_highlight_pending: bool,
}

impl ProfileSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn sources(&self) -> &SourceAttribution {
        &self.sources
    }

    pub fn mode(&self) -> SamplerMode {
        self.mode
    }

    pub fn views(&self) -> &ViewState {
        &self.views
    }

    pub fn total_time(&self) -> f64 {
        self.arena.total_time()
    }

    /// Thread roots of the direct view.
    pub fn thread_nodes(&self) -> Vec<DirectNode<'_>> {
        DirectNode::roots(&self.arena, &self.sources)
    }

    pub fn node(&self, id: NodeId) -> Option<DirectNode<'_>> {
        DirectNode::new(&self.arena, &self.sources, id)
    }

    pub fn top_functions(&self, limit: usize) -> Vec<TopFunction<'_>> {
        rank_top_functions(&self.arena, &self.sources, self.total_time(), limit)
    }

    /// Flat thread nodes, empty until the views are ready.
    pub fn flat_threads(&self, weighting: Weighting, bottom_up: bool) -> Vec<FlatNode<'_>> {
        self.views.data().map_or_else(Vec::new, |data| {
            data.flat
                .threads(weighting)
                .iter()
                .map(|thread| FlatNode::thread(thread, bottom_up))
                .collect()
        })
    }

    /// Per-thread nodes of one source in the separate sources view.
    pub fn source_threads(&self, source: &str) -> Vec<SourceNode<'_>> {
        let Some(data) = self.views.data() else {
            return Vec::new();
        };
        data.sources
            .sources_separate
            .iter()
            .find(|view| &*view.source == source)
            .map_or_else(Vec::new, |view| SourceNode::threads(&self.arena, &self.sources, view))
    }

    /// One synthetic thread per source in the merged sources view.
    pub fn merged_sources(&self) -> Vec<MergedNode<'_>> {
        self.views.data().map_or_else(Vec::new, |data| {
            data.sources.sources_merged.iter().map(MergedNode::thread).collect()
        })
    }

    /// On the first call only: if nothing is highlighted, highlight the
    /// hottest function. Returns whether the highlight changed.
    pub fn auto_highlight(&mut self, highlight: &mut HighlightState) -> bool {
        if !std::mem::take(&mut self.auto_highlight_pending) || !highlight.is_empty() {
            return false;
        }
        let Some(top) = self.top_functions(1).into_iter().next() else {
            return false;
        };
        debug!(session = %self.id, node = top.id, "highlighting hottest function");
        highlight.replace(&top.node);
        true
    }

    fn apply(&mut self, result: Result<ViewData, AggregationError>) {
        self.aggregation = None;
        self.views = match result {
            Ok(data) => {
                info!(session = %self.id, "views ready");
                ViewState::Ready(Arc::new(data))
            }
            Err(err) => {
                warn!(session = %self.id, error = %err, "views unavailable");
                ViewState::Unavailable(err)
            }
        };
    }
}

impl Drop for ProfileSession {
    fn drop(&mut self) {
        if let Some(handle) = self.aggregation.take() {
            handle.cancel();
        }
    }
}

/// Holds at most one loaded profile and receives its background results.
#[derive(Debug)]
pub struct SessionSlot {
    config: ViewerConfig,
    next_id: u64,
    active: Option<ProfileSession>,
    tx: Sender<AggregationMessage>,
    rx: Receiver<AggregationMessage>,
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl SessionSlot {
    pub fn new(config: ViewerConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            next_id: 1,
            active: None,
            tx,
            rx,
        }
    }

    /// Slot configured from a (possibly partial) JSON object.
    pub fn from_config_json(json: &str) -> Result<Self, Error> {
        Ok(Self::new(ViewerConfig::from_json(json)?))
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Restore the highlight from the configured URL parameter.
    pub fn highlight_from_url(&self, query: &impl UrlQuery) -> HighlightState {
        HighlightState::from_url(query, self.config.highlight_param.as_str())
    }

    /// Top functions of the active session, capped at the configured limit.
    pub fn top_functions(&self) -> Vec<TopFunction<'_>> {
        self.active
            .as_ref()
            .map_or_else(Vec::new, |s| s.top_functions(self.config.top_functions_limit))
    }

    pub fn related_sources<N: VirtualNode + Clone>(&self, node: &N) -> Vec<RelatedSource> {
        related_sources(node, self.config.related_sources_limit)
    }

    /// Replace the loaded profile. A malformed input leaves the current
    /// session in place.
    pub fn load(
        &mut self,
        input: &ProfileInput,
        sources: &SourceInput,
        mode: SamplerMode,
    ) -> Result<&mut ProfileSession, Error> {
        let arena = Arc::new(NodeArena::build(input)?);
        let sources = Arc::new(SourceAttribution::resolve(&arena, sources));

        self.unload();
        let id = SessionId::new(self.next_id);
        self.next_id += 1;
        info!(
            session = %id,
            nodes = arena.len(),
            threads = arena.thread_count(),
            ?mode,
            "profile loaded"
        );

        let mut session = ProfileSession {
            id,
            arena: Arc::clone(&arena),
            sources: Arc::clone(&sources),
            mode,
            views: ViewState::Loading,
            aggregation: None,
            auto_highlight_pending: self.config.auto_highlight_hottest,
        };

        if self.config.background_aggregation {
            match spawn_aggregation(id, arena, sources, self.tx.clone()) {
                Ok(handle) => session.aggregation = Some(handle),
                Err(err) => session.apply(Err(err)),
            }
        } else {
            let result = aggregate(&arena, &sources, &CancelToken::new());
            session.apply(result);
        }

        Ok(self.active.insert(session))
    }

    /// Drop the loaded profile and cancel its background pass.
    pub fn unload(&mut self) {
        if let Some(session) = self.active.take() {
            info!(session = %session.id, "profile unloaded");
        }
    }

    pub fn active(&self) -> Option<&ProfileSession> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ProfileSession> {
        self.active.as_mut()
    }

    /// Apply every finished background result without blocking. Returns
    /// whether the active session's views changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(message) => changed |= self.deliver(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    changed |= self.fail_loading(AggregationError::WorkerDisconnected);
                    break;
                }
            }
        }
        changed
    }

    /// Block until the active session's views leave `Loading` or `timeout`
    /// passes. `None` when nothing is loaded.
    pub fn wait_for_views(&mut self, timeout: Duration) -> Option<&ViewState> {
        let deadline = Instant::now() + timeout;
        while self.active.as_ref().is_some_and(|s| s.views.is_loading()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => {
                    self.deliver(message);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.fail_loading(AggregationError::WorkerDisconnected);
                }
            }
        }
        self.active.as_ref().map(|s| &s.views)
    }

    fn deliver(&mut self, message: AggregationMessage) -> bool {
        match self.active.as_mut() {
            Some(session) if session.id == message.session && session.views.is_loading() => {
                session.apply(message.result);
                true
            }
            _ => {
                debug!(session = %message.session, "discarding result for an inactive session");
                false
            }
        }
    }

    fn fail_loading(&mut self, err: AggregationError) -> bool {
        match self.active.as_mut() {
            Some(session) if session.views.is_loading() => {
                session.apply(Err(err));
                true
            }
            _ => false,
        }
    }
}
