//! Background computation of the flat and sources views.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::flat::{FlatViewData, generate_flat_view};
use super::sources::{SourcesViewData, generate_sources_view};
use crate::model::{NodeArena, SessionId, SourceAttribution};

/// Traversals poll the cancellation flag once per this many visited nodes.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 4096;

const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    #[error("aggregation was cancelled")]
    Cancelled,
    #[error("aggregation worker panicked: {0}")]
    Panicked(String),
    #[error("aggregation worker could not be started: {0}")]
    Spawn(String),
    #[error("aggregation worker went away without a result")]
    WorkerDisconnected,
}

/// Shared flag telling an in-flight aggregation pass to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), AggregationError> {
        if self.is_cancelled() {
            Err(AggregationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything the aggregation pass produces for one profile.
#[derive(Debug, Clone, Default)]
pub struct ViewData {
    pub flat: FlatViewData,
    pub sources: SourcesViewData,
}

/// Result of one background pass, tagged with the session that asked for it.
#[derive(Debug)]
pub struct AggregationMessage {
    pub session: SessionId,
    pub result: Result<ViewData, AggregationError>,
}

/// Build both aggregated views synchronously.
pub fn aggregate(
    arena: &NodeArena,
    sources: &SourceAttribution,
    cancel: &CancelToken,
) -> Result<ViewData, AggregationError> {
    let started = Instant::now();
    let flat = generate_flat_view(arena, sources, cancel)?;
    let sources_view = generate_sources_view(arena, sources, cancel)?;
    debug!(
        threads = flat.flat_total_time.len(),
        sources = sources_view.sources_merged.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "aggregated flat and source views"
    );
    Ok(ViewData {
        flat,
        sources: sources_view,
    })
}

/// Handle to an in-flight background pass. Dropping it does not stop the
/// worker; call [`AggregationHandle::cancel`].
#[derive(Debug)]
pub struct AggregationHandle {
    session: SessionId,
    cancel: CancelToken,
}

impl AggregationHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Run [`aggregate`] on a worker thread and send the tagged result to `tx`.
///
/// A panic inside the pass is reported as [`AggregationError::Panicked`]
/// instead of tearing down the host.
pub fn spawn_aggregation(
    session: SessionId,
    arena: Arc<NodeArena>,
    sources: Arc<SourceAttribution>,
    tx: Sender<AggregationMessage>,
) -> Result<AggregationHandle, AggregationError> {
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    info!(%session, nodes = arena.len(), "starting background aggregation");
    thread::Builder::new()
        .name(format!("aggregate-{session}"))
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                aggregate(&arena, &sources, &worker_cancel)
            }));
            let result = outcome.unwrap_or_else(|payload| {
                Err(AggregationError::Panicked(panic_message(payload.as_ref())))
            });
            if let Err(err) = &result {
                warn!(%session, error = %err, "background aggregation failed");
            }
            if tx.send(AggregationMessage { session, result }).is_err() {
                debug!(%session, "aggregation result dropped, receiver is gone");
            }
        })
        .map_err(|e| AggregationError::Spawn(e.to_string()))?;

    Ok(AggregationHandle { session, cancel })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::model::{ProfileInput, SourceInput};

    fn arena() -> NodeArena {
        let mut input = ProfileInput::default();
        let t = input.push_thread("main", 10.0);
        let f = input.push_frame(t, "Main", "run", None, 10.0);
        input.push_frame(f, "Main", "work", None, 6.0);
        NodeArena::build(&input).unwrap()
    }

    #[test]
    fn cancelled_token_stops_the_pass() {
        let arena = arena();
        let sources = SourceAttribution::resolve(&arena, &SourceInput::default());
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            aggregate(&arena, &sources, &cancel).err(),
            Some(AggregationError::Cancelled)
        );
    }

    #[test]
    fn worker_sends_a_tagged_result() {
        let arena = Arc::new(arena());
        let sources = Arc::new(SourceAttribution::resolve(&arena, &SourceInput::default()));
        let (tx, rx) = mpsc::channel();
        let session = SessionId::new(7);
        let handle = spawn_aggregation(session, arena, sources, tx);
        assert_eq!(handle.as_ref().map(AggregationHandle::session).ok(), Some(session));

        let message = rx.recv_timeout(Duration::from_secs(10));
        let message = message.unwrap();
        assert_eq!(message.session, session);
        let views = message.result.unwrap();
        assert_eq!(views.flat.flat_total_time.len(), 1);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
