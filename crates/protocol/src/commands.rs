use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::theme::ThemeToken;
use crate::types::Rect;

/// A single, stateless render instruction.
///
/// The core emits a `Vec<RenderCommand>` for each drawn view. Renderers
/// consume the list sequentially; each command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Draw a filled rectangle, optionally with a text label and the arena
    /// node id it stands for (for hit-testing / selection).
    DrawRect {
        rect: Rect,
        color: ThemeToken,
        border_color: Option<ThemeToken>,
        label: Option<Arc<str>>,
        node_id: Option<u32>,
    },

    /// Begin a logical group (e.g. one flame graph). Renderers may use this
    /// for batching or layer separation.
    BeginGroup {
        id: Arc<str>,
        label: Option<Arc<str>>,
    },

    /// End the current group.
    EndGroup,
}
