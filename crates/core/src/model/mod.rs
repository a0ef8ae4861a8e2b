pub mod arena;
pub mod details;
pub mod session;
pub mod source;
pub mod unit;

pub use arena::{ArenaError, InputNode, Node, NodeArena, ProfileInput};
pub use details::{FrameSignature, NodeDetails, NodeId, NodeIds, NodeKind};
pub use session::{ProfileSession, SessionId, SessionSlot, ViewState};
pub use source::{SourceAttribution, SourceInput, SourceKey, SourceMetadata};
pub use unit::SamplerMode;
