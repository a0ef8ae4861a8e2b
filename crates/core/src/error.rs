use thiserror::Error;

use crate::config::ConfigError;
use crate::model::ArenaError;

/// Failures that abort a load or reject a configuration. Aggregation
/// failures are not here: they surface as `ViewState::Unavailable`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("arena: {0}")]
    Arena(#[from] ArenaError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
