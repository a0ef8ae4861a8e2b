use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("flame.{field} must be a positive finite number, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("highlight_param must not be empty")]
    EmptyHighlightParam,
}

/// Viewer-wide settings. Every field has a default, so a host can supply a
/// partial JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// URL query parameter holding the highlighted node ids.
    pub highlight_param: String,
    /// How many entries the top-functions list shows.
    pub top_functions_limit: usize,
    /// How many neighbouring sources the source insight lists.
    pub related_sources_limit: usize,
    /// Run flat/source aggregation on a worker thread. When false it runs
    /// inline during `load` (hosts without threads).
    pub background_aggregation: bool,
    /// Highlight the hottest function when a profile opens with no highlight.
    pub auto_highlight_hottest: bool,
    pub flame: FlameConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            highlight_param: "hl".to_string(),
            top_functions_limit: 20,
            related_sources_limit: 8,
            background_aggregation: true,
            auto_highlight_hottest: true,
            flame: FlameConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.highlight_param.is_empty() {
            return Err(ConfigError::EmptyHighlightParam);
        }
        self.flame.validate()
    }
}

/// Flame graph geometry, in logical pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlameConfig {
    pub row_height: f64,
    /// Vertical gap below each rectangle; the drawn height is
    /// `row_height - padding`.
    pub padding: f64,
    /// Children narrower than this are neither drawn nor hit-tested.
    pub min_width: f64,
    /// Rectangles narrower than this get no text label.
    pub label_min_width: f64,
    pub max_depth: u32,
}

impl Default for FlameConfig {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            padding: 2.0,
            min_width: 0.5,
            label_min_width: 30.0,
            max_depth: 1024,
        }
    }
}

impl FlameConfig {
    pub fn bar_height(&self) -> f64 {
        (self.row_height - self.padding).max(0.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("row_height", self.row_height),
            ("min_width", self.min_width),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "padding",
                value: self.padding,
            });
        }
        Ok(())
    }
}
