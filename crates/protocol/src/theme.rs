use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
///
/// The seven `Heat*` tokens are the flame graph bands, ordered from the
/// coolest (under 1% of the root) to the hottest (75% and above).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    HeatIdle,
    HeatLow,
    HeatMild,
    HeatMedium,
    HeatElevated,
    HeatHigh,
    HeatCritical,

    Border,
    SelectionHighlight,
}

impl ThemeToken {
    /// All heat bands, coolest first.
    pub const HEAT_BANDS: [ThemeToken; 7] = [
        ThemeToken::HeatIdle,
        ThemeToken::HeatLow,
        ThemeToken::HeatMild,
        ThemeToken::HeatMedium,
        ThemeToken::HeatElevated,
        ThemeToken::HeatHigh,
        ThemeToken::HeatCritical,
    ];

    pub fn is_heat(&self) -> bool {
        Self::HEAT_BANDS.contains(self)
    }

    /// Default (dark) palette, for renderers that do not bring a theme.
    pub fn default_hex(&self) -> &'static str {
        match self {
            Self::HeatIdle => "#7eb3d5",
            Self::HeatLow => "#5cb85c",
            Self::HeatMild => "#8bc34a",
            Self::HeatMedium => "#ffc107",
            Self::HeatElevated => "#ff9800",
            Self::HeatHigh => "#ff5722",
            Self::HeatCritical => "#f44336",
            Self::Border => "#1a1d1f",
            Self::SelectionHighlight => "#448aff",
        }
    }
}
