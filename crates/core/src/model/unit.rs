use serde::{Deserialize, Serialize};

/// What the sampler measured, and therefore what node times mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SamplerMode {
    /// CPU sampling; times are milliseconds.
    #[default]
    Execution,
    /// Allocation sampling; times are bytes.
    Allocation,
}

impl SamplerMode {
    /// Format a node time for display (`12.35ms`, `1.5KB`).
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::Execution => format!("{}ms", format_time(value)),
            Self::Allocation => format_bytes_short(value),
        }
    }
}

/// Round to two decimals and drop trailing zeros: `12.0` → `12`,
/// `12.345` → `12.35`.
pub fn format_time(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Percentage with two decimals, from a ratio (`0.5` → `50.00%`).
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

const BYTE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Compact byte size with one decimal at most: `0B`, `512B`, `1.5KB`.
pub fn format_bytes_short(bytes: f64) -> String {
    if bytes.is_nan() || bytes < 0.0 {
        return "invalid".to_string();
    }
    if bytes == 0.0 {
        return "0B".to_string();
    }
    let mut index = (bytes.ln() / 1024f64.ln()).floor().max(0.0) as usize;
    index = index.min(BYTE_UNITS.len() - 1);
    let scaled = bytes / 1024f64.powi(index as i32);
    let text = format!("{:.1}", (scaled * 10.0).round() / 10.0);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}{}", BYTE_UNITS[index])
}
