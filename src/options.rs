use serde::Deserialize;

/// Options for building a [`DocumentSummary`](crate::report::DocumentSummary).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOptions {
    /// Also report up/down-hill over smoothed elevations (default: true)
    #[serde(default = "default_true")]
    pub smooth_elevation: bool,

    /// Include per-segment point counts and lengths (default: true)
    #[serde(default = "default_true")]
    pub include_segments: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            smooth_elevation: true,
            include_segments: true,
        }
    }
}

fn default_true() -> bool {
    true
}
