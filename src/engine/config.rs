// Tool options.
//
// Distances are in host-mesh world units. Loaded from JSON with serde;
// fields missing from the document keep their defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutofillOptions {
    /// Brush radius. One span of a drawn side is roughly two radii long.
    pub brush_radius: f32,

    /// Stroke points within this distance of an existing vertex snap onto it.
    pub snap_dist: f32,

    /// New side endpoints within this distance of an existing vertex merge into it.
    pub merge_dist: f32,

    /// Stroke points closer than this to the previous kept point are dropped.
    pub filter_min_dist: f32,

    /// Snap both stroke ends onto existing vertices before resampling.
    pub snap_stroke: bool,

    /// A moved vertex that lands within `merge_dist` of another merges into it.
    pub automerge: bool,

    /// Pattern-generation backend.
    pub backend_url: String,
    pub patterns_path: String,
}

impl AutofillOptions {
    pub fn new() -> Self {
        Self {
            brush_radius: 0.5,
            snap_dist: 0.25,
            merge_dist: 0.05,
            filter_min_dist: 0.01,
            snap_stroke: true,
            automerge: true,
            backend_url: "http://127.0.0.1:5000".to_string(),
            patterns_path: "/get_expanded_patterns".to_string(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Full endpoint for pattern requests.
    pub fn patterns_url(&self) -> String {
        format!("{}{}", self.backend_url.trim_end_matches('/'), self.patterns_path)
    }
}

impl Default for AutofillOptions {
    fn default() -> Self {
        Self::new()
    }
}
