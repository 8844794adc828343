//! Inference reply payloads.
//!
//! ## Wire format
//!
//! One UDP datagram holding a UTF-8 JSON document:
//!
//! ```text
//! {"predictions": [
//!     {"x": 0.5, "y": 0.5, "width": 0.2, "height": 0.4,
//!      "class": "person", "confidence": 0.91},
//!     ...
//! ]}
//! ```
//!
//! Boxes are centre-based and normalised to `[0, 1]`. Parsing is lenient:
//! a non-JSON payload, a missing `predictions` key, or a malformed entry
//! yields fewer (possibly zero) predictions, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Summary text for an empty result.
pub const NO_PREDICTIONS: &str = "No predictions";

fn unknown_class() -> String {
    "unknown".to_string()
}

// ── Prediction ───────────────────────────────────────────────────

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Box centre, normalised x.
    #[serde(default)]
    pub x: f32,
    /// Box centre, normalised y.
    #[serde(default)]
    pub y: f32,
    /// Normalised box width.
    #[serde(default)]
    pub width: f32,
    /// Normalised box height.
    #[serde(default)]
    pub height: f32,
    /// Class label.
    #[serde(rename = "class", default = "unknown_class")]
    pub class_name: String,
    /// Detector confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f32,
}

impl Prediction {
    /// Corner coordinates `(x1, y1, x2, y2)` in pixels for a frame of the
    /// given size. Values are truncated toward zero and may lie outside
    /// the frame; callers clamp.
    pub fn pixel_box(&self, frame_width: u32, frame_height: u32) -> (i64, i64, i64, i64) {
        let fw = f64::from(frame_width);
        let fh = f64::from(frame_height);
        let (x, y) = (f64::from(self.x), f64::from(self.y));
        let (half_w, half_h) = (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0);
        (
            ((x - half_w) * fw) as i64,
            ((y - half_h) * fh) as i64,
            ((x + half_w) * fw) as i64,
            ((y + half_h) * fh) as i64,
        )
    }

    /// `"person: 0.91"`.
    pub fn label(&self) -> String {
        format!("{}: {:.2}", self.class_name, self.confidence)
    }
}

// ── PredictionReply ──────────────────────────────────────────────

/// The full reply document, used by servers producing replies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionReply {
    pub predictions: Vec<Prediction>,
}

impl PredictionReply {
    /// Serialize to the JSON wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        // A struct of plain numbers and strings always serializes.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

// ── Parsing ──────────────────────────────────────────────────────

/// Decode one reply datagram. Never fails; see the module docs.
pub fn parse_predictions(data: &[u8]) -> Vec<Prediction> {
    let doc: Value = match serde_json::from_slice(data) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(bytes = data.len(), "reply is not a JSON document: {e}");
            return Vec::new();
        }
    };

    let Some(entries) = doc.get("predictions").and_then(Value::as_array) else {
        debug!("reply has no predictions array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match Prediction::deserialize(entry) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("skipping malformed prediction: {e}");
                None
            }
        })
        .collect()
}

/// One-line description, e.g. `"Found 3 objects: 2 person, 1 car"`.
///
/// Classes appear in first-seen order.
pub fn summarize(predictions: &[Prediction]) -> String {
    if predictions.is_empty() {
        return NO_PREDICTIONS.to_string();
    }

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for p in predictions {
        match counts.iter_mut().find(|(name, _)| *name == p.class_name) {
            Some((_, n)) => *n += 1,
            None => counts.push((p.class_name.as_str(), 1)),
        }
    }

    let parts: Vec<String> = counts
        .iter()
        .map(|(name, n)| format!("{n} {name}"))
        .collect();
    format!("Found {} objects: {}", predictions.len(), parts.join(", "))
}

// ── Tests ────────────────────────────────────────────────────────
