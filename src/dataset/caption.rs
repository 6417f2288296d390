//! Caption augmentation: duration tags and dropout.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Suffix appended to captions of very short recordings.
pub const SHORT_TAG: &str = ", short";
/// Suffix appended to captions of recordings longer than the crop window.
pub const TRIMMED_TAG: &str = ", trimmed";

/// Probabilities and thresholds that drive caption augmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionPolicy {
    /// Duration tags apply when a uniform `[0, 1)` draw exceeds this value.
    pub tag_gate: f32,
    /// Recordings shorter than this many seconds get [`SHORT_TAG`].
    pub short_seconds: f32,
    /// Recordings longer than this many seconds get [`TRIMMED_TAG`].
    pub trimmed_seconds: f32,
    /// Probability that the final caption is replaced by an empty string.
    pub dropout_probability: f32,
}

impl Default for CaptionPolicy {
    fn default() -> Self {
        Self {
            tag_gate: 0.4,
            short_seconds: 1.0,
            trimmed_seconds: 4.0,
            dropout_probability: 0.15,
        }
    }
}

impl CaptionPolicy {
    /// Caption branch for rows without a secondary clip.
    ///
    /// Always consumes exactly one draw from `rng`.
    pub fn tag_duration<R: Rng + ?Sized>(
        &self,
        caption: String,
        total_duration: f32,
        rng: &mut R,
    ) -> String {
        let draw: f32 = rng.random();
        if draw > self.tag_gate {
            self.duration_tags(caption, total_duration)
        } else {
            caption
        }
    }

    /// Replace the caption with an empty string with `dropout_probability`.
    ///
    /// Must run after every other caption rewrite.
    pub fn apply_dropout<R: Rng + ?Sized>(&self, caption: String, rng: &mut R) -> String {
        let draw: f32 = rng.random();
        if draw < self.dropout_probability {
            String::new()
        } else {
            caption
        }
    }

    fn duration_tags(&self, mut caption: String, total_duration: f32) -> String {
        if total_duration < self.short_seconds {
            caption.push_str(SHORT_TAG);
        }
        if total_duration > self.trimmed_seconds {
            caption.push_str(TRIMMED_TAG);
        }
        caption
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("tag_gate", self.tag_gate),
            ("dropout_probability", self.dropout_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("caption.{name} must be within [0, 1], got {value}"));
            }
        }
        if !self.short_seconds.is_finite() || !self.trimmed_seconds.is_finite() {
            return Err("caption duration thresholds must be finite".to_string());
        }
        Ok(())
    }
}
