//! Multi-frame agreement for continuous capture.
//!
//! A reading is reported only after the last `required` confident frames all
//! agree on the best value. The window starts over after each release.

use std::collections::VecDeque;
use tracing::debug;

use crate::model::RankedResult;

#[derive(Debug, Clone)]
pub struct ConsensusTracker {
    required: usize,
    window: VecDeque<String>,
}

impl ConsensusTracker {
    /// `frames` below 1 is treated as 1.
    pub fn new(frames: usize) -> Self {
        let required = frames.max(1);
        Self {
            required,
            window: VecDeque::with_capacity(required),
        }
    }

    pub fn required(&self) -> usize {
        self.required
    }

    /// Feeds one frame. Returns the agreed value once the window is full of
    /// identical readings. Low-confidence, implausible or empty frames are not
    /// recorded.
    pub fn observe(&mut self, result: &RankedResult, min_confidence: f32) -> Option<String> {
        let value = match &result.best {
            Some(best) if !result.implausible_fallback && best.confidence >= min_confidence => {
                best.digits_only.clone()
            }
            _ => {
                debug!("frame ignored for consensus");
                return None;
            }
        };

        self.window.push_back(value.clone());
        while self.window.len() > self.required {
            self.window.pop_front();
        }
        debug!("consensus {}/{}", self.window.len(), self.required);

        if self.window.len() == self.required && self.window.iter().all(|v| *v == value) {
            self.window.clear();
            Some(value)
        } else {
            None
        }
    }
}
