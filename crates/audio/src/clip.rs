//! Audio clip definitions.

use serde::{Deserialize, Serialize};

/// A playable clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    /// Clip name for logs.
    pub name: String,
    /// Duration in seconds.
    pub length: f32,
    /// Encoded audio bytes (wav/ogg). Empty for silent clips.
    #[serde(default, skip_serializing)]
    pub data: Vec<u8>,
}

impl AudioClip {
    /// Clip backed by encoded audio bytes.
    pub fn new(name: impl Into<String>, length: f32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            length: length.max(0.0),
            data,
        }
    }

    /// Clip with a length but no samples; used headless and in tests.
    pub fn silent(name: impl Into<String>, length: f32) -> Self {
        Self::new(name, length, Vec::new())
    }

    /// Whether there is anything for a backend to decode.
    pub fn has_samples(&self) -> bool {
        !self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_lengths_are_clamped() {
        assert_eq!(AudioClip::silent("blip", -1.0).length, 0.0);
    }

    #[test]
    fn silent_clips_have_no_samples() {
        assert!(!AudioClip::silent("blip", 1.0).has_samples());
        assert!(AudioClip::new("blip", 1.0, vec![1, 2, 3]).has_samples());
    }
}
