//! Mixer volumes.

use serde::{Deserialize, Serialize};

/// Volume levels, split between looping beds and one-shot cues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master volume (0.0 to 1.0)
    pub master: f32,
    /// Looping sources such as machine hum (0.0 to 1.0)
    pub loops: f32,
    /// One-shot cues such as a charge-up sound (0.0 to 1.0)
    pub cues: f32,
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            loops: 1.0,
            cues: 1.0,
            muted: false,
        }
    }
}

impl AudioSettings {
    /// Output gain for a source, by whether it loops.
    pub fn volume_for(&self, looping: bool) -> f32 {
        if self.muted {
            return 0.0;
        }
        let channel = if looping { self.loops } else { self.cues };
        (self.master * channel).clamp(0.0, 1.0)
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Clamp every level into range; used after loading from a file.
    pub fn sanitized(self) -> Self {
        let level = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 };
        Self {
            master: level(self.master),
            loops: level(self.loops),
            cues: level(self.cues),
            muted: self.muted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loops_and_cues_scale_independently() {
        let settings = AudioSettings {
            master: 0.5,
            loops: 0.4,
            cues: 1.0,
            muted: false,
        };
        assert!((settings.volume_for(true) - 0.2).abs() < 1e-6);
        assert!((settings.volume_for(false) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mute_silences_everything() {
        let mut settings = AudioSettings::default();
        settings.toggle_mute();
        assert_eq!(settings.volume_for(true), 0.0);
        assert_eq!(settings.volume_for(false), 0.0);
    }

    #[test]
    fn sanitized_clamps_out_of_range_levels() {
        let settings = AudioSettings {
            master: 1.5,
            loops: -0.5,
            cues: f32::NAN,
            muted: false,
        }
        .sanitized();
        assert_eq!(settings.master, 1.0);
        assert_eq!(settings.loops, 0.0);
        assert_eq!(settings.cues, 1.0);
    }
}
