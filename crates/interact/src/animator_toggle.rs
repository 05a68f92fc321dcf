//! Toggle an animator and a looping audio source together.
//!
//! Usually wired to a push button's press edge.

use serde::{Deserialize, Serialize};
use tracing::debug;
use xrscene_animation::{AnimatorId, AnimatorSet};
use xrscene_audio::{AudioMixer, SourceId};

/// How the toggle drives its animator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnimatorDrive {
    /// Fire `start` when switching on and `stop` when switching off.
    Triggers {
        /// Trigger fired when switching on.
        start: String,
        /// Trigger fired when switching off.
        stop: String,
    },
    /// Mirror the state into a boolean parameter.
    BoolParam {
        /// Parameter name.
        name: String,
    },
    /// Leave the animator alone; only audio follows the state.
    None,
}

impl Default for AnimatorDrive {
    fn default() -> Self {
        Self::Triggers {
            start: "Animation Start".to_string(),
            stop: "Animation Stop".to_string(),
        }
    }
}

/// Configuration for an [`AnimatorToggle`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    /// Animator drive mode.
    pub drive: AnimatorDrive,
}

/// On/off switch for an animation plus its looping sound.
#[derive(Debug)]
pub struct AnimatorToggle {
    config: ToggleConfig,
    animator: Option<AnimatorId>,
    loop_audio: Option<SourceId>,
    playing: bool,
}

impl AnimatorToggle {
    /// Build a toggle. Without an animator every entry point does nothing.
    pub fn new(config: ToggleConfig, animator: Option<AnimatorId>, loop_audio: Option<SourceId>) -> Self {
        Self {
            config,
            animator,
            loop_audio,
            playing: false,
        }
    }

    /// Flip between playing and stopped.
    pub fn toggle(&mut self, animators: &mut AnimatorSet, audio: &mut AudioMixer) {
        let next = !self.playing;
        self.apply(animators, audio, next);
    }

    /// Force the playing state.
    pub fn start(&mut self, animators: &mut AnimatorSet, audio: &mut AudioMixer) {
        self.apply(animators, audio, true);
    }

    /// Force the stopped state.
    pub fn stop(&mut self, animators: &mut AnimatorSet, audio: &mut AudioMixer) {
        self.apply(animators, audio, false);
    }

    /// Whether the toggle is currently on.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn apply(&mut self, animators: &mut AnimatorSet, audio: &mut AudioMixer, playing: bool) {
        let Some(animator) = self.animator.and_then(|id| animators.get_mut(id)) else {
            debug!("animator toggle has no animator");
            return;
        };
        self.playing = playing;

        match &self.config.drive {
            AnimatorDrive::BoolParam { name } => animator.set_bool(name, playing),
            AnimatorDrive::Triggers { start, stop } => {
                animator.set_trigger(if playing { start.as_str() } else { stop.as_str() });
            }
            AnimatorDrive::None => {}
        }

        let Some(source) = self.loop_audio else {
            return;
        };
        audio.set_looping(source, true);
        if playing {
            if !audio.is_playing(source) {
                audio.play(source);
            }
        } else {
            audio.stop(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrscene_animation::{Animator, AnimatorCommand};
    use xrscene_audio::AudioClip;

    fn setup() -> (AnimatorSet, AnimatorId, AudioMixer, SourceId) {
        let mut animators = AnimatorSet::new();
        let fan = animators.add(Animator::new("fan"));
        let mut audio = AudioMixer::stub();
        let hum = audio.add_source("hum", Some(AudioClip::silent("hum", 2.0)));
        (animators, fan, audio, hum)
    }

    #[test]
    fn triggers_alternate_and_audio_follows() {
        let (mut animators, fan, mut audio, hum) = setup();
        let mut toggle = AnimatorToggle::new(ToggleConfig::default(), Some(fan), Some(hum));

        toggle.toggle(&mut animators, &mut audio);
        assert!(toggle.is_playing());
        assert!(audio.is_playing(hum));
        assert!(audio.is_looping(hum));
        assert!(animators.get(fan).unwrap().is_trigger_set("Animation Start"));

        toggle.toggle(&mut animators, &mut audio);
        assert!(!toggle.is_playing());
        assert!(!audio.is_playing(hum));
        assert!(animators.get(fan).unwrap().is_trigger_set("Animation Stop"));
    }

    #[test]
    fn bool_param_mode_mirrors_state() {
        let (mut animators, fan, mut audio, _) = setup();
        let config = ToggleConfig {
            drive: AnimatorDrive::BoolParam {
                name: "IsPlaying".into(),
            },
        };
        let mut toggle = AnimatorToggle::new(config, Some(fan), None);
        toggle.start(&mut animators, &mut audio);
        assert!(animators.get(fan).unwrap().get_bool("IsPlaying"));
        toggle.stop(&mut animators, &mut audio);
        assert!(!animators.get(fan).unwrap().get_bool("IsPlaying"));
        assert_eq!(
            animators.get(fan).unwrap().commands().last(),
            Some(&AnimatorCommand::SetBool {
                name: "IsPlaying".into(),
                value: false
            })
        );
    }

    #[test]
    fn start_does_not_restart_playing_audio() {
        let (mut animators, fan, mut audio, hum) = setup();
        let mut toggle = AnimatorToggle::new(ToggleConfig::default(), Some(fan), Some(hum));
        toggle.start(&mut animators, &mut audio);
        audio.update(0.5);
        toggle.start(&mut animators, &mut audio);
        assert!((audio.playback_position(hum).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_animator_is_a_no_op() {
        let (mut animators, _, mut audio, hum) = setup();
        let mut toggle = AnimatorToggle::new(ToggleConfig::default(), None, Some(hum));
        toggle.toggle(&mut animators, &mut audio);
        assert!(!toggle.is_playing());
        assert!(!audio.is_playing(hum));
    }

    #[test]
    fn drive_deserializes_from_tagged_table() {
        let config: ToggleConfig =
            serde_json::from_str(r#"{"drive":{"mode":"bool_param","name":"On"}}"#).unwrap();
        assert_eq!(config.drive, AnimatorDrive::BoolParam { name: "On".into() });
    }
}
