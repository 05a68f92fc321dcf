//! Two-handed trigger: both handles must be touched before the sequence plays.
//!
//! Contacts are sorted into a left and a right set by collider tag. Once both
//! sets are non-empty the audio clip starts and the animator trigger is
//! scheduled to fire `lead_time` seconds before the clip ends.

use crate::schedule::{Delay, Pending};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use xrscene_animation::{AnimatorId, AnimatorSet};
use xrscene_audio::{AudioMixer, SourceId};
use xrscene_core::ColliderId;

/// A collider entering or leaving the trigger volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColliderContact {
    /// Collider identity.
    pub collider: ColliderId,
    /// Collider tag.
    pub tag: String,
}

/// Configuration for a [`DualContactTrigger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualContactConfig {
    /// Animator trigger to fire.
    pub trigger_name: String,
    /// When false, the trigger re-arms once either handle is let go.
    pub play_only_once: bool,
    /// Tag identifying left-handle colliders.
    pub left_tag: String,
    /// Tag identifying right-handle colliders.
    pub right_tag: String,
    /// Seconds before the clip ends at which the animation starts.
    pub lead_time: f32,
}

impl Default for DualContactConfig {
    fn default() -> Self {
        Self {
            trigger_name: "Play".to_string(),
            play_only_once: true,
            left_tag: "LeftHandle".to_string(),
            right_tag: "RightHandle".to_string(),
            lead_time: 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DualAction {
    FireTrigger,
}

/// Delay between clip start and the animator trigger.
pub fn trigger_delay(clip_length: f32, lead_time: f32) -> f32 {
    (clip_length - lead_time).max(0.0)
}

/// Plays audio, then an animation, when both handles are in contact.
#[derive(Debug)]
pub struct DualContactTrigger {
    config: DualContactConfig,
    animator: Option<AnimatorId>,
    audio: Option<SourceId>,
    left: BTreeSet<ColliderId>,
    right: BTreeSet<ColliderId>,
    has_played: bool,
    pending: Pending<DualAction>,
}

impl DualContactTrigger {
    /// Build the trigger. Both the animator and the audio source are optional.
    pub fn new(config: DualContactConfig, animator: Option<AnimatorId>, audio: Option<SourceId>) -> Self {
        Self {
            config,
            animator,
            audio,
            left: BTreeSet::new(),
            right: BTreeSet::new(),
            has_played: false,
            pending: Pending::new(),
        }
    }

    /// A collider entered the trigger volume.
    pub fn trigger_enter(
        &mut self,
        contact: &ColliderContact,
        animators: &mut AnimatorSet,
        audio: &mut AudioMixer,
    ) {
        if contact.tag == self.config.left_tag {
            self.left.insert(contact.collider);
        } else if contact.tag == self.config.right_tag {
            self.right.insert(contact.collider);
        }
        self.try_play(animators, audio);
    }

    /// A collider left the trigger volume.
    pub fn trigger_exit(&mut self, contact: &ColliderContact) {
        if contact.tag == self.config.left_tag {
            self.left.remove(&contact.collider);
        } else if contact.tag == self.config.right_tag {
            self.right.remove(&contact.collider);
        }
        if !self.config.play_only_once && (self.left.is_empty() || self.right.is_empty()) {
            self.has_played = false;
        }
    }

    /// Per-frame update; fires the scheduled trigger when due.
    pub fn update(&mut self, animators: &mut AnimatorSet, dt: f32) {
        if let Some(DualAction::FireTrigger) = self.pending.poll(dt) {
            self.fire_trigger(animators);
        }
    }

    /// Whether the sequence has started since it was last armed.
    pub fn has_played(&self) -> bool {
        self.has_played
    }

    /// Seconds until the scheduled trigger fires.
    pub fn pending_delay(&self) -> Option<f32> {
        self.pending.remaining()
    }

    /// Number of colliders currently on each handle.
    pub fn contact_counts(&self) -> (usize, usize) {
        (self.left.len(), self.right.len())
    }

    fn try_play(&mut self, animators: &mut AnimatorSet, audio: &mut AudioMixer) {
        if self.left.is_empty() || self.right.is_empty() || self.has_played {
            return;
        }
        self.has_played = true;
        self.pending.cancel();

        let clip_length = self
            .audio
            .and_then(|source| audio.clip_length(source).map(|length| (source, length)));
        match clip_length {
            Some((source, length)) => {
                audio.play(source);
                let delay = trigger_delay(length, self.config.lead_time);
                debug!(delay, "both handles held, trigger scheduled");
                self.pending.schedule(DualAction::FireTrigger, Delay::Seconds(delay));
            }
            None => self.fire_trigger(animators),
        }
    }

    fn fire_trigger(&mut self, animators: &mut AnimatorSet) {
        if let Some(animator) = self.animator.and_then(|id| animators.get_mut(id)) {
            animator.set_trigger(&self.config.trigger_name);
        }
    }
}
