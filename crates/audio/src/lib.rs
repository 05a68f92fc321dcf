//! Audio sources for xrscene behaviors.
//!
//! Behaviors hold [`SourceId`] handles and ask the [`AudioMixer`] to play, stop
//! and loop them. The mixer tracks playback time itself so that clip lengths
//! and looping behave the same with or without an output device.
//!
//! # Architecture
//!
//! - [`AudioMixer`] - Owns every source and the optional output backend
//! - [`AudioClip`] - Decoded-or-raw clip data plus its length in seconds
//! - [`AudioSettings`] - Master, loop and cue volumes plus mute
//!
//! # Example
//!
//! ```ignore
//! let mut audio = AudioMixer::new()?;
//! let hum = audio.add_source("ventilator", Some(AudioClip::silent("hum", 4.0)));
//! audio.set_looping(hum, true);
//! audio.play(hum);
//! audio.update(dt);
//! ```

mod clip;
mod manager;
mod settings;

pub use clip::AudioClip;
pub use manager::{AudioMixer, SourceId};
pub use settings::AudioSettings;
