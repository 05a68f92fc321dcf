//! Audio mixer owning every playable source.

use crate::{AudioClip, AudioSettings};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Handle to a source owned by an [`AudioMixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u32);

#[cfg(feature = "rodio_backend")]
mod backend {
    use super::*;
    use anyhow::Context;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::collections::HashMap;
    use std::io::Cursor;

    /// Backend state for rodio audio.
    pub struct BackendState {
        /// Output stream (must be kept alive)
        _stream: OutputStream,
        /// Stream handle for creating sinks
        stream_handle: OutputStreamHandle,
        /// One sink per playing source
        sinks: HashMap<SourceId, Sink>,
    }

    impl BackendState {
        pub fn new() -> Result<Self> {
            let (stream, stream_handle) =
                OutputStream::try_default().context("Failed to create audio output stream")?;

            Ok(Self {
                _stream: stream,
                stream_handle,
                sinks: HashMap::new(),
            })
        }

        pub fn play(&mut self, id: SourceId, clip: &AudioClip, looping: bool, volume: f32) -> Result<()> {
            let cursor = Cursor::new(clip.data.clone());
            let source = rodio::Decoder::new(cursor).context("Failed to decode audio")?;

            let sink = Sink::try_new(&self.stream_handle).context("Failed to create audio sink")?;
            sink.set_volume(volume);
            if looping {
                sink.append(source.repeat_infinite());
            } else {
                sink.append(source);
            }

            if let Some(previous) = self.sinks.insert(id, sink) {
                previous.stop();
            }
            Ok(())
        }

        pub fn stop(&mut self, id: SourceId) {
            if let Some(sink) = self.sinks.remove(&id) {
                sink.stop();
            }
        }

        pub fn set_volume(&self, id: SourceId, volume: f32) {
            if let Some(sink) = self.sinks.get(&id) {
                sink.set_volume(volume);
            }
        }

        pub fn update(&mut self) {
            self.sinks.retain(|_, sink| !sink.empty());
        }

        pub fn stop_all(&mut self) {
            for (_, sink) in self.sinks.drain() {
                sink.stop();
            }
        }
    }
}

#[cfg(not(feature = "rodio_backend"))]
mod backend {
    use super::*;

    /// Backend state stub when rodio is not available.
    pub struct BackendState;

    impl BackendState {
        pub fn new() -> Result<Self> {
            debug!("Audio backend: stub (no rodio)");
            Ok(Self)
        }

        pub fn play(&mut self, _id: SourceId, _clip: &AudioClip, _looping: bool, _volume: f32) -> Result<()> {
            Ok(())
        }

        pub fn stop(&mut self, _id: SourceId) {}

        pub fn set_volume(&self, _id: SourceId, _volume: f32) {}

        pub fn update(&mut self) {}

        pub fn stop_all(&mut self) {}
    }
}

use backend::BackendState;

/// Playback state of one source.
#[derive(Debug, Clone)]
struct AudioSource {
    name: String,
    clip: Option<Arc<AudioClip>>,
    looping: bool,
    playing: bool,
    /// Seconds into the clip.
    cursor: f32,
}

/// Owns audio sources and drives them once per frame.
///
/// Playback time is tracked here rather than asked of the device, so clip
/// completion is deterministic even when the stub backend is active.
pub struct AudioMixer {
    backend: Option<BackendState>,
    settings: AudioSettings,
    sources: BTreeMap<SourceId, AudioSource>,
    next_id: u32,
}

impl AudioMixer {
    /// Create a mixer attached to the default output device.
    ///
    /// Falls back to a stub if audio initialization fails.
    pub fn new() -> Result<Self> {
        let backend = match BackendState::new() {
            Ok(b) => {
                debug!("Audio mixer initialized");
                Some(b)
            }
            Err(e) => {
                tracing::warn!("Failed to initialize audio: {}. Using stub.", e);
                None
            }
        };

        Ok(Self {
            backend,
            ..Self::stub()
        })
    }

    /// Create a mixer that tracks playback without producing sound.
    ///
    /// Useful for testing or headless operation.
    pub fn stub() -> Self {
        Self {
            backend: None,
            settings: AudioSettings::default(),
            sources: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Check if audio output is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Get the current audio settings.
    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Replace the audio settings and apply the new volumes to live sinks.
    pub fn update_settings(&mut self, settings: AudioSettings) {
        self.settings = settings.sanitized();
        if let Some(backend) = &self.backend {
            for (id, source) in &self.sources {
                backend.set_volume(*id, self.settings.volume_for(source.looping));
            }
        }
    }

    /// Register a new source, optionally with a clip assigned.
    pub fn add_source(&mut self, name: impl Into<String>, clip: Option<AudioClip>) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.sources.insert(
            id,
            AudioSource {
                name: name.into(),
                clip: clip.map(Arc::new),
                looping: false,
                playing: false,
                cursor: 0.0,
            },
        );
        id
    }

    /// Whether `id` refers to a registered source.
    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    /// First source with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .find(|(_, source)| source.name == name)
            .map(|(id, _)| *id)
    }

    /// Clip assigned to a source.
    pub fn clip(&self, id: SourceId) -> Option<&AudioClip> {
        self.sources.get(&id)?.clip.as_deref()
    }

    /// Length of the assigned clip in seconds.
    pub fn clip_length(&self, id: SourceId) -> Option<f32> {
        self.clip(id).map(|clip| clip.length)
    }

    /// Set whether the source loops.
    pub fn set_looping(&mut self, id: SourceId, looping: bool) {
        match self.sources.get_mut(&id) {
            Some(source) => source.looping = looping,
            None => debug!("set_looping on unknown source {:?}", id),
        }
    }

    /// Whether the source loops.
    pub fn is_looping(&self, id: SourceId) -> bool {
        self.sources.get(&id).is_some_and(|source| source.looping)
    }

    /// Whether the source is currently playing.
    pub fn is_playing(&self, id: SourceId) -> bool {
        self.sources.get(&id).is_some_and(|source| source.playing)
    }

    /// Seconds into the current clip.
    pub fn playback_position(&self, id: SourceId) -> Option<f32> {
        self.sources.get(&id).map(|source| source.cursor)
    }

    /// Start the source from the beginning of its clip.
    ///
    /// Sources without a clip stay silent.
    pub fn play(&mut self, id: SourceId) {
        let Some(source) = self.sources.get_mut(&id) else {
            debug!("play on unknown source {:?}", id);
            return;
        };
        let Some(clip) = source.clip.clone() else {
            debug!("Source {} has no clip", source.name);
            return;
        };

        source.playing = true;
        source.cursor = 0.0;
        debug!(source = %source.name, clip = %clip.name, looping = source.looping, "play");

        let volume = self.settings.volume_for(source.looping);
        if let Some(backend) = &mut self.backend {
            if clip.has_samples() {
                if let Err(e) = backend.play(id, &clip, source.looping, volume) {
                    tracing::warn!("Failed to play {}: {}", clip.name, e);
                }
            }
        }
    }

    /// Stop the source and rewind it.
    pub fn stop(&mut self, id: SourceId) {
        if let Some(source) = self.sources.get_mut(&id) {
            if source.playing {
                debug!(source = %source.name, "stop");
            }
            source.playing = false;
            source.cursor = 0.0;
        }
        if let Some(backend) = &mut self.backend {
            backend.stop(id);
        }
    }

    /// Advance playback (call once per frame).
    ///
    /// One-shot sources stop at the end of their clip; looping sources wrap.
    pub fn update(&mut self, dt: f32) {
        for source in self.sources.values_mut() {
            if !source.playing {
                continue;
            }
            let length = source.clip.as_ref().map_or(0.0, |clip| clip.length);
            source.cursor += dt;
            if source.cursor >= length {
                if source.looping && length > 0.0 {
                    source.cursor %= length;
                } else {
                    source.playing = false;
                    source.cursor = 0.0;
                }
            }
        }
        if let Some(backend) = &mut self.backend {
            backend.update();
        }
    }

    /// Number of sources currently playing.
    pub fn active_source_count(&self) -> usize {
        self.sources.values().filter(|source| source.playing).count()
    }

    /// Stop every source.
    pub fn stop_all(&mut self) {
        for source in self.sources.values_mut() {
            source.playing = false;
            source.cursor = 0.0;
        }
        if let Some(backend) = &mut self.backend {
            backend.stop_all();
        }
    }
}

impl Default for AudioMixer {
    fn default() -> Self {
        Self::stub()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_mixer() {
        let mixer = AudioMixer::stub();
        assert!(!mixer.is_available());
        assert_eq!(mixer.active_source_count(), 0);
    }

    #[test]
    fn one_shot_stops_at_clip_end() {
        let mut mixer = AudioMixer::stub();
        let id = mixer.add_source("chime", Some(AudioClip::silent("chime", 1.0)));
        mixer.play(id);
        assert!(mixer.is_playing(id));

        mixer.update(0.6);
        assert!(mixer.is_playing(id));
        mixer.update(0.6);
        assert!(!mixer.is_playing(id));
    }

    #[test]
    fn looping_source_wraps() {
        let mut mixer = AudioMixer::stub();
        let id = mixer.add_source("hum", Some(AudioClip::silent("hum", 1.0)));
        mixer.set_looping(id, true);
        mixer.play(id);
        mixer.update(1.5);
        assert!(mixer.is_playing(id));
        let position = mixer.playback_position(id).unwrap();
        assert!((position - 0.5).abs() < 1e-5);
    }

    #[test]
    fn source_without_clip_stays_silent() {
        let mut mixer = AudioMixer::stub();
        let id = mixer.add_source("empty", None);
        mixer.play(id);
        assert!(!mixer.is_playing(id));
        assert_eq!(mixer.clip_length(id), None);
    }

    #[test]
    fn settings_are_sanitized_on_update() {
        let mut mixer = AudioMixer::stub();
        mixer.update_settings(AudioSettings {
            master: 3.0,
            ..AudioSettings::default()
        });
        assert_eq!(mixer.settings().master, 1.0);
    }

    #[test]
    fn stop_rewinds() {
        let mut mixer = AudioMixer::stub();
        let id = mixer.add_source("hum", Some(AudioClip::silent("hum", 3.0)));
        mixer.play(id);
        mixer.update(1.0);
        mixer.stop(id);
        assert!(!mixer.is_playing(id));
        assert_eq!(mixer.playback_position(id), Some(0.0));
        assert_eq!(mixer.find_by_name("hum"), Some(id));
    }
}
