use crate::api::models::Song;
use crate::error::{AppError, AppResult};

/// The audio-capable resource the engine drives. It knows nothing about songs,
/// only sources and a clock.
pub trait AudioOutput: Send + Sync {
    /// Point the output at a new source. `duration_hint` is what the catalog
    /// reported; the output may learn the real value later.
    fn load(&mut self, url: &str, duration_hint: f64) -> AppResult<()>;
    fn play(&mut self) -> AppResult<()>;
    fn pause(&mut self);
    fn seek(&mut self, position_seconds: f64);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn position_seconds(&self) -> f64;
    /// `None` until the source's metadata has been read.
    fn duration_seconds(&self) -> Option<f64>;
    fn is_finished(&self) -> bool;
}

/// Notifications raised by the engine, each tagged with the song that was
/// loaded when it fired so late deliveries can be recognized.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    MetadataLoaded { song_id: String, duration: f64 },
    TimeUpdate { song_id: String, position: f64 },
    Ended { song_id: String },
}

impl EngineEvent {
    pub fn song_id(&self) -> &str {
        match self {
            EngineEvent::MetadataLoaded { song_id, .. }
            | EngineEvent::TimeUpdate { song_id, .. }
            | EngineEvent::Ended { song_id } => song_id,
        }
    }
}

pub struct PlaybackEngine {
    output: Box<dyn AudioOutput>,
    /// Id of the song currently loaded into the output
    loaded: Option<String>,
    /// Total duration in seconds (catalog value until metadata arrives)
    duration: f64,
    metadata_reported: bool,
    ended_reported: bool,
}

impl PlaybackEngine {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            loaded: None,
            duration: 0.0,
            metadata_reported: false,
            ended_reported: false,
        }
    }

    /// Load `song` and start it from position 0. A song without a source never
    /// reaches the output.
    pub fn load_and_play(&mut self, song: &Song) -> AppResult<()> {
        let url = song
            .playable_url()
            .ok_or_else(|| AppError::NotPlayable(song.title.clone()))?;

        log::info!("[engine] loading id={} title={}", song.id, song.title);
        self.output.load(url, song.duration_seconds)?;
        self.output.seek(0.0);
        self.output.play()?;

        self.loaded = Some(song.id.clone());
        self.duration = song.duration_seconds.max(0.0);
        self.metadata_reported = false;
        self.ended_reported = false;
        Ok(())
    }

    /// Restart the loaded song from the top.
    pub fn replay(&mut self) -> AppResult<()> {
        if self.loaded.is_none() {
            return Err(AppError::Audio("Nothing loaded to replay".into()));
        }
        self.output.seek(0.0);
        self.output.play()?;
        self.ended_reported = false;
        Ok(())
    }

    pub fn play(&mut self) -> AppResult<()> {
        if self.loaded.is_none() {
            return Ok(());
        }
        self.output.play()
    }

    pub fn pause(&mut self) {
        self.output.pause();
    }

    /// Seek within the loaded song; returns the clamped position.
    pub fn seek(&mut self, position_seconds: f64) -> f64 {
        let target = self.clamp_position(position_seconds);
        self.output.seek(target);
        if target < self.duration {
            self.ended_reported = false;
        }
        target
    }

    pub fn unload(&mut self) {
        if self.loaded.take().is_some() {
            self.output.stop();
        }
        self.duration = 0.0;
        self.metadata_reported = false;
        self.ended_reported = false;
    }

    pub fn loaded_song(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.loaded.is_some() && self.output.is_playing()
    }

    pub fn current_time(&self) -> f64 {
        if self.loaded.is_none() {
            return 0.0;
        }
        self.clamp_position(self.output.position_seconds())
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    fn clamp_position(&self, position: f64) -> f64 {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }

    /// Read the output and turn its state into events. Metadata and ended are
    /// reported once per load; time updates are reported while playing.
    pub fn poll(&mut self) -> Vec<EngineEvent> {
        let Some(song_id) = self.loaded.clone() else {
            return Vec::new();
        };
        let mut events = Vec::new();

        if !self.metadata_reported {
            if let Some(duration) = self.output.duration_seconds() {
                self.metadata_reported = true;
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
                events.push(EngineEvent::MetadataLoaded {
                    song_id: song_id.clone(),
                    duration: self.duration,
                });
            }
        }

        if self.output.is_playing() {
            events.push(EngineEvent::TimeUpdate {
                song_id: song_id.clone(),
                position: self.current_time(),
            });
        }

        if self.output.is_finished() && !self.ended_reported {
            self.ended_reported = true;
            events.push(EngineEvent::Ended { song_id });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::simulated::SimulatedOutput;

    fn playable(id: &str) -> Song {
        Song::new(id, id.to_uppercase())
            .with_file_url(format!("https://cdn/{}.mp3", id))
            .with_duration(180.0)
    }

    #[test]
    fn unplayable_song_never_reaches_output() {
        let output = SimulatedOutput::new();
        let handle = output.handle();
        let mut engine = PlaybackEngine::new(Box::new(output));

        let result = engine.load_and_play(&Song::new("x", "No Source"));
        assert!(matches!(result, Err(AppError::NotPlayable(_))));
        assert!(handle.loads().is_empty());
        assert!(engine.loaded_song().is_none());
    }

    #[test]
    fn load_starts_from_zero_and_plays() {
        let output = SimulatedOutput::new();
        let handle = output.handle();
        let mut engine = PlaybackEngine::new(Box::new(output));

        engine.load_and_play(&playable("a")).unwrap();
        assert_eq!(handle.loads(), vec!["https://cdn/a.mp3".to_string()]);
        assert!(engine.is_playing());
        assert!(engine.current_time() < 1.0);
        assert_eq!(engine.loaded_song(), Some("a"));
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let mut engine = PlaybackEngine::new(Box::new(SimulatedOutput::new()));
        engine.load_and_play(&playable("a")).unwrap();
        assert_eq!(engine.seek(500.0), 180.0);
        assert_eq!(engine.seek(-3.0), 0.0);
    }

    #[test]
    fn ended_is_reported_once_per_load() {
        let output = SimulatedOutput::new();
        let handle = output.handle();
        let mut engine = PlaybackEngine::new(Box::new(output));
        engine.load_and_play(&playable("a")).unwrap();

        handle.finish();
        let events = engine.poll();
        assert!(events.contains(&EngineEvent::Ended {
            song_id: "a".into()
        }));
        assert!(!engine
            .poll()
            .iter()
            .any(|e| matches!(e, EngineEvent::Ended { .. })));
    }

    #[test]
    fn metadata_updates_duration() {
        let output = SimulatedOutput::new();
        let handle = output.handle();
        let mut engine = PlaybackEngine::new(Box::new(output));
        engine.load_and_play(&playable("a")).unwrap();

        handle.set_metadata_duration(200.0);
        let events = engine.poll();
        assert_eq!(
            events[0],
            EngineEvent::MetadataLoaded {
                song_id: "a".into(),
                duration: 200.0
            }
        );
        assert_eq!(engine.duration(), 200.0);
    }
}
