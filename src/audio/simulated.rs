//! A clock-driven stand-in for a real audio device. It advances position in
//! real time while playing and reports itself finished at the end of the
//! source's duration. Used by the headless binary and by tests, which can
//! reach into its state through a [`SimulatedHandle`].

use crate::audio::engine::AudioOutput;
use crate::error::{AppError, AppResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

#[derive(Debug, Default)]
struct SimState {
    source: Option<String>,
    duration: Option<f64>,
    /// Position at the last pause/seek
    base_position: f64,
    /// Set while playing
    resumed_at: Option<Instant>,
    forced_finish: bool,
    loads: Vec<String>,
    fail_next_load: Option<String>,
}

impl SimState {
    fn position(&self) -> f64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let position = self.base_position + running;
        match self.duration {
            Some(d) if d > 0.0 => position.min(d),
            _ => position,
        }
    }

    fn freeze(&mut self) {
        self.base_position = self.position();
        self.resumed_at = None;
    }
}

pub struct SimulatedOutput {
    state: Arc<Mutex<SimState>>,
}

/// Shared view into a [`SimulatedOutput`] after it has been boxed into an engine.
#[derive(Clone)]
pub struct SimulatedHandle {
    state: Arc<Mutex<SimState>>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for SimulatedOutput {
    fn load(&mut self, url: &str, duration_hint: f64) -> AppResult<()> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.fail_next_load.take() {
            return Err(AppError::Audio(reason));
        }
        state.source = Some(url.to_string());
        state.duration = (duration_hint > 0.0).then_some(duration_hint);
        state.base_position = 0.0;
        state.resumed_at = None;
        state.forced_finish = false;
        state.loads.push(url.to_string());
        Ok(())
    }

    fn play(&mut self) -> AppResult<()> {
        let mut state = lock(&self.state);
        if state.source.is_none() {
            return Err(AppError::Audio("No source loaded".into()));
        }
        if state.resumed_at.is_none() {
            state.resumed_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        lock(&self.state).freeze();
    }

    fn seek(&mut self, position_seconds: f64) {
        let mut state = lock(&self.state);
        let playing = state.resumed_at.is_some();
        state.base_position = position_seconds.max(0.0);
        state.resumed_at = playing.then(Instant::now);
        state.forced_finish = false;
    }

    fn stop(&mut self) {
        let mut state = lock(&self.state);
        state.source = None;
        state.duration = None;
        state.base_position = 0.0;
        state.resumed_at = None;
        state.forced_finish = false;
    }

    fn is_playing(&self) -> bool {
        let state = lock(&self.state);
        state.resumed_at.is_some() && !state.forced_finish
    }

    fn position_seconds(&self) -> f64 {
        lock(&self.state).position()
    }

    fn duration_seconds(&self) -> Option<f64> {
        let state = lock(&self.state);
        state.source.as_ref().and(state.duration)
    }

    fn is_finished(&self) -> bool {
        let state = lock(&self.state);
        if state.source.is_none() {
            return false;
        }
        state.forced_finish
            || matches!(state.duration, Some(d) if d > 0.0 && state.position() >= d)
    }
}

impl SimulatedHandle {
    /// Every URL loaded so far, oldest first.
    pub fn loads(&self) -> Vec<String> {
        lock(&self.state).loads.clone()
    }

    pub fn source(&self) -> Option<String> {
        lock(&self.state).source.clone()
    }

    /// Jump to the end of the current source.
    pub fn finish(&self) {
        let mut state = lock(&self.state);
        state.freeze();
        state.forced_finish = true;
    }

    pub fn set_metadata_duration(&self, seconds: f64) {
        lock(&self.state).duration = Some(seconds);
    }

    pub fn fail_next_load(&self, reason: &str) {
        lock(&self.state).fail_next_load = Some(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_freezes_position() {
        let mut output = SimulatedOutput::new();
        output.load("https://cdn/a.mp3", 10.0).unwrap();
        output.play().unwrap();
        output.seek(4.0);
        output.pause();
        let frozen = output.position_seconds();
        assert!((4.0..4.5).contains(&frozen));
        assert!(!output.is_playing());
        assert_eq!(output.position_seconds(), frozen);
    }

    #[test]
    fn finishes_at_duration() {
        let mut output = SimulatedOutput::new();
        output.load("https://cdn/a.mp3", 10.0).unwrap();
        output.seek(10.0);
        assert!(output.is_finished());
        output.stop();
        assert!(!output.is_finished());
    }

    #[test]
    fn play_without_source_fails() {
        let mut output = SimulatedOutput::new();
        assert!(output.play().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn position_follows_the_clock() {
        let mut output = SimulatedOutput::new();
        output.load("https://cdn/a.mp3", 30.0).unwrap();
        output.play().unwrap();
        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        assert!((output.position_seconds() - 5.0).abs() < 0.01);
    }
}
