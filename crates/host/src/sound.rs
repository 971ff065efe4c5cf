//! Jump sound cue.
//!
//! Playback is best effort: the host calls the cue on every real jump and
//! discards whatever error comes back.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoundError {
    #[error("audio device unavailable: {0}")]
    Unavailable(String),

    #[error("playback rejected: {0}")]
    Rejected(String),
}

pub trait SoundCue {
    fn play_jump(&mut self) -> Result<(), SoundError>;
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSound;

impl SoundCue for NullSound {
    fn play_jump(&mut self) -> Result<(), SoundError> {
        Ok(())
    }
}

/// Logs each cue at trace level instead of playing it. Used headless.
#[derive(Debug, Clone)]
pub struct LogSound {
    volume: f64,
    played: u64,
}

impl LogSound {
    pub fn new(volume: f64) -> Self {
        Self { volume, played: 0 }
    }

    pub fn played(&self) -> u64 {
        self.played
    }
}

impl SoundCue for LogSound {
    fn play_jump(&mut self) -> Result<(), SoundError> {
        self.played += 1;
        log::trace!("jump cue #{} at volume {}", self.played, self.volume);
        Ok(())
    }
}
