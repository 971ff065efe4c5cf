//! Per-frame tuning constants for the runner.
//!
//! Every value is expressed in frame units (pixels per frame, frames per
//! spawn); nothing here is scaled by wall-clock delta time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for every spawn-interval field, in frames.
pub const MAX_SPAWN_INTERVAL: i64 = 1 << 40;

/// A tuning value the simulation cannot run with.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("tuning parameter {key}: {reason}")]
pub struct TuningError {
    pub key: &'static str,
    pub reason: String,
}

impl TuningError {
    fn new(key: &'static str, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

/// Fixed geometry of one obstacle kind, applied at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleGeometry {
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Added to the scroll speed when this kind moves.
    pub speed_offset: f64,
}

/// Simulation tuning.
///
/// `Default` yields the shipped game feel. Hosts and tests override single
/// fields (for example a huge spawn interval to keep the track empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub gravity: f64,
    /// Vertical velocity applied by a jump; negative is up.
    pub jump_impulse: f64,
    pub base_speed: f64,
    pub max_speed: f64,
    pub speed_step: f64,
    /// Score points per speed level.
    pub difficulty_interval: u64,
    pub spawn_interval_min: i64,
    pub spawn_interval_max: i64,
    /// Absolute lower bound for the adjusted minimum interval.
    pub spawn_interval_floor: i64,
    /// The adjusted maximum always exceeds the adjusted minimum by this much.
    pub spawn_interval_margin: i64,
    pub difficulty_divisor: f64,
    pub difficulty_cap: f64,
    /// Score at which airborne obstacles become eligible.
    pub airborne_unlock_score: u64,
    /// Trimmed from the right and bottom edges of every hitbox.
    pub hitbox_inset: f64,
    pub ground_line: f64,
    pub actor_x: f64,
    pub actor_width: f64,
    pub actor_height: f64,
    pub ground_obstacle: ObstacleGeometry,
    pub airborne_obstacle: ObstacleGeometry,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 0.6,
            jump_impulse: -12.0,
            base_speed: 6.0,
            max_speed: 11.5,
            speed_step: 0.5,
            difficulty_interval: 50,
            spawn_interval_min: 70,
            spawn_interval_max: 120,
            spawn_interval_floor: 45,
            spawn_interval_margin: 15,
            difficulty_divisor: 120.0,
            difficulty_cap: 1.8,
            airborne_unlock_score: 80,
            hitbox_inset: 10.0,
            ground_line: 150.0,
            actor_x: 50.0,
            actor_width: 40.0,
            actor_height: 45.0,
            ground_obstacle: ObstacleGeometry {
                y: 155.0,
                width: 20.0,
                height: 40.0,
                speed_offset: 0.0,
            },
            airborne_obstacle: ObstacleGeometry {
                y: 130.0,
                width: 20.0,
                height: 30.0,
                speed_offset: 0.8,
            },
        }
    }
}

impl Tuning {
    /// Flattened `(key, value)` pairs, sorted by key.
    ///
    /// Replay artifacts record these so a verifier can rebuild the exact
    /// tuning a session ran with.
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        let mut params = vec![
            ("actor_height", self.actor_height),
            ("actor_width", self.actor_width),
            ("actor_x", self.actor_x),
            ("airborne_obstacle.height", self.airborne_obstacle.height),
            ("airborne_obstacle.speed_offset", self.airborne_obstacle.speed_offset),
            ("airborne_obstacle.width", self.airborne_obstacle.width),
            ("airborne_obstacle.y", self.airborne_obstacle.y),
            ("airborne_unlock_score", self.airborne_unlock_score as f64),
            ("base_speed", self.base_speed),
            ("difficulty_cap", self.difficulty_cap),
            ("difficulty_divisor", self.difficulty_divisor),
            ("difficulty_interval", self.difficulty_interval as f64),
            ("gravity", self.gravity),
            ("ground_line", self.ground_line),
            ("ground_obstacle.height", self.ground_obstacle.height),
            ("ground_obstacle.speed_offset", self.ground_obstacle.speed_offset),
            ("ground_obstacle.width", self.ground_obstacle.width),
            ("ground_obstacle.y", self.ground_obstacle.y),
            ("hitbox_inset", self.hitbox_inset),
            ("jump_impulse", self.jump_impulse),
            ("max_speed", self.max_speed),
            ("spawn_interval_floor", self.spawn_interval_floor as f64),
            ("spawn_interval_margin", self.spawn_interval_margin as f64),
            ("spawn_interval_max", self.spawn_interval_max as f64),
            ("spawn_interval_min", self.spawn_interval_min as f64),
            ("speed_step", self.speed_step),
        ];
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
    }

    /// Check the values the tick relies on.
    ///
    /// - every value finite
    /// - speed never decreases and starts within its cap
    /// - spawn bounds ordered, positive and small enough not to overflow
    /// - difficulty multiplier defined and at least 1
    pub fn validate(&self) -> Result<(), TuningError> {
        if let Some((key, value)) = self.parameters().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(TuningError::new(key, format!("must be finite, got {value}")));
        }

        if self.speed_step < 0.0 {
            return Err(TuningError::new("speed_step", "must not be negative"));
        }
        if self.base_speed > self.max_speed {
            return Err(TuningError::new(
                "base_speed",
                format!("{} exceeds max_speed {}", self.base_speed, self.max_speed),
            ));
        }

        for (key, value) in [
            ("spawn_interval_min", self.spawn_interval_min),
            ("spawn_interval_max", self.spawn_interval_max),
            ("spawn_interval_floor", self.spawn_interval_floor),
            ("spawn_interval_margin", self.spawn_interval_margin),
        ] {
            if value > MAX_SPAWN_INTERVAL {
                return Err(TuningError::new(
                    key,
                    format!("{value} exceeds {MAX_SPAWN_INTERVAL} frames"),
                ));
            }
        }
        if self.spawn_interval_floor < 1 {
            return Err(TuningError::new("spawn_interval_floor", "must be at least 1"));
        }
        if self.spawn_interval_margin < 0 {
            return Err(TuningError::new("spawn_interval_margin", "must not be negative"));
        }
        if self.spawn_interval_min > self.spawn_interval_max {
            return Err(TuningError::new(
                "spawn_interval_min",
                format!(
                    "{} exceeds spawn_interval_max {}",
                    self.spawn_interval_min, self.spawn_interval_max
                ),
            ));
        }

        if self.difficulty_divisor <= 0.0 {
            return Err(TuningError::new("difficulty_divisor", "must be positive"));
        }
        if self.difficulty_cap < 1.0 {
            return Err(TuningError::new("difficulty_cap", "must be at least 1"));
        }
        Ok(())
    }

    /// Set one parameter by its [`Tuning::parameters`] key.
    ///
    /// Returns `false` for unknown keys. Integer fields truncate.
    pub fn set_parameter(&mut self, key: &str, value: f64) -> bool {
        match key {
            "actor_height" => self.actor_height = value,
            "actor_width" => self.actor_width = value,
            "actor_x" => self.actor_x = value,
            "airborne_obstacle.height" => self.airborne_obstacle.height = value,
            "airborne_obstacle.speed_offset" => self.airborne_obstacle.speed_offset = value,
            "airborne_obstacle.width" => self.airborne_obstacle.width = value,
            "airborne_obstacle.y" => self.airborne_obstacle.y = value,
            "airborne_unlock_score" => self.airborne_unlock_score = value as u64,
            "base_speed" => self.base_speed = value,
            "difficulty_cap" => self.difficulty_cap = value,
            "difficulty_divisor" => self.difficulty_divisor = value,
            "difficulty_interval" => self.difficulty_interval = value as u64,
            "gravity" => self.gravity = value,
            "ground_line" => self.ground_line = value,
            "ground_obstacle.height" => self.ground_obstacle.height = value,
            "ground_obstacle.speed_offset" => self.ground_obstacle.speed_offset = value,
            "ground_obstacle.width" => self.ground_obstacle.width = value,
            "ground_obstacle.y" => self.ground_obstacle.y = value,
            "hitbox_inset" => self.hitbox_inset = value,
            "jump_impulse" => self.jump_impulse = value,
            "max_speed" => self.max_speed = value,
            "spawn_interval_floor" => self.spawn_interval_floor = value as i64,
            "spawn_interval_margin" => self.spawn_interval_margin = value as i64,
            "spawn_interval_max" => self.spawn_interval_max = value as i64,
            "spawn_interval_min" => self.spawn_interval_min = value as i64,
            "speed_step" => self.speed_step = value,
            _ => return false,
        }
        true
    }
}
