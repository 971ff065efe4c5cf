//! Runner Host Edge
//!
//! The host edge stands where the page's view layer would. It owns:
//! - Viewport sizing and resize validation
//! - Input mapping and the per-frame event queue
//! - Best-score persistence
//! - The jump sound cue
//! - Rendering snapshots into drawing commands
//! - Replay recording
//!
//! # Frame contract
//!
//! The simulation core is only touched from [`Host::frame`]: queued events
//! are applied first, in arrival order, then the core ticks exactly once.
//! Event handlers never mutate the session directly.

#![deny(unsafe_code)]

pub mod autopilot;
pub mod config;
pub mod events;
pub mod logging;
pub mod render;
pub mod sound;
pub mod store;
pub mod validation;

use log::{debug, info};
use prost::Message;
use runner_replay::{
    AppliedAction, AppliedEvent, BuildFingerprintData, EndReason, ReplayConfig, ReplayRecorder,
};
use runner_sim::{JumpOutcome, Runner, Snapshot, Tick, Viewport};
use runner_wire::{FrameIndex, FrameProto, HostEventProto, ReplayArtifact};

use config::{ConfigError, HostConfig};
use events::{EventQueue, HostEvent, PushResult, QueuedEvent, map_key};
use render::Hud;
use sound::SoundCue;
use store::{BestScore, KeyValueStore};
use validation::{ResizeValidation, ViewportLimits, validate_container_width};

// ============================================================================
// Event Outcome
// ============================================================================

/// What `handle_event` did with an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventOutcome {
    /// Queued for the next frame.
    Queued,
    /// Folded into the resize already queued.
    Coalesced,
    /// Not bound to any action.
    Ignored,
    /// Dropped: the resize failed validation.
    DroppedInvalid(ResizeValidation),
    /// Dropped: too many events this frame.
    DroppedOverflow,
    /// Dropped: the host is closed or closing.
    DroppedClosed,
}

impl EventOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued | Self::Coalesced)
    }
}

// ============================================================================
// Frame Output
// ============================================================================

/// One presented frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub frame: FrameProto,
    /// `frame`, encoded.
    pub bytes: Vec<u8>,
    pub hud: Hud,
}

// ============================================================================
// Host
// ============================================================================

/// One mounted minigame.
pub struct Host<S: KeyValueStore> {
    config: HostConfig,
    limits: ViewportLimits,
    runner: Runner,
    queue: EventQueue,
    best: BestScore<S>,
    sound: Box<dyn SoundCue>,
    replay_recorder: ReplayRecorder,
    /// Frames presented so far; also the index of the next frame.
    frames_stepped: FrameIndex,
    /// A close has been queued; later events are refused.
    closing: bool,
    closed: bool,
}

impl<S: KeyValueStore> Host<S> {
    /// Mount the minigame: read the best score, size the canvas, start a
    /// session.
    pub fn new(config: HostConfig, store: S, sound: Box<dyn SoundCue>) -> Result<Self, ConfigError> {
        config.validate()?;

        let limits = config.viewport_limits();
        let viewport = Viewport {
            width: limits.canvas_width(config.container_width),
            height: config.canvas_height,
        };
        let best = BestScore::load(store, &config.best_score_key);

        let replay_config = ReplayConfig {
            seed: config.seed,
            viewport,
            initial_best_ticks: best.best_ticks(),
            tuning: config.tuning.clone(),
        };
        let runner = replay_config.runner();
        let replay_recorder = ReplayRecorder::new(replay_config, runner.state_digest());

        info!(
            "mounted runner: seed {}, canvas {}x{}, best {}",
            config.seed,
            viewport.width,
            viewport.height,
            best.best_ticks()
        );

        Ok(Self {
            queue: EventQueue::new(config.max_events_per_frame),
            limits,
            runner,
            best,
            sound,
            replay_recorder,
            frames_stepped: 0,
            closing: false,
            closed: false,
            config,
        })
    }

    /// Set the build fingerprint recorded in the replay.
    pub fn set_build_fingerprint(&mut self, fingerprint: BuildFingerprintData) {
        self.replay_recorder.set_build_fingerprint(fingerprint);
    }

    /// Validate and queue an input event for the next frame.
    pub fn handle_event(&mut self, event: HostEvent) -> EventOutcome {
        if self.closing {
            return EventOutcome::DroppedClosed;
        }

        let queued = match event {
            HostEvent::KeyDown(code) => match map_key(&code) {
                Some(queued) => queued,
                None => return EventOutcome::Ignored,
            },
            HostEvent::PointerDown | HostEvent::Jump => QueuedEvent::Jump,
            HostEvent::Resize { container_width } => {
                let validation = validate_container_width(container_width, &self.limits);
                match validation.width() {
                    Some(width) => QueuedEvent::Resize { width },
                    None => return EventOutcome::DroppedInvalid(validation),
                }
            }
            HostEvent::Close => QueuedEvent::Close,
        };

        match self.queue.push(queued) {
            PushResult::Queued => {
                if queued == QueuedEvent::Close {
                    self.closing = true;
                }
                EventOutcome::Queued
            }
            PushResult::Coalesced => EventOutcome::Coalesced,
            PushResult::Overflow => EventOutcome::DroppedOverflow,
        }
    }

    /// Handle an event that arrived over the wire.
    pub fn handle_proto(&mut self, proto: HostEventProto) -> EventOutcome {
        match HostEvent::try_from(proto) {
            Ok(event) => self.handle_event(event),
            Err(reason) => {
                debug!("ignoring host event: {reason}");
                EventOutcome::Ignored
            }
        }
    }

    /// Per-frame callback.
    ///
    /// Applies queued events, ticks once, persists a grown best score and
    /// renders. While the session is over the same state is rendered again
    /// without ticking. Returns `None` once closed.
    pub fn frame(&mut self) -> Option<FrameOutput> {
        if self.closed {
            return None;
        }

        let frame = self.frames_stepped;
        for event in self.queue.drain() {
            match event {
                QueuedEvent::Jump => self.apply_jump(frame),
                QueuedEvent::Resize { width } => {
                    self.runner.resize(width);
                    self.record(frame, AppliedAction::Resize { width });
                }
                QueuedEvent::Close => {
                    self.record(frame, AppliedAction::Close);
                    self.closed = true;
                    info!(
                        "closed at frame {frame}, score {}, {} event(s) dropped for overflow",
                        self.runner.state().score(),
                        self.queue.dropped()
                    );
                    return None;
                }
            }
        }

        if !self.runner.is_over() {
            let report = self.runner.tick();
            if report.new_best {
                self.best.record(self.runner.state().best_ticks);
            }
            if let Some(kind) = report.spawned {
                debug!("frame {frame}: spawned {} obstacle", kind.as_str());
            }
            if report.collided {
                info!(
                    "game over at frame {frame}: score {}, best {}",
                    self.runner.state().score(),
                    self.runner.state().display_best()
                );
            }
        }
        self.frames_stepped += 1;

        Some(self.present(frame))
    }

    fn apply_jump(&mut self, frame: FrameIndex) {
        let outcome = self.runner.request_jump();
        self.record(frame, AppliedAction::Jump);
        match outcome {
            JumpOutcome::Jumped => {
                if let Err(e) = self.sound.play_jump() {
                    debug!("jump cue failed: {e}");
                }
            }
            JumpOutcome::Restarted => info!("restarted at frame {frame}"),
            JumpOutcome::Ignored => {}
        }
    }

    fn record(&mut self, frame: FrameIndex, action: AppliedAction) {
        self.replay_recorder.record(AppliedEvent { frame, action });
    }

    fn present(&self, frame: FrameIndex) -> FrameOutput {
        let snapshot = self.runner.snapshot();
        let hud = Hud::from_snapshot(&snapshot);
        let commands = render::draw_commands(&snapshot);

        let mut proto = FrameProto::from(snapshot);
        proto.frame = frame;
        proto.commands = commands;
        let bytes = proto.encode_to_vec();

        FrameOutput {
            frame: proto,
            bytes,
            hud,
        }
    }

    /// Why a replay finalized now would end.
    pub fn end_reason(&self) -> EndReason {
        if self.closed {
            EndReason::Closed
        } else if self.runner.is_over() {
            EndReason::GameOver
        } else {
            EndReason::FrameLimit
        }
    }

    /// Finish recording and produce the replay artifact.
    pub fn finalize(self) -> ReplayArtifact {
        let end_reason = self.end_reason();
        let final_digest = self.runner.state_digest();
        debug!(
            "finalizing replay at frame {} ({})",
            self.frames_stepped,
            end_reason.as_str()
        );
        self.replay_recorder
            .finalize(final_digest, self.frames_stepped, end_reason)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.runner.snapshot()
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn best_ticks(&self) -> Tick {
        self.best.best_ticks()
    }

    pub fn store(&self) -> &S {
        self.best.store()
    }

    pub fn frames_stepped(&self) -> FrameIndex {
        self.frames_stepped
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Events refused for overflow since mount.
    pub fn dropped_events(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// Tests
// ============================================================================
