//! Runner Replay System
//!
//! This crate provides replay artifact generation and verification.
//!
//! # Architecture
//!
//! The replay system consists of:
//! - `ReplayRecorder`: Collects the events a host applied, frame by frame
//! - `verify_replay`: Re-simulates an artifact and checks it lands on the
//!   recorded digest
//! - Build fingerprint acquisition and artifact checksums
//!
//! A session is fully determined by its seed, tuning, initial viewport,
//! persisted best score and the applied event stream. Nothing else is
//! recorded.

#![deny(unsafe_code)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use log::debug;
use prost::Message;
use runner_sim::{
    RNG_ALGORITHM, RandomSource, Runner, STATE_DIGEST_ALGO_ID, SeededRandom, Tick, Tuning,
    Viewport,
};
use runner_wire::{
    AppliedEventKind, AppliedEventProto, BuildFingerprint, FrameIndex, ReplayArtifact,
    TuningParameter,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Current replay schema version.
pub const REPLAY_FORMAT_VERSION: u32 = 1;

/// Longest session a verifier will re-simulate: 24 hours at 60 frames per
/// second.
pub const MAX_CHECKPOINT_FRAME: FrameIndex = 60 * 60 * 60 * 24;

// ============================================================================
// Applied Events
// ============================================================================

/// What a host event did to the session once validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppliedAction {
    Jump,
    /// Canvas width after clamping.
    Resize { width: f64 },
    Close,
}

/// An action applied at the start of `frame`, before that frame's tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedEvent {
    pub frame: FrameIndex,
    pub action: AppliedAction,
}

impl AppliedEvent {
    /// Apply to a runner. `Close` has no effect on the session itself.
    pub fn apply<R: RandomSource>(&self, runner: &mut Runner<R>) {
        match self.action {
            AppliedAction::Jump => {
                runner.request_jump();
            }
            AppliedAction::Resize { width } => runner.resize(width),
            AppliedAction::Close => {}
        }
    }
}

impl From<AppliedEvent> for AppliedEventProto {
    fn from(event: AppliedEvent) -> Self {
        let (kind, width) = match event.action {
            AppliedAction::Jump => (AppliedEventKind::Jump, 0.0),
            AppliedAction::Resize { width } => (AppliedEventKind::Resize, width),
            AppliedAction::Close => (AppliedEventKind::Close, 0.0),
        };
        Self {
            frame: event.frame,
            kind: kind as i32,
            width,
        }
    }
}

impl TryFrom<AppliedEventProto> for AppliedEvent {
    type Error = &'static str;

    fn try_from(proto: AppliedEventProto) -> Result<Self, Self::Error> {
        let kind = AppliedEventKind::try_from(proto.kind).map_err(|_| "unknown event kind")?;
        let action = match kind {
            AppliedEventKind::Jump => AppliedAction::Jump,
            AppliedEventKind::Resize => {
                if !proto.width.is_finite() || proto.width <= 0.0 {
                    return Err("resize width must be finite and positive");
                }
                AppliedAction::Resize { width: proto.width }
            }
            AppliedEventKind::Close => AppliedAction::Close,
        };
        Ok(Self {
            frame: proto.frame,
            action,
        })
    }
}

// ============================================================================
// End Reason
// ============================================================================

/// Why recording stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The host closed the minigame.
    Closed,
    /// Finalized while the session sat in game over.
    GameOver,
    /// A frame budget ran out (headless runs).
    FrameLimit,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::GameOver => "game_over",
            Self::FrameLimit => "frame_limit",
        }
    }
}

// ============================================================================
// Replay Recorder
// ============================================================================

/// Everything needed to rebuild the runner a session started with.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub seed: u64,
    pub viewport: Viewport,
    pub initial_best_ticks: Tick,
    pub tuning: Tuning,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            viewport: Viewport::default(),
            initial_best_ticks: 0,
            tuning: Tuning::default(),
        }
    }
}

impl ReplayConfig {
    /// A runner in the exact state this configuration describes at mount.
    pub fn runner(&self) -> Runner<SeededRandom> {
        Runner::seeded(
            self.seed,
            self.viewport,
            self.initial_best_ticks,
            self.tuning.clone(),
        )
    }
}

/// Build fingerprint data.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildFingerprintData {
    pub binary_sha256: String,
    pub target: String,
    pub profile: String,
    pub git_commit: String,
}

/// Records one mounted session for replay artifact generation.
pub struct ReplayRecorder {
    config: ReplayConfig,
    initial_digest: u64,
    events: Vec<AppliedEvent>,
    build_fingerprint: Option<BuildFingerprintData>,
}

impl ReplayRecorder {
    /// `initial_digest` is the runner's digest right after mount.
    pub fn new(config: ReplayConfig, initial_digest: u64) -> Self {
        Self {
            config,
            initial_digest,
            events: Vec::new(),
            build_fingerprint: None,
        }
    }

    /// Record an applied event. Events must arrive in application order.
    pub fn record(&mut self, event: AppliedEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AppliedEvent] {
        &self.events
    }

    pub fn set_build_fingerprint(&mut self, fingerprint: BuildFingerprintData) {
        self.build_fingerprint = Some(fingerprint);
    }

    /// Finalize the replay artifact.
    pub fn finalize(
        self,
        final_digest: u64,
        checkpoint_frame: FrameIndex,
        end_reason: EndReason,
    ) -> ReplayArtifact {
        let build_fingerprint = self.build_fingerprint.map(|f| BuildFingerprint {
            binary_sha256: f.binary_sha256,
            target: f.target,
            profile: f.profile,
            git_commit: f.git_commit,
        });

        ReplayArtifact {
            replay_format_version: REPLAY_FORMAT_VERSION,
            seed: self.config.seed,
            rng_algorithm: RNG_ALGORITHM.to_string(),
            state_digest_algo_id: STATE_DIGEST_ALGO_ID.to_string(),
            viewport_width: self.config.viewport.width,
            viewport_height: self.config.viewport.height,
            initial_best_ticks: self.config.initial_best_ticks,
            initial_digest: self.initial_digest,
            tuning_parameters: self
                .config
                .tuning
                .parameters()
                .into_iter()
                .map(TuningParameter::from)
                .collect(),
            events: self.events.into_iter().map(Into::into).collect(),
            build_fingerprint,
            final_digest,
            checkpoint_frame,
            end_reason: end_reason.as_str().to_string(),
        }
    }
}

// ============================================================================
// Replay Verification
// ============================================================================

/// Replay verification error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("build fingerprint mismatch: expected {expected}, got {actual}")]
    BuildMismatch { expected: String, actual: String },

    #[error("unsupported replay format version {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported rng algorithm {0:?}")]
    UnsupportedRng(String),

    #[error("unknown tuning parameter {0:?}")]
    UnknownTuningParameter(String),

    #[error("initialization anchor mismatch: expected {expected:#x}, got {actual:#x}")]
    InitializationAnchorMismatch { expected: u64, actual: u64 },

    #[error("event stream invalid: {reason}")]
    EventStreamInvalid { reason: String },

    #[error("final digest mismatch: expected {expected:#x}, got {actual:#x}")]
    FinalDigestMismatch { expected: u64, actual: u64 },

    #[error("invalid replay format: {reason}")]
    InvalidFormat { reason: String },
}

/// Options for replay verification.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Whether to strictly enforce build fingerprint matching.
    /// - true: fail on mismatch (CI)
    /// - false: warn but continue (dev mode)
    pub strict_build_check: bool,
    /// Current build fingerprint for comparison.
    pub current_build: Option<BuildFingerprintData>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            strict_build_check: true,
            current_build: None,
        }
    }
}

/// Verify a replay artifact produces the recorded outcome.
///
/// # Verification Steps
/// 1. Check schema version, RNG algorithm and build fingerprint
/// 2. Bound the checkpoint frame, decode and validate the applied event
///    stream
/// 3. Rebuild tuning from the recorded parameters
/// 4. Rebuild the runner and compare the initialization anchor
/// 5. For every frame in `[0, checkpoint_frame]`: apply that frame's events,
///    then tick unless it is the checkpoint frame
/// 6. Compare the final digest
pub fn verify_replay(
    artifact: &ReplayArtifact,
    options: &VerifyOptions,
) -> Result<(), VerifyError> {
    if artifact.replay_format_version != REPLAY_FORMAT_VERSION {
        return Err(VerifyError::UnsupportedVersion(
            artifact.replay_format_version,
        ));
    }
    if artifact.rng_algorithm != RNG_ALGORITHM {
        return Err(VerifyError::UnsupportedRng(artifact.rng_algorithm.clone()));
    }

    if let (Some(recorded), Some(current)) = (&artifact.build_fingerprint, &options.current_build) {
        let mismatch = recorded.binary_sha256 != current.binary_sha256
            || recorded.target != current.target
            || recorded.profile != current.profile;
        if mismatch {
            if options.strict_build_check {
                return Err(VerifyError::BuildMismatch {
                    expected: recorded.binary_sha256.clone(),
                    actual: current.binary_sha256.clone(),
                });
            }
            log::warn!(
                "replay recorded by build {} verified with build {}",
                recorded.binary_sha256,
                current.binary_sha256
            );
        }
    }

    if artifact.checkpoint_frame > MAX_CHECKPOINT_FRAME {
        return Err(VerifyError::InvalidFormat {
            reason: format!(
                "checkpoint frame {} exceeds {MAX_CHECKPOINT_FRAME}",
                artifact.checkpoint_frame
            ),
        });
    }

    let events = decode_event_stream(artifact)?;
    let config = replay_config(artifact)?;

    let mut runner = config.runner();
    let anchor = runner.state_digest();
    if anchor != artifact.initial_digest {
        return Err(VerifyError::InitializationAnchorMismatch {
            expected: artifact.initial_digest,
            actual: anchor,
        });
    }

    let mut pending = events.iter().peekable();
    for frame in 0..=artifact.checkpoint_frame {
        while let Some(event) = pending.next_if(|e| e.frame == frame) {
            event.apply(&mut runner);
        }
        if frame < artifact.checkpoint_frame {
            runner.tick();
        }
    }

    let actual = runner.state_digest();
    if actual != artifact.final_digest {
        return Err(VerifyError::FinalDigestMismatch {
            expected: artifact.final_digest,
            actual,
        });
    }

    debug!(
        "replay verified: {} frames, {} events, digest {actual:#x}",
        artifact.checkpoint_frame,
        events.len()
    );
    Ok(())
}

/// Rebuild the configuration a recorded session mounted with.
pub fn replay_config(artifact: &ReplayArtifact) -> Result<ReplayConfig, VerifyError> {
    let mut tuning = Tuning::default();
    for param in &artifact.tuning_parameters {
        if !tuning.set_parameter(&param.key, param.value) {
            return Err(VerifyError::UnknownTuningParameter(param.key.clone()));
        }
    }
    tuning.validate().map_err(|e| VerifyError::InvalidFormat {
        reason: e.to_string(),
    })?;

    if !artifact.viewport_width.is_finite() || artifact.viewport_width <= 0.0 {
        return Err(VerifyError::InvalidFormat {
            reason: format!("viewport width {} is not positive", artifact.viewport_width),
        });
    }

    Ok(ReplayConfig {
        seed: artifact.seed,
        viewport: Viewport {
            width: artifact.viewport_width,
            height: artifact.viewport_height,
        },
        initial_best_ticks: artifact.initial_best_ticks,
        tuning,
    })
}

/// Decode events and check ordering.
///
/// Frames must be non-decreasing and within `[0, checkpoint_frame]`; a
/// `Close` event, if present, must be the last one.
fn decode_event_stream(artifact: &ReplayArtifact) -> Result<Vec<AppliedEvent>, VerifyError> {
    let mut events = Vec::with_capacity(artifact.events.len());
    let mut previous_frame = 0;
    let mut closed = false;

    for proto in &artifact.events {
        let event = AppliedEvent::try_from(proto.clone()).map_err(|e| {
            VerifyError::InvalidFormat {
                reason: e.to_string(),
            }
        })?;

        if closed {
            return Err(VerifyError::EventStreamInvalid {
                reason: format!("event at frame {} follows close", event.frame),
            });
        }
        if event.frame < previous_frame {
            return Err(VerifyError::EventStreamInvalid {
                reason: format!(
                    "event at frame {} recorded after frame {previous_frame}",
                    event.frame
                ),
            });
        }
        if event.frame > artifact.checkpoint_frame {
            return Err(VerifyError::EventStreamInvalid {
                reason: format!(
                    "event at frame {} is past checkpoint frame {}",
                    event.frame, artifact.checkpoint_frame
                ),
            });
        }

        previous_frame = event.frame;
        closed = event.action == AppliedAction::Close;
        events.push(event);
    }

    Ok(events)
}

// ============================================================================
// Build Fingerprint & Checksums
// ============================================================================

/// Acquire the current build fingerprint.
///
/// # Returns
/// - `Ok(fingerprint)` on success
/// - `Err(io::Error)` if the executable cannot be read
pub fn acquire_build_fingerprint() -> io::Result<BuildFingerprintData> {
    let exe_path = std::env::current_exe()?;

    let mut file = fs::File::open(&exe_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let profile = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };

    Ok(BuildFingerprintData {
        binary_sha256: format!("{:x}", hasher.finalize()),
        target: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
        profile: profile.to_string(),
        git_commit: std::env::var("RUNNER_GIT_COMMIT").unwrap_or_else(|_| "unknown".to_string()),
    })
}

/// SHA-256 (lowercase hex) of the encoded artifact.
pub fn artifact_checksum(artifact: &ReplayArtifact) -> String {
    format!("{:x}", Sha256::digest(artifact.encode_to_vec()))
}

// ============================================================================
// Replay I/O
// ============================================================================

/// Write a replay artifact to a file. Existing files are never overwritten.
pub fn write_replay(artifact: &ReplayArtifact, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Replay artifact already exists at {}", path.display()),
        ));
    }

    let encoded = artifact.encode_to_vec();
    let mut file = fs::File::create(path)?;
    file.write_all(&encoded)?;

    debug!("wrote replay ({} bytes) to {}", encoded.len(), path.display());
    Ok(())
}

/// Read a replay artifact from a file.
pub fn read_replay(path: &Path) -> io::Result<ReplayArtifact> {
    let data = fs::read(path)?;
    ReplayArtifact::decode(data.as_slice()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to decode replay: {e}"),
        )
    })
}

// ============================================================================
// Tests
// ============================================================================
