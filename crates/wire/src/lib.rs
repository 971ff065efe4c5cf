//! Runner Wire Types
//!
//! This crate defines the Protobuf message types that cross the boundary
//! between the runner and whatever surface displays it. The host edge and
//! the replay tooling both depend on it, so a frame or replay encoded by one
//! is always decodable by the other.
//!
//! # Message Categories
//!
//! - **Host input**: discrete events forwarded by the view layer
//! - **Frames**: per-tick render state plus the drawing commands for it
//! - **Replay**: applied events and the tuning a session ran with

#![deny(unsafe_code)]

use prost::Message;

// ============================================================================
// Type Aliases (matching simulation crate)
// ============================================================================

/// Tick type alias for wire messages.
pub type Tick = u64;

/// Host frame index; counts frames since mount and never resets.
pub type FrameIndex = u64;

// ============================================================================
// Host Input Messages
// ============================================================================

/// Discrete input event raised by the view layer.
#[derive(Clone, PartialEq, Message)]
pub struct HostEventProto {
    #[prost(oneof = "host_event_proto::Event", tags = "1, 2, 3")]
    pub event: Option<host_event_proto::Event>,
}

pub mod host_event_proto {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        Jump(super::JumpEvent),
        #[prost(message, tag = "2")]
        Resize(super::ResizeEvent),
        #[prost(message, tag = "3")]
        Close(super::CloseEvent),
    }
}

/// Jump (also restarts after game over).
#[derive(Clone, PartialEq, Message)]
pub struct JumpEvent {}

/// The container around the canvas changed size.
#[derive(Clone, PartialEq, Message)]
pub struct ResizeEvent {
    /// Raw container width; the host derives the canvas width from it.
    #[prost(double, tag = "1")]
    pub container_width: f64,
}

/// The minigame was dismissed.
#[derive(Clone, PartialEq, Message)]
pub struct CloseEvent {}

impl HostEventProto {
    pub fn jump() -> Self {
        Self {
            event: Some(host_event_proto::Event::Jump(JumpEvent {})),
        }
    }

    pub fn resize(container_width: f64) -> Self {
        Self {
            event: Some(host_event_proto::Event::Resize(ResizeEvent { container_width })),
        }
    }

    pub fn close() -> Self {
        Self {
            event: Some(host_event_proto::Event::Close(CloseEvent {})),
        }
    }
}

// ============================================================================
// Frame Messages
// ============================================================================

/// Axis-aligned box; `y` grows downward.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct RectProto {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    #[prost(double, tag = "3")]
    pub width: f64,
    #[prost(double, tag = "4")]
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ObstacleKindProto {
    Ground = 0,
    Airborne = 1,
}

#[derive(Clone, PartialEq, Message)]
pub struct ObstacleProto {
    #[prost(enumeration = "ObstacleKindProto", tag = "1")]
    pub kind: i32,
    #[prost(message, optional, tag = "2")]
    pub bounds: Option<RectProto>,
}

/// Theme slot a command paints with. The view layer resolves slots to
/// concrete colors, so frames stay theme-agnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Ink {
    Foreground = 0,
    Background = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TextAlign {
    Left = 0,
    Center = 1,
    Right = 2,
}

/// One drawing command, executed in list order.
#[derive(Clone, PartialEq, Message)]
pub struct DrawCmdProto {
    #[prost(oneof = "draw_cmd_proto::Shape", tags = "1, 2, 3")]
    pub shape: Option<draw_cmd_proto::Shape>,
}

pub mod draw_cmd_proto {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Shape {
        #[prost(message, tag = "1")]
        Rect(super::FillRectCmd),
        #[prost(message, tag = "2")]
        Line(super::LineCmd),
        #[prost(message, tag = "3")]
        Text(super::TextCmd),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct FillRectCmd {
    #[prost(message, optional, tag = "1")]
    pub rect: Option<RectProto>,
    #[prost(enumeration = "Ink", tag = "2")]
    pub ink: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct LineCmd {
    #[prost(double, tag = "1")]
    pub x1: f64,
    #[prost(double, tag = "2")]
    pub y1: f64,
    #[prost(double, tag = "3")]
    pub x2: f64,
    #[prost(double, tag = "4")]
    pub y2: f64,
    #[prost(double, tag = "5")]
    pub line_width: f64,
    #[prost(enumeration = "Ink", tag = "6")]
    pub ink: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct TextCmd {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(double, tag = "2")]
    pub x: f64,
    #[prost(double, tag = "3")]
    pub y: f64,
    /// Font size in pixels; the face is always monospace.
    #[prost(double, tag = "4")]
    pub size: f64,
    #[prost(enumeration = "TextAlign", tag = "5")]
    pub align: i32,
    #[prost(enumeration = "Ink", tag = "6")]
    pub ink: i32,
}

impl DrawCmdProto {
    pub fn fill_rect(rect: RectProto, ink: Ink) -> Self {
        Self {
            shape: Some(draw_cmd_proto::Shape::Rect(FillRectCmd {
                rect: Some(rect),
                ink: ink as i32,
            })),
        }
    }

    pub fn line(from: (f64, f64), to: (f64, f64), line_width: f64, ink: Ink) -> Self {
        Self {
            shape: Some(draw_cmd_proto::Shape::Line(LineCmd {
                x1: from.0,
                y1: from.1,
                x2: to.0,
                y2: to.1,
                line_width,
                ink: ink as i32,
            })),
        }
    }

    pub fn text(text: impl Into<String>, at: (f64, f64), size: f64, align: TextAlign) -> Self {
        Self {
            shape: Some(draw_cmd_proto::Shape::Text(TextCmd {
                text: text.into(),
                x: at.0,
                y: at.1,
                size,
                align: align as i32,
                ink: Ink::Foreground as i32,
            })),
        }
    }
}

/// Everything the view layer needs to present one frame.
#[derive(Clone, PartialEq, Message)]
pub struct FrameProto {
    /// Host frame index.
    #[prost(uint64, tag = "1")]
    pub frame: FrameIndex,

    /// Session tick after this frame's step.
    #[prost(uint64, tag = "2")]
    pub tick: Tick,

    /// Display score (ticks / 10).
    #[prost(uint64, tag = "3")]
    pub score: u64,

    /// Display high score (best ticks / 10).
    #[prost(uint64, tag = "4")]
    pub best_score: u64,

    #[prost(bool, tag = "5")]
    pub is_over: bool,

    #[prost(message, optional, tag = "6")]
    pub actor: Option<RectProto>,

    /// Active obstacles in spawn order.
    #[prost(message, repeated, tag = "7")]
    pub obstacles: Vec<ObstacleProto>,

    #[prost(message, repeated, tag = "8")]
    pub commands: Vec<DrawCmdProto>,

    #[prost(double, tag = "9")]
    pub viewport_width: f64,

    #[prost(double, tag = "10")]
    pub viewport_height: f64,

    /// StateDigest after this frame's step.
    #[prost(uint64, tag = "11")]
    pub digest: u64,
}

// ============================================================================
// Replay Artifact Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AppliedEventKind {
    Jump = 0,
    Resize = 1,
    Close = 2,
}

/// An event as the host applied it, after validation.
#[derive(Clone, PartialEq, Message)]
pub struct AppliedEventProto {
    /// Frame at whose start the event was applied.
    #[prost(uint64, tag = "1")]
    pub frame: FrameIndex,

    #[prost(enumeration = "AppliedEventKind", tag = "2")]
    pub kind: i32,

    /// Canvas width after clamping; only meaningful for `Resize`.
    #[prost(double, tag = "3")]
    pub width: f64,
}

/// Tuning parameter key-value pair.
#[derive(Clone, PartialEq, Message)]
pub struct TuningParameter {
    #[prost(string, tag = "1")]
    pub key: String,

    #[prost(double, tag = "2")]
    pub value: f64,
}

/// Build fingerprint for replay scope verification.
#[derive(Clone, PartialEq, Message)]
pub struct BuildFingerprint {
    /// SHA-256 of the executable that recorded the replay.
    #[prost(string, tag = "1")]
    pub binary_sha256: String,

    /// `<arch>-<os>` of the recording build.
    #[prost(string, tag = "2")]
    pub target: String,

    /// Build profile ("release" or "dev").
    #[prost(string, tag = "3")]
    pub profile: String,

    /// Git commit hash (metadata/traceability).
    #[prost(string, tag = "4")]
    pub git_commit: String,
}

/// Complete replay artifact.
#[derive(Clone, PartialEq, Message)]
pub struct ReplayArtifact {
    /// Schema version (starts at 1).
    #[prost(uint32, tag = "1")]
    pub replay_format_version: u32,

    #[prost(uint64, tag = "2")]
    pub seed: u64,

    /// RNG algorithm identifier (e.g., "ChaCha8Rng").
    #[prost(string, tag = "3")]
    pub rng_algorithm: String,

    #[prost(string, tag = "4")]
    pub state_digest_algo_id: String,

    #[prost(double, tag = "5")]
    pub viewport_width: f64,

    #[prost(double, tag = "6")]
    pub viewport_height: f64,

    /// Persisted best ticks at mount.
    #[prost(uint64, tag = "7")]
    pub initial_best_ticks: u64,

    /// StateDigest right after mount, before any frame.
    #[prost(uint64, tag = "8")]
    pub initial_digest: u64,

    /// Tuning parameters (sorted by key).
    #[prost(message, repeated, tag = "9")]
    pub tuning_parameters: Vec<TuningParameter>,

    /// Applied events in application order.
    #[prost(message, repeated, tag = "10")]
    pub events: Vec<AppliedEventProto>,

    #[prost(message, optional, tag = "11")]
    pub build_fingerprint: Option<BuildFingerprint>,

    /// StateDigest at checkpoint_frame.
    #[prost(uint64, tag = "12")]
    pub final_digest: u64,

    /// Number of frames stepped before the artifact was finalized.
    #[prost(uint64, tag = "13")]
    pub checkpoint_frame: FrameIndex,

    /// Why recording stopped ("closed", "game_over", "frame_limit").
    #[prost(string, tag = "14")]
    pub end_reason: String,
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<runner_sim::Rect> for RectProto {
    fn from(r: runner_sim::Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

impl From<RectProto> for runner_sim::Rect {
    fn from(r: RectProto) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

impl From<runner_sim::ObstacleKind> for ObstacleKindProto {
    fn from(kind: runner_sim::ObstacleKind) -> Self {
        match kind {
            runner_sim::ObstacleKind::Ground => Self::Ground,
            runner_sim::ObstacleKind::Airborne => Self::Airborne,
        }
    }
}

impl From<ObstacleKindProto> for runner_sim::ObstacleKind {
    fn from(kind: ObstacleKindProto) -> Self {
        match kind {
            ObstacleKindProto::Ground => Self::Ground,
            ObstacleKindProto::Airborne => Self::Airborne,
        }
    }
}

impl From<runner_sim::ObstacleView> for ObstacleProto {
    fn from(o: runner_sim::ObstacleView) -> Self {
        Self {
            kind: ObstacleKindProto::from(o.kind) as i32,
            bounds: Some(o.bounds.into()),
        }
    }
}

impl From<runner_sim::Snapshot> for FrameProto {
    fn from(s: runner_sim::Snapshot) -> Self {
        Self {
            frame: 0,            // Must be set by caller
            commands: Vec::new(), // Must be set by caller
            tick: s.tick,
            score: s.score,
            best_score: s.best_score,
            is_over: s.is_over,
            actor: Some(s.actor.into()),
            obstacles: s.obstacles.into_iter().map(Into::into).collect(),
            viewport_width: s.viewport.width,
            viewport_height: s.viewport.height,
            digest: s.digest,
        }
    }
}

impl From<(&str, f64)> for TuningParameter {
    fn from((key, value): (&str, f64)) -> Self {
        Self {
            key: key.to_string(),
            value,
        }
    }
}

/// Decode a frame produced by the host edge.
pub fn decode_frame(bytes: &[u8]) -> Result<FrameProto, prost::DecodeError> {
    FrameProto::decode(bytes)
}

// ============================================================================
// Tests
// ============================================================================
