//! Runner Simulation Core
//!
//! This crate contains the deterministic, frame-stepped endless-runner
//! simulation: one actor that jumps, obstacles that scroll in from the right
//! edge, a score derived from elapsed ticks and a scroll speed that rises
//! with the score.
//!
//! # Architecture Constraints
//!
//! The Simulation Core MUST NOT:
//! - Perform I/O operations (storage, audio, rendering)
//! - Read wall-clock time
//! - Use ambient/unseeded randomness
//! - Scale physics by measured delta time
//!
//! Every transition is a function of the previous [`SessionState`], an
//! explicit [`RandomSource`] and the [`Tuning`]. Persisting the best score,
//! playing sounds and drawing frames belong to the host edge.

#![deny(unsafe_code)]

mod random;
mod tuning;

pub use random::{RNG_ALGORITHM, RandomSource, ScriptedRandom, SeededRandom};
pub use tuning::{MAX_SPAWN_INTERVAL, ObstacleGeometry, Tuning, TuningError};

// ============================================================================
// Type Aliases
// ============================================================================

/// A single discrete simulation step; one rendered frame.
pub type Tick = u64;

/// Raw ticks per displayed score point.
pub const TICKS_PER_POINT: u64 = 10;

/// Convert a raw tick count into display score units.
pub fn display_score(ticks: Tick) -> u64 {
    ticks / TICKS_PER_POINT
}

// ============================================================================
// Geometry
// ============================================================================

/// Drawing surface size handed in by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 200.0,
        }
    }
}

/// Axis-aligned box; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Shrink the right and bottom edges by `inset`.
    pub fn trimmed(self, inset: f64) -> Self {
        Self {
            width: self.width - inset,
            height: self.height - inset,
            ..self
        }
    }

    /// Strict overlap on both axes; touching edges do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

// ============================================================================
// Entities
// ============================================================================

/// The player-controlled entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub velocity_y: f64,
    pub airborne: bool,
}

impl ActorState {
    /// Actor standing on the ground line.
    pub fn at_rest(tuning: &Tuning) -> Self {
        Self {
            x: tuning.actor_x,
            y: tuning.ground_line,
            width: tuning.actor_width,
            height: tuning.actor_height,
            velocity_y: 0.0,
            airborne: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Collision box, trimmed for forgiving hits.
    pub fn hitbox(&self, tuning: &Tuning) -> Rect {
        self.bounds().trimmed(tuning.hitbox_inset)
    }

    /// Gravity, integration and the ground clamp.
    fn fall(&mut self, tuning: &Tuning) {
        self.velocity_y += tuning.gravity;
        self.y += self.velocity_y;

        if self.y >= tuning.ground_line {
            self.y = tuning.ground_line;
            self.velocity_y = 0.0;
            self.airborne = false;
        }
    }
}

/// Obstacle variety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// Low-profile hazard sitting on the ground (cactus).
    Ground,
    /// Hazard flying at head height (bird); unlocked later in a session.
    Airborne,
}

impl ObstacleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Airborne => "airborne",
        }
    }

    fn geometry(self, tuning: &Tuning) -> ObstacleGeometry {
        match self {
            Self::Ground => tuning.ground_obstacle,
            Self::Airborne => tuning.airborne_obstacle,
        }
    }

    fn digest_tag(self) -> u8 {
        match self {
            Self::Ground => 0,
            Self::Airborne => 1,
        }
    }
}

/// A hazard instance. Geometry is fixed at spawn; only `x` changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub kind: ObstacleKind,
    pub speed_offset: f64,
}

impl Obstacle {
    /// Create an obstacle of `kind` with its left edge at `x`.
    pub fn spawn(kind: ObstacleKind, x: f64, tuning: &Tuning) -> Self {
        let geometry = kind.geometry(tuning);
        Self {
            x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            kind,
            speed_offset: geometry.speed_offset,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn hitbox(&self, tuning: &Tuning) -> Rect {
        self.bounds().trimmed(tuning.hitbox_inset)
    }

    /// Trailing edge has passed the left edge of the viewport.
    pub fn is_off_screen(&self) -> bool {
        self.x + self.width <= 0.0
    }
}

// ============================================================================
// Session State Machine
// ============================================================================

/// Session phase. `Running` ticks; `GameOver` waits for a jump to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    GameOver,
}

/// Effect of a jump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOutcome {
    /// Impulse applied.
    Jumped,
    /// Already airborne; nothing changed.
    Ignored,
    /// The session was over and has been reset.
    Restarted,
}

/// Side facts about one tick, for the host to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// `best_ticks` grew this tick and should be persisted.
    pub new_best: bool,
    pub spawned: Option<ObstacleKind>,
    /// The session ended this tick.
    pub collided: bool,
}

/// Complete world state. Transitions never mutate in place; each returns
/// the next value.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Raw elapsed ticks; the score source.
    pub ticks: Tick,
    /// Current scroll speed; non-decreasing within a session.
    pub speed: f64,
    pub frames_until_spawn: i64,
    pub phase: Phase,
    pub actor: ActorState,
    /// Active obstacles in spawn order.
    pub obstacles: Vec<Obstacle>,
    pub viewport: Viewport,
    /// Best raw tick count known to this session.
    pub best_ticks: Tick,
}

impl SessionState {
    /// Fresh session: actor at rest, empty track, running at base speed.
    ///
    /// `best_ticks` seeds the high score (raw ticks, as persisted).
    pub fn start(
        viewport: Viewport,
        best_ticks: Tick,
        rng: &mut dyn RandomSource,
        tuning: &Tuning,
    ) -> Self {
        Self {
            ticks: 0,
            speed: tuning.base_speed,
            frames_until_spawn: spawn_interval(0, rng, tuning),
            phase: Phase::Running,
            actor: ActorState::at_rest(tuning),
            obstacles: Vec::new(),
            viewport,
            best_ticks,
        }
    }

    pub fn score(&self) -> u64 {
        display_score(self.ticks)
    }

    pub fn display_best(&self) -> u64 {
        display_score(self.best_ticks)
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Jump input. Restart is the same gesture as jump:
    ///
    /// | phase    | actor     | result                      |
    /// |----------|-----------|-----------------------------|
    /// | GameOver | any       | `start()`, `Restarted`      |
    /// | Running  | grounded  | impulse applied, `Jumped`   |
    /// | Running  | airborne  | unchanged, `Ignored`        |
    pub fn jump(&self, rng: &mut dyn RandomSource, tuning: &Tuning) -> (Self, JumpOutcome) {
        match self.phase {
            Phase::GameOver => {
                let next = Self::start(self.viewport, self.best_ticks, rng, tuning);
                (next, JumpOutcome::Restarted)
            }
            Phase::Running if self.actor.airborne => (self.clone(), JumpOutcome::Ignored),
            Phase::Running => {
                let mut next = self.clone();
                next.actor.velocity_y = tuning.jump_impulse;
                next.actor.airborne = true;
                (next, JumpOutcome::Jumped)
            }
        }
    }

    /// Advance one frame. A finished session is returned unchanged.
    pub fn tick(&self, rng: &mut dyn RandomSource, tuning: &Tuning) -> (Self, TickReport) {
        if self.is_over() {
            return (self.clone(), TickReport::default());
        }

        let mut next = self.clone();
        let mut report = TickReport::default();

        next.actor.fall(tuning);

        for obstacle in &mut next.obstacles {
            obstacle.x -= next.speed + obstacle.speed_offset;
        }
        next.obstacles.retain(|o| !o.is_off_screen());

        next.frames_until_spawn -= 1;
        if next.frames_until_spawn <= 0 {
            let kind = choose_kind(next.score(), rng, tuning);
            next.obstacles
                .push(Obstacle::spawn(kind, next.viewport.width, tuning));
            next.frames_until_spawn = spawn_interval(next.score(), rng, tuning);
            report.spawned = Some(kind);
        }

        next.ticks += 1;

        if next.ticks > next.best_ticks {
            next.best_ticks = next.ticks;
            report.new_best = true;
        }

        next.speed = speed_for_score(next.score(), tuning);

        let actor_box = next.actor.hitbox(tuning);
        if next
            .obstacles
            .iter()
            .any(|o| o.hitbox(tuning).overlaps(&actor_box))
        {
            next.phase = Phase::GameOver;
            report.collided = true;
        }

        (next, report)
    }

    /// Track a new viewport width. In-flight state is kept.
    pub fn resize(&self, width: f64) -> Self {
        let mut next = self.clone();
        next.viewport.width = width;
        next
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.ticks,
            score: self.score(),
            best_score: self.display_best(),
            is_over: self.is_over(),
            actor: self.actor.bounds(),
            obstacles: self
                .obstacles
                .iter()
                .map(|o| ObstacleView {
                    kind: o.kind,
                    bounds: o.bounds(),
                })
                .collect(),
            viewport: self.viewport,
            digest: self.state_digest(),
        }
    }

    /// FNV-1a 64-bit digest over everything that affects future ticks.
    ///
    /// Order: ticks, phase, speed, spawn countdown, best ticks, viewport
    /// width, actor (y, velocity, airborne), then obstacles in spawn order
    /// (x, kind).
    /// Floats are canonicalized first.
    pub fn state_digest(&self) -> u64 {
        let mut hasher = Fnv1a64::new();

        hasher.update(&self.ticks.to_le_bytes());
        hasher.update(&[u8::from(self.is_over())]);
        hasher.update(&canonicalize_f64(self.speed).to_le_bytes());
        hasher.update(&self.frames_until_spawn.to_le_bytes());
        hasher.update(&self.best_ticks.to_le_bytes());
        hasher.update(&canonicalize_f64(self.viewport.width).to_le_bytes());

        hasher.update(&canonicalize_f64(self.actor.y).to_le_bytes());
        hasher.update(&canonicalize_f64(self.actor.velocity_y).to_le_bytes());
        hasher.update(&[u8::from(self.actor.airborne)]);

        for obstacle in &self.obstacles {
            hasher.update(&canonicalize_f64(obstacle.x).to_le_bytes());
            hasher.update(&[obstacle.kind.digest_tag()]);
        }

        hasher.finish()
    }
}

/// What the host needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: Tick,
    pub score: u64,
    pub best_score: u64,
    pub is_over: bool,
    pub actor: Rect,
    pub obstacles: Vec<ObstacleView>,
    pub viewport: Viewport,
    pub digest: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleView {
    pub kind: ObstacleKind,
    pub bounds: Rect,
}

// ============================================================================
// Difficulty Policies
// ============================================================================

/// Scroll speed for a display score: stepwise, capped.
pub fn speed_for_score(score: u64, tuning: &Tuning) -> f64 {
    let level = score.checked_div(tuning.difficulty_interval).unwrap_or(0);
    (tuning.base_speed + level as f64 * tuning.speed_step).min(tuning.max_speed)
}

/// Adjusted `(min, max)` spawn interval bounds for a display score.
///
/// The multiplier saturates at `difficulty_cap`; `min` never drops below
/// `spawn_interval_floor` and `max` always clears `min` by the margin.
pub fn spawn_interval_bounds(score: u64, tuning: &Tuning) -> (i64, i64) {
    let multiplier = (1.0 + score as f64 / tuning.difficulty_divisor).min(tuning.difficulty_cap);
    let min = ((tuning.spawn_interval_min as f64 / multiplier).floor() as i64)
        .max(tuning.spawn_interval_floor);
    let max = ((tuning.spawn_interval_max as f64 / multiplier).floor() as i64)
        .max(min.saturating_add(tuning.spawn_interval_margin));
    (min, max)
}

/// Frames until the next spawn: uniform integer in the adjusted bounds,
/// inclusive. Draws one sample.
pub fn spawn_interval(score: u64, rng: &mut dyn RandomSource, tuning: &Tuning) -> i64 {
    let (min, max) = spawn_interval_bounds(score, tuning);
    let span = max.saturating_sub(min).saturating_add(1) as f64;
    let offset = (rng.next_unit() * span).floor() as i64;
    min.saturating_add(offset).min(max)
}

/// Kind of the next obstacle. Draws one sample even while only the ground
/// kind is eligible, so the sample stream does not depend on the score.
pub fn choose_kind(score: u64, rng: &mut dyn RandomSource, tuning: &Tuning) -> ObstacleKind {
    let sample = rng.next_unit();
    if score < tuning.airborne_unlock_score || sample < 0.5 {
        ObstacleKind::Ground
    } else {
        ObstacleKind::Airborne
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Owns a session together with its random source and tuning.
///
/// The host holds one `Runner` per mounted minigame and calls [`Runner::tick`]
/// once per frame.
#[derive(Debug, Clone)]
pub struct Runner<R = SeededRandom> {
    state: SessionState,
    rng: R,
    tuning: Tuning,
}

impl Runner<SeededRandom> {
    /// Runner over a ChaCha8 stream seeded with `seed`.
    pub fn seeded(seed: u64, viewport: Viewport, best_ticks: Tick, tuning: Tuning) -> Self {
        Self::new(viewport, best_ticks, SeededRandom::new(seed), tuning)
    }
}

impl<R: RandomSource> Runner<R> {
    /// Create a runner and start its first session.
    pub fn new(viewport: Viewport, best_ticks: Tick, mut rng: R, tuning: Tuning) -> Self {
        let state = SessionState::start(viewport, best_ticks, &mut rng, &tuning);
        Self { state, rng, tuning }
    }

    /// Reset the session in place; equivalent to a restart.
    pub fn start(&mut self) {
        self.state = SessionState::start(
            self.state.viewport,
            self.state.best_ticks,
            &mut self.rng,
            &self.tuning,
        );
    }

    pub fn request_jump(&mut self) -> JumpOutcome {
        let (next, outcome) = self.state.jump(&mut self.rng, &self.tuning);
        self.state = next;
        outcome
    }

    pub fn tick(&mut self) -> TickReport {
        let (next, report) = self.state.tick(&mut self.rng, &self.tuning);
        self.state = next;
        report
    }

    pub fn resize(&mut self, width: f64) {
        self.state = self.state.resize(width);
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn state_digest(&self) -> u64 {
        self.state.state_digest()
    }
}

// ============================================================================
// StateDigest Implementation
// ============================================================================

/// StateDigest algorithm identifier.
pub const STATE_DIGEST_ALGO_ID: &str = "statedigest-v1-fnv1a64-le-f64canon-runner";

/// FNV-1a 64-bit offset basis.
const FNV1A_OFFSET_BASIS: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.
const FNV1A_PRIME: u64 = 0x100000001b3;

#[derive(Debug, Clone)]
struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS,
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV1A_PRIME);
        }
    }

    fn finish(self) -> u64 {
        self.state
    }
}

/// `-0.0` hashes as `+0.0`; every NaN hashes as the quiet NaN.
fn canonicalize_f64(value: f64) -> u64 {
    const QUIET_NAN_BITS: u64 = 0x7ff8000000000000;

    if value.is_nan() {
        QUIET_NAN_BITS
    } else if value == 0.0 {
        0u64
    } else {
        value.to_bits()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Tuning whose first spawn lies far beyond any test horizon.
    fn empty_track() -> Tuning {
        Tuning {
            spawn_interval_min: 1_000_000,
            spawn_interval_max: 1_000_000,
            ..Tuning::default()
        }
    }

    fn fresh(tuning: &Tuning) -> SessionState {
        SessionState::start(
            Viewport::default(),
            0,
            &mut ScriptedRandom::default(),
            tuning,
        )
    }

    fn run(mut state: SessionState, ticks: u64, tuning: &Tuning) -> SessionState {
        let mut rng = ScriptedRandom::default();
        for _ in 0..ticks {
            state = state.tick(&mut rng, tuning).0;
        }
        state
    }

    // ========================================================================
    // Start
    // ========================================================================

    #[test]
    fn test_start_is_fresh_running_session() {
        let tuning = Tuning::default();
        let state = fresh(&tuning);

        assert_eq!(state.ticks, 0);
        assert_eq!(state.speed, tuning.base_speed);
        assert_eq!(state.phase, Phase::Running);
        assert!(state.is_playing());
        assert!(!state.is_over());
        assert!(state.obstacles.is_empty());
        assert_eq!(state.actor, ActorState::at_rest(&tuning));
        // Sample 0.0 picks the minimum interval at score 0.
        assert_eq!(state.frames_until_spawn, 70);
    }

    #[test]
    fn test_runner_start_while_playing_restarts() {
        let mut runner = Runner::seeded(3, Viewport::default(), 0, empty_track());
        for _ in 0..25 {
            runner.tick();
        }
        runner.request_jump();
        runner.start();

        assert_eq!(runner.state().ticks, 0);
        assert!(!runner.state().actor.airborne);
        assert!(runner.state().is_playing());
        assert_eq!(runner.state().best_ticks, 25);
    }

    // ========================================================================
    // Actor Physics
    // ========================================================================

    #[test]
    fn test_actor_stays_between_top_and_ground() {
        let tuning = Tuning::default();
        let mut runner = Runner::seeded(11, Viewport::default(), 0, tuning.clone());

        for _ in 0..5_000 {
            runner.request_jump();
            let was_airborne = runner.state().actor.airborne;
            runner.tick();

            let actor = &runner.state().actor;
            assert!(actor.y >= 0.0, "actor above world: {}", actor.y);
            assert!(actor.y <= tuning.ground_line, "actor below ground: {}", actor.y);
            if was_airborne && !actor.airborne {
                assert_eq!(actor.y, tuning.ground_line);
                assert_eq!(actor.velocity_y, 0.0);
            }
        }
    }

    #[test]
    fn test_jump_arc_lands_with_zero_velocity() {
        let tuning = empty_track();
        let (mut state, outcome) = fresh(&tuning).jump(&mut ScriptedRandom::default(), &tuning);
        assert_eq!(outcome, JumpOutcome::Jumped);
        assert_eq!(state.actor.velocity_y, tuning.jump_impulse);

        let mut rng = ScriptedRandom::default();
        let mut airborne_ticks = 0;
        while state.actor.airborne {
            state = state.tick(&mut rng, &tuning).0;
            airborne_ticks += 1;
            assert!(airborne_ticks < 100, "actor never landed");
        }

        assert_eq!(state.actor.y, tuning.ground_line);
        assert_eq!(state.actor.velocity_y, 0.0);
        assert!(airborne_ticks > 30);
    }

    #[test]
    fn test_jump_while_airborne_is_noop() {
        let tuning = empty_track();
        let mut rng = ScriptedRandom::default();
        let (jumped, _) = fresh(&tuning).jump(&mut rng, &tuning);
        let (mid_air, _) = jumped.tick(&mut rng, &tuning);

        let (after, outcome) = mid_air.jump(&mut rng, &tuning);

        assert_eq!(outcome, JumpOutcome::Ignored);
        assert_eq!(after.actor.velocity_y, mid_air.actor.velocity_y);
        assert_eq!(after.actor.airborne, mid_air.actor.airborne);
        assert_eq!(after, mid_air);
    }

    // ========================================================================
    // Score & Speed
    // ========================================================================

    #[rstest]
    #[case(0, 0)]
    #[case(9, 0)]
    #[case(10, 1)]
    #[case(799, 79)]
    #[case(800, 80)]
    fn test_score_is_ticks_over_ten(#[case] ticks: u64, #[case] expected: u64) {
        let tuning = empty_track();
        let state = run(fresh(&tuning), ticks, &tuning);
        assert_eq!(state.ticks, ticks);
        assert_eq!(state.score(), expected);
    }

    #[test]
    fn test_800_clear_ticks_score_80() {
        let tuning = empty_track();
        let state = run(fresh(&tuning), 800, &tuning);

        assert_eq!(state.score(), 80);
        assert!(!state.is_over());
        assert!(state.is_playing());
    }

    #[rstest]
    #[case(0, 6.0)]
    #[case(49, 6.0)]
    #[case(50, 6.5)]
    #[case(549, 11.0)]
    #[case(550, 11.5)]
    #[case(1_000_000, 11.5)]
    fn test_speed_steps(#[case] score: u64, #[case] expected: f64) {
        assert_eq!(speed_for_score(score, &Tuning::default()), expected);
    }

    #[test]
    fn test_speed_non_decreasing_and_capped() {
        let tuning = Tuning::default();
        let mut previous = speed_for_score(0, &tuning);
        for score in 1..20_000 {
            let speed = speed_for_score(score, &tuning);
            assert!(speed >= previous, "speed dropped at score {score}");
            assert!(speed <= tuning.max_speed);
            previous = speed;
        }
    }

    #[test]
    fn test_speed_zero_interval_stays_at_base() {
        let tuning = Tuning {
            difficulty_interval: 0,
            ..Tuning::default()
        };
        assert_eq!(speed_for_score(10_000, &tuning), tuning.base_speed);
    }

    // ========================================================================
    // Obstacles
    // ========================================================================

    #[test]
    fn test_obstacle_leaves_after_ceil_distance_over_speed() {
        let mut tuning = empty_track();
        tuning.airborne_obstacle.speed_offset = 0.0;
        let width = 600.0;

        let mut state = SessionState::start(
            Viewport {
                width,
                height: 200.0,
            },
            0,
            &mut ScriptedRandom::default(),
            &tuning,
        );
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Airborne, width, &tuning));

        let obstacle_width = tuning.airborne_obstacle.width;
        let expected = ((width + obstacle_width) / 6.0).ceil() as u64;
        assert_eq!(expected, 104);

        let mut rng = ScriptedRandom::default();
        for tick in 1..=expected {
            state = state.tick(&mut rng, &tuning).0;
            if tick < expected {
                assert_eq!(state.obstacles.len(), 1, "removed early at tick {tick}");
                assert!(state.obstacles[0].x > -obstacle_width);
            }
        }

        assert!(state.obstacles.is_empty(), "obstacle lingered");
        assert!(!state.is_over());
    }

    #[rstest]
    #[case::exactly_off(-14.0, true)]
    #[case::half_pixel_left(-13.5, false)]
    fn test_removal_boundary(#[case] start_x: f64, #[case] removed: bool) {
        let tuning = empty_track();
        let mut state = fresh(&tuning);
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Ground, start_x, &tuning));

        let next = run(state, 1, &tuning);
        assert_eq!(next.obstacles.is_empty(), removed);
    }

    #[test]
    fn test_spawn_at_right_edge_resets_countdown() {
        let tuning = Tuning::default();
        let mut state = fresh(&tuning);
        state.frames_until_spawn = 1;

        // Kind sample 0.9 would pick airborne, but score 0 is below unlock.
        let mut rng = ScriptedRandom::new([0.9, 0.0]);
        let (next, report) = state.tick(&mut rng, &tuning);

        assert_eq!(report.spawned, Some(ObstacleKind::Ground));
        assert_eq!(next.obstacles.len(), 1);
        assert_eq!(next.obstacles[0].x, next.viewport.width);
        assert_eq!(next.obstacles[0].y, tuning.ground_obstacle.y);
        assert_eq!(next.frames_until_spawn, 70);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn test_spawn_after_unlock_can_be_airborne() {
        let tuning = Tuning::default();
        let mut state = fresh(&tuning);
        state.ticks = 800;
        state.best_ticks = 800;
        state.frames_until_spawn = 1;

        let mut rng = ScriptedRandom::new([0.9, 0.0]);
        let (next, report) = state.tick(&mut rng, &tuning);

        assert_eq!(report.spawned, Some(ObstacleKind::Airborne));
        assert_eq!(next.obstacles[0].height, tuning.airborne_obstacle.height);
        assert_eq!(next.frames_until_spawn, 45);
    }

    #[test]
    fn test_obstacle_kind_labels() {
        assert_eq!(ObstacleKind::Ground.as_str(), "ground");
        assert_eq!(ObstacleKind::Airborne.as_str(), "airborne");
    }

    #[test]
    fn test_only_ground_kind_before_unlock() {
        let tuning = Tuning::default();
        let mut rng = SeededRandom::new(5);
        for score in 0..tuning.airborne_unlock_score {
            for _ in 0..50 {
                assert_eq!(choose_kind(score, &mut rng, &tuning), ObstacleKind::Ground);
            }
        }
    }

    #[test]
    fn test_both_kinds_after_unlock() {
        let tuning = Tuning::default();
        let mut rng = SeededRandom::new(5);
        let kinds: Vec<_> = (0..500)
            .map(|_| choose_kind(tuning.airborne_unlock_score, &mut rng, &tuning))
            .collect();

        assert!(kinds.contains(&ObstacleKind::Ground));
        assert!(kinds.contains(&ObstacleKind::Airborne));
    }

    // ========================================================================
    // Spawn Interval Policy
    // ========================================================================

    #[rstest]
    #[case::start(0, (70, 120))]
    #[case::capped(96, (45, 66))]
    #[case::far_past_cap(10_000, (45, 66))]
    fn test_spawn_interval_bounds(#[case] score: u64, #[case] expected: (i64, i64)) {
        assert_eq!(spawn_interval_bounds(score, &Tuning::default()), expected);
    }

    #[test]
    fn test_spawn_interval_bounds_shrink_with_score() {
        let tuning = Tuning::default();
        let mut previous = spawn_interval_bounds(0, &tuning);
        for score in 1..500 {
            let (min, max) = spawn_interval_bounds(score, &tuning);
            assert!(min >= tuning.spawn_interval_floor);
            assert!(max >= min + tuning.spawn_interval_margin);
            assert!(min <= previous.0 && max <= previous.1);
            previous = (min, max);
        }
    }

    #[rstest]
    #[case::lowest(0.0, 70)]
    #[case::middle(0.5, 95)]
    #[case::highest(0.999_999, 120)]
    #[case::out_of_range_sample(1.0, 120)]
    fn test_spawn_interval_sample_mapping(#[case] sample: f64, #[case] expected: i64) {
        let mut rng = ScriptedRandom::new([sample]);
        assert_eq!(spawn_interval(0, &mut rng, &Tuning::default()), expected);
    }

    #[test]
    fn test_spawn_interval_saturates_at_extreme_bounds() {
        let tuning = Tuning {
            spawn_interval_min: i64::MAX,
            spawn_interval_max: i64::MAX,
            ..Tuning::default()
        };
        assert_eq!(spawn_interval_bounds(0, &tuning), (i64::MAX, i64::MAX));

        let mut rng = ScriptedRandom::new([0.5]);
        assert_eq!(spawn_interval(0, &mut rng, &tuning), i64::MAX);
    }

    // ========================================================================
    // Collision
    // ========================================================================

    #[test]
    fn test_overlap_ends_session() {
        let tuning = empty_track();
        let mut state = fresh(&tuning);
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Ground, 50.0, &tuning));

        let (next, report) = state.tick(&mut ScriptedRandom::default(), &tuning);

        assert!(report.collided);
        assert!(next.is_over());
        assert!(!next.is_playing());
    }

    #[test]
    fn test_disjoint_boxes_keep_running() {
        let tuning = empty_track();
        let mut state = fresh(&tuning);
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Ground, 200.0, &tuning));

        let (next, report) = state.tick(&mut ScriptedRandom::default(), &tuning);

        assert!(!report.collided);
        assert!(!next.is_over());
    }

    #[test]
    fn test_touching_trimmed_edges_do_not_collide() {
        let tuning = empty_track();
        let mut state = fresh(&tuning);
        // After one tick at speed 6 the trimmed right edge sits at x = 50.
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Ground, 46.0, &tuning));

        let (next, _) = state.tick(&mut ScriptedRandom::default(), &tuning);
        assert!(!next.is_over());
    }

    #[test]
    fn test_airborne_obstacle_clears_grounded_actor() {
        let tuning = empty_track();
        let actor = ActorState::at_rest(&tuning);
        let bird = Obstacle::spawn(ObstacleKind::Airborne, actor.x, &tuning);
        assert!(!bird.hitbox(&tuning).overlaps(&actor.hitbox(&tuning)));
    }

    #[test]
    fn test_game_over_stops_ticking() {
        let tuning = empty_track();
        let mut state = fresh(&tuning);
        state.phase = Phase::GameOver;

        let (next, report) = state.tick(&mut ScriptedRandom::default(), &tuning);
        assert_eq!(next, state);
        assert_eq!(report, TickReport::default());
    }

    // ========================================================================
    // Restart
    // ========================================================================

    #[test]
    fn test_jump_while_over_resets_session() {
        let tuning = Tuning::default();
        let mut state = fresh(&tuning);
        state.ticks = 512;
        state.best_ticks = 900;
        state.speed = 11.0;
        state.phase = Phase::GameOver;
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Ground, 60.0, &tuning));
        state = state.resize(420.0);

        let (next, outcome) = state.jump(&mut ScriptedRandom::default(), &tuning);

        assert_eq!(outcome, JumpOutcome::Restarted);
        assert!(next.obstacles.is_empty());
        assert_eq!(next.ticks, 0);
        assert_eq!(next.score(), 0);
        assert!(next.is_playing());
        assert!(!next.is_over());
        assert_eq!(next.speed, tuning.base_speed);
        assert!(!next.actor.airborne);
        assert_eq!(next.actor.velocity_y, 0.0);
        assert_eq!(next.best_ticks, 900);
        assert_eq!(next.viewport.width, 420.0);
    }

    // ========================================================================
    // Best Score
    // ========================================================================

    #[test]
    fn test_best_ticks_tracks_maximum_across_sessions() {
        let mut runner = Runner::seeded(21, Viewport::default(), 0, Tuning::default());
        let mut max_seen = 0;
        let mut previous_best = 0;

        for _ in 0..4 {
            while !runner.is_over() && runner.state().ticks < 10_000 {
                runner.tick();
                max_seen = max_seen.max(runner.state().ticks);
                assert!(runner.state().best_ticks >= previous_best);
                previous_best = runner.state().best_ticks;
            }
            assert!(runner.is_over(), "no jumps should end in a collision");
            assert_eq!(runner.request_jump(), JumpOutcome::Restarted);
        }

        assert_eq!(runner.state().best_ticks, max_seen);
    }

    #[test]
    fn test_seeded_best_is_not_lowered() {
        let tuning = empty_track();
        let mut rng = ScriptedRandom::default();
        let mut state = SessionState::start(Viewport::default(), 5_000, &mut rng, &tuning);
        for _ in 0..100 {
            let (next, report) = state.tick(&mut rng, &tuning);
            assert!(!report.new_best);
            state = next;
        }
        assert_eq!(state.best_ticks, 5_000);
        assert_eq!(state.display_best(), 500);
    }

    #[test]
    fn test_new_best_reported_once_per_tick_past_record() {
        let tuning = empty_track();
        let mut rng = ScriptedRandom::default();
        let mut state = SessionState::start(Viewport::default(), 3, &mut rng, &tuning);

        let reports: Vec<bool> = (0..5)
            .map(|_| {
                let (next, report) = state.tick(&mut rng, &tuning);
                state = next;
                report.new_best
            })
            .collect();

        assert_eq!(reports, vec![false, false, false, true, true]);
        assert_eq!(state.best_ticks, 5);
    }

    // ========================================================================
    // Resize & Snapshot
    // ========================================================================

    #[test]
    fn test_resize_keeps_in_flight_state() {
        let tuning = empty_track();
        let state = run(fresh(&tuning), 30, &tuning);
        let resized = state.resize(360.0);

        assert_eq!(resized.viewport.width, 360.0);
        assert_eq!(resized.ticks, state.ticks);
        assert_eq!(resized.actor, state.actor);
    }

    #[test]
    fn test_snapshot_exposes_render_state() {
        let tuning = Tuning::default();
        let mut state = fresh(&tuning);
        state.ticks = 123;
        state.best_ticks = 4_567;
        state
            .obstacles
            .push(Obstacle::spawn(ObstacleKind::Airborne, 300.0, &tuning));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.tick, 123);
        assert_eq!(snapshot.score, 12);
        assert_eq!(snapshot.best_score, 456);
        assert!(!snapshot.is_over);
        assert_eq!(snapshot.actor, state.actor.bounds());
        assert_eq!(snapshot.obstacles.len(), 1);
        assert_eq!(snapshot.obstacles[0].kind, ObstacleKind::Airborne);
        assert_eq!(snapshot.digest, state.state_digest());
    }

    // ========================================================================
    // Determinism & StateDigest
    // ========================================================================

    #[test]
    fn test_same_seed_same_inputs_same_digest() {
        fn play() -> (u64, SessionState) {
            let mut runner = Runner::seeded(42, Viewport::default(), 0, Tuning::default());
            for tick in 0..2_000u64 {
                if tick % 37 == 0 {
                    runner.request_jump();
                }
                runner.tick();
            }
            (runner.state_digest(), runner.state().clone())
        }

        let (digest1, state1) = play();
        let (digest2, state2) = play();
        assert_eq!(digest1, digest2);
        assert_eq!(state1, state2);
    }

    #[test]
    fn test_state_digest_changes_with_state() {
        let tuning = empty_track();
        let state = fresh(&tuning);
        let next = run(state.clone(), 1, &tuning);
        assert_ne!(state.state_digest(), next.state_digest());
    }

    #[test]
    fn test_state_digest_covers_viewport_width() {
        let tuning = empty_track();
        let state = fresh(&tuning);
        assert_ne!(state.state_digest(), state.resize(360.0).state_digest());
    }

    #[test]
    fn test_f64_canonicalization() {
        assert_eq!(canonicalize_f64(-0.0), canonicalize_f64(0.0));
        assert_eq!(canonicalize_f64(-0.0), 0u64);

        let nan1 = f64::NAN;
        let nan2 = f64::from_bits(0x7ff0000000000001);
        assert_eq!(canonicalize_f64(nan1), canonicalize_f64(nan2));
        assert_eq!(canonicalize_f64(nan1), 0x7ff8000000000000);

        assert_eq!(canonicalize_f64(1.0), 1.0f64.to_bits());
    }
}
