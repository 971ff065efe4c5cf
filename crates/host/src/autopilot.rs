//! A naive player for headless runs.

use runner_sim::{ObstacleKind, SessionState};

/// Frames of look-ahead at the current speed.
const LOOKAHEAD_FRAMES: f64 = 8.0;

/// Jump when a ground obstacle is about to reach a grounded actor.
///
/// Airborne obstacles are ignored: their trimmed hitbox ends where a
/// grounded actor's begins, so they never connect.
pub fn should_jump(state: &SessionState) -> bool {
    if !state.is_playing() || state.actor.airborne {
        return false;
    }

    let front = state.actor.x + state.actor.width;
    let reach = state.speed * LOOKAHEAD_FRAMES;
    state
        .obstacles
        .iter()
        .filter(|o| o.kind == ObstacleKind::Ground)
        .any(|o| {
            let gap = o.x - front;
            (0.0..=reach).contains(&gap)
        })
}
