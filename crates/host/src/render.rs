//! Snapshot → drawing commands.
//!
//! Commands are listed in paint order and use abstract inks, so the page can
//! apply its current theme colors.

use runner_sim::{Rect, Snapshot};
use runner_wire::{DrawCmdProto, Ink, TextAlign};

pub const GROUND_Y: f64 = 195.0;
pub const GROUND_LINE_WIDTH: f64 = 2.0;
pub const EYE_OFFSET: (f64, f64) = (28.0, 8.0);
pub const EYE_SIZE: f64 = 6.0;

pub const GAME_OVER_TEXT: &str = "GAME OVER";
pub const RESTART_HINT_TEXT: &str = "Click or Press SPACE to restart";
const GAME_OVER_Y: f64 = 80.0;
const GAME_OVER_SIZE: f64 = 20.0;
const RESTART_HINT_Y: f64 = 105.0;
const RESTART_HINT_SIZE: f64 = 14.0;

const HUD_MARGIN: f64 = 12.0;
const HUD_Y: f64 = 20.0;
const HUD_SIZE: f64 = 14.0;

/// Zero-pad a display score to five digits; wider values are kept whole.
pub fn pad_score(score: u64) -> String {
    format!("{score:05}")
}

/// Score readouts shown above the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hud {
    /// `HI 00012`
    pub best: String,
    /// `00034`
    pub score: String,
}

impl Hud {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            best: format!("HI {}", pad_score(snapshot.best_score)),
            score: pad_score(snapshot.score),
        }
    }
}

/// Paint order: ground, actor, eye, obstacles, game-over text, HUD.
pub fn draw_commands(snapshot: &Snapshot) -> Vec<DrawCmdProto> {
    let width = snapshot.viewport.width;
    let mut commands = Vec::with_capacity(snapshot.obstacles.len() + 7);

    commands.push(DrawCmdProto::line(
        (0.0, GROUND_Y),
        (width, GROUND_Y),
        GROUND_LINE_WIDTH,
        Ink::Foreground,
    ));

    let actor = snapshot.actor;
    commands.push(DrawCmdProto::fill_rect(actor.into(), Ink::Foreground));
    let eye = Rect {
        x: actor.x + EYE_OFFSET.0,
        y: actor.y + EYE_OFFSET.1,
        width: EYE_SIZE,
        height: EYE_SIZE,
    };
    commands.push(DrawCmdProto::fill_rect(eye.into(), Ink::Background));

    for obstacle in &snapshot.obstacles {
        commands.push(DrawCmdProto::fill_rect(
            obstacle.bounds.into(),
            Ink::Foreground,
        ));
    }

    if snapshot.is_over {
        let center = width / 2.0;
        commands.push(DrawCmdProto::text(
            GAME_OVER_TEXT,
            (center, GAME_OVER_Y),
            GAME_OVER_SIZE,
            TextAlign::Center,
        ));
        commands.push(DrawCmdProto::text(
            RESTART_HINT_TEXT,
            (center, RESTART_HINT_Y),
            RESTART_HINT_SIZE,
            TextAlign::Center,
        ));
    }

    let hud = Hud::from_snapshot(snapshot);
    commands.push(DrawCmdProto::text(
        format!("{}  {}", hud.best, hud.score),
        (width - HUD_MARGIN, HUD_Y),
        HUD_SIZE,
        TextAlign::Right,
    ));

    commands
}
