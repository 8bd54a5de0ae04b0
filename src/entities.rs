/// All game entity types — pure data, no game rules.
///
/// Coordinates live on the fixed logical canvas (pixels, origin top-left,
/// y grows downward).  The renderer scales them to terminal cells.

use crate::config::Config;

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> i32 {
        self.x + self.w / 2
    }

    /// Strict overlap test: rectangles that merely share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

// ── Player ────────────────────────────────────────────────────────────────────

/// Anchor of the player group.  The three avatars are drawn at fixed
/// offsets from it and carry no state of their own.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub x: i32,
    pub y: i32,
}

// ── Leaves ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafPhase {
    /// Travelling upward after being thrown or fired by a tree.
    Rising,
    /// Reached the top of the screen, now dropping.
    Falling,
    /// Resting on the ground, counting down to become a tree.
    Planted { plant_time: u64, last_shoot_time: u64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub rect: Rect,
    pub phase: LeafPhase,
}

impl Leaf {
    pub fn rising(rect: Rect) -> Self {
        Self {
            rect,
            phase: LeafPhase::Rising,
        }
    }

    pub fn is_rising(&self) -> bool {
        self.phase == LeafPhase::Rising
    }

    pub fn is_planted(&self) -> bool {
        matches!(self.phase, LeafPhase::Planted { .. })
    }

    /// Timestamp at which the leaf touched the ground, if it has.
    pub fn plant_time(&self) -> Option<u64> {
        match self.phase {
            LeafPhase::Planted { plant_time, .. } => Some(plant_time),
            _ => None,
        }
    }
}

// ── Trees & clouds ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    pub rect: Rect,
    pub last_shoot_time: u64,
}

/// A pollution cloud.  Its velocity is implicit: a fixed leftward drift
/// plus per-frame vertical jitter.
#[derive(Clone, Debug, PartialEq)]
pub struct Cloud {
    pub rect: Rect,
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    /// At least one cloud is on screen.
    Polluted,
    /// No clouds on screen.
    TemporarilyNeutral,
    /// The factory went neutral often enough.  Terminal.
    Won,
}

// ── Master game state ─────────────────────────────────────────────────────────

/// The entire game state.  Cloneable so pure update functions can
/// return a new copy without mutating the original.
#[derive(Clone, Debug)]
pub struct GameState {
    pub player: Player,
    pub leaves: Vec<Leaf>,
    pub trees: Vec<Tree>,
    pub clouds: Vec<Cloud>,
    /// Clouds destroyed by leaves or trees since the game began.
    pub clouds_destroyed: u32,
    /// Number of times the factory has become carbon neutral.
    pub times_neutral: u32,
    /// Set by a random cloud spawn, cleared by the next neutral transition.
    pub episode_active: bool,
    /// When the "temporarily neutral" banner was raised, while it is visible.
    pub neutral_banner_since: Option<u64>,
    pub status: GameStatus,
    pub frame: u64,
    pub config: Config,
}

impl GameState {
    /// Current pollution level shown on the HUD and used to colour the factory.
    pub fn pollution(&self) -> usize {
        self.clouds.len()
    }

    pub fn is_won(&self) -> bool {
        self.status == GameStatus::Won
    }

    pub fn player_rect(&self) -> Rect {
        Rect::new(
            self.player.x,
            self.player.y,
            self.config.player_width,
            self.config.player_height,
        )
    }
}
