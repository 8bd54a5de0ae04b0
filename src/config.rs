/// Game tuning.
///
/// Every constant the simulation and the frame loop depend on lives in
/// `Config`.  The defaults reproduce the classic balance; a JSON file named
/// by `ECO_DEFENDER_CONFIG` may override any subset of fields.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::entities::Rect;

/// Environment variable naming an optional JSON tuning file.
pub const CONFIG_ENV: &str = "ECO_DEFENDER_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ── Canvas ───────────────────────────────────────────────────────────────
    pub screen_width: i32,
    pub screen_height: i32,
    pub ground_height: i32,

    // ── Player group ─────────────────────────────────────────────────────────
    pub player_width: i32,
    pub player_height: i32,
    pub player_speed: i32,

    // ── Leaves & trees ───────────────────────────────────────────────────────
    pub leaf_width: i32,
    pub leaf_height: i32,
    pub leaf_speed: i32,
    pub tree_width: i32,
    pub tree_height: i32,
    /// Time a planted leaf needs to mature into a tree (ms)
    pub growth_time_ms: u64,
    /// Minimum time between two leaves fired by the same tree (ms)
    pub tree_shoot_interval_ms: u64,

    // ── Pollution ────────────────────────────────────────────────────────────
    pub cloud_width: i32,
    pub cloud_height: i32,
    pub cloud_speed: i32,
    /// A cloud spawns on a frame with probability 1 / `cloud_spawn_odds`
    pub cloud_spawn_odds: u32,
    pub initial_clouds: u32,
    pub factory_width: i32,
    pub factory_height: i32,

    // ── Win condition ────────────────────────────────────────────────────────
    pub neutral_target: u32,
    pub neutral_banner_ms: u64,

    // ── Frame loop ───────────────────────────────────────────────────────────
    pub frame_rate: u32,
    pub intro_timeout_ms: u64,
    pub victory_screen_ms: u64,
    pub error_hold_frames: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            ground_height: 50,

            player_width: 60,
            player_height: 80,
            player_speed: 5,

            leaf_width: 20,
            leaf_height: 40,
            leaf_speed: 7,
            tree_width: 40,
            tree_height: 60,
            growth_time_ms: 3000,
            tree_shoot_interval_ms: 3000,

            cloud_width: 40,
            cloud_height: 30,
            cloud_speed: 3,
            cloud_spawn_odds: 30,
            initial_clouds: 5,
            factory_width: 60,
            factory_height: 150,

            neutral_target: 10,
            neutral_banner_ms: 2000,

            frame_rate: 60,
            intro_timeout_ms: 30_000,
            victory_screen_ms: 5000,
            error_hold_frames: 300,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON tuning document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).context("malformed tuning JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read tuning file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid tuning file {}", path.display()))
    }

    /// Load from `ECO_DEFENDER_CONFIG` if set, otherwise use the defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let config = Self::load(Path::new(&path))?;
                log::info!("Loaded tuning from {}", Path::new(&path).display());
                Ok(config)
            }
            None => {
                log::info!("Using default tuning");
                Ok(Self::default())
            }
        }
    }

    /// Reject tunings the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("screen_width", self.screen_width),
            ("screen_height", self.screen_height),
            ("ground_height", self.ground_height),
            ("player_width", self.player_width),
            ("player_height", self.player_height),
            ("player_speed", self.player_speed),
            ("leaf_width", self.leaf_width),
            ("leaf_height", self.leaf_height),
            ("leaf_speed", self.leaf_speed),
            ("tree_width", self.tree_width),
            ("tree_height", self.tree_height),
            ("cloud_width", self.cloud_width),
            ("cloud_height", self.cloud_height),
            ("cloud_speed", self.cloud_speed),
            ("factory_width", self.factory_width),
            ("factory_height", self.factory_height),
        ];
        for (name, value) in sizes {
            if value <= 0 {
                bail!("{name} must be positive, got {value}");
            }
        }
        if self.cloud_spawn_odds == 0 {
            bail!("cloud_spawn_odds must be at least 1");
        }
        if self.frame_rate == 0 {
            bail!("frame_rate must be at least 1");
        }
        if self.neutral_target == 0 {
            bail!("neutral_target must be at least 1");
        }
        if self.player_width > self.screen_width
            || self.player_height + self.ground_height > self.screen_height
        {
            bail!("player group does not fit above the ground");
        }
        if self.factory_width + self.cloud_width > self.screen_width
            || self.factory_height + self.cloud_height + self.ground_height > self.screen_height
        {
            bail!("factory and its cloud spawn point do not fit on screen");
        }
        // A falling leaf must land inside the ground strip on some frame
        if self.leaf_speed >= self.leaf_height + self.ground_height {
            bail!(
                "leaf_speed {} would skip over the ground (must be below {})",
                self.leaf_speed,
                self.leaf_height + self.ground_height
            );
        }
        if self.tree_height > self.ground_top() {
            bail!("trees are taller than the sky");
        }
        Ok(())
    }

    // ── Derived geometry ─────────────────────────────────────────────────────

    /// y coordinate of the ground surface.
    pub fn ground_top(&self) -> i32 {
        self.screen_height - self.ground_height
    }

    pub fn ground_rect(&self) -> Rect {
        Rect::new(0, self.ground_top(), self.screen_width, self.ground_height)
    }

    /// The factory stands on the ground against the right edge.
    pub fn factory_rect(&self) -> Rect {
        Rect::new(
            self.screen_width - self.factory_width,
            self.ground_top() - self.factory_height,
            self.factory_width,
            self.factory_height,
        )
    }

    /// Top-left corner of a freshly spawned cloud, just off the factory's
    /// upper-left corner.
    pub fn cloud_spawn_rect(&self) -> Rect {
        let factory = self.factory_rect();
        Rect::new(
            factory.x - self.cloud_width,
            factory.y - self.cloud_height,
            self.cloud_width,
            self.cloud_height,
        )
    }

    /// Largest x the player anchor may take.
    pub fn player_max_x(&self) -> i32 {
        self.screen_width - self.player_width
    }

    /// Largest y the player anchor may take.
    pub fn player_max_y(&self) -> i32 {
        self.screen_height - self.player_height - self.ground_height
    }

    pub fn frame_millis(&self) -> u64 {
        1000 / self.frame_rate as u64
    }
}
