/// Pure game-logic functions.
///
/// Every public function takes an immutable reference to the current
/// `GameState` (plus the frame timestamp and an RNG handle where needed) and
/// returns a brand-new `GameState`.  Timestamps are milliseconds since the
/// game started; the caller owns the clock.  Side effects are limited to the
/// injected RNG and log output.

use rand::Rng;

use crate::config::Config;
use crate::entities::{Cloud, GameState, GameStatus, Leaf, LeafPhase, Player, Rect, Tree};

/// Everything the player asked for during one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Throw key-down edges seen this frame (holding the key does not repeat).
    pub throws: u32,
}

// ── Constructors ─────────────────────────────────────────────────────────────

/// Build the initial game state: player centred on the ground, the initial
/// batch of clouds stacked at the factory.  The initial batch does not open a
/// pollution episode; only a random spawn does.
pub fn init_state(config: Config) -> GameState {
    let clouds = (0..config.initial_clouds)
        .map(|_| Cloud {
            rect: config.cloud_spawn_rect(),
        })
        .collect::<Vec<_>>();
    let status = if clouds.is_empty() {
        GameStatus::TemporarilyNeutral
    } else {
        GameStatus::Polluted
    };

    GameState {
        player: Player {
            x: config.screen_width / 2 - config.player_width / 2,
            y: config.player_max_y(),
        },
        leaves: Vec::new(),
        trees: Vec::new(),
        clouds,
        clouds_destroyed: 0,
        times_neutral: 0,
        episode_active: false,
        neutral_banner_since: None,
        status,
        frame: 0,
        config,
    }
}

// ── Input-driven state transitions (pure) ───────────────────────────────────

pub fn move_player_left(state: &GameState) -> GameState {
    let x = (state.player.x - state.config.player_speed).max(0);
    GameState {
        player: Player { x, ..state.player.clone() },
        ..state.clone()
    }
}

pub fn move_player_right(state: &GameState) -> GameState {
    let x = (state.player.x + state.config.player_speed).min(state.config.player_max_x());
    GameState {
        player: Player { x, ..state.player.clone() },
        ..state.clone()
    }
}

pub fn move_player_up(state: &GameState) -> GameState {
    let y = (state.player.y - state.config.player_speed).max(0);
    GameState {
        player: Player { y, ..state.player.clone() },
        ..state.clone()
    }
}

pub fn move_player_down(state: &GameState) -> GameState {
    let y = (state.player.y + state.config.player_speed).min(state.config.player_max_y());
    GameState {
        player: Player { y, ..state.player.clone() },
        ..state.clone()
    }
}

/// Throw one leaf straight up from the centre of the player group.
pub fn throw_leaf(state: &GameState) -> GameState {
    if state.is_won() {
        return state.clone();
    }
    let cfg = &state.config;
    let rect = Rect::new(
        state.player.x + cfg.player_width / 2 - cfg.leaf_width / 2,
        state.player.y,
        cfg.leaf_width,
        cfg.leaf_height,
    );
    let mut leaves = state.leaves.clone();
    leaves.push(Leaf::rising(rect));
    GameState {
        leaves,
        ..state.clone()
    }
}

/// Apply one frame of input: movement on every held axis, then one leaf per
/// throw edge.
pub fn apply_input(state: &GameState, input: &FrameInput) -> GameState {
    if state.is_won() {
        return state.clone();
    }
    let mut next = state.clone();
    if input.left {
        next = move_player_left(&next);
    }
    if input.right {
        next = move_player_right(&next);
    }
    if input.up {
        next = move_player_up(&next);
    }
    if input.down {
        next = move_player_down(&next);
    }
    for _ in 0..input.throws {
        next = throw_leaf(&next);
    }
    next
}

// ── Simulation phases ────────────────────────────────────────────────────────

/// Move every leaf and resolve its collisions with the ground and with clouds.
///
/// Rising leaves flip to falling once they reach the top of the screen.
/// Falling leaves plant on touching the ground.  Falling and planted leaves
/// destroy the first live cloud they overlap and are destroyed with it.
pub fn advance_leaves(state: &GameState, now: u64) -> GameState {
    let cfg = &state.config;
    let ground = cfg.ground_rect();

    let mut leaves = state.leaves.clone();
    let mut leaf_alive = vec![true; leaves.len()];
    let mut cloud_alive = vec![true; state.clouds.len()];
    let mut destroyed = 0;

    for (li, leaf) in leaves.iter_mut().enumerate() {
        match leaf.phase {
            LeafPhase::Rising => {
                leaf.rect.y -= cfg.leaf_speed;
                if leaf.rect.y <= 0 {
                    leaf.phase = LeafPhase::Falling;
                }
                continue;
            }
            LeafPhase::Falling => {
                leaf.rect.y += cfg.leaf_speed;
                if leaf.rect.overlaps(&ground) {
                    leaf.rect.y = ground.y - cfg.leaf_height;
                    leaf.phase = LeafPhase::Planted {
                        plant_time: now,
                        last_shoot_time: now,
                    };
                    log::debug!("Leaf planted at x={}", leaf.rect.x);
                }
            }
            LeafPhase::Planted { .. } => {}
        }

        let hit = (0..state.clouds.len())
            .find(|&ci| cloud_alive[ci] && leaf.rect.overlaps(&state.clouds[ci].rect));
        if let Some(ci) = hit {
            cloud_alive[ci] = false;
            leaf_alive[li] = false;
            destroyed += 1;
        }
    }

    GameState {
        leaves: compact(leaves, &leaf_alive),
        clouds: compact(state.clouds.clone(), &cloud_alive),
        clouds_destroyed: state.clouds_destroyed + destroyed,
        ..state.clone()
    }
}

/// Turn every planted leaf that has matured into a tree centred on it.
pub fn grow_trees(state: &GameState, now: u64) -> GameState {
    let cfg = &state.config;
    let mut trees = state.trees.clone();

    let leaves = state
        .leaves
        .iter()
        .filter_map(|leaf| match leaf.phase {
            LeafPhase::Planted { plant_time, .. }
                if now.saturating_sub(plant_time) >= cfg.growth_time_ms =>
            {
                let rect = Rect::new(
                    leaf.rect.x - (cfg.tree_width - cfg.leaf_width) / 2,
                    cfg.ground_top() - cfg.tree_height,
                    cfg.tree_width,
                    cfg.tree_height,
                );
                trees.push(Tree {
                    rect,
                    last_shoot_time: now,
                });
                log::info!("Tree grown at x={} ({} standing)", rect.x, trees.len());
                None
            }
            _ => Some(leaf.clone()),
        })
        .collect();

    GameState {
        leaves,
        trees,
        ..state.clone()
    }
}

/// Every tree whose cooldown has elapsed fires one rising leaf.
pub fn fire_trees(state: &GameState, now: u64) -> GameState {
    let cfg = &state.config;
    let mut leaves = state.leaves.clone();

    let trees = state
        .trees
        .iter()
        .map(|tree| {
            if now.saturating_sub(tree.last_shoot_time) < cfg.tree_shoot_interval_ms {
                return tree.clone();
            }
            leaves.push(Leaf::rising(Rect::new(
                tree.rect.x + cfg.tree_width / 2 - cfg.leaf_width / 2,
                tree.rect.y,
                cfg.leaf_width,
                cfg.leaf_height,
            )));
            Tree {
                last_shoot_time: now,
                ..tree.clone()
            }
        })
        .collect();

    GameState {
        leaves,
        trees,
        ..state.clone()
    }
}

/// Maybe spawn a cloud at the factory, then drift every cloud and resolve its
/// collisions.  Trees are checked before rising leaves; a cloud stops at its
/// first hit.
pub fn advance_clouds(state: &GameState, rng: &mut impl Rng) -> GameState {
    let cfg = &state.config;
    let mut clouds = state.clouds.clone();
    let mut episode_active = state.episode_active;

    if rng.gen_range(1..=cfg.cloud_spawn_odds) == 1 {
        clouds.push(Cloud {
            rect: cfg.cloud_spawn_rect(),
        });
        if !episode_active {
            log::info!("Pollution episode started at frame {}", state.frame);
        }
        episode_active = true;
    }

    let mut leaf_alive = vec![true; state.leaves.len()];
    let mut destroyed = 0;
    let mut kept = Vec::with_capacity(clouds.len());

    for mut cloud in clouds {
        cloud.rect.x -= cfg.cloud_speed;
        cloud.rect.y += rng.gen_range(-1..=1);

        // Drifted off screen
        if cloud.rect.right() < 0 || cloud.rect.y > cfg.screen_height {
            continue;
        }

        if state.trees.iter().any(|t| t.rect.overlaps(&cloud.rect)) {
            destroyed += 1;
            continue;
        }

        let hit = (0..state.leaves.len()).find(|&li| {
            let leaf = &state.leaves[li];
            leaf_alive[li] && leaf.is_rising() && leaf.rect.overlaps(&cloud.rect)
        });
        if let Some(li) = hit {
            leaf_alive[li] = false;
            destroyed += 1;
            continue;
        }

        kept.push(cloud);
    }

    GameState {
        leaves: compact(state.leaves.clone(), &leaf_alive),
        clouds: kept,
        clouds_destroyed: state.clouds_destroyed + destroyed,
        episode_active,
        ..state.clone()
    }
}

/// Neutral transitions, banner expiry and the win check.
pub fn update_status(state: &GameState, now: u64) -> GameState {
    let cfg = &state.config;
    let mut times_neutral = state.times_neutral;
    let mut episode_active = state.episode_active;
    let mut neutral_banner_since = state.neutral_banner_since;

    if episode_active && state.clouds.is_empty() {
        times_neutral += 1;
        neutral_banner_since = Some(now);
        episode_active = false;
        log::info!(
            "Factory carbon neutral ({}/{}), {} clouds destroyed so far",
            times_neutral,
            cfg.neutral_target,
            state.clouds_destroyed
        );
    } else if let Some(since) = neutral_banner_since {
        if now.saturating_sub(since) > cfg.neutral_banner_ms {
            neutral_banner_since = None;
        }
    }

    let status = if times_neutral >= cfg.neutral_target {
        GameStatus::Won
    } else if state.clouds.is_empty() {
        GameStatus::TemporarilyNeutral
    } else {
        GameStatus::Polluted
    };

    GameState {
        times_neutral,
        episode_active,
        neutral_banner_since,
        status,
        ..state.clone()
    }
}

// ── Per-frame tick (nearly pure — RNG is injected) ──────────────────────────

/// Advance the simulation by one frame.  All randomness comes through `rng`
/// so callers control determinism (useful for tests with a seeded RNG).
/// A won game is frozen: the state comes back unchanged.
pub fn tick(state: &GameState, now: u64, rng: &mut impl Rng) -> GameState {
    if state.is_won() {
        return state.clone();
    }

    let next = advance_leaves(state, now);
    let next = grow_trees(&next, now);
    let next = fire_trees(&next, now);
    let next = advance_clouds(&next, rng);
    let next = update_status(&next, now);

    GameState {
        frame: state.frame + 1,
        ..next
    }
}

/// One full simulation step: input first, then the frame tick.
pub fn step(state: &GameState, input: &FrameInput, now: u64, rng: &mut impl Rng) -> GameState {
    tick(&apply_input(state, input), now, rng)
}

/// Keep the entries whose `alive` flag is still set.
fn compact<T>(items: Vec<T>, alive: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(alive)
        .filter_map(|(item, &keep)| keep.then_some(item))
        .collect()
}
