use eco_defender::compute::*;
use eco_defender::config::Config;
use eco_defender::entities::*;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arb_input() -> impl Strategy<Value = FrameInput> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), 0u32..3).prop_map(
        |(left, right, up, down, throws)| FrameInput {
            left,
            right,
            up,
            down,
            throws,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn player_stays_in_play_area(inputs in prop::collection::vec(arb_input(), 1..300)) {
        let cfg = Config::default();
        let mut s = init_state(cfg);
        for input in &inputs {
            s = apply_input(&s, input);
            prop_assert!(s.player.x >= 0 && s.player.x <= cfg.player_max_x());
            prop_assert!(s.player.y >= 0 && s.player.y <= cfg.player_max_y());
        }
    }

    #[test]
    fn planted_leaves_rest_on_ground_with_past_timestamps(
        seed in any::<u64>(),
        inputs in prop::collection::vec(arb_input(), 100..400),
    ) {
        let cfg = Config::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut s = init_state(cfg);
        for (i, input) in inputs.iter().enumerate() {
            let now = i as u64 * 16;
            s = step(&s, input, now, &mut rng);
            for leaf in &s.leaves {
                if let LeafPhase::Planted { plant_time, last_shoot_time } = leaf.phase {
                    prop_assert!(plant_time <= now);
                    prop_assert!(last_shoot_time <= now);
                    // Still a leaf, so it has not matured yet
                    prop_assert!(now - plant_time < cfg.growth_time_ms);
                    prop_assert_eq!(leaf.rect.y, cfg.ground_top() - cfg.leaf_height);
                }
            }
        }
    }

    #[test]
    fn trees_fire_at_most_once_per_interval(
        steps in prop::collection::vec(1u64..5000, 1..50),
        starts in prop::collection::vec(0u64..3000, 1..6),
    ) {
        let cfg = Config::default();
        let mut s = init_state(cfg);
        s.clouds.clear();
        s.trees = starts
            .iter()
            .enumerate()
            .map(|(i, &t)| Tree {
                rect: Rect::new(i as i32 * 100, 490, 40, 60),
                last_shoot_time: t,
            })
            .collect();

        let mut now = 3000;
        for dt in steps {
            now += dt;
            let before = s.clone();
            s = fire_trees(&s, now);

            let fired = before
                .trees
                .iter()
                .zip(&s.trees)
                .filter(|(a, b)| a.last_shoot_time != b.last_shoot_time)
                .inspect(|(a, b)| {
                    assert!(b.last_shoot_time - a.last_shoot_time >= cfg.tree_shoot_interval_ms);
                    assert_eq!(b.last_shoot_time, now);
                })
                .count();
            prop_assert_eq!(s.leaves.len() - before.leaves.len(), fired);
        }
    }

    #[test]
    fn neutral_transition_fires_iff_episode_clears(
        episode in any::<bool>(),
        cloud_count in 0usize..3,
        times in 0u32..9,
        now in 0u64..100_000,
    ) {
        let cfg = Config::default();
        let mut s = init_state(cfg);
        s.clouds.truncate(cloud_count);
        s.episode_active = episode;
        s.times_neutral = times;

        let next = update_status(&s, now);
        let should_fire = episode && cloud_count == 0;
        prop_assert_eq!(next.times_neutral, times + u32::from(should_fire));
        if should_fire {
            prop_assert_eq!(next.neutral_banner_since, Some(now));
            prop_assert!(!next.episode_active);
        }

        // A second pass in the same episode never fires again
        let again = update_status(&next, now + 16);
        prop_assert_eq!(again.times_neutral, next.times_neutral);
    }

    #[test]
    fn neutral_count_grows_by_at_most_one_per_tick(
        seed in any::<u64>(),
        inputs in prop::collection::vec(arb_input(), 50..300),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut s = init_state(Config::default());
        for (i, input) in inputs.iter().enumerate() {
            let now = i as u64 * 16;
            let next = step(&s, input, now, &mut rng);
            prop_assert!(next.times_neutral <= s.times_neutral + 1);
            if next.times_neutral > s.times_neutral {
                prop_assert!(next.clouds.is_empty());
                prop_assert!(!next.episode_active);
            }
            s = next;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_accepted_leaf_speed_plants(speed in 1i32..200) {
        let cfg = Config { leaf_speed: speed, ..Config::default() };
        prop_assume!(cfg.validate().is_ok());

        let mut s = init_state(cfg);
        s.clouds.clear();
        s = throw_leaf(&s);
        for _ in 0..2000 {
            s = advance_leaves(&s, 0);
            if s.leaves[0].is_planted() {
                break;
            }
        }
        prop_assert!(s.leaves[0].is_planted());
    }
}
