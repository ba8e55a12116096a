//! Property tests for collections, scenarios and match outcomes.

use std::cell::Cell;
use std::rc::Rc;

use td_core::behavior::{GameBehavior, TickContext, UpdateStatus};
use td_core::collaborators::Unattended;
use td_core::collection::EntityCollection;
use td_core::config::GameConfig;
use td_core::effects::EffectBuffer;
use td_core::error::Result;
use td_core::game::{MatchOutcome, MatchStats};
use td_core::health::PlayerHealth;
use td_core::math::Fixed;
use td_core::scenario::ScenarioState;
use td_test_utils::determinism::strategies::{arb_frame, arb_health, arb_scenario};
use td_test_utils::fixtures::{fixed_f, scenario_of, MatchFixture};
use td_test_utils::proptest::prelude::*;

/// Counts updates into a shared cell and never finishes.
struct Tally(Rc<Cell<u32>>);

impl GameBehavior for Tally {
    fn game_update(&mut self, _ctx: &mut TickContext<'_>) -> Result<UpdateStatus> {
        self.0.set(self.0.get() + 1);
        Ok(UpdateStatus::Alive)
    }
}

fn run_pass(collection: &mut EntityCollection<Tally>) -> u32 {
    let mut health = PlayerHealth::new(Box::new(Unattended));
    let mut effects = EffectBuffer::default();
    let mut stats = MatchStats::default();
    let mut ctx = TickContext::new(fixed_f(0.05), &mut health, None, &mut effects, &mut stats);
    collection.game_update(&mut ctx).visited
}

proptest! {
    #[test]
    fn test_add_then_clear_leaves_nothing_to_update(count in 0usize..64) {
        let updates = Rc::new(Cell::new(0));
        let mut collection = EntityCollection::new();
        for _ in 0..count {
            collection.add(Tally(Rc::clone(&updates)));
        }
        prop_assert_eq!(collection.len(), count);

        collection.clear();
        prop_assert!(collection.is_empty());
        prop_assert_eq!(run_pass(&mut collection), 0);
        prop_assert_eq!(updates.get(), 0);
    }

    #[test]
    fn test_paused_collection_never_updates(count in 1usize..32, passes in 1u32..20) {
        let updates = Rc::new(Cell::new(0));
        let mut collection = EntityCollection::new();
        for _ in 0..count {
            collection.add(Tally(Rc::clone(&updates)));
        }
        collection.set_paused(true);

        for _ in 0..passes {
            prop_assert_eq!(run_pass(&mut collection), 0);
        }
        prop_assert_eq!(updates.get(), 0);
        prop_assert_eq!(collection.len(), count);

        collection.set_paused(false);
        prop_assert_eq!(run_pass(&mut collection), count as u32);
    }

    #[test]
    fn test_progress_true_exactly_until_final_spawn(scenario in arb_scenario(), dt in arb_frame()) {
        let total = scenario.total_spawns() as usize;
        let total_waves = scenario.total_waves();
        let mut state = ScenarioState::new(scenario).unwrap();
        state.begin().unwrap();

        let mut requests = Vec::new();
        let mut last_wave = 0;
        let mut exhausted = false;
        for _ in 0..200_000 {
            let remaining = state.progress(dt, &mut requests);
            let wave = state.waves().current;
            prop_assert!(wave >= last_wave);
            prop_assert!(wave < total_waves);
            last_wave = wave;

            if requests.len() < total {
                prop_assert!(remaining);
            } else {
                prop_assert!(!remaining);
                exhausted = true;
                break;
            }
        }
        prop_assert!(exhausted);
        prop_assert_eq!(requests.len(), total);
        prop_assert!(requests.windows(2).all(|pair| pair[0].wave <= pair[1].wave));
        prop_assert!(!state.progress(dt, &mut requests));
        prop_assert_eq!(requests.len(), total);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Undefended, every enemy arrives: the player wins only with health to
    /// spare, and a draw goes to Defeat.
    #[test]
    fn test_outcome_follows_health_against_enemy_count(
        health in arb_health(),
        sizes in prop::collection::vec(1u32..=3, 1..=3),
    ) {
        let enemies: u32 = sizes.iter().sum();
        let config = GameConfig {
            starting_health: health,
            prepare_seconds: Fixed::ZERO,
            scenario: scenario_of(&sizes, 0.5),
            ..GameConfig::default()
        };
        let mut fixture = MatchFixture::new(config);
        fixture.start();
        let end = fixture.run_to_end(10_000).expect("match should end");

        let expected = if health > enemies {
            MatchOutcome::Victory
        } else {
            MatchOutcome::Defeat
        };
        prop_assert_eq!(end.outcome, Some(expected));
        prop_assert_eq!(fixture.recorder.outcomes(), vec![expected]);

        // Every assignment reported, each step losing at most one point.
        let seen = fixture.recorder.health();
        prop_assert_eq!(seen.first().copied(), Some(health));
        prop_assert!(seen.windows(2).all(|pair| pair[0] >= pair[1] && pair[0] - pair[1] <= 1));
    }
}
