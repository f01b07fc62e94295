use std::collections::{HashMap, HashSet};

use awaking_core::{Aabb, Disposition, Event, Heading, SpawnRejection, Vec2, Viewport};
use awaking_system_resources::PlayerResources;
use awaking_world::{NpcManager, Tuning};
use rand::{Error, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generator whose every uniform draw is `0.0`, so every roll succeeds.
struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn viewport() -> Viewport {
    Viewport::new(Vec2::ZERO, 1020.0, 620.0)
}

fn manager() -> NpcManager {
    NpcManager::new(Tuning::default(), 620.0)
}

#[test]
fn spawning_stops_at_the_population_cap() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut events = Vec::new();

    for _ in 0..23 {
        assert!(population
            .spawn(&viewport(), false, &mut rng, &mut events)
            .is_some());
    }
    events.clear();

    assert!(population
        .spawn(&viewport(), false, &mut rng, &mut events)
        .is_none());
    assert_eq!(population.len(), 23);
    assert_eq!(
        events,
        vec![Event::SpawnRejected {
            reason: SpawnRejection::AtCapacity
        }]
    );
}

#[test]
fn spawned_npcs_start_outside_the_viewport_heading_inward() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut events = Vec::new();
    for _ in 0..10 {
        let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    }

    for npc in population.iter() {
        let x = npc.position().x;
        assert!(x < 0.0 || x > 1020.0, "npc spawned on screen at {x}");
        let inward = if x < 0.0 { 1.0 } else { -1.0 };
        assert_eq!(npc.heading().sign(), inward);
        assert!((80.0..=120.0).contains(&npc.speed()));
    }
}

#[test]
fn cap_and_unique_ids_hold_over_long_runs() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(0xfeed);
    let mut events = Vec::new();

    for _ in 0..4_000 {
        population.update(0.05, &viewport(), false, &mut rng, &mut events);
        assert!(population.len() <= population.capacity());
        let ids: HashSet<_> = population.iter().map(|npc| npc.id()).collect();
        assert_eq!(ids.len(), population.len());
    }

    assert_eq!(population.len(), 23);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::NpcSpawned { .. })));
}

#[test]
fn threshold_forces_every_npc_closed() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut events = Vec::new();
    for _ in 0..15 {
        let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    }

    population.update(0.016, &viewport(), true, &mut rng, &mut events);
    assert!(population.all_closed());
    assert!(population
        .iter()
        .all(|npc| npc.disposition() == Disposition::Closed));

    let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    assert!(population
        .iter()
        .all(|npc| npc.disposition() == Disposition::Closed));
}

#[test]
fn only_the_nearest_npc_is_targeted_and_interactions_lock() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut events = Vec::new();
    for _ in 0..5 {
        let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    }
    let anchor = population.iter().next().expect("npc spawned").bounds();
    let mut player = PlayerResources::default();

    let target = population
        .nearest_interactable(&anchor)
        .expect("player stands on an npc");
    let started =
        population.handle_interaction_input(false, &anchor, &mut player, &mut rng, &mut events);
    assert!(!started);
    let flagged: Vec<_> = population
        .iter()
        .filter(|npc| npc.can_interact())
        .map(|npc| npc.id())
        .collect();
    assert_eq!(flagged, vec![target]);

    events.clear();
    assert!(population.handle_interaction_input(
        true,
        &anchor,
        &mut player,
        &mut rng,
        &mut events
    ));
    assert!(matches!(
        events.as_slice(),
        [Event::InteractionResolved { report }] if report.npc == target
    ));

    // Holding the input does not retrigger, and a fresh press is refused
    // while the first interaction runs.
    events.clear();
    for pressed in [true, false, true] {
        assert!(!population.handle_interaction_input(
            pressed,
            &anchor,
            &mut player,
            &mut rng,
            &mut events
        ));
    }
    assert!(events.is_empty());
    assert!(population.iter().all(|npc| !npc.can_interact()));
    assert_eq!(population.iter().filter(|npc| npc.interacting()).count(), 1);
}

#[test]
fn nothing_is_targeted_out_of_range() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut events = Vec::new();
    for _ in 0..5 {
        let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    }
    let far_away = Aabb::from_center(Vec2::new(510.0, 5_000.0), Vec2::new(32.0, 64.0));
    assert_eq!(population.nearest_interactable(&far_away), None);
}

#[test]
fn visible_query_culls_distant_npcs() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let mut events = Vec::new();
    for _ in 0..10 {
        let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    }

    let visible = population.visible(&viewport());
    assert!(!visible.is_empty());
    assert!(visible.len() <= population.len());
    let elsewhere = Viewport::new(Vec2::new(10_000.0, 10_000.0), 1020.0, 620.0);
    assert!(population.visible(&elsewhere).is_empty());
}

#[test]
fn drifted_npcs_respawn_beside_the_player_keeping_their_disposition() {
    let mut population = manager();
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut events = Vec::new();
    for _ in 0..6 {
        let _ = population.spawn(&viewport(), false, &mut rng, &mut events);
    }

    let anchor = population.iter().next().expect("npc spawned").bounds();
    let mut player = PlayerResources::default();
    let convinced = population
        .nearest_interactable(&anchor)
        .expect("player stands on an npc");
    assert!(population.handle_interaction_input(
        true,
        &anchor,
        &mut player,
        &mut ZeroRng,
        &mut events
    ));
    let convinced_position = population
        .get(convinced)
        .expect("convinced npc is alive")
        .position();

    let before: HashMap<_, _> = population
        .iter()
        .map(|npc| (npc.id(), npc.disposition()))
        .collect();
    events.clear();

    let far = Viewport::new(Vec2::new(20_000.0, 20_000.0), 1020.0, 620.0);
    population.update(0.016, &far, false, &mut rng, &mut events);

    let respawned: HashSet<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::NpcRespawned { npc, .. } => Some(*npc),
            _ => None,
        })
        .collect();
    assert_eq!(respawned.len(), 5);
    assert!(!respawned.contains(&convinced));

    let area = far.bounds().inflate(population.tuning().population.drift_margin);
    for npc in population.iter() {
        assert_eq!(npc.disposition(), before[&npc.id()]);
        if npc.id() == convinced {
            assert!(npc.convinced());
            assert_eq!(npc.position(), convinced_position);
        } else {
            assert!(area.intersects(&npc.bounds()), "npc left at {}", npc.position());
        }
    }
}

#[test]
fn exhausted_placement_falls_back_to_a_jittered_edge_lane() {
    let mut tuning = Tuning::default();
    tuning.population.placement_attempts = 1;
    tuning.population.min_separation = 1.0e6;
    let mut population = NpcManager::new(tuning.clone(), 620.0);
    let mut rng = ChaCha8Rng::seed_from_u64(29);
    let mut events = Vec::new();

    for _ in 0..10 {
        assert!(population
            .spawn(&viewport(), false, &mut rng, &mut events)
            .is_some());
    }

    let settings = &tuning.population;
    let jitter = settings.placement_jitter;
    let lowest = settings.zone_height * 0.5 - settings.zone_jitter - jitter;
    let highest = 5.5 * settings.zone_height + settings.zone_jitter + jitter;
    for npc in population.iter() {
        let position = npc.position();
        let edge = match npc.heading() {
            Heading::Right => -settings.spawn_offset,
            Heading::Left => 1020.0 + settings.spawn_offset,
        };
        assert!(
            (position.x - edge).abs() <= jitter,
            "x {} strays from edge {edge}",
            position.x
        );
        assert!((lowest..=highest).contains(&position.y), "y {}", position.y);
    }
}
