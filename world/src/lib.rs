#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Awaking.
//!
//! The world owns the NPC population, the player's resources and the single
//! seeded random source. Every mutation flows through [`apply`], which
//! appends the resulting [`Event`] values in order, and every read goes
//! through the [`query`] module.

pub mod npc;
pub mod population;
mod tuning;

use awaking_core::{Aabb, Command, Event, Vec2, Viewport};
use awaking_system_resources::PlayerResources;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

pub use npc::{Npc, NpcTuning};
pub use population::{NpcManager, PopulationTuning};
pub use tuning::{LightingTuning, SceneTuning, Tuning, TuningError};

const WORLD_SEED: u64 = 0x6177_616b_696e_6721;

/// Represents the authoritative Awaking world state.
#[derive(Debug)]
pub struct World {
    population: NpcManager,
    resources: PlayerResources,
    player_position: Vec2,
    viewport_size: Vec2,
    rng: ChaCha8Rng,
    tick_index: u64,
}

impl World {
    /// Creates a world with default tuning and the built-in seed.
    #[must_use]
    pub fn new() -> Self {
        Self::build(Tuning::default(), WORLD_SEED)
    }

    /// Creates a world from validated tuning and an explicit random seed.
    pub fn with_tuning(tuning: Tuning, seed: u64) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self::build(tuning, seed))
    }

    fn build(tuning: Tuning, seed: u64) -> Self {
        let viewport_size = Vec2::new(tuning.scene.viewport_width, tuning.scene.viewport_height);
        let resources =
            PlayerResources::new(tuning.resources.clone(), tuning.interactions.clone());
        Self {
            population: NpcManager::new(tuning, viewport_size.y),
            resources,
            player_position: viewport_size * 0.5,
            viewport_size,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick_index: 0,
        }
    }

    fn viewport(&self) -> Viewport {
        Viewport::centered_on(self.player_position, self.viewport_size.x, self.viewport_size.y)
    }

    fn player_bounds(&self) -> Aabb {
        let scene = &self.population.tuning().scene;
        Aabb::from_center(
            self.player_position,
            Vec2::new(scene.player_width, scene.player_height),
        )
    }

    fn restore(&mut self, record: &awaking_core::SaveRecord, out_events: &mut Vec<Event>) {
        if !record.player_position.is_finite() {
            warn!("save record rejected: player position is not finite");
            out_events.push(Event::RestoreRejected {
                reason: "save record field `player_position` is not a finite vector".to_owned(),
            });
            return;
        }

        let tuning = self.population.tuning();
        match PlayerResources::from_record(
            record,
            tuning.resources.clone(),
            tuning.interactions.clone(),
        ) {
            Ok(resources) => {
                self.population.clear(out_events);
                self.resources = resources;
                self.player_position = record.player_position;
                debug!(
                    influence = record.influence_percentage,
                    energy = record.energy_percentage,
                    "player state restored"
                );
                out_events.push(Event::StateRestored);
            }
            Err(error) => {
                warn!(%error, "save record rejected");
                out_events.push(Event::RestoreRejected {
                    reason: error.to_string(),
                });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureViewport { width, height } => {
            let valid = |value: f32| value.is_finite() && value > 0.0;
            if valid(width) && valid(height) {
                world.viewport_size = Vec2::new(width, height);
                world.population.resize(height);
            }
        }
        Command::MovePlayer { position } => {
            if position.is_finite() {
                world.player_position = position;
            }
        }
        Command::SpawnNpc => {
            let viewport = world.viewport();
            let threshold_exceeded = world.resources.threshold_exceeded();
            let _ = world
                .population
                .spawn(&viewport, threshold_exceeded, &mut world.rng, out_events);
        }
        Command::Tick {
            dt,
            interact_pressed,
        } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            if world.resources.game_over() {
                return;
            }

            let seconds = dt.as_secs_f32();
            let viewport = world.viewport();
            let threshold_before = world.resources.threshold_exceeded();
            world.population.update(
                seconds,
                &viewport,
                threshold_before,
                &mut world.rng,
                out_events,
            );

            let player_bounds = world.player_bounds();
            let _ = world.population.handle_interaction_input(
                interact_pressed,
                &player_bounds,
                &mut world.resources,
                &mut world.rng,
                out_events,
            );
            if !threshold_before && world.resources.threshold_exceeded() {
                out_events.push(Event::ThresholdCrossed);
            }

            if let Some(state) = world.resources.tick(seconds) {
                out_events.push(Event::GameEnded { state });
            }
        }
        Command::Restore { record } => world.restore(&record, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use awaking_core::{
        Aabb, GameState, LightCue, NpcId, NpcView, PlayerSnapshot, SaveRecord, Viewport,
    };
    use awaking_system_resources::PlayerResources;

    use super::{NpcManager, Tuning, World};

    /// Snapshot of every live NPC ordered by identifier.
    #[must_use]
    pub fn npc_view(world: &World) -> NpcView {
        world.population.view()
    }

    /// Snapshot of the NPCs close enough to the viewport to be drawn.
    #[must_use]
    pub fn visible_npcs(world: &World) -> NpcView {
        world.population.visible(&world.viewport())
    }

    /// NPC currently flagged as the player's interaction target, if any.
    #[must_use]
    pub fn interaction_target(world: &World) -> Option<NpcId> {
        world
            .population
            .iter()
            .find(|npc| npc.can_interact())
            .map(|npc| npc.id())
    }

    /// Snapshot of the player's position and resources.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        world.resources.snapshot(world.player_position)
    }

    /// Bounding box of the player.
    #[must_use]
    pub fn player_bounds(world: &World) -> Aabb {
        world.player_bounds()
    }

    /// Read-only access to the player's resource pool.
    #[must_use]
    pub fn resources(world: &World) -> &PlayerResources {
        &world.resources
    }

    /// Flat record that resumes the current session when restored.
    #[must_use]
    pub fn save_record(world: &World) -> SaveRecord {
        world.resources.save_record(world.player_position)
    }

    /// Player-centred visible region.
    #[must_use]
    pub fn viewport(world: &World) -> Viewport {
        world.viewport()
    }

    /// Read-only access to the NPC population.
    #[must_use]
    pub fn population(world: &World) -> &NpcManager {
        &world.population
    }

    /// Current terminal-state classification.
    #[must_use]
    pub fn game_state(world: &World) -> GameState {
        world.resources.state()
    }

    /// Lighting scalars derived from the player's state.
    #[must_use]
    pub fn light_cue(world: &World) -> LightCue {
        let tuning = world.population.tuning();
        tuning.lighting.cue(
            &player(world),
            tuning.resources.critical_influence_threshold,
        )
    }

    /// Tuning the world was created with.
    #[must_use]
    pub fn tuning(world: &World) -> &Tuning {
        world.population.tuning()
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
