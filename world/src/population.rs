//! NPC population management: capped spawning, edge placement, respawning
//! of drifted walkers and interaction targeting.

use awaking_core::{
    Aabb, Disposition, Event, Heading, NpcId, NpcSnapshot, NpcView, SpawnRejection, Vec2,
    Viewport,
};
use awaking_system_resources::PlayerResources;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{npc::Npc, Tuning};

const MAX_SPAWN_LANES: u32 = 4_096;

/// Knobs governing population size, placement and targeting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationTuning {
    /// Hard cap on simultaneously live NPCs.
    pub max_population: usize,
    /// Seconds between automatic spawns while below the cap.
    pub spawn_interval: f32,
    /// Distance beyond the viewport edge at which new NPCs appear.
    pub spawn_offset: f32,
    /// Height of one horizontal spawn lane.
    pub zone_height: f32,
    /// Maximum vertical jitter applied inside a spawn lane.
    pub zone_jitter: f32,
    /// Minimum centre-to-centre distance between a new NPC and existing ones.
    pub min_separation: f32,
    /// Placement candidates tried before falling back to a jittered position.
    pub placement_attempts: u32,
    /// Jitter applied to the fallback placement on both axes.
    pub placement_jitter: f32,
    /// Maximum centre-to-centre distance for the player to engage an NPC.
    pub interaction_radius: f32,
    /// Distance outside the viewport beyond which unconvinced NPCs are respawned.
    pub drift_margin: f32,
    /// Margin added around the viewport when culling NPCs for rendering.
    pub visibility_margin: f32,
}

impl Default for PopulationTuning {
    fn default() -> Self {
        Self {
            max_population: 23,
            spawn_interval: 1.0,
            spawn_offset: 100.0,
            zone_height: 100.0,
            zone_jitter: 50.0,
            min_separation: 100.0,
            placement_attempts: 8,
            placement_jitter: 70.0,
            interaction_radius: 100.0,
            drift_margin: 300.0,
            visibility_margin: 100.0,
        }
    }
}

/// Owns every live NPC and enforces the population invariants.
///
/// NPCs live in a fixed slot array sized to the population cap, so the cap
/// cannot be exceeded and iteration order stays deterministic.
#[derive(Debug)]
pub struct NpcManager {
    tuning: Tuning,
    slots: Vec<Option<Npc>>,
    next_id: u32,
    spawn_lanes: u32,
    spawn_timer: f32,
    all_closed: bool,
    interaction_held: bool,
    obstacles: Vec<Aabb>,
}

impl NpcManager {
    /// Creates an empty population for a viewport of the provided height.
    #[must_use]
    pub fn new(tuning: Tuning, viewport_height: f32) -> Self {
        let capacity = tuning.population.max_population;
        let mut manager = Self {
            tuning,
            slots: (0..capacity).map(|_| None).collect(),
            next_id: 0,
            spawn_lanes: 1,
            spawn_timer: 0.0,
            all_closed: false,
            interaction_held: false,
            obstacles: Vec::with_capacity(capacity),
        };
        manager.resize(viewport_height);
        manager
    }

    /// Tuning the population was created with.
    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Recomputes the spawn lanes for a viewport of the provided height.
    ///
    /// The lane count is capped so that oversized viewports stay cheap.
    pub fn resize(&mut self, viewport_height: f32) {
        let zone_height = self.tuning.population.zone_height;
        let lanes = viewport_height / zone_height;
        self.spawn_lanes = if lanes.is_finite() && lanes >= 1.0 {
            lanes.floor().min(MAX_SPAWN_LANES as f32) as u32
        } else {
            1
        };
    }

    /// Number of horizontal spawn lanes in use.
    #[must_use]
    pub fn spawn_lanes(&self) -> u32 {
        self.spawn_lanes
    }

    /// Removes every NPC and unlocks the population for a fresh session.
    ///
    /// Identifiers keep counting up so they are never reused.
    pub fn clear(&mut self, out: &mut Vec<Event>) {
        for slot in &mut self.slots {
            if let Some(npc) = slot.take() {
                out.push(Event::NpcDespawned { npc: npc.id() });
            }
        }
        self.spawn_timer = 0.0;
        self.all_closed = false;
        self.interaction_held = false;
    }

    /// Number of live NPCs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Reports whether no NPC is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Maximum number of NPCs that may be alive at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether every NPC is locked into the closed disposition.
    #[must_use]
    pub fn all_closed(&self) -> bool {
        self.all_closed
    }

    /// Iterator over live NPCs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Npc> {
        self.slots.iter().flatten()
    }

    /// Looks up a live NPC by identifier.
    #[must_use]
    pub fn get(&self, id: NpcId) -> Option<&Npc> {
        self.iter().find(|npc| npc.id() == id)
    }

    /// Whether any NPC is currently interacting.
    #[must_use]
    pub fn interaction_active(&self) -> bool {
        self.iter().any(Npc::interacting)
    }

    /// Snapshot of every live NPC ordered by identifier.
    #[must_use]
    pub fn view(&self) -> NpcView {
        NpcView::from_snapshots(self.iter().map(Npc::snapshot).collect())
    }

    /// Snapshot of the NPCs overlapping the viewport plus the visibility margin.
    #[must_use]
    pub fn visible(&self, viewport: &Viewport) -> NpcView {
        let area = viewport
            .bounds()
            .inflate(self.tuning.population.visibility_margin);
        let snapshots: Vec<NpcSnapshot> = self
            .iter()
            .filter(|npc| area.intersects(&npc.bounds()))
            .map(Npc::snapshot)
            .collect();
        NpcView::from_snapshots(snapshots)
    }

    /// Spawns one NPC just outside the left or right viewport edge.
    ///
    /// At capacity the request is a no-op that reports
    /// [`SpawnRejection::AtCapacity`].
    pub fn spawn<R>(
        &mut self,
        viewport: &Viewport,
        threshold_exceeded: bool,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Option<NpcId>
    where
        R: Rng + ?Sized,
    {
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            debug!(capacity = self.capacity(), "spawn rejected at capacity");
            out.push(Event::SpawnRejected {
                reason: SpawnRejection::AtCapacity,
            });
            return None;
        };

        if threshold_exceeded {
            self.all_closed = true;
        }

        let npc_tuning = &self.tuning.npc;
        let speed = if npc_tuning.min_speed < npc_tuning.max_speed {
            rng.gen_range(npc_tuning.min_speed..=npc_tuning.max_speed)
        } else {
            npc_tuning.min_speed
        };
        let rolled = Disposition::ALL[rng.gen_range(0..Disposition::ALL.len())];
        let disposition = if self.all_closed {
            Disposition::Closed
        } else {
            rolled
        };
        let (position, heading) = self.place_at_lane(viewport, rng);

        let id = NpcId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.slots[slot] = Some(Npc::new(
            id,
            position,
            heading,
            speed,
            disposition,
            &self.tuning.npc,
        ));
        out.push(Event::NpcSpawned {
            npc: id,
            position,
            disposition,
        });
        Some(id)
    }

    /// Advances every NPC, retires convinced walkers that left the playfield,
    /// respawns drifted ones and runs the spawn timer.
    pub fn update<R>(
        &mut self,
        dt: f32,
        viewport: &Viewport,
        threshold_exceeded: bool,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) where
        R: Rng + ?Sized,
    {
        if threshold_exceeded {
            self.all_closed = true;
        }
        if self.all_closed {
            self.close_all();
        }

        let drift_area = viewport.bounds().inflate(self.tuning.population.drift_margin);
        for index in 0..self.slots.len() {
            let Some(mut npc) = self.slots[index].take() else {
                continue;
            };

            self.obstacles.clear();
            self.obstacles.extend(
                self.slots
                    .iter()
                    .flatten()
                    .filter(|other| !other.interacting())
                    .map(Npc::collision_bounds),
            );
            npc.update(dt, viewport, &self.obstacles, &self.tuning.npc, rng);

            if npc.expired() {
                debug!(npc = npc.id().get(), "convinced npc left the playfield");
                out.push(Event::NpcDespawned { npc: npc.id() });
                continue;
            }

            if !npc.convinced() && !drift_area.intersects(&npc.bounds()) {
                let (position, heading) = self.place_at_flank(viewport, rng);
                npc.relocate(position, heading);
                debug!(
                    npc = npc.id().get(),
                    x = position.x,
                    y = position.y,
                    "respawned drifted npc"
                );
                out.push(Event::NpcRespawned {
                    npc: npc.id(),
                    position,
                });
            }

            self.slots[index] = Some(npc);
        }

        if self.len() < self.capacity() {
            self.spawn_timer += if dt.is_finite() { dt.max(0.0) } else { 0.0 };
            if self.spawn_timer >= self.tuning.population.spawn_interval {
                self.spawn_timer = 0.0;
                let _ = self.spawn(viewport, threshold_exceeded, rng, out);
            }
        }
    }

    /// Closest NPC the player could engage from `player_bounds`.
    ///
    /// Convinced and interacting NPCs are never targets.
    #[must_use]
    pub fn nearest_interactable(&self, player_bounds: &Aabb) -> Option<NpcId> {
        let origin = player_bounds.center();
        let radius = self.tuning.population.interaction_radius;
        self.iter()
            .filter(|npc| !npc.convinced() && !npc.interacting())
            .map(|npc| (npc.id(), npc.bounds().center().distance(origin)))
            .filter(|(_, distance)| *distance < radius)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
    }

    /// Refreshes interaction targeting and starts an interaction on a fresh
    /// press of the interaction input.
    ///
    /// Only the nearest eligible NPC is flagged interactable, and only while
    /// no other interaction is running. Returns whether an interaction began.
    pub fn handle_interaction_input<R>(
        &mut self,
        pressed: bool,
        player_bounds: &Aabb,
        player: &mut PlayerResources,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> bool
    where
        R: Rng + ?Sized,
    {
        let newly_pressed = pressed && !self.interaction_held;
        self.interaction_held = pressed;

        let active = self.interaction_active();
        let target = self.nearest_interactable(player_bounds);
        for npc in self.slots.iter_mut().flatten() {
            npc.set_can_interact(!active && Some(npc.id()) == target);
        }

        if !newly_pressed || active || player.game_over() {
            return false;
        }
        let Some(target) = target else {
            return false;
        };
        let Some(npc) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|npc| npc.id() == target)
        else {
            return false;
        };
        let Some(report) = npc.interact(player, &self.tuning, rng) else {
            return false;
        };

        trace!(
            npc = report.npc.get(),
            before = ?report.disposition_before,
            after = ?report.disposition_after,
            convinced = report.convinced,
            influence = report.influence_delta,
            energy = report.energy_delta,
            "interaction resolved"
        );
        if player.threshold_exceeded() {
            self.all_closed = true;
            self.close_all();
        }
        out.push(Event::InteractionResolved { report });
        true
    }

    fn close_all(&mut self) {
        for npc in self.slots.iter_mut().flatten() {
            npc.force_closed();
        }
    }

    /// Picks a lane position off the left or right edge, retrying until it
    /// keeps the minimum separation from every live NPC.
    fn place_at_lane<R>(&self, viewport: &Viewport, rng: &mut R) -> (Vec2, Heading)
    where
        R: Rng + ?Sized,
    {
        let population = &self.tuning.population;
        let attempts = population.placement_attempts.max(1);
        let mut candidate = (viewport.center(), Heading::Right);
        for _ in 0..attempts {
            let heading = if rng.gen::<bool>() {
                Heading::Right
            } else {
                Heading::Left
            };
            let x = match heading {
                Heading::Right => viewport.left() - population.spawn_offset,
                Heading::Left => viewport.right() + population.spawn_offset,
            };
            let lane = rng.gen_range(0..self.spawn_lanes) as f32;
            let lane_center = lane * population.zone_height + population.zone_height * 0.5;
            let y = viewport.top() + lane_center + symmetric(rng, population.zone_jitter);
            candidate = (Vec2::new(x, y), heading);
            if self.is_separated(candidate.0) {
                return candidate;
            }
        }

        debug!(attempts, "spawn placement exhausted, using jittered position");
        (self.jittered(candidate.0, rng), candidate.1)
    }

    /// Picks a flank position beside the player-centred viewport for an NPC
    /// that drifted too far away.
    fn place_at_flank<R>(&self, viewport: &Viewport, rng: &mut R) -> (Vec2, Heading)
    where
        R: Rng + ?Sized,
    {
        let population = &self.tuning.population;
        let center = viewport.center();
        let reach = viewport.width() * 0.5 + population.spawn_offset;
        let (x, heading) = if rng.gen::<bool>() {
            (center.x + reach, Heading::Left)
        } else {
            (center.x - reach, Heading::Right)
        };
        let y = center.y + symmetric(rng, viewport.height() / 3.0);
        let position = Vec2::new(x, y);

        if self.is_separated(position) {
            (position, heading)
        } else {
            (self.jittered(position, rng), heading)
        }
    }

    fn is_separated(&self, position: Vec2) -> bool {
        let separation = self.tuning.population.min_separation;
        self.iter()
            .all(|npc| npc.position().distance(position) >= separation)
    }

    fn jittered<R>(&self, position: Vec2, rng: &mut R) -> Vec2
    where
        R: Rng + ?Sized,
    {
        let jitter = self.tuning.population.placement_jitter;
        position + Vec2::new(symmetric(rng, jitter), symmetric(rng, jitter))
    }
}

/// Uniform sample in `-extent..=extent`; zero for degenerate extents.
fn symmetric<R>(rng: &mut R, extent: f32) -> f32
where
    R: Rng + ?Sized,
{
    if extent.is_finite() && extent > 0.0 {
        rng.gen_range(-extent..=extent)
    } else {
        0.0
    }
}
