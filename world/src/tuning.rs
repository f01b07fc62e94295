//! Aggregated tuning surface for the world and its validation rules.

use awaking_core::{LightCue, PlayerSnapshot};
use awaking_system_conviction::{ConvictionTuning, ShiftTuning};
use awaking_system_resources::{InteractionTable, ResourceTuning};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{npc::NpcTuning, population::PopulationTuning};

/// Every knob that shapes a session, grouped by concern.
///
/// Each group deserializes with defaults, so a partial TOML document only
/// overrides the values it names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Persuasion odds.
    pub conviction: ConvictionTuning,
    /// Disposition drift after a rejection.
    pub shift: ShiftTuning,
    /// Player resource economy.
    pub resources: ResourceTuning,
    /// Resource deltas keyed by disposition.
    pub interactions: InteractionTable,
    /// Per-NPC locomotion.
    pub npc: NpcTuning,
    /// Population size, spawning and targeting.
    pub population: PopulationTuning,
    /// Viewport and player geometry.
    pub scene: SceneTuning,
    /// Lighting cue curve.
    pub lighting: LightingTuning,
}

/// Geometry of the visible region and of the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneTuning {
    /// Width of the player-centred viewport in world units.
    pub viewport_width: f32,
    /// Height of the player-centred viewport in world units.
    pub viewport_height: f32,
    /// Width of the player's bounding box.
    pub player_width: f32,
    /// Height of the player's bounding box.
    pub player_height: f32,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            viewport_width: 1020.0,
            viewport_height: 620.0,
            player_width: 32.0,
            player_height: 64.0,
        }
    }
}

/// Curve used to derive the light cue from the player's resources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingTuning {
    /// Radius fraction shown with zero influence.
    pub min_radius_fraction: f32,
    /// Exponent applied to the influence ratio while the radius grows.
    pub growth_exponent: f32,
    /// Smallest radius fraction once the light shrinks with energy.
    pub floor_radius_fraction: f32,
    /// Smallest intensity once the light dims with energy.
    pub floor_intensity: f32,
}

impl Default for LightingTuning {
    fn default() -> Self {
        Self {
            min_radius_fraction: 0.5,
            growth_exponent: 0.7,
            floor_radius_fraction: 0.05,
            floor_intensity: 50.0 / 255.0,
        }
    }
}

impl LightingTuning {
    /// Derives the light cue for the provided player state.
    ///
    /// Before the threshold the radius grows with influence at full
    /// intensity. Afterwards both radius and intensity shrink with energy
    /// down to their floors.
    #[must_use]
    pub fn cue(&self, player: &PlayerSnapshot, critical_threshold: f32) -> LightCue {
        if player.threshold_exceeded {
            let energy = (player.energy_percentage / 100.0).clamp(0.0, 1.0);
            return LightCue {
                radius_fraction: energy.max(self.floor_radius_fraction),
                intensity: energy.max(self.floor_intensity),
            };
        }

        let ratio = if critical_threshold > 0.0 {
            (player.influence_percentage / critical_threshold).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let growth = ratio.powf(self.growth_exponent);
        LightCue {
            radius_fraction: (self.min_radius_fraction + (1.0 - self.min_radius_fraction) * growth)
                .clamp(0.0, 1.0),
            intensity: 1.0,
        }
    }
}

/// Tuning combinations the simulation refuses to run with.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TuningError {
    /// The population cap is zero.
    #[error("population cap must allow at least one NPC")]
    EmptyPopulation,
    /// A value that must be strictly positive is not.
    #[error("`{field}` must be a positive finite number, got {value}")]
    NonPositive {
        /// Dotted path of the offending knob.
        field: &'static str,
        /// Value found in the tuning.
        value: f32,
    },
    /// The conviction rate bounds are inverted or outside `0.0..=1.0`.
    #[error("conviction rate bounds {min}..={max} are invalid")]
    InvertedConvictionBounds {
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },
    /// Odds would not grow with receptiveness and conviction rate.
    #[error("conviction odds must not decrease with receptiveness or rate")]
    NonMonotoneOdds,
    /// The NPC speed range is inverted.
    #[error("npc speed range {min}..={max} is inverted")]
    InvertedSpeedRange {
        /// Configured slowest speed.
        min: f32,
        /// Configured fastest speed.
        max: f32,
    },
}

impl Tuning {
    /// Checks the knobs that the simulation relies on for its invariants.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.population.max_population == 0 {
            return Err(TuningError::EmptyPopulation);
        }

        let positive = [
            ("population.spawn_interval", self.population.spawn_interval),
            ("population.zone_height", self.population.zone_height),
            ("population.interaction_radius", self.population.interaction_radius),
            ("npc.width", self.npc.width),
            ("npc.height", self.npc.height),
            ("npc.interaction_duration", self.npc.interaction_duration),
            ("scene.viewport_width", self.scene.viewport_width),
            ("scene.viewport_height", self.scene.viewport_height),
            (
                "resources.critical_influence_threshold",
                self.resources.critical_influence_threshold,
            ),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TuningError::NonPositive { field, value });
            }
        }

        let min = self.resources.min_conviction_rate;
        let max = self.resources.max_conviction_rate;
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(TuningError::InvertedConvictionBounds { min, max });
        }

        if !self.conviction.is_monotone() {
            return Err(TuningError::NonMonotoneOdds);
        }

        if !(self.npc.min_speed <= self.npc.max_speed) {
            return Err(TuningError::InvertedSpeedRange {
                min: self.npc.min_speed,
                max: self.npc.max_speed,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(Tuning::default().validate(), Ok(()));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut tuning = Tuning::default();
        tuning.population.spawn_interval = 0.0;
        assert_eq!(
            tuning.validate(),
            Err(TuningError::NonPositive {
                field: "population.spawn_interval",
                value: 0.0,
            })
        );
    }

    fn snapshot(influence: f32, energy: f32, threshold_exceeded: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            position: awaking_core::Vec2::ZERO,
            influence_percentage: influence,
            energy_percentage: energy,
            conviction_rate: 0.5,
            threshold_exceeded,
            convinced_count: 0,
            state: awaking_core::GameState::Playing,
        }
    }

    #[test]
    fn light_grows_with_influence_then_fades_with_energy() {
        let lighting = LightingTuning::default();
        let dim = lighting.cue(&snapshot(0.0, 100.0, false), 87.0);
        let bright = lighting.cue(&snapshot(80.0, 100.0, false), 87.0);
        assert!((dim.radius_fraction - 0.5).abs() < 1e-6);
        assert!(bright.radius_fraction > dim.radius_fraction);
        assert_eq!(bright.intensity, 1.0);

        let fading = lighting.cue(&snapshot(90.0, 40.0, true), 87.0);
        assert!((fading.radius_fraction - 0.4).abs() < 1e-6);
        let spent = lighting.cue(&snapshot(90.0, 0.0, true), 87.0);
        assert!((spent.radius_fraction - 0.05).abs() < 1e-6);
        assert!((spent.intensity - 50.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut tuning = Tuning::default();
        tuning.resources.min_conviction_rate = 0.8;
        tuning.resources.max_conviction_rate = 0.2;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::InvertedConvictionBounds { .. })
        ));
    }
}
