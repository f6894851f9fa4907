//! Simulation tunables
//!
//! All fields are hot-reloadable: the engine keeps the active `FireSettings`
//! behind a lock and every cell task copies it when it is spawned, so a
//! reload takes effect on the next tick.

use serde::{Deserialize, Serialize};

use crate::error::WildfireError;

/// Tunable parameters of the fire simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireSettings {
    /// Kill switch; while false `update` does nothing
    pub enabled: bool,
    /// Seconds of host time between two simulation ticks
    pub periodic_update_time: f32,
    /// Divisor applied to a burning vertex's heat when sharing it with neighbours
    pub heat_distribution_factor: f32,
    /// Fuel burnt per second by a burning vertex
    pub fuel_consumption_rate: f32,
    /// Heat gained per unit of fuel burnt
    pub fuel_to_heat_rate: f32,
    /// Heat lost per second by a non-burning vertex
    pub self_heat_loss: f32,
    /// Multiplier on diffused heat while it rains or snows
    pub raining_factor: f32,
    /// Strength of wind bias on spread weights
    pub wind_speed_factor: f32,
    /// Dirty cells handed to the regeneration sink per frame
    pub grass_generation_cells_per_frame_limit: usize,
    /// Fuel of a vertex covered only by the default texture
    pub default_initial_fuel_amount: f32,
    /// Ignition threshold of a vertex covered only by the default texture
    pub default_min_heat_to_burn: f32,
    /// Maximum tracked cells before idle ones are evicted (0 = unbounded)
    pub cell_budget: usize,
    /// Seconds before an unfinished cell task is abandoned
    pub task_deadline_secs: f32,
    /// Worker threads for cell tasks (0 = one per core)
    pub worker_threads: usize,
}

impl Default for FireSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            periodic_update_time: 1.0,
            heat_distribution_factor: 10.0,
            fuel_consumption_rate: 3.0,
            fuel_to_heat_rate: 1.0,
            self_heat_loss: 1.0,
            raining_factor: 0.5,
            wind_speed_factor: 0.5,
            grass_generation_cells_per_frame_limit: 1,
            default_initial_fuel_amount: 50.0,
            default_min_heat_to_burn: 25.0,
            cell_budget: 256,
            task_deadline_secs: 5.0,
            worker_threads: 0,
        }
    }
}

impl FireSettings {
    /// Check every numeric tunable against its domain.
    ///
    /// # Errors
    ///
    /// Returns `WildfireError::InvalidSetting` naming the first offending field.
    pub fn validate(&self) -> Result<(), WildfireError> {
        let positive = [
            ("periodic_update_time", self.periodic_update_time),
            ("heat_distribution_factor", self.heat_distribution_factor),
            ("fuel_consumption_rate", self.fuel_consumption_rate),
            ("default_initial_fuel_amount", self.default_initial_fuel_amount),
            ("default_min_heat_to_burn", self.default_min_heat_to_burn),
            ("task_deadline_secs", self.task_deadline_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(WildfireError::InvalidSetting { name, value });
            }
        }

        let non_negative = [
            ("fuel_to_heat_rate", self.fuel_to_heat_rate),
            ("self_heat_loss", self.self_heat_loss),
            ("raining_factor", self.raining_factor),
            ("wind_speed_factor", self.wind_speed_factor),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(WildfireError::InvalidSetting { name, value });
            }
        }

        Ok(())
    }

    /// Seconds a freshly ignited vertex with `fuel` left keeps burning.
    #[inline]
    pub fn burn_lifetime(&self, fuel: f32) -> f32 {
        fuel / self.fuel_consumption_rate
    }
}
