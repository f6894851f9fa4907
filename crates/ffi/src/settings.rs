use wildfire_core::FireSettings;

use crate::error::{DefaultWildfireError, WildfireErrorCode};
use crate::helpers::{finish, track_error, track_result, with_instance};
use crate::instance::WildfireInstance;

/// C layout of the simulation tunables. Field meanings match `FireSettings`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WildfireSettings {
    pub enabled: bool,
    pub periodic_update_time: f32,
    pub heat_distribution_factor: f32,
    pub fuel_consumption_rate: f32,
    pub fuel_to_heat_rate: f32,
    pub self_heat_loss: f32,
    pub raining_factor: f32,
    pub wind_speed_factor: f32,
    pub grass_generation_cells_per_frame_limit: usize,
    pub default_initial_fuel_amount: f32,
    pub default_min_heat_to_burn: f32,
    /// 0 = unbounded
    pub cell_budget: usize,
    pub task_deadline_secs: f32,
    /// 0 = one per core. Only read by `wildfire_new`.
    pub worker_threads: usize,
}

impl From<&FireSettings> for WildfireSettings {
    fn from(s: &FireSettings) -> Self {
        Self {
            enabled: s.enabled,
            periodic_update_time: s.periodic_update_time,
            heat_distribution_factor: s.heat_distribution_factor,
            fuel_consumption_rate: s.fuel_consumption_rate,
            fuel_to_heat_rate: s.fuel_to_heat_rate,
            self_heat_loss: s.self_heat_loss,
            raining_factor: s.raining_factor,
            wind_speed_factor: s.wind_speed_factor,
            grass_generation_cells_per_frame_limit: s.grass_generation_cells_per_frame_limit,
            default_initial_fuel_amount: s.default_initial_fuel_amount,
            default_min_heat_to_burn: s.default_min_heat_to_burn,
            cell_budget: s.cell_budget,
            task_deadline_secs: s.task_deadline_secs,
            worker_threads: s.worker_threads,
        }
    }
}

impl From<&WildfireSettings> for FireSettings {
    fn from(s: &WildfireSettings) -> Self {
        Self {
            enabled: s.enabled,
            periodic_update_time: s.periodic_update_time,
            heat_distribution_factor: s.heat_distribution_factor,
            fuel_consumption_rate: s.fuel_consumption_rate,
            fuel_to_heat_rate: s.fuel_to_heat_rate,
            self_heat_loss: s.self_heat_loss,
            raining_factor: s.raining_factor,
            wind_speed_factor: s.wind_speed_factor,
            grass_generation_cells_per_frame_limit: s.grass_generation_cells_per_frame_limit,
            default_initial_fuel_amount: s.default_initial_fuel_amount,
            default_min_heat_to_burn: s.default_min_heat_to_burn,
            cell_budget: s.cell_budget,
            task_deadline_secs: s.task_deadline_secs,
            worker_threads: s.worker_threads,
        }
    }
}

/// Fill `out` with the default tunables, as a starting point for `wildfire_new`.
///
/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_default_settings(out: *mut WildfireSettings) -> WildfireErrorCode {
    if out.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out"));
    }
    // SAFETY: checked non-null above.
    unsafe { out.write(WildfireSettings::from(&FireSettings::default())) };
    finish(Ok(()))
}

/// Copy the active tunables into `out`.
///
/// # Safety
/// `ptr` must be null or a live instance; `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_get_settings(
    ptr: *const WildfireInstance,
    out: *mut WildfireSettings,
) -> WildfireErrorCode {
    if out.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out"));
    }
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            out.write(WildfireSettings::from(&instance.engine.settings()));
            Ok(())
        })
    }
}

/// Replace the active tunables. Takes effect on the next tick.
///
/// Rejected settings leave the previous ones in place and return
/// `WildfireErrorCode::InvalidSettings`.
///
/// # Safety
/// `ptr` must be null or a live instance; `settings` must be null or point to a valid value.
#[no_mangle]
pub unsafe extern "C" fn wildfire_set_settings(
    ptr: *const WildfireInstance,
    settings: *const WildfireSettings,
) -> WildfireErrorCode {
    // SAFETY: caller guarantees `settings` is null or valid.
    let Some(settings) = (unsafe { settings.as_ref() }) else {
        return track_error(&DefaultWildfireError::null_pointer("settings"));
    };
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            track_result(instance.engine.set_settings(FireSettings::from(settings)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_survive_the_c_layout() {
        let settings = FireSettings {
            cell_budget: 12,
            raining_factor: 0.25,
            ..Default::default()
        };
        let raw = WildfireSettings::from(&settings);
        assert_eq!(FireSettings::from(&raw), settings);
    }
}
