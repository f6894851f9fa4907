use std::ffi::CStr;
use std::os::raw::c_char;

use wildfire_core::{CellId, ImpactClassifier, TickSummary, Vec3};

use crate::error::{DefaultWildfireError, WildfireErrorCode};
use crate::helpers::{track_error, with_instance, write_optional};
use crate::instance::WildfireInstance;

/// C layout of what one tick did.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WildfireTickSummary {
    pub tick: u64,
    pub reaped: usize,
    pub expired: usize,
    pub queued_dirty: usize,
    pub spawned: usize,
    pub skipped: usize,
    pub evicted: usize,
    pub ignited: usize,
}

impl From<TickSummary> for WildfireTickSummary {
    fn from(s: TickSummary) -> Self {
        Self {
            tick: s.tick,
            reaped: s.reaped,
            expired: s.expired,
            queued_dirty: s.queued_dirty,
            spawned: s.spawned,
            skipped: s.skipped,
            evicted: s.evicted,
            ignited: s.ignited,
        }
    }
}

fn check_finite(name: &str, value: f32) -> Result<(), WildfireErrorCode> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(track_error(&DefaultWildfireError::invalid_parameter(format!(
            "{name} must be finite, got {value}"
        ))))
    }
}

/// Run one simulation tick of `delta` seconds, ignoring the update period.
///
/// `out_summary` may be null.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_summary` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_tick(
    ptr: *const WildfireInstance,
    delta: f32,
    out_summary: *mut WildfireTickSummary,
) -> WildfireErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            check_finite("delta", delta)?;
            let summary = instance.engine.tick(delta.max(0.0));
            write_optional(out_summary, summary.into());
            Ok(())
        })
    }
}

/// Advance the simulation by one host frame.
///
/// Runs at most one tick when enough time has accumulated and hands dirty
/// cells to the `regenerate` callback. `out_ticked` may be null.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_ticked` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_update(
    ptr: *const WildfireInstance,
    frame_delta: f32,
    out_ticked: *mut bool,
) -> WildfireErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            check_finite("frame_delta", frame_delta)?;
            let ticked = instance.engine.update(frame_delta).is_some();
            write_optional(out_ticked, ticked);
            Ok(())
        })
    }
}

/// Apply heat (positive `magnitude`) or cooling (negative) around a world position.
///
/// A `radius` of at most one vertex spacing (128) targets the single vertex
/// nearest the position. The number of
/// vertices whose state changed is written to `out_changed`, which may be null.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_changed` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_add_fire_event(
    ptr: *const WildfireInstance,
    x: f32,
    y: f32,
    z: f32,
    radius: f32,
    magnitude: f32,
    out_changed: *mut usize,
) -> WildfireErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            for (name, value) in [("x", x), ("y", y), ("z", z), ("radius", radius), ("magnitude", magnitude)] {
                check_finite(name, value)?;
            }
            let changed = instance.engine.add_fire_event(&Vec3::new(x, y, z), radius, magnitude);
            write_optional(out_changed, changed);
            Ok(())
        })
    }
}

/// Like `wildfire_add_fire_event`, but the sign of the damage comes from
/// classifying `source` (a spell or effect name) against the impact patterns.
/// Unclassified sources change nothing.
///
/// # Safety
/// `ptr` must be null or a live instance; `source` must be a valid
/// null-terminated string; `out_changed` must be null or valid for writes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn wildfire_add_impact(
    ptr: *const WildfireInstance,
    source: *const c_char,
    x: f32,
    y: f32,
    z: f32,
    radius: f32,
    magnitude: f32,
    out_changed: *mut usize,
) -> WildfireErrorCode {
    if source.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("source"));
    }
    // SAFETY: non-null and null-terminated per the caller's contract.
    let source = unsafe { CStr::from_ptr(source) }.to_string_lossy();
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            for (name, value) in [("x", x), ("y", y), ("z", z), ("radius", radius), ("magnitude", magnitude)] {
                check_finite(name, value)?;
            }
            let changed = instance
                .engine
                .add_impact(&source, &Vec3::new(x, y, z), radius, magnitude);
            write_optional(out_changed, changed);
            Ok(())
        })
    }
}

/// Replace the impact patterns used by `wildfire_add_impact`.
///
/// Each argument is newline-separated text, one substring per line; blank
/// lines and lines starting with `#` are ignored. Null means no patterns.
///
/// # Safety
/// `ptr` must be null or a live instance; each pattern pointer must be null or
/// a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn wildfire_set_impact_patterns(
    ptr: *const WildfireInstance,
    fire: *const c_char,
    cold: *const c_char,
    water: *const c_char,
) -> WildfireErrorCode {
    let text = |raw: *const c_char| {
        if raw.is_null() {
            String::new()
        } else {
            // SAFETY: non-null and null-terminated per the caller's contract.
            unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
        }
    };
    let classifier = ImpactClassifier::from_pattern_text(&text(fire), &text(cold), &text(water));
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            instance.engine.set_impact_classifier(classifier);
            Ok(())
        })
    }
}

/// Drop a cell's fire state and restore its original colors.
///
/// `out_reset` receives false when the cell was not tracked; it may be null.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_reset` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_reset_cell(
    ptr: *const WildfireInstance,
    cell: u64,
    out_reset: *mut bool,
) -> WildfireErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            write_optional(out_reset, instance.engine.reset_cell(CellId(cell)));
            Ok(())
        })
    }
}

/// Reset every tracked cell. The number of cells reset goes to `out_count`, which may be null.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_count` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_reset_all(
    ptr: *const WildfireInstance,
    out_count: *mut usize,
) -> WildfireErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            write_optional(out_count, instance.engine.reset_all());
            Ok(())
        })
    }
}

/// Hand up to the per-frame limit of dirty cells to the `regenerate` callback now.
///
/// The number of cells handed over goes to `out_count`, which may be null.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_count` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_regenerate_dirty(
    ptr: *const WildfireInstance,
    out_count: *mut usize,
) -> WildfireErrorCode {
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            write_optional(out_count, instance.engine.regenerate_dirty().len());
            Ok(())
        })
    }
}
