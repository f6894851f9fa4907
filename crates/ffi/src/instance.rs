use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use wildfire_core::world::Collaborators;
use wildfire_core::{FireEngine, FireSettings};

use tracing::error;

use crate::error::{DefaultWildfireError, WildfireErrorCode};
use crate::helpers::{track_error, track_result};
use crate::host::{HostAdapter, WildfireHostCallbacks};
use crate::settings::WildfireSettings;

/// Opaque handle to a fire simulation.
///
/// The engine synchronizes internally, so every `wildfire_*` call may be
/// made from any host thread. Cell tasks run on the engine's own worker
/// pool and call back into the host through [`WildfireHostCallbacks`].
///
/// # Example: C++ game loop
///
/// ```cpp
/// WildfireInstance* fire = nullptr;
/// if (wildfire_new(&callbacks, nullptr, &fire) != WildfireErrorCode::Ok) {
///     return;
/// }
///
/// void Tick(float dt) {
///     bool ticked = false;
///     wildfire_update(fire, dt, &ticked);
/// }
///
/// void OnSpellHit(float x, float y, float z, float radius, float damage) {
///     wildfire_add_fire_event(fire, x, y, z, radius, damage, nullptr);
/// }
///
/// wildfire_destroy(fire);
/// ```
pub struct WildfireInstance {
    pub(crate) engine: FireEngine,
}

impl WildfireInstance {
    pub(crate) fn new(
        callbacks: &WildfireHostCallbacks,
        settings: FireSettings,
    ) -> Result<Box<Self>, DefaultWildfireError> {
        let host = Arc::new(HostAdapter::new(callbacks)?);
        let engine = FireEngine::new(Collaborators::from_host(&host), settings)?;
        Ok(Box::new(Self { engine }))
    }
}

/// How long `wildfire_destroy` waits for running cell tasks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

impl Drop for WildfireInstance {
    fn drop(&mut self) {
        // Tasks call back into the host with `user_data`, which the host may
        // free right after `wildfire_destroy` returns.
        if !self.engine.shutdown(SHUTDOWN_TIMEOUT) {
            error!("Destroying wildfire instance with cell tasks still running");
        }
    }
}

/// Create a new wildfire instance and return it via out-parameter.
///
/// Parameters
/// - `callbacks`: Host callback table. Read once; the table itself may be freed
///   after this call, but `user_data` must outlive the instance.
/// - `settings`: Initial tunables, or null for the defaults.
/// - `out_instance`: Receives the instance on success and null on failure.
///
/// Returns
/// - `WildfireErrorCode::Ok` (0) on success
/// - `WildfireErrorCode::NullPointer` if `callbacks` or `out_instance` is null,
///   or a required callback is missing
/// - `WildfireErrorCode::InvalidSettings` if `settings` fails validation
/// - `WildfireErrorCode::ThreadPool` if the worker pool cannot start
///
/// # Safety
///
/// - `callbacks` must point to a valid `WildfireHostCallbacks`.
/// - `settings` must be null or point to a valid `WildfireSettings`.
/// - `out_instance` must be valid for writes.
/// - Every callback must be safe to call from any thread, concurrently, with
///   `user_data`, for as long as the instance lives.
/// - The caller owns the returned instance and MUST call `wildfire_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn wildfire_new(
    callbacks: *const WildfireHostCallbacks,
    settings: *const WildfireSettings,
    out_instance: *mut *mut WildfireInstance,
) -> WildfireErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out_instance"));
    }
    // SAFETY: checked non-null above.
    unsafe { *out_instance = ptr::null_mut() };

    // SAFETY: caller guarantees `callbacks` is null or valid.
    let Some(callbacks) = (unsafe { callbacks.as_ref() }) else {
        return track_error(&DefaultWildfireError::null_pointer("callbacks"));
    };
    // SAFETY: caller guarantees `settings` is null or valid.
    let settings = unsafe { settings.as_ref() }.map_or_else(FireSettings::default, FireSettings::from);

    match track_result(WildfireInstance::new(callbacks, settings)) {
        Ok(instance) => {
            // SAFETY: checked non-null above.
            unsafe { *out_instance = Box::into_raw(instance) };
            WildfireErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Destroy an instance created by `wildfire_new`.
///
/// Cancels outstanding cell tasks, waits for them to stop and frees the
/// instance. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `wildfire_new` and not destroyed already.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn wildfire_destroy(ptr: *mut WildfireInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: the pointer came from `Box::into_raw` in `wildfire_new` and is still owned.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
