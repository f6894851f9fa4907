use crate::error::{with_last_error_mut, DefaultWildfireError, FfiError, WildfireErrorCode};
use crate::instance::WildfireInstance;
use std::ffi::CString;

/// Set the thread-local error message and code.
/// Accepts any type implementing `FfiError` trait.
pub(crate) fn set_last_error(error: &impl FfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl FfiError) -> WildfireErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, clearing the previous one on success.
pub(crate) fn track_result<T, E>(result: Result<T, E>) -> Result<T, WildfireErrorCode>
where
    E: Into<DefaultWildfireError>,
{
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error.into())),
    }
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = WildfireErrorCode::Ok;
    });
}

/// Borrow the instance behind a handle, or report `NullPointer`.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wildfire_new`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const WildfireInstance,
) -> Result<&'a WildfireInstance, WildfireErrorCode> {
    // SAFETY: caller guarantees `ptr` is null or came from `wildfire_new` and is not destroyed.
    unsafe { ptr.as_ref() }.ok_or_else(|| track_error(&DefaultWildfireError::null_pointer("ptr")))
}

/// Run `f` against the instance behind `ptr` and turn the outcome into an error code.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wildfire_new`.
pub(crate) unsafe fn with_instance<F>(ptr: *const WildfireInstance, f: F) -> WildfireErrorCode
where
    F: FnOnce(&WildfireInstance) -> Result<(), WildfireErrorCode>,
{
    // SAFETY: forwarded caller contract.
    finish(unsafe { instance_from_ptr(ptr) }.and_then(f))
}

/// Store `value` through an optional out-parameter.
///
/// # Safety
/// `out` must be null or valid for writes of `T`.
pub(crate) unsafe fn write_optional<T>(out: *mut T, value: T) {
    if !out.is_null() {
        // SAFETY: non-null and writable per the caller's contract.
        unsafe { out.write(value) };
    }
}

/// Finish an FFI call: clear the error on success, pass the code through on failure.
#[inline]
pub(crate) fn finish(result: Result<(), WildfireErrorCode>) -> WildfireErrorCode {
    match result {
        Ok(()) => {
            clear_last_error();
            WildfireErrorCode::Ok
        }
        Err(code) => code,
    }
}
