//! FFI bindings for Synheart Steps
//!
//! This module provides C-compatible functions for calling Steps from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `steps_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::encoder::ReportEncoder;
use crate::pipeline::IngestionPipeline;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Pipeline API
// ============================================================================

/// Opaque handle to an IngestionPipeline
pub struct StepsPipelineHandle {
    pipeline: IngestionPipeline,
    encoder: ReportEncoder,
}

/// Create a new pipeline.
///
/// # Safety
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string
///   holding a JSON configuration.
/// - Returns a pointer that must be freed with `steps_pipeline_free`.
/// - Returns NULL on error; call `steps_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn steps_pipeline_new(config_json: *const c_char) -> *mut StepsPipelineHandle {
    clear_last_error();

    let pipeline = if config_json.is_null() {
        IngestionPipeline::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match IngestionPipeline::from_config_json(&json) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(StepsPipelineHandle {
        pipeline,
        encoder: ReportEncoder::new(),
    });
    Box::into_raw(handle)
}

/// Free a pipeline.
///
/// # Safety
/// - `pipeline` must be a valid pointer returned by `steps_pipeline_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn steps_pipeline_free(pipeline: *mut StepsPipelineHandle) {
    if !pipeline.is_null() {
        drop(Box::from_raw(pipeline));
    }
}

/// Ingest one raw packet, using `now_unix_seconds` as the reference time.
///
/// # Safety
/// - `pipeline` must be a valid pointer returned by `steps_pipeline_new`.
/// - `packet` must be a valid null-terminated C string.
/// - Returns the report envelope as JSON; free it with `steps_free_string`.
/// - Returns NULL when nothing is reported. `steps_last_error` then returns
///   NULL for an ignored zero-step packet, or the rejection message.
#[no_mangle]
pub unsafe extern "C" fn steps_pipeline_ingest(
    pipeline: *mut StepsPipelineHandle,
    packet: *const c_char,
    now_unix_seconds: i64,
) -> *mut c_char {
    clear_last_error();

    if pipeline.is_null() {
        set_last_error("Null pipeline pointer");
        return ptr::null_mut();
    }

    let handle = &mut *pipeline;

    let raw = match cstr_to_string(packet) {
        Some(s) => s,
        None => {
            set_last_error("Invalid packet string pointer");
            return ptr::null_mut();
        }
    };

    let now = match DateTime::<Utc>::from_timestamp(now_unix_seconds, 0) {
        Some(t) => t,
        None => {
            set_last_error("Reference time out of range");
            return ptr::null_mut();
        }
    };

    match handle.pipeline.ingest(&raw, now) {
        Ok(Some(report)) => match handle.encoder.report_to_json(&report) {
            Ok(json) => string_to_cstr(&json),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        Ok(None) => ptr::null_mut(),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Steps accumulated for the current day.
///
/// # Safety
/// - `pipeline` must be a valid pointer returned by `steps_pipeline_new`, or NULL
///   (returns 0).
#[no_mangle]
pub unsafe extern "C" fn steps_pipeline_total_steps(pipeline: *const StepsPipelineHandle) -> u64 {
    if pipeline.is_null() {
        return 0;
    }
    (*pipeline).pipeline.total_steps()
}

/// Free a string returned by Steps functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Steps function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn steps_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Steps function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn steps_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Steps library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn steps_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
