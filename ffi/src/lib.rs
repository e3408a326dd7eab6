//! C-ABI wrapper around `netreq-core`.
//!
//! # Overview
//! Exposes the blocking TCP exchange through `extern "C"` functions so any
//! host with a C FFI (an interpreter extension, a C program) can run an
//! exchange and receive either the reply bytes or a typed error.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One `FfiExchangeResult` envelope carries success and failure alike; the
//!   caller never has to interpret a bare negative return value.
//! - No locks are held across the network I/O. Hosts with an interpreter
//!   lock should release it around `netreq_execute` themselves.
//! - The C caller owns every returned result and must release it with
//!   `netreq_free_result`.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use netreq_core::{ExchangeConfig, RequestSpec, TcpExchange};
use tracing::debug;

use types::*;

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Connect to `host:port`, send `payload_len` bytes from `payload`, and read
/// the reply until the peer closes.
///
/// `payload` may be null only when `payload_len` is 0. Never returns null.
/// The caller must free the result with `netreq_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn netreq_execute(
    host: *const c_char,
    port: i32,
    payload: *const u8,
    payload_len: usize,
) -> *mut FfiExchangeResult {
    catch_unwind(|| run_exchange(host, port, payload, payload_len, std::ptr::null()))
        .unwrap_or_else(|_| FfiExchangeResult::panic("panic in netreq_execute"))
}

/// Same as `netreq_execute`, with an `ExchangeConfig` given as JSON, e.g.
/// `{"read_buffer_size":4096,"fallback_to_next_candidate":true}`.
///
/// A null `config_json` means defaults. Malformed JSON yields
/// `InvalidArgument` without any network I/O.
#[unsafe(no_mangle)]
pub extern "C" fn netreq_execute_with_config(
    host: *const c_char,
    port: i32,
    payload: *const u8,
    payload_len: usize,
    config_json: *const c_char,
) -> *mut FfiExchangeResult {
    catch_unwind(|| run_exchange(host, port, payload, payload_len, config_json))
        .unwrap_or_else(|_| FfiExchangeResult::panic("panic in netreq_execute_with_config"))
}

fn run_exchange(
    host: *const c_char,
    port: i32,
    payload: *const u8,
    payload_len: usize,
    config_json: *const c_char,
) -> *mut FfiExchangeResult {
    if host.is_null() {
        return FfiExchangeResult::invalid_argument("host is null");
    }
    let host = match unsafe { CStr::from_ptr(host) }.to_str() {
        Ok(h) => h,
        Err(_) => return FfiExchangeResult::invalid_argument("host is not valid UTF-8"),
    };

    let payload: &[u8] = if payload_len == 0 {
        &[]
    } else if payload.is_null() {
        return FfiExchangeResult::invalid_argument("payload is null but payload_len is not 0");
    } else {
        unsafe { std::slice::from_raw_parts(payload, payload_len) }
    };

    let config = if config_json.is_null() {
        ExchangeConfig::default()
    } else {
        let raw = match unsafe { CStr::from_ptr(config_json) }.to_str() {
            Ok(r) => r,
            Err(_) => return FfiExchangeResult::invalid_argument("config is not valid UTF-8"),
        };
        match ExchangeConfig::from_json(raw) {
            Ok(c) => c,
            Err(e) => return FfiExchangeResult::invalid_argument(&e.to_string()),
        }
    };

    let spec = match RequestSpec::new(host, i64::from(port), payload) {
        Ok(s) => s,
        Err(e) => return FfiExchangeResult::from_error(e),
    };

    match TcpExchange::new(config).execute(spec) {
        Ok(result) => FfiExchangeResult::ok(result),
        Err(e) => {
            debug!(kind = %e.kind(), error = %e, "exchange failed");
            FfiExchangeResult::from_error(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Free and helper functions
// ---------------------------------------------------------------------------

/// Free an `FfiExchangeResult` returned by `netreq_execute*`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn netreq_free_result(result: *mut FfiExchangeResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.data.is_null() && result.data_len > 0 {
            let data = std::ptr::slice_from_raw_parts_mut(result.data, result.data_len);
            drop(unsafe { Box::from_raw(data) });
        }
    });
}

/// Static snake_case name for an `FfiErrorCode` value, or `"unknown"`.
/// The returned string must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn netreq_error_name(code: i32) -> *const c_char {
    let code = match code {
        0 => FfiErrorCode::Ok,
        1 => FfiErrorCode::InvalidArgument,
        2 => FfiErrorCode::SubsystemInitFailed,
        3 => FfiErrorCode::ResolutionFailed,
        4 => FfiErrorCode::ConnectionFailed,
        5 => FfiErrorCode::SendFailed,
        6 => FfiErrorCode::ShutdownFailed,
        7 => FfiErrorCode::ReceiveFailed,
        8 => FfiErrorCode::Panic,
        _ => return b"unknown\0".as_ptr() as *const c_char,
    };
    code.name().as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
