//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! `FfiExchangeResult` is the single envelope every call returns: either a
//! status plus an owned byte buffer, or an error code plus a message. The
//! received bytes are handed over as a boxed slice so `data_len` is also
//! the allocation's capacity, which is what `netreq_free_result` relies on.

use std::ffi::CString;
use std::os::raw::c_char;

use netreq_core::{ErrorKind, ExchangeError, ResponseResult};

/// Error codes returned in `FfiExchangeResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidArgument = 1,
    SubsystemInitFailed = 2,
    ResolutionFailed = 3,
    ConnectionFailed = 4,
    SendFailed = 5,
    ShutdownFailed = 6,
    ReceiveFailed = 7,
    Panic = 8,
}

impl From<ErrorKind> for FfiErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidArgument => FfiErrorCode::InvalidArgument,
            ErrorKind::SubsystemInitFailed => FfiErrorCode::SubsystemInitFailed,
            ErrorKind::ResolutionFailed => FfiErrorCode::ResolutionFailed,
            ErrorKind::ConnectionFailed => FfiErrorCode::ConnectionFailed,
            ErrorKind::SendFailed => FfiErrorCode::SendFailed,
            ErrorKind::ShutdownFailed => FfiErrorCode::ShutdownFailed,
            ErrorKind::ReceiveFailed => FfiErrorCode::ReceiveFailed,
        }
    }
}

impl FfiErrorCode {
    /// NUL-terminated static name, safe to hand to C without freeing.
    pub(crate) fn name(self) -> &'static [u8] {
        match self {
            FfiErrorCode::Ok => b"ok\0",
            FfiErrorCode::InvalidArgument => b"invalid_argument\0",
            FfiErrorCode::SubsystemInitFailed => b"subsystem_init_failed\0",
            FfiErrorCode::ResolutionFailed => b"resolution_failed\0",
            FfiErrorCode::ConnectionFailed => b"connection_failed\0",
            FfiErrorCode::SendFailed => b"send_failed\0",
            FfiErrorCode::ShutdownFailed => b"shutdown_failed\0",
            FfiErrorCode::ReceiveFailed => b"receive_failed\0",
            FfiErrorCode::Panic => b"panic\0",
        }
    }
}

/// Result envelope for every exchange.
///
/// On success `error_code` is `Ok`, `error_message` is null, `status` is 0
/// and `data` points to `data_len` received bytes (null when nothing was
/// received). On failure `error_code` names the category, `error_message`
/// is a human-readable C string, `data` is null and `status` is -1, which
/// carries no meaning beyond "not a completed exchange".
#[repr(C)]
pub struct FfiExchangeResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status: i32,
    pub data: *mut u8,
    pub data_len: usize,
}

impl FfiExchangeResult {
    pub(crate) fn ok(result: ResponseResult) -> *mut Self {
        let data_len = result.received.len();
        let data = if data_len == 0 {
            std::ptr::null_mut()
        } else {
            Box::into_raw(result.received.into_boxed_slice()) as *mut u8
        };
        Box::into_raw(Box::new(FfiExchangeResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            status: result.status,
            data,
            data_len,
        }))
    }

    pub(crate) fn from_error(err: ExchangeError) -> *mut Self {
        Self::failure(err.kind().into(), &err.to_string())
    }

    pub(crate) fn invalid_argument(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidArgument, &format!("invalid argument: {msg}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg)
    }

    fn failure(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        // Interior NULs would truncate the C string; drop them.
        let message = CString::new(msg.replace('\0', "")).unwrap_or_default();
        Box::into_raw(Box::new(FfiExchangeResult {
            error_code,
            error_message: message.into_raw(),
            status: -1,
            data: std::ptr::null_mut(),
            data_len: 0,
        }))
    }
}
