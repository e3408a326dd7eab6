//! Platform networking-subsystem guard.
//!
//! # Design
//! Windows requires `WSAStartup` before any socket call and a matching
//! `WSACleanup` afterwards. Both calls are reference-counted by WinSock, so
//! one startup/cleanup pair per guard is safe under concurrent exchanges.
//! Other platforms need no setup; the guard still exists there so every
//! exchange acquires and releases it the same way.
//!
//! A process-wide counter tracks live guards. It exists for diagnostics and
//! leak tests only; nothing branches on it.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ExchangeError;

static ACTIVE: AtomicUsize = AtomicUsize::new(0);

/// Scoped hold on the networking subsystem. Released on drop.
#[derive(Debug)]
pub struct NetSubsystem {
    _private: (),
}

impl NetSubsystem {
    pub fn acquire() -> Result<Self, ExchangeError> {
        platform::startup().map_err(|source| ExchangeError::SubsystemInitFailed { source })?;
        ACTIVE.fetch_add(1, Ordering::SeqCst);
        Ok(Self { _private: () })
    }
}

impl Drop for NetSubsystem {
    fn drop(&mut self) {
        platform::cleanup();
        ACTIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Number of `NetSubsystem` guards currently alive in this process.
pub fn active_handles() -> usize {
    ACTIVE.load(Ordering::SeqCst)
}

#[cfg(windows)]
mod platform {
    use std::io;
    use std::mem;

    use windows_sys::Win32::Networking::WinSock::{WSACleanup, WSAStartup, WSADATA};

    /// WinSock 2.2.
    const VERSION: u16 = 0x0202;

    pub(super) fn startup() -> io::Result<()> {
        let mut data: WSADATA = unsafe { mem::zeroed() };
        let rc = unsafe { WSAStartup(VERSION, &mut data) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(())
    }

    pub(super) fn cleanup() {
        unsafe {
            WSACleanup();
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use std::io;

    pub(super) fn startup() -> io::Result<()> {
        Ok(())
    }

    pub(super) fn cleanup() {}
}
