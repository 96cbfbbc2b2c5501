//! Process token privileges via `AdjustTokenPrivileges`.

use std::ptr;

use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_NOT_ALL_ASSIGNED, GetLastError, HANDLE, INVALID_HANDLE_VALUE, LUID,
};
use windows_sys::Win32::Security::{
    AdjustTokenPrivileges, LUID_AND_ATTRIBUTES, SE_PRIVILEGE_ENABLED, TOKEN_ADJUST_PRIVILEGES,
    TOKEN_PRIVILEGES, TOKEN_QUERY,
};
use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

use warden_core::{OsError, OsResult, TokenBackend};

fn last_error() -> OsError {
    // SAFETY: GetLastError only reads thread-local state.
    OsError::from_code(unsafe { GetLastError() })
}

/// An open process token, closed on drop.
#[derive(Debug)]
pub struct ProcessToken(HANDLE);

impl Drop for ProcessToken {
    fn drop(&mut self) {
        if !self.0.is_null() && self.0 != INVALID_HANDLE_VALUE {
            // SAFETY: the handle came from OpenProcessToken and is closed once.
            unsafe { CloseHandle(self.0) };
        }
    }
}

/// Token backend for the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeToken;

impl TokenBackend for NativeToken {
    type Token = ProcessToken;

    fn open_process_token(&self) -> OsResult<ProcessToken> {
        let mut handle: HANDLE = ptr::null_mut();
        // SAFETY: GetCurrentProcess returns a pseudo handle; `handle` is a
        // valid out pointer.
        let ok = unsafe {
            OpenProcessToken(
                GetCurrentProcess(),
                TOKEN_ADJUST_PRIVILEGES | TOKEN_QUERY,
                &mut handle,
            )
        };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(ProcessToken(handle))
    }

    fn is_usable(&self, token: &ProcessToken) -> bool {
        !token.0.is_null() && token.0 != INVALID_HANDLE_VALUE
    }

    fn enable(&self, token: &ProcessToken, luid: u32) -> OsResult<()> {
        let privileges = TOKEN_PRIVILEGES {
            PrivilegeCount: 1,
            Privileges: [LUID_AND_ATTRIBUTES {
                Luid: LUID {
                    LowPart: luid,
                    HighPart: 0,
                },
                Attributes: SE_PRIVILEGE_ENABLED,
            }],
        };

        // SAFETY: `privileges` outlives the call and the previous-state
        // pointers are null with a zero length.
        let ok = unsafe {
            AdjustTokenPrivileges(
                token.0,
                0,
                &privileges,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(last_error());
        }

        // Success with ERROR_NOT_ALL_ASSIGNED means the token lacks the
        // privilege entirely.
        let err = last_error();
        if err.code() == ERROR_NOT_ALL_ASSIGNED {
            return Err(err);
        }
        Ok(())
    }
}
