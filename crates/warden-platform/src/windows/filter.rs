//! Filter Manager access via `fltlib`.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::InstallableFileSystems::{
    FilterFindClose, FilterFindFirst, FilterFindNext, FilterFullInformation, FilterLoad,
    FilterUnload,
};

use warden_core::{FilterFind, FilterRegistry, OsError, OsResult};

fn wide(name: &str) -> Vec<u16> {
    OsStr::new(name).encode_wide().chain(Some(0)).collect()
}

fn check(hr: i32) -> OsResult<()> {
    if hr < 0 {
        Err(OsError::from_hresult(hr))
    } else {
        Ok(())
    }
}

/// The system Filter Manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterManager;

impl FilterRegistry for FilterManager {
    fn load(&self, name: &str) -> OsResult<()> {
        let name = wide(name);
        // SAFETY: `name` is NUL-terminated and outlives the call.
        check(unsafe { FilterLoad(name.as_ptr()) })
    }

    fn unload(&self, name: &str) -> OsResult<()> {
        let name = wide(name);
        // SAFETY: `name` is NUL-terminated and outlives the call.
        check(unsafe { FilterUnload(name.as_ptr()) })
    }

    fn find(&self) -> OsResult<Box<dyn FilterFind + '_>> {
        Ok(Box::new(FindCursor { handle: None }))
    }
}

/// Enumeration cursor. The OS handle is opened by the first page request and
/// closed on drop.
struct FindCursor {
    handle: Option<HANDLE>,
}

impl FilterFind for FindCursor {
    fn next_page(&mut self, page: &mut [u8]) -> OsResult<usize> {
        let size = u32::try_from(page.len()).unwrap_or(u32::MAX);
        let mut written: u32 = 0;

        let hr = match self.handle {
            Some(handle) => {
                // SAFETY: `page` is writable for `size` bytes and `handle` is
                // an open find handle.
                unsafe {
                    FilterFindNext(
                        handle,
                        FilterFullInformation,
                        page.as_mut_ptr().cast(),
                        size,
                        &mut written,
                    )
                }
            }
            None => {
                let mut handle: HANDLE = INVALID_HANDLE_VALUE;
                // SAFETY: `page` is writable for `size` bytes and both out
                // pointers are valid.
                let hr = unsafe {
                    FilterFindFirst(
                        FilterFullInformation,
                        page.as_mut_ptr().cast(),
                        size,
                        &mut written,
                        &mut handle,
                    )
                };
                if hr >= 0 {
                    self.handle = Some(handle);
                }
                hr
            }
        };

        check(hr)?;
        Ok(written as usize)
    }
}

impl Drop for FindCursor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // SAFETY: the handle came from FilterFindFirst and is closed once.
            unsafe {
                FilterFindClose(handle);
            }
        }
    }
}
