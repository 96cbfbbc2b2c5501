//! Attach opt-out list stored as a `REG_MULTI_SZ` value under `HKLM`.

use std::io;

use winreg::RegKey;
use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE, KEY_SET_VALUE};

use warden_core::{AttachPolicyLocation, OsError, OsResult, PolicyStore, StoredList};

fn is_missing(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || OsError::from_io(err) == OsError::FILE_NOT_FOUND
}

/// Maps a typed multi-string read onto the stored list.
///
/// A missing value is absent; a value of another type or with undecodable
/// contents is malformed. Empty strings are dropped.
fn stored_list(read: io::Result<Vec<String>>) -> OsResult<StoredList> {
    match read {
        Ok(mut entries) => {
            entries.retain(|entry| !entry.is_empty());
            Ok(StoredList::Strings(entries))
        }
        Err(e) if is_missing(&e) => Ok(StoredList::Absent),
        Err(e)
            if e.kind() == io::ErrorKind::InvalidData
                || OsError::from_io(&e) == OsError::BAD_FILE_TYPE =>
        {
            Ok(StoredList::Malformed)
        }
        Err(e) => Err(OsError::from_io(&e)),
    }
}

/// Policy store backed by a registry value.
#[derive(Debug, Clone)]
pub struct RegistryPolicyStore {
    location: AttachPolicyLocation,
}

impl RegistryPolicyStore {
    /// Creates a store for `location` under `HKEY_LOCAL_MACHINE`.
    #[must_use]
    pub const fn new(location: AttachPolicyLocation) -> Self {
        Self { location }
    }
}

impl PolicyStore for RegistryPolicyStore {
    fn read(&self) -> OsResult<StoredList> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let key = match hklm.open_subkey_with_flags(&self.location.key, KEY_QUERY_VALUE) {
            Ok(key) => key,
            Err(e) if is_missing(&e) => return Ok(StoredList::Absent),
            Err(e) => return Err(OsError::from_io(&e)),
        };

        let stored = stored_list(key.get_value::<Vec<String>, _>(&self.location.value))?;
        if matches!(stored, StoredList::Malformed) {
            tracing::debug!(
                key = %self.location.key,
                value = %self.location.value,
                "attach policy value is not a multi-string"
            );
        }
        Ok(stored)
    }

    fn write(&self, entries: &[String]) -> OsResult<()> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let (key, _) = hklm
            .create_subkey_with_flags(&self.location.key, KEY_SET_VALUE)
            .map_err(|e| OsError::from_io(&e))?;

        key.set_value(&self.location.value, &entries.to_vec())
            .map_err(|e| OsError::from_io(&e))
    }
}
