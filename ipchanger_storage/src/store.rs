use log::{debug, warn};

use crate::errors::StorageError;
use crate::profile::{Profile, StoredProfile};
use crate::settings::SettingsBackend;
use crate::validate::validate;

/// The single settings key holding the serialized profile list.
pub const PROFILES_KEY: &str = "ip-profiles";

/// Loads and saves the whole profile list as one JSON blob.
///
/// The store never caches: every `load` re-reads the backend and every
/// `save` replaces the blob wholesale.
#[derive(Debug, Clone)]
pub struct ProfileStore<B> {
    backend: B,
}

impl<B: SettingsBackend> ProfileStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns every stored profile.
    ///
    /// A missing, unreadable or malformed blob yields an empty list. Entries
    /// that no longer pass validation are skipped.
    pub fn load(&self) -> Vec<Profile> {
        let blob = match self.backend.get_string(PROFILES_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Could not read '{}': {e}", PROFILES_KEY);
                return Vec::new();
            }
        };
        if blob.trim().is_empty() {
            return Vec::new();
        }
        let entries: Vec<serde_json::Value> = match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Discarding malformed '{}': {e}", PROFILES_KEY);
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let stored: StoredProfile = match serde_json::from_value(entry) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Skipping stored profile #{index}: {e}");
                    continue;
                }
            };
            let input = stored.into_input(index);
            let label = input.name.clone();
            match validate(input) {
                Ok(profile) => out.push(profile),
                Err(e) => warn!("Skipping stored profile '{label}': {e}"),
            }
        }
        debug!("Loaded {} profile(s)", out.len());
        out
    }

    /// Replace the persisted list with `profiles`.
    pub fn save(&self, profiles: &[Profile]) -> Result<(), StorageError> {
        let blob = serde_json::to_string(profiles)?;
        self.backend.set_string(PROFILES_KEY, &blob)?;
        debug!("Saved {} profile(s)", profiles.len());
        Ok(())
    }
}

/// Replace the entry with the same id in place, or append a new one.
pub fn upsert(mut profiles: Vec<Profile>, profile: Profile) -> Vec<Profile> {
    match profiles.iter_mut().find(|p| p.id == profile.id) {
        Some(slot) => *slot = profile,
        None => profiles.push(profile),
    }
    profiles
}

/// Drop the entry with `id`. Unknown ids leave the list untouched.
pub fn remove(profiles: Vec<Profile>, id: &str) -> Vec<Profile> {
    profiles.into_iter().filter(|p| p.id != id).collect()
}

/// Look a profile up by id, falling back to an exact name match.
pub fn find<'a>(profiles: &'a [Profile], key: &str) -> Option<&'a Profile> {
    profiles
        .iter()
        .find(|p| p.id == key)
        .or_else(|| profiles.iter().find(|p| p.name == key))
}
