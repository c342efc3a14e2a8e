//! Sound and profile settings, persisted as flat JSON objects under
//! versioned kv keys.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::Repository;

pub const SOUND_SETTINGS_KEY: &str = "focuslog.sound.v1";
pub const PROFILE_KEY: &str = "focuslog.profile.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundSettings {
    /// Per-second tick while an attempt is running. Paused attempts
    /// suspend the tick (and the sound with it).
    pub tick_sound: bool,
    pub completion_sound: bool,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            tick_sound: true,
            completion_sound: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            display_name: "Local".to_string(),
        }
    }
}

/// Load a settings blob, falling back to defaults when absent or
/// unreadable.
pub fn load_sound_settings<R: Repository>(repo: &R) -> SoundSettings {
    load_or_default(repo, SOUND_SETTINGS_KEY)
}

pub fn save_sound_settings<R: Repository>(
    repo: &mut R,
    settings: &SoundSettings,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(settings)?;
    repo.kv_set(SOUND_SETTINGS_KEY, &json)
}

pub fn load_profile<R: Repository>(repo: &R) -> Profile {
    load_or_default(repo, PROFILE_KEY)
}

pub fn save_profile<R: Repository>(repo: &mut R, profile: &Profile) -> Result<(), StoreError> {
    let json = serde_json::to_string(profile)?;
    repo.kv_set(PROFILE_KEY, &json)
}

fn load_or_default<R: Repository, T: Default + for<'de> Deserialize<'de>>(
    repo: &R,
    key: &str,
) -> T {
    match repo.kv_get(key) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_default(),
        _ => T::default(),
    }
}
