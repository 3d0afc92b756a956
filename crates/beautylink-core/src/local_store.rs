//! Typed, file-backed store for the small amount of state kept on the
//! user's machine: the last searched location and the install-app prompt
//! flags.
//!
//! The store is read once on open (missing or unreadable content falls back
//! to defaults) and every setter writes the whole file back immediately.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::LocationQuery;

/// Minimum gap between two install-app prompts.
pub const INSTALL_PROMPT_INTERVAL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("failed to access local state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize local state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default)]
    user_location: Option<LocationQuery>,
    #[serde(default)]
    install_app_popup_dismissed: bool,
    #[serde(default)]
    install_app_popup_last_shown: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    state: StoredState,
}

impl LocalStore {
    /// Opens the store at `path`, falling back to defaults when the file is
    /// missing or does not parse.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Io`] when the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "local state is corrupt; using defaults");
                StoredState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredState::default(),
            Err(e) => {
                return Err(LocalStoreError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        Ok(Self { path, state })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn user_location(&self) -> Option<&LocationQuery> {
        self.state.user_location.as_ref()
    }

    /// Remembers the location of the latest search.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError`] if the file cannot be written.
    pub fn set_user_location(&mut self, location: LocationQuery) -> Result<(), LocalStoreError> {
        self.state.user_location = Some(location);
        self.persist()
    }

    #[must_use]
    pub fn install_prompt_dismissed(&self) -> bool {
        self.state.install_app_popup_dismissed
    }

    #[must_use]
    pub fn install_prompt_last_shown(&self) -> Option<DateTime<Utc>> {
        self.state.install_app_popup_last_shown
    }

    /// The prompt is never shown again once dismissed; otherwise it is shown
    /// when it has never been shown or was last shown a day or more ago.
    #[must_use]
    pub fn should_show_install_prompt(&self, now: DateTime<Utc>) -> bool {
        if self.state.install_app_popup_dismissed {
            return false;
        }
        self.state
            .install_app_popup_last_shown
            .is_none_or(|last| now - last >= Duration::hours(INSTALL_PROMPT_INTERVAL_HOURS))
    }

    /// # Errors
    ///
    /// Returns [`LocalStoreError`] if the file cannot be written.
    pub fn record_install_prompt_shown(&mut self, now: DateTime<Utc>) -> Result<(), LocalStoreError> {
        self.state.install_app_popup_last_shown = Some(now);
        self.persist()
    }

    /// # Errors
    ///
    /// Returns [`LocalStoreError`] if the file cannot be written.
    pub fn dismiss_install_prompt(&mut self) -> Result<(), LocalStoreError> {
        self.state.install_app_popup_dismissed = true;
        self.persist()
    }

    fn persist(&self) -> Result<(), LocalStoreError> {
        let io_err = |source| LocalStoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::providers::Coordinates;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_file_opens_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.user_location().is_none());
        assert!(!store.install_prompt_dismissed());
        assert!(store.should_show_install_prompt(noon()));
    }

    #[test]
    fn location_is_written_through_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let location = LocationQuery {
            query: "Akwa, Douala".to_string(),
            coords: Some(Coordinates {
                lat: 4.0511,
                lon: 9.7679,
            }),
        };

        let mut store = LocalStore::open(&path).unwrap();
        store.set_user_location(location.clone()).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.user_location(), Some(&location));
    }

    #[test]
    fn file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        store
            .set_user_location(LocationQuery {
                query: "Bastos".to_string(),
                coords: None,
            })
            .unwrap();
        store.dismiss_install_prompt().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["userLocation"]["query"], "Bastos");
        assert_eq!(raw["installAppPopupDismissed"], true);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = LocalStore::open(&path).unwrap();
        assert!(store.user_location().is_none());
    }

    #[test]
    fn install_prompt_waits_a_day_between_showings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("state.json")).unwrap();
        store.record_install_prompt_shown(noon()).unwrap();
        assert!(!store.should_show_install_prompt(noon() + Duration::hours(23)));
        assert!(store.should_show_install_prompt(noon() + Duration::hours(24)));
    }

    #[test]
    fn dismissed_prompt_never_shows_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        store.dismiss_install_prompt().unwrap();
        let reopened = LocalStore::open(&path).unwrap();
        assert!(!reopened.should_show_install_prompt(noon() + Duration::days(30)));
    }
}
