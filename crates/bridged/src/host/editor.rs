//! Editor operations used by the built-in handlers.
//!
//! [`EditorHost`] is the seam between the bridge and the engine. Every method
//! is called on the logic thread. [`HeadlessEditor`] keeps the same state in
//! memory so the bridge can run without an engine attached.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by editor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A named entity does not exist.
    #[error("{kind} '{name}' was not found")]
    NotFound {
        /// Entity kind, e.g. `widget`.
        kind: &'static str,
        /// Name that failed to resolve.
        name: String,
    },
    /// The editor refused the operation.
    #[error("{message}")]
    Rejected {
        /// Reason given by the editor.
        message: String,
    },
}

impl HostError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Engine version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl EngineVersion {
    /// Builds a version triple.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// World-space position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// One placed foliage instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoliageInstance {
    /// Asset path of the foliage type.
    pub foliage_type_path: String,
    /// Instance location.
    pub location: Vector3,
}

/// Editor operations available to handlers.
pub trait EditorHost: Send + Sync {
    /// Runs a console command that has already passed safety screening.
    fn execute_console_command(&self, command: &str) -> Result<(), HostError>;
    /// Reports the running engine version.
    fn engine_version(&self) -> EngineVersion;
    /// Returns true while a play-in-editor session is running.
    fn is_playing(&self) -> bool;
    /// Starts a play-in-editor session.
    fn start_play(&self) -> Result<(), HostError>;
    /// Ends the running play-in-editor session.
    fn stop_play(&self) -> Result<(), HostError>;
    /// Saves every dirty asset, returning how many were written.
    fn save_all(&self) -> Result<usize, HostError>;
    /// Creates a widget blueprint and returns its asset path.
    fn create_widget(&self, name: &str) -> Result<String, HostError>;
    /// Removes a widget from the viewport.
    fn remove_widget(&self, name: &str) -> Result<(), HostError>;
    /// Lists widget names.
    fn widgets(&self) -> Vec<String>;
    /// Places foliage instances, returning how many were added.
    fn paint_foliage(&self, foliage_type: &str, locations: &[Vector3]) -> Result<usize, HostError>;
    /// Lists every placed foliage instance.
    fn foliage_instances(&self) -> Vec<FoliageInstance>;
    /// Removes all instances of one foliage type, returning the count removed.
    fn remove_foliage(&self, foliage_type: &str) -> Result<usize, HostError>;
    /// Removes every foliage instance, returning the count removed.
    fn clear_foliage(&self) -> usize;
    /// Sets the sun position as an hour of the day.
    fn set_time_of_day(&self, hour: f64) -> Result<(), HostError>;
    /// Spawns a sky sphere actor and returns its name.
    fn create_sky_sphere(&self, name: &str) -> Result<String, HostError>;
}

#[derive(Debug, Default)]
struct EditorState {
    console_history: Vec<String>,
    playing: bool,
    dirty_assets: usize,
    widgets: BTreeSet<String>,
    foliage: BTreeMap<String, Vec<Vector3>>,
    time_of_day: Option<f64>,
    sky_spheres: Vec<String>,
}

/// In-memory editor used when no engine is attached.
#[derive(Debug)]
pub struct HeadlessEditor {
    version: EngineVersion,
    state: Mutex<EditorState>,
}

impl Default for HeadlessEditor {
    fn default() -> Self {
        Self::new(EngineVersion::new(5, 3, 0))
    }
}

impl HeadlessEditor {
    /// Builds an editor reporting `version`.
    #[must_use]
    pub fn new(version: EngineVersion) -> Self {
        Self {
            version,
            state: Mutex::new(EditorState::default()),
        }
    }

    /// Console commands executed so far, oldest first.
    #[must_use]
    pub fn console_history(&self) -> Vec<String> {
        self.state().console_history.clone()
    }

    /// Last time of day applied, if any.
    #[must_use]
    pub fn time_of_day(&self) -> Option<f64> {
        self.state().time_of_day
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EditorHost for HeadlessEditor {
    fn execute_console_command(&self, command: &str) -> Result<(), HostError> {
        self.state().console_history.push(command.to_owned());
        Ok(())
    }

    fn engine_version(&self) -> EngineVersion {
        self.version
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn start_play(&self) -> Result<(), HostError> {
        let mut state = self.state();
        if state.playing {
            return Err(HostError::rejected("play session already running"));
        }
        state.playing = true;
        Ok(())
    }

    fn stop_play(&self) -> Result<(), HostError> {
        let mut state = self.state();
        if !state.playing {
            return Err(HostError::rejected("no play session running"));
        }
        state.playing = false;
        Ok(())
    }

    fn save_all(&self) -> Result<usize, HostError> {
        let mut state = self.state();
        Ok(std::mem::take(&mut state.dirty_assets))
    }

    fn create_widget(&self, name: &str) -> Result<String, HostError> {
        let mut state = self.state();
        if !state.widgets.insert(name.to_owned()) {
            return Err(HostError::rejected(format!("widget '{name}' already exists")));
        }
        state.dirty_assets += 1;
        Ok(format!("/Game/UI/{name}"))
    }

    fn remove_widget(&self, name: &str) -> Result<(), HostError> {
        if self.state().widgets.remove(name) {
            Ok(())
        } else {
            Err(HostError::not_found("widget", name))
        }
    }

    fn widgets(&self) -> Vec<String> {
        self.state().widgets.iter().cloned().collect()
    }

    fn paint_foliage(&self, foliage_type: &str, locations: &[Vector3]) -> Result<usize, HostError> {
        let mut state = self.state();
        state
            .foliage
            .entry(foliage_type.to_owned())
            .or_default()
            .extend_from_slice(locations);
        state.dirty_assets += 1;
        Ok(locations.len())
    }

    fn foliage_instances(&self) -> Vec<FoliageInstance> {
        self.state()
            .foliage
            .iter()
            .flat_map(|(foliage_type, locations)| {
                locations.iter().map(|location| FoliageInstance {
                    foliage_type_path: foliage_type.clone(),
                    location: *location,
                })
            })
            .collect()
    }

    fn remove_foliage(&self, foliage_type: &str) -> Result<usize, HostError> {
        self.state()
            .foliage
            .remove(foliage_type)
            .map(|locations| locations.len())
            .ok_or_else(|| HostError::not_found("foliage type", foliage_type))
    }

    fn clear_foliage(&self) -> usize {
        let mut state = self.state();
        let removed = state.foliage.values().map(Vec::len).sum();
        state.foliage.clear();
        removed
    }

    fn set_time_of_day(&self, hour: f64) -> Result<(), HostError> {
        self.state().time_of_day = Some(hour);
        Ok(())
    }

    fn create_sky_sphere(&self, name: &str) -> Result<String, HostError> {
        let mut state = self.state();
        let actor = format!("{name}_{}", state.sky_spheres.len());
        state.sky_spheres.push(actor.clone());
        Ok(actor)
    }
}
