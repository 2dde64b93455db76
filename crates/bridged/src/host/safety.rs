//! Engine safety probing.
//!
//! Editor state must not be mutated while the engine is saving, collecting
//! garbage, or streaming assets in. The host owns these flags; the bridge only
//! reads them through [`EngineSafetyProbe`].

use std::sync::atomic::{AtomicBool, Ordering};

/// Snapshot of the engine activities that make mutation unsafe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSafetyState {
    /// A package save is in progress.
    pub saving: bool,
    /// Garbage collection is running.
    pub collecting_garbage: bool,
    /// Assets are being loaded asynchronously.
    pub async_loading: bool,
}

impl EngineSafetyState {
    /// Returns true when none of the unsafe activities are in progress.
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        !(self.saving || self.collecting_garbage || self.async_loading)
    }
}

/// Reports whether the engine can currently accept state mutation.
pub trait EngineSafetyProbe: Send + Sync {
    /// Reads the current safety state.
    fn state(&self) -> EngineSafetyState;

    /// Shorthand for `self.state().is_safe()`.
    fn is_safe(&self) -> bool {
        self.state().is_safe()
    }
}

/// Lock-free safety flags toggled by the host.
#[derive(Debug, Default)]
pub struct SafetyFlags {
    saving: AtomicBool,
    collecting_garbage: AtomicBool,
    async_loading: AtomicBool,
}

impl SafetyFlags {
    /// Builds flags reporting a safe engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a save as started or finished.
    pub fn set_saving(&self, active: bool) {
        self.saving.store(active, Ordering::SeqCst);
    }

    /// Marks garbage collection as started or finished.
    pub fn set_collecting_garbage(&self, active: bool) {
        self.collecting_garbage.store(active, Ordering::SeqCst);
    }

    /// Marks async loading as started or finished.
    pub fn set_async_loading(&self, active: bool) {
        self.async_loading.store(active, Ordering::SeqCst);
    }

    /// Clears every flag.
    pub fn clear(&self) {
        self.set_saving(false);
        self.set_collecting_garbage(false);
        self.set_async_loading(false);
    }
}

impl EngineSafetyProbe for SafetyFlags {
    fn state(&self) -> EngineSafetyState {
        EngineSafetyState {
            saving: self.saving.load(Ordering::SeqCst),
            collecting_garbage: self.collecting_garbage.load(Ordering::SeqCst),
            async_loading: self.async_loading.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(false, false, false, true)]
    #[case(true, false, false, false)]
    #[case(false, true, false, false)]
    #[case(false, false, true, false)]
    #[case(true, true, true, false)]
    fn any_busy_flag_makes_the_engine_unsafe(
        #[case] saving: bool,
        #[case] collecting_garbage: bool,
        #[case] async_loading: bool,
        #[case] expected: bool,
    ) {
        let flags = SafetyFlags::new();
        flags.set_saving(saving);
        flags.set_collecting_garbage(collecting_garbage);
        flags.set_async_loading(async_loading);
        assert_eq!(flags.is_safe(), expected);
    }

    #[test]
    fn clear_restores_safety() {
        let flags = SafetyFlags::new();
        flags.set_saving(true);
        flags.set_async_loading(true);
        flags.clear();
        assert_eq!(flags.state(), EngineSafetyState::default());
    }
}
