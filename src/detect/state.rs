//! Runtime-toggleable detector flags and the commands that flip them.

use crate::detect::DetectorKind;
use crate::trace::status_info;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of a detection loop; `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Detector flags plus the running flag.
///
/// Each flag has one writer (its trigger) and is read fresh by the loop every
/// iteration; no multi-flag snapshot is needed, so plain atomics suffice.
#[derive(Debug)]
pub struct DetectorState {
    rotating: AtomicBool,
    fixed_gem: AtomicBool,
    restart: AtomicBool,
    running: AtomicBool,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorState {
    /// All detectors disabled, loop running.
    pub fn new() -> Self {
        Self::with_enabled(false, false, false)
    }

    /// Running state with the given detectors enabled.
    pub fn with_enabled(rotating: bool, fixed_gem: bool, restart: bool) -> Self {
        Self {
            rotating: AtomicBool::new(rotating),
            fixed_gem: AtomicBool::new(fixed_gem),
            restart: AtomicBool::new(restart),
            running: AtomicBool::new(true),
        }
    }

    fn flag(&self, kind: DetectorKind) -> &AtomicBool {
        match kind {
            DetectorKind::Rotating => &self.rotating,
            DetectorKind::FixedGem => &self.fixed_gem,
            DetectorKind::RestartButton => &self.restart,
        }
    }

    /// Returns whether `kind` is currently enabled.
    pub fn is_enabled(&self, kind: DetectorKind) -> bool {
        self.flag(kind).load(Ordering::SeqCst)
    }

    /// Enables or disables `kind`.
    pub fn set_enabled(&self, kind: DetectorKind, enabled: bool) {
        self.flag(kind).store(enabled, Ordering::SeqCst);
    }

    /// Flips `kind` and returns its new value.
    pub fn toggle(&self, kind: DetectorKind) -> bool {
        let enabled = !self.flag(kind).fetch_xor(true, Ordering::SeqCst);
        status_info!(">> {kind} detection: {}", if enabled { "on" } else { "off" });
        enabled
    }

    /// Requests the loop to stop; it cannot be restarted.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            status_info!("stopping detection loop");
        }
    }

    /// Returns true until [`DetectorState::stop`] is called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the loop lifecycle state.
    pub fn state(&self) -> LoopState {
        if self.is_running() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Applies one external command.
    pub fn apply(&self, command: Command) {
        match command {
            Command::ToggleRotating => {
                self.toggle(DetectorKind::Rotating);
            }
            Command::ToggleFixed => {
                self.toggle(DetectorKind::FixedGem);
            }
            Command::ToggleRestart => {
                self.toggle(DetectorKind::RestartButton);
            }
            Command::Stop => self.stop(),
        }
    }

    /// Binds the four command callbacks through `registry`.
    pub fn register_triggers<R: TriggerRegistry + ?Sized>(
        self: &Arc<Self>,
        registry: &mut R,
        bindings: &KeyBindings,
    ) {
        for (key, command) in bindings.entries() {
            let state = Arc::clone(self);
            registry.register(key, Box::new(move || state.apply(command)));
        }
    }
}

/// External input understood by [`DetectorState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ToggleRotating,
    ToggleFixed,
    ToggleRestart,
    Stop,
}

/// Zero-argument callback bound to an external trigger.
pub type TriggerCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Something that can invoke a callback when a named trigger fires
/// (a hotkey hook, a signal handler, a line on stdin).
pub trait TriggerRegistry {
    fn register(&mut self, key: &str, callback: TriggerCallback);
}

/// Trigger names for each command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub toggle_rotating: String,
    pub toggle_fixed: String,
    pub toggle_restart: String,
    pub stop: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle_rotating: "f1".to_string(),
            toggle_fixed: "f2".to_string(),
            toggle_restart: "f3".to_string(),
            stop: "esc".to_string(),
        }
    }
}

impl KeyBindings {
    /// Returns `(key, command)` pairs.
    pub fn entries(&self) -> [(&str, Command); 4] {
        [
            (self.toggle_rotating.as_str(), Command::ToggleRotating),
            (self.toggle_fixed.as_str(), Command::ToggleFixed),
            (self.toggle_restart.as_str(), Command::ToggleRestart),
            (self.stop.as_str(), Command::Stop),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapRegistry(HashMap<String, TriggerCallback>);

    impl TriggerRegistry for MapRegistry {
        fn register(&mut self, key: &str, callback: TriggerCallback) {
            self.0.insert(key.to_string(), callback);
        }
    }

    #[test]
    fn toggling_one_flag_leaves_the_others() {
        let state = DetectorState::with_enabled(false, true, false);
        assert!(state.toggle(DetectorKind::Rotating));
        assert!(state.is_enabled(DetectorKind::FixedGem));
        assert!(!state.is_enabled(DetectorKind::RestartButton));

        assert!(!state.toggle(DetectorKind::Rotating));
        assert!(!state.is_enabled(DetectorKind::Rotating));
        assert!(state.is_enabled(DetectorKind::FixedGem));
        assert!(!state.is_enabled(DetectorKind::RestartButton));
    }

    #[test]
    fn stop_is_terminal() {
        let state = DetectorState::new();
        assert_eq!(state.state(), LoopState::Running);
        state.stop();
        state.stop();
        assert_eq!(state.state(), LoopState::Stopped);
        state.apply(Command::ToggleFixed);
        assert_eq!(state.state(), LoopState::Stopped);
    }

    #[test]
    fn registered_triggers_drive_the_state() {
        let state = Arc::new(DetectorState::new());
        let mut registry = MapRegistry::default();
        state.register_triggers(&mut registry, &KeyBindings::default());
        assert_eq!(registry.0.len(), 4);

        (registry.0["f2"])();
        assert!(state.is_enabled(DetectorKind::FixedGem));
        (registry.0["f3"])();
        (registry.0["f3"])();
        assert!(!state.is_enabled(DetectorKind::RestartButton));
        (registry.0["esc"])();
        assert!(!state.is_running());
    }
}
