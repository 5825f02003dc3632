use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineLifecycle {
    Running,
    ShuttingDown,
}

impl EngineLifecycle {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

pub fn can_transition(from: EngineLifecycle, to: EngineLifecycle) -> bool {
    matches!(
        (from, to),
        (EngineLifecycle::Running, EngineLifecycle::ShuttingDown)
    ) || from == to
}

/// Discrete commands produced by double-taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingAction {
    Quit,
    ToggleSmartFocus,
    ToggleDarkMode,
}

/// Size limits for the pointer-following focus window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSizing {
    pub default_width: i32,
    pub default_height: i32,
    pub min_size: i32,
    pub step: i32,
}

impl Default for FocusSizing {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 600,
            min_size: 50,
            step: 10,
        }
    }
}

impl From<&Settings> for FocusSizing {
    fn from(settings: &Settings) -> Self {
        Self {
            default_width: settings.default_focus_width,
            default_height: settings.default_focus_height,
            min_size: settings.min_focus_size,
            step: settings.resize_step,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub smart_focus_enabled: bool,
    pub dark_mode_enabled: bool,
    pub focus_width: i32,
    pub focus_height: i32,
}

impl ModeState {
    pub fn new(sizing: FocusSizing) -> Self {
        Self {
            smart_focus_enabled: false,
            dark_mode_enabled: false,
            focus_width: sizing.default_width,
            focus_height: sizing.default_height,
        }
    }

    pub fn toggle_smart_focus(&mut self, sizing: FocusSizing) {
        self.smart_focus_enabled = !self.smart_focus_enabled;
        if !self.smart_focus_enabled {
            self.focus_width = sizing.default_width;
            self.focus_height = sizing.default_height;
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode_enabled = !self.dark_mode_enabled;
    }

    /// Returns false when smart focus owns the size and the request is ignored.
    pub fn grow(&mut self, sizing: FocusSizing) -> bool {
        if self.smart_focus_enabled {
            return false;
        }
        self.focus_width += sizing.step;
        self.focus_height += sizing.step;
        true
    }

    pub fn shrink(&mut self, sizing: FocusSizing) -> bool {
        if self.smart_focus_enabled {
            return false;
        }
        self.focus_width = (self.focus_width - sizing.step).max(sizing.min_size);
        self.focus_height = (self.focus_height - sizing.step).max(sizing.min_size);
        true
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(FocusSizing::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_to_shutting_down_is_legal() {
        assert!(can_transition(
            EngineLifecycle::Running,
            EngineLifecycle::ShuttingDown
        ));
        assert!(!can_transition(
            EngineLifecycle::ShuttingDown,
            EngineLifecycle::Running
        ));
        assert!(can_transition(
            EngineLifecycle::ShuttingDown,
            EngineLifecycle::ShuttingDown
        ));
    }

    #[test]
    fn turning_smart_focus_off_restores_default_size() {
        let sizing = FocusSizing::default();
        let mut mode = ModeState::default();
        mode.toggle_smart_focus(sizing);
        mode.focus_width = 1234;
        mode.focus_height = 321;
        mode.toggle_smart_focus(sizing);
        assert!(!mode.smart_focus_enabled);
        assert_eq!((mode.focus_width, mode.focus_height), (800, 600));
    }

    #[test]
    fn shrink_is_clamped_per_axis() {
        let sizing = FocusSizing::default();
        let mut mode = ModeState {
            focus_width: 65,
            focus_height: 400,
            ..ModeState::default()
        };
        for _ in 0..100 {
            mode.shrink(sizing);
            assert!(mode.focus_width >= 50 && mode.focus_height >= 50);
        }
        assert_eq!((mode.focus_width, mode.focus_height), (50, 50));
    }

    #[test]
    fn resize_is_ignored_while_smart_focus_is_on() {
        let sizing = FocusSizing::default();
        let mut mode = ModeState {
            smart_focus_enabled: true,
            ..ModeState::default()
        };
        assert!(!mode.grow(sizing));
        assert!(!mode.shrink(sizing));
        assert_eq!((mode.focus_width, mode.focus_height), (800, 600));
    }
}
