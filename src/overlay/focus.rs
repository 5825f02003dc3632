use crate::overlay::platform::GeometrySource;
use crate::overlay::state::ModeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl FocusRect {
    pub fn centered(center: (i32, i32), width: i32, height: i32) -> Self {
        let (cx, cy) = center;
        Self {
            left: cx - width / 2,
            top: cy - height / 2,
            right: cx + width / 2,
            bottom: cy + height / 2,
        }
    }
}

/// Decides where the undimmed hole goes each frame.
#[derive(Debug, Clone)]
pub struct FocusPlanner {
    overlay_handle: isize,
    padding: i32,
    last_rect: FocusRect,
}

impl FocusPlanner {
    pub fn new(overlay_handle: isize, padding: i32, initial: FocusRect) -> Self {
        Self {
            overlay_handle,
            padding,
            last_rect: initial,
        }
    }

    #[cfg(test)]
    pub(crate) fn last_rect(&self) -> FocusRect {
        self.last_rect
    }

    pub fn compute_rect(&mut self, mode: &mut ModeState, geometry: &dyn GeometrySource) -> FocusRect {
        let rect = if mode.smart_focus_enabled {
            self.plan_smart_focus(mode, geometry)
        } else {
            self.plan_pointer_focus(mode, geometry)
        };
        self.last_rect = rect;
        rect
    }

    fn plan_smart_focus(&self, mode: &mut ModeState, geometry: &dyn GeometrySource) -> FocusRect {
        let Some(window) = geometry.foreground_window() else {
            tracing::debug!("no foreground window, keeping previous focus rect");
            return self.last_rect;
        };
        if window.handle == self.overlay_handle {
            return self.last_rect;
        }
        let (w, h) = (window.rect.width(), window.rect.height());
        if w <= 0 || h <= 0 {
            tracing::debug!(?window, "foreground window has no area");
            return self.last_rect;
        }

        mode.focus_width = w + self.padding;
        mode.focus_height = h + self.padding;
        FocusRect::centered(window.rect.center(), mode.focus_width, mode.focus_height)
    }

    fn plan_pointer_focus(&self, mode: &ModeState, geometry: &dyn GeometrySource) -> FocusRect {
        match geometry.cursor_position() {
            Some(cursor) => FocusRect::centered(cursor, mode.focus_width, mode.focus_height),
            None => {
                tracing::debug!("cursor position unavailable, keeping previous focus rect");
                self.last_rect
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::platform::{ForegroundWindow, WindowRect};

    const OVERLAY: isize = 42;

    #[derive(Default)]
    struct StubGeometry {
        cursor: Option<(i32, i32)>,
        window: Option<ForegroundWindow>,
    }

    impl GeometrySource for StubGeometry {
        fn cursor_position(&self) -> Option<(i32, i32)> {
            self.cursor
        }

        fn foreground_window(&self) -> Option<ForegroundWindow> {
            self.window
        }
    }

    fn planner() -> FocusPlanner {
        FocusPlanner::new(OVERLAY, 20, FocusRect::centered((960, 540), 800, 600))
    }

    fn window(handle: isize, left: i32, top: i32, right: i32, bottom: i32) -> ForegroundWindow {
        ForegroundWindow {
            handle,
            rect: WindowRect {
                left,
                top,
                right,
                bottom,
            },
        }
    }

    #[test]
    fn pointer_mode_centers_default_size_on_cursor() {
        let mut mode = ModeState::default();
        let geometry = StubGeometry {
            cursor: Some((500, 500)),
            ..Default::default()
        };
        let rect = planner().compute_rect(&mut mode, &geometry);
        assert_eq!(
            rect,
            FocusRect {
                left: 100,
                top: 200,
                right: 900,
                bottom: 800
            }
        );
    }

    #[test]
    fn smart_focus_pads_foreground_window_and_updates_size() {
        let mut mode = ModeState {
            smart_focus_enabled: true,
            ..ModeState::default()
        };
        let geometry = StubGeometry {
            cursor: Some((0, 0)),
            window: Some(window(7, 300, 300, 700, 700)),
        };
        let rect = planner().compute_rect(&mut mode, &geometry);
        assert_eq!(
            rect,
            FocusRect {
                left: 290,
                top: 290,
                right: 710,
                bottom: 710
            }
        );
        assert_eq!((mode.focus_width, mode.focus_height), (420, 420));
    }

    #[test]
    fn smart_focus_ignores_the_overlay_itself() {
        let mut planner = planner();
        let before = planner.last_rect();
        let mut mode = ModeState {
            smart_focus_enabled: true,
            ..ModeState::default()
        };
        let geometry = StubGeometry {
            cursor: None,
            window: Some(window(OVERLAY, 0, 0, 1920, 1080)),
        };
        assert_eq!(planner.compute_rect(&mut mode, &geometry), before);
        assert_eq!((mode.focus_width, mode.focus_height), (800, 600));
    }

    #[test]
    fn missing_or_empty_window_keeps_previous_rect() {
        let mut planner = planner();
        let mut mode = ModeState {
            smart_focus_enabled: true,
            ..ModeState::default()
        };
        let first = planner.compute_rect(
            &mut mode,
            &StubGeometry {
                cursor: None,
                window: Some(window(3, 100, 100, 300, 200)),
            },
        );

        assert_eq!(planner.compute_rect(&mut mode, &StubGeometry::default()), first);
        assert_eq!(
            planner.compute_rect(
                &mut mode,
                &StubGeometry {
                    cursor: None,
                    window: Some(window(3, 10, 10, 10, 50)),
                },
            ),
            first
        );
    }

    #[test]
    fn missing_cursor_keeps_previous_rect() {
        let mut planner = planner();
        let mut mode = ModeState::default();
        let before = planner.last_rect();
        assert_eq!(planner.compute_rect(&mut mode, &StubGeometry::default()), before);
    }

    #[test]
    fn dark_mode_does_not_move_the_rect() {
        let geometry = StubGeometry {
            cursor: Some((640, 360)),
            ..Default::default()
        };
        let mut light = ModeState::default();
        let mut dark = ModeState {
            dark_mode_enabled: true,
            ..ModeState::default()
        };
        assert_eq!(
            planner().compute_rect(&mut light, &geometry),
            planner().compute_rect(&mut dark, &geometry)
        );
    }

    #[test]
    fn odd_sizes_use_integer_halves() {
        let rect = FocusRect::centered((10, 10), 51, 51);
        assert_eq!(
            rect,
            FocusRect {
                left: -15,
                top: -15,
                right: 35,
                bottom: 35
            }
        );
    }
}
