use crate::overlay::composite::{compose, CompositeStyle, RgbaBuffer};
use crate::overlay::focus::{FocusPlanner, FocusRect};
use crate::overlay::gesture::{GestureDetector, HeldKeys};
use crate::overlay::monitor::{global_to_local, MonitorRect};
use crate::overlay::platform::{DisplaySurface, GeometrySource, KeyStateSource, ScreenCapture};
use crate::overlay::state::{can_transition, EngineLifecycle, FocusSizing, ModeState, PendingAction};
use crate::overlay::worker::{build_background, BackgroundSlot, BackgroundStyle, CaptureWorker};
use crate::settings::Settings;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub monitor: MonitorRect,
    pub sizing: FocusSizing,
    pub smart_focus_padding: i32,
    pub composite: CompositeStyle,
    pub background: BackgroundStyle,
    pub capture_interval: Duration,
    pub frame_interval: Duration,
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings, monitor: MonitorRect) -> Self {
        Self {
            monitor,
            sizing: FocusSizing::from(settings),
            smart_focus_padding: settings.smart_focus_padding,
            composite: CompositeStyle {
                key_color: settings.key_color,
                border_color: settings.border_color,
                border_width: settings.border_width,
            },
            background: BackgroundStyle::from(settings),
            capture_interval: settings.capture_interval(),
            frame_interval: settings.frame_interval(),
        }
    }

    /// Frames to wait between held-refresh requests, about one capture cycle.
    pub fn refresh_cooldown_ticks(&self) -> u32 {
        let frame = self.frame_interval.as_millis().max(1);
        self.capture_interval.as_millis().div_ceil(frame).max(1) as u32
    }
}

/// What one frame did, for the run loop and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub running: bool,
    pub actions_applied: usize,
    pub refresh_requested: bool,
    /// Focus rectangle in screen coordinates.
    pub rect: FocusRect,
}

pub struct OverlayEngine<S: DisplaySurface> {
    config: EngineConfig,
    lifecycle: EngineLifecycle,
    mode: ModeState,
    detector: Arc<GestureDetector>,
    planner: FocusPlanner,
    slot: Arc<BackgroundSlot>,
    worker: CaptureWorker,
    surface: S,
    geometry: Box<dyn GeometrySource>,
    keys: Box<dyn KeyStateSource>,
    refresh_cooldown: u32,
}

impl<S: DisplaySurface> OverlayEngine<S> {
    /// Seed the first background synchronously and start the capture worker.
    /// Any failure here is fatal; no overlay is shown.
    pub fn start<C>(
        config: EngineConfig,
        mut capture: C,
        surface: S,
        geometry: Box<dyn GeometrySource>,
        keys: Box<dyn KeyStateSource>,
        detector: Arc<GestureDetector>,
    ) -> Result<Self>
    where
        C: ScreenCapture + 'static,
    {
        let mode = ModeState::new(config.sizing);
        let snapshot = capture
            .capture()
            .context("initial desktop capture failed")?;
        let initial = build_background(snapshot, mode.dark_mode_enabled, config.background)
            .context("failed to build initial background")?;
        let slot = Arc::new(BackgroundSlot::new(initial));

        let worker = CaptureWorker::spawn(
            capture,
            config.background,
            config.capture_interval,
            mode.dark_mode_enabled,
            slot.clone(),
        )?;

        let planner = FocusPlanner::new(
            surface.handle(),
            config.smart_focus_padding,
            FocusRect::centered(config.monitor.center(), mode.focus_width, mode.focus_height),
        );

        tracing::info!(
            monitor = ?config.monitor,
            capture_interval = ?config.capture_interval,
            "overlay engine started"
        );

        Ok(Self {
            config,
            lifecycle: EngineLifecycle::Running,
            mode,
            detector,
            planner,
            slot,
            worker,
            surface,
            geometry,
            keys,
            refresh_cooldown: 0,
        })
    }

    pub fn lifecycle(&self) -> EngineLifecycle {
        self.lifecycle
    }

    pub fn mode(&self) -> ModeState {
        self.mode
    }

    pub fn detector(&self) -> &Arc<GestureDetector> {
        &self.detector
    }

    pub fn background(&self) -> Arc<RgbaBuffer> {
        self.slot.latest()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn transition(&mut self, to: EngineLifecycle) -> Result<()> {
        if !can_transition(self.lifecycle, to) {
            return Err(anyhow!(
                "invalid overlay lifecycle transition: {:?} -> {:?}",
                self.lifecycle,
                to
            ));
        }
        self.lifecycle = to;
        Ok(())
    }

    pub fn apply(&mut self, action: PendingAction) {
        match action {
            PendingAction::Quit => {
                if let Err(err) = self.transition(EngineLifecycle::ShuttingDown) {
                    tracing::error!(?err, "quit request ignored");
                } else {
                    tracing::info!("quit requested");
                }
            }
            PendingAction::ToggleSmartFocus => {
                self.mode.toggle_smart_focus(self.config.sizing);
                tracing::info!(enabled = self.mode.smart_focus_enabled, "smart focus toggled");
            }
            PendingAction::ToggleDarkMode => {
                self.mode.toggle_dark_mode();
                self.worker.set_dark_mode(self.mode.dark_mode_enabled);
                self.worker.request_refresh();
                tracing::info!(enabled = self.mode.dark_mode_enabled, "dark mode toggled");
            }
        }
    }

    fn sample_held_keys(&mut self) -> bool {
        let held = HeldKeys::sample(self.keys.as_ref());
        if held.grow {
            self.mode.grow(self.config.sizing);
        }
        if held.shrink {
            self.mode.shrink(self.config.sizing);
        }

        self.refresh_cooldown = self.refresh_cooldown.saturating_sub(1);
        if held.refresh && self.refresh_cooldown == 0 {
            self.worker.request_refresh();
            self.refresh_cooldown = self.config.refresh_cooldown_ticks();
            tracing::debug!("manual background refresh requested");
            return true;
        }
        false
    }

    /// One render frame: apply queued gestures, plan, compose and present.
    pub fn tick(&mut self) -> TickReport {
        let actions = self.detector.drain();
        for action in &actions {
            self.apply(*action);
        }

        let refresh_requested = self.sample_held_keys();

        let rect = self
            .planner
            .compute_rect(&mut self.mode, self.geometry.as_ref());
        let origin = self.config.monitor.origin();
        let (left, top) = global_to_local((rect.left, rect.top), origin);
        let (right, bottom) = global_to_local((rect.right, rect.bottom), origin);
        let local = FocusRect {
            left,
            top,
            right,
            bottom,
        };

        let background = self.slot.latest();
        let frame = compose(&background, local, &self.config.composite);
        if let Err(err) = self.surface.present(&frame) {
            tracing::warn!(?err, "failed to present overlay frame");
        }

        TickReport {
            running: self.lifecycle.is_running(),
            actions_applied: actions.len(),
            refresh_requested,
            rect,
        }
    }

    /// Run frames until a quit gesture, then release everything.
    pub fn run(mut self) -> Result<()> {
        loop {
            let report = self.tick();
            if !report.running {
                break;
            }
            self.surface.pump(self.config.frame_interval);
        }
        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if self.lifecycle.is_running() {
            let _ = self.transition(EngineLifecycle::ShuttingDown);
        }
        self.worker.stop();
        self.surface.shutdown();
        tracing::info!("overlay engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn config_mirrors_settings() {
        let settings = Settings {
            capture_interval_ms: 250,
            frame_interval_ms: 20,
            smart_focus_padding: 30,
            ..Settings::default()
        };
        let monitor = MonitorRect {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        };
        let config = EngineConfig::from_settings(&settings, monitor);
        assert_eq!(config.capture_interval, Duration::from_millis(250));
        assert_eq!(config.smart_focus_padding, 30);
        assert_eq!(config.sizing, FocusSizing::default());
        assert_eq!(config.refresh_cooldown_ticks(), 13);
    }

    #[test]
    fn cooldown_is_at_least_one_frame() {
        let settings = Settings {
            capture_interval_ms: 1,
            frame_interval_ms: 0,
            ..Settings::default()
        };
        let config = EngineConfig::from_settings(&settings, MonitorRect::default());
        assert_eq!(config.refresh_cooldown_ticks(), 1);
    }
}
