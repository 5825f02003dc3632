use anyhow::{anyhow, Result};
use focus_overlay::logging;
use focus_overlay::overlay::capture::{reconcile_capture_bounds, MonitorCapture};
use focus_overlay::overlay::gesture::GestureDetector;
use focus_overlay::overlay::keyboard_hook::{AsyncKeyState, KeyboardHook};
use focus_overlay::overlay::monitor::{resolve_primary_monitor, DesktopGeometry};
use focus_overlay::overlay::{EngineConfig, OverlayEngine, OverlayWindow};
use focus_overlay::settings::{Settings, SETTINGS_FILE};
use std::sync::Arc;

fn print_controls() {
    println!("Controls:");
    println!("  'q' + 'q': Quit");
    println!("  'w' + 'w': Toggle Smart Focus (follow the active window)");
    println!("  'z' + 'z': Toggle Dark Mode");
    println!("  'r' (hold): Refresh background");
    println!("  '[' / ']' (hold): Resize focus area");
}

fn main() -> Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    logging::init(settings.debug, settings.log_file.clone());
    print_controls();

    let primary = resolve_primary_monitor().ok_or_else(|| anyhow!("no monitor available"))?;
    let capture = MonitorCapture::for_monitor(primary)?;
    let monitor = reconcile_capture_bounds(primary, capture.monitor_rect());
    let window = OverlayWindow::create_for_monitor(monitor, settings.key_color)?;

    let detector = Arc::new(GestureDetector::new(settings.double_tap_interval()));
    let mut hook = KeyboardHook::default();
    let sink = detector.clone();
    hook.activate(Arc::new(move |event| sink.on_raw_event(event)))?;

    let engine = OverlayEngine::start(
        EngineConfig::from_settings(&settings, monitor),
        capture,
        window,
        Box::new(DesktopGeometry),
        Box::new(AsyncKeyState),
        detector,
    )?;

    let result = engine.run();
    hook.deactivate();
    tracing::info!("focus overlay exited");
    result
}
