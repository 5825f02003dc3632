use crate::overlay::composite::RgbaBuffer;
use crate::overlay::monitor::MonitorRect;
use crate::overlay::platform::ScreenCapture;
use anyhow::Result;

/// Bounds the overlay should use for `enumerated`, given what the capture
/// backend reports. Frames come from the backend, so its bounds win.
pub fn reconcile_capture_bounds(enumerated: MonitorRect, captured: MonitorRect) -> MonitorRect {
    if enumerated != captured {
        tracing::warn!(
            ?enumerated,
            ?captured,
            "capture bounds differ from monitor bounds, sizing overlay to the capture"
        );
    }
    captured
}

/// Snapshots one monitor. The screen handle is resolved per capture so the
/// source stays `Send` and survives display reconfiguration.
#[cfg(windows)]
pub struct MonitorCapture {
    rect: MonitorRect,
}

#[cfg(windows)]
impl MonitorCapture {
    pub fn for_monitor(rect: MonitorRect) -> Result<Self> {
        let screen = screenshots::Screen::from_point(rect.x, rect.y)?;
        let info = &screen.display_info;
        Ok(Self {
            rect: MonitorRect {
                x: info.x,
                y: info.y,
                width: info.width as i32,
                height: info.height as i32,
            },
        })
    }

    pub fn monitor_rect(&self) -> MonitorRect {
        self.rect
    }
}

#[cfg(windows)]
impl ScreenCapture for MonitorCapture {
    fn capture(&mut self) -> Result<RgbaBuffer> {
        let screen = screenshots::Screen::from_point(self.rect.x, self.rect.y)?;
        let image = screen.capture()?;
        Ok(RgbaBuffer::from_image(image))
    }
}

#[cfg(not(windows))]
pub struct MonitorCapture;

#[cfg(not(windows))]
impl MonitorCapture {
    pub fn for_monitor(_rect: MonitorRect) -> Result<Self> {
        Err(anyhow::anyhow!(
            "desktop capture is only implemented for Windows"
        ))
    }

    pub fn monitor_rect(&self) -> MonitorRect {
        MonitorRect::default()
    }
}

#[cfg(not(windows))]
impl ScreenCapture for MonitorCapture {
    fn capture(&mut self) -> Result<RgbaBuffer> {
        Err(anyhow::anyhow!(
            "desktop capture is only implemented for Windows"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_bounds_win_over_enumerated_bounds() {
        let enumerated = MonitorRect {
            x: 0,
            y: 0,
            width: 1536,
            height: 864,
        };
        let captured = MonitorRect {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        };
        assert_eq!(reconcile_capture_bounds(enumerated, captured), captured);
        assert_eq!(reconcile_capture_bounds(captured, captured), captured);
    }

    #[cfg(not(windows))]
    #[test]
    fn capture_is_unavailable_off_windows() {
        assert!(MonitorCapture::for_monitor(MonitorRect::default()).is_err());
        assert!(MonitorCapture.capture().is_err());
    }
}
