use crate::overlay::platform::{ForegroundWindow, GeometrySource, WindowRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl MonitorRect {
    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

pub fn monitor_contains_point(rect: MonitorRect, point: (i32, i32)) -> bool {
    point.0 >= rect.x
        && point.0 < rect.x + rect.width
        && point.1 >= rect.y
        && point.1 < rect.y + rect.height
}

pub fn select_monitor_for_point(
    monitors: &[MonitorRect],
    point: (i32, i32),
) -> Option<MonitorRect> {
    monitors
        .iter()
        .copied()
        .find(|rect| monitor_contains_point(*rect, point))
}

pub fn global_to_local(point: (i32, i32), origin: (i32, i32)) -> (i32, i32) {
    (point.0 - origin.0, point.1 - origin.1)
}

/// The primary monitor is the one that contains the desktop origin.
pub fn resolve_primary_monitor() -> Option<MonitorRect> {
    #[cfg(windows)]
    {
        let monitors = platform::enumerate_monitors();
        select_monitor_for_point(&monitors, (0, 0)).or_else(|| monitors.first().copied())
    }

    #[cfg(not(windows))]
    {
        None
    }
}

/// Live pointer and foreground-window queries against the desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopGeometry;

impl GeometrySource for DesktopGeometry {
    fn cursor_position(&self) -> Option<(i32, i32)> {
        #[cfg(windows)]
        {
            platform::resolve_cursor_position()
        }
        #[cfg(not(windows))]
        {
            None
        }
    }

    fn foreground_window(&self) -> Option<ForegroundWindow> {
        #[cfg(windows)]
        {
            platform::resolve_foreground_window()
        }
        #[cfg(not(windows))]
        {
            None
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::MonitorRect;
    use crate::overlay::platform::{ForegroundWindow, WindowRect};
    use std::mem;
    use windows::Win32::Foundation::{BOOL, LPARAM, POINT, RECT};
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFOEXW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetCursorPos, GetForegroundWindow, GetWindowRect,
    };

    pub(super) fn resolve_cursor_position() -> Option<(i32, i32)> {
        let mut point = POINT::default();
        if unsafe { GetCursorPos(&mut point) }.is_ok() {
            Some((point.x, point.y))
        } else {
            None
        }
    }

    pub(super) fn resolve_foreground_window() -> Option<ForegroundWindow> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() {
            return None;
        }
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }.ok()?;
        Some(ForegroundWindow {
            handle: hwnd.0 as isize,
            rect: WindowRect {
                left: rect.left,
                top: rect.top,
                right: rect.right,
                bottom: rect.bottom,
            },
        })
    }

    pub(super) fn enumerate_monitors() -> Vec<MonitorRect> {
        extern "system" fn monitor_enum_proc(
            monitor: HMONITOR,
            _hdc: HDC,
            _rc_clip: *mut RECT,
            data: LPARAM,
        ) -> BOOL {
            let monitors = unsafe { &mut *(data.0 as *mut Vec<MonitorRect>) };
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;
            if unsafe { GetMonitorInfoW(monitor, &mut info.monitorInfo as *mut _ as *mut _) }
                .as_bool()
            {
                let rc = info.monitorInfo.rcMonitor;
                monitors.push(MonitorRect {
                    x: rc.left,
                    y: rc.top,
                    width: rc.right - rc.left,
                    height: rc.bottom - rc.top,
                });
            }
            BOOL(1)
        }

        let mut monitors = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(monitor_enum_proc),
                LPARAM(&mut monitors as *mut Vec<MonitorRect> as isize),
            );
        }
        monitors
    }
}

impl From<MonitorRect> for WindowRect {
    fn from(rect: MonitorRect) -> Self {
        Self {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width,
            bottom: rect.y + rect.height,
        }
    }
}
