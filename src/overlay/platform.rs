//! Seams to the operating system. The engine only talks to these traits; the
//! Windows implementations live in `capture`, `monitor`, `keyboard_hook` and
//! `window`.

use crate::overlay::composite::RgbaBuffer;
use crate::overlay::keyboard_hook::KeyCode;
use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowRect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub handle: isize,
    pub rect: WindowRect,
}

/// Full-resolution snapshot of the overlay's monitor.
pub trait ScreenCapture: Send {
    fn capture(&mut self) -> Result<RgbaBuffer>;
}

pub trait GeometrySource {
    fn cursor_position(&self) -> Option<(i32, i32)>;
    fn foreground_window(&self) -> Option<ForegroundWindow>;
}

/// Polled once per frame for repeat-while-held keys.
pub trait KeyStateSource {
    fn is_pressed(&self, key: KeyCode) -> bool;
}

/// Host surface that shows composed frames. Pixels equal to the key color must
/// be transparent to both display and pointer input.
pub trait DisplaySurface {
    fn handle(&self) -> isize;
    fn present(&mut self, frame: &RgbaBuffer) -> Result<()>;
    /// Service host messages, waiting at most `wait` for the next display slot.
    fn pump(&mut self, wait: Duration);
    fn shutdown(&mut self);
}

impl<T: ScreenCapture + ?Sized> ScreenCapture for Box<T> {
    fn capture(&mut self) -> Result<RgbaBuffer> {
        (**self).capture()
    }
}
