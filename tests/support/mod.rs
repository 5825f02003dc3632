#![allow(dead_code)]

use anyhow::{bail, Result};
use focus_overlay::overlay::composite::{Rgba, RgbaBuffer};
use focus_overlay::overlay::keyboard_hook::KeyCode;
use focus_overlay::overlay::platform::{
    DisplaySurface, ForegroundWindow, GeometrySource, KeyStateSource, ScreenCapture, WindowRect,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const SURFACE_HANDLE: isize = 99;
pub const CAPTURE_SIZE: u32 = 256;

#[derive(Clone, Default)]
pub struct FakeCapture {
    pub calls: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl ScreenCapture for FakeCapture {
    fn capture(&mut self) -> Result<RgbaBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("simulated capture failure");
        }
        Ok(RgbaBuffer::new(
            CAPTURE_SIZE,
            CAPTURE_SIZE,
            Rgba::rgb(180, 120, 60),
        ))
    }
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub presented: Arc<AtomicUsize>,
    pub last_frame: Arc<Mutex<Option<RgbaBuffer>>>,
    pub shut_down: Arc<AtomicBool>,
}

impl RecordingSurface {
    pub fn last_frame(&self) -> RgbaBuffer {
        self.last_frame
            .lock()
            .unwrap()
            .clone()
            .expect("a frame was presented")
    }
}

impl DisplaySurface for RecordingSurface {
    fn handle(&self) -> isize {
        SURFACE_HANDLE
    }

    fn present(&mut self, frame: &RgbaBuffer) -> Result<()> {
        self.presented.fetch_add(1, Ordering::SeqCst);
        *self.last_frame.lock().unwrap() = Some(frame.clone());
        Ok(())
    }

    fn pump(&mut self, _wait: Duration) {}

    fn shutdown(&mut self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct SharedGeometry {
    pub cursor: Arc<Mutex<Option<(i32, i32)>>>,
    pub window: Arc<Mutex<Option<ForegroundWindow>>>,
}

impl SharedGeometry {
    pub fn set_cursor(&self, point: (i32, i32)) {
        *self.cursor.lock().unwrap() = Some(point);
    }

    pub fn set_window(&self, handle: isize, left: i32, top: i32, right: i32, bottom: i32) {
        *self.window.lock().unwrap() = Some(ForegroundWindow {
            handle,
            rect: WindowRect {
                left,
                top,
                right,
                bottom,
            },
        });
    }

    pub fn clear_window(&self) {
        *self.window.lock().unwrap() = None;
    }
}

impl GeometrySource for SharedGeometry {
    fn cursor_position(&self) -> Option<(i32, i32)> {
        *self.cursor.lock().unwrap()
    }

    fn foreground_window(&self) -> Option<ForegroundWindow> {
        *self.window.lock().unwrap()
    }
}

#[derive(Clone, Default)]
pub struct SharedKeys(pub Arc<Mutex<HashSet<KeyCode>>>);

impl SharedKeys {
    pub fn hold(&self, key: KeyCode) {
        self.0.lock().unwrap().insert(key);
    }

    pub fn release(&self, key: KeyCode) {
        self.0.lock().unwrap().remove(&key);
    }
}

impl KeyStateSource for SharedKeys {
    fn is_pressed(&self, key: KeyCode) -> bool {
        self.0.lock().unwrap().contains(&key)
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
