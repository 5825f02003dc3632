use crate::overlay::composite::{blurred_background, RgbaBuffer};
use crate::overlay::platform::ScreenCapture;
use crate::settings::Settings;
use anyhow::{anyhow, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_millis(300);

/// Latest published background layer. Readers get a whole `Arc`; the lock is
/// only held for the swap.
#[derive(Debug)]
pub struct BackgroundSlot {
    latest: Mutex<Arc<RgbaBuffer>>,
}

impl BackgroundSlot {
    pub fn new(initial: RgbaBuffer) -> Self {
        Self {
            latest: Mutex::new(Arc::new(initial)),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Arc<RgbaBuffer>> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn publish(&self, layer: RgbaBuffer) {
        let layer = Arc::new(layer);
        *self.guard() = layer;
    }

    pub fn latest(&self) -> Arc<RgbaBuffer> {
        self.guard().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundStyle {
    pub dim_factor: f32,
    pub blur_downscale: u32,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            dim_factor: 0.35,
            blur_downscale: 16,
        }
    }
}

impl From<&Settings> for BackgroundStyle {
    fn from(settings: &Settings) -> Self {
        Self {
            dim_factor: settings.dim_factor,
            blur_downscale: settings.blur_downscale,
        }
    }
}

/// Turn a snapshot into the layer shown behind the focus hole.
pub fn build_background(
    snapshot: RgbaBuffer,
    dark_mode: bool,
    style: BackgroundStyle,
) -> Result<RgbaBuffer> {
    if dark_mode {
        return Ok(RgbaBuffer::zeroed(snapshot.width, snapshot.height));
    }
    blurred_background(snapshot, style.dim_factor, style.blur_downscale)
}

/// One capture-and-publish step, separated from the thread so it can be driven
/// directly.
pub struct CaptureJob<C: ScreenCapture> {
    capture: C,
    style: BackgroundStyle,
    // Relaxed: a stale read only delays the switch by one cycle.
    dark_mode: Arc<AtomicBool>,
    slot: Arc<BackgroundSlot>,
}

impl<C: ScreenCapture> CaptureJob<C> {
    pub fn new(
        capture: C,
        style: BackgroundStyle,
        dark_mode: Arc<AtomicBool>,
        slot: Arc<BackgroundSlot>,
    ) -> Self {
        Self {
            capture,
            style,
            dark_mode,
            slot,
        }
    }

    fn produce(&mut self) -> Result<RgbaBuffer> {
        let snapshot = self.capture.capture()?;
        build_background(
            snapshot,
            self.dark_mode.load(Ordering::Relaxed),
            self.style,
        )
    }

    /// Returns true when a new layer was published. Failures and panics leave
    /// the previous layer in place.
    pub fn run_iteration(&mut self) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| self.produce())) {
            Ok(Ok(layer)) => {
                self.slot.publish(layer);
                true
            }
            Ok(Err(err)) => {
                tracing::warn!(?err, "background capture failed, keeping previous layer");
                false
            }
            Err(panic_payload) => {
                let panic_message = if let Some(message) = panic_payload.downcast_ref::<&str>() {
                    (*message).to_string()
                } else if let Some(message) = panic_payload.downcast_ref::<String>() {
                    message.clone()
                } else {
                    "unknown panic payload".to_string()
                };
                tracing::error!(panic_message, "background capture panicked");
                false
            }
        }
    }
}

/// Background thread that refreshes the shared layer on its own schedule.
pub struct CaptureWorker {
    running: Arc<AtomicBool>,
    dark_mode: Arc<AtomicBool>,
    slot: Arc<BackgroundSlot>,
    wake_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn<C>(
        capture: C,
        style: BackgroundStyle,
        interval: Duration,
        dark_mode: bool,
        slot: Arc<BackgroundSlot>,
    ) -> Result<Self>
    where
        C: ScreenCapture + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let dark_mode = Arc::new(AtomicBool::new(dark_mode));
        let (wake_tx, wake_rx) = channel::<()>();

        let job = CaptureJob::new(capture, style, dark_mode.clone(), slot.clone());
        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name("overlay-capture".to_string())
            .spawn(move || capture_loop(job, thread_running, wake_rx, interval))
            .map_err(|err| anyhow!("failed to spawn capture worker thread: {err}"))?;

        tracing::debug!(?interval, "capture worker started");
        Ok(Self {
            running,
            dark_mode,
            slot,
            wake_tx,
            handle: Some(handle),
        })
    }

    pub fn set_dark_mode(&self, enabled: bool) {
        self.dark_mode.store(enabled, Ordering::Relaxed);
    }

    /// Cut the current wait short so the next capture happens now.
    pub fn request_refresh(&self) {
        let _ = self.wake_tx.send(());
    }

    pub fn slot(&self) -> &Arc<BackgroundSlot> {
        &self.slot
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop after the current iteration and join the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.wake_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("capture worker thread panicked while joining");
            }
            tracing::debug!("capture worker stopped");
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop<C: ScreenCapture>(
    mut job: CaptureJob<C>,
    running: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
    interval: Duration,
) {
    while running.load(Ordering::SeqCst) {
        job.run_iteration();

        match wake_rx.recv_timeout(interval) {
            Ok(()) => {
                // Collapse a burst of refresh requests into one capture.
                while wake_rx.try_recv().is_ok() {}
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
