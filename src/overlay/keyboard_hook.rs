use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Q,
    W,
    Z,
    R,
    BracketLeft,
    BracketRight,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub key: KeyCode,
    pub pressed: bool,
    /// Monotonic time since the hook was installed.
    pub timestamp: Duration,
}

pub type KeyEventSink = Arc<dyn Fn(RawKeyEvent) + Send + Sync>;

/// Global keyboard subscription. Events are delivered on the hook thread, not
/// the caller's.
#[derive(Default)]
pub struct KeyboardHook {
    active: bool,
    #[cfg(windows)]
    backend: platform::KeyboardHookBackend,
}

impl KeyboardHook {
    pub fn activate(&mut self, sink: KeyEventSink) -> Result<()> {
        if self.active {
            return Ok(());
        }

        #[cfg(windows)]
        self.backend.install(sink)?;
        #[cfg(not(windows))]
        drop(sink);

        self.active = true;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }

        #[cfg(windows)]
        if let Err(err) = self.backend.uninstall() {
            tracing::warn!(?err, "failed to uninstall overlay keyboard hook");
        }

        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        #[cfg(windows)]
        {
            self.active && self.backend.is_installed()
        }
        #[cfg(not(windows))]
        {
            self.active
        }
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Held-key polling through `GetAsyncKeyState`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncKeyState;

impl crate::overlay::platform::KeyStateSource for AsyncKeyState {
    fn is_pressed(&self, key: KeyCode) -> bool {
        #[cfg(windows)]
        {
            platform::is_key_down(key)
        }
        #[cfg(not(windows))]
        {
            let _ = key;
            false
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::{KeyCode, KeyEventSink, RawKeyEvent};
    use anyhow::{anyhow, Result};
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        GetAsyncKeyState, VIRTUAL_KEY, VK_OEM_4, VK_OEM_6, VK_Q, VK_R, VK_W, VK_Z,
    };

    struct HookSink {
        started: Instant,
        sink: KeyEventSink,
    }

    static KEY_EVENT_SINK: Lazy<Mutex<Option<HookSink>>> = Lazy::new(|| Mutex::new(None));

    struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    #[derive(Default)]
    pub struct KeyboardHookBackend {
        hook_thread: Option<HookThread>,
    }

    impl KeyboardHookBackend {
        pub fn install(&mut self, sink: KeyEventSink) -> Result<()> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            if let Ok(mut guard) = KEY_EVENT_SINK.lock() {
                *guard = Some(HookSink {
                    started: Instant::now(),
                    sink,
                });
            }

            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
                UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_KEYBOARD_LL,
            };

            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<u32>>(1);

            let join = std::thread::Builder::new()
                .name("overlay-keyboard-hook".to_string())
                .spawn(move || {
                    let mut msg = MSG::default();
                    unsafe {
                        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                    }

                    let thread_id = unsafe { GetCurrentThreadId() };
                    let hmodule = match unsafe { GetModuleHandleW(None) } {
                        Ok(h) => h,
                        Err(err) => {
                            let _ = ready_tx.send(Err(anyhow!(err)));
                            return;
                        }
                    };

                    let keyboard_hook = match unsafe {
                        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            let _ =
                                ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                            return;
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(anyhow!(err)));
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok(thread_id));

                    loop {
                        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                        if r.0 <= 0 {
                            break;
                        }
                        unsafe {
                            let _ = TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    unsafe {
                        let _ = UnhookWindowsHookEx(keyboard_hook);
                    }
                })
                .map_err(|err| anyhow!("failed to spawn keyboard hook thread: {err}"))?;

            let thread_id = ready_rx
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| anyhow!("keyboard hook thread did not signal readiness"))??;

            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }

        pub fn uninstall(&mut self) -> Result<()> {
            if let Ok(mut guard) = KEY_EVENT_SINK.lock() {
                *guard = None;
            }

            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::Foundation::{LPARAM, WPARAM};
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                th.join
                    .join()
                    .map_err(|_| anyhow!("keyboard hook thread panicked"))?;
            }
            Ok(())
        }

        pub fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    fn virtual_key(key: KeyCode) -> Option<VIRTUAL_KEY> {
        match key {
            KeyCode::Q => Some(VK_Q),
            KeyCode::W => Some(VK_W),
            KeyCode::Z => Some(VK_Z),
            KeyCode::R => Some(VK_R),
            KeyCode::BracketLeft => Some(VK_OEM_4),
            KeyCode::BracketRight => Some(VK_OEM_6),
            KeyCode::Other => None,
        }
    }

    fn map_vk_to_keycode(vk_code: u32) -> KeyCode {
        [
            KeyCode::Q,
            KeyCode::W,
            KeyCode::Z,
            KeyCode::R,
            KeyCode::BracketLeft,
            KeyCode::BracketRight,
        ]
        .into_iter()
        .find(|key| virtual_key(*key).is_some_and(|vk| vk.0 as u32 == vk_code))
        .unwrap_or(KeyCode::Other)
    }

    pub fn is_key_down(key: KeyCode) -> bool {
        virtual_key(key).is_some_and(|vk| unsafe { GetAsyncKeyState(vk.0 as i32) } < 0)
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: windows::Win32::Foundation::WPARAM,
        l_param: windows::Win32::Foundation::LPARAM,
    ) -> windows::Win32::Foundation::LRESULT {
        use windows::Win32::UI::WindowsAndMessaging::{
            CallNextHookEx, HC_ACTION, KBDLLHOOKSTRUCT, WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN,
            WM_SYSKEYUP,
        };

        if n_code == HC_ACTION as i32 {
            let msg = w_param.0 as u32;
            let pressed = match msg {
                WM_KEYDOWN | WM_SYSKEYDOWN => Some(true),
                WM_KEYUP | WM_SYSKEYUP => Some(false),
                _ => None,
            };
            if let Some(pressed) = pressed {
                let info = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
                let key = map_vk_to_keycode(info.vkCode);
                if key != KeyCode::Other {
                    if let Ok(guard) = KEY_EVENT_SINK.lock() {
                        if let Some(hook) = guard.as_ref() {
                            (hook.sink)(RawKeyEvent {
                                key,
                                pressed,
                                timestamp: hook.started.elapsed(),
                            });
                        }
                    }
                }
            }
        }

        CallNextHookEx(
            windows::Win32::UI::WindowsAndMessaging::HHOOK(std::ptr::null_mut()),
            n_code,
            w_param,
            l_param,
        )
    }
}
