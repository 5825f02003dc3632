use crate::overlay::composite::{Rgba, RgbaBuffer};
#[cfg(not(windows))]
use crate::overlay::monitor::MonitorRect;
use crate::overlay::platform::DisplaySurface;
use anyhow::Result;
use std::time::Duration;

pub const WINDOW_TITLE: &str = "Focus Overlay - double press 'q' to quit";

/// Copy an RGBA frame into a top-down BGRA DIB of `dst_width` x `dst_height`,
/// clipping whatever does not overlap.
pub fn copy_rgba_into_bgra(frame: &RgbaBuffer, dst: &mut [u8], dst_width: u32, dst_height: u32) {
    let width = frame.width.min(dst_width) as usize;
    let height = frame.height.min(dst_height) as usize;
    let src_stride = frame.width as usize * 4;
    let dst_stride = dst_width as usize * 4;

    for y in 0..height {
        let src_row = &frame.pixels[y * src_stride..y * src_stride + width * 4];
        let dst_row = &mut dst[y * dst_stride..y * dst_stride + width * 4];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            d[0] = s[2];
            d[1] = s[1];
            d[2] = s[0];
            d[3] = 255;
        }
    }
}

/// `COLORREF` layout (`0x00bbggrr`) for a key color.
pub fn colorref_for(color: Rgba) -> u32 {
    (color.r as u32) | ((color.g as u32) << 8) | ((color.b as u32) << 16)
}

#[cfg(windows)]
mod platform {
    use super::{colorref_for, copy_rgba_into_bgra, WINDOW_TITLE};
    use crate::overlay::composite::{Rgba, RgbaBuffer};
    use crate::overlay::monitor::MonitorRect;
    use anyhow::{anyhow, Result};
    use std::mem;
    use std::ptr;
    use std::sync::Once;
    use std::time::Duration;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, EndPaint,
        InvalidateRect, SelectObject, UpdateWindow, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, PAINTSTRUCT, SRCCOPY,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetWindowLongPtrW,
        PeekMessageW, RegisterClassW, SetLayeredWindowAttributes, SetWindowDisplayAffinity,
        SetWindowLongPtrW, SetWindowPos, TranslateMessage, GWLP_USERDATA, HWND_TOPMOST,
        LWA_COLORKEY, MSG, PM_REMOVE, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_SHOWWINDOW,
        WDA_EXCLUDEFROMCAPTURE, WINDOW_EX_STYLE, WINDOW_STYLE, WM_ERASEBKGND, WM_PAINT, WNDCLASSW,
        WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
    };

    /// Layered and topmost, but not `WS_EX_TRANSPARENT`: the dimmed area blocks
    /// clicks while the key-colored hole lets them through.
    pub fn compose_overlay_window_ex_style() -> WINDOW_EX_STYLE {
        WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE
    }

    fn widestring(value: &str) -> Vec<u16> {
        use std::os::windows::ffi::OsStrExt;
        std::ffi::OsStr::new(value)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    unsafe extern "system" fn overlay_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_ERASEBKGND => LRESULT(1),
            WM_PAINT => {
                let mut ps = PAINTSTRUCT::default();
                let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
                if !hdc.0.is_null() {
                    let mem_dc = HDC(unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut _);
                    if !mem_dc.0.is_null() {
                        let width = ps.rcPaint.right - ps.rcPaint.left;
                        let height = ps.rcPaint.bottom - ps.rcPaint.top;
                        let _ = unsafe {
                            BitBlt(
                                hdc,
                                ps.rcPaint.left,
                                ps.rcPaint.top,
                                width,
                                height,
                                mem_dc,
                                ps.rcPaint.left,
                                ps.rcPaint.top,
                                SRCCOPY,
                            )
                        };
                    }
                }
                unsafe {
                    let _ = EndPaint(hwnd, &ps);
                }
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    #[derive(Debug)]
    pub struct OverlayWindow {
        hwnd: HWND,
        mem_dc: HDC,
        dib: HBITMAP,
        old_bitmap: HGDIOBJ,
        bits: *mut u8,
        size_bytes: usize,
        monitor_rect: MonitorRect,
        shown: bool,
    }

    impl OverlayWindow {
        pub fn create_for_monitor(monitor_rect: MonitorRect, key_color: Rgba) -> Result<Self> {
            static REGISTER_CLASS: Once = Once::new();
            let class_name = widestring("FocusOverlayWindow");
            let title = widestring(WINDOW_TITLE);
            let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }?;

            REGISTER_CLASS.call_once(|| unsafe {
                let wc = WNDCLASSW {
                    hInstance: hinstance.into(),
                    lpszClassName: PCWSTR(class_name.as_ptr()),
                    lpfnWndProc: Some(overlay_wndproc),
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
            });

            let hwnd = unsafe {
                CreateWindowExW(
                    compose_overlay_window_ex_style(),
                    PCWSTR(class_name.as_ptr()),
                    PCWSTR(title.as_ptr()),
                    WINDOW_STYLE(WS_POPUP.0),
                    monitor_rect.x,
                    monitor_rect.y,
                    monitor_rect.width,
                    monitor_rect.height,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|err| anyhow!("failed to create overlay window: {err}"))?;

            if let Err(err) =
                unsafe { SetLayeredWindowAttributes(hwnd, COLORREF(colorref_for(key_color)), 0, LWA_COLORKEY) }
            {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
                return Err(anyhow!("failed to apply overlay color key: {err}"));
            }

            // Keeps the capture worker from photographing the overlay itself.
            if let Err(err) = unsafe { SetWindowDisplayAffinity(hwnd, WDA_EXCLUDEFROMCAPTURE) } {
                tracing::warn!(?err, "could not exclude overlay from screen capture");
            }

            let mem_dc = unsafe { CreateCompatibleDC(HDC::default()) };
            if mem_dc.0.is_null() {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
                return Err(anyhow!("CreateCompatibleDC failed for overlay window"));
            }

            let mut bmi = BITMAPINFO::default();
            bmi.bmiHeader = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: monitor_rect.width,
                biHeight: -monitor_rect.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };

            let mut bits: *mut core::ffi::c_void = ptr::null_mut();
            let dib = match unsafe {
                CreateDIBSection(
                    mem_dc,
                    &bmi,
                    DIB_RGB_COLORS,
                    &mut bits,
                    windows::Win32::Foundation::HANDLE::default(),
                    0,
                )
            } {
                Ok(dib) if !bits.is_null() => dib,
                _ => {
                    unsafe {
                        let _ = DeleteDC(mem_dc);
                        let _ = DestroyWindow(hwnd);
                    }
                    return Err(anyhow!("CreateDIBSection failed for overlay window"));
                }
            };

            let old_bitmap = unsafe { SelectObject(mem_dc, dib) };
            unsafe {
                let _ = SetWindowLongPtrW(hwnd, GWLP_USERDATA, mem_dc.0 as isize);
            }

            let size_bytes = (monitor_rect.width as usize)
                .saturating_mul(monitor_rect.height as usize)
                .saturating_mul(4);

            // Stays hidden until the first frame is presented.
            Ok(Self {
                hwnd,
                mem_dc,
                dib,
                old_bitmap,
                bits: bits as *mut u8,
                size_bytes,
                monitor_rect,
                shown: false,
            })
        }

        pub fn hwnd_value(&self) -> isize {
            self.hwnd.0 as isize
        }

        pub fn show(&self) {
            unsafe {
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND_TOPMOST,
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW,
                );
            }
        }

        pub fn present_frame(&mut self, frame: &RgbaBuffer) -> Result<()> {
            if self.bits.is_null() || self.size_bytes == 0 {
                return Err(anyhow!("overlay window has no backing bitmap"));
            }
            let pixels = unsafe { std::slice::from_raw_parts_mut(self.bits, self.size_bytes) };
            copy_rgba_into_bgra(
                frame,
                pixels,
                self.monitor_rect.width as u32,
                self.monitor_rect.height as u32,
            );
            if !self.shown {
                self.show();
                self.shown = true;
            }
            unsafe {
                let _ = InvalidateRect(self.hwnd, None, false);
                let _ = UpdateWindow(self.hwnd);
            }
            Ok(())
        }

        pub fn pump(&mut self, wait: Duration) {
            pump_overlay_messages();
            std::thread::sleep(wait);
        }

        pub fn shutdown(&mut self) {
            unsafe {
                if !self.mem_dc.0.is_null() {
                    let _ = SelectObject(self.mem_dc, self.old_bitmap);
                }
                if !self.dib.0.is_null() {
                    let _ = DeleteObject(self.dib);
                    self.dib = HBITMAP::default();
                }
                if !self.mem_dc.0.is_null() {
                    let _ = DeleteDC(self.mem_dc);
                    self.mem_dc = HDC::default();
                }
                if !self.hwnd.0.is_null() {
                    let _ = SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
                    let _ = DestroyWindow(self.hwnd);
                    self.hwnd = HWND::default();
                }
                self.bits = ptr::null_mut();
                self.size_bytes = 0;
            }
        }
    }

    impl Drop for OverlayWindow {
        fn drop(&mut self) {
            self.shutdown();
        }
    }

    fn pump_overlay_messages() {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            }
        }
    }

    #[cfg(test)]
    mod windows_tests {
        use super::compose_overlay_window_ex_style;
        use windows::Win32::UI::WindowsAndMessaging::{
            WS_EX_LAYERED, WS_EX_TOPMOST, WS_EX_TRANSPARENT,
        };

        #[test]
        fn style_flags_include_topmost_layered_but_no_clickthrough() {
            let style = compose_overlay_window_ex_style();
            assert_ne!(style.0 & WS_EX_LAYERED.0, 0);
            assert_ne!(style.0 & WS_EX_TOPMOST.0, 0);
            assert_eq!(style.0 & WS_EX_TRANSPARENT.0, 0);
        }
    }
}

#[cfg(windows)]
pub use platform::OverlayWindow;

#[cfg(not(windows))]
#[derive(Debug)]
pub struct OverlayWindow(());

#[cfg(not(windows))]
impl OverlayWindow {
    pub fn create_for_monitor(_monitor_rect: MonitorRect, _key_color: Rgba) -> Result<Self> {
        Err(anyhow::anyhow!(
            "the overlay window is only implemented for Windows"
        ))
    }

    pub fn hwnd_value(&self) -> isize {
        0
    }

    pub fn present_frame(&mut self, _frame: &RgbaBuffer) -> Result<()> {
        Ok(())
    }

    pub fn pump(&mut self, wait: Duration) {
        std::thread::sleep(wait);
    }

    pub fn shutdown(&mut self) {}
}

impl DisplaySurface for OverlayWindow {
    fn handle(&self) -> isize {
        self.hwnd_value()
    }

    fn present(&mut self, frame: &RgbaBuffer) -> Result<()> {
        self.present_frame(frame)
    }

    fn pump(&mut self, wait: Duration) {
        OverlayWindow::pump(self, wait);
    }

    fn shutdown(&mut self) {
        OverlayWindow::shutdown(self);
    }
}
