use crate::overlay::focus::FocusRect;
use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Color the windowing layer renders as fully transparent. Nothing else in a
/// composed frame may use it on purpose.
pub const DEFAULT_KEY_COLOR: Rgba = Rgba::rgb(0, 255, 0);
pub const DEFAULT_BORDER_COLOR: Rgba = Rgba::rgb(255, 255, 255);
const KEY_COLOR_SAFE_FALLBACK: Rgba = Rgba::rgb(0, 254, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn same_rgb(self, other: Rgba) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Pick a color that cannot be mistaken for `key`.
    pub fn avoiding_key(self, key: Rgba) -> Self {
        if !self.same_rgb(key) {
            return self;
        }
        if KEY_COLOR_SAFE_FALLBACK.same_rgb(key) {
            DEFAULT_BORDER_COLOR
        } else {
            KEY_COLOR_SAFE_FALLBACK
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk[0] = fill.r;
            chunk[1] = fill.g;
            chunk[2] = fill.b;
            chunk[3] = fill.a;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// All-zero buffer, the dark-mode background.
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(anyhow!(
                "pixel buffer has {} bytes, expected {expected} for {width}x{height}",
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn into_image(self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels)
            .ok_or_else(|| anyhow!("pixel buffer does not match its dimensions"))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        }
    }

    pub fn is_all_zero(&self) -> bool {
        self.pixels.iter().all(|&b| b == 0)
    }

    /// Fill the half-open span `[left, right) x [top, bottom)`, clipped to the
    /// buffer.
    pub fn fill_rect(&mut self, left: i32, top: i32, right: i32, bottom: i32, color: Rgba) {
        let x0 = left.clamp(0, self.width as i32) as usize;
        let x1 = right.clamp(0, self.width as i32) as usize;
        let y0 = top.clamp(0, self.height as i32) as usize;
        let y1 = bottom.clamp(0, self.height as i32) as usize;
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let stride = self.width as usize * 4;
        let px = [color.r, color.g, color.b, color.a];
        for y in y0..y1 {
            let row = &mut self.pixels[y * stride + x0 * 4..y * stride + x1 * 4];
            for chunk in row.chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeStyle {
    pub key_color: Rgba,
    pub border_color: Rgba,
    pub border_width: u32,
}

impl Default for CompositeStyle {
    fn default() -> Self {
        Self {
            key_color: DEFAULT_KEY_COLOR,
            border_color: DEFAULT_BORDER_COLOR,
            border_width: 2,
        }
    }
}

impl CompositeStyle {
    /// Border color with any key color collision resolved.
    pub fn effective_border_color(&self) -> Rgba {
        self.border_color.avoiding_key(self.key_color)
    }
}

/// Blend every pixel toward black by `factor` (0 keeps the image, 1 is black).
pub fn dim_in_place(buffer: &mut RgbaBuffer, factor: f32) {
    let keep = 1.0 - factor.clamp(0.0, 1.0);
    for px in buffer.pixels.chunks_exact_mut(4) {
        px[0] = (px[0] as f32 * keep).round() as u8;
        px[1] = (px[1] as f32 * keep).round() as u8;
        px[2] = (px[2] as f32 * keep).round() as u8;
        px[3] = 255;
    }
}

/// Cheap blur: shrink by `downscale` and stretch back with a triangle filter.
pub fn fast_blur(buffer: RgbaBuffer, downscale: u32) -> Result<RgbaBuffer> {
    let (width, height) = buffer.dimensions();
    if downscale <= 1 || width == 0 || height == 0 {
        return Ok(buffer);
    }

    let image = buffer.into_image()?;
    let small_w = (width / downscale).max(1);
    let small_h = (height / downscale).max(1);
    let small = imageops::resize(&image, small_w, small_h, FilterType::Triangle);
    let restored = imageops::resize(&small, width, height, FilterType::Triangle);
    Ok(RgbaBuffer::from_image(restored))
}

/// Dim then blur a fresh desktop snapshot into a background layer.
pub fn blurred_background(
    snapshot: RgbaBuffer,
    dim_factor: f32,
    downscale: u32,
) -> Result<RgbaBuffer> {
    let mut dimmed = snapshot;
    dim_in_place(&mut dimmed, dim_factor);
    fast_blur(dimmed, downscale)
}

/// Copy the background, punch the key-colored focus hole and outline it.
pub fn compose(background: &RgbaBuffer, rect: FocusRect, style: &CompositeStyle) -> RgbaBuffer {
    let mut frame = background.clone();
    frame.fill_rect(rect.left, rect.top, rect.right, rect.bottom, style.key_color);

    let bw = style.border_width as i32;
    if bw > 0 {
        let border = style.effective_border_color();
        let FocusRect {
            left,
            top,
            right,
            bottom,
        } = rect;
        frame.fill_rect(left, top, right, top + bw, border);
        frame.fill_rect(left, bottom - bw, right, bottom, border);
        frame.fill_rect(left, top, left + bw, bottom, border);
        frame.fill_rect(right - bw, top, right, bottom, border);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> RgbaBuffer {
        RgbaBuffer::new(width, height, Rgba::rgb(100, 100, 100))
    }

    #[test]
    fn compose_fills_hole_with_key_color_and_draws_border() {
        let background = gray(40, 30);
        let rect = FocusRect {
            left: 10,
            top: 5,
            right: 30,
            bottom: 25,
        };

        let frame = compose(&background, rect, &CompositeStyle::default());
        assert_eq!(frame.pixel(20, 15), DEFAULT_KEY_COLOR);
        assert_eq!(frame.pixel(10, 15), DEFAULT_BORDER_COLOR);
        assert_eq!(frame.pixel(11, 15), DEFAULT_BORDER_COLOR);
        assert_eq!(frame.pixel(12, 15), DEFAULT_KEY_COLOR);
        assert_eq!(frame.pixel(29, 15), DEFAULT_BORDER_COLOR);
        assert_eq!(frame.pixel(20, 24), DEFAULT_BORDER_COLOR);
        assert_eq!(frame.pixel(5, 15), Rgba::rgb(100, 100, 100));
        assert_eq!(frame.pixel(30, 15), Rgba::rgb(100, 100, 100));
    }

    #[test]
    fn compose_leaves_background_untouched() {
        let background = gray(8, 8);
        let rect = FocusRect {
            left: 2,
            top: 2,
            right: 6,
            bottom: 6,
        };
        let _ = compose(&background, rect, &CompositeStyle::default());
        assert_eq!(background, gray(8, 8));
    }

    #[test]
    fn compose_clips_rect_partially_off_screen() {
        let background = gray(10, 10);
        let rect = FocusRect {
            left: -50,
            top: -50,
            right: 5,
            bottom: 5,
        };
        let frame = compose(&background, rect, &CompositeStyle::default());
        assert_eq!(frame.pixel(0, 0), DEFAULT_KEY_COLOR);
        assert_eq!(frame.pixel(4, 0), DEFAULT_BORDER_COLOR);
        assert_eq!(frame.pixel(9, 9), Rgba::rgb(100, 100, 100));
    }

    #[test]
    fn rect_entirely_off_screen_is_a_no_op() {
        let background = gray(10, 10);
        let rect = FocusRect {
            left: 100,
            top: 100,
            right: 200,
            bottom: 200,
        };
        assert_eq!(compose(&background, rect, &CompositeStyle::default()), background);
    }

    #[test]
    fn border_color_never_equals_key_color() {
        let style = CompositeStyle {
            key_color: Rgba::rgb(0, 255, 0),
            border_color: Rgba::rgb(0, 255, 0),
            border_width: 2,
        };
        assert!(!style.effective_border_color().same_rgb(style.key_color));

        let style = CompositeStyle {
            key_color: KEY_COLOR_SAFE_FALLBACK,
            border_color: KEY_COLOR_SAFE_FALLBACK,
            border_width: 2,
        };
        assert!(!style.effective_border_color().same_rgb(style.key_color));
    }

    #[test]
    fn dim_blends_toward_black() {
        let mut buffer = RgbaBuffer::new(1, 1, Rgba::rgb(200, 100, 0));
        dim_in_place(&mut buffer, 0.5);
        assert_eq!(buffer.pixel(0, 0), Rgba::rgb(100, 50, 0));
    }

    #[test]
    fn blur_keeps_dimensions_and_flattens_uniform_input() {
        let out = fast_blur(gray(64, 48), 16).expect("blur");
        assert_eq!(out.dimensions(), (64, 48));
        assert_eq!(out.pixel(31, 20), Rgba::rgb(100, 100, 100));
    }

    #[test]
    fn blur_spreads_a_hard_edge() {
        let mut input = RgbaBuffer::new(32, 8, Rgba::BLACK);
        input.fill_rect(16, 0, 32, 8, Rgba::rgb(255, 255, 255));
        let out = fast_blur(input, 8).expect("blur");
        let edge = out.pixel(15, 4);
        assert!(edge.r > 0 && edge.r < 255, "edge should be softened: {edge:?}");
    }

    #[test]
    fn from_pixels_rejects_mismatched_length() {
        assert!(RgbaBuffer::from_pixels(2, 2, vec![0; 15]).is_err());
        assert!(RgbaBuffer::from_pixels(2, 2, vec![0; 16]).is_ok());
    }
}
