// Core pixel types shared by the surface, the media decoder and the manager.

use image::RgbaImage;

#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // pixels across
    pub height: usize,     // pixels down
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A buffer of `width * height` pixels all set to `color`.
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    /// Pack an RGBA image into 0x00RRGGBB pixels (alpha is dropped).
    pub fn from_rgba(img: &RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        let mut out = Vec::with_capacity((w as usize) * (h as usize));
        for pixel in img.pixels() {
            let r = pixel[0] as u32;
            let g = pixel[1] as u32;
            let b = pixel[2] as u32;
            out.push((r << 16) | (g << 8) | b);
        }
        Self { width: w as usize, height: h as usize, pixels: out }
    }

    /// Pixel at (x, y), or None outside the buffer.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }
}

/// Axis-aligned rectangle in pixel coordinates. Origin may be negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }

    /// Square with its top-left corner at (x, y); fractional coordinates floor.
    pub fn square_at(x: f32, y: f32, size: usize) -> Self {
        Self::new(x.floor() as i32, y.floor() as i32, size, size)
    }
}
