// Software drawing surface the manager renders into.
// The host presents it (see window.rs); tests inspect the pixels directly.

use crate::types::{FrameBuffer, Rect};

/// A 2D drawable region with fixed pixel dimensions.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Reset every pixel to black (0x00000000).
    fn clear(&mut self);

    /// Paint every pixel with `color` (0x00RRGGBB).
    fn fill(&mut self, color: u32);

    /// Copy `src_rect` of `src` into `dst_rect` of this surface.
    /// Sizes may differ (nearest-neighbour). Pixels falling outside either
    /// buffer are skipped.
    fn blit(&mut self, src: &FrameBuffer, src_rect: Rect, dst_rect: Rect);
}

impl Surface for FrameBuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    fn blit(&mut self, src: &FrameBuffer, src_rect: Rect, dst_rect: Rect) {
        if dst_rect.w == 0 || dst_rect.h == 0 || src_rect.w == 0 || src_rect.h == 0 {
            return;
        }

        // Edges are computed in i64: a rect parked near i32::MAX must clip
        // away, not overflow.
        let (dst_x, dst_y) = (dst_rect.x as i64, dst_rect.y as i64);
        let (src_x, src_y) = (src_rect.x as i64, src_rect.y as i64);

        // Clip the destination rectangle against this buffer first.
        let x0 = dst_x.max(0);
        let y0 = dst_y.max(0);
        let x1 = (dst_x + dst_rect.w as i64).min(self.width as i64);
        let y1 = (dst_y + dst_rect.h as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for dy in y0..y1 {
            // Offset inside the destination rect, scaled back into the source rect.
            let oy = (dy - dst_y) as usize;
            let sy = src_y + (oy * src_rect.h / dst_rect.h) as i64;
            if sy < 0 || sy >= src.height as i64 {
                continue;
            }
            let src_row = sy as usize * src.width;
            let dst_row = dy as usize * self.width;

            for dx in x0..x1 {
                let ox = (dx - dst_x) as usize;
                let sx = src_x + (ox * src_rect.w / dst_rect.w) as i64;
                if sx < 0 || sx >= src.width as i64 {
                    continue;
                }
                self.pixels[dst_row + dx as usize] = src.pixels[src_row + sx as usize];
            }
        }
    }
}
