// The host window: shows the manager's surface and reports the pointer.

use crate::config::WindowConfig;
use crate::error::Error;
use crate::types::FrameBuffer;
use minifb::{Key, MouseMode, Window, WindowOptions};

pub struct CanvasWindow {
    window: Window,
}

impl CanvasWindow {
    /// Open a window of the configured size, paced to `target_fps`.
    pub fn new(config: &WindowConfig) -> Result<Self, Error> {
        let mut window = Window::new(&config.title, config.width, config.height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(config.target_fps);
        Ok(Self { window })
    }

    /// Push this frame's pixels to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// False once the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Pointer position in canvas pixels; None while it is outside the window.
    pub fn pointer_pos(&self) -> Option<(f32, f32)> {
        self.window.get_mouse_pos(MouseMode::Discard)
    }
}
