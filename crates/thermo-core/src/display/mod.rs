//! Display sink capability and the palette shared by every screen.
//!
//! The control loop only talks to a [`DisplaySink`]. It never touches the
//! backlight directly; `sleep` and `wake` are the only power operations, so
//! `AppState::awake` always matches the panel state.

mod framebuffer;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

pub use framebuffer::{BufferedDisplay, FrameBuffer, Panel};

pub const DISPLAY_WIDTH_PX: u16 = 320;
pub const DISPLAY_HEIGHT_PX: u16 = 240;

pub const WHITE: Rgb565 = Rgb565::WHITE;
pub const BLACK: Rgb565 = Rgb565::BLACK;
pub const RED: Rgb565 = Rgb565::RED;
/// 0x4208 in RGB565.
pub const DARK_GRAY: Rgb565 = Rgb565::new(8, 16, 8);

pub trait DisplaySink {
    /// Blank the drawing buffer. Nothing reaches the panel until [`present`](Self::present).
    fn clear(&mut self);

    /// Draw a single line of text with its top-left corner at `position`.
    fn text(&mut self, text: &str, position: Point, color: Rgb565);

    /// Draw a 1px line.
    fn line(&mut self, start: Point, end: Point, color: Rgb565);

    /// Push pending drawing to the panel.
    fn present(&mut self);

    /// Clear the panel and power it down.
    fn sleep(&mut self);

    /// Power the panel up and clear it.
    fn wake(&mut self);
}
