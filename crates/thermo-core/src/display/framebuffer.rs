//! RAM framebuffer with dirty-row tracking, and the [`BufferedDisplay`]
//! sink built on it.
//!
//! Every page is laid out in full-width text rows, so the buffer tracks the
//! band of rows touched since the last flush. `present` sends that band as a
//! single contiguous slice of the buffer.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt::Debug;
use core::ops::Range;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_8X13;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use log::{debug, error, info};

use super::{BLACK, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplaySink};

const WIDTH: usize = DISPLAY_WIDTH_PX as usize;
const HEIGHT: usize = DISPLAY_HEIGHT_PX as usize;

/// Inclusive band of changed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRows {
    first: usize,
    last: usize,
}

impl DirtyRows {
    const ALL: Self = Self {
        first: 0,
        last: HEIGHT - 1,
    };

    const fn row(y: usize) -> Self {
        Self { first: y, last: y }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        }
    }

    fn height(self) -> usize {
        self.last - self.first + 1
    }

    /// Panel area covered by the band.
    fn area(self) -> Rectangle {
        Rectangle::new(
            Point::new(0, self.first as i32),
            Size::new(WIDTH as u32, self.height() as u32),
        )
    }

    /// Buffer indices covered by the band.
    fn span(self) -> Range<usize> {
        self.first * WIDTH..(self.last + 1) * WIDTH
    }
}

/// 320x240 RGB565 buffer implementing `DrawTarget`.
pub struct FrameBuffer {
    pixels: Vec<Rgb565>,
    dirty: Option<DirtyRows>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a black framebuffer.
    pub fn new() -> Self {
        Self {
            pixels: vec![BLACK; WIDTH * HEIGHT],
            dirty: None,
        }
    }

    fn mark(&mut self, rows: DirtyRows) {
        self.dirty = Some(self.dirty.map_or(rows, |dirty| dirty.merge(rows)));
    }

    /// Write `color` over `xs` of row `y`, marking the row only if a pixel changed.
    fn fill_row(&mut self, y: usize, xs: Range<usize>, color: Rgb565) {
        let start = y * WIDTH;
        let row = &mut self.pixels[start + xs.start..start + xs.end];
        if row.iter().any(|&p| p != color) {
            row.fill(color);
            self.mark(DirtyRows::row(y));
        }
    }

    /// Colour at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb565> {
        (x < WIDTH && y < HEIGHT).then(|| self.pixels[y * WIDTH + x])
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Mark every row as changed so the next flush resends the whole frame.
    pub fn invalidate(&mut self) {
        self.dirty = Some(DirtyRows::ALL);
    }

    /// Send the changed rows to `display` and reset the dirty state.
    ///
    /// No-op when nothing changed.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(rows) = self.dirty.take() else {
            return Ok(());
        };

        debug!("Flushing rows {}..={}", rows.first, rows.last);
        display.fill_contiguous(&rows.area(), self.pixels[rows.span()].iter().copied())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (Ok(x), Ok(y)) = (usize::try_from(coord.x), usize::try_from(coord.y)) else {
                continue;
            };
            if x < WIDTH && y < HEIGHT {
                self.fill_row(y, x..x + 1, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.bounding_box());
        let Some(bottom_right) = clipped.bottom_right() else {
            return Ok(());
        };

        let xs = clipped.top_left.x as usize..bottom_right.x as usize + 1;
        for y in clipped.top_left.y as usize..=bottom_right.y as usize {
            self.fill_row(y, xs.clone(), color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..HEIGHT {
            self.fill_row(y, 0..WIDTH, color);
        }
        Ok(())
    }
}

/// Hardware panel behind a [`BufferedDisplay`].
pub trait Panel: DrawTarget<Color = Rgb565> {
    /// Switch the panel and its backlight on or off.
    fn set_powered(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// [`DisplaySink`] that draws into a [`FrameBuffer`] and flushes to a [`Panel`].
///
/// Panel faults are logged here and never reach the control loop.
pub struct BufferedDisplay<P> {
    panel: P,
    frame: FrameBuffer,
    powered: bool,
}

impl<P> BufferedDisplay<P>
where
    P: Panel,
    P::Error: Debug,
{
    /// Wrap a panel that is already initialised and powered.
    pub fn new(panel: P) -> Self {
        let mut frame = FrameBuffer::new();
        frame.invalidate();
        Self {
            panel,
            frame,
            powered: true,
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn flush(&mut self) {
        if let Err(e) = self.frame.flush(&mut self.panel) {
            error!("Display flush failed: {:?}", e);
        }
    }

    fn power(&mut self, on: bool) {
        if let Err(e) = self.panel.set_powered(on) {
            error!("Display power {} failed: {:?}", if on { "on" } else { "off" }, e);
        }
        self.powered = on;
    }
}

impl<P> DisplaySink for BufferedDisplay<P>
where
    P: Panel,
    P::Error: Debug,
{
    fn clear(&mut self) {
        let _ = self.frame.clear(BLACK);
    }

    fn text(&mut self, text: &str, position: Point, color: Rgb565) {
        let style = MonoTextStyle::new(&FONT_8X13, color);
        let _ = Text::with_baseline(text, position, style, Baseline::Top).draw(&mut self.frame);
    }

    fn line(&mut self, start: Point, end: Point, color: Rgb565) {
        let _ = Line::new(start, end)
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(&mut self.frame);
    }

    fn present(&mut self) {
        if !self.powered {
            debug!("Present skipped, panel is off");
            return;
        }
        self.flush();
    }

    fn sleep(&mut self) {
        self.clear();
        self.flush();
        self.power(false);
        info!("Display off");
    }

    fn wake(&mut self) {
        self.power(true);
        self.clear();
        self.frame.invalidate();
        self.flush();
        info!("Display on");
    }
}
