//! ILI9342C panel on SPI2 plus its GPIO backlight.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::Blocking;
use esp_hal::gpio::Output;
use esp_hal::spi::master::Spi;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9342CRgb565;
use mipidsi::{Display, NoResetPin};
use thermo_core::display::Panel;

pub type LcdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;
pub type LcdInterface = SpiInterface<'static, LcdSpi, Output<'static>>;
pub type LcdDisplay = Display<LcdInterface, ILI9342CRgb565, NoResetPin>;

type LcdError = <LcdDisplay as DrawTarget>::Error;

/// Panel power follows the backlight: off means backlight low and the
/// controller in sleep mode.
pub struct LcdPanel {
    display: LcdDisplay,
    backlight: Output<'static>,
}

impl LcdPanel {
    /// Wrap an initialised display and switch the backlight on.
    pub fn new(display: LcdDisplay, mut backlight: Output<'static>) -> Self {
        backlight.set_high();
        Self { display, backlight }
    }
}

impl OriginDimensions for LcdPanel {
    fn size(&self) -> Size {
        self.display.size()
    }
}

impl DrawTarget for LcdPanel {
    type Color = Rgb565;
    type Error = LcdError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.display.draw_iter(pixels)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.display.fill_contiguous(area, colors)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.display.fill_solid(area, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.display.clear(color)
    }
}

impl Panel for LcdPanel {
    fn set_powered(&mut self, on: bool) -> Result<(), Self::Error> {
        let mut delay = embassy_time::Delay;
        if on {
            self.display.wake(&mut delay)?;
            self.backlight.set_high();
        } else {
            self.backlight.set_low();
            self.display.sleep(&mut delay)?;
        }
        Ok(())
    }
}
