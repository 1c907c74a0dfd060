use embedded_graphics::prelude::Point;

use super::reading::render_sensor_reading;
use super::{LINE_HEIGHT, RenderError, line_position};
use crate::config::Config;
use crate::display::{DARK_GRAY, DISPLAY_WIDTH_PX, DisplaySink};
use crate::sensors::SensorSnapshot;

fn separator<D: DisplaySink + ?Sized>(display: &mut D, line: u32) {
    let y = line_position(line) + LINE_HEIGHT / 2;
    display.line(Point::new(0, y), Point::new(DISPLAY_WIDTH_PX as i32, y), DARK_GRAY);
}

/// Three sensors stacked, separated by dark grey rules.
pub(super) fn render_home<D>(
    display: &mut D,
    snapshot: &SensorSnapshot,
    config: &Config,
) -> Result<(), RenderError>
where
    D: DisplaySink + ?Sized,
{
    render_sensor_reading(display, snapshot, config, "temp_1", 1)?;
    separator(display, 3);
    render_sensor_reading(display, snapshot, config, "temp_2", 4)?;
    separator(display, 6);
    render_sensor_reading(display, snapshot, config, "temp_3", 7)
}
