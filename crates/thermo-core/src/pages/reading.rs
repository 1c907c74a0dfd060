//! Label plus temperature, the building block of every sensor screen.

use alloc::format;
use alloc::string::ToString;

use embedded_graphics::prelude::Point;

use super::{PADDING, RenderError, line_position};
use crate::config::Config;
use crate::display::{DisplaySink, WHITE};
use crate::sensors::SensorSnapshot;

/// Draw the sensor configured under `key` on rows `start_line` and `start_line + 1`.
pub(super) fn render_sensor_reading<D>(
    display: &mut D,
    snapshot: &SensorSnapshot,
    config: &Config,
    key: &str,
    start_line: u32,
) -> Result<(), RenderError>
where
    D: DisplaySink + ?Sized,
{
    let sensor = config.sensor(key).ok_or_else(|| RenderError::UnknownSensor {
        key: key.to_string(),
    })?;

    let reading = snapshot
        .find(&sensor.bus_id)
        .ok_or_else(|| RenderError::MissingReading {
            bus_id: sensor.bus_id.clone(),
            label: sensor.label.clone(),
        })?;

    display.text(
        &sensor.label,
        Point::new(PADDING, line_position(start_line)),
        WHITE,
    );
    display.text(
        &format!("{:.1} C", reading.temperature),
        Point::new(PADDING, line_position(start_line + 1)),
        WHITE,
    );
    Ok(())
}
