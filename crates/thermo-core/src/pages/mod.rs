//! Screens and the renderers that draw them.
//!
//! [`render`] dispatches on [`Screen`] with an exhaustive match, so every
//! screen is guaranteed a renderer at compile time. Renderers never clear
//! or present; the control loop owns both.

mod error;
mod home;
mod reading;

use alloc::string::String;

use thiserror_no_std::Error;

use crate::config::Config;
use crate::display::DisplaySink;
use crate::sensors::{BusId, SensorSnapshot};

pub use error::{ERROR_MAX_LINE_CHARS, ERROR_MAX_LINES, render_error_message, wrap_message};

/// Left margin and vertical gap between text rows.
pub const PADDING: i32 = 8;
pub const LINE_HEIGHT: i32 = 8;

/// Top edge of text row `line` (1-based).
pub const fn line_position(line: u32) -> i32 {
    let line = if line == 0 { 1 } else { line };
    PADDING + (PADDING + LINE_HEIGHT) * (line as i32 - 1)
}

/// Selectable views, cycled by the top-left button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    /// All three sensors.
    #[default]
    Home,
    Sensor1,
    Sensor2,
    Sensor3,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Home, Screen::Sensor1, Screen::Sensor2, Screen::Sensor3];

    /// Next screen in the cycle, wrapping back to [`Screen::Home`].
    pub const fn next(self) -> Self {
        match self {
            Screen::Home => Screen::Sensor1,
            Screen::Sensor1 => Screen::Sensor2,
            Screen::Sensor2 => Screen::Sensor3,
            Screen::Sensor3 => Screen::Home,
        }
    }

    /// Config key of the single sensor shown, `None` for the home screen.
    pub const fn sensor_key(self) -> Option<&'static str> {
        match self {
            Screen::Home => None,
            Screen::Sensor1 => Some("temp_1"),
            Screen::Sensor2 => Some("temp_2"),
            Screen::Sensor3 => Some("temp_3"),
        }
    }
}

/// A screen could not be drawn from the current config and readings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Sensor with key: {key} not found")]
    UnknownSensor { key: String },

    #[error("Could not find readings for sensor id:{bus_id}, label:{label}")]
    MissingReading { bus_id: BusId, label: String },
}

/// Draw `screen` from `snapshot` and `config`.
pub fn render<D>(
    display: &mut D,
    snapshot: &SensorSnapshot,
    config: &Config,
    screen: Screen,
) -> Result<(), RenderError>
where
    D: DisplaySink + ?Sized,
{
    match screen.sensor_key() {
        None => home::render_home(display, snapshot, config),
        Some(key) => reading::render_sensor_reading(display, snapshot, config, key, 1),
    }
}
