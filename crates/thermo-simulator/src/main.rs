//! Desktop simulator for the thermo-rs temperature display.
//!
//! Runs the real control loop in an SDL2 window via
//! `embedded-graphics-simulator`, with synthetic probes in place of the
//! one-wire bus. Key presses and releases go through the same debouncer as
//! the GPIO edges on the device.
//!
//! # Key bindings
//!
//! | Key | Action                              |
//! |-----|-------------------------------------|
//! | 1   | Top-left button (next screen)       |
//! | 2   | Top-right button                    |
//! | 3   | Bottom-left button                  |
//! | 4   | Bottom-right button                 |
//! | F   | Toggle a simulated bus failure      |
//! | Q   | Quit                                |
//!
//! The config path is the first argument, `config.json` by default.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use embedded_hal::digital::PinState;
use log::{error, info, warn};

use thermo_core::app_state::{AppState, Clock, Millis, SharedState};
use thermo_core::buttons::{ButtonChannel, ButtonInput, LogicalButton};
use thermo_core::config::{Config, REQUIRED_SENSOR_KEYS};
use thermo_core::control::{DeviceLoop, tick_period_ms};
use thermo_core::display::{BufferedDisplay, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, Panel};
use thermo_core::pages::render_error_message;
use thermo_core::sensors::{BusId, SensorReader, SensorReading, SensorSnapshot};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// SDL event polling period.
const FRAME_DURATION: Duration = Duration::from_millis(16);

const DEFAULT_CONFIG_PATH: &str = "config.json";

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// SDL-backed stand-in for the LCD. Powering off blanks the window.
struct SimPanel {
    screen: SimulatorDisplay<Rgb565>,
    powered: bool,
}

impl SimPanel {
    fn new() -> Self {
        Self {
            screen: SimulatorDisplay::new(Size::new(
                DISPLAY_WIDTH_PX as u32,
                DISPLAY_HEIGHT_PX as u32,
            )),
            powered: true,
        }
    }

    fn screen(&self) -> &SimulatorDisplay<Rgb565> {
        &self.screen
    }
}

impl OriginDimensions for SimPanel {
    fn size(&self) -> Size {
        self.screen.size()
    }
}

impl DrawTarget for SimPanel {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.screen.draw_iter(pixels)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.screen.fill_contiguous(area, colors)
    }
}

impl Panel for SimPanel {
    fn set_powered(&mut self, on: bool) -> Result<(), Self::Error> {
        if !on {
            self.screen.clear(Rgb565::BLACK)?;
        }
        self.powered = on;
        info!("Backlight {}", if self.powered { "on" } else { "off" });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Synthetic probes and clock
// ---------------------------------------------------------------------------

/// Produces slowly drifting temperatures for the configured bus ids.
struct MockProbes {
    ids: Vec<BusId>,
    started: Instant,
    failing: bool,
}

impl MockProbes {
    fn new(config: &Config) -> Self {
        let ids = REQUIRED_SENSOR_KEYS
            .iter()
            .filter_map(|key| config.sensor(key))
            .map(|sensor| BusId::new(sensor.bus_id.as_str().to_ascii_lowercase()))
            .collect();
        Self {
            ids,
            started: Instant::now(),
            failing: false,
        }
    }
}

impl SensorReader for MockProbes {
    async fn read_all(&mut self) -> SensorSnapshot {
        if self.failing {
            warn!("Error reading sensors: simulated bus failure");
            return SensorSnapshot::new();
        }

        let t = self.started.elapsed().as_secs_f32();
        SensorSnapshot::from_readings(self.ids.iter().enumerate().map(|(i, id)| {
            let base = 18.0 + 4.0 * i as f32;
            SensorReading::new(id.clone(), base + 2.0 * (t / 60.0 + i as f32).sin())
        }))
    }
}

struct SimClock {
    started: Instant,
}

impl Clock for SimClock {
    fn now_ms(&self) -> Millis {
        self.started.elapsed().as_millis() as Millis
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Index into [`LogicalButton::ALL`] for a key.
fn keycode_to_button(keycode: Keycode) -> Option<usize> {
    match keycode {
        Keycode::Num1 | Keycode::Kp1 => Some(0),
        Keycode::Num2 | Keycode::Kp2 => Some(1),
        Keycode::Num3 | Keycode::Kp3 => Some(2),
        Keycode::Num4 | Keycode::Kp4 => Some(3),
        _ => None,
    }
}

fn load_config(path: &str) -> Result<Config, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("Config file not found: {path} ({e})"))?;
    Config::from_json(&text).map_err(|e| format!("Invalid config: {e}"))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting thermo-rs simulator");
    info!("Keys: 1-4=Buttons  F=Toggle bus failure  Q=Quit");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Thermo Simulator", &output_settings);
    let mut display = BufferedDisplay::new(SimPanel::new());

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(message) => {
            error!("{}", message);
            render_error_message(&mut display, &message);
            window.update(display.panel().screen());
            'halted: loop {
                for event in window.events() {
                    if let SimulatorEvent::Quit = event {
                        break 'halted;
                    }
                }
                window.update(display.panel().screen());
                std::thread::sleep(FRAME_DURATION);
            }
            return;
        }
    };

    let state = SharedState::new(AppState::default());
    let channel = ButtonChannel::new();
    let sender = channel.sender();
    let mut inputs = LogicalButton::ALL.map(ButtonInput::new);

    let clock = SimClock {
        started: Instant::now(),
    };
    let reader = MockProbes::new(&config);
    let mut device = DeviceLoop::new(&state, channel.receiver(), display, reader, config);

    block_on(device.start(clock.now_ms()));
    // The SDL window must be updated once before `events()` is polled.
    window.update(device.display().panel().screen());

    let mut next_tick = Instant::now();
    let mut halted = false;

    'running: loop {
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown {
                    keycode,
                    repeat: false,
                    ..
                } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if keycode == Keycode::F {
                        let probes = device.reader_mut();
                        probes.failing = !probes.failing;
                        info!("Simulated bus failure {}", if probes.failing { "on" } else { "off" });
                    }
                    if let Some(index) = keycode_to_button(keycode) {
                        inputs[index].submit(PinState::Low, clock.now_ms(), &sender);
                    }
                }

                SimulatorEvent::KeyUp { keycode, .. } => {
                    if let Some(index) = keycode_to_button(keycode) {
                        inputs[index].submit(PinState::High, clock.now_ms(), &sender);
                    }
                }

                _ => {}
            }
        }

        if !halted && Instant::now() >= next_tick {
            if let Err(e) = block_on(device.tick(clock.now_ms())) {
                error!("Could not render data: {}", e);
                device.show_error(&e.to_string());
                halted = true;
            }
            next_tick = Instant::now() + Duration::from_millis(tick_period_ms(state.is_awake()) as u64);
        }

        window.update(device.display().panel().screen());
        std::thread::sleep(FRAME_DURATION);
    }

    info!("Simulator exiting");
}
