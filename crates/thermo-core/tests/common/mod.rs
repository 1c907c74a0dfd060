//! Recording fakes shared by the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::Point;
use embedded_hal_async::delay::DelayNs;
use thermo_core::app_state::{Clock, Millis};
use thermo_core::config::Config;
use thermo_core::display::DisplaySink;
use thermo_core::sensors::{SensorReader, SensorReading, SensorSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayOp {
    Clear,
    Text {
        text: String,
        position: Point,
        color: Rgb565,
    },
    Line {
        start: Point,
        end: Point,
        color: Rgb565,
    },
    Present,
    Sleep,
    Wake,
}

/// Display double that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub ops: Vec<DisplayOp>,
}

impl RecordingDisplay {
    /// Return and forget everything recorded so far.
    pub fn take(&mut self) -> Vec<DisplayOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn count(&self, op: &DisplayOp) -> usize {
        self.ops.iter().filter(|o| *o == op).count()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySink for RecordingDisplay {
    fn clear(&mut self) {
        self.ops.push(DisplayOp::Clear);
    }

    fn text(&mut self, text: &str, position: Point, color: Rgb565) {
        self.ops.push(DisplayOp::Text {
            text: text.to_string(),
            position,
            color,
        });
    }

    fn line(&mut self, start: Point, end: Point, color: Rgb565) {
        self.ops.push(DisplayOp::Line { start, end, color });
    }

    fn present(&mut self) {
        self.ops.push(DisplayOp::Present);
    }

    fn sleep(&mut self) {
        self.ops.push(DisplayOp::Sleep);
    }

    fn wake(&mut self) {
        self.ops.push(DisplayOp::Wake);
    }
}

/// Reader that replays queued snapshots, then repeats `fallback`.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    pub script: VecDeque<SensorSnapshot>,
    pub fallback: SensorSnapshot,
    pub reads: usize,
}

impl ScriptedReader {
    pub fn new(script: impl IntoIterator<Item = SensorSnapshot>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn repeating(snapshot: SensorSnapshot) -> Self {
        Self {
            fallback: snapshot,
            ..Self::default()
        }
    }
}

impl SensorReader for ScriptedReader {
    async fn read_all(&mut self) -> SensorSnapshot {
        self.reads += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn config_with(refresh_interval: u32, screen_timeout: u32) -> Config {
    Config::from_json(&format!(
        r#"{{
            "refresh_interval": {refresh_interval},
            "screen_timeout": {screen_timeout},
            "sensors": {{
                "temp_1": {{ "id": "0xAA", "label": "T1" }},
                "temp_2": {{ "id": "0xBB", "label": "T2" }},
                "temp_3": {{ "id": "0xCC", "label": "T3" }}
            }}
        }}"#
    ))
    .expect("test config is valid")
}

/// Config used by the scenarios: 30 s refresh, 10 s screen timeout.
pub fn config() -> Config {
    config_with(30, 10)
}

/// Readings for the three configured probes, ids in reader (lowercase) form.
pub fn snapshot(t1: f32, t2: f32, t3: f32) -> SensorSnapshot {
    SensorSnapshot::from_readings([
        SensorReading::new("0xaa", t1),
        SensorReading::new("0xbb", t2),
        SensorReading::new("0xcc", t3),
    ])
}

/// Clock advanced only by [`SteppingDelay`], which also logs every wait.
#[derive(Debug, Default)]
pub struct SteppingClock {
    now: Cell<Millis>,
    pub delays: RefCell<Vec<u32>>,
}

impl SteppingClock {
    pub fn delay_count(&self) -> usize {
        self.delays.borrow().len()
    }
}

impl Clock for SteppingClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Delay that moves a [`SteppingClock`] forward instantly and hangs after
/// `limit` waits.
pub struct SteppingDelay<'a> {
    pub clock: &'a SteppingClock,
    pub limit: usize,
}

impl DelayNs for SteppingDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.now.set(self.clock.now.get() + Millis::from(ns / 1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        if self.clock.delay_count() >= self.limit {
            core::future::pending::<()>().await;
        }
        self.clock.delays.borrow_mut().push(ms);
        self.clock.now.set(self.clock.now.get() + Millis::from(ms));
    }
}
