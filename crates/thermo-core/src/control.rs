//! Power-and-refresh control loop.
//!
//! Every tick the loop drains pending button presses, takes one snapshot of
//! [`AppState`] and evaluates, in priority order:
//!
//! 1. **Sleep**: inactivity exceeded the screen timeout. Powers the display
//!    down once; further ticks over the timeout do nothing.
//! 2. **Wake**: asleep but a recent press ended the timeout. Powers up and
//!    redraws the current screen from the last snapshot.
//! 3. **Screen change**: the selected screen differs from the one on the panel.
//! 4. **Refresh**: the refresh interval elapsed. Reads sensors, stamps
//!    `last_update` even if the read came back empty, and redraws.
//!
//! At most one of these fires per tick. [`next_transition`] is the pure
//! decision; [`DeviceLoop::tick`] carries it out.

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::app_state::{AppState, Clock, Millis, SharedState, elapsed_ms};
use crate::buttons::{ButtonReceiver, apply_button_event};
use crate::config::{Config, REQUIRED_SENSOR_KEYS, Timing};
use crate::display::DisplaySink;
use crate::pages::{self, RenderError, Screen, render_error_message};
use crate::sensors::{SensorReader, SensorSnapshot};

/// Tick period while the display is on.
pub const AWAKE_TICK_MS: u32 = 50;
/// Tick period while the display is off.
pub const ASLEEP_TICK_MS: u32 = 500;

/// What a single tick does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Sleep,
    Wake,
    ScreenChange(Screen),
    Refresh,
    Idle,
}

/// Decide the transition for the tick at `now`.
///
/// `rendered` is the screen currently on the panel, `None` before the first
/// frame.
pub fn next_transition(
    state: &AppState,
    rendered: Option<Screen>,
    now: Millis,
    timing: Timing,
) -> Transition {
    if elapsed_ms(now, state.last_button_press) > timing.screen_timeout_ms {
        return if state.awake {
            Transition::Sleep
        } else {
            Transition::Idle
        };
    }

    if !state.awake {
        return Transition::Wake;
    }

    if rendered != Some(state.screen) {
        return Transition::ScreenChange(state.screen);
    }

    if elapsed_ms(now, state.last_update) > timing.refresh_interval_ms {
        return Transition::Refresh;
    }

    Transition::Idle
}

/// Cadence for the next sleep between ticks.
pub const fn tick_period_ms(awake: bool) -> u32 {
    if awake { AWAKE_TICK_MS } else { ASLEEP_TICK_MS }
}

/// Owns the display, the sensor reader and the latest snapshot, and drives
/// them from the shared [`AppState`].
pub struct DeviceLoop<'a, D, R> {
    state: &'a SharedState,
    events: ButtonReceiver<'a>,
    display: D,
    reader: R,
    config: Config,
    timing: Timing,
    snapshot: SensorSnapshot,
    rendered: Option<Screen>,
}

impl<'a, D, R> DeviceLoop<'a, D, R>
where
    D: DisplaySink,
    R: SensorReader,
{
    pub fn new(
        state: &'a SharedState,
        events: ButtonReceiver<'a>,
        display: D,
        reader: R,
        config: Config,
    ) -> Self {
        let timing = config.timing();
        Self {
            state,
            events,
            display,
            reader,
            config,
            timing,
            snapshot: SensorSnapshot::new(),
            rendered: None,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    /// Screen currently on the panel.
    pub fn rendered(&self) -> Option<Screen> {
        self.rendered
    }

    /// Power the display up, reset the timers to `now` and take the first reading.
    ///
    /// The first frame is drawn by the first tick.
    pub async fn start(&mut self, now: Millis) {
        self.display.wake();
        self.state.set_awake(true);
        self.state.restart_timers(now);

        let first = self.reader.read_all().await;
        self.accept_snapshot(first);
        info!(
            "Control loop started: refresh {} ms, timeout {} ms",
            self.timing.refresh_interval_ms, self.timing.screen_timeout_ms
        );
    }

    /// Apply every queued button press. Returns how many were applied.
    pub fn drain_button_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_receive() {
            apply_button_event(self.state, event);
            applied += 1;
        }
        applied
    }

    /// Run one tick at time `now`.
    pub async fn tick(&mut self, now: Millis) -> Result<Transition, RenderError> {
        self.drain_button_events();

        let state = self.state.snapshot();
        let transition = next_transition(&state, self.rendered, now, self.timing);

        match transition {
            Transition::Sleep => {
                self.display.sleep();
                self.state.set_awake(false);
                info!("Asleep");
            }
            Transition::Wake => {
                self.display.wake();
                self.state.set_awake(true);
                self.render(state.screen)?;
                info!("Awake");
            }
            Transition::ScreenChange(screen) => {
                self.render(screen)?;
                info!("Screen changed to {:?}", screen);
            }
            Transition::Refresh => {
                let fresh = self.reader.read_all().await;
                self.accept_snapshot(fresh);
                self.state.set_last_update(now);
                self.render(state.screen)?;
                info!("Refreshed data");
            }
            Transition::Idle => {}
        }

        Ok(transition)
    }

    /// Replace the snapshot unless the read came back short.
    fn accept_snapshot(&mut self, fresh: SensorSnapshot) {
        if fresh.len() < REQUIRED_SENSOR_KEYS.len() {
            warn!(
                "Sensor read returned {} readings, keeping previous snapshot",
                fresh.len()
            );
            return;
        }
        self.snapshot = fresh;
    }

    fn render(&mut self, screen: Screen) -> Result<(), RenderError> {
        self.display.clear();
        pages::render(&mut self.display, &self.snapshot, &self.config, screen)?;
        self.display.present();
        self.rendered = Some(screen);
        Ok(())
    }

    /// Replace whatever is on the panel with the error page.
    pub fn show_error(&mut self, message: &str) {
        render_error_message(&mut self.display, message);
        self.rendered = None;
    }

    /// Tick forever at the state-dependent cadence.
    ///
    /// A rendering failure puts the error page up and parks the loop; it
    /// never resumes normal operation.
    pub async fn run<C, T>(&mut self, clock: &C, delay: &mut T)
    where
        C: Clock,
        T: DelayNs,
    {
        self.start(clock.now_ms()).await;

        loop {
            let now = clock.now_ms();
            match self.tick(now).await {
                Ok(Transition::Idle) => {}
                Ok(transition) => debug!("Tick at {} ms: {:?}", now, transition),
                Err(e) => {
                    error!("Could not render data: {}", e);
                    self.show_error(&alloc::format!("{}", e));
                    loop {
                        delay.delay_ms(ASLEEP_TICK_MS).await;
                    }
                }
            }

            delay.delay_ms(tick_period_ms(self.state.is_awake())).await;
        }
    }
}
