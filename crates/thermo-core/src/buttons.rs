//! Debounced button source.
//!
//! Four active-low buttons with pull-ups sit on the front of the device.
//! Every raw electrical edge is fed to a [`ButtonInput`], which accepts an
//! edge only when the level actually changed and the previous accepted edge
//! is older than [`DEBOUNCE_MS`]. Both edges are debounced but only presses
//! (high to low) produce a [`ButtonEvent`].
//!
//! Accepted presses are pushed into a bounded [`ButtonChannel`] with
//! `try_send`, so the edge handler never blocks. The control loop drains the
//! channel between ticks and applies each event with [`apply_button_event`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embedded_hal::digital::PinState;
use log::{debug, info, warn};

use crate::app_state::{Millis, SharedState, elapsed_ms};

/// Minimum time between accepted transitions on one input.
pub const DEBOUNCE_MS: Millis = 200;

/// Number of pending presses the channel can hold between ticks.
pub const BUTTON_QUEUE_DEPTH: usize = 4;

pub type ButtonChannel = Channel<CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH>;
pub type ButtonSender<'a> = Sender<'a, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH>;
pub type ButtonReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH>;

/// Logical identity of a physical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalButton {
    /// Cycles through the screens.
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl LogicalButton {
    pub const ALL: [LogicalButton; 4] = [
        LogicalButton::TopLeft,
        LogicalButton::TopRight,
        LogicalButton::BottomLeft,
        LogicalButton::BottomRight,
    ];
}

/// A debounced press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: LogicalButton,
    /// Time the press edge was accepted.
    pub at: Millis,
}

/// Edge-acceptance state for a single pin.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    last_level: PinState,
    last_accepted: Millis,
}

impl Debouncer {
    /// Idle level is high (pull-up, not pressed).
    pub const fn new() -> Self {
        Self {
            last_level: PinState::High,
            last_accepted: 0,
        }
    }

    /// Feed a raw edge. Returns `true` when the edge is an accepted press.
    pub fn on_transition(&mut self, level: PinState, now: Millis) -> bool {
        if level == self.last_level {
            return false;
        }

        if elapsed_ms(now, self.last_accepted) <= DEBOUNCE_MS {
            return false;
        }

        self.last_level = level;
        self.last_accepted = now;

        level == PinState::Low
    }

    /// Level of the last accepted transition.
    pub fn level(&self) -> PinState {
        self.last_level
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// A debouncer bound to a logical button.
#[derive(Debug, Clone, Copy)]
pub struct ButtonInput {
    button: LogicalButton,
    debouncer: Debouncer,
}

impl ButtonInput {
    pub const fn new(button: LogicalButton) -> Self {
        Self {
            button,
            debouncer: Debouncer::new(),
        }
    }

    pub fn button(&self) -> LogicalButton {
        self.button
    }

    /// Feed a raw edge, returning the press event if one was accepted.
    pub fn on_edge(&mut self, level: PinState, now: Millis) -> Option<ButtonEvent> {
        self.debouncer
            .on_transition(level, now)
            .then_some(ButtonEvent {
                button: self.button,
                at: now,
            })
    }

    /// Feed a raw edge and enqueue any resulting press without blocking.
    ///
    /// Returns `true` if a press was queued.
    pub fn submit(&mut self, level: PinState, now: Millis, sender: &ButtonSender<'_>) -> bool {
        let Some(event) = self.on_edge(level, now) else {
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => {
                debug!("Button {:?} pressed at {}", event.button, event.at);
                true
            }
            Err(_) => {
                warn!("Button queue full, dropping {:?} press", event.button);
                false
            }
        }
    }
}

/// Apply a press to the shared state.
///
/// Every press refreshes the inactivity timer. A press that arrives while the
/// device is asleep only wakes it; it does not also act on the screen.
pub fn apply_button_event(state: &SharedState, event: ButtonEvent) {
    let was_awake = state.is_awake();
    state.record_button_press(event.at);

    if !was_awake {
        debug!("{:?} press used to wake the device", event.button);
        return;
    }

    match event.button {
        LogicalButton::TopLeft => {
            let screen = state.advance_screen();
            info!("Screen selected: {:?}", screen);
        }
        LogicalButton::TopRight | LogicalButton::BottomLeft | LogicalButton::BottomRight => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppState;
    use crate::pages::Screen;

    #[test]
    fn press_after_window_is_accepted() {
        let mut d = Debouncer::new();
        assert!(d.on_transition(PinState::Low, 1_000));
        assert_eq!(d.level(), PinState::Low);
    }

    #[test]
    fn release_is_accepted_silently() {
        let mut d = Debouncer::new();
        assert!(d.on_transition(PinState::Low, 1_000));
        assert!(!d.on_transition(PinState::High, 1_300));
        assert_eq!(d.level(), PinState::High);
    }

    #[test]
    fn bounce_inside_window_is_ignored() {
        let mut d = Debouncer::new();
        assert!(d.on_transition(PinState::Low, 1_000));
        assert!(!d.on_transition(PinState::High, 1_020));
        assert!(!d.on_transition(PinState::Low, 1_040));
        // Release was never accepted, so the level is still low.
        assert_eq!(d.level(), PinState::Low);
    }

    #[test]
    fn repeated_level_is_not_a_transition() {
        let mut d = Debouncer::new();
        assert!(d.on_transition(PinState::Low, 1_000));
        assert!(!d.on_transition(PinState::Low, 5_000));
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let mut d = Debouncer::new();
        assert!(d.on_transition(PinState::Low, 1_000));
        assert!(!d.on_transition(PinState::High, 1_000 + DEBOUNCE_MS));
        assert!(!d.on_transition(PinState::High, 1_000 + DEBOUNCE_MS + 1));
        assert!(d.on_transition(PinState::Low, 1_000 + 2 * DEBOUNCE_MS + 2));
    }

    #[test]
    fn submit_queues_presses_only() {
        let channel = ButtonChannel::new();
        let sender = channel.sender();
        let receiver = channel.receiver();
        let mut input = ButtonInput::new(LogicalButton::TopLeft);

        assert!(input.submit(PinState::Low, 500, &sender));
        assert!(!input.submit(PinState::High, 800, &sender));

        let event = receiver.try_receive().unwrap();
        assert_eq!(event.button, LogicalButton::TopLeft);
        assert_eq!(event.at, 500);
        assert!(receiver.try_receive().is_err());
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let channel = ButtonChannel::new();
        let sender = channel.sender();
        let mut input = ButtonInput::new(LogicalButton::BottomLeft);

        let mut now = 1_000;
        let mut queued = 0;
        for _ in 0..(BUTTON_QUEUE_DEPTH + 2) {
            if input.submit(PinState::Low, now, &sender) {
                queued += 1;
            }
            input.on_edge(PinState::High, now + 300);
            now += 600;
        }
        assert_eq!(queued, BUTTON_QUEUE_DEPTH);
    }

    #[test]
    fn top_left_cycles_screen_when_awake() {
        let state = SharedState::new(AppState::boot(0));
        apply_button_event(
            &state,
            ButtonEvent {
                button: LogicalButton::TopLeft,
                at: 50,
            },
        );
        let s = state.snapshot();
        assert_eq!(s.screen, Screen::Sensor1);
        assert_eq!(s.last_button_press, 50);
    }

    #[test]
    fn press_while_asleep_only_wakes() {
        let state = SharedState::new(AppState::boot(0));
        state.set_awake(false);
        apply_button_event(
            &state,
            ButtonEvent {
                button: LogicalButton::TopLeft,
                at: 20_000,
            },
        );
        let s = state.snapshot();
        assert_eq!(s.screen, Screen::Home);
        assert_eq!(s.last_button_press, 20_000);
    }

    #[test]
    fn other_buttons_only_refresh_timer() {
        let state = SharedState::new(AppState::boot(0));
        for button in [
            LogicalButton::TopRight,
            LogicalButton::BottomLeft,
            LogicalButton::BottomRight,
        ] {
            apply_button_event(&state, ButtonEvent { button, at: 77 });
        }
        let s = state.snapshot();
        assert_eq!(s.screen, Screen::Home);
        assert_eq!(s.last_button_press, 77);
    }
}
