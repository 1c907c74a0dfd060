//! Application-wide state shared between the button domain and the control loop
//!
//! [`AppState`] is a small `Copy` record. [`SharedState`] owns it behind a
//! critical-section mutex so it can be touched from interrupt-driven tasks and
//! from the control loop without torn reads.
//!
//! Field ownership:
//! - button domain writes `screen` and `last_button_press`
//! - control loop writes `awake` and `last_update`

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::pages::Screen;

/// Monotonic milliseconds since boot.
pub type Millis = u64;

/// Milliseconds elapsed from `since` to `now`.
///
/// A `since` later than `now` counts as no time elapsed. Presses are stamped
/// by the button tasks and can land after the loop read its clock.
#[inline]
pub const fn elapsed_ms(now: Millis, since: Millis) -> Millis {
    now.saturating_sub(since)
}

/// Source of monotonic time for the control loop.
pub trait Clock {
    /// Current time in milliseconds since boot.
    fn now_ms(&self) -> Millis;
}

/// Snapshot of the device state read by the control loop each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    /// Whether the display is currently powered and rendering.
    pub awake: bool,
    /// Currently selected view.
    pub screen: Screen,
    /// Time of the most recent accepted button press.
    pub last_button_press: Millis,
    /// Time of the most recent sensor refresh attempt.
    pub last_update: Millis,
}

impl AppState {
    /// State at power-on: awake, home screen, both timers at `now`.
    pub const fn boot(now: Millis) -> Self {
        Self {
            awake: true,
            screen: Screen::Home,
            last_button_press: now,
            last_update: now,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::boot(0)
    }
}

/// Interrupt-safe owner of the [`AppState`] record.
///
/// Every accessor takes the critical section for a single load or
/// read-modify-write, so readers never observe a half-written record.
pub struct SharedState {
    inner: Mutex<CriticalSectionRawMutex, Cell<AppState>>,
}

impl SharedState {
    pub const fn new(initial: AppState) -> Self {
        Self {
            inner: Mutex::new(Cell::new(initial)),
        }
    }

    /// Copy out the whole record.
    pub fn snapshot(&self) -> AppState {
        self.inner.lock(|cell| cell.get())
    }

    fn update(&self, f: impl FnOnce(&mut AppState)) {
        self.inner.lock(|cell| {
            let mut state = cell.get();
            f(&mut state);
            cell.set(state);
        });
    }

    pub fn is_awake(&self) -> bool {
        self.snapshot().awake
    }

    pub fn screen(&self) -> Screen {
        self.snapshot().screen
    }

    /// Button domain: refresh the inactivity timer.
    pub fn record_button_press(&self, at: Millis) {
        self.update(|s| s.last_button_press = at);
    }

    /// Button domain: move to the next screen in the cycle.
    pub fn advance_screen(&self) -> Screen {
        let mut next = Screen::Home;
        self.update(|s| {
            s.screen = s.screen.next();
            next = s.screen;
        });
        next
    }

    /// Control loop: mirror the display power state.
    pub fn set_awake(&self, awake: bool) {
        self.update(|s| s.awake = awake);
    }

    /// Control loop: stamp the latest refresh attempt.
    pub fn set_last_update(&self, at: Millis) {
        self.update(|s| s.last_update = at);
    }

    /// Reset both timers to `now`, used once when the loop starts.
    pub fn restart_timers(&self, now: Millis) {
        self.update(|s| {
            s.last_button_press = now;
            s.last_update = now;
        });
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}
