//! GPIO edge tasks feeding the core debouncer.
//!
//! Four active-low buttons with internal pull-ups. Each runs its own task
//! that waits for any edge, hands the new level to a [`ButtonInput`] and
//! queues accepted presses without blocking.

use embedded_hal::digital::PinState;
use esp_hal::gpio::{Input, InputConfig, InputPin, Pull};
use log::info;
use thermo_core::buttons::{ButtonInput, ButtonSender, LogicalButton};

use crate::clock::EmbassyClock;

/// Configure `pin` as a pulled-up button input.
pub fn button_input(pin: impl InputPin + 'static) -> Input<'static> {
    Input::new(pin, InputConfig::default().with_pull(Pull::Up))
}

#[embassy_executor::task(pool_size = 4)]
pub async fn button_task(
    mut pin: Input<'static>,
    button: LogicalButton,
    sender: ButtonSender<'static>,
) -> ! {
    let mut input = ButtonInput::new(button);
    info!("Button task started for {:?}", button);

    loop {
        pin.wait_for_any_edge().await;

        let level = if pin.is_high() {
            PinState::High
        } else {
            PinState::Low
        };
        input.submit(level, EmbassyClock::now(), &sender);
    }
}
