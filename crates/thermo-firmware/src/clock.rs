use embassy_time::Instant;
use thermo_core::app_state::{Clock, Millis};

/// Milliseconds since boot from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl EmbassyClock {
    pub fn now() -> Millis {
        Instant::now().as_millis()
    }
}

impl Clock for EmbassyClock {
    fn now_ms(&self) -> Millis {
        Self::now()
    }
}
