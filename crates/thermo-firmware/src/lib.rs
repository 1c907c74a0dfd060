//! ESP32-S3 firmware-specific modules for thermo-rs
//!
//! Hardware glue that cannot compile on desktop targets: the embassy clock,
//! the GPIO button tasks and the ILI9342C panel with its backlight.

#![no_std]

pub mod buttons;
pub mod clock;
pub mod panel;
