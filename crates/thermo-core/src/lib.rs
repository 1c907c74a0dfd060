//! Hardware-independent core library for thermo-rs
//!
//! This crate contains all platform-agnostic logic for the thermo display:
//! the shared application state, the debounced button source, configuration
//! loading, the sensor snapshot and DS18B20 reader, the buffered display sink,
//! the screen renderers and the power-and-refresh control loop.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod buttons;
pub mod config;
pub mod control;
pub mod display;
pub mod pages;
pub mod sensors;
