//! Presence-activated power switch.
//!
//! Everything in here is hardware independent: the pins, timers and serial
//! ports are passed in through `embedded-hal` and `ufmt` traits. Compiles with
//! `std` only when running the unit tests.
#![cfg_attr(not(test), no_std)]

pub mod accuracy;
pub mod config;
pub mod control;
pub mod distance_sensor;
pub mod errors;
pub mod history;
pub mod interfaces;
pub mod relay;
pub mod serial;
pub mod states;

/// A distance reading in centimeters. Zero means "no reading".
pub type Centimeters = u32;
