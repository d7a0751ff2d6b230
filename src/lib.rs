//! Core logic for bt2ehu.
//!
//! Everything here is hardware-free: the keypad matrix engine, the
//! Bluetooth module controller, the delayed task queue, the telephone
//! mute toggle and the routing policy that ties them together talk to
//! pins only through the small drive traits. That makes the whole core
//! buildable and testable on the host with plain `cargo test`.
//!
//! The embedded binary in `main.rs` (feature `embedded`, nRF52840)
//! provides the tick source, the pin-change interrupt and the drive
//! implementations.

#![cfg_attr(not(test), no_std)]

pub mod adapter;
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod keypad;
pub mod tasks;
pub mod telmute;

pub use adapter::{Adapter, Source};
pub use error::Error;
