//! Application-wide constants and compile-time configuration.
//!
//! All timing parameters, capacities, and hardware pin assignments live
//! here so they can be tuned in one place.

/// Base timer period (ms). Every countdown in the firmware counts these.
pub const TICK_PERIOD_MS: u32 = 1;

/// Convert a millisecond duration to timer ticks.
pub const fn ms_to_ticks(ms: u32) -> u16 {
    (ms / TICK_PERIOD_MS) as u16
}

// Keypad matrix

/// Number of row lines the head unit scans (its outputs, our inputs).
pub const MATRIX_ROWS: usize = 4;

/// Number of column lines the head unit senses (our inputs/outputs).
pub const MATRIX_COLS: usize = 3;

/// How long an emulated button press keeps its matrix lines asserted.
pub const EMULATED_PRESS_TICKS: u16 = ms_to_ticks(200);

/// No-scan window after which the head unit is inferred to be powered off.
pub const EHU_OFF_DETECT_TICKS: u16 = ms_to_ticks(2_000);

// Bluetooth module

/// Pulse width of a module button press (play/pause, previous, next).
pub const MODULE_PRESS_TICKS: u16 = ms_to_ticks(100);

/// Delay before a non-forced module power-off takes effect. The module is
/// slow to boot, so quick source switches must not power-cycle it.
pub const MODULE_OFF_DELAY_TICKS: u16 = ms_to_ticks(20_000);

// Task queue

/// Fixed capacity of the delayed task queue.
pub const TASK_QUEUE_CAPACITY: usize = 10;

// Routing policy delays

/// Delay before the emulated FM/AM (or CD) press when switching sources.
pub const SOURCE_SWITCH_DELAY_TICKS: u16 = ms_to_ticks(200);

/// Delay between the emulated source press and mute activation.
pub const MUTE_DELAY_TICKS: u16 = ms_to_ticks(300);

/// Delays of the two Bass pulses that clear the "Voice" equalizer preset
/// after the phone input engages. Queued in this order; each delay runs
/// once its task reaches the head of the queue.
pub const EQ_CLEAR_FIRST_TICKS: u16 = ms_to_ticks(400);
pub const EQ_CLEAR_SECOND_TICKS: u16 = ms_to_ticks(500);

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Matrix row 0..3 (EHU outs)   → P0.11, P0.12, P0.13, P0.14
//   Matrix col 0..2 (EHU ins)    → P0.03, P0.04, P0.28
//   ON/OFF line                  → P0.29
//   Module activation (inverted) → P0.15
//   Module play/pause            → P0.16
//   Module previous              → P0.17
//   Module next                  → P0.18
//   Telephone mute               → P0.19
