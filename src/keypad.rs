//! Keypad matrix engine: passive scan reader and press emulator.
//!
//! The head unit owns the matrix. It polls its keypad by driving one row
//! line low at a time and sensing the column lines; this MCU is wired in
//! parallel with the keypad and never scans anything itself. Two jobs:
//!
//! - Watch the scan: whenever a row or ON/OFF line changes (pin-change
//!   interrupt), sample the lines, diff the sensed columns of every row
//!   currently being scanned against the last stored pattern, and report
//!   press/release edges.
//! - Emulate a press: drive the button's column line low, but only while
//!   the head unit is scanning that button's row - to the head unit this
//!   is indistinguishable from a finger on the key.
//!
//! The scan itself doubles as an activity heuristic: a head unit that has
//! not polled the matrix for [`EHU_OFF_DETECT_TICKS`] is considered off.
//!
//! Buttons matrix (connected keys only):
//!
//! ```text
//! row \ col |  0        1        2
//! ----------+---------------------------
//!     0     |  "5"      "Up"     "CD"
//!     1     |  "6"      "Left"   "FM/AM"
//!     2     |                    "BC"
//!     3     |  "Right"  "Bass"
//! ----------+---------------------------
//!   ON/OFF on a dedicated line, pulled low when pressed.
//! ```

use heapless::Vec;

use crate::config::{EHU_OFF_DETECT_TICKS, EMULATED_PRESS_TICKS, MATRIX_COLS, MATRIX_ROWS};

/// All column bits set (every key of a row released).
const COL_MASK: u8 = (1 << MATRIX_COLS as u8) - 1;

/// A key position on the head unit's keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// A key inside the row/column grid.
    Matrix { row: u8, col: u8 },
    /// The power button on its dedicated line, outside the grid.
    OnOff,
}

impl Button {
    pub const FIVE: Button = Button::Matrix { row: 0, col: 0 };
    pub const UP: Button = Button::Matrix { row: 0, col: 1 };
    pub const CD: Button = Button::Matrix { row: 0, col: 2 };
    pub const SIX: Button = Button::Matrix { row: 1, col: 0 };
    pub const LEFT: Button = Button::Matrix { row: 1, col: 1 };
    pub const FM_AM: Button = Button::Matrix { row: 1, col: 2 };
    pub const BC: Button = Button::Matrix { row: 2, col: 2 };
    pub const RIGHT: Button = Button::Matrix { row: 3, col: 0 };
    pub const BASS: Button = Button::Matrix { row: 3, col: 1 };
}

/// Pin levels captured when the pin-change interrupt fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixSample {
    /// One bit per row; 0 = the head unit is driving that row low.
    pub rows: u8,
    /// One bit per column; 1 = released.
    pub cols: u8,
    /// ON/OFF line level; true = released.
    pub on_off: bool,
}

/// Edge and activity events produced by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeypadEvent {
    /// The head unit started scanning after being idle.
    Activated,
    /// No scan for the whole detection window; the head unit is off.
    Deactivated,
    Pressed(Button),
    Released(Button),
}

/// Events from a single scan. Worst case is every key of every scanned row
/// changing at once plus ON/OFF plus `Activated`.
pub type ScanEvents = Vec<KeypadEvent, 16>;

/// Outbound side of the matrix: this MCU's grip on the column lines.
///
/// `drive_columns` pulls the given column lines low; `release` returns
/// every column line to a non-driving input. Pin direction and pull-up
/// setup belong to the binary, not the engine.
pub trait MatrixDrive {
    fn drive_columns(&mut self, mask: u8);
    fn release(&mut self);
}

/// The matrix scanner/emulator state machine.
pub struct Keypad {
    /// Last observed column pattern per row, 1 = released.
    states: [u8; MATRIX_ROWS],
    /// Last observed ON/OFF level, true = released.
    on_off_released: bool,
    emulation_timer: u16,
    emulation_row_mask: u8,
    emulation_col_mask: u8,
    /// Doubles as the activity flag: nonzero means the head unit scanned
    /// the matrix inside the detection window.
    deactivation_timer: u16,
}

impl Keypad {
    pub const fn new() -> Self {
        Self {
            states: [COL_MASK; MATRIX_ROWS],
            on_off_released: true,
            emulation_timer: 0,
            emulation_row_mask: 0,
            emulation_col_mask: 0,
            deactivation_timer: 0,
        }
    }

    /// Advance the countdowns by one timer period.
    ///
    /// Ends an expired emulation by releasing the matrix lines; reports
    /// `Deactivated` once when the detection window runs out.
    pub fn tick(&mut self, drive: &mut impl MatrixDrive) -> Option<KeypadEvent> {
        if self.emulation_timer > 0 {
            self.emulation_timer -= 1;
            if self.emulation_timer == 0 {
                drive.release();

                #[cfg(feature = "defmt")]
                defmt::info!("Emulate stop");
            }
        }

        if self.deactivation_timer > 0 {
            self.deactivation_timer -= 1;
            if self.deactivation_timer == 0 {
                return Some(KeypadEvent::Deactivated);
            }
        }

        None
    }

    /// Whether the head unit scanned the matrix inside the last detection
    /// window.
    pub fn is_active(&self) -> bool {
        self.deactivation_timer != 0
    }

    /// Begin emulating a press of `button` for the fixed pulse width.
    ///
    /// Cancels any in-progress drive first. The actual column assertion
    /// happens in [`scan`](Self::scan), synchronized to the head unit
    /// polling the button's row. ON/OFF has no matrix position and cannot
    /// be emulated.
    pub fn simulate_button(&mut self, drive: &mut impl MatrixDrive, button: Button) {
        let (row, col) = match button {
            Button::Matrix { row, col } => (row, col),
            Button::OnOff => return,
        };

        // Release any previously driven lines.
        drive.release();

        self.emulation_timer = EMULATED_PRESS_TICKS;
        self.emulation_row_mask = 1 << row;
        self.emulation_col_mask = 1 << col;

        #[cfg(feature = "defmt")]
        defmt::info!("Emulate press: {}", button);
    }

    /// Process one pin-change interrupt's worth of matrix lines.
    ///
    /// Re-arms the deactivation window on every call; the first call after
    /// the window expired yields `Activated` ahead of any edge events.
    /// While an emulation is in progress this only mirrors the emulated
    /// column onto the bus (asserted during the emulated row's scan slot,
    /// released otherwise) and suppresses edge detection entirely.
    pub fn scan(&mut self, sample: MatrixSample, drive: &mut impl MatrixDrive) -> ScanEvents {
        let mut events = ScanEvents::new();

        if self.deactivation_timer == 0 {
            events.push(KeypadEvent::Activated).ok();
        }
        self.deactivation_timer = EHU_OFF_DETECT_TICKS;

        if self.emulation_timer > 0 {
            if sample.rows & self.emulation_row_mask == 0 {
                drive.drive_columns(self.emulation_col_mask);
            } else {
                drive.release();
            }
            return events;
        }

        for row in 0..MATRIX_ROWS {
            if sample.rows & (1 << row as u8) != 0 {
                continue;
            }

            let new_state = sample.cols & COL_MASK;
            let old_state = self.states[row];

            for col in 0..MATRIX_COLS {
                let bit = 1 << col as u8;
                if (new_state ^ old_state) & bit != 0 {
                    let button = Button::Matrix {
                        row: row as u8,
                        col: col as u8,
                    };
                    let event = if new_state & bit == 0 {
                        KeypadEvent::Pressed(button)
                    } else {
                        KeypadEvent::Released(button)
                    };
                    events.push(event).ok();
                }
            }

            self.states[row] = new_state;
        }

        if sample.on_off != self.on_off_released {
            let event = if !sample.on_off {
                KeypadEvent::Pressed(Button::OnOff)
            } else {
                KeypadEvent::Released(Button::OnOff)
            };
            events.push(event).ok();
            self.on_off_released = sample.on_off;
        }

        events
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}
