//! Bluetooth module controller: power line plus three momentary buttons.
//!
//! The module's activation input is level-sensitive, so powering is a
//! matter of holding the line. Power-on is immediate; power-off is
//! deferred by [`MODULE_OFF_DELAY_TICKS`] unless forced, because the
//! module takes seconds to boot and a quick source switch back to the
//! phone input must not power-cycle it. The play/pause, previous and
//! next inputs are pulsed for [`MODULE_PRESS_TICKS`] each, one at a
//! time.

use crate::config::{MODULE_OFF_DELAY_TICKS, MODULE_PRESS_TICKS};

/// One of the module's three momentary button inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleButton {
    PlayPause,
    Previous,
    Next,
}

/// Outbound side of the module's control lines.
///
/// `set_power(true)` holds the activation line asserted (the physical
/// line is inverted; polarity belongs to the binary). `press` asserts
/// exactly one button line, releasing the other two; `release_buttons`
/// returns all three to a non-driving released state.
pub trait ModuleDrive {
    fn set_power(&mut self, on: bool);
    fn press(&mut self, button: ModuleButton);
    fn release_buttons(&mut self);
}

/// Debounced activation and button-press state of the module.
pub struct BluetoothModule {
    /// Nonzero while a button line is asserted.
    press_timer: u16,
    /// Nonzero while a delayed power-off is pending.
    deactivation_timer: u16,
}

impl BluetoothModule {
    pub const fn new() -> Self {
        Self {
            press_timer: 0,
            deactivation_timer: 0,
        }
    }

    /// Advance the countdowns by one timer period.
    ///
    /// An expiring press releases the button lines. An expiring
    /// deactivation powers the module off and also releases any button
    /// still asserted; deactivation wins over an in-flight press.
    pub fn tick(&mut self, drive: &mut impl ModuleDrive) {
        if self.press_timer > 0 {
            self.press_timer -= 1;
            if self.press_timer == 0 {
                drive.release_buttons();
            }
        }

        if self.deactivation_timer > 0 {
            self.deactivation_timer -= 1;
            if self.deactivation_timer == 0 {
                drive.set_power(false);
                drive.release_buttons();
                self.press_timer = 0;

                #[cfg(feature = "defmt")]
                defmt::info!("Module off (delayed)");
            }
        }
    }

    /// Power the module on immediately, cancelling any pending
    /// delayed power-off.
    pub fn activate(&mut self, drive: &mut impl ModuleDrive) {
        drive.set_power(true);
        self.deactivation_timer = 0;

        #[cfg(feature = "defmt")]
        defmt::info!("Module on");
    }

    /// Power the module off.
    ///
    /// Forced: immediately, cancelling the pending power-off and any
    /// in-flight button press (used before entering deep sleep).
    /// Non-forced: arms the delayed power-off countdown.
    pub fn deactivate(&mut self, drive: &mut impl ModuleDrive, force: bool) {
        if force {
            drive.set_power(false);
            self.deactivation_timer = 0;
            drive.release_buttons();
            self.press_timer = 0;

            #[cfg(feature = "defmt")]
            defmt::info!("Module off (forced)");
        } else {
            self.deactivation_timer = MODULE_OFF_DELAY_TICKS;
        }
    }

    /// Assert one button line for the fixed pulse width, releasing the
    /// other two.
    ///
    /// A press does not cancel a pending delayed power-off; only
    /// [`activate`](Self::activate) does.
    pub fn press(&mut self, drive: &mut impl ModuleDrive, button: ModuleButton) {
        drive.press(button);
        self.press_timer = MODULE_PRESS_TICKS;

        #[cfg(feature = "defmt")]
        defmt::info!("Module button: {}", button);
    }
}

impl Default for BluetoothModule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockDrive {
        power: Option<bool>,
        pressed: Option<ModuleButton>,
        button_releases: usize,
    }

    impl ModuleDrive for MockDrive {
        fn set_power(&mut self, on: bool) {
            self.power = Some(on);
        }

        fn press(&mut self, button: ModuleButton) {
            self.pressed = Some(button);
        }

        fn release_buttons(&mut self) {
            self.pressed = None;
            self.button_releases += 1;
        }
    }

    #[test]
    fn press_pulses_for_exact_width() {
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.press(&mut drive, ModuleButton::Next);
        assert_eq!(drive.pressed, Some(ModuleButton::Next));

        for _ in 0..MODULE_PRESS_TICKS - 1 {
            module.tick(&mut drive);
        }
        assert_eq!(drive.pressed, Some(ModuleButton::Next));

        module.tick(&mut drive);
        assert_eq!(drive.pressed, None);
        assert_eq!(drive.button_releases, 1);
    }

    #[test]
    fn new_press_replaces_previous() {
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.press(&mut drive, ModuleButton::PlayPause);
        module.tick(&mut drive);
        module.press(&mut drive, ModuleButton::Previous);
        assert_eq!(drive.pressed, Some(ModuleButton::Previous));

        // The pulse width restarts with the new press.
        for _ in 0..MODULE_PRESS_TICKS - 1 {
            module.tick(&mut drive);
        }
        assert_eq!(drive.pressed, Some(ModuleButton::Previous));
        module.tick(&mut drive);
        assert_eq!(drive.pressed, None);
    }

    #[test]
    fn delayed_deactivation_fires_after_full_delay() {
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.activate(&mut drive);
        module.deactivate(&mut drive, false);
        assert_eq!(drive.power, Some(true));

        for _ in 0..MODULE_OFF_DELAY_TICKS - 1 {
            module.tick(&mut drive);
        }
        assert_eq!(drive.power, Some(true));

        module.tick(&mut drive);
        assert_eq!(drive.power, Some(false));
    }

    #[test]
    fn activate_cancels_pending_deactivation() {
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.deactivate(&mut drive, false);
        module.activate(&mut drive);

        for _ in 0..MODULE_OFF_DELAY_TICKS + 10 {
            module.tick(&mut drive);
        }
        assert_eq!(drive.power, Some(true));
    }

    #[test]
    fn press_does_not_cancel_pending_deactivation() {
        // Deliberate: only activate() cancels the countdown. A press
        // during the off window still ends with the module powered off.
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.activate(&mut drive);
        module.deactivate(&mut drive, false);
        module.press(&mut drive, ModuleButton::PlayPause);

        for _ in 0..MODULE_OFF_DELAY_TICKS {
            module.tick(&mut drive);
        }
        assert_eq!(drive.power, Some(false));
    }

    #[test]
    fn expiring_deactivation_releases_in_flight_press() {
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.deactivate(&mut drive, false);
        for _ in 0..MODULE_OFF_DELAY_TICKS - 10 {
            module.tick(&mut drive);
        }

        // Press near the end of the window; power-off beats the pulse.
        module.press(&mut drive, ModuleButton::Next);
        for _ in 0..10 {
            module.tick(&mut drive);
        }
        assert_eq!(drive.power, Some(false));
        assert_eq!(drive.pressed, None);

        // The press countdown was zeroed: no stray release later.
        let releases = drive.button_releases;
        for _ in 0..MODULE_PRESS_TICKS {
            module.tick(&mut drive);
        }
        assert_eq!(drive.button_releases, releases);
    }

    #[test]
    fn forced_deactivation_zeroes_all_countdowns() {
        let mut module = BluetoothModule::new();
        let mut drive = MockDrive::default();

        module.activate(&mut drive);
        module.deactivate(&mut drive, false);
        module.press(&mut drive, ModuleButton::Previous);

        module.deactivate(&mut drive, true);
        assert_eq!(drive.power, Some(false));
        assert_eq!(drive.pressed, None);

        // Nothing left to expire.
        let releases = drive.button_releases;
        for _ in 0..MODULE_OFF_DELAY_TICKS + MODULE_PRESS_TICKS {
            module.tick(&mut drive);
        }
        assert_eq!(drive.power, Some(false));
        assert_eq!(drive.button_releases, releases);
    }
}
