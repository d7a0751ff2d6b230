//! Top-level event router: wires keypad edges to the source-switching
//! policy.
//!
//! The adapter owns the four state machines and the three hardware
//! drives. Button events from the keypad either update the last known
//! source, forward to the Bluetooth module's transport buttons, or run
//! the switch-to-phone / switch-back sequences, with the delayed steps
//! going through the task queue.

use crate::bluetooth::{BluetoothModule, ModuleButton, ModuleDrive};
use crate::config::{
    EQ_CLEAR_FIRST_TICKS, EQ_CLEAR_SECOND_TICKS, MUTE_DELAY_TICKS, SOURCE_SWITCH_DELAY_TICKS,
    TASK_QUEUE_CAPACITY,
};
use crate::keypad::{Button, Keypad, KeypadEvent, MatrixDrive, MatrixSample};
use crate::tasks::DelayQueue;
use crate::telmute::{MuteDrive, TelMute};

/// A head-unit source the phone input can displace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    FmAm,
    Cd,
}

/// Delayed automation steps run by the task queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    EmulateButton(Button),
    ActivateTelMute,
}

pub struct Adapter<M, B, T> {
    keypad: Keypad,
    module: BluetoothModule,
    telmute: TelMute,
    queue: DelayQueue<Task, TASK_QUEUE_CAPACITY>,
    matrix: M,
    module_drive: B,
    mute_drive: T,
    /// Source that was active before switching to the phone input;
    /// decides how to restore the head unit on hangup.
    last_source: Option<Source>,
}

impl<M, B, T> Adapter<M, B, T>
where
    M: MatrixDrive,
    B: ModuleDrive,
    T: MuteDrive,
{
    pub fn new(matrix: M, module_drive: B, mute_drive: T) -> Self {
        Self {
            keypad: Keypad::new(),
            module: BluetoothModule::new(),
            telmute: TelMute::new(),
            queue: DelayQueue::new(),
            matrix,
            module_drive,
            mute_drive,
            last_source: None,
        }
    }

    /// Advance every countdown by one timer period and route whatever
    /// falls out.
    pub fn tick(&mut self) {
        if let Some(event) = self.keypad.tick(&mut self.matrix) {
            self.handle_event(event);
        }

        self.module.tick(&mut self.module_drive);

        if let Some(task) = self.queue.tick() {
            self.run_task(task);
        }
    }

    /// Process one pin-change interrupt's worth of matrix lines.
    pub fn scan(&mut self, sample: MatrixSample) {
        let events = self.keypad.scan(sample, &mut self.matrix);
        for event in events {
            self.handle_event(event);
        }
    }

    /// Whether the head unit scanned the keypad inside the detection
    /// window.
    pub fn is_active(&self) -> bool {
        self.keypad.is_active()
    }

    /// Force the Bluetooth module off before entering deep sleep.
    pub fn prepare_sleep(&mut self) {
        self.module.deactivate(&mut self.module_drive, true);
    }

    pub fn mute_active(&self) -> bool {
        self.telmute.is_active()
    }

    pub fn last_source(&self) -> Option<Source> {
        self.last_source
    }

    /// The matrix drive, for sampling the column levels it owns.
    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    fn handle_event(&mut self, event: KeypadEvent) {
        #[cfg(feature = "defmt")]
        defmt::info!("Keypad: {}", event);

        match event {
            KeypadEvent::Pressed(button) => self.on_pressed(button),
            KeypadEvent::Released(button) => self.on_released(button),
            // Activity transitions only need the log line; the sleep
            // decision is the main loop's.
            KeypadEvent::Activated | KeypadEvent::Deactivated => {}
        }
    }

    fn on_pressed(&mut self, button: Button) {
        if !self.telmute.is_active() {
            // Watching source presses is the only way to know what was
            // playing before the phone input takes over.
            if button == Button::FM_AM {
                self.last_source = Some(Source::FmAm);
            } else if button == Button::CD {
                self.last_source = Some(Source::Cd);
            }
        } else {
            // With the phone input engaged, the repurposed keys control
            // the module instead of the head unit.
            if button == Button::BC {
                self.module.press(&mut self.module_drive, ModuleButton::PlayPause);
            } else if button == Button::LEFT {
                self.module.press(&mut self.module_drive, ModuleButton::Previous);
            } else if button == Button::RIGHT {
                self.module.press(&mut self.module_drive, ModuleButton::Next);
            }
        }
    }

    fn on_released(&mut self, button: Button) {
        if !self.telmute.is_active() {
            if button == Button::BC {
                self.module.activate(&mut self.module_drive);

                // When the mute engages in CD mode the disc keeps
                // spinning, so switch to FM first when the last source
                // is CD or unknown. Otherwise mute right away.
                match self.last_source {
                    None | Some(Source::Cd) => {
                        self.schedule(
                            SOURCE_SWITCH_DELAY_TICKS,
                            Task::EmulateButton(Button::FM_AM),
                        );
                        self.schedule(MUTE_DELAY_TICKS, Task::ActivateTelMute);
                        self.last_source = Some(Source::FmAm);
                    }
                    Some(Source::FmAm) => {
                        self.telmute.activate(&mut self.mute_drive);
                    }
                }

                // Press Bass twice to drop the "Voice" equalizer preset
                // that engages with the phone input.
                self.schedule(EQ_CLEAR_FIRST_TICKS, Task::EmulateButton(Button::BASS));
                self.schedule(EQ_CLEAR_SECOND_TICKS, Task::EmulateButton(Button::BASS));
            }
        } else if button == Button::FM_AM || button == Button::CD || button == Button::OnOff {
            self.telmute.deactivate(&mut self.mute_drive);
            self.module.deactivate(&mut self.module_drive, false);

            if button == Button::CD {
                // The head unit lands on the source that was active
                // before the phone input; re-press CD if that was not
                // what the user asked for.
                if self.last_source == Some(Source::FmAm) {
                    self.schedule(SOURCE_SWITCH_DELAY_TICKS, Task::EmulateButton(Button::CD));
                }
                self.last_source = Some(Source::Cd);
            }
        }
    }

    fn schedule(&mut self, delay: u16, task: Task) {
        if self.queue.schedule(delay, task).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Task queue full, step dropped");
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::EmulateButton(button) => self.keypad.simulate_button(&mut self.matrix, button),
            Task::ActivateTelMute => self.telmute.activate(&mut self.mute_drive),
        }
    }
}
