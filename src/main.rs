//! Embedded entry point: Embassy on nRF52840.
//!
//! Two cooperating loops share the [`Adapter`] through a
//! critical-section mutex: a 1 ms ticker that advances every countdown,
//! and a pin-change loop that waits for an edge on any row or the
//! ON/OFF line, samples the matrix and feeds the scan path. The
//! executor idles the core between events; when the head unit stops
//! scanning, the Bluetooth module is forced off first so nothing draws
//! power while the car is parked.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_futures::select::select_array;
use embassy_nrf::gpio::{AnyPin, Flex, Input, Level, Output, OutputDrive, Pin, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Ticker};
use panic_probe as _;

use bt2ehu::adapter::Adapter;
use bt2ehu::bluetooth::{ModuleButton, ModuleDrive};
use bt2ehu::config::TICK_PERIOD_MS;
use bt2ehu::keypad::{MatrixDrive, MatrixSample};
use bt2ehu::telmute::MuteDrive;

/// The head unit's own pull-ups sit at ~3.3 V; on a 5 V board they must
/// not be doubled up MCU-side.
#[cfg(feature = "matrix-pullups")]
const COLUMN_PULL: Pull = Pull::Up;
#[cfg(not(feature = "matrix-pullups"))]
const COLUMN_PULL: Pull = Pull::None;

/// This MCU's grip on the matrix column lines: inputs normally,
/// output-low while a press is being emulated.
struct MatrixColumns {
    pins: [Flex<'static>; 3],
}

impl MatrixColumns {
    fn new(mut pins: [Flex<'static>; 3]) -> Self {
        for pin in &mut pins {
            pin.set_low();
            pin.set_as_input(COLUMN_PULL);
        }
        Self { pins }
    }

    /// Current column levels, one bit per column, 1 = released.
    fn levels(&self) -> u8 {
        let mut cols = 0;
        for (i, pin) in self.pins.iter().enumerate() {
            if pin.is_high() {
                cols |= 1 << i;
            }
        }
        cols
    }
}

impl MatrixDrive for MatrixColumns {
    fn drive_columns(&mut self, mask: u8) {
        for (i, pin) in self.pins.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                pin.set_low();
                pin.set_as_output(OutputDrive::Standard);
            } else {
                pin.set_as_input(COLUMN_PULL);
            }
        }
    }

    fn release(&mut self) {
        for pin in self.pins.iter_mut() {
            pin.set_as_input(COLUMN_PULL);
        }
    }
}

/// The Bluetooth module's control lines. Activation is inverted on the
/// board (driven low = powered); the button inputs float released and
/// are pulled low for a press, like the keys they replace.
struct ModuleLines {
    activation: Output<'static>,
    buttons: [Flex<'static>; 3],
}

impl ModuleLines {
    fn new(activation: AnyPin, buttons: [AnyPin; 3]) -> Self {
        let mut buttons = buttons.map(|pin| Flex::new(pin));
        for pin in &mut buttons {
            pin.set_low();
            pin.set_as_input(Pull::None);
        }
        Self {
            // High = module off until the router decides otherwise.
            activation: Output::new(activation, Level::High, OutputDrive::Standard),
            buttons,
        }
    }
}

impl ModuleDrive for ModuleLines {
    fn set_power(&mut self, on: bool) {
        if on {
            self.activation.set_low();
        } else {
            self.activation.set_high();
        }
    }

    fn press(&mut self, button: ModuleButton) {
        self.release_buttons();
        let index = match button {
            ModuleButton::PlayPause => 0,
            ModuleButton::Previous => 1,
            ModuleButton::Next => 2,
        };
        self.buttons[index].set_low();
        self.buttons[index].set_as_output(OutputDrive::Standard);
    }

    fn release_buttons(&mut self) {
        for pin in self.buttons.iter_mut() {
            pin.set_as_input(Pull::None);
        }
    }
}

/// Telephone mute line, push-pull through the transistor stage.
#[cfg(not(feature = "mute-open-drain"))]
struct MuteLine {
    pin: Output<'static>,
}

#[cfg(not(feature = "mute-open-drain"))]
impl MuteLine {
    fn new(pin: AnyPin) -> Self {
        Self {
            pin: Output::new(pin, Level::Low, OutputDrive::Standard),
        }
    }
}

#[cfg(not(feature = "mute-open-drain"))]
impl MuteDrive for MuteLine {
    fn set_muted(&mut self, muted: bool) {
        if muted {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

/// Telephone mute line on boards without the transistor stage: hi-Z
/// released, driven low to mute.
#[cfg(feature = "mute-open-drain")]
struct MuteLine {
    pin: Flex<'static>,
}

#[cfg(feature = "mute-open-drain")]
impl MuteLine {
    fn new(pin: AnyPin) -> Self {
        let mut pin = Flex::new(pin);
        pin.set_low();
        pin.set_as_input(Pull::None);
        Self { pin }
    }
}

#[cfg(feature = "mute-open-drain")]
impl MuteDrive for MuteLine {
    fn set_muted(&mut self, muted: bool) {
        if muted {
            self.pin.set_as_output(OutputDrive::Standard);
        } else {
            self.pin.set_as_input(Pull::None);
        }
    }
}

type SharedAdapter =
    Mutex<CriticalSectionRawMutex, RefCell<Adapter<MatrixColumns, ModuleLines, MuteLine>>>;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("bt2ehu start");

    let columns = MatrixColumns::new([
        Flex::new(p.P0_03.degrade()),
        Flex::new(p.P0_04.degrade()),
        Flex::new(p.P0_28.degrade()),
    ]);
    let module = ModuleLines::new(
        p.P0_15.degrade(),
        [p.P0_16.degrade(), p.P0_17.degrade(), p.P0_18.degrade()],
    );
    let mute = MuteLine::new(p.P0_19.degrade());

    // The head unit leaves its row outputs open between scans; pull
    // them up so levels are defined, as they would be with a key held.
    let mut rows = [
        Input::new(p.P0_11.degrade(), Pull::Up),
        Input::new(p.P0_12.degrade(), Pull::Up),
        Input::new(p.P0_13.degrade(), Pull::Up),
        Input::new(p.P0_14.degrade(), Pull::Up),
    ];
    let mut on_off = Input::new(p.P0_29.degrade(), COLUMN_PULL);

    let adapter: SharedAdapter = Mutex::new(RefCell::new(Adapter::new(columns, module, mute)));

    // Timer context: advance every countdown once per period and handle
    // the active-to-inactive transition.
    let tick_loop = async {
        let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS as u64));
        let mut was_active = false;
        loop {
            ticker.next().await;
            let active = adapter.lock(|a| {
                let mut a = a.borrow_mut();
                a.tick();
                let active = a.is_active();
                if was_active && !active {
                    info!("EHU off, forcing module off");
                    a.prepare_sleep();
                }
                active
            });
            was_active = active;
        }
    };

    // Pin-change context: any edge on a row or the ON/OFF line samples
    // the matrix and runs the scan path.
    let scan_loop = async {
        loop {
            {
                let [r0, r1, r2, r3] = &mut rows;
                select_array([
                    r0.wait_for_any_edge(),
                    r1.wait_for_any_edge(),
                    r2.wait_for_any_edge(),
                    r3.wait_for_any_edge(),
                    on_off.wait_for_any_edge(),
                ])
                .await;
            }

            let mut row_bits = 0u8;
            for (i, row) in rows.iter().enumerate() {
                if row.is_high() {
                    row_bits |= 1 << i;
                }
            }
            let on_off_released = on_off.is_high();

            adapter.lock(|a| {
                let mut a = a.borrow_mut();
                let cols = a.matrix().levels();
                a.scan(MatrixSample {
                    rows: row_bits,
                    cols,
                    on_off: on_off_released,
                });
            });
        }
    };

    join(tick_loop, scan_loop).await;
}
