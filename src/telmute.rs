//! Telephone mute line: a two-state output with a cached flag.
//!
//! Asserting the line makes the head unit mute the speakers and open
//! its phone input. The cached flag gates the routing policy, so it is
//! the single source of truth for "phone input engaged".

/// Outbound side of the mute/input-select line.
pub trait MuteDrive {
    fn set_muted(&mut self, muted: bool);
}

pub struct TelMute {
    active: bool,
}

impl TelMute {
    pub const fn new() -> Self {
        Self { active: false }
    }

    pub fn activate(&mut self, drive: &mut impl MuteDrive) {
        drive.set_muted(true);
        self.active = true;

        #[cfg(feature = "defmt")]
        defmt::info!("TelMute on");
    }

    pub fn deactivate(&mut self, drive: &mut impl MuteDrive) {
        drive.set_muted(false);
        self.active = false;

        #[cfg(feature = "defmt")]
        defmt::info!("TelMute off");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for TelMute {
    fn default() -> Self {
        Self::new()
    }
}
