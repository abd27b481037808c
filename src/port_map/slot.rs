use crate::mcu::bus::Bus;
use crate::mcu::mpc::{MpcLayout, PfsFlags, Pin, Unlocked};
use crate::mcu::register::{Bit, Field, Register};
use crate::port_map::table::SlotSetting;

/// The registers that route one pin: its PMR bit, its PFS register (PSEL
/// plus ISEL/ASEL) and its open-drain bit.
///
/// A slot is only a descriptor. It holds addresses, not hardware state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinFunctionSlot {
    pin: Pin,
    pmr: Bit<u8>,
    pfs: Register<u8>,
    psel: Field<u8>,
    odr: Bit<u8>,
}

impl PinFunctionSlot {
    pub const fn new(layout: &MpcLayout, pin: Pin) -> Self {
        PinFunctionSlot {
            pin,
            pmr: layout.pmr(pin),
            pfs: layout.pfs(pin),
            psel: layout.psel(pin),
            odr: layout.odr(pin),
        }
    }

    pub const fn pin(&self) -> Pin {
        self.pin
    }

    /// Reprograms the pin to `setting`.
    ///
    /// # Algorithm
    ///
    /// 1. Clear the PMR bit, even when enabling, so the pin is plain GPIO
    ///    while its function changes
    /// 2. Write PSEL and the ISEL/ASEL flags in one read-modify-write of PFS,
    ///    then the open-drain bit if the setting names one
    /// 3. Write the PMR bit to `setting.port_mode`
    ///
    /// # Notes
    ///
    /// * Requires an open write-protect window; the hardware drops PFS writes
    ///   otherwise
    /// * Every step is written even if the register already holds the value
    pub fn switch<B: Bus + ?Sized>(&self, bus: &mut Unlocked<'_, B>, setting: SlotSetting) {
        let bus: &mut B = bus;

        self.pmr.set(bus, false);

        let psel = self.psel;
        let aux = PfsFlags::all().bits() as u32;
        self.pfs.modify(bus, |raw| {
            let raw = psel.insert(raw as u32, setting.psel as u32);
            ((raw & !aux) | setting.flags.bits() as u32) as u8
        });
        if let Some(open_drain) = setting.open_drain {
            self.odr.set(bus, open_drain);
        }

        self.pmr.set(bus, setting.port_mode);
    }
}
