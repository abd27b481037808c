//! Multi-function pin controller (MPC).
//!
//! Each pin has a pin function select register (PFS) holding the PSEL code
//! plus the ISEL/ASEL flags, a bit in its port's mode register (PMR), a bit in
//! the port's open-drain registers (ODR0/ODR1) and a bit in the port's input
//! data register (PIDR). PFS writes are ignored by the hardware unless the
//! write-protect register (PWPR) has been opened first.

use core::ops::{Deref, DerefMut};

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::mcu::bus::Bus;
use crate::mcu::register::{Bit, Field, Register, Ro};
use crate::{BIT, BIT_RNG};

/// I/O ports in PFS order. The discriminant is the port's index in every
/// per-port register block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Port {
    P0 = 0,
    P1 = 1,
    P2 = 2,
    P3 = 3,
    P4 = 4,
    P5 = 5,
    P6 = 6,
    P7 = 7,
    P8 = 8,
    P9 = 9,
    PA = 10,
    PB = 11,
    PC = 12,
    PD = 13,
    PE = 14,
    PF = 15,
    PG = 16,
    PH = 17,
    PJ = 18,
}

impl Port {
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// A physical pin: port plus bit number 0-7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin {
    pub port: Port,
    pub bit: u8,
}

impl Pin {
    pub const fn new(port: Port, bit: u8) -> Self {
        assert!(bit < 8, "pin bit out of range");
        Pin { port, bit }
    }
}

macro_rules! port_pins {
    ( $( $port:ident ),* ) => {
        paste::paste! {
            $(
                pub const [<$port 0>]: Pin = Pin::new(Port::$port, 0);
                pub const [<$port 1>]: Pin = Pin::new(Port::$port, 1);
                pub const [<$port 2>]: Pin = Pin::new(Port::$port, 2);
                pub const [<$port 3>]: Pin = Pin::new(Port::$port, 3);
                pub const [<$port 4>]: Pin = Pin::new(Port::$port, 4);
                pub const [<$port 5>]: Pin = Pin::new(Port::$port, 5);
                pub const [<$port 6>]: Pin = Pin::new(Port::$port, 6);
                pub const [<$port 7>]: Pin = Pin::new(Port::$port, 7);
            )*
        }
    };
}

/// Named pins, `P00` through `PJ7`.
pub mod pin {
    use super::{Pin, Port};

    port_pins!(P0, P1, P2, P3, P4, P5, P6, P7, P8, P9, PA, PB, PC, PD, PE, PF, PG, PH, PJ);
}

bitflags! {
    /// Auxiliary flags of a PFS register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PfsFlags: u8 {
        /// Route the pin to the IRQ input buffer.
        const ISEL = BIT!(6) as u8;
        /// Analog input; disables the digital input buffer.
        const ASEL = BIT!(7) as u8;
    }
}

bitflags! {
    /// Write-protect register bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Pwpr: u8 {
        /// PFSWE write disable. While set, PFSWE cannot be changed.
        const B0WI = BIT!(7) as u8;
        /// PFS write enable.
        const PFSWE = BIT!(6) as u8;
    }
}

/// Where the MPC registers of one chip variant live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MpcLayout {
    pub pwpr: u32,
    pub pfs_base: u32,
    pub pmr_base: u32,
    pub odr_base: u32,
    pub pidr_base: u32,
    /// Width of the PSEL field at the bottom of each PFS register.
    pub psel_width: u8,
}

impl MpcLayout {
    pub const fn write_protect(&self) -> WriteProtect {
        WriteProtect::new(self.pwpr)
    }

    pub const fn pfs(&self, pin: Pin) -> Register<u8> {
        Register::new(self.pfs_base + pin.port.index() * 8 + pin.bit as u32)
    }

    pub const fn psel(&self, pin: Pin) -> Field<u8> {
        self.pfs(pin).field(0, self.psel_width)
    }

    pub const fn psel_mask(&self) -> u32 {
        BIT_RNG!(0, self.psel_width - 1)
    }

    pub const fn pmr(&self, pin: Pin) -> Bit<u8> {
        Register::new(self.pmr_base + pin.port.index()).bit(pin.bit)
    }

    /// NMOS open-drain enable. ODR0 (pins 0-3) and ODR1 (pins 4-7) are the
    /// low and high bytes of one 16-bit register per port, two bits per pin.
    pub const fn odr(&self, pin: Pin) -> Bit<u8> {
        let addr = self.odr_base + pin.port.index() * 2 + (pin.bit / 4) as u32;
        Register::new(addr).bit((pin.bit % 4) * 2)
    }

    pub const fn pidr(&self, pin: Pin) -> Bit<u8, Ro> {
        Register::<u8, Ro>::new(self.pidr_base + pin.port.index()).bit(pin.bit)
    }

    /// Maps a PFS address back to its pin.
    pub fn decode_pfs(&self, addr: u32) -> Option<Pin> {
        let offset = addr.checked_sub(self.pfs_base)?;
        let port = Port::from_u32(offset / 8)?;
        Some(Pin::new(port, (offset % 8) as u8))
    }

    /// Reads back the current routing of `pin`. Issues reads only.
    pub fn pin_state<B: Bus + ?Sized>(&self, bus: &B, pin: Pin) -> PinState {
        let pfs = self.pfs(pin).read(bus);
        PinState {
            port_mode: self.pmr(pin).get(bus),
            psel: (pfs as u32 & self.psel_mask()) as u8,
            flags: PfsFlags::from_bits_truncate(pfs),
            open_drain: self.odr(pin).get(bus),
        }
    }
}

/// Routing of one pin as currently programmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinState {
    pub port_mode: bool,
    pub psel: u8,
    pub flags: PfsFlags,
    pub open_drain: bool,
}

impl PinState {
    /// What a pin looks like after reset: plain GPIO, no function.
    pub const RESET: PinState = PinState {
        port_mode: false,
        psel: 0,
        flags: PfsFlags::empty(),
        open_drain: false,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GuardState {
    Locked,
    Unlocked,
}

/// The PWPR handshake guarding PFS writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteProtect {
    pwpr: Register<u8>,
}

impl WriteProtect {
    pub const fn new(addr: u32) -> Self {
        WriteProtect {
            pwpr: Register::new(addr),
        }
    }

    pub const fn register(&self) -> Register<u8> {
        self.pwpr
    }

    const fn b0wi(&self) -> Bit<u8> {
        self.pwpr.bit(7)
    }

    const fn pfswe(&self) -> Bit<u8> {
        self.pwpr.bit(6)
    }

    /// Clears B0WI, then sets PFSWE. PFS registers are writable until the
    /// returned handle is closed or dropped.
    ///
    /// Not re-entrant: opening while another [`Unlocked`] is alive relocks the
    /// hardware when the inner one closes.
    pub fn open<'b, B: Bus + ?Sized>(&self, bus: &'b mut B) -> Unlocked<'b, B> {
        self.b0wi().set(bus, false);
        self.pfswe().set(bus, true);
        trace!("pwpr open");
        Unlocked {
            bus,
            pwpr: self.pwpr,
        }
    }

    pub fn state<B: Bus + ?Sized>(&self, bus: &B) -> GuardState {
        let pwpr = Pwpr::from_bits_truncate(self.pwpr.read(bus));
        if pwpr.contains(Pwpr::PFSWE) && !pwpr.contains(Pwpr::B0WI) {
            GuardState::Unlocked
        } else {
            GuardState::Locked
        }
    }
}

/// An open write-protect window. Derefs to the bus it borrowed; relocks on
/// drop with a single write of `B0WI` (which also clears PFSWE).
pub struct Unlocked<'b, B: Bus + ?Sized> {
    bus: &'b mut B,
    pwpr: Register<u8>,
}

impl<'b, B: Bus + ?Sized> Unlocked<'b, B> {
    pub fn close(self) {}
}

impl<'b, B: Bus + ?Sized> Deref for Unlocked<'b, B> {
    type Target = B;

    fn deref(&self) -> &B {
        &*self.bus
    }
}

impl<'b, B: Bus + ?Sized> DerefMut for Unlocked<'b, B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut *self.bus
    }
}

impl<'b, B: Bus + ?Sized> Drop for Unlocked<'b, B> {
    fn drop(&mut self) {
        self.pwpr.write(&mut *self.bus, Pwpr::B0WI.bits());
        trace!("pwpr close");
    }
}
