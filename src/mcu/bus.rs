//! Hardware context.
//!
//! Every register access in this crate goes through a [`Bus`]. On target the
//! bus is [`Mmio`], which performs volatile loads and stores; tests swap in
//! [`crate::mcu::sim::SimBus`] or mock the `read_reg*`/`write_reg*` functions
//! below.

/// Byte-addressed register space with 8, 16 and 32-bit accesses.
///
/// Reads take `&self`: a read never changes what the bus remembers, even
/// though on silicon some status registers clear on read.
pub trait Bus {
    fn read8(&self, addr: u32) -> u8;
    fn read16(&self, addr: u32) -> u16;
    fn read32(&self, addr: u32) -> u32;

    fn write8(&mut self, addr: u32, value: u8);
    fn write16(&mut self, addr: u32, value: u16);
    fn write32(&mut self, addr: u32, value: u32);
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn read8(&self, addr: u32) -> u8 {
        (**self).read8(addr)
    }

    fn read16(&self, addr: u32) -> u16 {
        (**self).read16(addr)
    }

    fn read32(&self, addr: u32) -> u32 {
        (**self).read32(addr)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        (**self).write8(addr, value)
    }

    fn write16(&mut self, addr: u32, value: u16) {
        (**self).write16(addr, value)
    }

    fn write32(&mut self, addr: u32, value: u32) {
        (**self).write32(addr, value)
    }
}

#[cfg_attr(test, mry::mry)]
pub fn read_reg8(addr: u32) -> u8 {
    unsafe { core::ptr::read_volatile(addr as *const u8) }
}

#[cfg_attr(test, mry::mry)]
pub fn read_reg16(addr: u32) -> u16 {
    unsafe { core::ptr::read_volatile(addr as *const u16) }
}

#[cfg_attr(test, mry::mry)]
pub fn read_reg32(addr: u32) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[cfg_attr(test, mry::mry)]
pub fn write_reg8(addr: u32, value: u8) {
    unsafe { core::ptr::write_volatile(addr as *mut u8, value) }
}

#[cfg_attr(test, mry::mry)]
pub fn write_reg16(addr: u32, value: u16) {
    unsafe { core::ptr::write_volatile(addr as *mut u16, value) }
}

#[cfg_attr(test, mry::mry)]
pub fn write_reg32(addr: u32, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

/// The memory-mapped peripheral space of the running chip.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// The caller must be running on a chip whose register map matches the
    /// [`crate::port_map::table::Chip`] it pairs this bus with, and must not
    /// hold a second `Mmio` that is used concurrently.
    pub const unsafe fn new() -> Self {
        Mmio { _private: () }
    }
}

impl Bus for Mmio {
    #[inline(always)]
    fn read8(&self, addr: u32) -> u8 {
        read_reg8(addr)
    }

    #[inline(always)]
    fn read16(&self, addr: u32) -> u16 {
        read_reg16(addr)
    }

    #[inline(always)]
    fn read32(&self, addr: u32) -> u32 {
        read_reg32(addr)
    }

    #[inline(always)]
    fn write8(&mut self, addr: u32, value: u8) {
        write_reg8(addr, value)
    }

    #[inline(always)]
    fn write16(&mut self, addr: u32, value: u16) {
        write_reg16(addr, value)
    }

    #[inline(always)]
    fn write32(&mut self, addr: u32, value: u32) {
        write_reg32(addr, value)
    }
}
