//! An in-memory register space.
//!
//! [`SimBus`] stands in for silicon in tests: memory starts zeroed (a freshly
//! reset chip, apart from whatever is preset), wider accesses alias the
//! underlying bytes little-endian, and every write is appended to a trace.
//! It uses fixed-capacity `heapless` storage so it also works in `no_std`
//! test harnesses on target.

use core::cell::Cell;

use heapless::{FnvIndexMap, Vec};

use crate::mcu::bus::Bus;

/// Distinct byte addresses the simulated space can hold.
pub const SIM_MEMORY: usize = 256;

/// Writes kept in the trace before it stops recording.
pub const SIM_TRACE: usize = 256;

/// One recorded bus write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Write {
    pub addr: u32,
    /// Access width in bits.
    pub width: u8,
    pub value: u32,
}

impl Write {
    pub const fn byte(addr: u32, value: u8) -> Self {
        Write {
            addr,
            width: 8,
            value: value as u32,
        }
    }
}

pub struct SimBus {
    memory: FnvIndexMap<u32, u8, SIM_MEMORY>,
    trace: Vec<Write, SIM_TRACE>,
    reads: Cell<u32>,
    overflowed: bool,
}

impl SimBus {
    pub fn new() -> Self {
        SimBus {
            memory: FnvIndexMap::new(),
            trace: Vec::new(),
            reads: Cell::new(0),
            overflowed: false,
        }
    }

    /// Sets a byte without recording a write, e.g. a register reset value or
    /// an input level.
    pub fn preset8(&mut self, addr: u32, value: u8) {
        self.store(addr, 1, value as u32);
    }

    pub fn preset16(&mut self, addr: u32, value: u16) {
        self.store(addr, 2, value as u32);
    }

    pub fn preset32(&mut self, addr: u32, value: u32) {
        self.store(addr, 4, value);
    }

    /// Reads a byte without counting it as a bus read.
    pub fn peek8(&self, addr: u32) -> u8 {
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    /// Every write since construction or the last [`SimBus::clear_trace`].
    pub fn writes(&self) -> &[Write] {
        &self.trace
    }

    /// Writes that landed on `addr`, in order.
    pub fn writes_to(&self, addr: u32) -> impl Iterator<Item = &Write> + '_ {
        self.trace.iter().filter(move |w| w.addr == addr)
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
        self.reads.set(0);
    }

    pub fn read_count(&self) -> u32 {
        self.reads.get()
    }

    /// True once memory or the trace ran out of room; results after that
    /// point are incomplete.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    fn load(&self, addr: u32, bytes: u32) -> u32 {
        self.reads.set(self.reads.get() + 1);
        (0..bytes).fold(0, |acc, i| acc | (self.peek8(addr + i) as u32) << (8 * i))
    }

    fn store(&mut self, addr: u32, bytes: u32, value: u32) {
        for i in 0..bytes {
            let byte = (value >> (8 * i)) as u8;
            if self.memory.insert(addr + i, byte).is_err() {
                self.overflowed = true;
            }
        }
    }

    fn record(&mut self, addr: u32, width: u8, value: u32) {
        if self.trace.push(Write { addr, width, value }).is_err() {
            self.overflowed = true;
        }
        self.store(addr, width as u32 / 8, value);
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimBus {
    fn read8(&self, addr: u32) -> u8 {
        self.load(addr, 1) as u8
    }

    fn read16(&self, addr: u32) -> u16 {
        self.load(addr, 2) as u16
    }

    fn read32(&self, addr: u32) -> u32 {
        self.load(addr, 4)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.record(addr, 8, value as u32);
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.record(addr, 16, value as u32);
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.record(addr, 32, value);
    }
}
