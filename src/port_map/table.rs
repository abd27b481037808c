//! Candidate tables: which pins can carry which peripheral, per chip.
//!
//! Tables are plain `const` data. The resolver only ever looks things up in
//! them; nothing here touches hardware.

use bitflags::bitflags;

use crate::mcu::mpc::{MpcLayout, PfsFlags, Pin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Sci1,
    Sci5,
    Sci6,
    Riic0,
    Rspi0,
    Mtu0,
    Mtu3,
    Gpt0,
}

/// Timer I/O line of a multi-channel peripheral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
    C,
    D,
}

/// Which alternative pin set to use.
///
/// `User` hands the request to the registered [`crate::port_map::UserFunction`];
/// `Bypass` means pins are configured elsewhere and nothing is done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Order {
    #[default]
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    User,
    Bypass,
}

/// Extra wiring layered on top of a pin set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OptionalMode {
    #[default]
    None,
    /// Simple I2C: data lines become open-drain.
    I2c,
    /// Clocked serial: the clock line is routed too.
    Spi,
}

bitflags! {
    /// How a slot reacts to the [`OptionalMode`] of a request.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SlotPolicy: u8 {
        /// Drive the pin open-drain in `OptionalMode::I2c`.
        const OPEN_DRAIN_ON_I2C = 1 << 0;
        /// Only route this pin in `OptionalMode::Spi`.
        const SPI_ONLY = 1 << 1;
    }
}

/// What one pin must be programmed with to carry one signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAssign {
    pub pin: Pin,
    pub psel: u8,
    pub flags: PfsFlags,
    pub policy: SlotPolicy,
}

impl SlotAssign {
    pub const fn new(pin: Pin, psel: u8) -> Self {
        SlotAssign {
            pin,
            psel,
            flags: PfsFlags::empty(),
            policy: SlotPolicy::empty(),
        }
    }

    pub const fn with_flags(self, flags: PfsFlags) -> Self {
        SlotAssign { flags, ..self }
    }

    pub const fn with_policy(self, policy: SlotPolicy) -> Self {
        SlotAssign { policy, ..self }
    }

    pub const fn with_psel(self, psel: u8) -> Self {
        SlotAssign { psel, ..self }
    }

    /// Whether this slot takes part in a request made with `mode`.
    pub fn applies(&self, mode: OptionalMode) -> bool {
        mode == OptionalMode::Spi || !self.policy.contains(SlotPolicy::SPI_ONLY)
    }

    /// Register values for this slot. Disabling always yields the all-zero
    /// function code; the open-drain bit is only touched when the mode's
    /// policy covers this slot.
    pub fn setting(&self, enable: bool, mode: OptionalMode) -> SlotSetting {
        let open_drain = if mode == OptionalMode::I2c
            && self.policy.contains(SlotPolicy::OPEN_DRAIN_ON_I2C)
        {
            Some(enable)
        } else {
            None
        };

        if enable {
            SlotSetting {
                port_mode: true,
                psel: self.psel,
                flags: self.flags,
                open_drain,
            }
        } else {
            SlotSetting {
                port_mode: false,
                psel: 0,
                flags: PfsFlags::empty(),
                open_drain,
            }
        }
    }
}

/// Resolved register values for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotSetting {
    pub port_mode: bool,
    pub psel: u8,
    pub flags: PfsFlags,
    /// `None` leaves the open-drain bit alone.
    pub open_drain: Option<bool>,
}

/// A pin set that can carry `peripheral` for one `order`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub peripheral: Peripheral,
    pub order: Order,
    pub slots: &'static [SlotAssign],
}

/// A single timer line for one `(peripheral, channel, order)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelCandidate {
    pub peripheral: Peripheral,
    pub channel: Channel,
    pub order: Order,
    pub slot: SlotAssign,
    /// Function code for the inverted-polarity output, if the pin has one.
    pub inverted_psel: Option<u8>,
}

/// The pin sampled by `probe_clock_line_state` for `order`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSense {
    pub order: Order,
    pub pin: Pin,
}

/// Everything the resolver needs to know about one chip variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chip {
    pub name: &'static str,
    pub layout: MpcLayout,
    pub candidates: &'static [Candidate],
    pub channels: &'static [ChannelCandidate],
    pub clock_sense: &'static [ClockSense],
    /// Whether any timer output on this chip can be inverted.
    pub supports_inversion: bool,
}

impl Chip {
    pub fn candidate(&self, peripheral: Peripheral, order: Order) -> Option<&'static Candidate> {
        let candidates: &'static [Candidate] = self.candidates;
        candidates
            .iter()
            .find(|c| c.peripheral == peripheral && c.order == order)
    }

    pub fn channel(
        &self,
        peripheral: Peripheral,
        channel: Channel,
        order: Order,
    ) -> Option<&'static ChannelCandidate> {
        let channels: &'static [ChannelCandidate] = self.channels;
        channels
            .iter()
            .find(|c| c.peripheral == peripheral && c.channel == channel && c.order == order)
    }

    pub fn clock_sense(&self, order: Order) -> Option<Pin> {
        self.clock_sense
            .iter()
            .find(|s| s.order == order)
            .map(|s| s.pin)
    }

    /// All pin sets registered for `peripheral`.
    pub fn candidates_for(&self, peripheral: Peripheral) -> impl Iterator<Item = &'static Candidate> {
        let candidates: &'static [Candidate] = self.candidates;
        candidates.iter().filter(move |c| c.peripheral == peripheral)
    }

    /// Every pin any pin set or timer line of `peripheral` may touch.
    pub fn pins_of(&self, peripheral: Peripheral) -> impl Iterator<Item = Pin> {
        let channels: &'static [ChannelCandidate] = self.channels;
        self.candidates_for(peripheral)
            .flat_map(|c| c.slots.iter().map(|s| s.pin))
            .chain(
                channels
                    .iter()
                    .filter(move |c| c.peripheral == peripheral)
                    .map(|c| c.slot.pin),
            )
    }
}
