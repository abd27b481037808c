//! Peripheral port resolver.
//!
//! [`PortMap::turn`] routes a peripheral's signals onto one of the pin sets the
//! chip table offers for it. A request is resolved completely before anything
//! is written: an unknown `(peripheral, order)` is refused with the
//! write-protect guard still closed and every register untouched. Only then
//! is the guard opened, each pin switched in table order, and the guard
//! closed again.
//!
//! There is no locking. Two contexts turning pins at the same time will close
//! each other's write-protect window; see [`PortMap::turn_exclusive`].

pub mod error;
pub mod slot;
pub mod table;

use crate::mcu::bus::Bus;
use crate::mcu::mpc::{Pin, PinState};
use crate::port_map::error::TurnError;
use crate::port_map::slot::PinFunctionSlot;
use crate::port_map::table::{
    Candidate, Channel, ChannelCandidate, Chip, OptionalMode, Order, Peripheral, SlotAssign,
};

/// Strategy for `Order::User`: the caller routes pins itself, guard included.
pub trait UserFunction {
    fn turn(&mut self, peripheral: Peripheral, enable: bool) -> bool;

    /// Defaults to [`UserFunction::turn`] for the whole peripheral.
    fn turn_channel(&mut self, peripheral: Peripheral, channel: Channel, enable: bool) -> bool {
        let _ = channel;
        self.turn(peripheral, enable)
    }
}

impl<F> UserFunction for F
where
    F: FnMut(Peripheral, bool) -> bool,
{
    fn turn(&mut self, peripheral: Peripheral, enable: bool) -> bool {
        self(peripheral, enable)
    }
}

/// Outcome of looking a request up, before any hardware access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing to do.
    Bypass,
    /// Hand the request to the user function.
    Delegate,
    /// Program this pin set.
    Apply(&'static Candidate),
}

/// Like [`Resolution`] for a single timer line, with the function code to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelResolution {
    Bypass,
    Delegate,
    Apply {
        entry: &'static ChannelCandidate,
        psel: u8,
    },
}

pub struct PortMap<'a, B: Bus> {
    bus: B,
    chip: &'a Chip,
    user: Option<&'a mut dyn UserFunction>,
}

impl<'a, B: Bus> PortMap<'a, B> {
    pub fn new(bus: B, chip: &'a Chip) -> Self {
        PortMap {
            bus,
            chip,
            user: None,
        }
    }

    pub fn chip(&self) -> &'a Chip {
        self.chip
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// Registers the handler for `Order::User` requests, replacing any
    /// previous one.
    pub fn set_user_function(&mut self, user: &'a mut dyn UserFunction) {
        self.user = Some(user);
    }

    pub fn clear_user_function(&mut self) {
        self.user = None;
    }

    /// Looks `(peripheral, order)` up without touching hardware.
    pub fn resolve(&self, peripheral: Peripheral, order: Order) -> Result<Resolution, TurnError> {
        match order {
            Order::Bypass => Ok(Resolution::Bypass),
            Order::User => match self.user {
                Some(_) => Ok(Resolution::Delegate),
                None => Err(TurnError::MissingUserCallback),
            },
            _ => self
                .chip
                .candidate(peripheral, order)
                .map(Resolution::Apply)
                .ok_or(TurnError::UnsupportedCandidate { peripheral, order }),
        }
    }

    /// Looks `(peripheral, channel, order)` up without touching hardware.
    pub fn resolve_channel(
        &self,
        peripheral: Peripheral,
        channel: Channel,
        order: Order,
        invert: bool,
    ) -> Result<ChannelResolution, TurnError> {
        match order {
            Order::Bypass => return Ok(ChannelResolution::Bypass),
            Order::User => {
                return match self.user {
                    Some(_) => Ok(ChannelResolution::Delegate),
                    None => Err(TurnError::MissingUserCallback),
                }
            }
            _ => {}
        }

        if invert && !self.chip.supports_inversion {
            return Err(TurnError::UnsupportedInversion { peripheral, channel });
        }

        let entry = self
            .chip
            .channel(peripheral, channel, order)
            .ok_or(TurnError::UnsupportedChannel {
                peripheral,
                channel,
                order,
            })?;

        let psel = if invert {
            entry
                .inverted_psel
                .ok_or(TurnError::UnsupportedInversion { peripheral, channel })?
        } else {
            entry.slot.psel
        };

        Ok(ChannelResolution::Apply { entry, psel })
    }

    /// Routes (`enable`) or unroutes `peripheral` on the pin set `order`.
    ///
    /// Either every slot of the pin set is switched or, on error, no
    /// register is written at all.
    pub fn try_turn(
        &mut self,
        peripheral: Peripheral,
        enable: bool,
        order: Order,
        mode: OptionalMode,
    ) -> Result<(), TurnError> {
        debug!("turn {} enable={} order={} mode={}", peripheral, enable, order, mode);

        let resolution = self.resolve(peripheral, order).map_err(|e| {
            warn!("turn refused: {}", e);
            e
        })?;

        match resolution {
            Resolution::Bypass => Ok(()),
            Resolution::Delegate => self.delegate(peripheral, enable),
            Resolution::Apply(candidate) => {
                let slots = candidate.slots.iter().filter(|s| s.applies(mode));
                self.apply(slots, enable, mode);
                Ok(())
            }
        }
    }

    /// [`PortMap::try_turn`] with the error reduced to `false`.
    pub fn turn(&mut self, peripheral: Peripheral, enable: bool, order: Order, mode: OptionalMode) -> bool {
        self.try_turn(peripheral, enable, order, mode).is_ok()
    }

    /// Routes `peripheral` on its first pin set with no optional mode.
    pub fn enable(&mut self, peripheral: Peripheral) -> bool {
        self.turn(peripheral, true, Order::default(), OptionalMode::default())
    }

    pub fn disable(&mut self, peripheral: Peripheral) -> bool {
        self.turn(peripheral, false, Order::default(), OptionalMode::default())
    }

    /// [`PortMap::turn`] inside a critical section, for pin changes that may
    /// race with interrupt handlers doing the same.
    pub fn turn_exclusive(
        &mut self,
        peripheral: Peripheral,
        enable: bool,
        order: Order,
        mode: OptionalMode,
    ) -> bool {
        critical_section::with(|_| self.turn(peripheral, enable, order, mode))
    }

    /// Routes one timer line. `invert` selects the inverted-polarity code.
    pub fn try_turn_channel(
        &mut self,
        peripheral: Peripheral,
        channel: Channel,
        enable: bool,
        order: Order,
        invert: bool,
    ) -> Result<(), TurnError> {
        debug!(
            "turn {} channel={} enable={} order={} invert={}",
            peripheral, channel, enable, order, invert
        );

        let resolution = self
            .resolve_channel(peripheral, channel, order, invert)
            .map_err(|e| {
                warn!("turn refused: {}", e);
                e
            })?;

        match resolution {
            ChannelResolution::Bypass => Ok(()),
            ChannelResolution::Delegate => {
                let accepted = self
                    .user
                    .as_mut()
                    .map_or(false, |user| user.turn_channel(peripheral, channel, enable));
                if accepted {
                    Ok(())
                } else {
                    Err(TurnError::UserFunctionRejected { peripheral })
                }
            }
            ChannelResolution::Apply { entry, psel } => {
                let slot = entry.slot.with_psel(psel);
                self.apply(core::iter::once(&slot), enable, OptionalMode::None);
                Ok(())
            }
        }
    }

    pub fn turn_channel(
        &mut self,
        peripheral: Peripheral,
        channel: Channel,
        enable: bool,
        order: Order,
        invert: bool,
    ) -> bool {
        self.try_turn_channel(peripheral, channel, enable, order, invert)
            .is_ok()
    }

    /// Routes one timer line on its first pin, non-inverted.
    pub fn enable_channel(&mut self, peripheral: Peripheral, channel: Channel) -> bool {
        self.turn_channel(peripheral, channel, true, Order::default(), false)
    }

    pub fn disable_channel(&mut self, peripheral: Peripheral, channel: Channel) -> bool {
        self.turn_channel(peripheral, channel, false, Order::default(), false)
    }

    /// Samples the clock-sense pin for `order`. Reads only; the write-protect
    /// guard is not involved. `false` when the chip has no such pin.
    pub fn probe_clock_line_state(&self, order: Order) -> bool {
        match self.chip.clock_sense(order) {
            Some(pin) => self.chip.layout.pidr(pin).get(&self.bus),
            None => false,
        }
    }

    /// Current routing of `pin`, read back from hardware.
    pub fn pin_state(&self, pin: Pin) -> PinState {
        self.chip.layout.pin_state(&self.bus, pin)
    }

    fn delegate(&mut self, peripheral: Peripheral, enable: bool) -> Result<(), TurnError> {
        let accepted = self
            .user
            .as_mut()
            .map_or(false, |user| user.turn(peripheral, enable));
        if accepted {
            Ok(())
        } else {
            Err(TurnError::UserFunctionRejected { peripheral })
        }
    }

    fn apply<'s, I>(&mut self, slots: I, enable: bool, mode: OptionalMode)
    where
        I: Iterator<Item = &'s SlotAssign>,
    {
        let layout = self.chip.layout;
        let mut unlocked = layout.write_protect().open(&mut self.bus);
        for assign in slots {
            trace!("switch pin {} psel={}", assign.pin, assign.psel);
            PinFunctionSlot::new(&layout, assign.pin).switch(&mut unlocked, assign.setting(enable, mode));
        }
        unlocked.close();
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use mry::Any;

    use super::*;
    use crate::chips::{rx24t, rx64m};
    use crate::mcu::bus::{mock_read_reg8, mock_write_reg8, read_reg8, write_reg8, Mmio};
    use crate::mcu::mpc::pin::*;
    use crate::mcu::mpc::{GuardState, MpcLayout, Pwpr};
    use crate::mcu::sim::{SimBus, Write};

    const CHIPS: [&Chip; 2] = [&rx24t::CHIP, &rx64m::CHIP];

    /// A bus in reset state: PWPR locked, everything else zero.
    fn reset_bus(chip: &Chip) -> SimBus {
        let mut bus = SimBus::new();
        bus.preset8(chip.layout.pwpr, Pwpr::B0WI.bits());
        bus
    }

    fn pin_states<B: Bus>(map: &PortMap<'_, B>, peripheral: Peripheral) -> heapless::Vec<PinState, 32> {
        map.chip()
            .pins_of(peripheral)
            .map(|pin| map.pin_state(pin))
            .collect()
    }

    /// Tests the UART scenario end to end.
    ///
    /// SCI1 on its first pin set without an optional mode switches RXD then
    /// TXD, three writes each, inside a single guard window. SCK is SPI-only
    /// and must not be touched.
    #[test]
    fn test_sci1_first_uart_write_trace() {
        let chip = &rx24t::CHIP;
        let layout = chip.layout;
        let pmr_pd = layout.pmr(PD5).register().addr();

        let mut map = PortMap::new(reset_bus(chip), chip);
        assert!(map.turn(Peripheral::Sci1, true, Order::First, OptionalMode::None));

        let bus = map.release();
        assert_eq!(
            bus.writes(),
            &[
                Write::byte(layout.pwpr, 0x00),
                Write::byte(layout.pwpr, Pwpr::PFSWE.bits()),
                // RXD1
                Write::byte(pmr_pd, 0x00),
                Write::byte(layout.pfs(PD5).addr(), rx24t::PSEL_SCI),
                Write::byte(pmr_pd, 0x20),
                // TXD1
                Write::byte(pmr_pd, 0x20),
                Write::byte(layout.pfs(PD3).addr(), rx24t::PSEL_SCI),
                Write::byte(pmr_pd, 0x28),
                Write::byte(layout.pwpr, Pwpr::B0WI.bits()),
            ]
        );
        assert_eq!(layout.write_protect().state(&bus), GuardState::Locked);
    }

    #[test]
    fn test_round_trip_restores_reset_state() {
        for chip in CHIPS {
            for candidate in chip.candidates {
                for mode in [OptionalMode::None, OptionalMode::I2c, OptionalMode::Spi] {
                    let mut map = PortMap::new(reset_bus(chip), chip);
                    let p = candidate.peripheral;

                    assert!(map.turn(p, true, candidate.order, mode));
                    assert!(map.turn(p, false, candidate.order, mode));

                    for slot in candidate.slots {
                        assert_eq!(
                            map.pin_state(slot.pin),
                            PinState::RESET,
                            "{} {:?} {:?} {:?}",
                            chip.name,
                            p,
                            candidate.order,
                            slot.pin
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_enable_twice_matches_enable_once() {
        for chip in CHIPS {
            for candidate in chip.candidates {
                let p = candidate.peripheral;

                let mut once = PortMap::new(reset_bus(chip), chip);
                assert!(once.turn(p, true, candidate.order, OptionalMode::Spi));

                let mut twice = PortMap::new(reset_bus(chip), chip);
                assert!(twice.turn(p, true, candidate.order, OptionalMode::Spi));
                assert!(twice.turn(p, true, candidate.order, OptionalMode::Spi));

                assert_eq!(pin_states(&once, p), pin_states(&twice, p));
                assert_eq!(
                    once.bus().peek8(chip.layout.pwpr),
                    twice.bus().peek8(chip.layout.pwpr)
                );
            }
        }
    }

    #[test]
    fn test_enabled_pins_carry_stored_code() {
        let chip = &rx24t::CHIP;
        let mut map = PortMap::new(reset_bus(chip), chip);

        assert!(map.turn(Peripheral::Rspi0, true, Order::Second, OptionalMode::None));

        for slot in chip.candidate(Peripheral::Rspi0, Order::Second).unwrap().slots {
            let state = map.pin_state(slot.pin);
            assert!(state.port_mode);
            assert_eq!(state.psel, slot.psel);
        }
    }

    #[test]
    fn test_bypass_writes_nothing() {
        for mode in [OptionalMode::None, OptionalMode::I2c, OptionalMode::Spi] {
            for enable in [true, false] {
                let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
                assert!(map.turn(Peripheral::Sci1, enable, Order::Bypass, mode));
                assert!(map.turn(Peripheral::Gpt0, enable, Order::Bypass, mode));
                assert!(map.bus().writes().is_empty());
                assert_eq!(map.bus().read_count(), 0);
            }
        }
    }

    #[test]
    #[mry::lock(read_reg8, write_reg8)]
    fn test_bypass_over_mmio_writes_nothing() {
        mock_read_reg8(Any).returns(0);
        mock_write_reg8(Any, Any).returns(());

        let mut map = PortMap::new(unsafe { Mmio::new() }, &rx24t::CHIP);
        assert!(map.turn(Peripheral::Sci5, true, Order::Bypass, OptionalMode::None));

        mock_write_reg8(Any, Any).assert_called(0);
    }

    /// Checks the trace of one successful turn.
    ///
    /// The guard opens with the first two writes, closes with the last and
    /// is not touched in between. Every PFS write sits inside that window and
    /// each `(pin, pfs)` sees its PMR bit cleared, then its PFS written, then
    /// its PMR bit written back to `port_mode`.
    fn assert_switch_trace(layout: &MpcLayout, writes: &[Write], slots: &[(Pin, u32)], port_mode: bool) {
        let pwpr = layout.pwpr;
        let n = writes.len();
        assert!(n >= 3 + 3 * slots.len());
        assert_eq!(writes[0], Write::byte(pwpr, 0x00));
        assert_eq!(writes[1], Write::byte(pwpr, Pwpr::PFSWE.bits()));
        assert_eq!(writes[n - 1], Write::byte(pwpr, Pwpr::B0WI.bits()));
        assert!(writes[2..n - 1].iter().all(|w| w.addr != pwpr));
        for (i, w) in writes.iter().enumerate() {
            if layout.decode_pfs(w.addr).is_some() {
                assert!(i > 1 && i < n - 1);
            }
        }

        for &(pin, value) in slots {
            let pmr = layout.pmr(pin);
            let bit = pmr.mask();
            let pmr_addr = pmr.register().addr();
            let pfs = writes
                .iter()
                .position(|w| w.addr == layout.pfs(pin).addr())
                .unwrap();
            let cleared = writes[..pfs].iter().rposition(|w| w.addr == pmr_addr).unwrap();
            let set = pfs + writes[pfs..].iter().position(|w| w.addr == pmr_addr).unwrap();

            assert_eq!(writes[cleared].value & bit, 0, "{:?}", pin);
            assert_eq!(writes[pfs].value, value, "{:?}", pin);
            assert_eq!(writes[set].value & bit, if port_mode { bit } else { 0 }, "{:?}", pin);
        }
    }

    #[test]
    fn test_pin_set_turns_are_bracketed_and_ordered() {
        for chip in CHIPS {
            for candidate in chip.candidates {
                let p = candidate.peripheral;
                for mode in [OptionalMode::None, OptionalMode::I2c, OptionalMode::Spi] {
                    for enable in [true, false] {
                        let mut map = PortMap::new(reset_bus(chip), chip);
                        if !enable {
                            assert!(map.turn(p, true, candidate.order, mode));
                            map.bus_mut().clear_trace();
                        }
                        assert!(map.turn(p, enable, candidate.order, mode));

                        let slots: heapless::Vec<(Pin, u32), 8> = candidate
                            .slots
                            .iter()
                            .filter(|s| s.applies(mode))
                            .map(|s| {
                                let value = if enable {
                                    s.psel as u32 | s.flags.bits() as u32
                                } else {
                                    0
                                };
                                (s.pin, value)
                            })
                            .collect();
                        assert_switch_trace(&chip.layout, map.bus().writes(), &slots, enable);
                    }
                }
            }
        }
    }

    #[test]
    fn test_channel_turns_are_bracketed_and_ordered() {
        for chip in CHIPS {
            for entry in chip.channels {
                let inverts: &[bool] = if entry.inverted_psel.is_some() {
                    &[false, true]
                } else {
                    &[false]
                };
                for &invert in inverts {
                    for enable in [true, false] {
                        let mut map = PortMap::new(reset_bus(chip), chip);
                        if !enable {
                            assert!(map.turn_channel(entry.peripheral, entry.channel, true, entry.order, invert));
                            map.bus_mut().clear_trace();
                        }
                        assert!(map.turn_channel(entry.peripheral, entry.channel, enable, entry.order, invert));

                        let psel = match (invert, entry.inverted_psel) {
                            (true, Some(inverted)) => inverted,
                            _ => entry.slot.psel,
                        };
                        let value = if enable {
                            psel as u32 | entry.slot.flags.bits() as u32
                        } else {
                            0
                        };
                        let writes = map.bus().writes();
                        // guard open (2) + slot (3) + guard close (1)
                        assert_eq!(writes.len(), 6);
                        assert_switch_trace(&chip.layout, writes, &[(entry.slot.pin, value)], enable);
                    }
                }
            }
        }
    }

    #[test]
    fn test_inverted_gpt_disable_trace() {
        let chip = &rx64m::CHIP;
        let layout = chip.layout;
        let entry = chip.channel(Peripheral::Gpt0, Channel::B, Order::First).unwrap();
        let pin = entry.slot.pin;
        let pmr = layout.pmr(pin).register().addr();

        let mut map = PortMap::new(reset_bus(chip), chip);
        assert!(map.turn_channel(Peripheral::Gpt0, Channel::B, true, Order::First, true));
        assert_eq!(map.pin_state(pin).psel, rx64m::PSEL_GPT_INV);
        map.bus_mut().clear_trace();

        assert!(map.turn_channel(Peripheral::Gpt0, Channel::B, false, Order::First, true));
        assert_eq!(
            map.bus().writes(),
            &[
                Write::byte(layout.pwpr, 0x00),
                Write::byte(layout.pwpr, Pwpr::PFSWE.bits()),
                Write::byte(pmr, 0x00),
                Write::byte(layout.pfs(pin).addr(), 0x00),
                Write::byte(pmr, 0x00),
                Write::byte(layout.pwpr, Pwpr::B0WI.bits()),
            ]
        );
        assert_eq!(map.pin_state(pin), PinState::RESET);
    }

    #[test]
    fn test_unknown_order_leaves_no_trace() {
        let chip = &rx24t::CHIP;
        let mut map = PortMap::new(reset_bus(chip), chip);

        // Program SCI5 first so the snapshot is not trivially all-zero.
        assert!(map.turn(Peripheral::Sci5, true, Order::First, OptionalMode::Spi));
        map.bus_mut().clear_trace();
        let before = pin_states(&map, Peripheral::Sci5);
        let pwpr = map.bus().peek8(chip.layout.pwpr);

        assert_eq!(
            map.try_turn(Peripheral::Sci5, false, Order::Third, OptionalMode::None),
            Err(TurnError::UnsupportedCandidate {
                peripheral: Peripheral::Sci5,
                order: Order::Third,
            })
        );
        assert!(!map.turn(Peripheral::Riic0, true, Order::Second, OptionalMode::None));

        assert!(map.bus().writes().is_empty());
        assert_eq!(pin_states(&map, Peripheral::Sci5), before);
        assert_eq!(map.bus().peek8(chip.layout.pwpr), pwpr);
    }

    #[test]
    fn test_peripheral_missing_from_chip_is_rejected() {
        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        assert!(!map.enable(Peripheral::Gpt0));
        assert!(map.bus().writes().is_empty());
    }

    #[test]
    fn test_i2c_mode_sets_open_drain_on_data_lines() {
        let chip = &rx24t::CHIP;
        let mut map = PortMap::new(reset_bus(chip), chip);

        assert!(map.turn(Peripheral::Sci1, true, Order::First, OptionalMode::I2c));
        assert!(map.pin_state(PD5).open_drain);
        assert!(map.pin_state(PD3).open_drain);
        // SCK is SPI only
        assert_eq!(map.pin_state(PD4), PinState::RESET);

        assert!(map.turn(Peripheral::Sci1, false, Order::First, OptionalMode::I2c));
        assert!(!map.pin_state(PD5).open_drain);
        assert!(!map.pin_state(PD3).open_drain);
    }

    #[test]
    fn test_spi_mode_routes_clock_line() {
        let chip = &rx24t::CHIP;
        let mut map = PortMap::new(reset_bus(chip), chip);

        assert!(map.turn(Peripheral::Sci1, true, Order::First, OptionalMode::Spi));
        let sck = map.pin_state(PD4);
        assert!(sck.port_mode);
        assert_eq!(sck.psel, rx24t::PSEL_SCI);
        assert!(!sck.open_drain);
    }

    #[test]
    fn test_user_order_delegates_without_touching_registers() {
        let calls = Cell::new(0);
        let mut user = |p: Peripheral, enable: bool| {
            calls.set(calls.get() + 1);
            p == Peripheral::Sci6 && enable
        };

        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        map.set_user_function(&mut user);

        assert!(map.turn(Peripheral::Sci6, true, Order::User, OptionalMode::None));
        assert_eq!(
            map.try_turn(Peripheral::Sci6, false, Order::User, OptionalMode::None),
            Err(TurnError::UserFunctionRejected {
                peripheral: Peripheral::Sci6
            })
        );
        assert!(map.bus().writes().is_empty());

        drop(map);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_user_order_without_callback_fails() {
        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        assert_eq!(
            map.try_turn(Peripheral::Sci1, true, Order::User, OptionalMode::None),
            Err(TurnError::MissingUserCallback)
        );
        assert_eq!(
            map.try_turn_channel(Peripheral::Mtu0, Channel::A, true, Order::User, false),
            Err(TurnError::MissingUserCallback)
        );
        assert!(map.bus().writes().is_empty());
    }

    #[test]
    fn test_clear_user_function() {
        let mut user = |_: Peripheral, _: bool| true;
        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);

        map.set_user_function(&mut user);
        assert!(map.turn(Peripheral::Sci1, true, Order::User, OptionalMode::None));
        map.clear_user_function();
        assert!(!map.turn(Peripheral::Sci1, true, Order::User, OptionalMode::None));
    }

    #[test]
    fn test_user_closure_handles_channel_turns() {
        let calls = Cell::new(0);
        let mut user = |p: Peripheral, enable: bool| {
            calls.set(calls.get() + 1);
            p == Peripheral::Mtu0 && enable
        };

        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        map.set_user_function(&mut user);

        assert_eq!(
            map.try_turn_channel(Peripheral::Mtu0, Channel::A, true, Order::User, false),
            Ok(())
        );
        assert_eq!(
            map.try_turn_channel(Peripheral::Mtu0, Channel::A, false, Order::User, false),
            Err(TurnError::UserFunctionRejected {
                peripheral: Peripheral::Mtu0
            })
        );
        assert!(map.bus().writes().is_empty());

        drop(map);
        assert_eq!(calls.get(), 2);
    }

    struct TimerUser {
        last: Option<(Peripheral, Channel, bool)>,
    }

    impl UserFunction for TimerUser {
        fn turn(&mut self, _: Peripheral, _: bool) -> bool {
            false
        }

        fn turn_channel(&mut self, peripheral: Peripheral, channel: Channel, enable: bool) -> bool {
            self.last = Some((peripheral, channel, enable));
            true
        }
    }

    #[test]
    fn test_user_channel_delegation() {
        let mut user = TimerUser { last: None };
        {
            let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
            map.set_user_function(&mut user);
            assert!(map.turn_channel(Peripheral::Mtu3, Channel::B, true, Order::User, false));
            assert!(!map.turn(Peripheral::Mtu3, true, Order::User, OptionalMode::None));
            assert!(map.bus().writes().is_empty());
        }
        assert_eq!(user.last, Some((Peripheral::Mtu3, Channel::B, true)));
    }

    #[test]
    fn test_channel_turn_switches_single_pin() {
        let chip = &rx24t::CHIP;
        let mut map = PortMap::new(reset_bus(chip), chip);
        let entry = chip.channel(Peripheral::Mtu0, Channel::C, Order::First).unwrap();

        assert!(map.turn_channel(Peripheral::Mtu0, Channel::C, true, Order::First, false));
        // guard open (2) + slot (3) + guard close (1)
        assert_eq!(map.bus().writes().len(), 6);
        let state = map.pin_state(entry.slot.pin);
        assert!(state.port_mode);
        assert_eq!(state.psel, entry.slot.psel);

        assert!(map.turn_channel(Peripheral::Mtu0, Channel::C, false, Order::First, false));
        assert_eq!(map.pin_state(entry.slot.pin), PinState::RESET);
    }

    #[test]
    fn test_channel_shorthands_use_first_pin_non_inverted() {
        let chip = &rx24t::CHIP;
        let entry = chip.channel(Peripheral::Mtu0, Channel::C, Order::First).unwrap();

        let mut short = PortMap::new(reset_bus(chip), chip);
        let mut full = PortMap::new(reset_bus(chip), chip);
        assert!(short.enable_channel(Peripheral::Mtu0, Channel::C));
        assert!(full.turn_channel(Peripheral::Mtu0, Channel::C, true, Order::First, false));
        assert_eq!(short.bus().writes(), full.bus().writes());
        assert_eq!(short.pin_state(entry.slot.pin).psel, entry.slot.psel);

        assert!(short.disable_channel(Peripheral::Mtu0, Channel::C));
        assert_eq!(short.pin_state(entry.slot.pin), PinState::RESET);

        // No first pin for this line
        assert!(!short.enable_channel(Peripheral::Gpt0, Channel::A));
    }

    #[test]
    fn test_channel_unknown_is_rejected() {
        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        assert_eq!(
            map.try_turn_channel(Peripheral::Mtu3, Channel::D, true, Order::First, false),
            Err(TurnError::UnsupportedChannel {
                peripheral: Peripheral::Mtu3,
                channel: Channel::D,
                order: Order::First,
            })
        );
        assert!(map.bus().writes().is_empty());
    }

    #[test]
    fn test_inversion_rejected_on_chip_without_support() {
        let mut map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        assert_eq!(
            map.try_turn_channel(Peripheral::Mtu0, Channel::A, true, Order::First, true),
            Err(TurnError::UnsupportedInversion {
                peripheral: Peripheral::Mtu0,
                channel: Channel::A,
            })
        );
        assert!(map.bus().writes().is_empty());
    }

    #[test]
    fn test_inversion_uses_inverted_code() {
        let chip = &rx64m::CHIP;
        let mut map = PortMap::new(reset_bus(chip), chip);
        let entry = chip.channel(Peripheral::Gpt0, Channel::A, Order::First).unwrap();

        assert!(map.turn_channel(Peripheral::Gpt0, Channel::A, true, Order::First, true));
        assert_eq!(map.pin_state(entry.slot.pin).psel, entry.inverted_psel.unwrap());

        assert!(map.turn_channel(Peripheral::Gpt0, Channel::A, true, Order::First, false));
        assert_eq!(map.pin_state(entry.slot.pin).psel, entry.slot.psel);
    }

    #[test]
    fn test_inversion_rejected_on_pin_without_inverted_code() {
        let mut map = PortMap::new(reset_bus(&rx64m::CHIP), &rx64m::CHIP);
        assert!(!map.turn_channel(Peripheral::Mtu0, Channel::A, true, Order::First, true));
        assert!(map.bus().writes().is_empty());
    }

    #[test]
    fn test_probe_clock_line_reads_only() {
        let chip = &rx24t::CHIP;
        let sense = chip.clock_sense(Order::First).unwrap();
        let mut bus = reset_bus(chip);
        bus.preset8(chip.layout.pidr(sense).register().addr(), chip.layout.pidr(sense).mask() as u8);

        let map = PortMap::new(bus, chip);
        assert!(map.probe_clock_line_state(Order::First));
        assert!(!map.probe_clock_line_state(Order::Sixth));
        assert!(!map.probe_clock_line_state(Order::Bypass));
        assert!(map.bus().writes().is_empty());
    }

    #[test]
    fn test_probe_clock_line_low() {
        let map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);
        assert!(!map.probe_clock_line_state(Order::First));
    }

    #[test]
    fn test_turn_exclusive_matches_turn() {
        let chip = &rx24t::CHIP;
        let mut plain = PortMap::new(reset_bus(chip), chip);
        let mut exclusive = PortMap::new(reset_bus(chip), chip);

        assert!(plain.turn(Peripheral::Riic0, true, Order::First, OptionalMode::None));
        assert!(exclusive.turn_exclusive(Peripheral::Riic0, true, Order::First, OptionalMode::None));
        assert_eq!(plain.bus().writes(), exclusive.bus().writes());

        assert!(!exclusive.turn_exclusive(Peripheral::Riic0, true, Order::Fifth, OptionalMode::None));
    }

    #[test]
    fn test_resolve_is_pure() {
        let map = PortMap::new(reset_bus(&rx24t::CHIP), &rx24t::CHIP);

        assert_eq!(map.resolve(Peripheral::Sci1, Order::Bypass), Ok(Resolution::Bypass));
        assert_eq!(
            map.resolve(Peripheral::Sci1, Order::First),
            Ok(Resolution::Apply(rx24t::CHIP.candidate(Peripheral::Sci1, Order::First).unwrap()))
        );
        assert_eq!(
            map.resolve(Peripheral::Sci1, Order::User),
            Err(TurnError::MissingUserCallback)
        );
        assert_eq!(map.bus().read_count(), 0);
    }
}
