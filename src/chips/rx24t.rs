//! RX24T (5-bit PSEL, no inverted timer outputs).

use crate::config::MPC_LAYOUT;
use crate::mcu::mpc::pin::*;
use crate::mcu::mpc::{MpcLayout, Pin};
use crate::port_map::table::{
    Candidate, Channel, ChannelCandidate, Chip, ClockSense, Order, Peripheral, SlotAssign,
    SlotPolicy,
};

pub const PSEL_MTU: u8 = 0b00001;
pub const PSEL_SCI: u8 = 0b01010;
pub const PSEL_RSPI: u8 = 0b01101;
pub const PSEL_RIIC: u8 = 0b01111;

const LAYOUT: MpcLayout = MpcLayout {
    psel_width: 5,
    ..MPC_LAYOUT
};

const fn data(pin: Pin, psel: u8) -> SlotAssign {
    SlotAssign::new(pin, psel).with_policy(SlotPolicy::OPEN_DRAIN_ON_I2C)
}

const fn clock(pin: Pin, psel: u8) -> SlotAssign {
    SlotAssign::new(pin, psel).with_policy(SlotPolicy::SPI_ONLY)
}

const fn line(
    peripheral: Peripheral,
    channel: Channel,
    order: Order,
    pin: Pin,
) -> ChannelCandidate {
    ChannelCandidate {
        peripheral,
        channel,
        order,
        slot: SlotAssign::new(pin, PSEL_MTU),
        inverted_psel: None,
    }
}

// RXD, TXD, then SCK
const SCI1_FIRST: [SlotAssign; 3] = [data(PD5, PSEL_SCI), data(PD3, PSEL_SCI), clock(PD4, PSEL_SCI)];
const SCI1_SECOND: [SlotAssign; 3] = [data(PC3, PSEL_SCI), data(PC4, PSEL_SCI), clock(PC5, PSEL_SCI)];
const SCI5_FIRST: [SlotAssign; 3] = [data(PB6, PSEL_SCI), data(PB5, PSEL_SCI), clock(PB7, PSEL_SCI)];
const SCI6_FIRST: [SlotAssign; 3] = [data(PB1, PSEL_SCI), data(PB2, PSEL_SCI), clock(PB3, PSEL_SCI)];
const SCI6_SECOND: [SlotAssign; 3] = [data(PA5, PSEL_SCI), data(PB0, PSEL_SCI), clock(PA4, PSEL_SCI)];

// SCL, SDA
const RIIC0_FIRST: [SlotAssign; 2] = [SlotAssign::new(PB1, PSEL_RIIC), SlotAssign::new(PB2, PSEL_RIIC)];

// RSPCKA, MOSIA, MISOA
const RSPI0_FIRST: [SlotAssign; 3] = [
    SlotAssign::new(P24, PSEL_RSPI),
    SlotAssign::new(P23, PSEL_RSPI),
    SlotAssign::new(P22, PSEL_RSPI),
];
const RSPI0_SECOND: [SlotAssign; 3] = [
    SlotAssign::new(PB3, PSEL_RSPI),
    SlotAssign::new(PB0, PSEL_RSPI),
    SlotAssign::new(PA5, PSEL_RSPI),
];

const CANDIDATES: [Candidate; 8] = [
    Candidate { peripheral: Peripheral::Sci1, order: Order::First, slots: &SCI1_FIRST },
    Candidate { peripheral: Peripheral::Sci1, order: Order::Second, slots: &SCI1_SECOND },
    Candidate { peripheral: Peripheral::Sci5, order: Order::First, slots: &SCI5_FIRST },
    Candidate { peripheral: Peripheral::Sci6, order: Order::First, slots: &SCI6_FIRST },
    Candidate { peripheral: Peripheral::Sci6, order: Order::Second, slots: &SCI6_SECOND },
    Candidate { peripheral: Peripheral::Riic0, order: Order::First, slots: &RIIC0_FIRST },
    Candidate { peripheral: Peripheral::Rspi0, order: Order::First, slots: &RSPI0_FIRST },
    Candidate { peripheral: Peripheral::Rspi0, order: Order::Second, slots: &RSPI0_SECOND },
];

const CHANNELS: [ChannelCandidate; 7] = [
    line(Peripheral::Mtu0, Channel::A, Order::First, PB3),
    line(Peripheral::Mtu0, Channel::B, Order::First, PB2),
    line(Peripheral::Mtu0, Channel::C, Order::First, PB1),
    line(Peripheral::Mtu0, Channel::D, Order::First, PB0),
    line(Peripheral::Mtu3, Channel::A, Order::First, P33),
    line(Peripheral::Mtu3, Channel::A, Order::Second, P17),
    line(Peripheral::Mtu3, Channel::B, Order::First, P32),
];

// RIIC0 SCL
const CLOCK_SENSE: [ClockSense; 1] = [ClockSense { order: Order::First, pin: PB1 }];

pub const CHIP: Chip = Chip {
    name: "RX24T",
    layout: LAYOUT,
    candidates: &CANDIDATES,
    channels: &CHANNELS,
    clock_sense: &CLOCK_SENSE,
    supports_inversion: false,
};
