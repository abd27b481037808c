//! RX64M (6-bit PSEL). GPT0 outputs can be driven inverted.

use crate::config::MPC_LAYOUT;
use crate::mcu::mpc::pin::*;
use crate::mcu::mpc::{MpcLayout, Pin};
use crate::port_map::table::{
    Candidate, Channel, ChannelCandidate, Chip, ClockSense, Order, Peripheral, SlotAssign,
    SlotPolicy,
};

pub const PSEL_MTU: u8 = 0b000001;
pub const PSEL_SCI: u8 = 0b001010;
pub const PSEL_RSPI: u8 = 0b001101;
pub const PSEL_RIIC: u8 = 0b001111;
pub const PSEL_GPT: u8 = 0b010100;
pub const PSEL_GPT_INV: u8 = 0b010101;

const LAYOUT: MpcLayout = MpcLayout {
    psel_width: 6,
    ..MPC_LAYOUT
};

const fn data(pin: Pin) -> SlotAssign {
    SlotAssign::new(pin, PSEL_SCI).with_policy(SlotPolicy::OPEN_DRAIN_ON_I2C)
}

const fn clock(pin: Pin) -> SlotAssign {
    SlotAssign::new(pin, PSEL_SCI).with_policy(SlotPolicy::SPI_ONLY)
}

// RXD, TXD, then SCK
const SCI1_FIRST: [SlotAssign; 3] = [data(P30), data(P26), clock(P27)];
const SCI1_SECOND: [SlotAssign; 3] = [data(PF2), data(PF0), clock(PF1)];
const SCI5_FIRST: [SlotAssign; 3] = [data(PC2), data(PC3), clock(PC4)];

// SCL, SDA
const RIIC0_FIRST: [SlotAssign; 2] = [SlotAssign::new(P12, PSEL_RIIC), SlotAssign::new(P13, PSEL_RIIC)];

// RSPCKA, MOSIA, MISOA
const RSPI0_FIRST: [SlotAssign; 3] = [
    SlotAssign::new(PA5, PSEL_RSPI),
    SlotAssign::new(PA6, PSEL_RSPI),
    SlotAssign::new(PA7, PSEL_RSPI),
];
const RSPI0_SECOND: [SlotAssign; 3] = [
    SlotAssign::new(PC5, PSEL_RSPI),
    SlotAssign::new(PC6, PSEL_RSPI),
    SlotAssign::new(PC7, PSEL_RSPI),
];

const CANDIDATES: [Candidate; 6] = [
    Candidate { peripheral: Peripheral::Sci1, order: Order::First, slots: &SCI1_FIRST },
    Candidate { peripheral: Peripheral::Sci1, order: Order::Second, slots: &SCI1_SECOND },
    Candidate { peripheral: Peripheral::Sci5, order: Order::First, slots: &SCI5_FIRST },
    Candidate { peripheral: Peripheral::Riic0, order: Order::First, slots: &RIIC0_FIRST },
    Candidate { peripheral: Peripheral::Rspi0, order: Order::First, slots: &RSPI0_FIRST },
    Candidate { peripheral: Peripheral::Rspi0, order: Order::Second, slots: &RSPI0_SECOND },
];

const fn mtu(channel: Channel, pin: Pin) -> ChannelCandidate {
    ChannelCandidate {
        peripheral: Peripheral::Mtu0,
        channel,
        order: Order::First,
        slot: SlotAssign::new(pin, PSEL_MTU),
        inverted_psel: None,
    }
}

const fn gpt(channel: Channel, order: Order, pin: Pin) -> ChannelCandidate {
    ChannelCandidate {
        peripheral: Peripheral::Gpt0,
        channel,
        order,
        slot: SlotAssign::new(pin, PSEL_GPT),
        inverted_psel: Some(PSEL_GPT_INV),
    }
}

const CHANNELS: [ChannelCandidate; 7] = [
    mtu(Channel::A, P34),
    mtu(Channel::B, P15),
    mtu(Channel::C, P32),
    mtu(Channel::D, P33),
    gpt(Channel::A, Order::First, PD7),
    gpt(Channel::B, Order::First, PD6),
    gpt(Channel::A, Order::Second, PE5),
];

// RIIC0 SCL
const CLOCK_SENSE: [ClockSense; 1] = [ClockSense { order: Order::First, pin: P12 }];

pub const CHIP: Chip = Chip {
    name: "RX64M",
    layout: LAYOUT,
    candidates: &CANDIDATES,
    channels: &CHANNELS,
    clock_sense: &CLOCK_SENSE,
    supports_inversion: true,
};
