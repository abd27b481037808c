//! Pin-function multiplexing for RX-family MCUs.
//!
//! The crate is two layers:
//!
//! * [`mcu`]: typed overlays for memory-mapped registers ([`mcu::register`]),
//!   the hardware context they are accessed through ([`mcu::bus`]) and the
//!   multi-function pin controller with its write-protect guard
//!   ([`mcu::mpc`]).
//! * [`port_map`]: the resolver that routes a peripheral onto one of the pin
//!   sets a chip table ([`chips`]) offers for it.
//!
//! # Examples
//! ```rust,no_run
//! use rx_port_map::config;
//! use rx_port_map::mcu::bus::Mmio;
//! use rx_port_map::port_map::table::{OptionalMode, Order, Peripheral};
//! use rx_port_map::port_map::PortMap;
//!
//! let mut map = PortMap::new(unsafe { Mmio::new() }, config::CHIP);
//! if !map.turn(Peripheral::Sci1, true, Order::First, OptionalMode::None) {
//!     // this chip has no first pin set for SCI1
//! }
//! ```

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod common;
pub mod config;
pub mod mcu;
pub mod port_map;
pub mod chips;

#[doc(hidden)]
pub use paste;
