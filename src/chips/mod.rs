//! Per-chip candidate tables.
//!
//! Each module exports one [`crate::port_map::table::Chip`] constant. These are
//! data only: the pin sets a variant offers for each peripheral and the PSEL
//! code each pin needs.

pub mod rx24t;
pub mod rx64m;
