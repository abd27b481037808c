use crate::mcu::mpc::MpcLayout;
use crate::port_map::table::Chip;
use crate::register;

// MPC register block, common to the RX6xx/RX2xx parts
register!(pub PWPR: u8 = 0x0008_C11F);

pub const PIDR_BASE: u32 = 0x0008_C040;
pub const PMR_BASE: u32 = 0x0008_C060;
pub const ODR_BASE: u32 = 0x0008_C080;
pub const PFS_BASE: u32 = 0x0008_C140;

/// Register layout shared by the supported chips; each chip table overrides
/// `psel_width` where its PFS differs.
pub const MPC_LAYOUT: MpcLayout = MpcLayout {
    pwpr: PWPR_ADDR,
    pfs_base: PFS_BASE,
    pmr_base: PMR_BASE,
    odr_base: ODR_BASE,
    pidr_base: PIDR_BASE,
    psel_width: 5,
};

/// The chip selected by Cargo feature. `rx64m` wins when both are enabled.
#[cfg(feature = "rx64m")]
pub const CHIP: &Chip = &crate::chips::rx64m::CHIP;

#[cfg(all(feature = "rx24t", not(feature = "rx64m")))]
pub const CHIP: &Chip = &crate::chips::rx24t::CHIP;

#[cfg(not(any(feature = "rx24t", feature = "rx64m")))]
compile_error!("At least one chip feature (`rx24t` or `rx64m`) should be chosen");
