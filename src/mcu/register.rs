//! Typed register overlays.
//!
//! A [`Register`] names one address and a width; it owns no storage and every
//! access goes to the [`Bus`]. A [`Field`] (or its 1-bit form [`Bit`]) is a
//! projection of some bits of a register. Writes through a field are always a
//! read-modify-write of the whole register so sibling fields survive.
//!
//! Nothing here is atomic. A field write racing with another context that
//! touches the same register can lose either update.

use core::marker::PhantomData;

use crate::mcu::bus::Bus;
use crate::BIT_MASK_LEN;

/// Unsigned register widths the bus can move in one access.
pub trait RegisterWord: Copy + Eq + core::fmt::Debug {
    const BITS: u8;

    fn to_bits(self) -> u32;

    /// Truncates `bits` to the word width.
    fn from_bits(bits: u32) -> Self;

    fn load<B: Bus + ?Sized>(bus: &B, addr: u32) -> Self;

    fn store<B: Bus + ?Sized>(bus: &mut B, addr: u32, value: Self);
}

macro_rules! register_word {
    ( $t:ty, $bits:expr, $read:ident, $write:ident ) => {
        impl RegisterWord for $t {
            const BITS: u8 = $bits;

            #[inline(always)]
            fn to_bits(self) -> u32 {
                self as u32
            }

            #[inline(always)]
            fn from_bits(bits: u32) -> Self {
                bits as $t
            }

            #[inline(always)]
            fn load<B: Bus + ?Sized>(bus: &B, addr: u32) -> Self {
                bus.$read(addr)
            }

            #[inline(always)]
            fn store<B: Bus + ?Sized>(bus: &mut B, addr: u32, value: Self) {
                bus.$write(addr, value)
            }
        }
    };
}

register_word!(u8, 8, read8, write8);
register_word!(u16, 16, read16, write16);
register_word!(u32, 32, read32, write32);

mod sealed {
    pub trait Sealed {}
}

/// Access mode marker.
pub trait Access: sealed::Sealed + Copy {}

/// Access modes that permit bus writes.
pub trait Writable: Access {}

/// Read-write register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rw;

/// Read-only register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ro;

impl sealed::Sealed for Rw {}
impl sealed::Sealed for Ro {}
impl Access for Rw {}
impl Access for Ro {}
impl Writable for Rw {}

/// One hardware register: an address plus a width `T` and access mode `A`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Register<T, A = Rw> {
    addr: u32,
    _marker: PhantomData<(T, A)>,
}

impl<T: RegisterWord, A: Access> Register<T, A> {
    pub const fn new(addr: u32) -> Self {
        Self {
            addr,
            _marker: PhantomData,
        }
    }

    pub const fn addr(&self) -> u32 {
        self.addr
    }

    /// Issues a single full-width bus read. Nothing is cached.
    #[inline(always)]
    pub fn read<B: Bus + ?Sized>(&self, bus: &B) -> T {
        T::load(bus, self.addr)
    }

    /// Bits `offset .. offset + width` of this register.
    ///
    /// Panics (at compile time when used in a `const`) if the range does not
    /// fit in `T`.
    pub const fn field(self, offset: u8, width: u8) -> Field<T, A> {
        Field::new(self, offset, width)
    }

    pub const fn bit(self, offset: u8) -> Bit<T, A> {
        Bit::new(self, offset)
    }
}

impl<T: RegisterWord, A: Writable> Register<T, A> {
    /// Issues a single full-width bus write.
    #[inline(always)]
    pub fn write<B: Bus + ?Sized>(&self, bus: &mut B, value: T) {
        T::store(bus, self.addr, value)
    }

    /// Read-modify-write: one read, one write.
    #[inline(always)]
    pub fn modify<B, F>(&self, bus: &mut B, f: F)
    where
        B: Bus + ?Sized,
        F: FnOnce(T) -> T,
    {
        let value = self.read(&*bus);
        self.write(bus, f(value));
    }
}

/// A multi-bit view into a [`Register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field<T, A = Rw> {
    reg: Register<T, A>,
    offset: u8,
    width: u8,
}

impl<T: RegisterWord, A: Access> Field<T, A> {
    pub const fn new(reg: Register<T, A>, offset: u8, width: u8) -> Self {
        assert!(width > 0, "field width must be non-zero");
        assert!(
            offset as u32 + width as u32 <= T::BITS as u32,
            "field exceeds register width"
        );
        Self { reg, offset, width }
    }

    pub const fn register(&self) -> Register<T, A> {
        self.reg
    }

    pub const fn offset(&self) -> u8 {
        self.offset
    }

    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Mask of this field in register coordinates.
    pub const fn mask(&self) -> u32 {
        BIT_MASK_LEN!(self.width) << self.offset
    }

    /// Replaces this field inside the raw register value `raw`, truncating
    /// `value` to the field width. Touches no hardware.
    pub const fn insert(&self, raw: u32, value: u32) -> u32 {
        (raw & !self.mask()) | ((value << self.offset) & self.mask())
    }

    /// Extracts this field from the raw register value `raw`.
    pub const fn extract(&self, raw: u32) -> u32 {
        (raw & self.mask()) >> self.offset
    }

    pub fn get<B: Bus + ?Sized>(&self, bus: &B) -> T {
        T::from_bits(self.extract(self.reg.read(bus).to_bits()))
    }
}

impl<T: RegisterWord, A: Writable> Field<T, A> {
    /// Read-modify-write of the owning register; only this field changes.
    pub fn set<B: Bus + ?Sized>(&self, bus: &mut B, value: T) {
        let field = *self;
        self.reg
            .modify(bus, |raw| T::from_bits(field.insert(raw.to_bits(), value.to_bits())));
    }
}

/// A single-bit view into a [`Register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bit<T, A = Rw> {
    field: Field<T, A>,
}

impl<T: RegisterWord, A: Access> Bit<T, A> {
    pub const fn new(reg: Register<T, A>, offset: u8) -> Self {
        Self {
            field: Field::new(reg, offset, 1),
        }
    }

    pub const fn register(&self) -> Register<T, A> {
        self.field.reg
    }

    pub const fn offset(&self) -> u8 {
        self.field.offset
    }

    pub const fn mask(&self) -> u32 {
        self.field.mask()
    }

    pub fn get<B: Bus + ?Sized>(&self, bus: &B) -> bool {
        self.field.get(bus).to_bits() != 0
    }
}

impl<T: RegisterWord, A: Writable> Bit<T, A> {
    pub fn set<B: Bus + ?Sized>(&self, bus: &mut B, value: bool) {
        self.field.set(bus, T::from_bits(value as u32));
    }
}

/// Declares a register constant and its address, after the style of
/// `register!(pub PWPR: u8 = 0x0008_C11F)`. The access mode defaults to `rw`;
/// append `, ro` for read-only registers.
#[macro_export]
macro_rules! register {
    ( $(#[$m:meta])* $vis:vis $name:ident : $t:ty = $addr:expr ) => {
        $crate::register!($(#[$m])* $vis $name: $t = $addr, rw);
    };

    ( $(#[$m:meta])* $vis:vis $name:ident : $t:ty = $addr:expr, $access:ident ) => {
        $crate::paste::paste! {
            $vis const [<$name _ADDR>]: u32 = $addr;

            $(#[$m])*
            $vis const $name: $crate::mcu::register::Register<$t, $crate::mcu::register::[<$access:camel>]> =
                $crate::mcu::register::Register::new([<$name _ADDR>]);
        }
    };
}
