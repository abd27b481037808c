/// Single bit mask: `BIT!(3) == 0b1000`.
#[macro_export]
macro_rules! BIT {
    ( $x:expr ) => {
        (1u32 << $x)
    };
}

/// Mask of the lowest `$x` bits, `$x` in `0..=32`.
#[macro_export]
macro_rules! BIT_MASK_LEN {
    ( $x:expr ) => {
        (((1u64 << $x) - 1) as u32)
    };
}

// bits range: BIT_RNG!(4, 8)  0b000111110000,  start from 4, end at 8 inclusive
#[macro_export]
macro_rules! BIT_RNG {
    ( $s:expr, $e:expr ) => {
        ($crate::BIT_MASK_LEN!($e - $s + 1) << $s)
    };
}
