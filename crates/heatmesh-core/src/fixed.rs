//! Q16.16 fixed-point temperatures.
//!
//! All arithmetic is two's-complement and wraps, so the update engine
//! behaves identically on every platform.

use std::fmt;
use std::ops::{Add, Sub};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// Signed Q16.16 fixed-point value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Fixed = Fixed(0);

    /// Default temperature applied to the north and west mesh borders.
    pub const HOT: Fixed = Fixed::from_int(255);

    /// Default temperature applied to the south and east mesh borders.
    pub const COLD: Fixed = Fixed::from_int(40);

    /// Build a value with the given integer part and no fraction.
    pub const fn from_int(value: i32) -> Self {
        Fixed(value << FRAC_BITS)
    }

    /// Reinterpret raw Q16.16 bits.
    pub const fn from_bits(bits: i32) -> Self {
        Fixed(bits)
    }

    /// Raw Q16.16 bits.
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Divide by four with an arithmetic shift (rounds toward negative infinity).
    #[inline]
    pub const fn quarter(self) -> Self {
        Fixed(self.0 >> 2)
    }

    /// Integer part truncated to eight bits.
    #[inline]
    pub const fn temperature_byte(self) -> u8 {
        ((self.0 >> FRAC_BITS) & 0xff) as u8
    }

    /// Approximate value as a float, for display only.
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << FRAC_BITS)
    }
}

impl Add for Fixed {
    type Output = Fixed;

    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_int() {
        assert_eq!(Fixed::from_int(255).to_bits(), 255 << 16);
        assert_eq!(Fixed::COLD.to_bits(), 40 << 16);
        assert_eq!(Fixed::from_int(-1).to_bits(), -65536);
    }

    #[test]
    fn test_quarter_truncates_toward_negative_infinity() {
        assert_eq!(Fixed::from_bits(7).quarter().to_bits(), 1);
        assert_eq!(Fixed::from_bits(-7).quarter().to_bits(), -2);
        assert_eq!(Fixed::from_bits(-4).quarter().to_bits(), -1);
    }

    #[test]
    fn test_temperature_byte() {
        assert_eq!(Fixed::HOT.temperature_byte(), 0xff);
        assert_eq!(Fixed::from_bits((0xff << 16) | 0xabcd).temperature_byte(), 0xff);
        assert_eq!(Fixed::from_int(300).temperature_byte(), 44);
        assert_eq!(Fixed::from_bits(4_177_920).temperature_byte(), 63);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let max = Fixed::from_bits(i32::MAX);
        assert_eq!((max + Fixed::from_bits(1)).to_bits(), i32::MIN);
        assert_eq!((Fixed::from_bits(i32::MIN) - Fixed::from_bits(1)).to_bits(), i32::MAX);
    }
}
