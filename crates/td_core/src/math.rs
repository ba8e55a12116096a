//! Fixed-point math utilities for deterministic simulation.
//!
//! Timers, speeds and positions all use fixed-point arithmetic so that the
//! same configuration and inputs replay identically on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// 32 integer bits and 32 fractional bits.
pub type Fixed = I32F32;

/// Serde support for authored fixed-point values.
///
/// Config files are written by hand, so values are read and written as
/// decimals and converted once at load time. The conversion itself is
/// deterministic for a given decimal.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("{value} does not fit a fixed-point value")))
    }
}

/// Fixed-point 2D vector, in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vec2Fixed {
    /// X coordinate (column axis).
    pub x: Fixed,
    /// Y coordinate (row axis).
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Centre of the tile at the given column and row.
    #[must_use]
    pub fn tile_center(x: u32, y: u32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Squared distance (avoids sqrt for range checks).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_squared() {
        let a = Vec2Fixed::tile_center(3, 0);
        let b = Vec2Fixed::tile_center(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::tile_center(10, 20);
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::tile_center(5, 10));
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Authored {
        #[serde(with = "fixed_decimal")]
        value: Fixed,
    }

    #[test]
    fn test_decimal_parse_is_exact_for_halves() {
        let parsed: Authored = ron::from_str("(value: 2.5)").unwrap();
        assert_eq!(parsed.value, Fixed::from_num(2.5));
    }

    #[test]
    fn test_decimal_rejects_out_of_range() {
        assert!(ron::from_str::<Authored>("(value: 1e20)").is_err());
    }
}
