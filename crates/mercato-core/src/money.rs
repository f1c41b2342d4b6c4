//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every monetary value in the system is an i64 number of cents.        │
//! │    The database, calculations, and receipts all use cents.              │
//! │    Only display formatting converts to dollars.                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Rate applications (tax, percentage discounts) round **half to even**
//! ("banker's rounding"). Half-up rounding biases totals upward over many
//! transactions; half-to-even alternates the direction of ties.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values represent returns and discounts
/// - **Single-field tuple struct**: zero-cost abstraction over i64
///
/// ## Example
/// ```rust
/// use mercato_core::money::Money;
///
/// let price = Money::from_cents(1099); // $10.99
/// let doubled: Money = price * 2;      // $21.98
/// assert_eq!(doubled.cents(), 2198);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a basis-point rate and rounds half to even.
    ///
    /// ## Banker's Rounding Explained
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  ROUND HALF TO EVEN                                                 │
    /// │                                                                     │
    /// │  Standard rounding always rounds 0.5 UP, causing systematic bias:   │
    /// │    0.5 → 1, 1.5 → 2, 2.5 → 3, 3.5 → 4 (always up = +bias)           │
    /// │                                                                     │
    /// │  Half-to-even rounds ties to the nearest EVEN number:               │
    /// │    0.5 → 0, 1.5 → 2, 2.5 → 2, 3.5 → 4 (alternates = no bias)        │
    /// │                                                                     │
    /// │  Over millions of transactions this prevents systematic loss/gain.  │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use mercato_core::money::Money;
    ///
    /// // $1.25 at 10% = 12.5 cents → ties to even → 12 cents
    /// assert_eq!(Money::from_cents(125).mul_bps(1000).cents(), 12);
    /// // $1.35 at 10% = 13.5 cents → ties to even → 14 cents
    /// assert_eq!(Money::from_cents(135).mul_bps(1000).cents(), 14);
    /// ```
    pub fn mul_bps(&self, bps: u32) -> Money {
        // i128 intermediate prevents overflow on large amounts.
        let numerator = self.0 as i128 * bps as i128;
        Money::from_cents(div_half_even(numerator, 10_000))
    }

    /// Calculates tax on this amount.
    ///
    /// ## Example
    /// ```rust
    /// use mercato_core::money::Money;
    /// use mercato_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(798);  // $7.98
    /// let rate = TaxRate::from_bps(1000);  // 10%
    /// assert_eq!(price.calculate_tax(rate).cents(), 80);
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.mul_bps(rate.bps())
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Integer division rounding half to even, exact for all signs.
///
/// `rem_euclid` keeps the remainder in `[0, den)` so a single comparison
/// against `den / 2` decides the direction; ties go to the even quotient.
fn div_half_even(num: i128, den: i128) -> i64 {
    debug_assert!(den > 0);
    let quotient = num.div_euclid(den);
    let remainder = num.rem_euclid(den);
    let doubled = remainder * 2;
    let rounded = if doubled > den {
        quotient + 1
    } else if doubled < den {
        quotient
    } else if quotient % 2 == 0 {
        quotient
    } else {
        quotient + 1
    };
    rounded as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money in a human-readable format.
///
/// This is for receipts and debugging; localization belongs to the caller.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
