//! Fixed-point coin amounts.
//!
//! Premiums, coverage limits, balances and claim payouts are all carried as
//! [`Amount`]: an unsigned 18-decimal fixed-point value stored in base units.
//! The human-facing form is a decimal string (`"0.1"`, `"5.0"`); the wallet
//! provider reports balances as hex-encoded base units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Number of decimal places carried by an [`Amount`].
pub const DECIMALS: u32 = 18;

/// Base units per whole coin.
const BASE: u128 = 10u128.pow(DECIMALS);

/// An unsigned coin amount in 18-decimal base units.
///
/// Non-negative by construction; arithmetic is checked and overflow is an
/// error, never a wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Construct from raw base units.
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Raw base units.
    pub const fn base_units(self) -> u128 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal coin string (`"1"`, `"0.15"`, `"2.5"`).
    ///
    /// At most [`DECIMALS`] fractional digits are accepted; both parts must
    /// be plain ASCII digits.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(Error::InvalidAmount(format!("empty amount: {s:?}")));
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::InvalidAmount(format!("not a decimal number: {s:?}")));
        }
        if frac.len() > DECIMALS as usize {
            return Err(Error::InvalidAmount(format!(
                "more than {DECIMALS} fractional digits: {s:?}"
            )));
        }

        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|e| Error::InvalidAmount(format!("{s:?}: {e}")))?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
            padded
                .parse::<u128>()
                .map_err(|e| Error::InvalidAmount(format!("{s:?}: {e}")))?
        };

        whole_units
            .checked_mul(BASE)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(|| Error::InvalidAmount(format!("amount out of range: {s:?}")))
    }

    /// Parse a hex-encoded base-unit quantity (`"0x2386f26fc10000"`), the
    /// form wallet providers use for balance responses.
    pub fn from_hex_units(s: &str) -> Result<Self, Error> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| Error::InvalidAmount(format!("bad hex quantity {s:?}: {e}")))
    }

    /// Checked addition.
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction.
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtraction clamped at zero.
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Addition clamped at the representable maximum.
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / BASE;
        let frac = self.0 % BASE;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let frac = format!("{frac:0width$}", width = DECIMALS as usize);
            write!(f, "{whole}.{}", frac.trim_end_matches('0'))
        }
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
