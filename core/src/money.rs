use core::fmt;
use core::ops::{Add, Sub};
use serde::{Deserialize, Serialize};

use crate::{Result, ScratchError};

/// Amount of Brazilian reais, stored as whole centavos.
///
/// On the wire it is a plain decimal number of reais (`9.99`), which is what
/// the wallet and card tables hold.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_reais(reais: f64) -> Result<Self> {
        let cents = (reais * 100.0).round();
        if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
            return Err(ScratchError::InvalidMoney);
        }
        Ok(Self(cents as i64))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn to_reais(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn saturating_sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl TryFrom<f64> for Money {
    type Error = ScratchError;

    fn try_from(reais: f64) -> Result<Self> {
        Self::from_reais(reais)
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> Self {
        money.to_reais()
    }
}

/// Formats as `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let reais = (abs / 100).to_string();
        let centavos = abs % 100;

        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (i, digit) in reais.chars().enumerate() {
            if i > 0 && (reais.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        write!(f, "{sign}R$ {grouped},{centavos:02}")
    }
}
