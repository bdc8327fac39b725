/*
 * Copyright (c) 2022 Frank Fischer <frank-fischer@shadow-soft.de>
 *
 * This program is free software: you can redistribute it and/or
 * modify it under the terms of the GNU General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful, but
 * WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see  <http://www.gnu.org/licenses/>
 */

//! Perturbed values `a + bε`.
//!
//! An [`EpsilonValue`] represents the number `base + epsilon·ε` where `ε` is
//! an infinitesimal. Such values are used to keep a degenerate
//! transportation basis connected: a cell carrying `ε` is basic although its
//! real allocation is zero.
//!
//! Values are ordered lexicographically, first by `base`, then by
//! `epsilon`. Arithmetic is componentwise.
//!
//! # Example
//!
//! ```
//! use rs_transport::epsilon::{parse_epsilon_value, EpsilonValue};
//!
//! let a = parse_epsilon_value("10 + ε");
//! let b = parse_epsilon_value("5 - 2ε");
//! assert_eq!(a, EpsilonValue::new(10.0, 1.0));
//! assert_eq!((a - b).to_string(), "5 + 3ε");
//! assert!(b < a);
//! assert!(EpsilonValue::from(3.0) < EpsilonValue::new(3.0, 1.0));
//!
//! // unparseable text is zero
//! assert_eq!(parse_epsilon_value("ten"), EpsilonValue::default());
//! ```

use num_traits::Zero;

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::num::ParseFloatError;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

#[cfg(feature = "serialize")]
use serde_derive::{Deserialize, Serialize};

/// The symbol used for the infinitesimal.
pub const SYMBOL: char = 'ε';

/// Error when parsing an [`EpsilonValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The text contains nothing but whitespace.
    Empty,
    /// The `ε` symbol appears somewhere else than at the end.
    MisplacedEpsilon,
    /// The base or the coefficient is not a number.
    InvalidNumber(ParseFloatError),
    /// The base or the coefficient is infinite or NaN.
    NonFinite,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::Empty => write!(fmt, "Empty value"),
            Error::MisplacedEpsilon => write!(fmt, "'{}' must be the last symbol", SYMBOL),
            Error::InvalidNumber(e) => write!(fmt, "Invalid number: {}", e),
            Error::NonFinite => write!(fmt, "Number must be finite"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidNumber(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseFloatError> for Error {
    fn from(e: ParseFloatError) -> Error {
        Error::InvalidNumber(e)
    }
}

/// A value `base + epsilon·ε`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct EpsilonValue {
    /// The real part.
    pub base: f64,
    /// The coefficient of `ε`.
    pub epsilon: f64,
}

impl EpsilonValue {
    pub fn new(base: f64, epsilon: f64) -> Self {
        EpsilonValue { base, epsilon }
    }

    /// A value without infinitesimal part.
    pub fn from_base(base: f64) -> Self {
        EpsilonValue { base, epsilon: 0.0 }
    }

    /// The pure infinitesimal `k·ε`.
    pub fn epsilon(k: f64) -> Self {
        EpsilonValue { base: 0.0, epsilon: k }
    }

    /// Return `true` if both components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.base == 0.0 && self.epsilon == 0.0
    }

    /// Return `true` if a cell with this allocation belongs to the basis.
    ///
    /// This is the case for every non-zero value, including pure
    /// infinitesimals.
    pub fn is_basic(&self) -> bool {
        !self.is_zero()
    }

    /// Set components with absolute value below `tol` to exactly zero.
    pub fn clamp_small(self, tol: f64) -> Self {
        let clamp = |x: f64| if x.abs() < tol { 0.0 } else { x };
        EpsilonValue {
            base: clamp(self.base),
            epsilon: clamp(self.epsilon),
        }
    }

    fn normalized(self) -> Self {
        // turns -0.0 into 0.0
        EpsilonValue {
            base: self.base + 0.0,
            epsilon: self.epsilon + 0.0,
        }
    }
}

impl From<f64> for EpsilonValue {
    fn from(base: f64) -> Self {
        EpsilonValue::from_base(base)
    }
}

impl PartialOrd for EpsilonValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.base.partial_cmp(&other.base)? {
            Ordering::Equal => self.epsilon.partial_cmp(&other.epsilon),
            ord => Some(ord),
        }
    }
}

/// Compare two values lexicographically.
///
/// In contrast to `PartialOrd` this is a total order: `NaN` components are
/// ordered by [`f64::total_cmp`], and `-0.0` equals `0.0`.
pub fn compare_epsilon_values(a: &EpsilonValue, b: &EpsilonValue) -> Ordering {
    let a = a.normalized();
    let b = b.normalized();
    a.base.total_cmp(&b.base).then_with(|| a.epsilon.total_cmp(&b.epsilon))
}

impl Add for EpsilonValue {
    type Output = EpsilonValue;

    fn add(self, rhs: EpsilonValue) -> EpsilonValue {
        EpsilonValue {
            base: self.base + rhs.base,
            epsilon: self.epsilon + rhs.epsilon,
        }
    }
}

impl Sub for EpsilonValue {
    type Output = EpsilonValue;

    fn sub(self, rhs: EpsilonValue) -> EpsilonValue {
        EpsilonValue {
            base: self.base - rhs.base,
            epsilon: self.epsilon - rhs.epsilon,
        }
    }
}

impl Neg for EpsilonValue {
    type Output = EpsilonValue;

    fn neg(self) -> EpsilonValue {
        EpsilonValue {
            base: -self.base,
            epsilon: -self.epsilon,
        }
    }
}

impl Mul<f64> for EpsilonValue {
    type Output = EpsilonValue;

    fn mul(self, k: f64) -> EpsilonValue {
        EpsilonValue {
            base: self.base * k,
            epsilon: self.epsilon * k,
        }
    }
}

impl AddAssign for EpsilonValue {
    fn add_assign(&mut self, rhs: EpsilonValue) {
        *self = *self + rhs;
    }
}

impl SubAssign for EpsilonValue {
    fn sub_assign(&mut self, rhs: EpsilonValue) {
        *self = *self - rhs;
    }
}

impl Zero for EpsilonValue {
    fn zero() -> Self {
        EpsilonValue::default()
    }

    fn is_zero(&self) -> bool {
        EpsilonValue::is_zero(self)
    }
}

impl Sum for EpsilonValue {
    fn sum<I: Iterator<Item = EpsilonValue>>(iter: I) -> Self {
        iter.fold(EpsilonValue::zero(), Add::add)
    }
}

/// Return `a + b`.
pub fn add_e(a: EpsilonValue, b: EpsilonValue) -> EpsilonValue {
    a + b
}

/// Return `a - b`.
pub fn sub_e(a: EpsilonValue, b: EpsilonValue) -> EpsilonValue {
    a - b
}

/// Return `k·a`.
pub fn scale_e(a: EpsilonValue, k: f64) -> EpsilonValue {
    a * k
}

impl fmt::Display for EpsilonValue {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let EpsilonValue { base, epsilon } = self.normalized();
        if epsilon == 0.0 {
            return write!(fmt, "{}", base);
        }

        let coeff = |fmt: &mut fmt::Formatter, k: f64| {
            if k == 1.0 {
                write!(fmt, "{}", SYMBOL)
            } else {
                write!(fmt, "{}{}", k, SYMBOL)
            }
        };

        if base == 0.0 {
            if epsilon < 0.0 {
                write!(fmt, "-")?;
            }
            coeff(fmt, epsilon.abs())
        } else {
            write!(fmt, "{} {} ", base, if epsilon < 0.0 { '-' } else { '+' })?;
            coeff(fmt, epsilon.abs())
        }
    }
}

fn parse_finite(text: &str) -> Result<f64, Error> {
    let x: f64 = text.parse()?;
    if x.is_finite() {
        Ok(x)
    } else {
        Err(Error::NonFinite)
    }
}

impl FromStr for EpsilonValue {
    type Err = Error;

    /// Parse `<num>`, `<num> ± <coeff>ε`, `± <coeff>ε` and the like.
    ///
    /// The coefficient may be omitted (meaning `1`) and may be followed by
    /// `*`. The word `eps` is an alias for `ε`. Whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Error> {
        let text: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let text = text.replace("eps", "ε");
        if text.is_empty() {
            return Err(Error::Empty);
        }

        let body = match text.strip_suffix(SYMBOL) {
            Some(body) => body,
            None if text.contains(SYMBOL) => return Err(Error::MisplacedEpsilon),
            None => return Ok(EpsilonValue::from_base(parse_finite(&text)?)),
        };
        if body.contains(SYMBOL) {
            return Err(Error::MisplacedEpsilon);
        }
        let body = body.strip_suffix('*').unwrap_or(body);

        // The coefficient starts at the last sign that is not part of an
        // exponent and not the leading sign.
        let split = body
            .char_indices()
            .filter(|&(i, c)| {
                i > 0 && (c == '+' || c == '-') && !body[..i].ends_with(|p: char| p == 'e' || p == 'E')
            })
            .map(|(i, _)| i)
            .last();

        let (base, coeff) = match split {
            Some(i) => (parse_finite(&body[..i])?, &body[i..]),
            None => (0.0, body),
        };

        let epsilon = match coeff {
            "" | "+" => 1.0,
            "-" => -1.0,
            _ => parse_finite(coeff)?,
        };

        Ok(EpsilonValue { base, epsilon })
    }
}

/// Parse a value, returning zero for unparseable text.
pub fn parse_epsilon_value(s: &str) -> EpsilonValue {
    s.parse().unwrap_or_default()
}

/// Render a value in the textual format understood by
/// [`parse_epsilon_value`].
pub fn format_epsilon_value(value: &EpsilonValue) -> String {
    value.to_string()
}
