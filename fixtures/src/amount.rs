// Stellar hardware wallet app test harness and supporting libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::xdr::Price;
use crate::FixtureError;

pub const STROOPS_PER_UNIT: i64 = 10_000_000;
const DECIMALS: usize = 7;

/// Largest amount representable in an `Int64` of stroops
pub const MAX_AMOUNT: &str = "922337203685.4775807";

/// Upper bound of both terms of a [`Price`]
const MAX_INT: u128 = i32::MAX as u128;

/// Split a non-negative decimal string into its integer and fractional digits
fn split_decimal(s: &str) -> Option<(&str, &str)> {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (s, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((int, frac))
}

/// Parse a decimal amount into stroops
pub fn parse_amount(s: &str) -> Result<i64, FixtureError> {
    let err = || FixtureError::InvalidAmount(s.to_string());

    let (int, frac) = split_decimal(s).ok_or_else(err)?;
    if frac.len() > DECIMALS {
        return Err(err());
    }

    let int = match int.trim_start_matches('0') {
        "" => 0,
        digits if digits.len() > 19 => return Err(err()),
        digits => digits.parse::<i128>().map_err(|_| err())?,
    };
    let frac = format!("{:0<width$}", frac, width = DECIMALS)
        .parse::<i128>()
        .map_err(|_| err())?;

    let value = int * STROOPS_PER_UNIT as i128 + frac;
    i64::try_from(value).map_err(|_| err())
}

/// Format stroops as a decimal amount, without trailing zeros
pub fn format_amount(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let abs = stroops.unsigned_abs();
    let int = abs / STROOPS_PER_UNIT as u64;
    let frac = abs % STROOPS_PER_UNIT as u64;

    if frac == 0 {
        format!("{}{}", sign, int)
    } else {
        let frac = format!("{:07}", frac);
        format!("{}{}.{}", sign, int, frac.trim_end_matches('0'))
    }
}

/// Convert a decimal price into `n/d` using the best rational approximation whose terms fit
/// in an `i32`
pub fn parse_price(s: &str) -> Result<Price, FixtureError> {
    let err = || FixtureError::InvalidPrice(s.to_string());

    let (int, frac) = split_decimal(s).ok_or_else(err)?;
    let digits = format!("{}{}", int, frac);
    let digits = match digits.trim_start_matches('0') {
        "" => "0",
        d => d,
    };
    // Anything wider cannot be represented exactly in a u128 and is far above MAX_INT anyway
    if digits.len() > 38 || frac.len() > 38 {
        return Err(err());
    }
    let mut num = digits.parse::<u128>().map_err(|_| err())?;
    let mut den = 10u128.pow(frac.len() as u32);

    // Convergents h/k of the continued fraction of num/den
    let (mut h_prev, mut k_prev) = (1u128, 0u128);
    let (mut h_prev2, mut k_prev2) = (0u128, 1u128);
    let mut last = None;
    loop {
        if num > MAX_INT * den {
            break;
        }
        let a = num / den;
        let rem = num % den;

        let h = a.checked_mul(h_prev).and_then(|v| v.checked_add(h_prev2));
        let k = a.checked_mul(k_prev).and_then(|v| v.checked_add(k_prev2));
        let (h, k) = match (h, k) {
            (Some(h), Some(k)) if h <= MAX_INT && k <= MAX_INT => (h, k),
            _ => break,
        };
        last = Some((h, k));
        (h_prev2, k_prev2, h_prev, k_prev) = (h_prev, k_prev, h, k);

        if rem == 0 {
            break;
        }
        (num, den) = (den, rem);
    }

    match last {
        Some((n, d)) if n != 0 && d != 0 => Ok(Price {
            n: n as i32,
            d: d as i32,
        }),
        _ => Err(err()),
    }
}
