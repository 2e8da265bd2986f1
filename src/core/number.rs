//! Phone number normalization used by the authorization store.

use crate::utils::error::{GateError, Result};

/// Polish country code as written on the SIM and in admin commands.
pub const COUNTRY_PREFIX: &str = "+48";
const BARE_COUNTRY_CODE: &str = "48";
const NATIONAL_LENGTH: usize = 9;

/// Strips the country prefix.
///
/// `+48` is always removed. A bare `48` is removed only when exactly nine
/// digits follow it, which is what is left of `+48...` after the admin
/// command prefix consumed the `+`.
pub fn clean_number(number: &str) -> &str {
    if let Some(rest) = number.strip_prefix(COUNTRY_PREFIX) {
        return rest;
    }
    if let Some(rest) = number.strip_prefix(BARE_COUNTRY_CODE) {
        if is_national(rest) {
            return rest;
        }
    }
    number
}

/// Exactly nine ASCII digits once the country prefix is gone.
pub fn is_number_valid(number: &str) -> bool {
    is_national(clean_number(number))
}

/// Like [`is_number_valid`], but reports the rejected number.
pub fn check_number(number: &str) -> Result<&str> {
    if is_number_valid(number) {
        Ok(clean_number(number))
    } else {
        Err(GateError::InvalidNumber {
            number: number.to_string(),
        })
    }
}

/// Two numbers name the same subscriber when their cleaned forms are equal.
pub fn same_subscriber(a: &str, b: &str) -> bool {
    clean_number(a) == clean_number(b)
}

fn is_national(digits: &str) -> bool {
    digits.len() == NATIONAL_LENGTH && digits.bytes().all(|b| b.is_ascii_digit())
}
