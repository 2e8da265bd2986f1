use crate::utils::error::{GateError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(GateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(GateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(GateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(GateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 管理員號碼: 可選的 `+` 加上數字, 不可重複
pub fn validate_phone_numbers(field_name: &str, numbers: &[String]) -> Result<()> {
    if numbers.is_empty() {
        return Err(GateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: "[]".to_string(),
            reason: "At least one number is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for number in numbers {
        let digits = number.strip_prefix('+').unwrap_or(number);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(GateError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: number.clone(),
                reason: "Phone numbers may only contain digits and a leading '+'".to_string(),
            });
        }
        if !seen.insert(number.as_str()) {
            return Err(GateError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: number.clone(),
                reason: "Duplicate phone number".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("modem.port", "/dev/ttyS0").is_ok());
        assert!(validate_path("modem.port", "").is_err());
        assert!(validate_path("modem.port", "/dev/tty\0S0").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("runtime.queue_capacity", 5, 1).is_ok());
        assert!(validate_positive_number("runtime.queue_capacity", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("access.fixed_slot", 1u32, 1, 250).is_ok());
        assert!(validate_range("access.fixed_slot", 0u32, 1, 250).is_err());
    }

    #[test]
    fn test_validate_phone_numbers() {
        let admins = vec!["+48503815525".to_string(), "600700800".to_string()];
        assert!(validate_phone_numbers("access.admin_numbers", &admins).is_ok());

        assert!(validate_phone_numbers("access.admin_numbers", &[]).is_err());

        let garbage = vec!["+48 503".to_string()];
        assert!(validate_phone_numbers("access.admin_numbers", &garbage).is_err());

        let duplicated = vec!["+48503815525".to_string(), "+48503815525".to_string()];
        assert!(validate_phone_numbers("access.admin_numbers", &duplicated).is_err());
    }
}
