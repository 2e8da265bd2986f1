use crate::utils::error::{GateError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 電話簿號碼類型 (AT+CPBW 的 `<type>` 欄位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberType {
    International,
    Unknown,
}

impl NumberType {
    pub const INTERNATIONAL_CODE: u8 = 145;
    pub const UNKNOWN_CODE: u8 = 129;

    /// `+` 開頭為國際格式, 其餘皆為 unknown/national
    pub fn for_number(number: &str) -> Self {
        if number.starts_with('+') {
            NumberType::International
        } else {
            NumberType::Unknown
        }
    }

    pub fn code(self) -> u8 {
        match self {
            NumberType::International => Self::INTERNATIONAL_CODE,
            NumberType::Unknown => Self::UNKNOWN_CODE,
        }
    }

    pub fn from_code(code: u8) -> Self {
        if code == Self::INTERNATIONAL_CODE {
            NumberType::International
        } else {
            NumberType::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonebookEntry {
    pub index: u32,
    pub number: String,
    pub number_type: NumberType,
    pub name: String,
}

/// SIM 電話簿的有效索引範圍 (含兩端)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub min: u32,
    pub max: u32,
}

impl IndexRange {
    pub fn indices(&self) -> std::ops::RangeInclusive<u32> {
        self.min..=self.max
    }

    pub fn len(&self) -> usize {
        if self.max < self.min {
            0
        } else {
            (self.max - self.min + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a single AT request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtOutcome {
    Success(String),
    Mismatch(String),
    NoResponse,
}

impl AtOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AtOutcome::Success(_))
    }

    /// Raw response text, if the modem said anything at all.
    pub fn raw(&self) -> Option<&str> {
        match self {
            AtOutcome::Success(raw) | AtOutcome::Mismatch(raw) => Some(raw),
            AtOutcome::NoResponse => None,
        }
    }

    /// 轉成錯誤: 無回應為 `TransportTimeout`, 不符為 `UnexpectedResponse`
    pub fn require(self, command: &str, expected: &str) -> Result<String> {
        match self {
            AtOutcome::Success(raw) => Ok(raw),
            AtOutcome::Mismatch(raw) => Err(GateError::UnexpectedResponse {
                command: command.to_string(),
                expected: expected.to_string(),
                response: raw,
            }),
            AtOutcome::NoResponse => Err(GateError::TransportTimeout {
                command: command.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    IncomingCall {
        caller_number: Option<String>,
        caller_name: Option<String>,
    },
    IncomingSms {
        index: u32,
    },
    Unknown {
        raw: String,
    },
}

/// SMS read back with AT+CMGR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub index: u32,
    pub status: Option<String>,
    pub sender: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Add(String),
    Delete(String),
    Query(String),
    Ignore,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
    Invalid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Invalid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Present,
    NotFound,
    Invalid,
}

/// Modem startup state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    Probing,
    Ready,
    Failed,
}

impl fmt::Display for ModemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModemState::Probing => "probing",
            ModemState::Ready => "ready",
            ModemState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_type_follows_plus_prefix() {
        assert_eq!(NumberType::for_number("+48503815525"), NumberType::International);
        assert_eq!(NumberType::for_number("48222333444"), NumberType::Unknown);
        assert_eq!(NumberType::International.code(), 145);
        assert_eq!(NumberType::Unknown.code(), 129);
        assert_eq!(NumberType::from_code(145), NumberType::International);
        assert_eq!(NumberType::from_code(161), NumberType::Unknown);
    }

    #[test]
    fn test_require_maps_outcomes_to_errors() {
        assert_eq!(
            AtOutcome::Success("OK".to_string()).require("AT", "OK").unwrap(),
            "OK"
        );
        assert!(matches!(
            AtOutcome::Mismatch("ERROR".to_string()).require("AT+CPIN?", "READY"),
            Err(GateError::UnexpectedResponse { .. })
        ));
        assert!(matches!(
            AtOutcome::NoResponse.require("AT", "OK"),
            Err(GateError::TransportTimeout { .. })
        ));
    }

    #[test]
    fn test_index_range_len() {
        let range = IndexRange { min: 1, max: 250 };
        assert_eq!(range.len(), 250);
        assert_eq!(range.indices().count(), 250);
        assert!(IndexRange { min: 5, max: 4 }.is_empty());
    }
}
