use crate::app::context::GateSettings;
use crate::core::modem::ModemTimings;
use crate::core::phonebook::SlotStrategy;
use crate::core::queue::{OverflowPolicy, DEFAULT_QUEUE_CAPACITY};
use crate::utils::error::{GateError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    pub modem: ModemConfig,
    pub gpio: Option<GpioConfig>,
    pub access: AccessConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub timings: Option<TimingsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    pub apn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    pub power_pin: Option<u32>,
    pub gate_pin: Option<u32>,
    pub gate_pulse_ms: Option<u64>,
    pub sysfs_root: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotStrategyKind {
    #[default]
    Fixed,
    FirstFree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    pub admin_numbers: Vec<String>,
    #[serde(default)]
    pub slot_strategy: SlotStrategyKind,
    pub fixed_slot: Option<u32>,
    pub contact_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    pub queue_capacity: Option<usize>,
    pub overflow_policy: Option<OverflowPolicy>,
    pub listen_interval_ms: Option<u64>,
}

/// 只覆寫有填的欄位, 其餘沿用 `ModemTimings::default()`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimingsConfig {
    pub command_ms: Option<u64>,
    pub echo_delay_ms: Option<u64>,
    pub range_query_ms: Option<u64>,
    pub phonebook_read_ms: Option<u64>,
    pub sms_read_ms: Option<u64>,
    pub sms_prompt_ms: Option<u64>,
    pub sms_confirm_ms: Option<u64>,
    pub power_pulse_ms: Option<u64>,
    pub power_settle_ms: Option<u64>,
    pub reboot_settle_ms: Option<u64>,
    pub startup_attempts: Option<u32>,
}

fn default_baud_rate() -> u32 {
    115_200
}

const DEFAULT_GATE_PULSE_MS: u64 = 1000;
const DEFAULT_LISTEN_INTERVAL_MS: u64 = 1000;

impl GatekeeperConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GateError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${GK_ADMIN}), 未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("modem.port", &self.modem.port)?;
        validation::validate_non_empty_string("modem.apn", &self.modem.apn)?;
        validation::validate_positive_number("modem.baud_rate", self.modem.baud_rate as usize, 1)?;

        validation::validate_phone_numbers("access.admin_numbers", &self.access.admin_numbers)?;
        if let Some(slot) = self.access.fixed_slot {
            validation::validate_positive_number("access.fixed_slot", slot as usize, 1)?;
        }

        if let Some(capacity) = self.runtime.queue_capacity {
            validation::validate_positive_number("runtime.queue_capacity", capacity, 1)?;
        }
        if let Some(interval) = self.runtime.listen_interval_ms {
            validation::validate_range("runtime.listen_interval_ms", interval, 10, 60_000)?;
        }

        if let Some(gpio) = &self.gpio {
            if let Some(root) = &gpio.sysfs_root {
                validation::validate_path("gpio.sysfs_root", root)?;
            }
            if let (Some(power), Some(gate)) = (gpio.power_pin, gpio.gate_pin) {
                if power == gate {
                    return Err(GateError::InvalidConfigValueError {
                        field: "gpio.gate_pin".to_string(),
                        value: gate.to_string(),
                        reason: "Gate pin must differ from power pin".to_string(),
                    });
                }
            }
        }

        if let Some(attempts) = self.timings.as_ref().and_then(|t| t.startup_attempts) {
            validation::validate_range("timings.startup_attempts", attempts, 1, 10)?;
        }

        Ok(())
    }

    pub fn slot_strategy(&self) -> SlotStrategy {
        match self.access.slot_strategy {
            SlotStrategyKind::Fixed => SlotStrategy::Fixed(self.access.fixed_slot.unwrap_or(1)),
            SlotStrategyKind::FirstFree => SlotStrategy::FirstFree,
        }
    }

    pub fn timings(&self) -> ModemTimings {
        let mut timings = ModemTimings::default();
        let Some(overrides) = &self.timings else {
            return timings;
        };

        let apply = |slot: &mut Duration, ms: Option<u64>| {
            if let Some(ms) = ms {
                *slot = Duration::from_millis(ms);
            }
        };
        apply(&mut timings.command, overrides.command_ms);
        apply(&mut timings.echo_delay, overrides.echo_delay_ms);
        apply(&mut timings.range_query, overrides.range_query_ms);
        apply(&mut timings.phonebook_read, overrides.phonebook_read_ms);
        apply(&mut timings.sms_read, overrides.sms_read_ms);
        apply(&mut timings.sms_prompt, overrides.sms_prompt_ms);
        apply(&mut timings.sms_confirm, overrides.sms_confirm_ms);
        apply(&mut timings.power_pulse, overrides.power_pulse_ms);
        apply(&mut timings.power_settle, overrides.power_settle_ms);
        apply(&mut timings.reboot_settle, overrides.reboot_settle_ms);
        if let Some(attempts) = overrides.startup_attempts {
            timings.startup_attempts = attempts;
        }
        timings
    }

    pub fn gate_pulse(&self) -> Duration {
        let ms = self
            .gpio
            .as_ref()
            .and_then(|g| g.gate_pulse_ms)
            .unwrap_or(DEFAULT_GATE_PULSE_MS);
        Duration::from_millis(ms)
    }

    /// Build the runtime settings handed to `GateContext`.
    pub fn to_settings(&self) -> GateSettings {
        GateSettings {
            admin_numbers: self.access.admin_numbers.clone(),
            queue_capacity: self.runtime.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            overflow_policy: self.runtime.overflow_policy.unwrap_or_default(),
            listen_interval: Duration::from_millis(
                self.runtime
                    .listen_interval_ms
                    .unwrap_or(DEFAULT_LISTEN_INTERVAL_MS),
            ),
            slot_strategy: self.slot_strategy(),
            contact_name: self.access.contact_name.clone().unwrap_or_default(),
        }
    }
}

impl Validate for GatekeeperConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
