use crate::domain::ports::{GateActuator, PowerControl};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Output pin driven through the sysfs GPIO interface.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    pin: u32,
    pulse: Duration,
}

impl SysfsGpio {
    pub fn new(pin: u32, pulse: Duration) -> Self {
        Self::with_root(SYSFS_GPIO_ROOT, pin, pulse)
    }

    pub fn with_root(root: impl AsRef<Path>, pin: u32, pulse: Duration) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pin,
            pulse,
        }
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    /// Export the pin if needed and configure it as an output driven low.
    pub async fn export(&self) -> Result<()> {
        if !tokio::fs::try_exists(self.pin_dir()).await? {
            tokio::fs::write(self.root.join("export"), self.pin.to_string()).await?;
        }
        tokio::fs::write(self.pin_dir().join("direction"), "out").await?;
        self.set(false).await
    }

    pub async fn set(&self, high: bool) -> Result<()> {
        let value = if high { "1" } else { "0" };
        tokio::fs::write(self.pin_dir().join("value"), value).await?;
        Ok(())
    }

    /// High for the configured pulse length, then low.
    pub async fn pulse(&self) -> Result<()> {
        self.set(true).await?;
        tokio::time::sleep(self.pulse).await;
        self.set(false).await
    }
}

#[async_trait]
impl PowerControl for SysfsGpio {
    async fn power_cycle(&self) -> Result<()> {
        tracing::info!("Pulsing modem power key on GPIO {}", self.pin);
        self.pulse().await
    }
}

#[async_trait]
impl GateActuator for SysfsGpio {
    async fn grant_access(&self, caller_number: &str) -> Result<()> {
        tracing::info!("🔓 Opening gate for {} (GPIO {})", caller_number, self.pin);
        self.pulse().await
    }
}

/// Used when no power pin is wired; the modem cannot be restarted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPower;

#[async_trait]
impl PowerControl for NoopPower {
    async fn power_cycle(&self) -> Result<()> {
        tracing::warn!("No power pin configured, cannot power-cycle the modem");
        Ok(())
    }
}

/// Used when no gate relay is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyGate;

#[async_trait]
impl GateActuator for LogOnlyGate {
    async fn grant_access(&self, caller_number: &str) -> Result<()> {
        tracing::info!("🔓 Access granted to {} (no gate pin configured)", caller_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_and_pulse_existing_pin() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("gpio14")).unwrap();

        let gpio = SysfsGpio::with_root(root.path(), 14, Duration::from_millis(1));
        gpio.export().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(root.path().join("gpio14/direction")).unwrap(),
            "out"
        );
        // 已存在的 pin 不需要 export
        assert!(!root.path().join("export").exists());

        gpio.set(true).await.unwrap();
        assert_eq!(std::fs::read_to_string(root.path().join("gpio14/value")).unwrap(), "1");

        gpio.power_cycle().await.unwrap();
        assert_eq!(std::fs::read_to_string(root.path().join("gpio14/value")).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_export_writes_pin_number() {
        let root = TempDir::new().unwrap();
        let gpio = SysfsGpio::with_root(root.path(), 15, Duration::from_millis(1));

        // 真實 sysfs 會在 export 後建立目錄, 這裡沒有, 所以 direction 寫入失敗
        assert!(gpio.export().await.is_err());
        assert_eq!(std::fs::read_to_string(root.path().join("export")).unwrap(), "15");
    }

    #[tokio::test]
    async fn test_fallback_adapters_succeed() {
        tokio_test::assert_ok!(NoopPower.power_cycle().await);
        tokio_test::assert_ok!(LogOnlyGate.grant_access("+48503815525").await);
    }
}
