use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte channel to the modem.
///
/// Implementations are never shared directly; `Modem` owns the transport
/// behind a mutex so that no two logical operations interleave their bytes.
#[async_trait]
pub trait Transport: Send {
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Returns whatever is currently buffered without waiting.
    /// An empty vector means "nothing yet" and is not an error.
    async fn read_available(&mut self) -> Result<Vec<u8>>;
}

/// Modem power-enable line.
#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Pulse the power key (high, hold, low).
    async fn power_cycle(&self) -> Result<()>;
}

/// Whatever physically opens the gate.
#[async_trait]
pub trait GateActuator: Send + Sync {
    async fn grant_access(&self, caller_number: &str) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data).await
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        (**self).read_available().await
    }
}
