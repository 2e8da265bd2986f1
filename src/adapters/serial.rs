use crate::domain::ports::Transport;
use crate::utils::error::Result;
use async_trait::async_trait;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// UART link to the modem (8N1).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(Duration::from_millis(50))
            .open()?;

        tracing::info!("Opened serial port {} at {} baud", port_name, baud_rate);
        Ok(Self { port })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        // 只讀取已在緩衝區的位元組, 不阻塞
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; pending];
        let read = match self.port.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        buffer.truncate(read);
        Ok(buffer)
    }
}
