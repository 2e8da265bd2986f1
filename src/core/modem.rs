use crate::domain::model::{AtOutcome, ModemState};
use crate::domain::ports::{PowerControl, Transport};
use crate::utils::error::{GateError, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Terminates the body of `AT+CMGS`.
pub const CTRL_Z: u8 = 0x1A;

/// SIM800 的計時設定, 預設值取自實機量測
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemTimings {
    /// Granularity of response polling.
    pub poll_tick: Duration,
    /// Default deadline for a command/response exchange.
    pub command: Duration,
    /// Wait after `ATE1` before probing with `AT`.
    pub echo_delay: Duration,
    pub range_query: Duration,
    pub phonebook_read: Duration,
    pub sms_read: Duration,
    pub sms_prompt: Duration,
    pub sms_confirm: Duration,
    /// How long the power key is held high.
    pub power_pulse: Duration,
    /// Settle time after a power-key pulse.
    pub power_settle: Duration,
    /// Settle time after `AT+CFUN=1,1`.
    pub reboot_settle: Duration,
    pub startup_attempts: u32,
}

impl Default for ModemTimings {
    fn default() -> Self {
        Self {
            poll_tick: Duration::from_millis(10),
            command: Duration::from_millis(2000),
            echo_delay: Duration::from_millis(2000),
            range_query: Duration::from_millis(500),
            phonebook_read: Duration::from_millis(300),
            sms_read: Duration::from_millis(500),
            sms_prompt: Duration::from_millis(1000),
            sms_confirm: Duration::from_millis(5000),
            power_pulse: Duration::from_secs(2),
            power_settle: Duration::from_secs(8),
            reboot_settle: Duration::from_secs(10),
            startup_attempts: 3,
        }
    }
}

/// AT transaction engine over an exclusively owned transport.
///
/// Every public operation holds the transport lock for its whole duration,
/// so a multi-step exchange (read SMS, send SMS) is never interleaved with
/// listener reads or other transactions.
pub struct Modem<T: Transport> {
    port_name: String,
    transport: Mutex<T>,
    timings: ModemTimings,
}

impl<T: Transport> Modem<T> {
    pub fn new(port_name: impl Into<String>, transport: T, timings: ModemTimings) -> Self {
        Self {
            port_name: port_name.into(),
            transport: Mutex::new(transport),
            timings,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn timings(&self) -> &ModemTimings {
        &self.timings
    }

    /// Send `command` and poll until `timeout` elapses.
    ///
    /// The full deadline is always waited out, even if the token shows up
    /// early. `Err` only comes from the transport itself.
    pub async fn execute(&self, command: &str, expected: &str, timeout: Duration) -> Result<AtOutcome> {
        let mut link = self.transport.lock().await;
        let outcome = self
            .exchange(&mut *link, command, expected, timeout)
            .await?;
        self.trace_outcome(command, &outcome);
        Ok(outcome)
    }

    /// Listener read: whatever arrived outside of a transaction.
    pub async fn read_unsolicited(&self) -> Result<String> {
        let mut link = self.transport.lock().await;
        let bytes = link.read_available().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Probe the modem, power-cycling it between failed attempts.
    pub async fn check_start(&self, power: &dyn PowerControl) -> Result<ModemState> {
        let attempts = self.timings.startup_attempts;
        let mut state = ModemState::Probing;
        tracing::info!("Probing modem on {} (state: {})", self.port_name, state);

        for attempt in 1..=attempts {
            self.execute("ATE1", "OK", self.timings.echo_delay).await?;
            let probe = self.execute("AT", "OK", self.timings.command).await?;

            if probe.is_success() {
                state = ModemState::Ready;
                tracing::info!("Modem is {} after {} attempt(s)", state, attempt);
                return Ok(state);
            }

            tracing::warn!(
                "Modem probe {}/{} failed, power-cycling and waiting {:?}",
                attempt,
                attempts,
                self.timings.power_settle
            );
            power.power_cycle().await?;
            sleep(self.timings.power_settle).await;
        }

        state = ModemState::Failed;
        tracing::error!("Modem is {} after {} attempts", state, attempts);
        Err(GateError::StartupFailed { attempts })
    }

    /// Full reset followed by the ordered GSM configuration list.
    /// Stops at the first command that does not succeed.
    pub async fn bring_up_gsm(&self, apn: &str) -> Result<()> {
        tracing::info!("Resetting GSM module");
        let reset = self.full_reset().await?;
        if !reset.is_success() {
            tracing::warn!("Full reset was not acknowledged: {:?}", reset);
        }
        tracing::info!("Waiting {:?} for the module to reboot", self.timings.reboot_settle);
        sleep(self.timings.reboot_settle).await;

        for (command, expected) in bring_up_commands(apn) {
            let outcome = self.execute(&command, expected, self.timings.command).await?;
            if let Err(e) = outcome.require(&command, expected) {
                tracing::error!("GSM bring-up stopped at {}: {}", command, e);
                return Err(GateError::BringUpFailed {
                    command,
                    cause: e.to_string(),
                });
            }
        }

        tracing::info!("GSM module ready");
        Ok(())
    }

    pub async fn enable_caller_id(&self) -> Result<()> {
        self.require("AT+CLIP=1", "OK").await
    }

    pub async fn text_mode(&self) -> Result<()> {
        self.require("AT+CMGF=1", "OK").await
    }

    /// Startup, bring-up, caller id and text-mode SMS, in that order.
    pub async fn init_device(&self, power: &dyn PowerControl, apn: &str) -> Result<()> {
        self.check_start(power).await?;
        self.bring_up_gsm(apn).await?;
        self.configure_notifications().await
    }

    /// Caller id and text-mode SMS; both are required for the dispatcher.
    pub async fn configure_notifications(&self) -> Result<()> {
        self.enable_caller_id()
            .await
            .map_err(|e| bring_up_error("AT+CLIP=1", e))?;
        self.text_mode()
            .await
            .map_err(|e| bring_up_error("AT+CMGF=1", e))?;
        Ok(())
    }

    pub async fn full_reset(&self) -> Result<AtOutcome> {
        self.execute("AT+CFUN=1,1", "OK", self.timings.command).await
    }

    pub async fn hang_up(&self) -> Result<AtOutcome> {
        self.execute("ATH", "OK", self.timings.command).await
    }

    pub async fn delete_sms(&self, index: u32) -> Result<AtOutcome> {
        self.execute(&format!("AT+CMGD={}", index), "OK", self.timings.sms_read)
            .await
    }

    pub async fn delete_all_sms(&self) -> Result<AtOutcome> {
        self.execute("AT+CMGD=1,4", "OK", self.timings.command).await
    }

    /// Raw `AT+CMGR` response for the message stored at `index`.
    pub async fn read_sms(&self, index: u32) -> Result<String> {
        let mut link = self.transport.lock().await;

        // 讀取前確保文字模式
        let mode = self
            .exchange(&mut *link, "AT+CMGF=1", "OK", self.timings.sms_read)
            .await?;
        if !mode.is_success() {
            tracing::warn!("AT+CMGF=1 before reading SMS {}: {:?}", index, mode);
        }

        let command = format!("AT+CMGR={}", index);
        let outcome = self
            .exchange(&mut *link, &command, "OK", self.timings.sms_read)
            .await?;
        self.trace_outcome(&command, &outcome);

        match outcome {
            AtOutcome::Success(raw) | AtOutcome::Mismatch(raw) => Ok(raw),
            AtOutcome::NoResponse => Err(GateError::TransportTimeout { command }),
        }
    }

    /// Send a text-mode SMS and wait for the modem's confirmation.
    pub async fn send_sms(&self, number: &str, body: &str) -> Result<AtOutcome> {
        let mut link = self.transport.lock().await;
        tracing::info!("Sending SMS to {}", number);

        let mode = self
            .exchange(&mut *link, "AT+CMGF=1", "OK", self.timings.sms_read)
            .await?;
        if !mode.is_success() {
            tracing::warn!("AT+CMGF=1 before sending SMS: {:?}", mode);
        }

        let command = format!("AT+CMGS=\"{}\"", number);
        let prompt = self
            .exchange(&mut *link, &command, ">", self.timings.sms_prompt)
            .await?;
        if !prompt.is_success() {
            tracing::warn!("No SMS prompt after {}: {:?}", command, prompt);
        }

        let mut payload = body.as_bytes().to_vec();
        payload.push(CTRL_Z);
        link.write(&payload).await?;

        let deadline = Instant::now() + self.timings.sms_confirm;
        let raw = self
            .collect(&mut *link, deadline, |text| {
                text.contains("+CMGS") || text.contains("OK") || text.contains("ERROR")
            })
            .await?;

        let outcome = classify_response(&raw, "+CMGS");
        match &outcome {
            AtOutcome::Success(_) => tracing::info!("SMS to {} confirmed", number),
            AtOutcome::Mismatch(raw) => {
                tracing::warn!("SMS to {} not confirmed: {}", number, raw.trim())
            }
            AtOutcome::NoResponse => tracing::warn!("No response from modem after SMS to {}", number),
        }
        Ok(outcome)
    }

    async fn require(&self, command: &str, expected: &str) -> Result<()> {
        self.execute(command, expected, self.timings.command)
            .await?
            .require(command, expected)
            .map(|_| ())
    }

    async fn exchange(
        &self,
        link: &mut T,
        command: &str,
        expected: &str,
        timeout: Duration,
    ) -> Result<AtOutcome> {
        tracing::debug!("[{}] >> {}", self.port_name, command);
        link.write(format!("{}\r\n", command).as_bytes()).await?;

        let deadline = Instant::now() + timeout;
        let raw = self.collect(link, deadline, |_| false).await?;
        Ok(classify_response(&raw, expected))
    }

    /// Accumulate bytes until `deadline` or until `done` accepts the text.
    async fn collect<F>(&self, link: &mut T, deadline: Instant, done: F) -> Result<Vec<u8>>
    where
        F: Fn(&str) -> bool,
    {
        let mut buffer = Vec::new();
        loop {
            let chunk = link.read_available().await?;
            if !chunk.is_empty() {
                buffer.extend_from_slice(&chunk);
                if done(&String::from_utf8_lossy(&buffer)) {
                    break;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(self.timings.poll_tick).await;
        }
        Ok(buffer)
    }

    fn trace_outcome(&self, command: &str, outcome: &AtOutcome) {
        match outcome {
            AtOutcome::Success(raw) => {
                tracing::debug!("[{}] << {}", self.port_name, raw.trim())
            }
            AtOutcome::Mismatch(raw) => {
                tracing::debug!("[{}] {} back: {}", self.port_name, command, raw.trim())
            }
            AtOutcome::NoResponse => tracing::debug!("[{}] {} no response", self.port_name, command),
        }
    }
}

/// Configuration list run after the full reset, with the token each step must return.
pub fn bring_up_commands(apn: &str) -> Vec<(String, &'static str)> {
    vec![
        ("AT".to_string(), "OK"),
        ("ATE1".to_string(), "OK"),
        ("AT+CPIN?".to_string(), "READY"),
        ("AT+CSQ".to_string(), "OK"),
        ("AT+COPS?".to_string(), "OK"),
        ("AT+CREG?".to_string(), "0,1"),
        (format!("AT+CSTT=\"{}\",\"\",\"\"", apn), "OK"),
        ("AT+CSTT?".to_string(), "OK"),
        ("AT+CIICR".to_string(), "OK"),
        // 只要有回應 (本地 IP) 即可
        ("AT+CIFSR".to_string(), ""),
    ]
}

fn classify_response(raw: &[u8], expected: &str) -> AtOutcome {
    if raw.is_empty() {
        return AtOutcome::NoResponse;
    }
    let text = String::from_utf8_lossy(raw).into_owned();
    if text.contains(expected) {
        AtOutcome::Success(text)
    } else {
        AtOutcome::Mismatch(text)
    }
}

fn bring_up_error(command: &str, cause: GateError) -> GateError {
    GateError::BringUpFailed {
        command: command.to_string(),
        cause: cause.to_string(),
    }
}
