#![allow(dead_code)]

use async_trait::async_trait;
use gsm_gatekeeper::adapters::SimulatedModem;
use gsm_gatekeeper::domain::model::IndexRange;
use gsm_gatekeeper::domain::ports::GateActuator;
use gsm_gatekeeper::{GateContext, GateSettings, Modem, ModemTimings, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ADMIN: &str = "+48111222333";

/// Millisecond deadlines; the simulator answers immediately.
pub fn fast_timings() -> ModemTimings {
    let short = Duration::from_millis(5);
    ModemTimings {
        poll_tick: Duration::from_millis(1),
        command: short,
        echo_delay: short,
        range_query: short,
        phonebook_read: short,
        sms_read: short,
        sms_prompt: short,
        sms_confirm: Duration::from_millis(50),
        power_pulse: Duration::from_millis(1),
        power_settle: Duration::from_millis(1),
        reboot_settle: Duration::from_millis(1),
        startup_attempts: 3,
    }
}

/// Ten phonebook slots keep the linear scans short.
pub fn small_sim() -> SimulatedModem {
    SimulatedModem::new(IndexRange { min: 1, max: 10 })
}

pub fn sim_modem(sim: &SimulatedModem) -> Arc<Modem<SimulatedModem>> {
    Arc::new(Modem::new("sim", sim.clone(), fast_timings()))
}

#[derive(Debug, Clone, Default)]
pub struct RecordingGate {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingGate {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl GateActuator for RecordingGate {
    async fn grant_access(&self, caller_number: &str) -> Result<()> {
        self.opened.lock().unwrap().push(caller_number.to_string());
        Ok(())
    }
}

pub fn gate_context(sim: &SimulatedModem) -> (Arc<GateContext<SimulatedModem>>, RecordingGate) {
    let gate = RecordingGate::default();
    let settings = GateSettings {
        admin_numbers: vec![ADMIN.to_string()],
        listen_interval: Duration::from_millis(5),
        ..GateSettings::default()
    };
    let ctx = GateContext::new(sim_modem(sim), settings, Box::new(gate.clone()));
    (Arc::new(ctx), gate)
}

pub fn cpbw_writes(sim: &SimulatedModem) -> usize {
    sim.commands()
        .iter()
        .filter(|c| c.starts_with("AT+CPBW="))
        .count()
}

/// Poll `check` until it holds or two seconds pass.
pub async fn wait_for<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..400 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
