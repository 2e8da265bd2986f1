//! In-memory SIM800-style modem.
//!
//! Speaks enough of the AT dialect for the gatekeeper to run without
//! hardware: phonebook reads and writes, SMS storage, reading, deleting and
//! sending, plus unsolicited `RING`/`+CLIP:`/`+CMTI:` notifications.
//! Handles are cheap clones sharing one state, so a test can keep a handle
//! while the modem owns another.

use crate::domain::model::{IndexRange, NumberType, PhonebookEntry};
use crate::domain::ports::Transport;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

const CTRL_Z: u8 = 0x1A;
const DEFAULT_TIMESTAMP: &str = "24/10/19,12:00:00+08";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSms {
    pub sender: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub recipient: String,
    pub body: String,
}

#[derive(Debug)]
struct SimState {
    echo: bool,
    range: IndexRange,
    phonebook: BTreeMap<u32, PhonebookEntry>,
    mailbox: BTreeMap<u32, StoredSms>,
    /// Bytes waiting to be read by the host.
    rx: Vec<u8>,
    /// Partial command line written by the host.
    line: Vec<u8>,
    sms_recipient: Option<String>,
    commands: Vec<String>,
    sent: Vec<SentSms>,
    overrides: HashMap<String, String>,
    muted: u32,
    next_reference: u32,
}

#[derive(Debug, Clone)]
pub struct SimulatedModem {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedModem {
    fn default() -> Self {
        Self::new(IndexRange { min: 1, max: 250 })
    }
}

impl SimulatedModem {
    pub fn new(range: IndexRange) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                echo: true,
                range,
                phonebook: BTreeMap::new(),
                mailbox: BTreeMap::new(),
                rx: Vec::new(),
                line: Vec::new(),
                sms_recipient: None,
                commands: Vec::new(),
                sent: Vec::new(),
                overrides: HashMap::new(),
                muted: 0,
                next_reference: 1,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_contact(&self, index: u32, number: &str, name: &str) {
        self.state().phonebook.insert(
            index,
            PhonebookEntry {
                index,
                number: number.to_string(),
                number_type: NumberType::for_number(number),
                name: name.to_string(),
            },
        );
    }

    pub fn contacts(&self) -> Vec<PhonebookEntry> {
        self.state().phonebook.values().cloned().collect()
    }

    /// Store an SMS at `index` without notifying the host.
    pub fn store_sms(&self, index: u32, sender: &str, body: &str) {
        self.state().mailbox.insert(
            index,
            StoredSms {
                sender: sender.to_string(),
                body: body.to_string(),
            },
        );
    }

    /// Store an SMS in the first free mailbox slot and raise `+CMTI:`.
    pub fn deliver_sms(&self, sender: &str, body: &str) -> u32 {
        let index = {
            let state = self.state();
            (1..).find(|i| !state.mailbox.contains_key(i)).unwrap_or(1)
        };
        self.deliver_sms_at(index, sender, body);
        index
    }

    pub fn deliver_sms_at(&self, index: u32, sender: &str, body: &str) {
        self.store_sms(index, sender, body);
        self.inject(&format!("\r\n+CMTI: \"SM\",{}\r\n", index));
    }

    pub fn mailbox(&self) -> BTreeMap<u32, StoredSms> {
        self.state().mailbox.clone()
    }

    /// Incoming call; `None` withholds the caller id.
    pub fn ring(&self, caller: Option<&str>) {
        let clip = caller.unwrap_or_default();
        let number_type = NumberType::for_number(clip).code();
        self.inject(&format!(
            "\r\nRING\r\n\r\n+CLIP: \"{}\",{},\"\",0,\"\",0\r\n",
            clip, number_type
        ));
    }

    /// Queue raw unsolicited text for the host.
    pub fn inject(&self, text: &str) {
        self.state().rx.extend_from_slice(text.as_bytes());
    }

    /// Every command line the host has written, without CRLF.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    pub fn count_command(&self, command: &str) -> usize {
        self.state().commands.iter().filter(|c| *c == command).count()
    }

    pub fn sent_messages(&self) -> Vec<SentSms> {
        self.state().sent.clone()
    }

    /// Leave the next `count` commands unanswered.
    pub fn mute_next(&self, count: u32) {
        self.state().muted = count;
    }

    /// Answer `command` with `reply` instead of the built-in behavior.
    pub fn override_reply(&self, command: &str, reply: &str) {
        self.state()
            .overrides
            .insert(command.to_string(), reply.to_string());
    }
}

#[async_trait]
impl Transport for SimulatedModem {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        for &byte in data {
            if state.sms_recipient.is_some() {
                if byte == CTRL_Z {
                    state.finish_sms();
                } else if byte == b'\n' && state.line.is_empty() {
                    // 指令列結尾的 LF, 不屬於簡訊內容
                } else {
                    state.line.push(byte);
                }
                continue;
            }

            match byte {
                b'\r' => {
                    let line = String::from_utf8_lossy(&state.line).trim().to_string();
                    state.line.clear();
                    if !line.is_empty() {
                        state.handle_command(&line);
                    }
                }
                b'\n' => {}
                _ => state.line.push(byte),
            }
        }
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.state().rx))
    }
}

impl SimState {
    fn handle_command(&mut self, line: &str) {
        self.commands.push(line.to_string());

        if self.muted > 0 {
            self.muted -= 1;
            return;
        }

        let reply = match self.overrides.get(line) {
            Some(reply) => reply.clone(),
            None => self.respond(line),
        };

        if self.echo {
            self.rx.extend_from_slice(format!("{}\r\r\n", line).as_bytes());
        }
        self.rx.extend_from_slice(reply.as_bytes());
    }

    fn respond(&mut self, line: &str) -> String {
        match line {
            "AT" | "AT+CFUN=1,1" | "AT+CIICR" | "AT+CLIP=1" | "AT+CMGF=1" | "ATH" => ok(),
            "ATE1" => {
                self.echo = true;
                ok()
            }
            "ATE0" => {
                self.echo = false;
                ok()
            }
            "AT+CPIN?" => payload("+CPIN: READY"),
            "AT+CSQ" => payload("+CSQ: 18,0"),
            "AT+COPS?" => payload("+COPS: 0,0,\"Simulated\""),
            "AT+CREG?" => payload("+CREG: 0,1"),
            "AT+CSTT?" => payload("+CSTT: \"internet\",\"\",\"\""),
            "AT+CIFSR" => "\r\n10.64.12.7\r\n".to_string(),
            "AT+CPBR=?" => payload(&format!("+CPBR: ({}-{}),40,17", self.range.min, self.range.max)),
            "AT+CMGD=1,4" => {
                self.mailbox.clear();
                ok()
            }
            _ => self.respond_with_arguments(line),
        }
    }

    fn respond_with_arguments(&mut self, line: &str) -> String {
        if line.starts_with("AT+CSTT=") {
            return ok();
        }
        if let Some(arg) = line.strip_prefix("AT+CPBR=") {
            return self.read_contact(arg);
        }
        if let Some(args) = line.strip_prefix("AT+CPBW=") {
            return self.write_contact(args);
        }
        if let Some(arg) = line.strip_prefix("AT+CMGR=") {
            return self.read_sms(arg);
        }
        if let Some(arg) = line.strip_prefix("AT+CMGD=") {
            return match arg.trim().parse::<u32>() {
                Ok(index) => {
                    self.mailbox.remove(&index);
                    ok()
                }
                Err(_) => error(),
            };
        }
        if let Some(arg) = line.strip_prefix("AT+CMGS=") {
            self.sms_recipient = Some(arg.trim_matches('"').to_string());
            self.line.clear();
            return "\r\n> ".to_string();
        }
        error()
    }

    fn read_contact(&self, arg: &str) -> String {
        let Ok(index) = arg.trim().parse::<u32>() else {
            return error();
        };
        if index < self.range.min || index > self.range.max {
            return "\r\n+CME ERROR: 21\r\n".to_string();
        }
        match self.phonebook.get(&index) {
            Some(entry) => payload(&format!(
                "+CPBR: {},\"{}\",{},\"{}\"",
                entry.index,
                entry.number,
                entry.number_type.code(),
                entry.name
            )),
            None => ok(),
        }
    }

    fn write_contact(&mut self, args: &str) -> String {
        let mut parts = args.splitn(4, ',');
        let Some(Ok(index)) = parts.next().map(|i| i.trim().parse::<u32>()) else {
            return error();
        };
        if index < self.range.min || index > self.range.max {
            return "\r\n+CME ERROR: 21\r\n".to_string();
        }

        let number = parts.next().map(|n| n.trim().trim_matches('"').to_string());
        match number {
            None => {
                self.phonebook.remove(&index);
            }
            Some(number) => {
                let number_type = parts
                    .next()
                    .and_then(|t| t.trim().parse::<u8>().ok())
                    .map(NumberType::from_code)
                    .unwrap_or_else(|| NumberType::for_number(&number));
                let name = parts
                    .next()
                    .map(|n| n.trim().trim_matches('"').to_string())
                    .unwrap_or_default();
                self.phonebook.insert(
                    index,
                    PhonebookEntry {
                        index,
                        number,
                        number_type,
                        name,
                    },
                );
            }
        }
        ok()
    }

    fn read_sms(&self, arg: &str) -> String {
        let Ok(index) = arg.trim().parse::<u32>() else {
            return error();
        };
        match self.mailbox.get(&index) {
            Some(sms) => format!(
                "\r\n+CMGR: \"REC UNREAD\",\"{}\",\"\",\"{}\"\r\n{}\r\n\r\nOK\r\n",
                sms.sender, DEFAULT_TIMESTAMP, sms.body
            ),
            None => ok(),
        }
    }

    fn finish_sms(&mut self) {
        let body = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        if let Some(recipient) = self.sms_recipient.take() {
            self.sent.push(SentSms { recipient, body });
        }
        let reference = self.next_reference;
        self.next_reference += 1;
        self.rx
            .extend_from_slice(format!("\r\n+CMGS: {}\r\n\r\nOK\r\n", reference).as_bytes());
    }
}

fn ok() -> String {
    "\r\nOK\r\n".to_string()
}

fn error() -> String {
    "\r\nERROR\r\n".to_string()
}

fn payload(line: &str) -> String {
    format!("\r\n{}\r\n\r\nOK\r\n", line)
}
