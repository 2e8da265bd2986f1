//! SIM phonebook used as the list of numbers allowed to open the gate.
//!
//! Nothing is cached: the SIM card is the only source of truth, so every
//! `find`, `add`, `delete` and `query` re-scans the modem-reported index
//! range. One scan costs one `AT+CPBR=<i>` transaction per index (up to the
//! SIM capacity, typically 250). Use [`AuthorizationStore::snapshot`] when
//! several numbers have to be checked at once.

use crate::core::modem::Modem;
use crate::core::number::{check_number, same_subscriber};
use crate::domain::model::{
    AddOutcome, AtOutcome, DeleteOutcome, IndexRange, NumberType, PhonebookEntry, QueryOutcome,
};
use crate::domain::ports::Transport;
use crate::utils::error::{GateError, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)-(\d+)\)").expect("phonebook range pattern"));

const ENTRY_MARKER: &str = "+CPBR:";

/// Largest SIM phonebook we accept; garbled ranges above it are rejected.
pub const MAX_PHONEBOOK_SLOTS: u32 = 1000;

/// Which slot `add` writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStrategy {
    /// Always write this slot, overwriting whatever occupies it.
    Fixed(u32),
    /// First empty slot of the range; `add` fails when the SIM is full.
    FirstFree,
}

impl Default for SlotStrategy {
    fn default() -> Self {
        SlotStrategy::Fixed(1)
    }
}

#[derive(Debug, Default)]
struct Scan {
    range: Option<IndexRange>,
    hit: Option<PhonebookEntry>,
    first_free: Option<u32>,
}

pub struct AuthorizationStore<T: Transport> {
    modem: Arc<Modem<T>>,
    slot_strategy: SlotStrategy,
    contact_name: String,
}

impl<T: Transport> AuthorizationStore<T> {
    pub fn new(modem: Arc<Modem<T>>) -> Self {
        Self {
            modem,
            slot_strategy: SlotStrategy::default(),
            contact_name: String::new(),
        }
    }

    pub fn with_slot_strategy(mut self, slot_strategy: SlotStrategy) -> Self {
        self.slot_strategy = slot_strategy;
        self
    }

    pub fn with_contact_name(mut self, contact_name: impl Into<String>) -> Self {
        self.contact_name = contact_name.into();
        self
    }

    pub fn slot_strategy(&self) -> SlotStrategy {
        self.slot_strategy
    }

    /// Valid index range reported by `AT+CPBR=?`.
    /// Unparsable replies are logged and yield `None`; callers must not scan then.
    pub async fn list_range(&self) -> Result<Option<IndexRange>> {
        let outcome = self
            .modem
            .execute("AT+CPBR=?", "OK", self.modem.timings().range_query)
            .await?;

        match parse_index_range(outcome.raw().unwrap_or_default()) {
            Ok(range) => Ok(Some(range)),
            Err(e) => {
                tracing::warn!("Could not read SIM contact range: {}", e);
                Ok(None)
            }
        }
    }

    /// One phonebook slot; `None` when empty or unreadable.
    pub async fn read_slot(&self, index: u32) -> Result<Option<PhonebookEntry>> {
        let outcome = self
            .modem
            .execute(
                &format!("AT+CPBR={}", index),
                "OK",
                self.modem.timings().phonebook_read,
            )
            .await?;
        Ok(outcome.raw().and_then(parse_entry))
    }

    /// First entry whose number names the same subscriber. O(range) transactions.
    pub async fn find(&self, number: &str) -> Result<Option<PhonebookEntry>> {
        Ok(self.scan(number).await?.hit)
    }

    /// Every occupied slot, read in a single pass.
    pub async fn snapshot(&self) -> Result<Vec<PhonebookEntry>> {
        let Some(range) = self.list_range().await? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for index in range.indices() {
            if let Some(entry) = self.read_slot(index).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    pub async fn add(&self, number: &str) -> Result<AddOutcome> {
        if let Err(e) = check_number(number) {
            tracing::info!("Refusing to add: {}", e);
            return Ok(AddOutcome::Invalid);
        }

        let scan = self.scan(number).await?;
        if let Some(entry) = scan.hit {
            tracing::info!("Number {} already saved at index {}", number, entry.index);
            return Ok(AddOutcome::AlreadyPresent);
        }

        let slot = match self.slot_strategy {
            SlotStrategy::Fixed(slot) => slot,
            SlotStrategy::FirstFree => match scan.first_free {
                Some(slot) => slot,
                None => {
                    tracing::warn!("No free phonebook slot for {}", number);
                    return Ok(AddOutcome::Failed);
                }
            },
        };

        let number_type = NumberType::for_number(number);
        let command = format!(
            "AT+CPBW={},\"{}\",{},\"{}\"",
            slot,
            number,
            number_type.code(),
            self.contact_name
        );
        let outcome = self
            .modem
            .execute(&command, "OK", self.modem.timings().command)
            .await?;

        if outcome.is_success() {
            tracing::info!("Contact with number {} saved to SIM slot {}", number, slot);
            Ok(AddOutcome::Added)
        } else {
            tracing::error!("Failed to save contact {}: {:?}", number, outcome);
            Ok(AddOutcome::Failed)
        }
    }

    pub async fn delete(&self, number: &str) -> Result<DeleteOutcome> {
        if let Err(e) = check_number(number) {
            tracing::info!("Refusing to delete: {}", e);
            return Ok(DeleteOutcome::Invalid);
        }

        let scan = self.scan(number).await?;
        if scan.range.is_none() {
            return Ok(DeleteOutcome::Failed);
        }
        let Some(entry) = scan.hit else {
            tracing::info!("Number {} not found in SIM contacts", number);
            return Ok(DeleteOutcome::NotFound);
        };

        tracing::info!("Found number {} at index {}, deleting", number, entry.index);
        let outcome = self
            .modem
            .execute(
                &format!("AT+CPBW={}", entry.index),
                "OK",
                self.modem.timings().command,
            )
            .await?;

        match outcome {
            AtOutcome::Success(_) => Ok(DeleteOutcome::Deleted),
            other => {
                tracing::error!("Failed to clear slot {}: {:?}", entry.index, other);
                Ok(DeleteOutcome::Failed)
            }
        }
    }

    pub async fn query(&self, number: &str) -> Result<QueryOutcome> {
        if let Err(e) = check_number(number) {
            tracing::debug!("Query rejected: {}", e);
            return Ok(QueryOutcome::Invalid);
        }
        match self.find(number).await? {
            Some(_) => Ok(QueryOutcome::Present),
            None => Ok(QueryOutcome::NotFound),
        }
    }

    /// Linear scan, stopping at the first match.
    async fn scan(&self, number: &str) -> Result<Scan> {
        let mut scan = Scan {
            range: self.list_range().await?,
            ..Scan::default()
        };
        let Some(range) = scan.range else {
            return Ok(scan);
        };

        for index in range.indices() {
            match self.read_slot(index).await? {
                Some(entry) if same_subscriber(&entry.number, number) => {
                    scan.hit = Some(entry);
                    break;
                }
                Some(_) => {}
                None => {
                    scan.first_free.get_or_insert(index);
                }
            }
        }
        Ok(scan)
    }
}

/// `+CPBR: (1-250),40,17` -> `1..=250`
pub fn parse_index_range(text: &str) -> Result<IndexRange> {
    let failure = || GateError::ParseFailure {
        what: "phonebook range".to_string(),
        input: text.trim().to_string(),
    };

    let caps = RANGE_RE.captures(text).ok_or_else(failure)?;
    let min: u32 = caps[1].parse().map_err(|_| failure())?;
    let max: u32 = caps[2].parse().map_err(|_| failure())?;
    // 亂碼可能產生巨大的範圍, 逐格掃描會卡住數十億次
    if min > max || max - min >= MAX_PHONEBOOK_SLOTS {
        return Err(failure());
    }
    Ok(IndexRange { min, max })
}

/// `+CPBR: 3,"+48503815525",145,"Jan"` -> entry; empty slots have no `+CPBR:` line.
pub fn parse_entry(text: &str) -> Option<PhonebookEntry> {
    let line = text.lines().find(|line| line.contains(ENTRY_MARKER))?;
    let payload = line.split_once(ENTRY_MARKER)?.1;

    let mut parts = payload.splitn(4, ',');
    let index = parts.next()?.trim().parse().ok()?;
    let number = unquote(parts.next()?);
    if number.is_empty() {
        return None;
    }
    let number_type = parts
        .next()
        .and_then(|t| t.trim().parse::<u8>().ok())
        .map(NumberType::from_code)
        .unwrap_or_else(|| NumberType::for_number(number));
    let name = parts.next().map(unquote).unwrap_or_default();

    Some(PhonebookEntry {
        index,
        number: number.to_string(),
        number_type,
        name: name.to_string(),
    })
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"')
}
