//! Administrator SMS command language.
//!
//! `+<number>` authorizes, `-<number>` revokes, `?<number>` queries.
//! Informational texts from the carrier are ignored without a reply.

use crate::core::phonebook::AuthorizationStore;
use crate::domain::model::{AddOutcome, AdminCommand, DeleteOutcome, QueryOutcome};
use crate::domain::ports::Transport;
use crate::utils::error::Result;

/// Carrier informational messages ("in progress...", "you have...").
pub const CARRIER_INFO_PREFIXES: [&str; 2] = ["W trakcie", "Masz"];

pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command. Use +, - or ?.";

impl AdminCommand {
    pub fn parse(body: &str) -> Self {
        let text = body.trim();

        if CARRIER_INFO_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
            return AdminCommand::Ignore;
        }

        let mut chars = text.chars();
        let Some(prefix) = chars.next() else {
            return AdminCommand::Unrecognized;
        };
        let operand = chars
            .as_str()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        match prefix {
            '+' => AdminCommand::Add(operand),
            '-' => AdminCommand::Delete(operand),
            '?' => AdminCommand::Query(operand),
            _ => AdminCommand::Unrecognized,
        }
    }
}

/// Run the command against the store and build the reply text, if any.
pub async fn execute<T: Transport>(
    command: &AdminCommand,
    store: &AuthorizationStore<T>,
) -> Result<Option<String>> {
    let reply = match command {
        AdminCommand::Add(number) => Some(add_reply(number, store.add(number).await?)),
        AdminCommand::Delete(number) => Some(delete_reply(number, store.delete(number).await?)),
        AdminCommand::Query(number) => Some(query_reply(number, store.query(number).await?)),
        AdminCommand::Ignore => None,
        AdminCommand::Unrecognized => Some(UNKNOWN_COMMAND_REPLY.to_string()),
    };

    match &reply {
        Some(text) => tracing::info!("Admin command {:?}: {}", command, text),
        None => tracing::debug!("Ignoring carrier message"),
    }
    Ok(reply)
}

pub fn add_reply(number: &str, outcome: AddOutcome) -> String {
    match outcome {
        AddOutcome::Added => format!("Number {} added to SIM card.", number),
        AddOutcome::AlreadyPresent => format!("Number {} already saved.", number),
        AddOutcome::Invalid => format!("Number {} is not valid.", number),
        AddOutcome::Failed => format!("Failed to save the number {}", number),
    }
}

pub fn delete_reply(number: &str, outcome: DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::Deleted => format!("Number {} deleted from SIM card.", number),
        DeleteOutcome::NotFound => format!("Number {} not found in SIM contacts.", number),
        DeleteOutcome::Invalid => format!("Number {} is not valid.", number),
        DeleteOutcome::Failed => format!("Failed to delete number {}.", number),
    }
}

pub fn query_reply(number: &str, outcome: QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Present => format!("Number {} is in SIM card.", number),
        QueryOutcome::NotFound => format!("Number {} not found.", number),
        QueryOutcome::Invalid => format!("Number {} is not valid.", number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(
            AdminCommand::parse("+48600000000"),
            AdminCommand::Add("48600000000".to_string())
        );
        assert_eq!(
            AdminCommand::parse("-48600000000"),
            AdminCommand::Delete("48600000000".to_string())
        );
        assert_eq!(
            AdminCommand::parse("?48600000000"),
            AdminCommand::Query("48600000000".to_string())
        );
        assert_eq!(AdminCommand::parse("hello"), AdminCommand::Unrecognized);
    }

    #[test]
    fn test_parse_takes_first_token_only() {
        assert_eq!(
            AdminCommand::parse("  + 600700800 please\nOK"),
            AdminCommand::Add("600700800".to_string())
        );
        assert_eq!(AdminCommand::parse("+"), AdminCommand::Add(String::new()));
    }

    #[test]
    fn test_parse_ignores_carrier_messages() {
        assert_eq!(
            AdminCommand::parse("W trakcie realizacji"),
            AdminCommand::Ignore
        );
        assert_eq!(AdminCommand::parse("Masz 5 nowych wiadomosci"), AdminCommand::Ignore);
        assert_eq!(AdminCommand::parse(""), AdminCommand::Unrecognized);
    }

    #[test]
    fn test_reply_templates() {
        assert_eq!(
            add_reply("48222333444", AddOutcome::Added),
            "Number 48222333444 added to SIM card."
        );
        assert_eq!(
            add_reply("48222333444", AddOutcome::AlreadyPresent),
            "Number 48222333444 already saved."
        );
        assert_eq!(
            delete_reply("600700800", DeleteOutcome::NotFound),
            "Number 600700800 not found in SIM contacts."
        );
        assert_eq!(
            query_reply("600700800", QueryOutcome::Present),
            "Number 600700800 is in SIM card."
        );
        assert_eq!(
            query_reply("12", QueryOutcome::Invalid),
            "Number 12 is not valid."
        );
    }
}
