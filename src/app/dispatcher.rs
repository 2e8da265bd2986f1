use crate::app::context::GateContext;
use crate::core::classifier::classify;
use crate::core::interpreter;
use crate::core::sms::{parse_sms, should_purge_mailbox};
use crate::domain::model::{AdminCommand, AtOutcome, Notification};
use crate::domain::ports::Transport;
use crate::utils::error::Result;
use std::sync::Arc;

/// What the dispatcher did with one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    CallGranted { caller: String },
    CallRejected { caller: Option<String> },
    SmsProcessed {
        index: u32,
        sender: Option<String>,
        reply: Option<String>,
    },
    Ignored,
}

/// Consume the queue one notification at a time until it is closed and drained.
pub async fn run_dispatcher<T: Transport + 'static>(ctx: Arc<GateContext<T>>) {
    while let Some(chunk) = ctx.queue().next().await {
        // 單一通知失敗不影響後續處理
        match handle_chunk(&ctx, &chunk).await {
            Ok(handled) => tracing::debug!("Handled notification: {:?}", handled),
            Err(e) => tracing::warn!(
                "Failed to handle notification {:?}: {} ({})",
                chunk.trim(),
                e,
                e.recovery_suggestion()
            ),
        }
    }
    tracing::info!("Dispatcher stopped");
}

pub async fn handle_chunk<T: Transport + 'static>(ctx: &GateContext<T>, chunk: &str) -> Result<Handled> {
    match classify(chunk) {
        Notification::IncomingCall {
            caller_number,
            caller_name,
        } => {
            tracing::info!(
                "📞 Incoming call from {} ({})",
                caller_number.as_deref().unwrap_or("unknown"),
                caller_name.as_deref().unwrap_or("no name")
            );
            handle_call(ctx, caller_number).await
        }
        Notification::IncomingSms { index } => {
            tracing::info!("✉️ New SMS at index {}", index);
            handle_sms(ctx, index).await
        }
        Notification::Unknown { raw } => {
            tracing::info!("Response unknown: {:?}", raw.trim());
            Ok(Handled::Ignored)
        }
    }
}

/// Look the caller up, hang up exactly once, and open the gate when authorized.
pub async fn handle_call<T: Transport + 'static>(
    ctx: &GateContext<T>,
    caller_number: Option<String>,
) -> Result<Handled> {
    let Some(caller) = caller_number else {
        tracing::warn!("Caller id missing, hanging up");
        hang_up(ctx).await?;
        return Ok(Handled::CallRejected { caller: None });
    };

    let authorized = match ctx.store().find(&caller).await {
        Ok(entry) => entry.is_some(),
        Err(e) => {
            tracing::warn!("Phonebook lookup for {} failed: {}", caller, e);
            false
        }
    };

    hang_up(ctx).await?;

    if authorized {
        tracing::info!("Caller {} is in SIM contacts", caller);
        ctx.gate().grant_access(&caller).await?;
        Ok(Handled::CallGranted { caller })
    } else {
        tracing::warn!("Unknown number {}, call rejected", caller);
        Ok(Handled::CallRejected {
            caller: Some(caller),
        })
    }
}

/// Read the message, free its mailbox slot, and run admin commands from GK numbers.
pub async fn handle_sms<T: Transport + 'static>(ctx: &GateContext<T>, index: u32) -> Result<Handled> {
    let raw = ctx.modem().read_sms(index).await?;
    let sms = parse_sms(index, &raw);
    tracing::info!(
        "SMS from {}: {:?}",
        sms.sender.as_deref().unwrap_or("unknown"),
        sms.body
    );

    if should_purge_mailbox(index) {
        let outcome = ctx.modem().delete_all_sms().await?;
        if outcome.is_success() {
            tracing::info!("All messages deleted");
        } else {
            tracing::warn!("Failed to delete all messages: {:?}", outcome);
        }
    } else {
        match ctx.modem().delete_sms(index).await? {
            AtOutcome::Success(_) => tracing::info!("SMS at index {} deleted", index),
            AtOutcome::Mismatch(raw) => {
                tracing::warn!("Failed to delete SMS at index {}: {}", index, raw.trim())
            }
            AtOutcome::NoResponse => {
                tracing::warn!("No response after deleting SMS at index {}", index)
            }
        }
    }

    let sender = match sms.sender {
        Some(sender) if ctx.is_admin(&sender) => sender,
        other => {
            tracing::info!("Sender {:?} is not a GK number", other);
            return Ok(Handled::SmsProcessed {
                index,
                sender: other,
                reply: None,
            });
        }
    };

    let command = AdminCommand::parse(&sms.body);
    let reply = interpreter::execute(&command, ctx.store()).await?;
    if let Some(text) = &reply {
        let outcome = ctx.modem().send_sms(&sender, text).await?;
        if !outcome.is_success() {
            tracing::warn!("Reply to {} may not have been delivered", sender);
        }
    }

    Ok(Handled::SmsProcessed {
        index,
        sender: Some(sender),
        reply,
    })
}

async fn hang_up<T: Transport + 'static>(ctx: &GateContext<T>) -> Result<()> {
    let outcome = ctx.modem().hang_up().await?;
    if !outcome.is_success() {
        tracing::warn!("ATH not acknowledged: {:?}", outcome);
    }
    Ok(())
}
