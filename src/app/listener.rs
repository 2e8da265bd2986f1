use crate::app::context::GateContext;
use crate::core::queue::PushOutcome;
use crate::domain::ports::Transport;
use std::sync::Arc;

/// Poll the modem for unsolicited text and queue every non-empty chunk.
pub async fn run_listener<T: Transport + 'static>(ctx: Arc<GateContext<T>>) {
    let mut shutdown = ctx.subscribe_shutdown();

    while !ctx.is_shutting_down() {
        tokio::select! {
            _ = tokio::time::sleep(ctx.listen_interval()) => {}
            _ = shutdown.changed() => {}
        }
        if ctx.is_shutting_down() {
            break;
        }

        let chunk = match ctx.modem().read_unsolicited().await {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("Listener read failed: {}", e);
                continue;
            }
        };
        if chunk.trim().is_empty() {
            continue;
        }

        tracing::debug!("Unsolicited: {:?}", chunk.trim());
        match ctx.queue().push(chunk) {
            PushOutcome::Queued => {}
            PushOutcome::Rejected(dropped) => tracing::warn!(
                "Event queue full ({}), dropping {:?}",
                ctx.queue().capacity(),
                dropped.trim()
            ),
            PushOutcome::Evicted(dropped) => tracing::warn!(
                "Event queue full ({}), evicted oldest {:?}",
                ctx.queue().capacity(),
                dropped.trim()
            ),
            PushOutcome::Closed(_) => break,
        }
    }

    tracing::info!("Listener stopped");
}
