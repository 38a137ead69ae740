//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for Ctrl-C (SIGINT)
//! - Translate it into a triggered `Cancellation`
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second Ctrl-C is left to the default handler once the first fired

use tokio::task::JoinHandle;

use crate::lifecycle::Cancellation;

/// Trigger `cancel` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(cancel: Cancellation) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::warn!("Interrupt received, cancelling outstanding transfers");
                    cancel.trigger();
                }
                Err(err) => tracing::error!(error = %err, "Failed to listen for Ctrl-C"),
            },
            _ = cancel.cancelled() => {}
        }
    })
}
