//! Helper functions for UI operations.
//!
//! Background task spawning for page fetches and enrichment passes, and
//! panic containment for those tasks.

use crate::app::{App, AppEvent};
use crate::feed::EnrichPolicy;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// Instead of the task silently disappearing (caught by Tokio's runtime but
/// not handled), panics are converted to `Err(String)` containing the panic
/// message so the event loop can report them.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Send an event, logging if the loop has already shut down.
async fn send_event(tx: &mpsc::Sender<AppEvent>, event: AppEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

/// Claim and spawn the next page fetch.
///
/// Returns false when nothing was spawned (in flight, end of data). The
/// in-flight claim travels with the response, and is released by unwinding
/// if the task panics.
pub(super) fn spawn_page_fetch(
    app: &mut App,
    explicit: bool,
    event_tx: &mpsc::Sender<AppEvent>,
) -> bool {
    let Some(request) = app.begin_fetch(explicit) else {
        return false;
    };
    let page = request.page();
    tracing::debug!(page, explicit, "Spawning page fetch");

    let tx = event_tx.clone();
    tokio::spawn(async move {
        match catch_task_panic(request.run()).await {
            Ok(response) => send_event(&tx, AppEvent::PageLoaded(response), "PageLoaded").await,
            Err(panic_msg) => {
                tracing::error!(task = "page_fetch", page, error = %panic_msg, "Background task panicked");
                send_event(
                    &tx,
                    AppEvent::TaskPanicked {
                        task: "page_fetch",
                        error: panic_msg,
                    },
                    "TaskPanicked",
                )
                .await;
            }
        }
    });
    true
}

/// Snapshot the list and spawn an enrichment pass over it.
///
/// `policy` overrides the configured policy, e.g. to force a whole-list pass.
pub(super) fn spawn_enrichment(
    app: &mut App,
    policy: Option<EnrichPolicy>,
    event_tx: &mpsc::Sender<AppEvent>,
) -> bool {
    let Some(job) = app.begin_enrichment(policy) else {
        return false;
    };
    tracing::debug!(characters = job.character_count(), "Spawning enrichment pass");

    let tx = event_tx.clone();
    tokio::spawn(async move {
        match catch_task_panic(job.run()).await {
            Ok(result) => send_event(&tx, AppEvent::Enriched(result), "Enriched").await,
            Err(panic_msg) => {
                tracing::error!(task = "enrichment", error = %panic_msg, "Background task panicked");
                send_event(
                    &tx,
                    AppEvent::TaskPanicked {
                        task: "enrichment",
                        error: panic_msg,
                    },
                    "TaskPanicked",
                )
                .await;
            }
        }
    });
    true
}
