//! Application event handling.
//!
//! Processes background task completion events: page loads, enrichment
//! passes and task panics.

use crate::app::{App, AppEvent};
use tokio::sync::mpsc;

use super::helpers::spawn_enrichment;

/// Handle application events from background tasks.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::PageLoaded(response) => {
            if app.apply_page(response) {
                spawn_enrichment(app, None, event_tx);
            }
        }
        AppEvent::Enriched(result) => {
            let updated = app.apply_enrichment(result);
            tracing::debug!(updated, "Applied enrichment result");
        }
        AppEvent::TaskPanicked { task, error } => {
            if task == "enrichment" {
                app.enrichments_running = app.enrichments_running.saturating_sub(1);
            }
            app.set_status(format!("Internal error in {}: {}", task, error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, RetryPolicy};
    use crate::feed::{ControllerSettings, FeedController};
    use crate::keybindings::KeybindingRegistry;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(server: &MockServer) -> App {
        let client = ApiClient::with_client(
            reqwest::Client::new(),
            &format!("{}/api", server.uri()),
            RetryPolicy::none(),
        )
        .unwrap();
        App::new(
            FeedController::new(client, ControllerSettings::default()),
            KeybindingRegistry::new(),
        )
    }

    #[tokio::test]
    async fn test_page_loaded_spawns_enrichment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/character"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "info": {"next": null},
                "results": [{
                    "id": 1,
                    "name": "Rick Sanchez",
                    "episode": [format!("{}/api/episode/1", server.uri())],
                }],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/episode/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Pilot"})))
            .mount(&server)
            .await;

        let mut app = app_for(&server);
        let (tx, mut rx) = mpsc::channel(8);

        let response = app.begin_fetch(true).unwrap().run().await;
        handle_app_event(&mut app, AppEvent::PageLoaded(response), &tx);
        assert_eq!(app.len(), 1);
        assert_eq!(app.enrichments_running, 1);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Enriched(_)));
        handle_app_event(&mut app, event, &tx);
        assert_eq!(app.enrichments_running, 0);
        assert_eq!(app.controller.state().get(0).unwrap().last_episode, "Pilot");
    }

    #[tokio::test]
    async fn test_failed_page_sets_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut app = app_for(&server);
        let (tx, _rx) = mpsc::channel(8);

        let response = app.begin_fetch(true).unwrap().run().await;
        handle_app_event(&mut app, AppEvent::PageLoaded(response), &tx);
        assert!(app.is_empty());
        assert!(app.auto_fetch_paused);
        assert!(app.last_error.as_deref().unwrap().contains("press n"));
        assert!(!app.controller.is_fetching());
    }

    #[tokio::test]
    async fn test_enrichment_panic_clears_counter() {
        let server = MockServer::start().await;
        let mut app = app_for(&server);
        let (tx, _rx) = mpsc::channel(8);
        app.enrichments_running = 1;

        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "enrichment",
                error: "boom".to_string(),
            },
            &tx,
        );
        assert_eq!(app.enrichments_running, 0);
        assert!(app.status_message.is_some());
    }
}
