//! Integration tests for the character feed: paging, end of data,
//! episode enrichment and detail toggles.
//!
//! Each test starts its own mock server so request counts are isolated.

use portal::api::{ApiClient, RetryPolicy, UNKNOWN_EPISODE};
use portal::feed::{ControllerSettings, EnrichPolicy, FeedController, FetchOutcome, FetchSkipped};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn controller(server: &MockServer, settings: ControllerSettings) -> FeedController {
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        &format!("{}/api", server.uri()),
        RetryPolicy::none(),
    )
    .unwrap();
    FeedController::new(client, settings)
}

fn character(server: &MockServer, id: i64, episode: u32) -> Value {
    json!({
        "id": id,
        "name": format!("Citadel Rick {}", id),
        "status": if id % 3 == 0 { "Dead" } else { "Alive" },
        "gender": "Male",
        "image": format!("https://rickandmortyapi.com/api/character/avatar/{}.jpeg", id),
        "episode": [
            format!("{}/api/episode/1", server.uri()),
            format!("{}/api/episode/{}", server.uri(), episode),
        ],
    })
}

/// Mount `GET /api/character?page=n`, expected exactly `expect` times.
async fn mount_page(server: &MockServer, page: u32, results: Vec<Value>, next: bool, expect: u64) {
    let next = next.then(|| format!("{}/api/character?page={}", server.uri(), page + 1));
    Mock::given(method("GET"))
        .and(path("/api/character"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "info": {"count": 40, "pages": 2, "next": next, "prev": null},
            "results": results,
        })))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_episode(server: &MockServer, id: u32, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/episode/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": name,
            "episode": format!("S01E{:02}", id),
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn two_pages_then_end_of_data() {
    let server = MockServer::start().await;
    mount_page(&server, 1, (1..=20).map(|id| character(&server, id, 2)).collect(), true, 1).await;
    mount_page(&server, 2, (21..=40).map(|id| character(&server, id, 2)).collect(), false, 1).await;
    mount_episode(&server, 2, "Lawnmower Dog").await;

    let mut feed = controller(&server, ControllerSettings::default());

    let outcome = feed.fetch_next_page().await;
    assert!(outcome.changed());
    assert_eq!(feed.state().cursor(), 2);
    assert!(!feed.state().is_end_of_data());
    assert_eq!(feed.state().len(), 20);

    feed.fetch_next_page().await;
    assert_eq!(feed.state().cursor(), 3);
    assert!(feed.state().is_end_of_data());
    assert_eq!(feed.state().len(), 40);

    // No request is made for page 3
    let third = feed.fetch_next_page().await;
    assert!(matches!(third, FetchOutcome::Skipped(FetchSkipped::EndOfData)));
    assert_eq!(feed.state().len(), 40);
    assert_eq!(feed.state().cursor(), 3);

    assert_eq!(feed.state().enriched_count(), 40);
    assert!(feed
        .state()
        .characters()
        .iter()
        .all(|c| c.last_episode == "Lawnmower Dog"));
}

#[tokio::test]
async fn failed_episode_falls_back_while_siblings_resolve() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        vec![
            character(&server, 1, 2),
            character(&server, 2, 99),
            character(&server, 3, 2),
        ],
        false,
        1,
    )
    .await;
    mount_episode(&server, 2, "Lawnmower Dog").await;
    Mock::given(method("GET"))
        .and(path("/api/episode/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Episode not found"})))
        .mount(&server)
        .await;

    let mut feed = controller(&server, ControllerSettings::default());
    feed.fetch_next_page().await;

    let names: Vec<String> = feed
        .state()
        .characters()
        .iter()
        .map(|c| c.last_episode.clone())
        .collect();
    assert_eq!(names, vec!["Lawnmower Dog", UNKNOWN_EPISODE, "Lawnmower Dog"]);
}

#[tokio::test]
async fn unreachable_episode_is_unknown() {
    let server = MockServer::start().await;
    let feed = controller(&server, ControllerSettings::default());
    let name = feed
        .resolve_last_episode_name("http://127.0.0.1:9/api/episode/1")
        .await;
    assert_eq!(name, UNKNOWN_EPISODE);
}

#[tokio::test]
async fn failed_page_is_retried_on_next_trigger() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/character"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, vec![character(&server, 1, 2)], true, 1).await;
    mount_episode(&server, 2, "Lawnmower Dog").await;

    let mut feed = controller(&server, ControllerSettings::default());

    let first = feed.fetch_next_page().await;
    assert!(matches!(first, FetchOutcome::Failed(_)));
    assert_eq!(feed.state().cursor(), 1);
    assert!(!feed.state().is_end_of_data());
    assert!(feed.state().is_empty());
    assert!(!feed.is_fetching());

    let second = feed.fetch_next_page().await;
    assert!(matches!(
        second,
        FetchOutcome::Appended {
            page: 1,
            count: 1,
            end_of_data: false
        }
    ));
    assert_eq!(feed.state().cursor(), 2);
}

#[tokio::test]
async fn simultaneous_triggers_issue_one_request() {
    let server = MockServer::start().await;
    mount_page(&server, 1, vec![character(&server, 1, 2)], false, 1).await;
    mount_episode(&server, 2, "Lawnmower Dog").await;

    let mut feed = controller(&server, ControllerSettings::default());

    // Explicit load and scroll proximity in the same tick
    let explicit = feed.begin_fetch();
    let proximity = feed.begin_fetch();
    assert!(explicit.is_ok());
    assert_eq!(proximity.unwrap_err(), FetchSkipped::InFlight);

    let response = explicit.unwrap().run().await;
    let outcome = feed.apply_page(response);
    assert!(outcome.changed());
    assert_eq!(feed.state().len(), 1);
    assert!(feed.needs_enrichment());
}

#[tokio::test]
async fn cache_spares_repeat_episode_lookups() {
    let server = MockServer::start().await;
    mount_page(&server, 1, (1..=4).map(|id| character(&server, id, 2)).collect(), true, 1).await;
    mount_page(&server, 2, (5..=8).map(|id| character(&server, id, 2)).collect(), false, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/episode/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Lawnmower Dog"})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ControllerSettings {
        policy: EnrichPolicy::All,
        concurrency: 1,
        episode_cache_size: 16,
    };
    let mut feed = controller(&server, settings);
    feed.fetch_next_page().await;
    feed.fetch_next_page().await;

    assert_eq!(feed.state().enriched_count(), 8);
    assert_eq!(feed.resolver().cached_len(), 1);
}

#[tokio::test]
async fn toggle_details_twice_restores_visibility() {
    let server = MockServer::start().await;
    mount_page(&server, 1, vec![character(&server, 7, 2)], false, 1).await;
    mount_episode(&server, 2, "Lawnmower Dog").await;

    let mut feed = controller(&server, ControllerSettings::default());
    feed.fetch_next_page().await;

    assert!(!feed.state().is_expanded(7));
    assert!(feed.toggle_details(7));
    assert!(!feed.toggle_details(7));
    assert!(!feed.state().is_expanded(7));
    assert_eq!(feed.state().toggled_count(), 1);
}

#[tokio::test]
async fn accumulated_length_is_sum_of_page_sizes() {
    let server = MockServer::start().await;
    let sizes = [20usize, 7, 0, 13];
    let mut next_id = 1i64;
    for (k, size) in sizes.iter().enumerate() {
        let results = (next_id..next_id + *size as i64)
            .map(|id| character(&server, id, 2))
            .collect();
        next_id += *size as i64;
        mount_page(&server, k as u32 + 1, results, k + 1 < sizes.len(), 1).await;
    }
    mount_episode(&server, 2, "Lawnmower Dog").await;

    let mut feed = controller(
        &server,
        ControllerSettings {
            policy: EnrichPolicy::Appended,
            ..ControllerSettings::default()
        },
    );

    let mut total = 0;
    for size in sizes {
        feed.fetch_next_page().await;
        total += size;
        assert_eq!(feed.state().len(), total);
    }
    assert!(feed.state().is_end_of_data());
    assert_eq!(feed.state().enriched_count(), total);
}
