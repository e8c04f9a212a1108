//! End-to-end tests for the `create` pipeline

use card_binder::binder::{create_binder, CreateRequest};
use card_binder::cache::{CacheStore, CardMetadata, FetchStatus, MetadataCache};
use card_binder::config::{FailurePolicy, FetchSettings, OutputMode, Settings};
use card_binder::error::{BinderError, ResolveError};
use card_binder::fetcher::{CardFetcher, FetchOutcome, FetchedCard};
use card_binder::registry;
use card_binder::render::BinderManifest;
use card_binder::{CardKey, ScryfallClient};
use mtg_common::FetchError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── helpers ──────────────────────────────────────────────────────────

/// Scripted fetcher; unknown names are not found
#[derive(Default)]
struct StubFetcher {
    calls: AtomicUsize,
    responses: HashMap<String, Result<FetchOutcome, FetchError>>,
    delays: HashMap<String, Duration>,
}

impl StubFetcher {
    fn with(mut self, name: &str, response: Result<FetchOutcome, FetchError>) -> Self {
        self.responses.insert(name.to_lowercase(), response);
        self
    }

    fn delayed(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_lowercase(), delay);
        self
    }
}

impl CardFetcher for StubFetcher {
    async fn fetch(&self, key: &CardKey) -> Result<FetchOutcome, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(key.name()) {
            tokio::time::sleep(*delay).await;
        }
        self.responses
            .get(key.name())
            .cloned()
            .unwrap_or(Ok(FetchOutcome::NotFound))
    }
}

fn found(name: &str) -> Result<FetchOutcome, FetchError> {
    Ok(FetchOutcome::Found(FetchedCard {
        metadata: CardMetadata {
            scryfall_id: format!("{}-id", name.to_lowercase().replace(' ', "-")),
            display_name: name.to_string(),
            set_code: "lea".to_string(),
            collector_number: "1".to_string(),
            ..CardMetadata::default()
        },
        image: Some(format!("image of {}", name).into_bytes()),
    }))
}

fn cache_for<F: CardFetcher>(home: &Path, fetcher: F) -> Arc<MetadataCache<F>> {
    let store = CacheStore::open(home).unwrap();
    Arc::new(MetadataCache::new(
        Arc::new(Mutex::new(store)),
        fetcher,
        Default::default(),
    ))
}

fn fetch_calls(cache: &MetadataCache<StubFetcher>) -> usize {
    cache.fetcher().calls.load(Ordering::SeqCst)
}

fn write_inventory(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("inventory.txt");
    std::fs::write(&path, content).unwrap();
    path
}

fn request(inventory: PathBuf, output_dir: PathBuf) -> CreateRequest {
    CreateRequest {
        inventory,
        output_dir,
        name: Some("Test Binder".to_string()),
        id: None,
    }
}

/// Markup of each filled or empty slot on a page, in order
fn slots(html: &str) -> Vec<&str> {
    html.split("<div class=\"slot").skip(1).collect()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

async fn scryfall_mock() -> MockServer {
    let mock_server = MockServer::start().await;
    let image_url = format!("{}/images/bolt.jpg", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/cards/named"))
        .and(query_param("exact", "lightning bolt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "e3285e6b-3e79-4d7c-bf96-d920f973b122",
            "name": "Lightning Bolt",
            "set": "lea",
            "set_name": "Limited Edition Alpha",
            "collector_number": "161",
            "rarity": "common",
            "image_uris": { "normal": image_url }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cards/named"))
        .and(query_param("exact", "black lotus"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "object": "error",
            "status": 404,
            "code": "not_found",
            "details": "No cards found matching \u{201c}black lotus\u{201d}"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/bolt.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_server
}

fn scryfall_settings(server: &MockServer) -> Settings {
    Settings {
        fetch: FetchSettings {
            api_url: server.uri(),
            min_interval: Duration::ZERO,
            ..FetchSettings::default()
        },
        ..Settings::default()
    }
}

const BOLT_AND_LOTUS: &str = "4,Lightning Bolt,,NM,false\n1,Black Lotus,,LP,true\n";

// ── end to end against a mocked Scryfall ─────────────────────────────

#[tokio::test]
async fn renders_found_card_and_not_found_placeholder() {
    let temp_dir = TempDir::new().unwrap();
    let mock_server = scryfall_mock().await;
    let settings = scryfall_settings(&mock_server);
    let home = temp_dir.path().join("home");
    let out = temp_dir.path().join("out");

    let cache = cache_for(&home, ScryfallClient::new(&settings.fetch).unwrap());
    let inventory = write_inventory(&temp_dir, BOLT_AND_LOTUS);
    let summary = create_binder(cache.clone(), &request(inventory, out.clone()), &settings)
        .await
        .unwrap();

    assert_eq!(summary.id, "test_binder");
    assert_eq!(summary.cards, 2);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.unavailable, 0);
    assert_eq!(summary.pages, 1);

    let page = read(&out.join("binder001.html"));
    let slots = slots(&page);
    assert_eq!(slots.len(), 9);

    let bolt = slots[0];
    assert!(bolt.contains("Lightning Bolt"));
    assert!(bolt.contains(
        "<img src=\"assets/images/e3285e6b-3e79-4d7c-bf96-d920f973b122.jpg\""
    ));
    assert!(bolt.contains("<dd class=\"foil\">no</dd>"));
    assert!(bolt.contains("<dd class=\"owned\">4</dd>"));
    assert!(bolt.contains("<dd class=\"condition\">Near Mint</dd>"));

    let lotus = slots[1];
    assert!(lotus.starts_with(" placeholder\">"));
    assert!(lotus.contains("Black Lotus"));
    assert!(!lotus.contains("<img"));
    assert!(lotus.contains("<dd class=\"foil\">yes</dd>"));
    assert!(lotus.contains("<dd class=\"condition\">Lightly Played</dd>"));

    assert!(slots[2..].iter().all(|s| s.starts_with(" empty\">")));

    assert_eq!(
        std::fs::read(out.join("assets/images/e3285e6b-3e79-4d7c-bf96-d920f973b122.jpg")).unwrap(),
        vec![0xFF, 0xD8, 0xFF, 0xE0]
    );
    assert!(out.join("index.html").is_file());
    assert!(out.join("assets/styles.css").is_file());

    let manifest = BinderManifest::from_file(&out.join("binder.json")).unwrap();
    assert_eq!(manifest.name, "Test Binder");
    assert_eq!(manifest.cards[1].status, FetchStatus::NotFound);

    let store = cache.store().lock().unwrap();
    let registered = registry::get_binder(store.connection(), "test_binder")
        .unwrap()
        .unwrap();
    assert_eq!(registered.card_count, 2);
    let lotus_record = store.get(&CardKey::new("Black Lotus", None)).unwrap().unwrap();
    assert_eq!(lotus_record.status, FetchStatus::NotFound);
}

#[tokio::test]
async fn warm_cache_runs_are_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    // Each Scryfall route expects exactly one request across both runs
    let mock_server = scryfall_mock().await;
    let settings = scryfall_settings(&mock_server);
    let home = temp_dir.path().join("home");
    let inventory = write_inventory(&temp_dir, BOLT_AND_LOTUS);

    let out1 = temp_dir.path().join("out1");
    let out2 = temp_dir.path().join("out2");
    let out3 = temp_dir.path().join("out3");
    for out in [&out1, &out2, &out3] {
        // Fresh cache handle per run, sharing the on-disk store
        let cache = cache_for(&home, ScryfallClient::new(&settings.fetch).unwrap());
        create_binder(cache, &request(inventory.clone(), out.clone()), &settings)
            .await
            .unwrap();
    }

    for file in ["binder001.html", "index.html", "binder.json"] {
        assert_eq!(read(&out2.join(file)), read(&out3.join(file)), "{file} differs");
        assert_eq!(read(&out1.join(file)), read(&out2.join(file)), "{file} differs");
    }
}

// ── failure handling ─────────────────────────────────────────────────

#[tokio::test]
async fn malformed_line_aborts_without_output() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_for(&temp_dir.path().join("home"), StubFetcher::default());
    let out = temp_dir.path().join("out");
    let inventory = write_inventory(&temp_dir, "4,Lightning Bolt,,NM,false\nabc,Foo,,NM,false\n");

    let result = create_binder(cache.clone(), &request(inventory, out.clone()), &Settings::default()).await;

    match result {
        Err(BinderError::Malformed(e)) => {
            assert_eq!(e.line_number, 2);
            assert_eq!(e.line, "abc,Foo,,NM,false");
        }
        other => panic!("Expected malformed line error, got: {other:?}"),
    }
    assert!(!out.exists());
    assert_eq!(fetch_calls(&cache), 0);
}

#[tokio::test]
async fn empty_inventory_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_for(&temp_dir.path().join("home"), StubFetcher::default());
    let inventory = write_inventory(&temp_dir, "# nothing here\n\n");

    let result = create_binder(
        cache,
        &request(inventory, temp_dir.path().join("out")),
        &Settings::default(),
    )
    .await;
    assert!(matches!(result, Err(BinderError::EmptyInventory)));
}

#[tokio::test]
async fn non_empty_output_dir_is_refused_before_fetching() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_for(&temp_dir.path().join("home"), StubFetcher::default());
    let out = temp_dir.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("keep.txt"), "mine").unwrap();
    let inventory = write_inventory(&temp_dir, BOLT_AND_LOTUS);

    let result = create_binder(cache.clone(), &request(inventory.clone(), out.clone()), &Settings::default()).await;
    assert!(matches!(
        result,
        Err(BinderError::OutputWrite(card_binder::error::OutputWriteError::NotEmpty(_)))
    ));
    assert_eq!(fetch_calls(&cache), 0);

    let overwrite = Settings {
        output_mode: OutputMode::Overwrite,
        ..Settings::default()
    };
    create_binder(cache, &request(inventory, out.clone()), &overwrite)
        .await
        .unwrap();
    assert!(out.join("keep.txt").is_file());
    assert!(out.join("binder001.html").is_file());
}

#[tokio::test]
async fn transient_failure_aborts_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::default()
        .with("Lightning Bolt", found("Lightning Bolt"))
        .with("Black Lotus", Err(FetchError::Timeout));
    let cache = cache_for(&temp_dir.path().join("home"), fetcher);
    let out = temp_dir.path().join("out");
    let inventory = write_inventory(&temp_dir, BOLT_AND_LOTUS);

    let result = create_binder(cache.clone(), &request(inventory, out.clone()), &Settings::default()).await;

    match result {
        Err(BinderError::Resolve(ResolveError::Transient(e))) => {
            assert_eq!(e.key, CardKey::new("Black Lotus", None));
            assert_eq!(e.source, FetchError::Timeout);
        }
        other => panic!("Expected transient fetch error, got: {other:?}"),
    }
    assert!(!out.exists());

    // The card that did resolve is cached; the failed one is not
    let store = cache.store().lock().unwrap();
    assert!(store.get(&CardKey::new("Lightning Bolt", None)).unwrap().is_some());
    assert!(store.get(&CardKey::new("Black Lotus", None)).unwrap().is_none());
}

#[tokio::test]
async fn rate_limit_stops_remaining_lookups() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::default().with("Card 0", Err(FetchError::RateLimited));
    let cache = cache_for(&temp_dir.path().join("home"), fetcher);
    let out = temp_dir.path().join("out");
    let content: String = (0..50).map(|i| format!("1,Card {}\n", i)).collect();
    let inventory = write_inventory(&temp_dir, &content);
    let mut settings = Settings::default();
    settings.fetch.max_concurrency = 1;

    let result = create_binder(cache.clone(), &request(inventory, out.clone()), &settings).await;

    match result {
        Err(BinderError::Resolve(ResolveError::Transient(e))) => {
            assert_eq!(e.key, CardKey::new("Card 0", None));
            assert_eq!(e.source, FetchError::RateLimited);
        }
        other => panic!("Expected rate limit error, got: {other:?}"),
    }
    assert_eq!(fetch_calls(&cache), 1);
    assert!(!out.exists());
}

#[tokio::test]
async fn best_effort_renders_placeholders() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::default()
        .with("Lightning Bolt", found("Lightning Bolt"))
        .with("Black Lotus", Err(FetchError::RateLimited));
    let cache = cache_for(&temp_dir.path().join("home"), fetcher);
    let out = temp_dir.path().join("out");
    let inventory = write_inventory(&temp_dir, BOLT_AND_LOTUS);
    let settings = Settings {
        failure_policy: FailurePolicy::BestEffort,
        ..Settings::default()
    };

    let summary = create_binder(cache.clone(), &request(inventory, out.clone()), &settings)
        .await
        .unwrap();
    assert_eq!(summary.unavailable, 1);
    assert_eq!(summary.not_found, 0);

    let page = read(&out.join("binder001.html"));
    let slots = slots(&page);
    assert!(slots[0].contains("<img"));
    assert!(slots[1].starts_with(" placeholder\">"));
    assert!(slots[1].contains("Black Lotus"));

    let manifest = BinderManifest::from_file(&out.join("binder.json")).unwrap();
    assert_eq!(manifest.cards[1].status, FetchStatus::Error);

    // Placeholders are never persisted
    let store = cache.store().lock().unwrap();
    assert!(store.get(&CardKey::new("Black Lotus", None)).unwrap().is_none());
}

// ── ordering and dedup ───────────────────────────────────────────────

#[tokio::test]
async fn pages_follow_inventory_order_not_fetch_order() {
    let temp_dir = TempDir::new().unwrap();
    // Earlier cards take longer, so fetches complete in reverse order
    let fetcher = StubFetcher::default()
        .with("Alpha", found("Alpha"))
        .with("Bravo", found("Bravo"))
        .with("Charlie", found("Charlie"))
        .with("Delta", found("Delta"))
        .delayed("Alpha", Duration::from_millis(80))
        .delayed("Bravo", Duration::from_millis(50))
        .delayed("Charlie", Duration::from_millis(20));
    let cache = cache_for(&temp_dir.path().join("home"), fetcher);
    let out = temp_dir.path().join("out");
    let inventory = write_inventory(
        &temp_dir,
        "1,Alpha\n1,Bravo\n1,Charlie\n1,Delta\n2,alpha\n",
    );

    let summary = create_binder(cache.clone(), &request(inventory, out.clone()), &Settings::default())
        .await
        .unwrap();
    assert_eq!(summary.cards, 5);
    assert_eq!(summary.distinct_cards, 4);
    assert_eq!(fetch_calls(&cache), 4);

    let manifest = BinderManifest::from_file(&out.join("binder.json")).unwrap();
    let names: Vec<_> = manifest.cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "Bravo", "Charlie", "Delta", "alpha"]);

    let page = read(&out.join("binder001.html"));
    let positions: Vec<_> = ["Alpha", "Bravo", "Charlie", "Delta"]
        .iter()
        .map(|name| page.find(&format!("<dd class=\"name\">{}</dd>", name)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn many_cards_span_multiple_pages() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_for(&temp_dir.path().join("home"), StubFetcher::default());
    let out = temp_dir.path().join("out");
    let content: String = (1..=20).map(|i| format!("1,Card {}\n", i)).collect();
    let inventory = write_inventory(&temp_dir, &content);

    let summary = create_binder(cache, &request(inventory, out.clone()), &Settings::default())
        .await
        .unwrap();
    assert_eq!(summary.pages, 3);
    assert!(out.join("binder003.html").is_file());
    assert!(!out.join("binder004.html").exists());
    assert_eq!(slots(&read(&out.join("binder003.html"))).len(), 9);
}
