//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full Seeding and Draining cycle end-to-end against SQLite files.

use news_harvest::config::Config;
use news_harvest::crawler::{crawl, Crawler};
use news_harvest::state::{FailurePolicy, UrlState};
use news_harvest::storage::{open_stores, ArticleStore, FrontierStore};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration crawling the mock server from its root
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.seed_url = format!("{}/", base_url);
    config.crawler.base_url = base_url.to_string();
    config.crawler.batch_size = 10;
    config.crawler.worker_count = 4;
    config.crawler.poll_interval_ms = 0;
    config.crawler.request_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.urls_database_path = dir.path().join("urls.db").display().to_string();
    config.output.articles_database_path = dir.path().join("articles.db").display().to_string();
    config
}

/// Renders an article page with the given outbound links
fn story_page(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        r#"<html><body>
        <div class="fullstory">
            <h1>{title}</h1>
            <div class="pub-t">01 March 2024</div>
            <p>Body of {title}.</p>
        </div>
        <nav>{anchors}</nav>
        </body></html>"#,
        title = title,
        anchors = anchors
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_seeding_records_same_site_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let page_a = format!("{}/a", base_url);
    let page_b = format!("{}/b", base_url);
    mount_page(
        &mock_server,
        "/",
        story_page(
            "Front page",
            &[
                page_a.clone(),
                page_b.clone(),
                "https://elsewhere.example.org/c".to_string(),
            ],
        ),
    )
    .await;

    let crawler = Crawler::open(&config).unwrap();
    assert!(crawler
        .frontier()
        .lock()
        .unwrap()
        .seed(&config.crawler.seed_url)
        .unwrap());

    let links_inserted = crawler.crawl_seed().await;
    assert_eq!(links_inserted, Some(2));

    let frontier = crawler.frontier().lock().unwrap();
    assert_eq!(frontier.count_urls().unwrap(), 3);
    assert_eq!(
        frontier.next_batch(10).unwrap(),
        vec![page_a.clone(), page_b.clone()]
    );
    assert_eq!(
        frontier
            .get_url(&config.crawler.seed_url)
            .unwrap()
            .unwrap()
            .state(),
        Some(UrlState::Scraped)
    );
    assert!(frontier
        .get_url("https://elsewhere.example.org/c")
        .unwrap()
        .is_none());

    let articles = crawler.articles().lock().unwrap();
    assert_eq!(articles.count_articles().unwrap(), 1);
    let article = articles
        .get_article(&config.crawler.seed_url)
        .unwrap()
        .unwrap();
    assert_eq!(article.title, "Front page");
    assert_eq!(article.date_published, "01 March 2024");
    assert_eq!(article.content, "Body of Front page.");
}

#[tokio::test]
async fn test_full_crawl_until_exhausted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let seed = format!("{}/", base_url);
    let page_a = format!("{}/a", base_url);
    let page_b = format!("{}/b", base_url);
    let page_c = format!("{}/c", base_url);

    mount_page(
        &mock_server,
        "/",
        story_page("Home", &[page_a.clone(), page_b.clone()]),
    )
    .await;
    mount_page(
        &mock_server,
        "/a",
        story_page("A", &[seed.clone(), page_b.clone(), page_c.clone()]),
    )
    .await;
    mount_page(&mock_server, "/b", story_page("B", &[page_a.clone()])).await;
    mount_page(&mock_server, "/c", story_page("C", &[])).await;

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.seeded);
    assert!(report.exhausted);
    assert_eq!(report.scraped, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.links_inserted, 3);
    assert_eq!(report.batches, 2);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    assert_eq!(frontier.count_urls().unwrap(), 4);
    assert_eq!(frontier.count_by_state(UrlState::Scraped).unwrap(), 4);
    assert_eq!(frontier.count_by_state(UrlState::Unvisited).unwrap(), 0);
    assert_eq!(frontier.count_inconsistent().unwrap(), 0);
    assert_eq!(articles.count_articles().unwrap(), 4);
    assert_eq!(
        articles.get_article(&page_c).unwrap().unwrap().title,
        "C"
    );
}

#[tokio::test]
async fn test_worker_pool_smaller_than_batch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.worker_count = 2;
    config.crawler.batch_size = 50;

    let pages: Vec<String> = (0..12).map(|i| format!("{}/p/{}", base_url, i)).collect();
    mount_page(&mock_server, "/", story_page("Index", &pages)).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p/\d+$"))
        .respond_with(html(story_page("Leaf", &[])))
        .mount(&mock_server)
        .await;

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.exhausted);
    assert_eq!(report.batches, 1);
    assert_eq!(report.scraped, 13);

    let (_, articles) = open_stores(&config.output).unwrap();
    assert_eq!(articles.count_articles().unwrap(), 13);
}

#[tokio::test]
async fn test_timeout_is_abandoned_by_default() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.request_timeout_secs = 1;

    let slow = format!("{}/slow", base_url);
    let fine = format!("{}/fine", base_url);
    mount_page(
        &mock_server,
        "/",
        story_page("Home", &[slow.clone(), fine.clone()]),
    )
    .await;
    mount_page(&mock_server, "/fine", story_page("Fine", &[])).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(story_page("Slow", &[])).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.exhausted);
    assert_eq!(report.scraped, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.requeued, 0);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    let record = frontier.get_url(&slow).unwrap().unwrap();
    assert_eq!(record.state(), Some(UrlState::Visited));
    assert_eq!(record.attempts, 1);
    assert!(articles.get_article(&slow).unwrap().is_none());
    assert!(articles.get_article(&fine).unwrap().is_some());
}

#[tokio::test]
async fn test_timeout_is_retried_under_retry_policy() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.request_timeout_secs = 1;
    config.crawler.failure_policy = FailurePolicy::Retry { max_attempts: 2 };

    let slow = format!("{}/slow", base_url);
    mount_page(&mock_server, "/", story_page("Home", &[slow.clone()])).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(story_page("Slow", &[])).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.exhausted);
    assert_eq!(report.batches, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.requeued, 1);

    let (frontier, _) = open_stores(&config.output).unwrap();
    let record = frontier.get_url(&slow).unwrap().unwrap();
    assert_eq!(record.state(), Some(UrlState::Visited));
    assert_eq!(record.attempts, 2);
}

#[tokio::test]
async fn test_non_html_response_is_a_parse_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let pdf = format!("{}/report.pdf", base_url);
    mount_page(&mock_server, "/", story_page("Home", &[pdf.clone()])).await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.7".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let report = crawl(config.clone()).await.unwrap();

    assert_eq!(report.failed, 1);
    let (frontier, articles) = open_stores(&config.output).unwrap();
    assert_eq!(
        frontier.get_url(&pdf).unwrap().unwrap().state(),
        Some(UrlState::Visited)
    );
    assert!(articles.get_article(&pdf).unwrap().is_none());
}

#[tokio::test]
async fn test_error_status_page_is_still_stored() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let gone = format!("{}/gone", base_url);
    mount_page(&mock_server, "/", story_page("Home", &[gone.clone()])).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(story_page("Not found", &[]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let report = crawl(config.clone()).await.unwrap();

    assert_eq!(report.failed, 0);
    let (_, articles) = open_stores(&config.output).unwrap();
    assert_eq!(
        articles.get_article(&gone).unwrap().unwrap().title,
        "Not found"
    );
}

#[tokio::test]
async fn test_unreachable_seed_is_retried_by_draining() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    // The first request for the seed fails, later ones succeed
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 4])
                .insert_header("content-type", "image/png"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", story_page("Home", &[])).await;

    let report = crawl(config.clone()).await.unwrap();

    assert!(!report.seeded);
    assert!(report.exhausted);
    assert_eq!(report.batches, 1);
    assert_eq!(report.scraped, 1);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    assert_eq!(
        frontier
            .get_url(&config.crawler.seed_url)
            .unwrap()
            .unwrap()
            .state(),
        Some(UrlState::Scraped)
    );
    assert_eq!(articles.count_articles().unwrap(), 1);
}

#[tokio::test]
async fn test_restart_resumes_persisted_frontier() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let left_over = format!("{}/left-over", base_url);
    mount_page(&mock_server, "/", story_page("Home", &[])).await;
    mount_page(&mock_server, "/left-over", story_page("Left over", &[])).await;

    // A previous run discovered a URL but stopped before claiming it
    {
        let (mut frontier, _) = open_stores(&config.output).unwrap();
        frontier.seed(&config.crawler.seed_url).unwrap();
        frontier.insert_if_absent(&[left_over.clone()]).unwrap();
    }

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.exhausted);
    assert_eq!(report.scraped, 2);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    assert_eq!(frontier.count_urls().unwrap(), 2);
    assert!(articles.get_article(&left_over).unwrap().is_some());

    // Running again finds nothing left to claim
    let again = crawl(config.clone()).await.unwrap();
    assert!(again.exhausted);
    assert_eq!(again.batches, 0);
    assert_eq!(articles.count_articles().unwrap(), 2);
}

#[tokio::test]
async fn test_retry_policy_reclaims_urls_an_interrupted_run_left_claimed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.failure_policy = FailurePolicy::Retry { max_attempts: 3 };

    let claimed = format!("{}/claimed", base_url);
    mount_page(&mock_server, "/", story_page("Home", &[])).await;
    mount_page(&mock_server, "/claimed", story_page("Claimed", &[])).await;

    // A previous run claimed the URL and stopped before its worker finished
    {
        let (mut frontier, _) = open_stores(&config.output).unwrap();
        frontier.seed(&config.crawler.seed_url).unwrap();
        frontier.insert_if_absent(&[claimed.clone()]).unwrap();
        frontier.mark_visited(&[claimed.clone()]).unwrap();
    }

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.exhausted);
    assert_eq!(report.batches, 1);
    assert_eq!(report.failed, 0);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    let record = frontier.get_url(&claimed).unwrap().unwrap();
    assert_eq!(record.state(), Some(UrlState::Scraped));
    assert_eq!(record.attempts, 0);
    assert!(articles.get_article(&claimed).unwrap().is_some());
}

#[tokio::test]
async fn test_abandon_policy_leaves_interrupted_urls_claimed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let claimed = format!("{}/claimed", base_url);
    mount_page(&mock_server, "/", story_page("Home", &[])).await;
    mount_page(&mock_server, "/claimed", story_page("Claimed", &[])).await;

    {
        let (mut frontier, _) = open_stores(&config.output).unwrap();
        frontier.seed(&config.crawler.seed_url).unwrap();
        frontier.insert_if_absent(&[claimed.clone()]).unwrap();
        frontier.mark_visited(&[claimed.clone()]).unwrap();
    }

    let report = crawl(config.clone()).await.unwrap();

    assert!(report.exhausted);
    assert_eq!(report.batches, 0);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    assert_eq!(
        frontier.get_url(&claimed).unwrap().unwrap().state(),
        Some(UrlState::Visited)
    );
    assert!(articles.get_article(&claimed).unwrap().is_none());
}

/// Serves an endless chain: every /n/{k} links to /n/{k+1}
struct ChainResponder {
    base_url: String,
}

impl Respond for ChainResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let k: u64 = request
            .url
            .path()
            .rsplit('/')
            .next()
            .and_then(|k| k.parse().ok())
            .unwrap_or(0);
        let next = format!("{}/n/{}", self.base_url, k + 1);
        html(story_page(&format!("Page {}", k), &[next]))
    }
}

#[tokio::test]
async fn test_batch_limit_bounds_endless_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.seed_url = format!("{}/n/0", base_url);
    config.crawler.max_batches = Some(3);

    Mock::given(method("GET"))
        .and(path_regex(r"^/n/\d+$"))
        .respond_with(ChainResponder {
            base_url: base_url.clone(),
        })
        .mount(&mock_server)
        .await;

    let report = crawl(config.clone()).await.unwrap();

    assert!(!report.exhausted);
    assert_eq!(report.batches, 3);
    assert_eq!(report.scraped, 4);

    let (frontier, articles) = open_stores(&config.output).unwrap();
    assert_eq!(frontier.count_by_state(UrlState::Unvisited).unwrap(), 1);
    assert_eq!(
        frontier.next_batch(1).unwrap(),
        vec![format!("{}/n/4", base_url)]
    );
    assert_eq!(articles.count_articles().unwrap(), 4);
}
