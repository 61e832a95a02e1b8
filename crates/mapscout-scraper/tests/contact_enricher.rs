//! Integration tests for `ContactEnricher` against a local `wiremock` server.

use std::time::Duration;

use mapscout_core::BusinessRecord;
use mapscout_scraper::{ContactEnricher, IdentityPool};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn enricher(timeout: Duration) -> ContactEnricher {
    ContactEnricher::new(timeout, 3, 2, IdentityPool::default())
        .expect("failed to build test ContactEnricher")
}

fn record(name: &str, website: Option<String>) -> BusinessRecord {
    BusinessRecord {
        name: name.to_owned(),
        category: None,
        address: None,
        phone: None,
        website,
        rating: None,
        review_count: None,
        email: None,
        source_query: "cafes in paris".to_owned(),
    }
}

#[tokio::test]
async fn contact_page_emails_are_joined() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lune"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="mailto:bonjour@cafelune.example">Email</a>
                <footer>Press: presse@cafelune.example</footer>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let records = vec![record("Café Lune", Some(format!("{}/lune", server.uri())))];
    let out = enricher(Duration::from_secs(2))
        .enrich(records, &CancellationToken::new())
        .await;

    assert_eq!(
        out[0].email.as_deref(),
        Some("bonjour@cafelune.example; presse@cafelune.example")
    );
}

#[tokio::test]
async fn sentinel_and_missing_websites_are_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let records = vec![
        record("A", Some("No Website".to_owned())),
        record("B", None),
        record("C", Some("   ".to_owned())),
    ];
    let out = enricher(Duration::from_secs(2))
        .enrich(records, &CancellationToken::new())
        .await;

    assert!(out.iter().all(|r| r.email.is_none()));
}

#[tokio::test]
async fn slow_website_leaves_email_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<a href=\"mailto:late@slow.example\">x</a>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let records = vec![record("Slow", Some(format!("{}/slow", server.uri())))];
    let out = enricher(Duration::from_millis(200))
        .enrich(records, &CancellationToken::new())
        .await;

    assert!(out[0].email.is_none());
}

#[tokio::test]
async fn error_status_leaves_email_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("contact: ghost@gone.example"),
        )
        .mount(&server)
        .await;

    let records = vec![record("Gone", Some(format!("{}/gone", server.uri())))];
    let out = enricher(Duration::from_secs(2))
        .enrich(records, &CancellationToken::new())
        .await;

    assert!(out[0].email.is_none());
}

#[tokio::test]
async fn record_order_is_preserved() {
    let server = MockServer::start().await;
    for (route, email, delay_ms) in [("/a", "a@a.example", 300), ("/b", "b@b.example", 0)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<p>{email}</p>"))
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .mount(&server)
            .await;
    }

    let records = vec![
        record("A", Some(format!("{}/a", server.uri()))),
        record("Nothing", None),
        record("B", Some(format!("{}/b", server.uri()))),
    ];
    let out = enricher(Duration::from_secs(2))
        .enrich(records, &CancellationToken::new())
        .await;

    let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "Nothing", "B"]);
    assert_eq!(out[0].email.as_deref(), Some("a@a.example"));
    assert!(out[1].email.is_none());
    assert_eq!(out[2].email.as_deref(), Some("b@b.example"));
}

#[tokio::test]
async fn cancelled_enrichment_passes_records_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>x@y.example</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let records = vec![record("A", Some(format!("{}/a", server.uri())))];
    let out = enricher(Duration::from_secs(2)).enrich(records, &token).await;

    assert_eq!(out.len(), 1);
    assert!(out[0].email.is_none());
}
