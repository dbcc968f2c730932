mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeTransport, params, query_of};
use futures::StreamExt;
use reqwest::header::USER_AGENT;
use serde_json::json;
use serpapi_client::{Client, Params, SerpError, TransportError};
use tokio_util::sync::CancellationToken;

fn client_with(fake: &Arc<FakeTransport>, key: &str) -> Client {
    Client::builder(key)
        .with_base_url("https://serpapi.test")
        .with_timeout(Duration::from_secs(5))
        .with_shared_transport(fake.clone())
        .build()
        .unwrap()
}

fn page(next: Option<&str>, title: &str) -> String {
    let mut body = json!({
        "search_metadata": {"status": "Success"},
        "organic_results": [{"title": title}],
    });
    if let Some(next) = next {
        body["serpapi_pagination"] = json!({ "next": next });
    }
    body.to_string()
}

#[tokio::test]
async fn search_sends_authenticated_json_request() {
    common::init_test_tracing();
    let fake = Arc::new(FakeTransport::new().reply(
        200,
        r#"{"search_metadata":{"status":"Success"},"organic_results":[{"title":"Result 1"}]}"#,
    ));
    let client = client_with(&fake, "test_key");

    let results = client
        .search(&params(&[("q", "test")]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results["search_metadata"]["status"], "Success");
    assert_eq!(results.organic_results().unwrap().len(), 1);

    let reqs = fake.requests();
    assert_eq!(reqs.len(), 1);
    let req = &reqs[0];
    assert_eq!(req.method, reqwest::Method::GET);
    assert_eq!(req.url.path(), "/search");
    assert_eq!(
        query_of(req),
        params(&[("q", "test"), ("api_key", "test_key"), ("output", "json")])
    );
    assert_eq!(req.headers[USER_AGENT], serpapi_client::USER_AGENT);
    assert_eq!(req.timeout, Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn caller_cannot_override_fixed_keys() {
    let fake = Arc::new(FakeTransport::new().reply(200, "{}"));
    let client = client_with(&fake, "configured");

    client
        .search(
            &params(&[("api_key", "sneaky"), ("output", "html"), ("q", "x")]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let q = query_of(&fake.requests()[0]);
    assert_eq!(q["api_key"], "configured");
    assert_eq!(q["output"], "json");
}

#[tokio::test]
async fn missing_query_error_message_is_exact() {
    let fake = Arc::new(FakeTransport::new().reply(400, r#"{"error": "Missing query"}"#));
    let client = client_with(&fake, "key");

    let err = client
        .search(&Params::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "serpapi error (400): Missing query");
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn opaque_error_page_is_http_error() {
    let fake = Arc::new(FakeTransport::new().reply(503, "<html>maintenance</html>"));
    let client = client_with(&fake, "key");

    let err = client
        .search(&Params::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        SerpError::Http { status: 503, body } if body == "<html>maintenance</html>"
    ));
    assert_eq!(err.to_string(), "http error 503: <html>maintenance</html>");
}

#[tokio::test]
async fn in_band_error_on_success_status_fails() {
    let fake = Arc::new(FakeTransport::new().reply(200, r#"{"error": "Invalid API key"}"#));
    let client = client_with(&fake, "bad");

    let err = client
        .get_json("/search", &Params::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SerpError::Api { .. }));
    assert_eq!(err.api_message(), Some("Invalid API key"));
}

#[tokio::test]
async fn location_returns_list_without_in_band_check() {
    let body = r#"[{"id":"585069bdee19ad271e9bc072","name":"Austin","canonical_name":"Austin,TX,Texas,United States"},{"error":"ignored"}]"#;
    let fake = Arc::new(FakeTransport::new().reply(200, body));
    let client = client_with(&fake, "key");

    let locations = client
        .location(&params(&[("q", "Austin"), ("limit", "3")]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0]["name"], "Austin");

    let req = &fake.requests()[0];
    assert_eq!(req.url.path(), "/locations.json");
    assert_eq!(query_of(req)["output"], "json");
}

#[tokio::test]
async fn location_with_object_body_is_decode_error() {
    let fake = Arc::new(FakeTransport::new().reply(200, r#"{"name":"Austin"}"#));
    let client = client_with(&fake, "key");

    let err = client
        .location(&Params::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SerpError::Decode(_)));
}

#[tokio::test]
async fn account_sends_only_fixed_params() {
    let fake = Arc::new(
        FakeTransport::new().reply(200, r#"{"account_email":"a@b.c","plan_searches_left":42}"#),
    );
    let client = client_with(&fake, "key");

    let account = client.account(&CancellationToken::new()).await.unwrap();
    assert_eq!(account["plan_searches_left"], 42);

    let req = &fake.requests()[0];
    assert_eq!(req.url.path(), "/account");
    assert_eq!(
        query_of(req),
        params(&[("api_key", "key"), ("output", "json")])
    );
}

#[tokio::test]
async fn get_html_returns_body_verbatim() {
    let html = "<!doctype html>\n<html><body>results</body></html>\n";
    let fake = Arc::new(FakeTransport::new().reply(200, html));
    let client = client_with(&fake, "key");

    let got = client
        .get_html("/search", &params(&[("q", "coffee")]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(got, html);
    assert_eq!(query_of(&fake.requests()[0])["output"], "html");
}

#[tokio::test]
async fn keyless_client_forwards_per_call_api_key() {
    let fake = Arc::new(FakeTransport::new().reply(200, "{}").reply(200, "{}"));
    let client = client_with(&fake, "");
    let cancel = CancellationToken::new();

    client
        .search(&params(&[("api_key", "per-call"), ("q", "x")]), &cancel)
        .await
        .unwrap();
    client.search(&params(&[("q", "x")]), &cancel).await.unwrap();

    let reqs = fake.requests();
    assert_eq!(
        query_of(&reqs[0]),
        params(&[("api_key", "per-call"), ("q", "x"), ("output", "json")])
    );
    assert_eq!(
        query_of(&reqs[1]),
        params(&[("q", "x"), ("output", "json")])
    );
}

#[tokio::test]
async fn transport_failures_are_classified() {
    let fake = Arc::new(
        FakeTransport::new()
            .fail(TransportError::Timeout)
            .fail(TransportError::Network("connection reset".into())),
    );
    let client = client_with(&fake, "key");
    let cancel = CancellationToken::new();

    let err = client.search(&Params::new(), &cancel).await.unwrap_err();
    assert!(matches!(err, SerpError::DeadlineExceeded));

    let err = client.search(&Params::new(), &cancel).await.unwrap_err();
    assert!(matches!(err, SerpError::Network(m) if m == "connection reset"));
}

#[tokio::test]
async fn cancelled_token_yields_cancelled() {
    let fake = Arc::new(FakeTransport::new().reply(200, "{}"));
    let client = client_with(&fake, "key");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.account(&cancel).await.unwrap_err();
    assert!(matches!(err, SerpError::Cancelled));
}

#[tokio::test]
async fn identical_searches_give_identical_results() {
    let body = page(Some("https://serpapi.test/search?q=x&start=10"), "same");
    let fake = Arc::new(FakeTransport::new().reply(200, &body).reply(200, &body));
    let client = client_with(&fake, "key");
    let cancel = CancellationToken::new();
    let p = params(&[("q", "x")]);

    let a = client.search(&p, &cancel).await.unwrap();
    let b = client.search(&p, &cancel).await.unwrap();
    assert_eq!(a, b);

    let reqs = fake.requests();
    assert_eq!(reqs[0].url, reqs[1].url);
}

#[tokio::test]
async fn each_call_is_exactly_one_exchange() {
    let fake = Arc::new(FakeTransport::new().reply(500, "boom"));
    let client = client_with(&fake, "key");

    let _ = client
        .search(&Params::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(fake.requests().len(), 1);
}

#[tokio::test]
async fn paginate_follows_next_links_until_exhausted() {
    let fake = Arc::new(
        FakeTransport::new()
            .reply(
                200,
                &page(
                    Some("https://serpapi.com/search.json?engine=google&q=coffee&start=10&api_key=OTHER&output=json"),
                    "page 1",
                ),
            )
            .reply(
                200,
                &page(
                    Some("https://serpapi.com/search.json?engine=google&q=coffee&start=20"),
                    "page 2",
                ),
            )
            .reply(200, &page(None, "page 3")),
    );
    let client = client_with(&fake, "mine");
    let cancel = CancellationToken::new();

    let pages: Vec<_> = client
        .paginate(params(&[("engine", "google"), ("q", "coffee")]), &cancel)
        .collect()
        .await;

    let titles: Vec<String> = pages
        .into_iter()
        .map(|p| p.unwrap()["organic_results"][0]["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["page 1", "page 2", "page 3"]);

    let reqs = fake.requests();
    assert_eq!(reqs.len(), 3);
    assert_eq!(query_of(&reqs[1])["start"], "10");
    assert_eq!(query_of(&reqs[1])["api_key"], "mine");
    assert_eq!(query_of(&reqs[2])["start"], "20");
    assert!(reqs.iter().all(|r| r.url.path() == "/search"));
}

#[tokio::test]
async fn paginate_stops_after_first_error() {
    let fake = Arc::new(
        FakeTransport::new()
            .reply(200, &page(Some("https://serpapi.com/search?q=x&start=10"), "one"))
            .reply(429, r#"{"error":"Your account has run out of searches."}"#)
            .reply(200, &page(None, "never fetched")),
    );
    let client = client_with(&fake, "key");
    let cancel = CancellationToken::new();

    let pages: Vec<_> = client
        .paginate(params(&[("q", "x")]), &cancel)
        .collect()
        .await;

    assert_eq!(pages.len(), 2);
    assert!(pages[0].is_ok());
    let err = pages[1].as_ref().unwrap_err();
    assert_eq!(
        err.to_string(),
        "serpapi error (429): Your account has run out of searches."
    );
    assert_eq!(fake.requests().len(), 2);
}

#[tokio::test]
async fn paginate_stops_when_next_link_repeats_current_page() {
    let fake = Arc::new(
        FakeTransport::new()
            .reply(200, &page(Some("https://serpapi.com/search?q=x"), "loop"))
            .reply(200, &page(None, "never fetched")),
    );
    let client = client_with(&fake, "key");
    let cancel = CancellationToken::new();

    let pages: Vec<_> = client
        .paginate(params(&[("q", "x")]), &cancel)
        .collect()
        .await;
    assert_eq!(pages.len(), 1);
    assert_eq!(fake.requests().len(), 1);
}

#[tokio::test]
async fn paginate_can_be_capped_with_take() {
    let fake = Arc::new(
        FakeTransport::new()
            .reply(200, &page(Some("https://serpapi.com/search?q=x&start=10"), "1"))
            .reply(200, &page(Some("https://serpapi.com/search?q=x&start=20"), "2"))
            .reply(200, &page(Some("https://serpapi.com/search?q=x&start=30"), "3")),
    );
    let client = client_with(&fake, "key");
    let cancel = CancellationToken::new();

    let pages: Vec<_> = client
        .paginate(params(&[("q", "x")]), &cancel)
        .take(2)
        .collect()
        .await;
    assert_eq!(pages.len(), 2);
    assert_eq!(fake.requests().len(), 2);
}

#[tokio::test]
async fn paginate_keeps_per_call_api_key_on_keyless_client() {
    let fake = Arc::new(
        FakeTransport::new()
            .reply(
                200,
                &page(Some("https://serpapi.com/search?q=x&start=10&api_key=LEAKED"), "1"),
            )
            .reply(200, &page(None, "2")),
    );
    let client = client_with(&fake, "");
    let cancel = CancellationToken::new();

    let pages: Vec<_> = client
        .paginate(params(&[("api_key", "per-call"), ("q", "x")]), &cancel)
        .collect()
        .await;
    assert_eq!(pages.len(), 2);

    let reqs = fake.requests();
    assert_eq!(query_of(&reqs[0])["api_key"], "per-call");
    assert_eq!(query_of(&reqs[1])["api_key"], "per-call");
    assert_eq!(query_of(&reqs[1])["start"], "10");
}
