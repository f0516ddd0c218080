mod common;

use axum::http::{StatusCode, header};
use chrono::{Days, Utc};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};

use common::{build_app, envelope, get, load_config};

const TOKEN: &str = "test-macaroon";

fn config_yaml(uri: &str, extra: &str) -> String {
    format!(
        r#"
version: "1.0.0"
logging:
  level: "warn"
  format: "json"
bind_address: 127.0.0.1:9888
entities: ["foo", "bar"]
transport:
  type: http
  uri: "{uri}"
  token: "{TOKEN}"
{extra}
"#
    )
}

async fn mock_metric(server: &mut ServerGuard, snap_id: &str, metric_name: &str, body: String) -> Mock {
    mock_filter(server, json!({"snap_id": snap_id, "metric_name": metric_name}), body).await
}

async fn mock_filter(server: &mut ServerGuard, filter: Value, body: String) -> Mock {
    server
        .mock("POST", "/metrics")
        .match_header("authorization", TOKEN)
        .match_body(Matcher::Json(json!({ "filters": [filter] })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn integration_scrape_translates_provider_metrics() {
    let mut server = Server::new_async().await;
    let channel = mock_metric(
        &mut server,
        "foo",
        "installed_base_by_channel",
        envelope(
            "foo",
            "installed_base_by_channel",
            &["2024-01-01", "2024-01-02"],
            json!([{"name": "stable", "values": [10, 12]}]),
        ),
    )
    .await;
    let country = mock_metric(
        &mut server,
        "bar",
        "weekly_installed_base_by_country",
        envelope(
            "bar",
            "weekly_installed_base_by_country",
            &["2024-01-02"],
            json!([
                {"name": "US", "values": [7]},
                {"name": "DE", "values": [1, 2]}
            ]),
        ),
    )
    .await;

    let uri = format!("{}/metrics", server.url());
    let app = build_app(load_config(&config_yaml(&uri, "")));
    let (response, body) = get(&app, "/metrics").await;

    channel.assert_async().await;
    country.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );

    assert!(body.contains(
        "snapcraft_install_base_by_channel_daily{channel=\"stable\",entity=\"foo\"} 10 1704067200000"
    ));
    assert!(body.contains(
        "snapcraft_install_base_by_channel_daily{channel=\"stable\",entity=\"foo\"} 12 1704153600000"
    ));
    assert!(body.contains(
        "snapcraft_install_base_by_country_weekly{country=\"US\",entity=\"bar\"} 7 1704153600000"
    ));
    // DE has two values for one bucket and is dropped on its own.
    assert!(!body.contains("country=\"DE\""));
    // Every other pair failed upstream and is simply missing.
    assert!(!body.contains("snapcraft_device_change_daily"));

    assert!(body.contains("snaptron_fetch_total{metric_name=\"installed_base_by_channel\",result=\"ok\"} 1"));
    assert!(body.contains(
        "snaptron_fetch_total{metric_name=\"installed_base_by_channel\",result=\"transport_error\"} 1"
    ));
    assert!(body.contains("snaptron_dropped_series_total{metric_name=\"weekly_installed_base_by_country\"} 1"));
}

#[tokio::test]
async fn integration_fail_fast_scrape_is_unavailable() {
    let server = Server::new_async().await;
    let uri = format!("{}/metrics", server.url());
    let app = build_app(load_config(&config_yaml(
        &uri,
        "collector:\n  failure_policy: fail-fast",
    )));

    let (response, body) = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let error: Value = serde_json::from_str(&body).expect("error body should be JSON");
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("unexpected status code"));
}

#[tokio::test]
async fn integration_latest_only_emits_yesterday() {
    let today = Utc::now().date_naive();
    let day = |n: u64| {
        today
            .checked_sub_days(Days::new(n))
            .unwrap()
            .format("%Y-%m-%d")
            .to_string()
    };
    let (d3, d2, d1) = (day(3), day(2), day(1));

    let mut server = Server::new_async().await;
    let changes = mock_filter(
        &mut server,
        json!({
            "snap_id": "foo",
            "metric_name": "daily_device_change",
            "start": d1,
            "end": d1
        }),
        envelope(
            "foo",
            "daily_device_change",
            &[d3.as_str(), d2.as_str(), d1.as_str()],
            json!([{"name": "new", "values": [1, 2, 3]}]),
        ),
    )
    .await;

    let uri = format!("{}/metrics", server.url());
    let app = build_app(load_config(&config_yaml(
        &uri,
        "collector:\n  staleness:\n    mode: latest-only\n    lag_days: 1",
    )));
    let (response, body) = get(&app, "/metrics").await;

    changes.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    let lines: Vec<_> = body
        .lines()
        .filter(|l| l.starts_with("snapcraft_device_change_daily{"))
        .collect();
    assert_eq!(lines.len(), 1, "got: {:?}", lines);
    assert!(lines[0].starts_with("snapcraft_device_change_daily{change=\"new\",entity=\"foo\"} 3 "));
}

#[tokio::test]
async fn integration_custom_path_and_single_entity() {
    let mut server = Server::new_async().await;
    let versions = mock_metric(
        &mut server,
        "foo",
        "installed_base_by_version",
        envelope(
            "foo",
            "installed_base_by_version",
            &["2024-01-01"],
            json!([{"name": "1.2.3", "values": [42]}]),
        ),
    )
    .await;

    let uri = format!("{}/metrics", server.url());
    let yaml = config_yaml(&uri, "metrics_path: /snap-metrics").replace(
        "entities: [\"foo\", \"bar\"]",
        "entities: [\"foo\"]",
    );
    let app = build_app(load_config(&yaml));

    let (response, body) = get(&app, "/snap-metrics").await;
    versions.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body.contains("snapcraft_install_base_by_version_daily{version=\"1.2.3\"} 42 1704067200000"));

    let (response, _) = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (response, index) = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(index.contains("<a href='/snap-metrics'>Metrics</a>"));
}

#[tokio::test]
async fn integration_health_does_not_scrape() {
    let mut server = Server::new_async().await;
    let upstream = server
        .mock("POST", "/metrics")
        .expect(0)
        .create_async()
        .await;

    let uri = format!("{}/metrics", server.url());
    let app = build_app(load_config(&config_yaml(&uri, "")));
    let (response, body) = get(&app, "/health").await;

    upstream.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["entities"], 2);
    assert_eq!(health["transport"], "http");
}
