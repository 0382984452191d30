// Integration tests for full watch cycles against mock HTTP endpoints.
//
// Both collaborators are the real HTTP implementations pointed at a mockito
// server: HttpSource for the case API and SlackWebhook for delivery.

use casewatch::config::WatchConfig;
use casewatch::delivery::SlackWebhook;
use casewatch::source::HttpSource;
use casewatch::watcher::CycleOutcome;
use casewatch::{WatchError, Watcher};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn cases_body(totals: (u64, u64, u64), cases: &[(&str, &str, u64)]) -> String {
    let cases: Vec<serde_json::Value> = cases
        .iter()
        .map(|(code, name, confirmed)| {
            let mut case = json!({
                "name": name,
                "parent": "Viken",
                "confirmed": confirmed,
                "dead": 0,
                "recovered": 0,
                "confirmedPer1kCapita": *confirmed as f64 / 100.0,
            });
            if !code.is_empty() {
                case["municipalityCode"] = json!(code);
            }
            case
        })
        .collect();

    json!({
        "totals": {"confirmed": totals.0, "dead": totals.1, "recovered": totals.2},
        "cases": cases,
    })
    .to_string()
}

async fn serve_cases(server: &mut ServerGuard, body: String) -> mockito::Mock {
    server
        .mock("GET", "/api/cases")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn build_watcher(server: &ServerGuard, temp_dir: &TempDir) -> Watcher {
    let mut config = WatchConfig::default();
    config.source.url = format!("{}/api/cases", server.url());
    config.slack.webhook_url = format!("{}/hook", server.url());
    config.state.path = temp_dir.path().join("state.json.gz");

    let source = Arc::new(HttpSource::new(config.source.url.clone()));
    let sink = Arc::new(SlackWebhook::new(config.slack.webhook_url.clone()));
    Watcher::new(&config, source, sink)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// First cycle only stores a baseline; the second reports the deltas.
#[tokio::test]
async fn test_baseline_then_notification() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let watcher = build_watcher(&server, &temp_dir);
    watcher.store().initialize_if_absent().unwrap();

    let webhook = server
        .mock("POST", "/hook")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r"Smittede_: ▲ \*\+5\* \| Nåværende: \*105\*".to_string()),
            Matcher::Regex(r"Friskmeldte_: ▲ \*\+2\*".to_string()),
            Matcher::Regex(r"Asker \(Viken\)".to_string()),
        ]))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let first = serve_cases(&mut server, cases_body((100, 2, 50), &[("3025", "Asker", 10)])).await;
    assert_eq!(watcher.run_cycle().await.unwrap(), CycleOutcome::Baseline);
    first.remove_async().await;

    let _second = serve_cases(&mut server, cases_body((105, 2, 52), &[("3025", "Asker", 15)])).await;
    let outcome = watcher.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Notified(report) if report.chunks == 1));

    webhook.assert_async().await;
}

/// The unknown bucket matches by name even when its code changes.
#[tokio::test]
async fn test_unknown_bucket_is_not_new() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let watcher = build_watcher(&server, &temp_dir);
    watcher.store().initialize_if_absent().unwrap();

    let webhook = server
        .mock("POST", "/hook")
        .match_body(Matcher::Regex(r"\*Ukjent \(Viken\)\*\\n_Smittede_".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let first = serve_cases(&mut server, cases_body((3, 0, 0), &[("9999", "Ukjent", 3)])).await;
    watcher.run_cycle().await.unwrap();
    first.remove_async().await;

    let _second = serve_cases(&mut server, cases_body((5, 0, 0), &[("", "Ukjent", 5)])).await;
    watcher.run_cycle().await.unwrap();

    webhook.assert_async().await;
}

/// Large change sets are split into Slack-sized chunks.
#[tokio::test]
async fn test_large_change_set_is_chunked() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let watcher = build_watcher(&server, &temp_dir);
    watcher.store().initialize_if_absent().unwrap();

    let codes: Vec<String> = (0..60).map(|i| format!("{:04}", i)).collect();
    let names: Vec<String> = (0..60).map(|i| format!("Kommune {}", i)).collect();
    let before: Vec<(&str, &str, u64)> = codes
        .iter()
        .zip(&names)
        .map(|(c, n)| (c.as_str(), n.as_str(), 1))
        .collect();
    let after: Vec<(&str, &str, u64)> = codes
        .iter()
        .zip(&names)
        .map(|(c, n)| (c.as_str(), n.as_str(), 2))
        .collect();

    // 4 header blocks + 2 per municipality = 124 blocks -> 50 + 50 + 24
    let webhook = server
        .mock("POST", "/hook")
        .match_body(Matcher::PartialJson(json!({
            "username": "COVID-19",
            "channel": "#covid-19",
        })))
        .with_status(200)
        .expect(3)
        .create_async()
        .await;

    let first = serve_cases(&mut server, cases_body((60, 0, 0), &before)).await;
    watcher.run_cycle().await.unwrap();
    first.remove_async().await;

    let _second = serve_cases(&mut server, cases_body((120, 0, 0), &after)).await;
    let outcome = watcher.run_cycle().await.unwrap();
    match outcome {
        CycleOutcome::Notified(report) => {
            assert_eq!(report.chunks, 3);
            assert_eq!(report.blocks, 124);
        }
        other => panic!("expected notification, got {:?}", other),
    }

    webhook.assert_async().await;
}

/// A rejected webhook call fails the cycle but the new baseline is kept.
#[tokio::test]
async fn test_webhook_rejection_keeps_new_baseline() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let watcher = build_watcher(&server, &temp_dir);
    watcher.store().initialize_if_absent().unwrap();

    let _webhook = server
        .mock("POST", "/hook")
        .with_status(404)
        .with_body("no_service")
        .create_async()
        .await;

    let first = serve_cases(&mut server, cases_body((10, 0, 0), &[])).await;
    watcher.run_cycle().await.unwrap();
    first.remove_async().await;

    let _second = serve_cases(&mut server, cases_body((12, 0, 0), &[])).await;
    let result = watcher.run_cycle().await;
    match result {
        Err(WatchError::DeliveryError { status, body }) => {
            assert_eq!(status, Some(404));
            assert_eq!(body, "no_service");
        }
        other => panic!("expected delivery error, got {:?}", other),
    }

    // Same data again: the baseline already reflects it, so nothing to send
    assert_eq!(watcher.run_cycle().await.unwrap(), CycleOutcome::Unchanged);
}
