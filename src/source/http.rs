use super::DataSource;
use crate::error::{Result, WatchError};
use crate::model::{Entity, Snapshot, Totals};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// National totals as published by the case API.
#[derive(Debug, Deserialize)]
pub struct ApiTotals {
    pub confirmed: u64,
    pub dead: u64,
    pub recovered: u64,
}

/// One municipality row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCase {
    #[serde(default)]
    pub municipality_code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub confirmed: u64,
    #[serde(default)]
    pub dead: u64,
    #[serde(default)]
    pub recovered: u64,
    #[serde(rename = "confirmedPer1kCapita", default)]
    pub confirmed_per_1k_capita: f64,
}

/// Response document of the case API.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub totals: ApiTotals,
    #[serde(default)]
    pub cases: Vec<ApiCase>,
}

impl From<ApiCase> for Entity {
    fn from(case: ApiCase) -> Self {
        Entity {
            code: case.municipality_code,
            name: case.name,
            parent: case.parent,
            confirmed: case.confirmed,
            dead: case.dead,
            recovered: case.recovered,
            confirmed_per_capita: case.confirmed_per_1k_capita,
        }
    }
}

impl From<ApiResponse> for Snapshot {
    fn from(response: ApiResponse) -> Self {
        Snapshot {
            totals: Totals {
                confirmed: response.totals.confirmed,
                dead: response.totals.dead,
                recovered: response.totals.recovered,
            },
            entities: response.cases.into_iter().map(Entity::from).collect(),
        }
    }
}

/// Fetches the dataset as JSON over HTTP.
pub struct HttpSource {
    url: String,
    http_client: Client,
}

impl HttpSource {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Snapshot> {
        let response = self
            .http_client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| WatchError::FetchFailure(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(WatchError::FetchFailure(format!(
                "Source returned status {}: {}",
                status, body
            )));
        }

        let payload = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| WatchError::FetchFailure(format!("Failed to parse response: {}", e)))?;

        let snapshot = Snapshot::from(payload);
        debug!(
            entities = snapshot.entity_count(),
            confirmed = snapshot.totals.confirmed,
            "Fetched snapshot"
        );
        Ok(snapshot)
    }
}
