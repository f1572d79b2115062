use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{ScoutError, ScoutResult};

// ── Endpoint paths ──────────────────────────────────────────────────────────

pub const BOOTSTRAP_PATH: &str = "bootstrap-static/";

pub fn summary_path(player_id: u32) -> String {
    format!("element-summary/{}/", player_id)
}

// ── DataFetcher ──────────────────────────────────────────────────────────────

/// Thin async client for the fantasy API. Responses stay raw JSON; the normaliser owns the schema.
pub struct DataFetcher {
    client: Client,
    base_url: String,
    request_delay: Duration,
}

impl DataFetcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> ScoutResult<Value> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Players (`elements`), teams and gameweeks (`events`)
    pub async fn fetch_bootstrap(&self) -> ScoutResult<Value> {
        tracing::info!("Fetching bootstrap data…");
        self.get_json(BOOTSTRAP_PATH).await
    }

    /// Per-gameweek history, upcoming fixtures and past seasons for one player
    pub async fn fetch_player_summary(&self, player_id: u32) -> ScoutResult<Value> {
        self.get_json(&summary_path(player_id)).await
    }

    /// Fetch summaries one at a time, pausing between requests.
    /// A failed player is reported alongside the successes instead of aborting the batch.
    pub async fn fetch_player_summaries(&self, player_ids: &[u32]) -> Vec<(u32, ScoutResult<Value>)> {
        let mut results = Vec::with_capacity(player_ids.len());

        for (i, &id) in player_ids.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let result = self.fetch_player_summary(id).await;
            if let Err(e) = &result {
                tracing::warn!("Failed to fetch summary for player {}: {}", id, e);
            }
            results.push((id, result));

            if (i + 1) % 100 == 0 {
                tracing::info!("Fetched {}/{} player summaries", i + 1, player_ids.len());
            }
        }

        results
    }
}
