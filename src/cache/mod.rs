use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::ScoutResult;
use crate::models::{Dataset, PlayerSummary, RejectedRecord, TeamIndex};
use crate::services::data_fetcher::DataFetcher;
use crate::services::normalizer::{next_event, normalize_players, normalize_teams};

/// Stale when older than `max_age` at `now`. Timestamps in the future count as fresh.
pub fn is_stale(modified: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now - modified > max_age
}

/// Raw API responses stored as JSON files under one directory.
pub struct JsonCache {
    root: PathBuf,
    max_age: Duration,
}

impl JsonCache {
    pub fn new(root: impl Into<PathBuf>, max_age_hours: i64) -> Self {
        Self {
            root: root.into(),
            max_age: Duration::hours(max_age_hours),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.cache_dir, config.cache_max_age_hours)
    }

    pub fn bootstrap_path(&self) -> PathBuf {
        self.root.join("bootstrap.json")
    }

    pub fn summary_path(&self, player_id: u32) -> PathBuf {
        self.root.join("summaries").join(format!("player_{}.json", player_id))
    }

    /// Present and younger than the max age
    pub async fn is_fresh(&self, path: &Path) -> bool {
        let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return false,
        };
        !is_stale(modified, Utc::now(), self.max_age)
    }

    pub async fn read(&self, path: &Path) -> ScoutResult<Value> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn write(&self, path: &Path, value: &Value) -> ScoutResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec(value)?).await?;
        Ok(())
    }
}

fn array_field<'a>(root: &'a Value, key: &str) -> &'a [Value] {
    match root.get(key).and_then(Value::as_array) {
        Some(items) => items,
        None => {
            tracing::warn!("Bootstrap data has no '{}' list", key);
            &[]
        }
    }
}

/// Normalise raw bootstrap and summary payloads into a dataset.
/// Unreadable summaries are recorded as rejects; the player stays and scores on empty history.
pub fn build_dataset(bootstrap: &Value, raw_summaries: HashMap<u32, Value>) -> Dataset {
    let (players, mut rejected) = normalize_players(array_field(bootstrap, "elements"));
    let (teams, rejected_teams) = normalize_teams(array_field(bootstrap, "teams"));
    rejected.extend(rejected_teams);

    let mut summaries = HashMap::with_capacity(raw_summaries.len());
    for (id, raw) in raw_summaries {
        match serde_json::from_value::<PlayerSummary>(raw) {
            Ok(summary) => {
                summaries.insert(id, summary);
            }
            Err(e) => {
                tracing::warn!("Rejected summary for player {}: {}", id, e);
                rejected.push(RejectedRecord {
                    id: Some(id),
                    reason: format!("malformed summary: {}", e),
                });
            }
        }
    }

    let dataset = Dataset {
        players,
        teams: TeamIndex::new(teams),
        summaries,
        next_event: next_event(array_field(bootstrap, "events")),
        rejected,
    };

    tracing::info!(
        "Dataset: {} players, {} teams, {} summaries, next gameweek {:?}, {} rejected",
        dataset.players.len(),
        dataset.teams.len(),
        dataset.summaries.len(),
        dataset.next_event,
        dataset.rejected.len()
    );
    dataset
}

/// Assembles a `Dataset` from the cache, going to the network for anything missing or stale.
pub struct DatasetLoader {
    cache: JsonCache,
    fetcher: DataFetcher,
}

impl DatasetLoader {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            cache: JsonCache::from_config(config),
            fetcher: DataFetcher::new(config),
        }
    }

    pub async fn load_bootstrap(&self, force: bool) -> ScoutResult<Value> {
        let path = self.cache.bootstrap_path();
        if !force && self.cache.is_fresh(&path).await {
            tracing::debug!("Using cached {}", path.display());
            return self.cache.read(&path).await;
        }

        let bootstrap = self.fetcher.fetch_bootstrap().await?;
        self.cache.write(&path, &bootstrap).await?;
        Ok(bootstrap)
    }

    /// Summaries keyed by player id. A failed fetch falls back to a stale copy when one exists.
    pub async fn load_summaries(&self, player_ids: &[u32], force: bool) -> ScoutResult<HashMap<u32, Value>> {
        let mut summaries = HashMap::with_capacity(player_ids.len());
        let mut missing = Vec::new();

        for &id in player_ids {
            let path = self.cache.summary_path(id);
            if !force && self.cache.is_fresh(&path).await {
                match self.cache.read(&path).await {
                    Ok(raw) => {
                        summaries.insert(id, raw);
                        continue;
                    }
                    Err(e) => tracing::warn!("Unreadable cache file {}: {}", path.display(), e),
                }
            }
            missing.push(id);
        }

        tracing::info!(
            "{} summaries cached, {} to fetch",
            summaries.len(),
            missing.len()
        );

        for (id, result) in self.fetcher.fetch_player_summaries(&missing).await {
            let path = self.cache.summary_path(id);
            match result {
                Ok(raw) => {
                    self.cache.write(&path, &raw).await?;
                    summaries.insert(id, raw);
                }
                Err(_) => {
                    if let Ok(raw) = self.cache.read(&path).await {
                        tracing::warn!("Using stale summary for player {}", id);
                        summaries.insert(id, raw);
                    }
                }
            }
        }

        Ok(summaries)
    }

    pub async fn load(&self, force: bool) -> ScoutResult<Dataset> {
        let bootstrap = self.load_bootstrap(force).await?;
        let ids: Vec<u32> = array_field(&bootstrap, "elements")
            .iter()
            .filter_map(|e| e.get("id").and_then(Value::as_u64))
            .filter_map(|id| u32::try_from(id).ok())
            .collect();
        let summaries = self.load_summaries(&ids, force).await?;
        Ok(build_dataset(&bootstrap, summaries))
    }
}
