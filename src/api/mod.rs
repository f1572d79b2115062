use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::DatasetLoader;
use crate::config::AppConfig;
use crate::error::ScoutError;
use crate::models::{ApiResponse, Dataset, Position, ScoredPlayer};
use crate::services::{plan_squad, rank_players, IgnoreAvailability, RankingReport};

pub struct AppState {
    config: AppConfig,
    dataset: RwLock<Dataset>,
}

type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        Self {
            config,
            dataset: RwLock::new(dataset),
        }
    }

    async fn ranking(&self, history: bool) -> RankingReport {
        let mut scoring = self.config.scoring.clone();
        scoring.include_history |= history;
        let dataset = self.dataset.read().await;
        rank_players(&dataset, &scoring)
    }
}

pub async fn serve(config: AppConfig, port: u16) -> anyhow::Result<()> {
    let dataset = DatasetLoader::new(&config).load(false).await?;
    let state = Arc::new(AppState::new(config, dataset));

    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("FPL Scout API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/players/ranked", get(get_ranked_players_handler))
        .route("/squad", get(get_squad_handler))
        .route("/data/fetch", post(fetch_data_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("FPL Scout API is running"))
}

// GET /players/ranked - Ranked table, optionally for one position
#[derive(Deserialize)]
struct RankedQuery {
    position: Option<String>,
    limit: Option<usize>,
    history: Option<bool>,
}

async fn get_ranked_players_handler(
    State(state): State<SharedState>,
    Query(params): Query<RankedQuery>,
) -> Result<Json<ApiResponse<Vec<ScoredPlayer>>>, (StatusCode, Json<ApiResponse<()>>)> {
    let position = match params.position.as_deref().map(str::parse::<Position>).transpose() {
        Ok(position) => position,
        Err(e) => return Err((StatusCode::BAD_REQUEST, Json(ApiResponse::error(e)))),
    };
    let limit = params.limit.unwrap_or(50);

    let report = state.ranking(params.history.unwrap_or(false)).await;
    let players: Vec<ScoredPlayer> = report
        .table
        .into_iter()
        .filter(|p| position.map_or(true, |pos| p.position == pos))
        .take(limit)
        .collect();

    Ok(Json(ApiResponse::success(players)))
}

// GET /squad - Build a squad with the batch availability default
#[derive(Deserialize)]
struct SquadQuery {
    budget: Option<u32>,
    history: Option<bool>,
}

#[derive(Serialize)]
struct SquadResponse {
    starters: Vec<ScoredPlayer>,
    bench: Vec<ScoredPlayer>,
    total_cost: u32,
    budget: u32,
    passes: usize,
    repairs: usize,
}

async fn get_squad_handler(
    State(state): State<SharedState>,
    Query(params): Query<SquadQuery>,
) -> Result<Json<ApiResponse<SquadResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let report = state.ranking(params.history.unwrap_or(false)).await;

    let mut selection = state.config.selection.clone();
    if let Some(budget) = params.budget {
        selection.budget = budget;
    }

    match plan_squad(
        &report.table,
        &HashSet::new(),
        &selection,
        &state.config.lineup,
        &mut IgnoreAvailability,
    ) {
        Ok(plan) => Ok(Json(ApiResponse::success(SquadResponse {
            total_cost: plan.selection.squad.total_cost(),
            budget: selection.budget,
            passes: plan.selection.passes,
            repairs: plan.selection.repairs,
            starters: plan.lineup.starters,
            bench: plan.lineup.bench,
        }))),
        Err(e) => {
            tracing::error!("Failed to build squad: {}", e);
            let status = match e {
                ScoutError::Capacity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ScoutError::Input(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(ApiResponse::error(e.to_string()))))
        }
    }
}

// POST /data/fetch - Refresh the cache and swap in the new dataset
#[derive(Deserialize)]
struct FetchDataRequest {
    force_refresh: Option<bool>,
}

async fn fetch_data_handler(
    State(state): State<SharedState>,
    Json(request): Json<FetchDataRequest>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    let loader = DatasetLoader::new(&state.config);

    match loader.load(request.force_refresh.unwrap_or(true)).await {
        Ok(dataset) => {
            let message = format!("Loaded {} players", dataset.players.len());
            *state.dataset.write().await = dataset;
            Ok(Json(ApiResponse::success(message)))
        }
        Err(e) => {
            tracing::error!("Failed to fetch data: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
