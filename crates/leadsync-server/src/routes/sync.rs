use axum::{body::Bytes, extract::State, Json};
use leadsync_common::types::RunReport;
use leadsync_engine::{Credentials, SyncOrchestrator};
use serde::Deserialize;
use tracing::info;

use super::{parse_body, AppState};
use crate::error::AppError;

/// Body of `POST /sync`; every field falls back to the environment
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(alias = "amplemarketToken")]
    pub source_token: Option<String>,
    #[serde(alias = "instantlyToken")]
    pub destination_token: Option<String>,
    #[serde(alias = "instantlyApiKey")]
    pub destination_api_key: Option<String>,
}

pub(super) async fn run_sync(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunReport>, AppError> {
    let request: SyncRequest = parse_body(&body)?;
    let credentials = Credentials::resolve(
        request.source_token,
        request.destination_token,
        request.destination_api_key,
    )?;

    info!("Starting sync run");

    let report = SyncOrchestrator::from_config(&state.sync, &credentials, state.tracker.clone())?
        .run()
        .await?;

    Ok(Json(report))
}
