use axum::{body::Bytes, extract::State, Json};
use leadsync_engine::{ConnectivityProbe, Credentials, ProbeReport, ProbeTarget};
use serde::Deserialize;

use super::{parse_body, AppState};
use crate::error::AppError;

/// Body of `POST /debug`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequest {
    #[serde(alias = "amplemarketToken")]
    pub source_token: Option<String>,
    #[serde(alias = "instantlyToken")]
    pub destination_token: Option<String>,
    #[serde(alias = "instantlyApiKey")]
    pub destination_api_key: Option<String>,
    /// Omitted means both APIs
    #[serde(default)]
    pub action: ProbeTarget,
}

pub(super) async fn run_probe(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProbeReport>, AppError> {
    let request: ProbeRequest = parse_body(&body)?;
    let credentials = Credentials::resolve(
        request.source_token,
        request.destination_token,
        request.destination_api_key,
    )?;

    let report = ConnectivityProbe::new(&state.sync, &credentials)?
        .run(request.action)
        .await;

    Ok(Json(report))
}
