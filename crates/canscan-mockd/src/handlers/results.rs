//! Health, report and results store handlers

use axum::extract::State;
use axum::Json;
use canscan_core::{ClearedResults, ReportDocument, StoredResultList};
use serde_json::{json, Value};

use crate::error::{MockError, Result};
use crate::state::MockState;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/report
pub async fn get_report(State(state): State<MockState>) -> Result<Json<ReportDocument>> {
    if state.config().report_offline {
        return Err(MockError::ServiceUnavailable(
            "report generator offline".to_string(),
        ));
    }

    Ok(Json(ReportDocument {
        report: state.report(),
    }))
}

/// GET /api/results
pub async fn list_results(State(state): State<MockState>) -> Json<StoredResultList> {
    Json(StoredResultList {
        results: state.results(),
    })
}

/// DELETE /api/results
pub async fn clear_results(State(state): State<MockState>) -> Json<ClearedResults> {
    let cleared = state.clear();
    tracing::info!(cleared, "Cleared stored results");
    Json(ClearedResults { cleared })
}
