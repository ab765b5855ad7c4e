use crate::canary::{CanaryOrchestrator, CanaryRunResult};
use crate::error::{CanaryError, Result};
use lambda_runtime::LambdaEvent;
use serde::{Deserialize, Serialize};
use tracing::{error, field, info, info_span, Instrument};

/// Invocation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanaryRequest {
    pub canary_name: String,
}

impl CanaryRequest {
    pub fn new<S: Into<String>>(canary_name: S) -> Self {
        Self {
            canary_name: canary_name.into(),
        }
    }
}

/// Run one invocation. Every log line emitted while it runs carries the
/// canary name and, when the caller supplied one, its run id.
pub async fn handle(
    orchestrator: &CanaryOrchestrator,
    request: CanaryRequest,
    client_run_id: Option<&str>,
) -> Result<CanaryRunResult> {
    let span = info_span!(
        "invocation",
        canary_name = %request.canary_name,
        client_run_id = field::Empty
    );
    if let Some(run_id) = client_run_id {
        span.record("client_run_id", run_id);
    }

    async {
        let canary_name = request.canary_name.trim();
        if canary_name.is_empty() {
            let e = CanaryError::InvalidRequest {
                message: "canaryName must not be empty".to_string(),
            };
            error!("Rejected invocation: {}", e);
            return Err(e);
        }

        info!("Received request for canary {}", canary_name);
        orchestrator.run_canary(canary_name).await
    }
    .instrument(span)
    .await
}

/// Lambda entry point; the correlation id comes from the client context's
/// custom `runId` value
pub async fn handle_event(
    orchestrator: &CanaryOrchestrator,
    event: LambdaEvent<CanaryRequest>,
) -> std::result::Result<CanaryRunResult, lambda_runtime::Error> {
    let (request, context) = event.into_parts();
    let client_run_id = context
        .client_context
        .as_ref()
        .and_then(|client| client.custom.get("runId"))
        .cloned();

    Ok(handle(orchestrator, request, client_run_id.as_deref()).await?)
}
