//! HTTP handlers. Each one validates, delegates to the harness and shapes
//! the JSON reply; none holds state of its own.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use fault_harness::DeviceId;
use modbus_frame::{inspect, Frame, FrameDiagnostic};

use crate::error::ApiError;
use crate::wire::{
    AddFlagBody, AddFlagResponse, ClearAllResponse, ClearResponse, DeviceStatusResponse, EmulateBody,
    EmulateResponse, HealthResponse, HistoryQuery, InspectBody, PendingEntry, PendingResponse,
    StatusResponse, TransactionBody, TransactionResponse,
};
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/error-flag/add", post(add_flag))
        .route("/error-flag/status", get(status))
        .route("/error-flag/status/:device_id", get(device_status))
        .route("/error-flag/pending/:device_id", get(pending))
        .route("/error-flag/clear/:device_id", post(clear_device))
        .route("/error-flag/clear-all", post(clear_all))
        .route("/inverter/error", post(emulate))
        .route("/inverter/transaction", post(transaction))
        .route("/frame/inspect", post(inspect_frame))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn add_flag(
    State(state): State<AppState>,
    body: Result<Json<AddFlagBody>, JsonRejection>,
) -> ApiResult<AddFlagResponse> {
    let Json(body) = body?;
    let device = DeviceId::parse(&body.device_id)?;
    let armed = state.harness.arm(device.clone(), &body.fault_request())?;

    let message = match armed.replaced {
        Some(_) => format!(
            "Error flag '{}' replaced the pending fault for device {device}",
            armed.descriptor.kind()
        ),
        None => format!(
            "Error flag '{}' armed for device {device}",
            armed.descriptor.kind()
        ),
    };
    Ok(Json(AddFlagResponse {
        message,
        replaced: armed.replaced.is_some(),
        device_id: device,
        descriptor: armed.descriptor,
        previous: armed.replaced,
    }))
}

async fn status(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<StatusResponse> {
    let Query(query) = query?;
    let ledger = state.harness.ledger();
    let mut history = ledger.list_all();
    let count = history.len();
    if let Some(limit) = query.limit {
        history = history.latest(limit);
    }
    let pending = state
        .harness
        .pending()
        .snapshot()
        .into_iter()
        .map(|(device_id, descriptor)| PendingEntry {
            device_id,
            descriptor,
        })
        .collect();
    Ok(Json(StatusResponse {
        history,
        count,
        capacity: ledger.capacity(),
        pending,
    }))
}

async fn device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<DeviceStatusResponse> {
    let Query(query) = query?;
    let device = DeviceId::parse(&device_id)?;
    let mut history = state.harness.ledger().list_for_device(&device);
    let count = history.len();
    if let Some(limit) = query.limit {
        history = history.latest(limit);
    }
    let pending = state.harness.pending().peek_pending(&device);
    Ok(Json(DeviceStatusResponse {
        device_id: device,
        history,
        count,
        pending,
    }))
}

async fn pending(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> ApiResult<PendingResponse> {
    let device = DeviceId::parse(&device_id)?;
    let pending = state.harness.pending().peek_pending(&device);
    Ok(Json(PendingResponse {
        device_id: device,
        pending,
    }))
}

async fn clear_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> ApiResult<ClearResponse> {
    let device = DeviceId::parse(&device_id)?;
    let cleared = state.harness.clear_device(&device);
    Ok(Json(ClearResponse {
        message: format!("Cleared {} history entries for {device}", cleared.records),
        cleared: cleared.records,
        disarmed: cleared.disarmed.is_some(),
    }))
}

async fn clear_all(State(state): State<AppState>) -> Json<ClearAllResponse> {
    let cleared = state.harness.clear_all();
    Json(ClearAllResponse {
        message: format!(
            "Cleared {} history entries and {} armed faults",
            cleared.records, cleared.disarmed
        ),
        cleared: cleared.records,
        disarmed: cleared.disarmed,
    })
}

/// Immediate emulation. Runs on its own task so a client hanging up during a
/// delay does not cancel the emulation or its history record.
async fn emulate(
    State(state): State<AppState>,
    body: Result<Json<EmulateBody>, JsonRejection>,
) -> ApiResult<EmulateResponse> {
    let Json(body) = body?;
    let request = body.fault_request();
    let record_for = body
        .device_id
        .as_deref()
        .map(DeviceId::parse)
        .transpose()?;

    let harness = state.harness.clone();
    let outcome = tokio::spawn(async move { harness.emulate_now(&request, record_for).await })
        .await
        .map_err(|err| ApiError::internal(format!("emulation task failed: {err}")))??;

    Ok(Json(EmulateResponse {
        no_response: outcome.is_no_response(),
        delay_ms: outcome.delay().as_millis() as u64,
        frame: outcome.frame().map(Frame::to_hex),
    }))
}

/// The simulator's hook: hand over the normal response for a device and get
/// back what should actually be sent.
async fn transaction(
    State(state): State<AppState>,
    body: Result<Json<TransactionBody>, JsonRejection>,
) -> ApiResult<TransactionResponse> {
    let Json(body) = body?;
    let device = DeviceId::parse(&body.device_id)?;
    let base = Frame::from_hex(&body.frame)?;

    let AppState { harness, link } = state;
    let outcome = tokio::spawn(async move {
        harness
            .serve_transaction(&device, base, link.as_ref())
            .await
    })
    .await
    .map_err(|err| ApiError::internal(format!("transaction task failed: {err}")))??;

    if let Some(fault) = &outcome.fault {
        info!(%fault, status = outcome.status_code, "transaction carried fault");
    }
    Ok(Json(TransactionResponse {
        no_response: outcome.response.is_none(),
        frame: outcome.response.as_ref().map(Frame::to_hex),
        fault: outcome.fault,
    }))
}

async fn inspect_frame(
    body: Result<Json<InspectBody>, JsonRejection>,
) -> ApiResult<FrameDiagnostic> {
    let Json(body) = body?;
    Ok(Json(inspect(&body.frame)))
}
