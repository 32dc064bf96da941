// src/api.rs
//! Device management HTTP API: add via activation code, list, remove.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::activation::ActivationClient;
use crate::error::Error;
use crate::store::DeviceRepository;
use crate::types::{DeviceSummary, RegisterReq};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DeviceRepository>,
    pub activation: Arc<ActivationClient>,
}

pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

pub fn build_router(state: AppState) -> Router {
    build_router_with_timeout(state, REQUEST_TIMEOUT)
}

pub fn build_router_with_timeout(state: AppState, timeout: StdDuration) -> Router {
    Router::new()
        .route("/api/devices", get(list_devices).post(add_device))
        .route("/api/devices/:device_id", delete(remove_device))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(timeout)),
        )
}

// ---------- API HANDLERS ---------- //

async fn add_device(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> Result<Json<DeviceSummary>, (StatusCode, String)> {
    if req.device_id.trim().is_empty() {
        return Err(bad("device_id"));
    }

    // The code is single-use at the service; a dropped request must still
    // end with the device stored.
    let task = tokio::spawn(async move {
        let device = state.activation.register(&req.code, &req.device_id).await?;
        if let Err(e) = state.store.add(device.clone()).await {
            error!(
                device_id = %device.device_id,
                host = %device.service_host,
                pkey = %device.credential_id,
                "activated device could not be stored: {e}"
            );
            return Err(e);
        }
        info!(device_id = %device.device_id, "device added");
        Ok::<_, Error>(device)
    });
    let device = task.await.map_err(internal)?.map_err(reject)?;

    Ok(Json(DeviceSummary::from(&device)))
}

async fn list_devices(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let devices = state.store.list().await.map_err(internal)?;
    let summaries: Vec<DeviceSummary> = devices.iter().map(DeviceSummary::from).collect();
    Ok(Json(json!({ "devices": summaries })))
}

async fn remove_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !state.store.remove(&device_id).await.map_err(internal)? {
        return Err((StatusCode::NOT_FOUND, format!("unknown device {device_id}")));
    }
    info!(device_id = %device_id, "device removed");
    Ok(Json(json!({"ok": true})))
}

fn bad(s: &'static str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("missing/invalid {}", s))
}

fn reject(e: Error) -> (StatusCode, String) {
    match e {
        Error::CodeFormat(_) | Error::Activation { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
        e if e.is_transport() => {
            error!("activation transport failure: {e}");
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        e => internal(e),
    }
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!("{e}");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal".into())
}
