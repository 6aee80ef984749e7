use axum::Json;
use serde_json::{json, Value};

use crate::llm_client::MODEL;
use crate::tuning::prompts::SYSTEM_INSTRUCTION_VERSION;

/// GET /health
/// Returns a simple status object with service version and the tuning contract in use.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resutune-api",
        "model": MODEL,
        "instruction_version": SYSTEM_INSTRUCTION_VERSION
    }))
}
