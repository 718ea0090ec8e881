//! Starting and stopping background acquisitions

use crate::acquisition::AcquisitionConfig;
use crate::imu::ImuError;
use crate::shared::internal_error;
use crate::tools::ImuContext;
use rmcp::{model::*, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartAcquisitionParams {
    #[schemars(description = "Sampling frequency in Hz (must be > 0)")]
    pub frequency: f64,
    #[schemars(description = "Base name for log files, written as {name}_{segment}.txt in the data directory")]
    pub file_base_name: String,
    #[schemars(description = "Start a new log file every this many seconds (optional)")]
    #[serde(default)]
    pub rotation_period: Option<f64>,
}

// === Tool Functions ===

pub async fn start_acquisition(
    ctx: Arc<ImuContext>,
    params: StartAcquisitionParams,
) -> Result<CallToolResult, McpError> {
    let config = AcquisitionConfig::new(
        params.frequency,
        params.file_base_name,
        params.rotation_period,
    );

    let launched = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            let rx = ctx.supervisor().launch(config.clone())?;
            ctx.forward_samples(&config.file_base_name, rx)?;
            Ok::<_, ImuError>(())
        })
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?
    };

    if let Err(e) = launched {
        return Ok(CallToolResult::success(vec![Content::text(format!(
            "Failed to start acquisition: {}",
            e
        ))]));
    }

    Ok(CallToolResult::success(vec![Content::text(format!(
        "Acquisition '{}' started at {} Hz{}",
        config.file_base_name,
        config.frequency,
        config
            .rotation_period
            .map(|p| format!(", new file every {} s", p))
            .unwrap_or_default()
    ))]))
}

pub async fn stop_acquisitions(ctx: Arc<ImuContext>) -> Result<CallToolResult, McpError> {
    let joined = tokio::task::spawn_blocking(move || ctx.shutdown_acquisitions())
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?;

    let output = if joined.is_empty() {
        "No acquisitions running".to_string()
    } else {
        format!("Stopped and joined {} acquisition task(s)", joined.len())
    };
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

pub async fn get_latest_sample(ctx: Arc<ImuContext>) -> Result<CallToolResult, McpError> {
    match ctx.latest_sample() {
        Some(bundle) => {
            let json = serde_json::to_string_pretty(&bundle)
                .map_err(|e| internal_error(format!("Serialization error: {}", e)))?;
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
        None => Ok(CallToolResult::success(vec![Content::text(
            "No samples yet. Start an acquisition first.",
        )])),
    }
}
