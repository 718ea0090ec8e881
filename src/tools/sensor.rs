//! Sensor setup, reset and one-shot reads

use crate::imu::{ImuError, SensorKind};
use crate::shared::internal_error;
use crate::tools::ImuContext;
use rmcp::{model::*, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SensorParams {
    #[schemars(description = "Sensor to read: accelerometer (acc), gyroscope (gyr) or magnetometer (mag)")]
    pub sensor: SensorKind,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadAxisParams {
    #[schemars(description = "Sensor to read: accelerometer (acc), gyroscope (gyr) or magnetometer (mag)")]
    pub sensor: SensorKind,
    #[schemars(description = "Axis index: 0 = x, 1 = y, 2 = z")]
    pub axis: u8,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteRegisterParams {
    #[schemars(description = "Sensor whose I2C address receives the write: accelerometer, gyroscope or magnetometer")]
    pub sensor: SensorKind,
    #[schemars(description = "Register address, e.g. 32 (0x20) for CTRL_REG1")]
    pub register: u8,
    #[schemars(description = "Byte to write")]
    pub value: u8,
}

// === Helper Functions ===

fn text(output: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(output.into())])
}

/// Run a blocking sensor operation off the async runtime. Sensor errors are
/// reported as tool output, a failed join as an internal error.
async fn run_blocking<F>(op: F) -> Result<CallToolResult, McpError>
where
    F: FnOnce() -> Result<String, ImuError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?;

    match result {
        Ok(output) => Ok(text(output)),
        Err(e) => Ok(text(format!("Failed: {}", e))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| internal_error(format!("Serialization error: {}", e)))
}

// === Tool Functions ===

pub async fn setup_sensors(ctx: Arc<ImuContext>) -> Result<CallToolResult, McpError> {
    run_blocking(move || {
        ctx.state.setup_default()?;
        Ok("Accelerometer, magnetometer and gyroscope configured and active".to_string())
    })
    .await
}

pub async fn reset_sensors(ctx: Arc<ImuContext>) -> Result<CallToolResult, McpError> {
    run_blocking(move || {
        ctx.state.reset()?;
        Ok("All control registers zeroed, sensors inactive".to_string())
    })
    .await
}

pub async fn write_register(
    ctx: Arc<ImuContext>,
    params: WriteRegisterParams,
) -> Result<CallToolResult, McpError> {
    run_blocking(move || {
        ctx.state
            .write_register(params.sensor, params.register, params.value)?;
        Ok(format!(
            "Wrote {:#04x} to {} register {:#04x}",
            params.value, params.sensor, params.register
        ))
    })
    .await
}

pub async fn get_sensor_status(ctx: Arc<ImuContext>) -> Result<CallToolResult, McpError> {
    let status = tokio::task::spawn_blocking(move || sensor_status(&ctx))
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?;

    Ok(text(to_json(&status)?))
}

fn sensor_status(ctx: &ImuContext) -> serde_json::Value {
    let sensors: serde_json::Map<String, serde_json::Value> = SensorKind::ALL
        .iter()
        .map(|kind| (kind.name().to_lowercase(), ctx.state.is_active(*kind).into()))
        .collect();

    let supervisor = ctx.supervisor();
    let acquisitions: Vec<_> = supervisor
        .tasks()
        .enumerate()
        .map(|(i, task)| {
            let config = task.config();
            serde_json::json!({
                "index": i,
                "file_base_name": config.file_base_name,
                "frequency": config.frequency,
                "rotation_period": config.rotation_period,
                "running": !task.is_finished(),
            })
        })
        .collect();

    let data_dir = supervisor.data_dir().display().to_string();
    drop(supervisor);

    serde_json::json!({
        "sensors": sensors,
        "data_dir": data_dir,
        "acquisitions": acquisitions,
    })
}

pub async fn read_axis(
    ctx: Arc<ImuContext>,
    params: ReadAxisParams,
) -> Result<CallToolResult, McpError> {
    run_blocking(move || {
        let value = ctx.state.read_axis(params.sensor, params.axis)?;
        Ok(format!("{} axis {}: {}", params.sensor, params.axis, value))
    })
    .await
}

pub async fn read_sensor(
    ctx: Arc<ImuContext>,
    params: SensorParams,
) -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(move || ctx.state.read_all(params.sensor))
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?;

    match result {
        Ok(reading) => Ok(text(to_json(&reading)?)),
        Err(e) => Ok(text(format!("Failed: {}", e))),
    }
}

pub async fn read_all_sensors(ctx: Arc<ImuContext>) -> Result<CallToolResult, McpError> {
    let result = tokio::task::spawn_blocking(move || ctx.state.read_sample())
        .await
        .map_err(|e| internal_error(format!("Task failed: {}", e)))?;

    match result {
        Ok(bundle) => Ok(text(to_json(&bundle)?)),
        Err(e) => Ok(text(format!("Failed: {}", e))),
    }
}
