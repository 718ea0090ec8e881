//! imu-logger: background acquisition and logging for 9-DOF IMUs
//!
//! Samples the accelerometer, gyroscope and magnetometer of an LSM9DS0 over
//! I2C from one or more background threads, logs every tick to rotating
//! text files and streams it back to the caller.
//!
//! Modes:
//! - (default): MCP server on stdio with sensor and acquisition tools
//! - read: one-shot reading printed as JSON
//! - record: log until Ctrl-C or a fixed duration
//! - config: edit the config file

use clap::{Parser, Subcommand};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// === Modules ===

mod acquisition;
mod config;
mod imu;
mod shared;
mod tools;

use acquisition::{AcquisitionConfig, AcquisitionSupervisor};
use imu::registers::LSM9DS0;
use imu::{BusTransport, SensorKind, SensorState};
use tools::ImuContext;

const DEFAULT_FREQUENCY: f64 = 10.0;
const DEFAULT_BASE_NAME: &str = "imu";

// === CLI ===

#[derive(Parser)]
#[command(name = "imu-logger")]
#[command(about = "Background acquisition and logging for 9-DOF IMUs")]
struct Cli {
    /// Use the in-process simulated bus instead of real hardware
    #[arg(long, global = true)]
    simulate: bool,

    /// I2C device path (overrides the config file)
    #[arg(long, global = true)]
    bus: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the config file in your editor
    Config,
    /// Set up the sensors, print one reading as JSON, then reset them
    Read {
        /// Only read this sensor
        #[arg(value_enum)]
        sensor: Option<SensorKind>,
    },
    /// Log samples in the background until Ctrl-C or --duration elapses
    Record {
        /// Sampling frequency in Hz
        #[arg(short, long)]
        frequency: Option<f64>,
        /// Base name for log files ({name}_{segment}.txt)
        #[arg(short, long)]
        name: Option<String>,
        /// Start a new log file every N seconds
        #[arg(short, long)]
        rotate: Option<f64>,
        /// Stop after N seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },
}

// === Common Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyParams {}

// === Server ===

#[derive(Debug)]
pub struct ImuServer {
    pub tool_router: ToolRouter<Self>,
    ctx: Arc<ImuContext>,
}

impl ImuServer {
    pub fn new(ctx: Arc<ImuContext>, config: &config::Config) -> Self {
        let mut tool_router = Self::tool_router();

        for tool_name in &config.disabled {
            if tool_router.has_route(tool_name) {
                tool_router.remove_route(tool_name);
                tracing::info!("Disabled tool: {}", tool_name);
            } else {
                tracing::warn!("Config disables unknown tool: {}", tool_name);
            }
        }

        Self { tool_router, ctx }
    }
}

#[rmcp::tool_router]
impl ImuServer {
    // --- sensors ---

    #[rmcp::tool(description = "Write the default configuration to the accelerometer, magnetometer and gyroscope and mark them active. Required before any read.")]
    pub async fn setup_sensors(&self, Parameters(_params): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::setup_sensors(self.ctx.clone()).await
    }

    #[rmcp::tool(description = "Zero all sensor control registers and mark every sensor inactive. Running acquisitions stop at their next sample.")]
    pub async fn reset_sensors(&self, Parameters(_params): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::reset_sensors(self.ctx.clone()).await
    }

    #[rmcp::tool(description = "Write one byte to a sensor control register for a custom configuration. Does not change which sensors are active.")]
    pub async fn write_register(&self, Parameters(params): Parameters<tools::sensor::WriteRegisterParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::write_register(self.ctx.clone(), params).await
    }

    #[rmcp::tool(description = "Get which sensors are active, the data directory, and all tracked acquisitions")]
    pub async fn get_sensor_status(&self, Parameters(_params): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::get_sensor_status(self.ctx.clone()).await
    }

    #[rmcp::tool(description = "Read a single axis (0=x, 1=y, 2=z) of one sensor as a signed 16-bit value")]
    pub async fn read_axis(&self, Parameters(params): Parameters<tools::sensor::ReadAxisParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::read_axis(self.ctx.clone(), params).await
    }

    #[rmcp::tool(description = "Read x, y and z of one sensor")]
    pub async fn read_sensor(&self, Parameters(params): Parameters<tools::sensor::SensorParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::read_sensor(self.ctx.clone(), params).await
    }

    #[rmcp::tool(description = "Read accelerometer, magnetometer and gyroscope in one go")]
    pub async fn read_all_sensors(&self, Parameters(_params): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        tools::sensor::read_all_sensors(self.ctx.clone()).await
    }

    // --- acquisition ---

    #[rmcp::tool(description = "Start a background acquisition that samples all sensors at a fixed frequency and logs to {name}_{segment}.txt, optionally rotating files")]
    pub async fn start_acquisition(&self, Parameters(params): Parameters<tools::acquisition::StartAcquisitionParams>) -> Result<CallToolResult, McpError> {
        tools::acquisition::start_acquisition(self.ctx.clone(), params).await
    }

    #[rmcp::tool(description = "Stop every running acquisition and wait for each to finish")]
    pub async fn stop_acquisitions(&self, Parameters(_params): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        tools::acquisition::stop_acquisitions(self.ctx.clone()).await
    }

    #[rmcp::tool(description = "Get the most recent sample produced by any acquisition")]
    pub async fn get_latest_sample(&self, Parameters(_params): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        tools::acquisition::get_latest_sample(self.ctx.clone()).await
    }
}

#[rmcp::tool_handler]
impl ServerHandler for ImuServer {
    fn get_info(&self) -> ServerInfo {
        let description = String::from(
            "imu-logger: 9-DOF IMU access.\n\
             - sensors: setup, reset, register writes, status, per-axis and per-sensor reads\n\
             - acquisition: background logging with file rotation, latest sample\n",
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(description),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        simulate,
        bus,
        command,
    } = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::load();
    let bus_path = bus.unwrap_or_else(|| config.bus.clone());

    match command {
        Some(Commands::Config) => run_config_command()?,
        Some(Commands::Read { sensor }) => {
            let state = open_state(simulate, &bus_path)?;
            run_read(&state, sensor)?;
        }
        Some(Commands::Record {
            frequency,
            name,
            rotate,
            duration,
        }) => {
            let configs = if frequency.is_some() || name.is_some() || rotate.is_some() {
                vec![AcquisitionConfig::new(
                    frequency.unwrap_or(DEFAULT_FREQUENCY),
                    name.unwrap_or_else(|| DEFAULT_BASE_NAME.to_string()),
                    rotate,
                )]
            } else if !config.acquisitions.is_empty() {
                config.acquisitions.clone()
            } else {
                vec![AcquisitionConfig::new(DEFAULT_FREQUENCY, DEFAULT_BASE_NAME, None)]
            };
            run_record(open_state(simulate, &bus_path)?, config.data_dir(), configs, duration).await?;
        }
        None => run_server(open_state(simulate, &bus_path)?, &config).await?,
    }

    Ok(())
}

fn open_state(simulate: bool, path: &Path) -> anyhow::Result<Arc<SensorState>> {
    Ok(Arc::new(SensorState::new(open_bus(simulate, path)?, LSM9DS0)))
}

fn open_bus(simulate: bool, path: &Path) -> anyhow::Result<Arc<dyn BusTransport>> {
    if simulate {
        tracing::info!("Using simulated IMU bus");
        return Ok(Arc::new(imu::simulated::SimulatedBus::at_rest(&LSM9DS0)));
    }

    #[cfg(all(feature = "linux", target_os = "linux"))]
    {
        Ok(Arc::new(imu::bus::open_i2c(path)?))
    }

    #[cfg(not(all(feature = "linux", target_os = "linux")))]
    {
        anyhow::bail!(
            "No I2C support in this build (wanted {}); rerun with --simulate",
            path.display()
        )
    }
}

/// Open config file in user's editor
fn run_config_command() -> anyhow::Result<()> {
    let config_path = config::Config::path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    // Seed the file with one rotating acquisition so the format is visible
    if !config_path.exists() {
        let config = config::Config {
            acquisitions: vec![AcquisitionConfig::new(DEFAULT_FREQUENCY, DEFAULT_BASE_NAME, Some(60.0))],
            ..Default::default()
        };
        config.save()?;
        println!("Created config file: {}", config_path.display());
    }

    // Get editor from environment or use defaults
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            { "notepad".to_string() }
            #[cfg(not(target_os = "windows"))]
            { "nano".to_string() }
        });

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()?;

    Ok(())
}

/// Set up, print one reading as JSON, reset
fn run_read(state: &SensorState, sensor: Option<SensorKind>) -> anyhow::Result<()> {
    println!("{}", read_json(state, sensor)?);
    Ok(())
}

/// One reading as pretty JSON. The sensors are reset even if the read fails.
fn read_json(state: &SensorState, sensor: Option<SensorKind>) -> anyhow::Result<String> {
    state.setup_default()?;

    let output = (|| -> anyhow::Result<String> {
        Ok(match sensor {
            Some(kind) => serde_json::to_string_pretty(&state.read_all(kind)?)?,
            None => serde_json::to_string_pretty(&state.read_sample()?)?,
        })
    })();

    state.reset()?;
    output
}

/// Run acquisitions until Ctrl-C or the duration elapses
async fn run_record(
    state: Arc<SensorState>,
    data_dir: PathBuf,
    configs: Vec<AcquisitionConfig>,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let duration = match duration {
        Some(secs) if secs > 0.0 => Some(Duration::try_from_secs_f64(secs)?),
        Some(secs) => anyhow::bail!("--duration must be a positive number of seconds (got {})", secs),
        None => None,
    };

    shared::ensure_dir(&data_dir)?;
    state.setup_default()?;

    let mut supervisor = AcquisitionSupervisor::new(state.clone(), &data_dir);
    let mut consumers = Vec::new();

    for config in configs {
        let name = config.file_base_name.clone();
        let rx = match supervisor.launch(config) {
            Ok(rx) => rx,
            Err(e) => {
                tokio::task::spawn_blocking(move || supervisor.shutdown_all()).await?;
                state.reset()?;
                return Err(e.into());
            }
        };
        consumers.push(tokio::task::spawn_blocking(move || {
            let mut count = 0u64;
            for bundle in rx.iter() {
                count += 1;
                tracing::debug!("{}: {}", name, bundle);
            }
            (name, count)
        }));
    }

    println!(
        "Recording {} acquisition(s) into {} (Ctrl-C to stop)",
        supervisor.len(),
        data_dir.display()
    );
    let started = Instant::now();

    match duration {
        Some(duration) => tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            result = tokio::signal::ctrl_c() => result?,
        },
        None => tokio::signal::ctrl_c().await?,
    }

    let joined = tokio::task::spawn_blocking(move || supervisor.shutdown_all()).await?;
    let elapsed = started.elapsed();

    for consumer in consumers {
        let (name, count) = consumer.await?;
        println!("  {}: {} samples", name, count);
    }
    state.reset()?;

    println!(
        "Stopped {} task(s) after {}",
        joined.len(),
        shared::format_duration(elapsed.as_secs())
    );
    Ok(())
}

/// Run the MCP server
async fn run_server(state: Arc<SensorState>, config: &config::Config) -> anyhow::Result<()> {
    tracing::info!("Starting imu-logger server");

    let data_dir = config.data_dir();
    shared::ensure_dir(&data_dir)?;
    let ctx = Arc::new(ImuContext::new(
        state.clone(),
        AcquisitionSupervisor::new(state.clone(), data_dir),
    ));

    let server = ImuServer::new(ctx.clone(), config);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    // Stop whatever the client left running
    let joined = tokio::task::spawn_blocking(move || ctx.shutdown_acquisitions()).await?;
    if !joined.is_empty() {
        tracing::info!("Stopped {} acquisition(s) left running", joined.len());
    }
    if let Err(e) = state.reset() {
        tracing::warn!("Failed to reset sensors on exit: {}", e);
    }

    tracing::info!("imu-logger server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::types::AxisReading;

    #[test]
    fn test_read_one_sensor_on_simulated_bus() {
        let state = open_state(true, Path::new("/dev/i2c-1")).unwrap();
        let json = read_json(&state, Some(SensorKind::Gyroscope)).unwrap();
        let reading: AxisReading = serde_json::from_str(&json).unwrap();
        assert_eq!(reading, AxisReading { x: -3, y: 5, z: 1 });
        for kind in SensorKind::ALL {
            assert!(!state.is_active(kind));
        }
    }

    #[test]
    fn test_read_all_sensors_on_simulated_bus() {
        let state = open_state(true, Path::new("/dev/i2c-1")).unwrap();
        let json = read_json(&state, None).unwrap();
        let bundle: crate::imu::SampleBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(bundle.accelerometer, AxisReading { x: 12, y: -30, z: 1366 });
    }
}
