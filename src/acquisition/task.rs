//! Acquisition task: one thread sampling all sensors at a fixed rate
//!
//! Each tick reads the accelerometer, magnetometer and gyroscope, appends a
//! line to the current log segment, pushes the bundle onto the channel,
//! sleeps one period and then checks the cancel signal. Cancellation is
//! therefore observed at most one period (plus in-flight I/O) after it is
//! requested.
//!
//! A `SensorInactive` error ends the task quietly with a logged diagnostic.
//! Any other error (bus, filesystem) is returned from the thread and ends
//! the task abnormally; the consumer only sees the channel close.

use crate::acquisition::cancel::CancelSignal;
use crate::acquisition::segment::{samples_per_segment, SegmentWriter};
use crate::imu::error::{ImuError, Result};
use crate::imu::state::SensorState;
use crate::imu::types::{SampleBundle, SensorKind};
use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Immutable acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Sampling frequency in Hz.
    pub frequency: f64,
    /// Log files are named `{file_base_name}_{segment}.txt`.
    pub file_base_name: String,
    /// Start a new file every this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_period: Option<f64>,
}

impl AcquisitionConfig {
    pub fn new(frequency: f64, file_base_name: impl Into<String>, rotation_period: Option<f64>) -> Self {
        Self {
            frequency,
            file_base_name: file_base_name.into(),
            rotation_period,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(ImuError::InvalidConfig(format!(
                "frequency must be > 0 Hz (got {})",
                self.frequency
            )));
        }
        if Duration::try_from_secs_f64(1.0 / self.frequency).is_err() {
            return Err(ImuError::InvalidConfig(format!(
                "frequency {} Hz is too low",
                self.frequency
            )));
        }
        if self.file_base_name.trim().is_empty() {
            return Err(ImuError::InvalidConfig("file base name is empty".into()));
        }
        if !is_plain_file_name(&self.file_base_name) {
            return Err(ImuError::InvalidConfig(format!(
                "file base name '{}' must be a plain name without path separators",
                self.file_base_name
            )));
        }
        if let Some(period) = self.rotation_period {
            if !(period.is_finite() && period > 0.0) {
                return Err(ImuError::InvalidConfig(format!(
                    "rotation period must be > 0 s (got {period})"
                )));
            }
            if samples_per_segment(self.frequency, period) == 0 {
                return Err(ImuError::InvalidConfig(format!(
                    "rotation period {period} s holds no samples at {} Hz",
                    self.frequency
                )));
            }
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency)
    }

    pub fn segment_len(&self) -> Option<u64> {
        self.rotation_period
            .map(|period| samples_per_segment(self.frequency, period))
    }
}

/// True for a single normal path component, so the log files stay inside
/// the data directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(part)), None) => part == name && !name.contains(['/', '\\']),
        _ => false,
    }
}

/// How a task ended without an uncaught error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    Cancelled,
    SensorInactive(SensorKind),
}

pub type TaskHandle = JoinHandle<Result<TaskExit>>;

#[derive(Debug)]
pub struct AcquisitionTask {
    config: AcquisitionConfig,
    signal: CancelSignal,
    handle: TaskHandle,
}

impl AcquisitionTask {
    /// Spawn the sampling thread and hand back the receiving end of its
    /// sample channel.
    pub fn start(
        state: Arc<SensorState>,
        data_dir: &Path,
        config: AcquisitionConfig,
    ) -> Result<(Self, Receiver<SampleBundle>)> {
        config.validate()?;

        let (tx, rx) = channel::unbounded();
        let signal = CancelSignal::new();
        let writer = SegmentWriter::new(data_dir, &config.file_base_name, config.segment_len());

        let worker = Worker {
            name: config.file_base_name.clone(),
            state,
            writer,
            period: config.sample_period(),
            signal: signal.clone(),
            tx,
        };
        let handle = thread::Builder::new()
            .name(format!("imu-{}", config.file_base_name))
            .spawn(move || worker.run())?;

        tracing::info!(
            "Started acquisition '{}' at {} Hz{}",
            config.file_base_name,
            config.frequency,
            config
                .rotation_period
                .map(|p| format!(", rotating every {p} s"))
                .unwrap_or_default()
        );

        Ok((
            Self {
                config,
                signal,
                handle,
            },
            rx,
        ))
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn into_parts(self) -> (TaskHandle, CancelSignal) {
        (self.handle, self.signal)
    }

    /// Request cancellation and wait for the thread.
    pub fn stop(self) -> thread::Result<Result<TaskExit>> {
        self.signal.request_cancel();
        self.handle.join()
    }
}

struct Worker {
    name: String,
    state: Arc<SensorState>,
    writer: SegmentWriter,
    period: Duration,
    signal: CancelSignal,
    tx: Sender<SampleBundle>,
}

impl Worker {
    fn run(mut self) -> Result<TaskExit> {
        let result = self.sample_loop();
        self.signal.mark_stopped();
        match result {
            Ok(samples) => {
                tracing::info!("Acquisition '{}' stopped after {} samples", self.name, samples);
                // dropping self closes the channel
                Ok(TaskExit::Cancelled)
            }
            Err(ImuError::SensorInactive(kind)) => {
                tracing::warn!("Acquisition '{}' ended: {} is inactive", self.name, kind);
                Ok(TaskExit::SensorInactive(kind))
            }
            Err(e) => {
                tracing::error!("Acquisition '{}' failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    fn sample_loop(&mut self) -> Result<u64> {
        let mut samples = 0u64;
        let mut consumer_gone = false;

        loop {
            self.writer.start_segment()?;
            let bundle = self.state.read_sample()?;
            self.writer.write_sample(&bundle)?;
            if self.tx.send(bundle).is_err() && !consumer_gone {
                tracing::debug!("Sample receiver dropped, logging to file only");
                consumer_gone = true;
            }
            samples += 1;

            thread::sleep(self.period);

            if self.signal.is_cancel_requested() {
                break;
            }
        }

        self.writer.finish()?;
        Ok(samples)
    }
}
