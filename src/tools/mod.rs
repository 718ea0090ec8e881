//! MCP tool implementations
//!
//! Tools share one `ImuContext`: the sensor state, the acquisition
//! supervisor, and the most recent sample seen on any acquisition channel.

pub mod acquisition;
pub mod sensor;

use crate::acquisition::supervisor::join_all;
use crate::acquisition::AcquisitionSupervisor;
use crate::imu::{SampleBundle, SensorState};
use crossbeam::channel::Receiver;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

#[derive(Debug)]
pub struct ImuContext {
    pub state: Arc<SensorState>,
    supervisor: Mutex<AcquisitionSupervisor>,
    latest: Arc<Mutex<Option<SampleBundle>>>,
}

impl ImuContext {
    pub fn new(state: Arc<SensorState>, supervisor: AcquisitionSupervisor) -> Self {
        Self {
            state,
            supervisor: Mutex::new(supervisor),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn supervisor(&self) -> MutexGuard<'_, AcquisitionSupervisor> {
        self.supervisor.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn latest_sample(&self) -> Option<SampleBundle> {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel every acquisition and wait for each in launch order. The
    /// supervisor lock is released before joining, so other tools are not
    /// held up by a slow task.
    pub fn shutdown_acquisitions(&self) -> Vec<usize> {
        let tasks = self.supervisor().cancel_all();
        join_all(tasks)
    }

    /// Drain an acquisition channel into the latest-sample slot until the
    /// task closes it.
    pub fn forward_samples(&self, name: &str, rx: Receiver<SampleBundle>) -> io::Result<()> {
        let latest = self.latest.clone();
        thread::Builder::new()
            .name(format!("imu-fwd-{name}"))
            .spawn(move || {
                for bundle in rx.iter() {
                    *latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(bundle);
                }
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::registers::LSM9DS0;
    use crate::imu::simulated::SimulatedBus;
    use crate::imu::types::AxisReading;
    use crate::acquisition::AcquisitionConfig;
    use std::time::{Duration, Instant};

    fn context(dir: &std::path::Path) -> Arc<ImuContext> {
        let bus = Arc::new(SimulatedBus::at_rest(&LSM9DS0));
        let state = Arc::new(SensorState::new(bus, LSM9DS0));
        state.setup_default().unwrap();
        Arc::new(ImuContext::new(state.clone(), AcquisitionSupervisor::new(state, dir)))
    }

    #[test]
    fn test_supervisor_free_while_joining_slow_task() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        // 0.5 Hz: the worker sleeps two seconds between samples
        let rx = ctx
            .supervisor()
            .launch(AcquisitionConfig::new(0.5, "slow", None))
            .unwrap();
        rx.recv().unwrap();

        let stopper = {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.shutdown_acquisitions())
        };
        while !ctx.supervisor().is_empty() {
            thread::sleep(Duration::from_millis(5));
        }

        let started = Instant::now();
        let running = ctx.supervisor().len();
        assert_eq!(running, 0);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!stopper.is_finished());

        assert_eq!(stopper.join().unwrap(), vec![0]);
    }

    #[test]
    fn test_forward_samples_keeps_latest() {
        let bus = Arc::new(SimulatedBus::new());
        let state = Arc::new(SensorState::new(bus, LSM9DS0));
        let dir = tempfile::tempdir().unwrap();
        let ctx = ImuContext::new(state.clone(), AcquisitionSupervisor::new(state, dir.path()));
        assert!(ctx.latest_sample().is_none());

        let (tx, rx) = crossbeam::channel::unbounded();
        ctx.forward_samples("test", rx).unwrap();
        for x in 1..=3 {
            let mut bundle = SampleBundle::default();
            bundle.gyroscope = AxisReading { x, y: 0, z: 0 };
            tx.send(bundle).unwrap();
        }
        drop(tx);

        for _ in 0..100 {
            if ctx.latest_sample().map(|b| b.gyroscope.x) == Some(3) {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("latest sample never reached the third bundle");
    }
}
