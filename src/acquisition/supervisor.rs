//! Tracks every launched acquisition task and stops them together

use crate::acquisition::task::{AcquisitionConfig, AcquisitionTask};
use crate::imu::error::Result;
use crate::imu::state::SensorState;
use crate::imu::types::SampleBundle;
use crossbeam::channel::Receiver;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct AcquisitionSupervisor {
    state: Arc<SensorState>,
    data_dir: PathBuf,
    /// Launch order.
    tasks: Vec<AcquisitionTask>,
}

impl AcquisitionSupervisor {
    pub fn new(state: Arc<SensorState>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            state,
            data_dir: data_dir.into(),
            tasks: Vec::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Start a task and keep track of it. Returns its sample receiver.
    pub fn launch(&mut self, config: AcquisitionConfig) -> Result<Receiver<SampleBundle>> {
        let (task, rx) = AcquisitionTask::start(self.state.clone(), &self.data_dir, config)?;
        self.tasks.push(task);
        Ok(rx)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &AcquisitionTask> {
        self.tasks.iter()
    }

    /// Cancel every task, then join them in launch order.
    ///
    /// Blocks until all threads exit; there is no timeout. Exit status is
    /// not inspected. Returns the indices in the order they were joined.
    pub fn shutdown_all(&mut self) -> Vec<usize> {
        join_all(self.cancel_all())
    }

    /// Ask every task to stop and hand them over for joining, leaving the
    /// supervisor empty. Lets a caller release a lock around the supervisor
    /// before waiting on the threads.
    pub fn cancel_all(&mut self) -> Vec<AcquisitionTask> {
        for task in &self.tasks {
            task.signal().request_cancel();
        }
        std::mem::take(&mut self.tasks)
    }
}

/// Join tasks in order, ignoring how each one ended.
pub fn join_all(tasks: Vec<AcquisitionTask>) -> Vec<usize> {
    let mut joined = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.into_iter().enumerate() {
        let (handle, _signal) = task.into_parts();
        let _ = handle.join();
        tracing::info!("IMU task {} joined", i);
        joined.push(i);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::cancel::CancelState;
    use crate::imu::registers::LSM9DS0;
    use crate::imu::simulated::SimulatedBus;
    use std::time::Duration;

    fn supervisor(dir: &Path, active: bool) -> AcquisitionSupervisor {
        let bus = Arc::new(SimulatedBus::at_rest(&LSM9DS0));
        let state = Arc::new(SensorState::new(bus, LSM9DS0));
        if active {
            state.setup_default().unwrap();
        }
        AcquisitionSupervisor::new(state, dir)
    }

    #[test]
    fn test_launch_tracks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(dir.path(), true);
        assert!(sup.is_empty());

        let _a = sup.launch(AcquisitionConfig::new(20.0, "a", None)).unwrap();
        let _b = sup.launch(AcquisitionConfig::new(40.0, "b", Some(1.0))).unwrap();
        assert_eq!(sup.len(), 2);
        let names: Vec<_> = sup.tasks().map(|t| t.config().file_base_name.clone()).collect();
        assert_eq!(names, ["a", "b"]);

        sup.shutdown_all();
    }

    #[test]
    fn test_shutdown_joins_each_in_launch_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(dir.path(), true);

        // slowest first so completion order differs from launch order
        let receivers: Vec<_> = [2.0, 50.0, 20.0]
            .iter()
            .enumerate()
            .map(|(i, f)| sup.launch(AcquisitionConfig::new(*f, format!("t{i}"), None)).unwrap())
            .collect();
        let signals: Vec<_> = sup.tasks().map(|t| t.signal().clone()).collect();

        for rx in &receivers {
            rx.recv().unwrap();
        }

        assert_eq!(sup.shutdown_all(), vec![0, 1, 2]);
        assert!(sup.is_empty());
        for signal in signals {
            assert_eq!(signal.state(), CancelState::Stopped);
        }
        for rx in receivers {
            while rx.try_recv().is_ok() {}
            assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        }

        // nothing left to join
        assert!(sup.shutdown_all().is_empty());
    }

    #[test]
    fn test_cancel_all_empties_before_join() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(dir.path(), true);
        let rx = sup.launch(AcquisitionConfig::new(50.0, "handoff", None)).unwrap();
        rx.recv().unwrap();

        let tasks = sup.cancel_all();
        assert!(sup.is_empty());
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].signal().is_cancel_requested());
        assert_eq!(join_all(tasks), vec![0]);
    }

    #[test]
    fn test_shutdown_ignores_failed_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(dir.path(), false);
        let rx = sup.launch(AcquisitionConfig::new(10.0, "dead", None)).unwrap();
        assert!(rx.recv().is_err());
        assert_eq!(sup.shutdown_all(), vec![0]);
    }

    #[test]
    fn test_launch_rejects_bad_config_without_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(dir.path(), true);
        assert!(sup.launch(AcquisitionConfig::new(10.0, "x", Some(-1.0))).is_err());
        assert!(sup.is_empty());
    }
}
