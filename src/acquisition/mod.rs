//! Background acquisition: sampling threads, rotating log files and the
//! supervisor that shuts them down

pub mod cancel;
pub mod segment;
pub mod supervisor;
pub mod task;

pub use supervisor::AcquisitionSupervisor;
pub use task::AcquisitionConfig;
