//! IMU layer: bus transport, register map, sensor state and axis decoding

pub mod bus;
pub mod error;
pub mod registers;
pub mod simulated;
pub mod state;
pub mod types;

pub use bus::BusTransport;
pub use error::ImuError;
pub use state::SensorState;
pub use types::{SampleBundle, SensorKind};
