//! Error types for the IMU and acquisition layers

use crate::imu::types::SensorKind;
use thiserror::Error;

/// Hardware I/O failure on the register bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to open bus {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("bus transaction at address {address:#04x}, register {register:#04x} failed: {reason}")]
    Transaction {
        address: u8,
        register: u8,
        reason: String,
    },

    #[error("bus lock poisoned by a panicked task")]
    Poisoned,
}

impl BusError {
    pub fn transaction(address: u8, register: u8, reason: impl Into<String>) -> Self {
        BusError::Transaction {
            address,
            register,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImuError {
    /// Read attempted on a sensor that has not been set up (or was reset).
    #[error("{0} is inactive, set it up before reading")]
    SensorInactive(SensorKind),

    #[error("invalid axis {0}, expected 0 (x), 1 (y) or 2 (z)")]
    InvalidAxis(u8),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid acquisition config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ImuError>;
