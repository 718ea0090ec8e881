//! Register bus transport
//!
//! `BusTransport` is the byte-level seam the sensor layer talks to. The
//! concrete transport is `SharedBus`, which puts any `embedded_hal` I2C
//! implementation behind a mutex so acquisition threads can share it.

use crate::imu::error::BusError;
use crate::imu::types::combine_bytes;
use embedded_hal::i2c::{Error as _, I2c};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

pub trait BusTransport: Send + Sync + fmt::Debug {
    fn read_byte(&self, address: u8, register: u8) -> Result<u8, BusError>;

    fn write_byte(&self, address: u8, register: u8, value: u8) -> Result<(), BusError>;

    /// Read an output pair, low byte first, and combine it into the raw
    /// 16-bit value. Transports that can hold the bus across both reads
    /// should override this.
    fn read_register_pair(&self, address: u8, low: u8, high: u8) -> Result<u16, BusError> {
        let lo = self.read_byte(address, low)?;
        let hi = self.read_byte(address, high)?;
        Ok(combine_bytes(lo, hi))
    }
}

/// Mutex-guarded I2C bus.
///
/// Every transaction takes the lock, and a register pair is read under a
/// single lock so no other thread can slip a transaction between the low
/// and high byte.
pub struct SharedBus<I> {
    name: String,
    inner: Mutex<I>,
}

impl<I: I2c> SharedBus<I> {
    pub fn new(name: impl Into<String>, i2c: I) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(i2c),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, I>, BusError> {
        self.inner.lock().map_err(|_| BusError::Poisoned)
    }
}

fn read_locked<I: I2c>(i2c: &mut I, address: u8, register: u8) -> Result<u8, BusError> {
    let mut buf = [0u8; 1];
    i2c.write_read(address, &[register], &mut buf)
        .map_err(|e| BusError::transaction(address, register, format!("{:?}", e.kind())))?;
    Ok(buf[0])
}

impl<I: I2c + Send> BusTransport for SharedBus<I> {
    fn read_byte(&self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut i2c = self.lock()?;
        read_locked(&mut *i2c, address, register)
    }

    fn write_byte(&self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        let mut i2c = self.lock()?;
        i2c.write(address, &[register, value])
            .map_err(|e| BusError::transaction(address, register, format!("{:?}", e.kind())))
    }

    fn read_register_pair(&self, address: u8, low: u8, high: u8) -> Result<u16, BusError> {
        let mut i2c = self.lock()?;
        let lo = read_locked(&mut *i2c, address, low)?;
        let hi = read_locked(&mut *i2c, address, high)?;
        Ok(combine_bytes(lo, hi))
    }
}

impl<I> fmt::Debug for SharedBus<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBus").field("name", &self.name).finish()
    }
}

/// Open a Linux I2C character device such as `/dev/i2c-1`.
#[cfg(all(feature = "linux", target_os = "linux"))]
pub fn open_i2c(
    path: &std::path::Path,
) -> Result<SharedBus<linux_embedded_hal::I2cdev>, BusError> {
    let dev = linux_embedded_hal::I2cdev::new(path).map_err(|e| BusError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    tracing::info!("Opened I2C bus {}", path.display());
    Ok(SharedBus::new(path.display().to_string(), dev))
}
