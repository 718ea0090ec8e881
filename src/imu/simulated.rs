//! In-process bus used with `--simulate` and in tests
//!
//! Holds a register file, records every write, and can be told to fail
//! reads or writes.

use crate::imu::bus::BusTransport;
use crate::imu::error::BusError;
use crate::imu::registers::{AxisRegisters, RegisterMap, RegisterWrite};
use crate::imu::types::{AxisReading, SensorKind};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    registers: HashMap<(u8, u8), u8>,
    writes: Vec<RegisterWrite>,
    reads: usize,
    /// Writes allowed before every further write fails.
    write_budget: Option<usize>,
    fail_reads: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedBus {
    inner: Mutex<Inner>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device lying flat and still: 1 g on Z, a small field on the
    /// magnetometer, zero rate on the gyroscope.
    pub fn at_rest(map: &RegisterMap) -> Self {
        let bus = Self::new();
        bus.set_reading(map, SensorKind::Accelerometer, AxisReading { x: 12, y: -30, z: 1366 });
        bus.set_reading(map, SensorKind::Magnetometer, AxisReading { x: 410, y: -1210, z: 2630 });
        bus.set_reading(map, SensorKind::Gyroscope, AxisReading { x: -3, y: 5, z: 1 });
        bus
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub fn set_register(&self, address: u8, register: u8, value: u8) {
        self.lock().registers.insert((address, register), value);
    }

    #[cfg(test)]
    pub fn register(&self, address: u8, register: u8) -> u8 {
        self.lock()
            .registers
            .get(&(address, register))
            .copied()
            .unwrap_or(0)
    }

    /// Store a raw 16-bit value into an output pair.
    pub fn set_raw(&self, address: u8, pair: AxisRegisters, raw: u16) {
        let [lo, hi] = raw.to_le_bytes();
        let mut inner = self.lock();
        inner.registers.insert((address, pair.low), lo);
        inner.registers.insert((address, pair.high), hi);
    }

    pub fn set_reading(&self, map: &RegisterMap, kind: SensorKind, reading: AxisReading) {
        let regs = map.sensor(kind);
        for (pair, value) in regs.axes.iter().zip([reading.x, reading.y, reading.z]) {
            self.set_raw(regs.address, *pair, value as u16);
        }
    }

    #[cfg(test)]
    pub fn writes(&self) -> Vec<RegisterWrite> {
        self.lock().writes.clone()
    }

    #[cfg(test)]
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    #[cfg(test)]
    /// Let `n` more writes succeed, then fail the rest.
    pub fn fail_writes_after(&self, n: usize) {
        self.lock().write_budget = Some(n);
    }

    #[cfg(test)]
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }
}

impl BusTransport for SimulatedBus {
    fn read_byte(&self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut inner = self.lock();
        if inner.fail_reads {
            return Err(BusError::transaction(address, register, "simulated read failure"));
        }
        inner.reads += 1;
        Ok(inner
            .registers
            .get(&(address, register))
            .copied()
            .unwrap_or(0))
    }

    fn write_byte(&self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        let mut inner = self.lock();
        if let Some(budget) = inner.write_budget.as_mut() {
            if *budget == 0 {
                return Err(BusError::transaction(address, register, "simulated write failure"));
            }
            *budget -= 1;
        }
        inner.registers.insert((address, register), value);
        inner.writes.push(RegisterWrite::new(address, register, value));
        Ok(())
    }
}
