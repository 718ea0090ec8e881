//! Active/inactive state for the three sensors, plus axis reads
//!
//! A sensor is active only after its full default configuration sequence
//! has been written; `reset` zeroes the control registers and deactivates
//! everything. Reads on an inactive sensor fail with
//! [`ImuError::SensorInactive`].
//!
//! The three axis reads behind `read_all` are separate bus transactions, so
//! a reading may mix values from consecutive sensor updates.

use crate::imu::bus::BusTransport;
use crate::imu::error::{ImuError, Result};
use crate::imu::registers::RegisterMap;
use crate::imu::types::{decode_twos_complement, Axis, AxisReading, SampleBundle, SensorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct SensorState {
    bus: Arc<dyn BusTransport>,
    registers: RegisterMap,
    /// Indexed by `SensorKind::index`.
    active: [AtomicBool; 3],
}

impl SensorState {
    pub fn new(bus: Arc<dyn BusTransport>, registers: RegisterMap) -> Self {
        Self {
            bus,
            registers,
            active: [
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
            ],
        }
    }

    pub fn is_active(&self, kind: SensorKind) -> bool {
        self.active[kind.index()].load(Ordering::Acquire)
    }

    fn set_active(&self, kind: SensorKind, active: bool) {
        self.active[kind.index()].store(active, Ordering::Release);
    }

    /// Write the default configuration to every sensor.
    ///
    /// Each sensor turns active as soon as its own sequence lands. A failed
    /// write aborts the rest and leaves earlier sensors active.
    pub fn setup_default(&self) -> Result<()> {
        for kind in SensorKind::ALL {
            for write in self.registers.sensor(kind).setup {
                self.bus
                    .write_byte(write.address, write.register, write.value)?;
            }
            self.set_active(kind, true);
            tracing::debug!("{} configured", kind);
        }
        tracing::info!("All sensors configured with default settings");
        Ok(())
    }

    /// Zero every control register used by setup and deactivate all sensors.
    pub fn reset(&self) -> Result<()> {
        for kind in SensorKind::ALL {
            for write in self.registers.sensor(kind).reset_sequence() {
                self.bus
                    .write_byte(write.address, write.register, write.value)?;
            }
        }
        for kind in SensorKind::ALL {
            self.set_active(kind, false);
        }
        tracing::info!("Sensor registers reset");
        Ok(())
    }

    /// Write one control register of a sensor, for configurations other
    /// than the default. Active flags are left alone.
    pub fn write_register(&self, kind: SensorKind, register: u8, value: u8) -> Result<()> {
        let address = self.registers.sensor(kind).address;
        self.bus.write_byte(address, register, value)?;
        tracing::debug!("{} register {:#04x} <- {:#010b}", kind, register, value);
        Ok(())
    }

    /// Read one axis (0 = x, 1 = y, 2 = z) as a signed value.
    pub fn read_axis(&self, kind: SensorKind, axis: u8) -> Result<i16> {
        let axis = Axis::from_index(axis).ok_or(ImuError::InvalidAxis(axis))?;
        if !self.is_active(kind) {
            return Err(ImuError::SensorInactive(kind));
        }
        let regs = self.registers.sensor(kind);
        let pair = regs.axes[axis.index()];
        let raw = self
            .bus
            .read_register_pair(regs.address, pair.low, pair.high)?;
        Ok(decode_twos_complement(raw))
    }

    pub fn read_all(&self, kind: SensorKind) -> Result<AxisReading> {
        Ok(AxisReading {
            x: self.read_axis(kind, Axis::X as u8)?,
            y: self.read_axis(kind, Axis::Y as u8)?,
            z: self.read_axis(kind, Axis::Z as u8)?,
        })
    }

    /// One tick: accelerometer, then magnetometer, then gyroscope.
    pub fn read_sample(&self) -> Result<SampleBundle> {
        Ok(SampleBundle {
            accelerometer: self.read_all(SensorKind::Accelerometer)?,
            magnetometer: self.read_all(SensorKind::Magnetometer)?,
            gyroscope: self.read_all(SensorKind::Gyroscope)?,
        })
    }
}
