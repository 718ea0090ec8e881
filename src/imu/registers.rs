//! LSM9DS0 register map (BerryIMU v1)
//!
//! The accelerometer and magnetometer share the XM die at 0x1E, the gyroscope
//! sits at 0x6A. Only the registers the logger touches are listed.

use crate::imu::types::SensorKind;

pub const ACC_ADDRESS: u8 = 0x1E;
pub const MAG_ADDRESS: u8 = 0x1E;
pub const GYR_ADDRESS: u8 = 0x6A;

// XM control
pub const CTRL_REG1_XM: u8 = 0x20;
pub const CTRL_REG2_XM: u8 = 0x21;
pub const CTRL_REG5_XM: u8 = 0x24;
pub const CTRL_REG6_XM: u8 = 0x25;
pub const CTRL_REG7_XM: u8 = 0x26;

// G control
pub const CTRL_REG1_G: u8 = 0x20;
pub const CTRL_REG4_G: u8 = 0x23;

// Accelerometer output
pub const OUT_X_L_A: u8 = 0x28;
pub const OUT_X_H_A: u8 = 0x29;
pub const OUT_Y_L_A: u8 = 0x2A;
pub const OUT_Y_H_A: u8 = 0x2B;
pub const OUT_Z_L_A: u8 = 0x2C;
pub const OUT_Z_H_A: u8 = 0x2D;

// Magnetometer output
pub const OUT_X_L_M: u8 = 0x08;
pub const OUT_X_H_M: u8 = 0x09;
pub const OUT_Y_L_M: u8 = 0x0A;
pub const OUT_Y_H_M: u8 = 0x0B;
pub const OUT_Z_L_M: u8 = 0x0C;
pub const OUT_Z_H_M: u8 = 0x0D;

// Gyroscope output
pub const OUT_X_L_G: u8 = 0x28;
pub const OUT_X_H_G: u8 = 0x29;
pub const OUT_Y_L_G: u8 = 0x2A;
pub const OUT_Y_H_G: u8 = 0x2B;
pub const OUT_Z_L_G: u8 = 0x2C;
pub const OUT_Z_H_G: u8 = 0x2D;

/// Single configuration write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub address: u8,
    pub register: u8,
    pub value: u8,
}

impl RegisterWrite {
    pub const fn new(address: u8, register: u8, value: u8) -> Self {
        Self {
            address,
            register,
            value,
        }
    }
}

/// Low/high output register pair for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRegisters {
    pub low: u8,
    pub high: u8,
}

impl AxisRegisters {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SensorRegisters {
    pub address: u8,
    /// Default configuration, written in order by `setup_default`.
    pub setup: &'static [RegisterWrite],
    pub axes: [AxisRegisters; 3],
}

impl SensorRegisters {
    /// Every control register touched by `setup`, with a zero value.
    pub fn reset_sequence(&self) -> impl Iterator<Item = RegisterWrite> + '_ {
        self.setup
            .iter()
            .map(|w| RegisterWrite::new(w.address, w.register, 0))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegisterMap {
    pub accelerometer: SensorRegisters,
    pub gyroscope: SensorRegisters,
    pub magnetometer: SensorRegisters,
}

impl RegisterMap {
    pub fn sensor(&self, kind: SensorKind) -> &SensorRegisters {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }
}

const ACC_SETUP: [RegisterWrite; 2] = [
    // 100 Hz ODR, all axes enabled
    RegisterWrite::new(ACC_ADDRESS, CTRL_REG1_XM, 0b0110_0111),
    // +/- 16 g full scale
    RegisterWrite::new(ACC_ADDRESS, CTRL_REG2_XM, 0b0010_0000),
];

const MAG_SETUP: [RegisterWrite; 3] = [
    // temperature sensor on, high resolution, 50 Hz ODR
    RegisterWrite::new(MAG_ADDRESS, CTRL_REG5_XM, 0b1111_0000),
    // +/- 12 gauss
    RegisterWrite::new(MAG_ADDRESS, CTRL_REG6_XM, 0b0110_0000),
    // continuous conversion
    RegisterWrite::new(MAG_ADDRESS, CTRL_REG7_XM, 0b0000_0000),
];

const GYR_SETUP: [RegisterWrite; 2] = [
    // normal power mode, all axes enabled
    RegisterWrite::new(GYR_ADDRESS, CTRL_REG1_G, 0b0000_1111),
    // continuous update, 2000 dps full scale
    RegisterWrite::new(GYR_ADDRESS, CTRL_REG4_G, 0b0011_0000),
];

pub const LSM9DS0: RegisterMap = RegisterMap {
    accelerometer: SensorRegisters {
        address: ACC_ADDRESS,
        setup: &ACC_SETUP,
        axes: [
            AxisRegisters::new(OUT_X_L_A, OUT_X_H_A),
            AxisRegisters::new(OUT_Y_L_A, OUT_Y_H_A),
            AxisRegisters::new(OUT_Z_L_A, OUT_Z_H_A),
        ],
    },
    gyroscope: SensorRegisters {
        address: GYR_ADDRESS,
        setup: &GYR_SETUP,
        axes: [
            AxisRegisters::new(OUT_X_L_G, OUT_X_H_G),
            AxisRegisters::new(OUT_Y_L_G, OUT_Y_H_G),
            AxisRegisters::new(OUT_Z_L_G, OUT_Z_H_G),
        ],
    },
    magnetometer: SensorRegisters {
        address: MAG_ADDRESS,
        setup: &MAG_SETUP,
        axes: [
            AxisRegisters::new(OUT_X_L_M, OUT_X_H_M),
            AxisRegisters::new(OUT_Y_L_M, OUT_Y_H_M),
            AxisRegisters::new(OUT_Z_L_M, OUT_Z_H_M),
        ],
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_sequence_zeroes_setup_registers() {
        for kind in SensorKind::ALL {
            let regs = LSM9DS0.sensor(kind);
            let reset: Vec<_> = regs.reset_sequence().collect();
            assert_eq!(reset.len(), regs.setup.len());
            for (r, s) in reset.iter().zip(regs.setup) {
                assert_eq!((r.address, r.register, r.value), (s.address, s.register, 0));
            }
        }
    }

    #[test]
    fn test_accelerometer_x_pair() {
        assert_eq!(LSM9DS0.accelerometer.axes[0], AxisRegisters::new(0x28, 0x29));
        assert_eq!(LSM9DS0.magnetometer.axes[2], AxisRegisters::new(0x0C, 0x0D));
    }

    #[test]
    fn test_output_pairs_are_adjacent() {
        for kind in SensorKind::ALL {
            for pair in LSM9DS0.sensor(kind).axes {
                assert_eq!(pair.high, pair.low + 1);
            }
        }
    }
}
