//! Sensor kinds, readings and the raw-to-signed decoding

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three sensors on the IMU.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    #[serde(alias = "acc")]
    #[value(alias = "acc")]
    Accelerometer,
    #[serde(alias = "gyr")]
    #[value(alias = "gyr")]
    Gyroscope,
    #[serde(alias = "mag")]
    #[value(alias = "mag")]
    Magnetometer,
}

impl SensorKind {
    /// Sampling order used by acquisition tasks.
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Accelerometer,
        SensorKind::Magnetometer,
        SensorKind::Gyroscope,
    ];

    pub fn index(self) -> usize {
        match self {
            SensorKind::Accelerometer => 0,
            SensorKind::Gyroscope => 1,
            SensorKind::Magnetometer => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "Accelerometer",
            SensorKind::Gyroscope => "Gyroscope",
            SensorKind::Magnetometer => "Magnetometer",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis selector, indexed 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Signed reading of all three axes of one sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AxisReading {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl fmt::Display for AxisReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// One sampling tick: accelerometer, magnetometer, gyroscope, in read order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SampleBundle {
    pub accelerometer: AxisReading,
    pub magnetometer: AxisReading,
    pub gyroscope: AxisReading,
}

impl SampleBundle {
    /// Log-file line, newline included. Field order is Acc/Gyr/Mag.
    pub fn to_log_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for SampleBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Acc: {} Gyr: {} Mag: {}",
            self.accelerometer, self.gyroscope, self.magnetometer
        )
    }
}

/// Combine an output register pair into the raw 16-bit value.
pub fn combine_bytes(low: u8, high: u8) -> u16 {
    u16::from(low) | (u16::from(high) << 8)
}

/// 16-bit two's-complement decoding.
pub fn decode_twos_complement(raw: u16) -> i16 {
    if raw < 32768 {
        raw as i16
    } else {
        (i32::from(raw) - 65536) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_boundaries() {
        assert_eq!(decode_twos_complement(0), 0);
        assert_eq!(decode_twos_complement(1), 1);
        assert_eq!(decode_twos_complement(32767), 32767);
        assert_eq!(decode_twos_complement(32768), -32768);
        assert_eq!(decode_twos_complement(65535), -1);
    }

    #[test]
    fn test_decode_matches_reference_for_all_values() {
        for raw in 0..=u16::MAX {
            let expected = if raw < 32768 {
                i32::from(raw)
            } else {
                i32::from(raw) - 65536
            };
            assert_eq!(i32::from(decode_twos_complement(raw)), expected, "raw={raw}");
        }
    }

    #[test]
    fn test_combine_bytes_low_first() {
        assert_eq!(combine_bytes(0x34, 0x12), 0x1234);
        assert_eq!(combine_bytes(0xFF, 0x7F), 32767);
        assert_eq!(combine_bytes(0x00, 0x80), 32768);
    }

    #[test]
    fn test_log_line_orders_acc_gyr_mag() {
        let bundle = SampleBundle {
            accelerometer: AxisReading { x: 1, y: -2, z: 3 },
            magnetometer: AxisReading { x: 7, y: 8, z: -9 },
            gyroscope: AxisReading { x: -4, y: 5, z: 6 },
        };
        assert_eq!(
            bundle.to_log_line(),
            "Acc: 1 -2 3 Gyr: -4 5 6 Mag: 7 8 -9\n"
        );
    }

    #[test]
    fn test_axis_from_index() {
        assert_eq!(Axis::from_index(0), Some(Axis::X));
        assert_eq!(Axis::from_index(2), Some(Axis::Z));
        assert_eq!(Axis::from_index(3), None);
        assert_eq!(Axis::Y.index(), 1);
    }

    #[test]
    fn test_sensor_kind_aliases() {
        let kind: SensorKind = serde_json::from_str("\"mag\"").unwrap();
        assert_eq!(kind, SensorKind::Magnetometer);
        let kind: SensorKind = serde_json::from_str("\"gyroscope\"").unwrap();
        assert_eq!(kind, SensorKind::Gyroscope);
    }
}
