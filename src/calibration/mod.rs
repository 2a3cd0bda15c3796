//! Calibration data shared by every controller family, and the runtime
//! components that consume it.
pub mod gyro_average;
pub mod stick;

#[cfg(test)]
pub mod stick_test;

use std::f32::consts::PI;

/// Standard gravity used to convert accelerometer ticks
pub const GRAVITY: f32 = 9.8;
/// Accelerometer ticks per G at the calibration origin
pub const ACCEL_SENSITIVITY: i32 = 16384;
/// Gyroscope reference rate in degrees per second
pub const GYRO_REFERENCE_DPS: f32 = 936.0;
/// Gyroscope ticks at the reference rate
pub const GYRO_SENSITIVITY: i32 = 13371;

/// Where a calibration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationSource {
    /// Written to flash at the factory
    #[default]
    Factory,
    /// User calibration stored in flash, overrides the factory values
    User,
    /// Fixed values for devices that carry no calibration
    Fallback,
}

/// Extents of one stick axis in raw 12-bit ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisCalibration {
    pub min: u16,
    pub center: u16,
    pub max: u16,
}

impl AxisCalibration {
    pub fn new(min: u16, center: u16, max: u16) -> Self {
        Self { min, center, max }
    }
}

/// Calibration for both axes of one stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickCalibration {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
    pub source: CalibrationSource,
}

impl StickCalibration {
    /// Fixed calibration for sticks that report a plain byte per axis
    pub fn fallback() -> Self {
        let axis = AxisCalibration::new(0, 127, 255);
        Self {
            x: axis,
            y: axis,
            source: CalibrationSource::Fallback,
        }
    }
}

/// Calibration of the left and right sticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SticksCalibration {
    pub left: StickCalibration,
    pub right: StickCalibration,
}

impl SticksCalibration {
    pub fn fallback() -> Self {
        Self {
            left: StickCalibration::fallback(),
            right: StickCalibration::fallback(),
        }
    }
}

/// IMU origin offsets and the coefficients derived from them
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorCalibration {
    pub accel_origin: [i16; 3],
    pub gyro_origin: [i16; 3],
    /// Raw accelerometer ticks to m/s²
    pub accel_coeff: [f32; 3],
    /// Raw gyroscope ticks to rad/s
    pub gyro_coeff: [f32; 3],
    pub source: CalibrationSource,
}

impl SensorCalibration {
    /// Build the calibration from accelerometer and gyroscope origins
    pub fn new(accel_origin: [i16; 3], gyro_origin: [i16; 3], source: CalibrationSource) -> Self {
        let accel_coeff = accel_origin
            .map(|origin| (1.0 / (ACCEL_SENSITIVITY - origin as i32) as f32) * 4.0 * GRAVITY);
        let gyro_coeff = gyro_origin.map(|origin| {
            (GYRO_REFERENCE_DPS / (GYRO_SENSITIVITY - origin as i32) as f32) * (PI / 180.0)
        });
        Self {
            accel_origin,
            gyro_origin,
            accel_coeff,
            gyro_coeff,
            source,
        }
    }

    /// Convert raw accelerometer ticks to m/s²
    pub fn accel_to_si(&self, raw: [i16; 3]) -> [f32; 3] {
        [0, 1, 2].map(|i| raw[i] as f32 * self.accel_coeff[i])
    }

    /// Convert raw gyroscope ticks to rad/s
    pub fn gyro_to_si(&self, raw: [i16; 3]) -> [f32; 3] {
        [0, 1, 2].map(|i| (raw[i] as i32 - self.gyro_origin[i] as i32) as f32 * self.gyro_coeff[i])
    }
}

/// Controller body colours as packed RGB24
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceColorSet {
    pub body: u32,
    pub buttons: u32,
    pub left_grip: u32,
    pub right_grip: u32,
}

impl Default for DeviceColorSet {
    fn default() -> Self {
        Self {
            body: 0xFFFFFF,
            buttons: 0xFFFFFF,
            left_grip: 0xFFFFFF,
            right_grip: 0xFFFFFF,
        }
    }
}

/// Everything a device reports about its calibration during init
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    pub sticks: SticksCalibration,
    /// Absent on devices without IMU calibration in flash
    pub sensor: Option<SensorCalibration>,
    /// Absent on devices that do not report their colours
    pub colors: Option<DeviceColorSet>,
}
