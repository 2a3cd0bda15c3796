//! Decoding of the calibration blocks stored in the controller's SPI flash.
//!
//! Sources:
//! - https://github.com/dekuNukem/Nintendo_Switch_Reverse_Engineering/blob/master/spi_flash_notes.md
//! - https://github.com/CTCaer/jc_toolkit
use crate::calibration::{
    AxisCalibration, CalibrationSource, DeviceColorSet, SensorCalibration, StickCalibration,
};

// Flash addresses and sizes of the calibration blocks
pub const FACTORY_SENSOR_ADDRESS: u32 = 0x6020;
pub const FACTORY_SENSOR_SIZE: usize = 0x18;
pub const FACTORY_STICK_ADDRESS: u32 = 0x603D;
pub const FACTORY_STICK_SIZE: usize = 0x12;
pub const COLORS_ADDRESS: u32 = 0x6050;
pub const COLORS_SIZE: usize = 0xC;
pub const USER_STICK_ADDRESS: u32 = 0x8010;
pub const USER_STICK_SIZE: usize = 0x16;
pub const USER_SENSOR_ADDRESS: u32 = 0x8026;
pub const USER_SENSOR_SIZE: usize = 0x1A;

/// Marker written in front of user calibration data
pub const USER_CALIBRATION_MARKER: u16 = 0xA1B2;

const USER_LEFT_STICK_MARKER: usize = 0x0;
const USER_RIGHT_STICK_MARKER: usize = 0xB;
const USER_SENSOR_MARKER: usize = 0x0;

/// Reads a 12-bit value stored in the low nibble of `hi` and all of `lo`
fn low_12(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 8) & 0xF00 | lo as u16
}

/// Reads a 12-bit value stored in the high nibble of `lo` and all of `hi`
fn high_12(lo: u8, hi: u8) -> u16 {
    (hi as u16) << 4 | (lo as u16) >> 4
}

fn read_u16(block: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([block[offset], block[offset + 1]])
}

fn read_i16(block: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([block[offset], block[offset + 1]])
}

fn has_user_marker(block: &[u8], offset: usize) -> bool {
    read_u16(block, offset) == USER_CALIBRATION_MARKER
}

/// Build stick calibration from the packed center and extent triples
fn stick_from_groups(
    center: &[u8],
    below: &[u8],
    above: &[u8],
    source: CalibrationSource,
) -> StickCalibration {
    let center_x = low_12(center[0], center[1]);
    let center_y = high_12(center[1], center[2]);
    StickCalibration {
        x: AxisCalibration {
            min: center_x.saturating_sub(low_12(below[0], below[1])),
            center: center_x,
            max: center_x + low_12(above[0], above[1]),
        },
        y: AxisCalibration {
            min: center_y.saturating_sub(high_12(below[1], below[2])),
            center: center_y,
            max: center_y + high_12(above[1], above[2]),
        },
        source,
    }
}

/// Left stick data is ordered max delta, center, min delta
fn decode_left_stick(block: &[u8], source: CalibrationSource) -> StickCalibration {
    stick_from_groups(&block[3..6], &block[6..9], &block[0..3], source)
}

/// Right stick data is ordered center, min delta, max delta
fn decode_right_stick(block: &[u8], source: CalibrationSource) -> StickCalibration {
    stick_from_groups(&block[0..3], &block[3..6], &block[6..9], source)
}

/// Decode the left stick from the factory stick block (0x12 bytes)
pub fn decode_factory_left_stick(block: &[u8; FACTORY_STICK_SIZE]) -> StickCalibration {
    decode_left_stick(&block[0..9], CalibrationSource::Factory)
}

/// Decode the right stick from the factory stick block (0x12 bytes)
pub fn decode_factory_right_stick(block: &[u8; FACTORY_STICK_SIZE]) -> StickCalibration {
    decode_right_stick(&block[9..18], CalibrationSource::Factory)
}

/// Decode the left stick from the user stick block (0x16 bytes). Returns
/// `None` when no user calibration was written for this stick.
pub fn decode_user_left_stick(block: &[u8; USER_STICK_SIZE]) -> Option<StickCalibration> {
    if !has_user_marker(block, USER_LEFT_STICK_MARKER) {
        return None;
    }
    let data = USER_LEFT_STICK_MARKER + 2;
    Some(decode_left_stick(
        &block[data..data + 9],
        CalibrationSource::User,
    ))
}

/// Decode the right stick from the user stick block (0x16 bytes). Returns
/// `None` when no user calibration was written for this stick.
pub fn decode_user_right_stick(block: &[u8; USER_STICK_SIZE]) -> Option<StickCalibration> {
    if !has_user_marker(block, USER_RIGHT_STICK_MARKER) {
        return None;
    }
    let data = USER_RIGHT_STICK_MARKER + 2;
    Some(decode_right_stick(
        &block[data..data + 9],
        CalibrationSource::User,
    ))
}

/// Read accelerometer origins at `offset` and gyroscope origins 12 bytes
/// later
fn decode_sensor(block: &[u8], offset: usize, source: CalibrationSource) -> SensorCalibration {
    let accel = [0, 2, 4].map(|i| read_i16(block, offset + i));
    let gyro = [0xC, 0xE, 0x10].map(|i| read_i16(block, offset + i));
    SensorCalibration::new(accel, gyro, source)
}

/// Decode the factory IMU calibration block (0x18 bytes)
pub fn decode_factory_sensor(block: &[u8; FACTORY_SENSOR_SIZE]) -> SensorCalibration {
    decode_sensor(block, 0, CalibrationSource::Factory)
}

/// Decode the user IMU calibration block (0x1A bytes). The values sit two
/// bytes further than in the factory block, behind the marker. Returns `None`
/// when no user calibration was written.
pub fn decode_user_sensor(block: &[u8; USER_SENSOR_SIZE]) -> Option<SensorCalibration> {
    if !has_user_marker(block, USER_SENSOR_MARKER) {
        return None;
    }
    Some(decode_sensor(
        block,
        USER_SENSOR_MARKER + 2,
        CalibrationSource::User,
    ))
}

/// Decode the body, button and grip colours (0xC bytes of RGB triples)
pub fn decode_colors(block: &[u8; COLORS_SIZE]) -> DeviceColorSet {
    let rgb = |i: usize| (block[i] as u32) << 16 | (block[i + 1] as u32) << 8 | block[i + 2] as u32;
    DeviceColorSet {
        body: rgb(0),
        buttons: rgb(3),
        left_grip: rgb(6),
        right_grip: rgb(9),
    }
}

/// Pick the user calibration when one was written, the factory one otherwise
pub fn select<T>(factory: T, user: Option<T>) -> T {
    match user {
        Some(user) => {
            log::debug!("Using user calibration");
            user
        }
        None => factory,
    }
}
