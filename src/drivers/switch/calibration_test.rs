use std::error::Error;

use crate::{
    calibration::{AxisCalibration, CalibrationSource, DeviceColorSet},
    drivers::switch::calibration::{
        decode_colors, decode_factory_left_stick, decode_factory_right_stick,
        decode_factory_sensor, decode_user_left_stick, decode_user_right_stick,
        decode_user_sensor, select, FACTORY_SENSOR_SIZE, FACTORY_STICK_SIZE, USER_SENSOR_SIZE,
        USER_STICK_SIZE,
    },
};

// Center x=0x800 y=0x7F0, positive extent x=0x500 y=0x4A0, negative extent
// x=0x600 y=0x520
const CENTER: [u8; 3] = [0x00, 0x08, 0x7F];
const ABOVE: [u8; 3] = [0x00, 0x05, 0x4A];
const BELOW: [u8; 3] = [0x00, 0x06, 0x52];

fn expected_x() -> AxisCalibration {
    AxisCalibration::new(0x200, 0x800, 0xD00)
}

fn expected_y() -> AxisCalibration {
    AxisCalibration::new(0x2D0, 0x7F0, 0xC90)
}

fn factory_stick_block() -> [u8; FACTORY_STICK_SIZE] {
    let mut block = [0u8; FACTORY_STICK_SIZE];
    // Left: max, center, min
    block[0..3].copy_from_slice(&ABOVE);
    block[3..6].copy_from_slice(&CENTER);
    block[6..9].copy_from_slice(&BELOW);
    // Right: center, min, max
    block[9..12].copy_from_slice(&CENTER);
    block[12..15].copy_from_slice(&BELOW);
    block[15..18].copy_from_slice(&ABOVE);
    block
}

#[test]
fn test_factory_sticks() -> Result<(), Box<dyn Error>> {
    let block = factory_stick_block();

    let left = decode_factory_left_stick(&block);
    assert_eq!(left.x, expected_x());
    assert_eq!(left.y, expected_y());
    assert_eq!(left.source, CalibrationSource::Factory);

    let right = decode_factory_right_stick(&block);
    assert_eq!(right.x, expected_x());
    assert_eq!(right.y, expected_y());

    Ok(())
}

#[test]
fn test_factory_stick_min_saturates() -> Result<(), Box<dyn Error>> {
    let mut block = [0u8; FACTORY_STICK_SIZE];
    // Center x=0x010 with a negative extent of 0x100
    block[9..12].copy_from_slice(&[0x10, 0x00, 0x00]);
    block[12..15].copy_from_slice(&[0x00, 0x01, 0x00]);

    let right = decode_factory_right_stick(&block);
    assert_eq!(right.x.min, 0);
    assert_eq!(right.x.center, 0x10);

    Ok(())
}

#[test]
fn test_user_sticks_override_factory() -> Result<(), Box<dyn Error>> {
    let mut user = [0u8; USER_STICK_SIZE];
    user[0..2].copy_from_slice(&[0xB2, 0xA1]);
    // Left user calibration centered at x=0x900
    user[2..5].copy_from_slice(&ABOVE);
    user[5..8].copy_from_slice(&[0x00, 0x09, 0x7F]);
    user[8..11].copy_from_slice(&BELOW);
    user[0xB..0xD].copy_from_slice(&[0xB2, 0xA1]);
    user[0xD..0x10].copy_from_slice(&CENTER);
    user[0x10..0x13].copy_from_slice(&BELOW);
    user[0x13..0x16].copy_from_slice(&ABOVE);

    let factory = factory_stick_block();

    let left = select(
        decode_factory_left_stick(&factory),
        decode_user_left_stick(&user),
    );
    assert_eq!(left.source, CalibrationSource::User);
    assert_eq!(left.x, AxisCalibration::new(0x300, 0x900, 0xE00));
    assert_eq!(left.y, expected_y());

    let right = select(
        decode_factory_right_stick(&factory),
        decode_user_right_stick(&user),
    );
    assert_eq!(right.source, CalibrationSource::User);
    assert_eq!(right.x, expected_x());

    Ok(())
}

#[test]
fn test_user_marker_mismatch() -> Result<(), Box<dyn Error>> {
    let mut user = [0xFFu8; USER_STICK_SIZE];
    // Byte swapped marker
    user[0..2].copy_from_slice(&[0xA1, 0xB2]);
    assert_eq!(decode_user_left_stick(&user), None);
    assert_eq!(decode_user_right_stick(&user), None);

    let factory = factory_stick_block();
    let left = select(
        decode_factory_left_stick(&factory),
        decode_user_left_stick(&user),
    );
    assert_eq!(left.source, CalibrationSource::Factory);
    assert_eq!(left.x, expected_x());

    Ok(())
}

#[test]
fn test_factory_sensor() -> Result<(), Box<dyn Error>> {
    let mut block = [0u8; FACTORY_SENSOR_SIZE];
    block[0..2].copy_from_slice(&16i16.to_le_bytes());
    block[2..4].copy_from_slice(&(-32i16).to_le_bytes());
    block[0xC..0xE].copy_from_slice(&5i16.to_le_bytes());
    block[0x10..0x12].copy_from_slice(&(-7i16).to_le_bytes());

    let sensor = decode_factory_sensor(&block);
    assert_eq!(sensor.accel_origin, [16, -32, 0]);
    assert_eq!(sensor.gyro_origin, [5, 0, -7]);
    assert_eq!(sensor.source, CalibrationSource::Factory);

    let expected = 4.0 * 9.8 / (16384.0 - 16.0);
    assert!((sensor.accel_coeff[0] - expected).abs() < 1e-6);
    let expected = 936.0 / (13371.0 + 7.0) * (std::f32::consts::PI / 180.0);
    assert!((sensor.gyro_coeff[2] - expected).abs() < 1e-6);

    // A sample at the origin has no angular velocity
    assert_eq!(sensor.gyro_to_si([5, 0, -7]), [0.0, 0.0, 0.0]);

    Ok(())
}

#[test]
fn test_user_sensor() -> Result<(), Box<dyn Error>> {
    let mut block = [0u8; USER_SENSOR_SIZE];
    assert_eq!(decode_user_sensor(&block), None);

    block[0..2].copy_from_slice(&[0xB2, 0xA1]);
    block[2..4].copy_from_slice(&100i16.to_le_bytes());
    block[0xE..0x10].copy_from_slice(&(-3i16).to_le_bytes());

    let Some(sensor) = decode_user_sensor(&block) else {
        panic!("User sensor calibration should be present");
    };
    assert_eq!(sensor.accel_origin, [100, 0, 0]);
    assert_eq!(sensor.gyro_origin, [-3, 0, 0]);
    assert_eq!(sensor.source, CalibrationSource::User);

    Ok(())
}

#[test]
fn test_colors() -> Result<(), Box<dyn Error>> {
    let block = [
        0x32, 0x32, 0x32, 0xFF, 0xFF, 0xFF, 0x0A, 0xB9, 0xE6, 0xFF, 0x3C, 0x28,
    ];
    let colors = decode_colors(&block);
    assert_eq!(
        colors,
        DeviceColorSet {
            body: 0x323232,
            buttons: 0xFFFFFF,
            left_grip: 0x0AB9E6,
            right_grip: 0xFF3C28,
        }
    );

    Ok(())
}
