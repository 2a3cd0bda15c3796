use std::error::Error;

use crate::calibration::{
    stick::{normalize, normalize_stick},
    AxisCalibration, StickCalibration,
};

#[test]
fn test_normalize() -> Result<(), Box<dyn Error>> {
    let axis = AxisCalibration::new(0x200, 0x800, 0xD00);
    assert_eq!(normalize(0x800, &axis), 0.0);
    assert_eq!(normalize(0xD00, &axis), 1.0);
    assert_eq!(normalize(0x200, &axis), -1.0);
    assert_eq!(normalize(0xA80, &axis), 0.5);
    assert_eq!(normalize(0x500, &axis), -0.5);

    Ok(())
}

#[test]
fn test_normalize_saturates() -> Result<(), Box<dyn Error>> {
    let axis = AxisCalibration::new(0x200, 0x800, 0xD00);
    assert_eq!(normalize(0xFFF, &axis), 1.0);
    assert_eq!(normalize(0x000, &axis), -1.0);

    Ok(())
}

#[test]
fn test_normalize_zero_span() -> Result<(), Box<dyn Error>> {
    let axis = AxisCalibration::new(0, 100, 100);
    assert_eq!(normalize(200, &axis), 0.0);
    assert_eq!(normalize(50, &axis), -0.5);

    let axis = AxisCalibration::new(100, 100, 100);
    assert_eq!(normalize(0, &axis), 0.0);

    let axis = AxisCalibration::default();
    assert_eq!(normalize(0x800, &axis), 0.0);

    Ok(())
}

#[test]
fn test_normalize_fallback_stick() -> Result<(), Box<dyn Error>> {
    let stick = StickCalibration::fallback();
    assert_eq!(normalize_stick(255, 0, &stick), (1.0, -1.0));
    assert_eq!(normalize_stick(127, 127, &stick), (0.0, 0.0));

    Ok(())
}
