//! Analog stick normalization. Deadzones are left to the consumer; values are
//! returned as raw ratios of the calibrated extents.
use super::{AxisCalibration, StickCalibration};

/// Map a raw stick value onto [-1.0, 1.0] using the given axis calibration.
///
/// The value is clamped to the calibrated extents first. Values at or above
/// the center are divided by the span to `max`, values below it by the span
/// to `min`, so each half of the axis reaches its full range independently.
/// A half with no span maps to 0.0.
pub fn normalize(raw: u16, calibration: &AxisCalibration) -> f32 {
    let AxisCalibration { min, center, max } = *calibration;
    let raw = raw.max(min).min(max) as i32;
    let (min, center, max) = (min as i32, center as i32, max as i32);

    if raw >= center {
        let span = max - center;
        if span == 0 {
            return 0.0;
        }
        (raw - center) as f32 / span as f32
    } else {
        let span = min - center;
        if span == 0 {
            return 0.0;
        }
        -((raw - center) as f32 / span as f32)
    }
}

/// Normalize both axes of a stick, returning `(x, y)`
pub fn normalize_stick(x: u16, y: u16, calibration: &StickCalibration) -> (f32, f32) {
    (
        normalize(x, &calibration.x),
        normalize(y, &calibration.y),
    )
}
