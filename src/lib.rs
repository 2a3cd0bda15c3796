//! Protocol driver for Nintendo Joy-Con, Pro Controller and Sony DualShock 4
//! gamepads.
//!
//! A [session::DeviceSession] wraps one opened HID device. It runs the device
//! specific init sequence, reads stick and IMU calibration from the
//! controller, sends rumble and light commands, and keeps a continuous
//! gyroscope calibration from the samples it is fed.
pub mod calibration;
pub mod config;
pub mod drivers;
pub mod session;
