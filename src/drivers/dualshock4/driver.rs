use packed_struct::prelude::*;
use thiserror::Error;

use crate::{
    calibration::{Calibration, SticksCalibration},
    drivers::{
        device::Connection,
        transport::{Transport, TransportError},
    },
};

use super::hid_report::PackedOutputReport;

/// Possible errors when driving a DualShock 4
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unable to pack output report: {0}")]
    Pack(#[from] PackingError),
}

/// DualShock 4 output driver. Output reports are fire-and-forget, nothing is
/// read back.
pub struct Driver<T: Transport> {
    device: Option<T>,
    connection: Connection,
}

impl<T: Transport> Driver<T> {
    pub fn new(device: T, connection: Connection) -> Self {
        Self {
            device: Some(device),
            connection,
        }
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Drop the transport
    pub fn close(&mut self) -> Option<T> {
        self.device.take()
    }

    fn device(&self) -> Result<&T, TransportError> {
        self.device.as_ref().ok_or(TransportError::NotConnected)
    }

    /// Writes the given output report to the gamepad
    pub fn write(&self, report: PackedOutputReport) -> Result<(), DriverError> {
        let buf = report.pack()?;
        let _bytes_written = self.device()?.write(&buf)?;
        Ok(())
    }

    /// Set the light bar colour and both rumble motors
    pub fn set_lights_and_rumble(
        &self,
        small_rumble: u8,
        big_rumble: u8,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<(), DriverError> {
        log::debug!("Setting rumble to {small_rumble}/{big_rumble} and lights to {r}, {g}, {b}");
        let report = PackedOutputReport {
            small_rumble,
            big_rumble,
            led_red: r,
            led_green: g,
            led_blue: b,
            ..Default::default()
        };
        self.write(report)
    }

    /// Send a neutral output report and return the fixed calibration. The
    /// DualShock 4 keeps no stick or IMU calibration the driver can use.
    pub fn init(&self) -> Result<Calibration, DriverError> {
        self.device()?.set_blocking_mode(true)?;
        self.write(PackedOutputReport::default())?;
        log::info!("Successfully initialized DualShock 4");
        Ok(Calibration {
            sticks: SticksCalibration::fallback(),
            sensor: None,
            colors: None,
        })
    }

    /// Stop rumble, turn off the light bar flash and release the transport
    pub fn deinit(&mut self) -> Result<(), DriverError> {
        if self.is_connected() {
            self.device()?.set_blocking_mode(false)?;
            let report = PackedOutputReport {
                flash_on: 0x00,
                flash_off: 0x00,
                ..Default::default()
            };
            self.write(report)?;
        }
        self.close();
        log::debug!("Deinitialized DualShock 4");
        Ok(())
    }
}
