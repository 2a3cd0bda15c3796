use hidapi::{HidDevice, HidError};
use thiserror::Error;

/// Possible errors when talking to a device over its HID transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("device is not connected")]
    NotConnected,
    #[error("hid error: {0}")]
    Hid(#[from] HidError),
}

/// Blocking/non-blocking read and write primitives over an opened device
/// handle. Every exchange with a controller goes through this trait, which
/// allows the protocol to be driven against something other than a real
/// HID device.
pub trait Transport {
    /// Write the given report to the device, returning the number of bytes
    /// written.
    fn write(&self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Read a report from the device into the given buffer. In non-blocking
    /// mode this returns 0 when no report is pending.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Toggle between blocking and non-blocking reads
    fn set_blocking_mode(&self, blocking: bool) -> Result<(), TransportError>;
}

impl Transport for HidDevice {
    fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::write(self, buf)?)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(HidDevice::read(self, buf)?)
    }

    fn set_blocking_mode(&self, blocking: bool) -> Result<(), TransportError> {
        Ok(HidDevice::set_blocking_mode(self, blocking)?)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        (**self).write(buf)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read(buf)
    }

    fn set_blocking_mode(&self, blocking: bool) -> Result<(), TransportError> {
        (**self).set_blocking_mode(blocking)
    }
}
