use thiserror::Error;

use crate::{
    calibration::{Calibration, SticksCalibration},
    drivers::{
        device::{Connection, DeviceFamily},
        transport::{Transport, TransportError},
    },
};

use super::{
    calibration::{
        decode_colors, decode_factory_left_stick, decode_factory_right_stick,
        decode_factory_sensor, decode_user_left_stick, decode_user_right_stick,
        decode_user_sensor, select, COLORS_ADDRESS, COLORS_SIZE, FACTORY_SENSOR_ADDRESS,
        FACTORY_SENSOR_SIZE, FACTORY_STICK_ADDRESS, FACTORY_STICK_SIZE, USER_SENSOR_ADDRESS,
        USER_SENSOR_SIZE, USER_STICK_ADDRESS, USER_STICK_SIZE,
    },
    hid_report::{
        encode_command, encode_rumble, encode_subcommand, FrameError, InputReportMode,
        PackedInputDataReport, ReportType, RollingCounter, Subcommand, UsbCommand,
    },
    spi::{self, FlashError},
    PACKET_SIZE,
};

/// Default number of flash read attempts before giving up
pub const DEFAULT_READ_RETRIES: u32 = 1000;
/// Number of flash write attempts before giving up
pub const DEFAULT_WRITE_RETRIES: u32 = 125;

/// Possible errors when driving a Joy-Con or Pro Controller
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("flash error: {0}")]
    Flash(#[from] FlashError),
    #[error("unable to unpack input report: {0}")]
    Unpack(#[from] packed_struct::PackingError),
}

/// Retry policy for flash access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRetries {
    /// Maximum read attempts, `None` retries forever
    pub read: Option<u32>,
    /// Maximum write attempts
    pub write: u32,
}

impl Default for FlashRetries {
    fn default() -> Self {
        Self {
            read: Some(DEFAULT_READ_RETRIES),
            write: DEFAULT_WRITE_RETRIES,
        }
    }
}

/// Joy-Con and Pro Controller protocol driver.
///
/// Every exchange is a blocking write followed by a read on the same handle,
/// and the protocol carries no request id, so a driver must only ever be used
/// from one context at a time.
pub struct Driver<T: Transport> {
    device: Option<T>,
    family: DeviceFamily,
    connection: Connection,
    /// Sequence number sent with every subcommand
    sequence: RollingCounter,
    /// Timing byte sent with every flash request
    timing: RollingCounter,
    retries: FlashRetries,
}

impl<T: Transport> Driver<T> {
    pub fn new(device: T, family: DeviceFamily, connection: Connection) -> Self {
        Self {
            device: Some(device),
            family,
            connection,
            sequence: RollingCounter::default(),
            timing: RollingCounter::default(),
            retries: FlashRetries::default(),
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn sequence(&self) -> RollingCounter {
        self.sequence
    }

    pub fn timing(&self) -> RollingCounter {
        self.timing
    }

    pub fn set_retries(&mut self, retries: FlashRetries) {
        self.retries = retries;
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Drop the transport. Every later call fails with
    /// [TransportError::NotConnected].
    pub fn close(&mut self) -> Option<T> {
        self.device.take()
    }

    fn device(&self) -> Result<&T, TransportError> {
        self.device.as_ref().ok_or(TransportError::NotConnected)
    }

    pub fn set_blocking_mode(&self, blocking: bool) -> Result<(), DriverError> {
        self.device()?.set_blocking_mode(blocking)?;
        Ok(())
    }

    /// Write the first `len` bytes of the buffer, then read the response back
    /// into it. Returns the number of bytes read.
    fn exchange(&self, buf: &mut [u8], len: usize) -> Result<usize, TransportError> {
        let device = self.device()?;
        device.write(&buf[..len])?;
        device.read(buf)
    }

    /// Send a command with the given payload and return the device response.
    pub fn send_command(
        &mut self,
        command: u8,
        data: &[u8],
    ) -> Result<[u8; PACKET_SIZE], DriverError> {
        let (mut buf, len) = encode_command(self.connection, command, data)?;
        log::trace!("Sending command {command:#04x}: {:02x?}", &buf[..len]);
        let bytes_read = self.exchange(&mut buf, len)?;
        log::trace!("Command {command:#04x} response: {:02x?}", &buf[..bytes_read]);
        Ok(buf)
    }

    /// Send a subcommand wrapped in `command`, preceded by the sequence number
    /// and neutral rumble data. Returns the device response.
    pub fn send_subcommand(
        &mut self,
        command: u8,
        subcommand: u8,
        data: &[u8],
    ) -> Result<[u8; PACKET_SIZE], DriverError> {
        let sequence = self.sequence.advance();
        let (payload, len) = encode_subcommand(sequence, subcommand, data)?;
        log::debug!("Sending subcommand {subcommand:#04x} (sequence {sequence})");
        self.send_command(command, &payload[..len])
    }

    fn subcommand(&mut self, subcommand: Subcommand, data: &[u8]) -> Result<(), DriverError> {
        self.send_subcommand(
            ReportType::CommandOutputReport as u8,
            subcommand as u8,
            data,
        )?;
        Ok(())
    }

    /// Rumble the controller. `intensity` ranges from 0 to 8. Rumble is not
    /// acknowledged, so the transport is switched to non-blocking first.
    pub fn rumble(&mut self, frequency: u8, intensity: u8) -> Result<(), DriverError> {
        let left = self.family == DeviceFamily::JoyConL;
        let payload = encode_rumble(left, frequency, intensity);
        self.set_blocking_mode(false)?;
        self.send_command(ReportType::RumbleOutputReport as u8, &payload)?;
        Ok(())
    }

    pub fn enable_vibration(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.subcommand(Subcommand::EnableVibration, &[enabled as u8])
    }

    pub fn enable_imu(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.subcommand(Subcommand::EnableImu, &[enabled as u8])
    }

    pub fn set_input_report_mode(&mut self, mode: InputReportMode) -> Result<(), DriverError> {
        self.subcommand(Subcommand::SetInputReportMode, &[mode as u8])
    }

    /// Set the player lights. The low nibble turns lights on, the high nibble
    /// makes them flash.
    pub fn set_player_lights(&mut self, pattern: u8) -> Result<(), DriverError> {
        self.subcommand(Subcommand::SetPlayerLights, &[pattern])
    }

    /// Send a 0x80 prefixed command, only understood over USB
    fn usb_command(&self, command: UsbCommand) -> Result<[u8; PACKET_SIZE], DriverError> {
        let mut buf = [0; PACKET_SIZE];
        buf[0] = ReportType::UsbCommandOutputReport as u8;
        buf[1] = command as u8;
        self.exchange(&mut buf, 2)?;
        Ok(buf)
    }

    /// Read `length` bytes of flash at `offset`.
    ///
    /// The request is repeated until the device acknowledges a read of the
    /// same address. The number of attempts is bounded by the configured read
    /// retries unless those are disabled. Reads block, so an attempt is only
    /// counted once the device answered or the read timed out.
    pub fn read_flash(&mut self, offset: u32, length: usize) -> Result<Vec<u8>, DriverError> {
        if length > spi::MAX_TRANSFER_SIZE {
            return Err(FlashError::InvalidLength(length).into());
        }
        // Rumble leaves the transport non-blocking
        self.set_blocking_mode(true)?;

        let mut attempts: u32 = 0;
        loop {
            if let Some(max) = self.retries.read {
                if attempts >= max {
                    return Err(FlashError::ReadRetriesExhausted { offset, attempts }.into());
                }
            }
            attempts = attempts.saturating_add(1);

            let (mut buf, len) = spi::encode_read_request(self.timing.take(), offset, length)?;
            let bytes_read = self.exchange(&mut buf, len)?;
            if spi::is_read_response(&buf[..bytes_read], offset) {
                log::trace!("Read {length} bytes at {offset:#06x} after {attempts} attempt(s)");
                return Ok(spi::read_response_data(&buf, bytes_read, length)?);
            }
        }
    }

    /// Write the given data to flash at `offset`. Fails once the configured
    /// number of write attempts went unacknowledged.
    pub fn write_flash(&mut self, offset: u32, data: &[u8]) -> Result<(), DriverError> {
        if data.len() > spi::MAX_TRANSFER_SIZE {
            return Err(FlashError::InvalidLength(data.len()).into());
        }
        self.set_blocking_mode(true)?;

        let mut attempts: u32 = 0;
        loop {
            let (mut buf, len) = spi::encode_write_request(self.timing.take(), offset, data)?;
            let bytes_read = self.exchange(&mut buf, len)?;
            if spi::is_write_response(&buf[..bytes_read]) {
                log::debug!("Wrote {} bytes at {offset:#06x}", data.len());
                return Ok(());
            }

            attempts += 1;
            if attempts >= self.retries.write {
                log::warn!("Giving up writing flash at {offset:#06x} after {attempts} attempts");
                return Err(FlashError::WriteRetriesExhausted { offset, attempts }.into());
            }
        }
    }

    fn read_block<const N: usize>(&mut self, offset: u32) -> Result<[u8; N], DriverError> {
        let data = self.read_flash(offset, N)?;
        let mut block = [0u8; N];
        block.copy_from_slice(&data);
        Ok(block)
    }

    /// Read the calibration blocks from flash and decode them. User
    /// calibration replaces the factory values wherever its marker is set.
    pub fn read_calibration(&mut self) -> Result<Calibration, DriverError> {
        log::debug!("Reading calibration for {}", self.family);
        let factory_sensor = self.read_block::<FACTORY_SENSOR_SIZE>(FACTORY_SENSOR_ADDRESS)?;
        let factory_stick = self.read_block::<FACTORY_STICK_SIZE>(FACTORY_STICK_ADDRESS)?;
        let colors = self.read_block::<COLORS_SIZE>(COLORS_ADDRESS)?;
        let user_stick = self.read_block::<USER_STICK_SIZE>(USER_STICK_ADDRESS)?;
        let user_sensor = self.read_block::<USER_SENSOR_SIZE>(USER_SENSOR_ADDRESS)?;

        let capabilities = self.family.capabilities();
        let mut sticks = SticksCalibration::default();
        if capabilities.has_left_stick {
            sticks.left = select(
                decode_factory_left_stick(&factory_stick),
                decode_user_left_stick(&user_stick),
            );
        }
        if capabilities.has_right_stick {
            sticks.right = select(
                decode_factory_right_stick(&factory_stick),
                decode_user_right_stick(&user_stick),
            );
        }
        let sensor = select(
            decode_factory_sensor(&factory_sensor),
            decode_user_sensor(&user_sensor),
        );
        let colors = decode_colors(&colors);
        log::debug!("Stick calibration: {sticks:?}");
        log::debug!("Sensor calibration: {sensor:?}");
        log::debug!(
            "Body: {:#08x}; Buttons: {:#08x}; Left Grip: {:#08x}; Right Grip: {:#08x}",
            colors.body,
            colors.buttons,
            colors.left_grip,
            colors.right_grip
        );

        Ok(Calibration {
            sticks,
            sensor: Some(sensor),
            colors: Some(colors),
        })
    }

    /// Initialize a controller connected over Bluetooth: enable vibration and
    /// the IMU, switch to the standard input report and read calibration.
    pub fn init_bluetooth(&mut self) -> Result<Calibration, DriverError> {
        // Blocking mode makes sure every command is acknowledged
        self.set_blocking_mode(true)?;
        self.enable_vibration(true)?;
        self.enable_imu(true)?;
        self.set_input_report_mode(InputReportMode::Standard)?;
        self.read_calibration()
    }

    /// Initialize a Joy-Con attached to the charging grip: handshake with the
    /// grip, switch it to HID only mode, enable vibration and the IMU, then
    /// read calibration.
    pub fn init_usb(&mut self) -> Result<Calibration, DriverError> {
        self.set_blocking_mode(true)?;

        let response = self.usb_command(UsbCommand::RequestMac)?;
        if response[2] == 0x3 {
            log::warn!("{} reports it is disconnected", self.family);
        } else {
            log::debug!(
                "Found {}, MAC: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                self.family,
                response[9],
                response[8],
                response[7],
                response[6],
                response[5],
                response[4]
            );
        }
        self.usb_command(UsbCommand::Handshake)?;
        self.usb_command(UsbCommand::HighSpeed)?;
        // Handshake again at the new baudrate
        self.usb_command(UsbCommand::Handshake)?;
        self.usb_command(UsbCommand::HidOnly)?;

        self.enable_vibration(true)?;
        self.enable_imu(true)?;
        self.read_calibration()
    }

    /// Initialize the controller for its connection
    pub fn init(&mut self) -> Result<Calibration, DriverError> {
        let calibration = match self.connection {
            Connection::Bluetooth => self.init_bluetooth()?,
            Connection::Usb => self.init_usb()?,
        };
        log::info!("Successfully initialized {}", self.family);
        Ok(calibration)
    }

    /// Hand a charging grip Joy-Con back to Bluetooth and release the
    /// transport
    pub fn deinit(&mut self) -> Result<(), DriverError> {
        if self.connection == Connection::Usb && self.is_connected() {
            self.usb_command(UsbCommand::ReleaseHid)?;
        }
        self.close();
        log::debug!("Deinitialized {}", self.family);
        Ok(())
    }

    /// Read one input report. Returns `None` when nothing was pending or the
    /// report is not a standard input report.
    pub fn poll(&mut self) -> Result<Option<PackedInputDataReport>, DriverError> {
        let mut buf = [0; PACKET_SIZE];
        let bytes_read = self.device()?.read(&mut buf)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        handle_input_report(&buf[..bytes_read])
    }
}

/// Unpacks a standard input report, ignoring every other report type
pub fn handle_input_report(buf: &[u8]) -> Result<Option<PackedInputDataReport>, DriverError> {
    let Some(&report_id) = buf.first() else {
        return Ok(None);
    };
    let report_type = match ReportType::try_from(report_id) {
        Ok(report_type) => report_type,
        Err(e) => {
            log::trace!("{e}: {report_id:#04x}");
            return Ok(None);
        }
    };
    if report_type != ReportType::StandardInputReport {
        log::trace!("Ignoring report: {report_type:?}");
        return Ok(None);
    }
    let report = PackedInputDataReport::unpack_from(buf)?;
    Ok(Some(report))
}
