//! A [DeviceSession] drives one connected controller. It is a passive
//! component: whoever owns it runs the poll loop and decides when to stop.
use std::ffi::CString;

use hidapi::{DeviceInfo, HidApi, HidDevice};
use thiserror::Error;

use crate::{
    calibration::{
        gyro_average::GyroAverager,
        stick::normalize_stick,
        Calibration,
    },
    config::SessionConfig,
    drivers::{
        device::{identify, Capabilities, Connection, DeviceFamily},
        dualshock4,
        switch::{
            self,
            hid_report::{BatteryConnection, ButtonStatus, PackedInputDataReport},
        },
        transport::{Transport, TransportError},
    },
};

/// Possible errors when driving a device session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("invalid device path: {0}")]
    InvalidPath(#[from] std::ffi::NulError),
    #[error("device {vid:04x}:{pid:04x} is not a supported controller")]
    UnsupportedDevice { vid: u16, pid: u16 },
    #[error("{operation} is not supported by {family}")]
    Unsupported {
        operation: &'static str,
        family: DeviceFamily,
    },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Switch(#[from] switch::driver::DriverError),
    #[error("{0}")]
    DualShock4(#[from] dualshock4::driver::DriverError),
}

/// Protocol driver selected by the device family
enum DeviceDriver<T: Transport> {
    Switch(switch::driver::Driver<T>),
    DualShock4(dualshock4::driver::Driver<T>),
}

/// One sample decoded from an input report
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSample {
    pub buttons: ButtonStatus,
    /// Battery level, charging state and connection info
    pub battery: BatteryConnection,
    /// Normalized left stick `(x, y)`
    pub left_stick: (f32, f32),
    /// Normalized right stick `(x, y)`
    pub right_stick: (f32, f32),
    /// Acceleration in m/s²
    pub accel: [f32; 3],
    /// Angular velocity in rad/s
    pub gyro: [f32; 3],
}

/// State of one connected controller
pub struct DeviceSession<T: Transport = HidDevice> {
    family: DeviceFamily,
    connection: Connection,
    driver: DeviceDriver<T>,
    calibration: Calibration,
    gyro: GyroAverager,
    /// Last published continuous calibration offset
    gyro_offset: [f32; 3],
    continuous_calibration: bool,
}

impl DeviceSession<HidDevice> {
    /// Open the device described by `info`. Fails if the device is not a
    /// supported controller or cannot be opened.
    pub fn open(
        api: &HidApi,
        info: &DeviceInfo,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let vid = info.vendor_id();
        let pid = info.product_id();
        let Some((family, connection)) = identify(vid, pid, info.interface_number()) else {
            return Err(SessionError::UnsupportedDevice { vid, pid });
        };

        let path = info.path().to_string_lossy().to_string();
        log::debug!("Found {family} over {connection}: {path}");
        let device = info.open_device(api)?;

        Ok(Self::new(device, family, connection, config))
    }

    /// Open the device at the given hidraw path
    pub fn open_path(
        api: &HidApi,
        path: String,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let c_path = CString::new(path.clone())?;
        let device = api.open_path(&c_path)?;
        let info = device.get_device_info()?;
        let vid = info.vendor_id();
        let pid = info.product_id();
        let Some((family, connection)) = identify(vid, pid, info.interface_number()) else {
            return Err(SessionError::UnsupportedDevice { vid, pid });
        };
        log::debug!("Found {family} over {connection}: {path}");

        Ok(Self::new(device, family, connection, config))
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Create a session over an already opened transport
    pub fn new(
        device: T,
        family: DeviceFamily,
        connection: Connection,
        config: &SessionConfig,
    ) -> Self {
        let capabilities = family.capabilities();
        let driver = match family {
            DeviceFamily::DualShock4 => {
                DeviceDriver::DualShock4(dualshock4::driver::Driver::new(device, connection))
            }
            _ => {
                let mut driver = switch::driver::Driver::new(device, family, connection);
                driver.set_retries(config.flash_retries());
                DeviceDriver::Switch(driver)
            }
        };

        Self {
            family,
            connection,
            driver,
            calibration: Calibration::default(),
            gyro: GyroAverager::new(capabilities.sample_rate, config.gyro_average_seconds()),
            gyro_offset: [0.0; 3],
            continuous_calibration: config.continuous_calibration(),
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn capabilities(&self) -> Capabilities {
        self.family.capabilities()
    }

    pub fn name(&self) -> &'static str {
        self.family.name()
    }

    /// Run the device specific init sequence and store the calibration it
    /// produces
    pub fn init(&mut self) -> Result<&Calibration, SessionError> {
        self.calibration = match &mut self.driver {
            DeviceDriver::Switch(driver) => driver.init()?,
            DeviceDriver::DualShock4(driver) => driver.init()?,
        };
        Ok(&self.calibration)
    }

    /// Calibration read during [DeviceSession::init]
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Rumble a Joy-Con or Pro Controller. `intensity` ranges from 0 to 8.
    pub fn rumble(&mut self, frequency: u8, intensity: u8) -> Result<(), SessionError> {
        match &mut self.driver {
            DeviceDriver::Switch(driver) => Ok(driver.rumble(frequency, intensity)?),
            DeviceDriver::DualShock4(_) => Err(self.unsupported("rumble")),
        }
    }

    /// Set DualShock 4 rumble motors and light bar colour
    pub fn set_lights_and_rumble(
        &mut self,
        small_rumble: u8,
        big_rumble: u8,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<(), SessionError> {
        match &self.driver {
            DeviceDriver::DualShock4(driver) => {
                Ok(driver.set_lights_and_rumble(small_rumble, big_rumble, r, g, b)?)
            }
            DeviceDriver::Switch(_) => Err(self.unsupported("set_lights_and_rumble")),
        }
    }

    /// Set the player lights of a Joy-Con or Pro Controller
    pub fn set_player_lights(&mut self, pattern: u8) -> Result<(), SessionError> {
        match &mut self.driver {
            DeviceDriver::Switch(driver) => Ok(driver.set_player_lights(pattern)?),
            DeviceDriver::DualShock4(_) => Err(self.unsupported("set_player_lights")),
        }
    }

    /// Read raw bytes from the SPI flash of a Joy-Con or Pro Controller
    pub fn read_flash(&mut self, offset: u32, length: usize) -> Result<Vec<u8>, SessionError> {
        match &mut self.driver {
            DeviceDriver::Switch(driver) => Ok(driver.read_flash(offset, length)?),
            DeviceDriver::DualShock4(_) => Err(self.unsupported("read_flash")),
        }
    }

    /// Write raw bytes to the SPI flash of a Joy-Con or Pro Controller
    pub fn write_flash(&mut self, offset: u32, data: &[u8]) -> Result<(), SessionError> {
        match &mut self.driver {
            DeviceDriver::Switch(driver) => Ok(driver.write_flash(offset, data)?),
            DeviceDriver::DualShock4(_) => Err(self.unsupported("write_flash")),
        }
    }

    /// Feed a gyroscope sample into the continuous calibration
    pub fn push_sample(&mut self, x: f32, y: f32, z: f32) {
        self.gyro.push(x, y, z);
    }

    /// Current continuous calibration offset. Keeps returning the previous
    /// offset while no samples have been collected.
    pub fn average(&mut self) -> [f32; 3] {
        if let Some(average) = self.gyro.average() {
            self.gyro_offset = average;
        }
        self.gyro_offset
    }

    /// Discard all continuous calibration samples
    pub fn reset_calibration(&mut self) {
        log::debug!("Resetting continuous calibration for {}", self.family);
        self.gyro.reset();
    }

    /// Enable or disable feeding input report gyro samples into the
    /// continuous calibration
    pub fn set_continuous_calibration(&mut self, enabled: bool) {
        self.continuous_calibration = enabled;
    }

    pub fn gyro_averager(&self) -> &GyroAverager {
        &self.gyro
    }

    pub fn gyro_averager_mut(&mut self) -> &mut GyroAverager {
        &mut self.gyro
    }

    /// Convert a standard input report into calibrated values. The gyro sample
    /// is pushed into the continuous calibration when it is enabled and the
    /// IMU calibration is known.
    pub fn process_report(&mut self, report: &PackedInputDataReport) -> InputSample {
        let sticks = &self.calibration.sticks;
        let capabilities = self.family.capabilities();
        let mut sample = InputSample {
            buttons: report.buttons,
            battery: report.info,
            ..Default::default()
        };
        if capabilities.has_left_stick {
            let stick = &report.left_stick;
            sample.left_stick = normalize_stick(stick.get_x(), stick.get_y(), &sticks.left);
        }
        if capabilities.has_right_stick {
            let stick = &report.right_stick;
            sample.right_stick = normalize_stick(stick.get_x(), stick.get_y(), &sticks.right);
        }

        // Only calibrated samples feed the continuous calibration
        let imu = report.imu.latest();
        if let Some(sensor) = self.calibration.sensor.as_ref() {
            sample.accel = sensor.accel_to_si(imu.accel());
            sample.gyro = sensor.gyro_to_si(imu.gyro());
            if self.continuous_calibration {
                let [x, y, z] = sample.gyro;
                self.gyro.push(x, y, z);
            }
        }

        sample
    }

    /// Read and process one input report. Returns `None` if no standard input
    /// report was pending.
    pub fn read_report(&mut self) -> Result<Option<InputSample>, SessionError> {
        let report = match &mut self.driver {
            DeviceDriver::Switch(driver) => driver.poll()?,
            DeviceDriver::DualShock4(_) => return Err(self.unsupported("read_report")),
        };
        Ok(report.map(|report| self.process_report(&report)))
    }

    /// Release the device. Every later operation on the transport fails with
    /// [TransportError::NotConnected].
    pub fn deinit(&mut self) -> Result<(), SessionError> {
        match &mut self.driver {
            DeviceDriver::Switch(driver) => driver.deinit()?,
            DeviceDriver::DualShock4(driver) => driver.deinit()?,
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        match &self.driver {
            DeviceDriver::Switch(driver) => driver.is_connected(),
            DeviceDriver::DualShock4(driver) => driver.is_connected(),
        }
    }

    fn unsupported(&self, operation: &'static str) -> SessionError {
        SessionError::Unsupported {
            operation,
            family: self.family,
        }
    }
}
