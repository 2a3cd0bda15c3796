use std::fmt::Display;

use crate::drivers::{dualshock4, switch};

/// Supported controller families. The family is chosen once when a device is
/// opened and never changes for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    JoyConL,
    JoyConR,
    ProController,
    DualShock4,
}

/// How the device is connected to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connection {
    Usb,
    Bluetooth,
}

/// Output report framing used by a device family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout {
    /// Nintendo command/subcommand framing
    Switch,
    /// Fixed size DualShock 4 output report
    DualShock4,
}

/// Where stick and IMU calibration comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStore {
    /// Calibration blocks are read from the device SPI flash
    Flash,
    /// Fixed fallback values, the device is never queried
    Fixed,
}

/// Per-family capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub frame_layout: FrameLayout,
    pub calibration: CalibrationStore,
    /// IMU samples per second
    pub sample_rate: u32,
    pub has_colors: bool,
    pub has_left_stick: bool,
    pub has_right_stick: bool,
}

impl DeviceFamily {
    /// Returns the capability table for this family
    pub fn capabilities(&self) -> Capabilities {
        match self {
            DeviceFamily::JoyConL => Capabilities {
                frame_layout: FrameLayout::Switch,
                calibration: CalibrationStore::Flash,
                sample_rate: switch::SAMPLE_RATE,
                has_colors: true,
                has_left_stick: true,
                has_right_stick: false,
            },
            DeviceFamily::JoyConR => Capabilities {
                frame_layout: FrameLayout::Switch,
                calibration: CalibrationStore::Flash,
                sample_rate: switch::SAMPLE_RATE,
                has_colors: true,
                has_left_stick: false,
                has_right_stick: true,
            },
            DeviceFamily::ProController => Capabilities {
                frame_layout: FrameLayout::Switch,
                calibration: CalibrationStore::Flash,
                sample_rate: switch::SAMPLE_RATE,
                has_colors: true,
                has_left_stick: true,
                has_right_stick: true,
            },
            DeviceFamily::DualShock4 => Capabilities {
                frame_layout: FrameLayout::DualShock4,
                calibration: CalibrationStore::Fixed,
                sample_rate: dualshock4::SAMPLE_RATE,
                has_colors: false,
                has_left_stick: true,
                has_right_stick: true,
            },
        }
    }

    /// Human readable product name
    pub fn name(&self) -> &'static str {
        match self {
            DeviceFamily::JoyConL => "Joy-Con (L)",
            DeviceFamily::JoyConR => "Joy-Con (R)",
            DeviceFamily::ProController => "Pro Controller",
            DeviceFamily::DualShock4 => "DualShock 4",
        }
    }
}

impl Display for DeviceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Usb => write!(f, "USB"),
            Connection::Bluetooth => write!(f, "Bluetooth"),
        }
    }
}

/// Identify the family and connection of a HID device from its vendor id,
/// product id and interface number. Returns `None` for unsupported devices.
///
/// Joy-Cons docked in the charging grip share one product id and are told
/// apart by interface number: 0 (or -1 when the platform does not report
/// interfaces) is the right Joy-Con, 1 is the left one.
pub fn identify(vid: u16, pid: u16, interface_number: i32) -> Option<(DeviceFamily, Connection)> {
    match vid {
        switch::VID => match pid {
            switch::JOYCON_L_BT_PID => Some((DeviceFamily::JoyConL, Connection::Bluetooth)),
            switch::JOYCON_R_BT_PID => Some((DeviceFamily::JoyConR, Connection::Bluetooth)),
            switch::PRO_CONTROLLER_PID => {
                Some((DeviceFamily::ProController, Connection::Bluetooth))
            }
            switch::CHARGING_GRIP_PID => match interface_number {
                0 | -1 => Some((DeviceFamily::JoyConR, Connection::Usb)),
                1 => Some((DeviceFamily::JoyConL, Connection::Usb)),
                _ => None,
            },
            _ => None,
        },
        dualshock4::VID => match pid {
            dualshock4::USB_PID | dualshock4::USB_V2_PID => {
                Some((DeviceFamily::DualShock4, Connection::Usb))
            }
            dualshock4::BT_PID => Some((DeviceFamily::DualShock4, Connection::Bluetooth)),
            _ => None,
        },
        _ => None,
    }
}
