//! Sources:
//! - https://github.com/dekuNukem/Nintendo_Switch_Reverse_Engineering/blob/master/bluetooth_hid_notes.md
//! - https://github.com/torvalds/linux/blob/master/drivers/hid/hid-nintendo.c
//! - https://switchbrew.org/w/index.php?title=Joy-Con
use packed_struct::prelude::*;
use packed_struct::types::SizedInteger;
use thiserror::Error;

use crate::drivers::device::Connection;

use super::PACKET_SIZE;

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum ReportType {
    CommandOutputReport = 0x01,
    RumbleOutputReport = 0x10,
    CommandInputReport = 0x21,
    StandardInputReport = 0x30,
    NfcIrInputReport = 0x31,
    SimpleInputReport = 0x3F,
    UsbCommandOutputReport = 0x80,
    UsbCommandInputReport = 0x81,
}

impl TryFrom<u8> for ReportType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ReportType::from_primitive(value).ok_or("Invalid report type")
    }
}

/// Subcommands embedded in a [ReportType::CommandOutputReport]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    SetInputReportMode = 0x03,
    SpiFlashRead = 0x10,
    SpiFlashWrite = 0x11,
    SetPlayerLights = 0x30,
    EnableImu = 0x40,
    EnableVibration = 0x48,
}

/// Commands sent with the 0x80 prefix while the controller is attached over
/// USB (charging grip)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbCommand {
    RequestMac = 0x01,
    Handshake = 0x02,
    HighSpeed = 0x03,
    /// Stop the UART bridge and talk HID only
    HidOnly = 0x04,
    /// Let the controller talk Bluetooth again
    ReleaseHid = 0x05,
}

/// Input report modes set with [Subcommand::SetInputReportMode]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReportMode {
    /// Full input report pushed at 60Hz (0x30)
    Standard = 0x30,
    /// NFC/IR mode with large packets (0x31)
    NfcIr = 0x31,
    /// Simple HID mode, pushes only on button changes (0x3F)
    Simple = 0x3F,
}

/// "No vibration" rumble data sent ahead of every subcommand. Without it
/// the controller may read the subcommand as vibration state.
pub const NEUTRAL_RUMBLE: [u8; 8] = [0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];

/// Header written in front of commands sent over USB
pub const USB_COMMAND_HEADER: [u8; 4] = [0x80, 0x92, 0x00, 0x31];
/// Offset of the command id in a USB frame
pub const USB_COMMAND_OFFSET: usize = 0x08;
/// Offset of the subcommand id in a subcommand payload
pub const SUBCOMMAND_OFFSET: usize = 0x09;
/// Size of the rumble payload sent with [ReportType::RumbleOutputReport]
pub const RUMBLE_PAYLOAD_SIZE: usize = 0x09;

/// Possible errors when encoding an output frame
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload of {size} bytes does not fit in a frame with room for {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },
}

/// 4-bit counter that wraps around to zero after 0xF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollingCounter(u8);

impl RollingCounter {
    pub fn new(value: u8) -> Self {
        Self(value & 0xF)
    }

    /// Current counter value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Increment the counter and return the new value
    pub fn advance(&mut self) -> u8 {
        self.0 = (self.0 + 1) & 0xF;
        self.0
    }

    /// Return the current value and increment the counter
    pub fn take(&mut self) -> u8 {
        let value = self.0;
        self.0 = (self.0 + 1) & 0xF;
        value
    }
}

/// Encode a command frame for the given connection. Returns the frame buffer
/// and the number of bytes that should be written to the device.
///
/// Bluetooth: `[command, data...]`
/// USB: `[0x80, 0x92, 0x00, 0x31, 0, 0, 0, 0, command, data...]`
pub fn encode_command(
    connection: Connection,
    command: u8,
    data: &[u8],
) -> Result<([u8; PACKET_SIZE], usize), FrameError> {
    let offset = match connection {
        Connection::Bluetooth => 0,
        Connection::Usb => USB_COMMAND_OFFSET,
    };
    let max = PACKET_SIZE - offset - 1;
    if data.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max,
        });
    }

    let mut buf = [0; PACKET_SIZE];
    if connection == Connection::Usb {
        buf[..USB_COMMAND_HEADER.len()].copy_from_slice(&USB_COMMAND_HEADER);
    }
    buf[offset] = command;
    buf[offset + 1..offset + 1 + data.len()].copy_from_slice(data);

    Ok((buf, data.len() + offset + 1))
}

/// Encode the payload of a [ReportType::CommandOutputReport]: the sequence
/// number and neutral rumble, the subcommand id, then the subcommand data.
/// Returns the payload and its length.
pub fn encode_subcommand(
    sequence: u8,
    subcommand: u8,
    data: &[u8],
) -> Result<([u8; PACKET_SIZE], usize), FrameError> {
    let max = PACKET_SIZE - SUBCOMMAND_OFFSET - 1;
    if data.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max,
        });
    }

    let mut buf = [0; PACKET_SIZE];
    buf[0] = sequence & 0xF;
    buf[1..SUBCOMMAND_OFFSET].copy_from_slice(&NEUTRAL_RUMBLE);
    buf[SUBCOMMAND_OFFSET] = subcommand;
    buf[SUBCOMMAND_OFFSET + 1..SUBCOMMAND_OFFSET + 1 + data.len()].copy_from_slice(data);

    Ok((buf, data.len() + SUBCOMMAND_OFFSET + 1))
}

/// Encode a rumble payload.
///
/// The amplitude bit is set at `1 + intensity` for the left motor and
/// `5 + intensity` for the right one. The frequency goes into the left motor
/// slot for a left Joy-Con and into the right motor slot otherwise. Bits that
/// land past the 9 byte payload are not sent.
pub fn encode_rumble(left: bool, frequency: u8, intensity: u8) -> [u8; RUMBLE_PAYLOAD_SIZE] {
    let intensity = intensity.min(8) as usize;

    // Scratch space large enough for the highest amplitude offset
    let mut buf = [0u8; 16];
    buf[1 + intensity] = 0x1;
    buf[1 + 4 + intensity] = 0x1;
    if left {
        buf[1] = frequency;
    } else {
        buf[1 + 4] = frequency;
    }

    let mut payload = [0u8; RUMBLE_PAYLOAD_SIZE];
    payload.copy_from_slice(&buf[..RUMBLE_PAYLOAD_SIZE]);
    payload
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug, Default)]
pub enum BatteryLevel {
    #[default]
    Empty = 0,
    Critical = 1,
    Low = 2,
    Medium = 3,
    Full = 4,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct BatteryConnection {
    /// Battery level. 8=full, 6=medium, 4=low, 2=critical, 0=empty. LSB=Charging.
    #[packed_field(bits = "0..=2", ty = "enum")]
    pub battery_level: BatteryLevel,
    #[packed_field(bits = "3")]
    pub charging: bool,
    /// Connection info. (con_info >> 1) & 3 - 3=JC, 0=Pro/ChrGrip. con_info & 1 - 1=Switch/USB powered.
    #[packed_field(bits = "4..=7")]
    pub conn_info: Integer<u8, packed_bits::Bits<4>>,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct ButtonStatus {
    // byte 0 (Right)
    #[packed_field(bits = "7")]
    pub y: bool,
    #[packed_field(bits = "6")]
    pub x: bool,
    #[packed_field(bits = "5")]
    pub b: bool,
    #[packed_field(bits = "4")]
    pub a: bool,
    #[packed_field(bits = "3")]
    pub sr_right: bool,
    #[packed_field(bits = "2")]
    pub sl_right: bool,
    #[packed_field(bits = "1")]
    pub r: bool,
    #[packed_field(bits = "0")]
    pub zr: bool,

    // byte 1 (Shared)
    #[packed_field(bits = "15")]
    pub minus: bool,
    #[packed_field(bits = "14")]
    pub plus: bool,
    #[packed_field(bits = "13")]
    pub r_stick: bool,
    #[packed_field(bits = "12")]
    pub l_stick: bool,
    #[packed_field(bits = "11")]
    pub home: bool,
    #[packed_field(bits = "10")]
    pub capture: bool,
    #[packed_field(bits = "9")]
    pub _unused: bool,
    #[packed_field(bits = "8")]
    pub charging_grip: bool,

    // byte 2 (Left)
    #[packed_field(bits = "23")]
    pub down: bool,
    #[packed_field(bits = "22")]
    pub up: bool,
    #[packed_field(bits = "21")]
    pub right: bool,
    #[packed_field(bits = "20")]
    pub left: bool,
    #[packed_field(bits = "19")]
    pub sr_left: bool,
    #[packed_field(bits = "18")]
    pub sl_left: bool,
    #[packed_field(bits = "17")]
    pub l: bool,
    #[packed_field(bits = "16")]
    pub zl: bool,
}

/// Two 12-bit stick axes packed into 3 bytes. The middle byte holds the high
/// nibble of X in its low half and the low nibble of Y in its high half.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct StickData {
    #[packed_field(bytes = "0")]
    pub x_lo: u8,
    #[packed_field(bits = "8..=11")]
    pub y_lo: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "12..=15")]
    pub x_hi: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bytes = "2")]
    pub y_hi: u8,
}

impl StickData {
    pub fn get_x(&self) -> u16 {
        let x_hi = self.x_hi.to_primitive() as u16;
        self.x_lo as u16 | x_hi << 8
    }

    pub fn get_y(&self) -> u16 {
        let y_lo = self.y_lo.to_primitive() as u16;
        y_lo | (self.y_hi as u16) << 4
    }

    pub fn set_x(&mut self, x_raw: u16) {
        self.x_lo = (x_raw & 0x00FF) as u8;
        self.x_hi = Integer::from_primitive(((x_raw & 0x0F00) >> 8) as u8);
    }

    pub fn set_y(&mut self, y_raw: u16) {
        self.y_lo = Integer::from_primitive((y_raw & 0x000F) as u8);
        self.y_hi = ((y_raw & 0x0FF0) >> 4) as u8;
    }
}

/// The 6-Axis data is repeated 3 times. On Joy-con with a 15ms packet push,
/// this is translated to 5ms difference sampling. E.g. 1st sample 0ms, 2nd 5ms,
/// 3rd 10ms. Using all 3 samples let you have a 5ms precision instead of 15ms.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct ImuData {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub accel_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub accel_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub accel_z: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub gyro_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub gyro_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub gyro_z: Integer<i16, packed_bits::Bits<16>>,
}

impl ImuData {
    /// Raw accelerometer ticks as `[x, y, z]`
    pub fn accel(&self) -> [i16; 3] {
        [
            self.accel_x.to_primitive(),
            self.accel_y.to_primitive(),
            self.accel_z.to_primitive(),
        ]
    }

    /// Raw gyroscope ticks as `[x, y, z]`
    pub fn gyro(&self) -> [i16; 3] {
        [
            self.gyro_x.to_primitive(),
            self.gyro_y.to_primitive(),
            self.gyro_z.to_primitive(),
        ]
    }
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "36")]
pub struct ImuFrames {
    #[packed_field(element_size_bytes = "12")]
    pub frames: [ImuData; 3],
}

impl ImuFrames {
    /// Most recent IMU frame in the report
    pub fn latest(&self) -> &ImuData {
        &self.frames[2]
    }
}

/// Size of a [PackedInputDataReport]
pub const INPUT_REPORT_SIZE: usize = 49;

/// Standard full input report (0x30)
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "49")]
pub struct PackedInputDataReport {
    // byte 0-2
    /// Input report ID
    #[packed_field(bytes = "0", ty = "enum")]
    pub id: ReportType,
    /// Timer. Increments very fast. Can be used to estimate excess Bluetooth latency.
    #[packed_field(bytes = "1")]
    pub timer: u8,
    /// Battery and connection information
    #[packed_field(bytes = "2")]
    pub info: BatteryConnection,

    // byte 3-5
    /// Button status
    #[packed_field(bytes = "3..=5")]
    pub buttons: ButtonStatus,

    // byte 6-11
    /// Left analog stick
    #[packed_field(bytes = "6..=8")]
    pub left_stick: StickData,
    /// Right analog stick
    #[packed_field(bytes = "9..=11")]
    pub right_stick: StickData,

    // byte 12
    /// Vibrator input report. Decides if next vibration pattern should be sent.
    #[packed_field(bytes = "12")]
    pub vibrator_report: u8,

    // byte 13-48
    /// Three IMU frames, oldest first
    #[packed_field(bytes = "13..=48")]
    pub imu: ImuFrames,
}

impl PackedInputDataReport {
    /// Unpack a standard input report from the start of the given buffer
    pub fn unpack_from(buf: &[u8]) -> Result<Self, PackingError> {
        if buf.len() < INPUT_REPORT_SIZE {
            return Err(PackingError::BufferSizeMismatch {
                expected: INPUT_REPORT_SIZE,
                actual: buf.len(),
            });
        }
        let mut sized = [0u8; INPUT_REPORT_SIZE];
        sized.copy_from_slice(&buf[..INPUT_REPORT_SIZE]);
        PackedInputDataReport::unpack(&sized)
    }
}
