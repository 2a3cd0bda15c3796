pub mod driver;
pub mod hid_report;


// Hardware ID's
pub const VID: u16 = 0x054c;
pub const USB_PID: u16 = 0x05c4;
pub const USB_V2_PID: u16 = 0x09cc;
pub const BT_PID: u16 = 0x081f;
pub const PIDS: [u16; 3] = [USB_PID, USB_V2_PID, BT_PID];

/// IMU samples per second
pub const SAMPLE_RATE: u32 = 250;
